//! Error types for the impc back end and machine simulator

use thiserror::Error;

/// impc errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Declaration errors
    /// A name was declared twice in the same scope
    ///
    /// **Triggered by:** a variable, array, iterator, parameter or procedure
    /// reusing a name that is already bound where it is declared
    /// **Example:** `PROGRAM IS n, n BEGIN ... END`
    #[error("Redeclaration of {kind} '{name}'")]
    Redeclaration {
        /// What was being declared (variable, array, iterator, procedure, parameter)
        kind: &'static str,
        /// Name that collided
        name: String,
    },

    /// Reference to a name that is not bound in the active scope
    #[error("Undeclared {kind} '{name}'")]
    Undeclared {
        /// What kind of entity was expected
        kind: &'static str,
        /// Name that was not found
        name: String,
    },

    /// Array used where a scalar is expected, or the other way around
    ///
    /// **Triggered by:** `t := 1` for an array `t`, `n[3]` for a scalar `n`,
    /// passing an array to a scalar parameter
    #[error("Type mismatch for '{name}': expected {expected}, got {got}")]
    TypeMismatch {
        /// Offending name
        name: String,
        /// Expected shape
        expected: &'static str,
        /// Actual shape
        got: &'static str,
    },

    // Range errors
    /// Array declared with `first > last`
    #[error("Invalid range for array '{name}': [{first}:{last}]")]
    InvalidArrayRange {
        /// Array name
        name: String,
        /// Declared first index
        first: i64,
        /// Declared last index
        last: i64,
    },

    /// Literal index outside the declared array bounds
    #[error("Index {index} out of bounds for array '{name}' [{first}:{last}]")]
    IndexOutOfBounds {
        /// Array name
        name: String,
        /// Requested index
        index: i64,
        /// Declared first index
        first: i64,
        /// Declared last index
        last: i64,
    },

    /// For-loop whose literal bounds can never execute
    ///
    /// **Example:** `FOR i FROM 5 TO 1 DO ... ENDFOR`
    #[error("Invalid range for loop over '{iterator}': {from} {direction} {to}")]
    InvalidLoopRange {
        /// Iterator name
        iterator: String,
        /// Literal start value
        from: i64,
        /// Literal end value
        to: i64,
        /// `TO` or `DOWNTO`
        direction: &'static str,
    },

    /// Variable used as an array index before it was ever assigned or read
    #[error("Variable '{name}' used as an array index before initialization")]
    UninitializedUse {
        /// Variable name
        name: String,
    },

    /// Attempt to assign, read into, or pass a loop iterator by reference
    #[error("Cannot modify loop iterator '{name}'")]
    IteratorModification {
        /// Iterator name
        name: String,
    },

    // Procedure errors
    /// Procedure calls itself
    #[error("Recursive call of procedure '{procedure}'")]
    Recursion {
        /// Procedure name
        procedure: String,
    },

    /// Procedure calls another procedure defined after it
    #[error("Procedure '{callee}' called in '{caller}' must be defined before it is called")]
    CallOrder {
        /// Calling procedure
        caller: String,
        /// Called procedure
        callee: String,
    },

    /// Wrong number of arguments at a call site
    #[error("Procedure '{procedure}' expects {expected} argument(s), got {got}")]
    Arity {
        /// Called procedure
        procedure: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// `WHILE` whose condition always holds
    #[error("Infinite loop: condition '{condition}' is always {holds}")]
    InfiniteLoop {
        /// Rendered condition
        condition: String,
        /// Whether the condition is always true or always false
        holds: bool,
    },

    /// More call sites than the configured return-slot limit
    #[error("Procedure '{procedure}' has {count} call sites (limit: {limit})")]
    CallSiteLimit {
        /// Procedure name
        procedure: String,
        /// Static call-site count
        count: usize,
        /// Configured maximum
        limit: usize,
    },

    /// No free memory cell is left for a declaration
    #[error("Address space exhausted while allocating '{name}'")]
    AddressSpaceExhausted {
        /// Entity being allocated
        name: String,
    },

    // Input errors
    /// AST handed over by the front end could not be decoded
    #[error("Invalid AST: {0}")]
    InvalidAst(String),

    /// Assembly text line could not be parsed
    #[error("Invalid instruction at line {line}: {text}")]
    InvalidInstruction {
        /// 1-based line number
        line: usize,
        /// Offending text
        text: String,
    },

    // Internal errors
    /// Jump emitted against a label that was never bound
    #[error("Unresolved label L{0}")]
    UnresolvedLabel(usize),

    /// Final program failed verification
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    // Simulator errors
    /// Program ran longer than the step limit
    #[error("Execution limit exceeded (max: {limit} steps)")]
    ExecutionLimitExceeded {
        /// Maximum allowed steps
        limit: u64,
    },

    /// `GET` executed with no input left
    #[error("Input exhausted at instruction {pc}")]
    InputExhausted {
        /// Instruction index of the `GET`
        pc: usize,
    },

    /// Indirect access through a negative address
    #[error("Invalid memory address {address} at instruction {pc}")]
    InvalidAddress {
        /// Address that was dereferenced
        address: i128,
        /// Instruction index
        pc: usize,
    },

    /// Control transferred outside the program
    #[error("Jump to {target} outside program at instruction {pc}")]
    InvalidJump {
        /// Target instruction index
        target: i128,
        /// Instruction index of the jump
        pc: usize,
    },

    /// Arithmetic overflow in the simulator
    #[error("Arithmetic overflow at instruction {pc}")]
    Overflow {
        /// Instruction index
        pc: usize,
    },
}

/// Error classification, one entry per failure family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Name reused in its scope
    Redeclaration,
    /// Unknown variable, array, procedure or argument
    Undeclared,
    /// Array used as a scalar or vice versa
    TypeMismatch,
    /// Bad array bounds, literal index out of bounds, invalid literal loop range
    Range,
    /// Index variable used before assignment
    UninitializedUse,
    /// Direct self-call
    Recursion,
    /// Forward call to a later procedure
    CallOrder,
    /// Argument count mismatch
    Arity,
    /// Statically non-terminating loop
    InfiniteLoop,
    /// Write to a loop iterator
    IteratorModification,
    /// Configured limit exceeded
    Limit,
    /// Malformed input handed to the crate
    Input,
    /// Invariant broken inside the back end
    Internal,
    /// Simulator failure
    Runtime,
}

impl Error {
    /// Classify the error into its failure family
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Redeclaration { .. } => ErrorKind::Redeclaration,
            Error::Undeclared { .. } => ErrorKind::Undeclared,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::InvalidArrayRange { .. }
            | Error::IndexOutOfBounds { .. }
            | Error::InvalidLoopRange { .. } => ErrorKind::Range,
            Error::UninitializedUse { .. } => ErrorKind::UninitializedUse,
            Error::IteratorModification { .. } => ErrorKind::IteratorModification,
            Error::Recursion { .. } => ErrorKind::Recursion,
            Error::CallOrder { .. } => ErrorKind::CallOrder,
            Error::Arity { .. } => ErrorKind::Arity,
            Error::InfiniteLoop { .. } => ErrorKind::InfiniteLoop,
            Error::CallSiteLimit { .. } | Error::AddressSpaceExhausted { .. } => ErrorKind::Limit,
            Error::InvalidAst(_) | Error::InvalidInstruction { .. } => ErrorKind::Input,
            Error::UnresolvedLabel(_) | Error::VerificationFailed(_) => ErrorKind::Internal,
            Error::ExecutionLimitExceeded { .. }
            | Error::InputExhausted { .. }
            | Error::InvalidAddress { .. }
            | Error::InvalidJump { .. }
            | Error::Overflow { .. } => ErrorKind::Runtime,
        }
    }

    /// Whether the error was raised while compiling (as opposed to simulating)
    pub fn is_compile_error(&self) -> bool {
        self.kind() != ErrorKind::Runtime
    }
}

/// Result type for impc operations
pub type Result<T> = std::result::Result<T, Error>;

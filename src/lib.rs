//! # impc - Back End for a Small Imperative Language
//!
//! Compiles a typed AST (procedures, arrays, bounded for-loops, conditionals,
//! `READ`/`WRITE`) into linear assembly for an accumulator machine with no
//! native multiply, divide or modulo.
//!
//! ## Quick Start
//!
//! ```rust
//! use impc::ast::{BinaryOp, Command, Declaration, Expression, Identifier, Main, Program, Value};
//! use impc::{CompileOptions, Compiler, Machine};
//!
//! # fn main() -> impc::Result<()> {
//! let program = Program {
//!     procedures: vec![],
//!     main: Main {
//!         declarations: vec![Declaration::Variable("n".into())],
//!         commands: vec![
//!             Command::Read(Identifier::Scalar("n".into())),
//!             Command::Assign {
//!                 target: Identifier::Scalar("n".into()),
//!                 value: Expression::binary(Value::var("n"), BinaryOp::Mul, Value::num(-3)),
//!             },
//!             Command::Write(Value::var("n")),
//!         ],
//!     },
//! };
//!
//! let result = Compiler::new(CompileOptions::default()).compile(&program)?;
//! let exec = Machine::new(result.instructions).run(&[7])?;
//! assert_eq!(exec.output, vec![-21]);
//! # Ok(())
//! # }
//! ```
//!
//! Front ends written in other languages can hand the AST over as JSON:
//!
//! ```rust
//! # fn main() -> impc::Result<()> {
//! let json = r#"{"procedures":[],"main":{"declarations":[],"commands":[{"Write":{"Num":5}}]}}"#;
//! let result = impc::Compiler::default().compile_json(json)?;
//! assert_eq!(result.assembly(), "JUMP 1\nSET 5\nPUT 0\nHALT\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! AST → CallGraph → CodeGenerator ⇄ SymbolTable → Assembler → Verifier → Assembly
//! ```
//!
//! - [`ast`] - Input tree handed over by the front end
//! - [`compiler`] - Allocator, code generator, label resolution, verifier
//! - [`runtime`] - Reference machine used to run compiled programs
//! - [`error`] - Error type shared by all phases
//!
//! ## Logging
//!
//! Phases report through `tracing`; install any subscriber to see them.

/// Version of the impc back end
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod compiler;
pub mod error;
pub mod runtime;

// Re-export main types
pub use compiler::{CompileOptions, CompileResult, CompileStats, Compiler, Instruction};
pub use error::{Error, ErrorKind, Result};
pub use runtime::{Execution, Machine, MachineOptions};

//! # Program Verifier
//!
//! Structural checks on a finished instruction stream before it is handed
//! out: the program starts with the jump over procedure bodies, ends with
//! `HALT`, and every relative jump lands inside the program.

use super::instruction::Instruction;

/// Verification result with warnings
#[derive(Debug)]
pub struct VerifyResult {
    /// Program passed every check
    pub valid: bool,
    /// Errors that make the program unusable
    pub errors: Vec<VerifyError>,
    /// Warnings (non-fatal)
    pub warnings: Vec<String>,
    /// Statistics
    pub stats: ProgramStats,
}

/// Program statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProgramStats {
    /// Total instruction count
    pub instruction_count: usize,
    /// Sum of the static cost of every instruction
    pub estimated_cost: u64,
    /// Relative jumps (conditional or not)
    pub jump_count: usize,
    /// `GET` and `PUT` instructions
    pub io_count: usize,
    /// `RTRN` instructions (one per procedure body)
    pub return_count: usize,
}

/// Verification error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Program is empty or its last instruction is not `HALT`
    NoHalt,

    /// Program does not open with `JUMP` to the main block
    MissingEntryJump,

    /// Jump target outside the program.
    JumpOutOfBounds {
        /// Index of the jump instruction
        index: usize,
        /// Absolute target (negative or past the end)
        target: i64,
    },
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::NoHalt => write!(f, "Program does not end with HALT"),
            VerifyError::MissingEntryJump => {
                write!(f, "Program does not start with a jump to main")
            }
            VerifyError::JumpOutOfBounds { index, target } => {
                write!(
                    f,
                    "Jump at instruction {} targets out of bounds: {}",
                    index, target
                )
            }
        }
    }
}

/// Instruction stream verifier
#[derive(Debug, Default)]
pub struct Verifier {
    /// Strict mode (treat warnings as errors)
    strict: bool,
}

impl Verifier {
    /// Creates a non-strict verifier
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Enable strict mode
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Verify a program
    pub fn verify(&self, program: &[Instruction]) -> VerifyResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut stats = ProgramStats {
            instruction_count: program.len(),
            estimated_cost: program.iter().map(Instruction::cost).sum(),
            ..ProgramStats::default()
        };

        if program.last() != Some(&Instruction::Halt) {
            errors.push(VerifyError::NoHalt);
        }
        if !matches!(program.first(), Some(Instruction::Jump(_))) {
            errors.push(VerifyError::MissingEntryJump);
        }

        for (index, instr) in program.iter().enumerate() {
            match instr {
                Instruction::Get(_) | Instruction::Put(_) => stats.io_count += 1,
                Instruction::Rtrn(_) => stats.return_count += 1,
                _ => {}
            }

            let Some(offset) = instr.jump_offset() else {
                continue;
            };
            stats.jump_count += 1;

            // Jump semantics: PC = index + offset
            let target = index as i64 + offset;
            if target < 0 || target as usize >= program.len() {
                errors.push(VerifyError::JumpOutOfBounds { index, target });
            } else if offset == 0 {
                warnings.push(format!("{} at instruction {} targets itself", instr, index));
            }
        }

        let valid = errors.is_empty() && (!self.strict || warnings.is_empty());

        VerifyResult {
            valid,
            errors,
            warnings,
            stats,
        }
    }
}

//! # impc Compiler - AST to accumulator-machine assembly
//!
//! This module lowers a program handed over by the front end into a linear
//! instruction stream for the accumulator machine.
//!
//! ## Architecture
//!
//! ```text
//! AST → Call graph → Codegen (symbols + assembler) → Label resolution → Verify → Assembly
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use impc::compiler::{Compiler, CompileOptions};
//!
//! let compiler = Compiler::new(CompileOptions::default());
//! let result = compiler.compile(&program)?;
//! std::fs::write("program.mr", result.assembly())?;
//! ```

pub mod assembler;
pub mod call_graph;
pub mod codegen;
pub mod instruction;
pub mod memory;
pub mod symbols;
pub mod verifier;

pub use assembler::{Assembler, JumpKind, Label};
pub use call_graph::CallGraph;
pub use codegen::{CodeGenerator, GeneratedCode};
pub use instruction::{parse_assembly, to_assembly, Address, Instruction};
pub use symbols::{Scope, SymbolTable};
pub use verifier::{ProgramStats, Verifier, VerifyError, VerifyResult};

use crate::ast::Program;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Compilation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Maximum static call sites (return slots) per procedure
    pub max_return_slots: usize,
    /// Warn when a scalar is read before any assignment reaches it
    pub warn_uninitialized: bool,
    /// Run the verifier over the finished program
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_return_slots: 100,
            warn_uninitialized: true,
            verify: true,
        }
    }
}

/// Compilation result with metadata
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Final instruction stream
    pub instructions: Vec<Instruction>,
    /// Warnings generated during compilation
    pub warnings: Vec<String>,
    /// Program statistics
    pub stats: CompileStats,
}

/// Statistics gathered while compiling
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileStats {
    /// Number of emitted instructions
    pub instruction_count: usize,
    /// Sum of static instruction costs
    pub estimated_cost: u64,
    /// Number of procedures
    pub procedures: usize,
    /// Number of static call sites
    pub call_sites: usize,
}

impl CompileResult {
    /// Render the program as newline-separated assembly
    pub fn assembly(&self) -> String {
        to_assembly(&self.instructions)
    }
}

/// AST to assembly compiler
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Active options
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a program
    pub fn compile(&self, program: &Program) -> Result<CompileResult> {
        // Phase 1: Count call sites to size the return-slot pools
        let graph = CallGraph::build(program, self.options.max_return_slots)?;

        // Phase 2: Generate and resolve labels
        let generated =
            CodeGenerator::new(self.options.warn_uninitialized).generate(program, &graph)?;
        let mut warnings = generated.warnings;

        // Phase 3: Verify
        let program_stats = if self.options.verify {
            let verification = Verifier::new().verify(&generated.instructions);
            if !verification.valid {
                let error_msgs: Vec<String> =
                    verification.errors.iter().map(|e| e.to_string()).collect();
                return Err(Error::VerificationFailed(error_msgs.join("; ")));
            }
            for warning in &verification.warnings {
                warn!("{}", warning);
            }
            warnings.extend(verification.warnings);
            verification.stats
        } else {
            ProgramStats {
                instruction_count: generated.instructions.len(),
                estimated_cost: generated.instructions.iter().map(Instruction::cost).sum(),
                ..ProgramStats::default()
            }
        };

        let stats = CompileStats {
            instruction_count: program_stats.instruction_count,
            estimated_cost: program_stats.estimated_cost,
            procedures: program.procedures.len(),
            call_sites: graph.total_call_sites(),
        };
        debug!(
            instructions = stats.instruction_count,
            estimated_cost = stats.estimated_cost,
            warnings = warnings.len(),
            "compilation finished"
        );

        Ok(CompileResult {
            instructions: generated.instructions,
            warnings,
            stats,
        })
    }

    /// Compile a program handed over as JSON
    pub fn compile_json(&self, json: &str) -> Result<CompileResult> {
        let program: Program =
            serde_json::from_str(json).map_err(|e| Error::InvalidAst(e.to_string()))?;
        self.compile(&program)
    }
}

//! # Code Generator
//!
//! Lowers the AST into target instructions against symbolic labels.
//!
//! ## Program shape
//!
//! ```text
//! JUMP main
//! <procedure 1 body> LOADI current; STORE 14; RTRN 14
//! ...
//! main: <main body>
//! HALT
//! ```
//!
//! Expression lowering lives in `expr`, the multiply/divide routines in
//! `arith`, conditions and structured control in `control`, procedure calls
//! in `calls`.

mod arith;
mod calls;
mod control;
mod expr;

use super::assembler::{Assembler, JumpKind};
use super::call_graph::CallGraph;
use super::instruction::Instruction;
use super::memory;
use super::symbols::{Binding, Scope, SymbolTable};
use crate::ast::{Command, Identifier, Program, Value};
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

use expr::Place;

/// Output of one code generation run
#[derive(Debug, Clone)]
pub struct GeneratedCode {
    /// Final, label-resolved instructions
    pub instructions: Vec<Instruction>,
    /// Non-fatal diagnostics
    pub warnings: Vec<String>,
}

/// AST to instruction lowering
pub struct CodeGenerator {
    asm: Assembler,
    symbols: SymbolTable,
    warn_uninitialized: bool,
    warnings: Vec<String>,
    warned: HashSet<(Option<String>, String)>,
}

impl CodeGenerator {
    /// Create a generator; `warn_uninitialized` enables read-before-assign diagnostics
    pub fn new(warn_uninitialized: bool) -> Self {
        Self {
            asm: Assembler::new(),
            symbols: SymbolTable::new(),
            warn_uninitialized,
            warnings: Vec::new(),
            warned: HashSet::new(),
        }
    }

    /// Generate the whole program
    pub fn generate(mut self, program: &Program, graph: &CallGraph) -> Result<GeneratedCode> {
        let main = self.asm.new_label();
        self.asm.jump(JumpKind::Always, main);

        for proc in &program.procedures {
            let id = self
                .symbols
                .declare_procedure(proc, graph.call_sites(&proc.name))?;
            let entry = self.asm.here();
            self.symbols.set_entry(id, entry);

            let start = self.asm.position();
            self.gen_block(Scope::Procedure(id), &proc.commands)?;

            let current = self.symbols.procedure(id).current_slot;
            self.asm.emit(Instruction::Loadi(current));
            self.asm.emit(Instruction::Store(memory::TRAMPOLINE));
            self.asm.emit(Instruction::Rtrn(memory::TRAMPOLINE));

            debug!(
                procedure = %proc.name,
                start,
                instructions = self.asm.position() - start,
                "procedure body generated"
            );
        }

        self.asm.bind(main);
        for decl in &program.main.declarations {
            self.symbols.declare(Scope::Main, decl)?;
        }
        self.gen_block(Scope::Main, &program.main.commands)?;
        self.asm.emit(Instruction::Halt);

        let instructions = self.asm.finish()?;
        Ok(GeneratedCode {
            instructions,
            warnings: self.warnings,
        })
    }

    pub(crate) fn gen_block(&mut self, scope: Scope, commands: &[Command]) -> Result<()> {
        for cmd in commands {
            self.gen_command(scope, cmd)?;
        }
        Ok(())
    }

    /// Check a block removed by condition folding
    ///
    /// The block is lowered into a scratch buffer so every semantic check
    /// applies; its code and its effects on the symbol table are discarded.
    pub(crate) fn check_dead_block(&mut self, scope: Scope, commands: &[Command]) -> Result<()> {
        let asm = std::mem::take(&mut self.asm);
        let symbols = self.symbols.clone();
        let warned = self.warned.clone();
        let warnings = self.warnings.len();

        let checked = self.gen_block(scope, commands);

        self.asm = asm;
        self.symbols = symbols;
        self.warned = warned;
        self.warnings.truncate(warnings);
        checked
    }

    fn gen_command(&mut self, scope: Scope, cmd: &Command) -> Result<()> {
        match cmd {
            Command::Assign { target, value } => {
                self.check_writable(scope, target)?;
                let place = self.place(scope, target)?;
                match place {
                    Place::Direct(addr) => {
                        self.gen_expression(scope, value)?;
                        self.asm.emit(Instruction::Store(addr));
                    }
                    Place::Indirect(cell) => {
                        self.gen_expression(scope, value)?;
                        self.asm.emit(Instruction::Storei(cell));
                    }
                    Place::Element(element) => {
                        self.gen_element_address(element);
                        self.asm.emit(Instruction::Store(memory::TARGET));
                        self.gen_expression(scope, value)?;
                        self.asm.emit(Instruction::Storei(memory::TARGET));
                    }
                }
                self.mark_assigned(scope, target);
                Ok(())
            }

            Command::Read(target) => {
                self.check_writable(scope, target)?;
                match self.place(scope, target)? {
                    Place::Direct(addr) => self.asm.emit(Instruction::Get(addr)),
                    Place::Indirect(cell) => {
                        self.asm.emit(Instruction::Get(memory::ACC));
                        self.asm.emit(Instruction::Storei(cell));
                    }
                    Place::Element(element) => {
                        self.gen_element_address(element);
                        self.asm.emit(Instruction::Store(memory::TARGET));
                        self.asm.emit(Instruction::Get(memory::ACC));
                        self.asm.emit(Instruction::Storei(memory::TARGET));
                    }
                }
                self.mark_assigned(scope, target);
                Ok(())
            }

            Command::Write(value) => {
                match value {
                    Value::Num(k) => {
                        self.asm.emit(Instruction::Set(*k));
                        self.asm.emit(Instruction::Put(memory::ACC));
                    }
                    Value::Id(ident) => match self.operand_place(scope, ident)? {
                        Place::Direct(addr) => self.asm.emit(Instruction::Put(addr)),
                        place => {
                            self.load_place(place);
                            self.asm.emit(Instruction::Put(memory::ACC));
                        }
                    },
                }
                Ok(())
            }

            Command::If {
                condition,
                then_branch,
            } => self.gen_if(scope, condition, then_branch, None),

            Command::IfElse {
                condition,
                then_branch,
                else_branch,
            } => self.gen_if(scope, condition, then_branch, Some(else_branch)),

            Command::While { condition, body } => self.gen_while(scope, condition, body),

            Command::Repeat { body, condition } => self.gen_repeat(scope, body, condition),

            Command::For {
                iterator,
                from,
                to,
                direction,
                body,
            } => self.gen_for(scope, iterator, from, to, *direction, body),

            Command::Call { name, args } => self.gen_call(scope, name, args),
        }
    }

    /// Reject writes to loop iterators
    fn check_writable(&self, scope: Scope, target: &Identifier) -> Result<()> {
        if let Identifier::Scalar(name) = target {
            if let Ok(Binding::Iterator(_)) = self.symbols.resolve(scope, name) {
                return Err(Error::IteratorModification { name: name.clone() });
            }
        }
        Ok(())
    }

    fn mark_assigned(&mut self, scope: Scope, target: &Identifier) {
        if let Identifier::Scalar(name) = target {
            self.symbols.mark_initialized(scope, name);
        }
    }

    /// Record a read of a scalar that was never assigned
    fn warn_uninitialized_read(&mut self, scope: Scope, name: &str) {
        if !self.warn_uninitialized {
            return;
        }
        let owner = match scope {
            Scope::Main => None,
            Scope::Procedure(id) => Some(self.symbols.procedure(id).name.clone()),
        };
        if !self.warned.insert((owner.clone(), name.to_string())) {
            return;
        }
        let message = match owner {
            None => format!("variable '{}' may be read before it is assigned", name),
            Some(proc) => format!(
                "variable '{}' in procedure '{}' may be read before it is assigned",
                name, proc
            ),
        };
        warn!("{}", message);
        self.warnings.push(message);
    }
}

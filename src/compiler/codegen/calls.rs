//! Procedure call lowering
//!
//! Every parameter is a reference: a scalar parameter cell receives the
//! address of the argument, an array parameter cell the index-zero origin of
//! the argument array. The return address goes into the callee's next free
//! return slot and the callee's current-slot cell is pointed at it, so the
//! epilogue `LOADI current; STORE 14; RTRN 14` returns to this call site.

use super::CodeGenerator;
use crate::compiler::assembler::JumpKind;
use crate::compiler::instruction::Instruction;
use crate::compiler::symbols::{Binding, ParamKind, Scope};
use crate::{Error, Result};
use tracing::trace;

impl CodeGenerator {
    pub(super) fn gen_call(&mut self, scope: Scope, name: &str, args: &[String]) -> Result<()> {
        let id = self.symbols.procedure_id(name).ok_or_else(|| Error::Undeclared {
            kind: "procedure",
            name: name.to_string(),
        })?;
        if let Scope::Procedure(caller) = scope {
            if caller == id {
                return Err(Error::Recursion {
                    procedure: name.to_string(),
                });
            }
        }

        let callee = self.symbols.procedure(id);
        let entry = callee.entry.ok_or_else(|| Error::CallOrder {
            caller: match scope {
                Scope::Main => "main".to_string(),
                Scope::Procedure(caller) => self.symbols.procedure(caller).name.clone(),
            },
            callee: name.to_string(),
        })?;
        if callee.params.len() != args.len() {
            return Err(Error::Arity {
                procedure: name.to_string(),
                expected: callee.params.len(),
                got: args.len(),
            });
        }
        let params: Vec<_> = callee.params.iter().map(|p| (p.kind, p.cell)).collect();

        for (arg, (kind, cell)) in args.iter().zip(params) {
            let binding = self.symbols.resolve(scope, arg)?;
            let mismatch = |expected: &'static str| Error::TypeMismatch {
                name: arg.clone(),
                expected,
                got: binding.shape(),
            };
            match (kind, binding) {
                (_, Binding::Iterator(_)) => {
                    return Err(Error::IteratorModification { name: arg.clone() })
                }
                (ParamKind::Scalar, Binding::Variable(var)) => {
                    self.asm.emit(Instruction::Set(var.address as i64));
                    self.symbols.mark_initialized(scope, arg);
                }
                (ParamKind::Scalar, Binding::ScalarParam { cell: outer })
                | (ParamKind::Array, Binding::ArrayParam { cell: outer }) => {
                    self.asm.emit(Instruction::Load(outer));
                }
                (ParamKind::Array, Binding::Array(array)) => {
                    self.asm.emit(Instruction::Set(array.origin));
                }
                (ParamKind::Scalar, _) => return Err(mismatch("scalar")),
                (ParamKind::Array, _) => return Err(mismatch("array")),
            }
            self.asm.emit(Instruction::Store(cell));
        }

        let slot = self.symbols.next_return_slot(id)?;
        let current = self.symbols.procedure(id).current_slot;
        let ret = self.asm.new_label();
        self.asm.set_address(ret);
        self.asm.emit(Instruction::Store(slot));
        self.asm.emit(Instruction::Set(slot as i64));
        self.asm.emit(Instruction::Store(current));
        self.asm.jump(JumpKind::Always, entry);
        self.asm.bind(ret);

        trace!(callee = name, slot, "call site lowered");
        Ok(())
    }
}

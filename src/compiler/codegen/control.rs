//! Conditions and structured control flow
//!
//! A condition computes `left − right` into the accumulator and jumps to a
//! "false" label on the sign patterns that falsify it; the true case falls
//! through. Conditions whose outcome is known at compile time (identical
//! operands, or two literals) are folded and the dead branch is not emitted.

use super::CodeGenerator;
use crate::ast::{Command, Condition, Direction, RelOp, Value};
use crate::compiler::assembler::{JumpKind, Label};
use crate::compiler::instruction::Instruction;
use crate::compiler::symbols::Scope;
use crate::{Error, Result};
use tracing::trace;

/// Jumps taken to the false label for each operator, applied to `left − right`
fn false_jumps(op: RelOp) -> &'static [JumpKind] {
    match op {
        RelOp::Eq => &[JumpKind::IfPositive, JumpKind::IfNegative],
        RelOp::Ne => &[JumpKind::IfZero],
        RelOp::Gt => &[JumpKind::IfZero, JumpKind::IfNegative],
        RelOp::Lt => &[JumpKind::IfZero, JumpKind::IfPositive],
        RelOp::Ge => &[JumpKind::IfNegative],
        RelOp::Le => &[JumpKind::IfPositive],
    }
}

/// Compile-time value of a condition, if it has one
pub(crate) fn fold_condition(cond: &Condition) -> Option<bool> {
    if let (Value::Num(a), Value::Num(b)) = (&cond.left, &cond.right) {
        return Some(cond.op.holds(*a, *b));
    }
    if cond.left == cond.right {
        return Some(cond.op.reflexive());
    }
    None
}

impl CodeGenerator {
    /// Resolve both operands without emitting code
    fn check_condition(&self, scope: Scope, cond: &Condition) -> Result<()> {
        for value in [&cond.left, &cond.right] {
            if let Value::Id(ident) = value {
                self.place(scope, ident)?;
            }
        }
        Ok(())
    }

    /// Emit `cond`, jumping to `on_false` when it does not hold
    pub(super) fn gen_condition(&mut self, scope: Scope, cond: &Condition, on_false: Label) -> Result<()> {
        self.gen_difference(scope, &cond.left, &cond.right, false)?;
        for kind in false_jumps(cond.op) {
            self.asm.jump(*kind, on_false);
        }
        Ok(())
    }

    pub(super) fn gen_if(
        &mut self,
        scope: Scope,
        cond: &Condition,
        then_branch: &[Command],
        else_branch: Option<&Vec<Command>>,
    ) -> Result<()> {
        self.check_condition(scope, cond)?;
        match fold_condition(cond) {
            Some(true) => {
                if let Some(commands) = else_branch {
                    trace!(condition = %cond, "dead branch elided");
                    self.check_dead_block(scope, commands)?;
                }
                return self.gen_block(scope, then_branch);
            }
            Some(false) => {
                trace!(condition = %cond, "dead branch elided");
                self.check_dead_block(scope, then_branch)?;
                return match else_branch {
                    Some(commands) => self.gen_block(scope, commands),
                    None => Ok(()),
                };
            }
            None => {}
        }

        let otherwise = self.asm.new_label();
        self.gen_condition(scope, cond, otherwise)?;
        self.gen_block(scope, then_branch)?;
        match else_branch {
            Some(commands) => {
                let end = self.asm.new_label();
                self.asm.jump(JumpKind::Always, end);
                self.asm.bind(otherwise);
                self.gen_block(scope, commands)?;
                self.asm.bind(end);
            }
            None => self.asm.bind(otherwise),
        }
        Ok(())
    }

    pub(super) fn gen_while(&mut self, scope: Scope, cond: &Condition, body: &[Command]) -> Result<()> {
        self.check_condition(scope, cond)?;
        match fold_condition(cond) {
            Some(true) => {
                return Err(Error::InfiniteLoop {
                    condition: cond.to_string(),
                    holds: true,
                })
            }
            Some(false) => {
                trace!(condition = %cond, "loop never runs");
                return self.check_dead_block(scope, body);
            }
            None => {}
        }

        let head = self.asm.here();
        let exit = self.asm.new_label();
        self.gen_condition(scope, cond, exit)?;
        self.gen_block(scope, body)?;
        self.asm.jump(JumpKind::Always, head);
        self.asm.bind(exit);
        Ok(())
    }

    pub(super) fn gen_repeat(&mut self, scope: Scope, body: &[Command], cond: &Condition) -> Result<()> {
        self.check_condition(scope, cond)?;
        match fold_condition(cond) {
            Some(false) => {
                return Err(Error::InfiniteLoop {
                    condition: cond.to_string(),
                    holds: false,
                })
            }
            Some(true) => return self.gen_block(scope, body),
            None => {}
        }

        let start = self.asm.here();
        self.gen_block(scope, body)?;
        self.gen_condition(scope, cond, start)?;
        Ok(())
    }

    pub(super) fn gen_for(
        &mut self,
        scope: Scope,
        iterator: &str,
        from: &Value,
        to: &Value,
        direction: Direction,
        body: &[Command],
    ) -> Result<()> {
        if let (Value::Num(f), Value::Num(t)) = (from, to) {
            let empty = match direction {
                Direction::To => f > t,
                Direction::Downto => f < t,
            };
            if empty {
                return Err(Error::InvalidLoopRange {
                    iterator: iterator.to_string(),
                    from: *f,
                    to: *t,
                    direction: match direction {
                        Direction::To => "TO",
                        Direction::Downto => "DOWNTO",
                    },
                });
            }
        }

        // Bounds are resolved before the iterator name is bound
        for value in [from, to] {
            if let Value::Id(ident) = value {
                self.place(scope, ident)?;
            }
        }
        let it = self.symbols.declare_iterator(scope, iterator)?;
        let step: i64 = match direction {
            Direction::To => 1,
            Direction::Downto => -1,
        };

        self.load_value(scope, from)?;
        self.asm.emit(Instruction::Store(it.address));

        // The limit sits one step past the last value
        match to {
            Value::Num(t) if t.checked_add(step).is_some() => {
                self.asm.emit(Instruction::Set(t + step));
            }
            _ => {
                self.load_value(scope, to)?;
                self.asm.emit(Instruction::Store(it.limit));
                self.asm.emit(Instruction::Set(step));
                self.asm.emit(Instruction::Add(it.limit));
            }
        }
        self.asm.emit(Instruction::Store(it.limit));

        let head = self.asm.here();
        let exit = self.asm.new_label();
        self.asm.emit(Instruction::Load(it.address));
        self.asm.emit(Instruction::Sub(it.limit));
        self.asm.jump(JumpKind::IfZero, exit);
        let past = match direction {
            Direction::To => JumpKind::IfPositive,
            Direction::Downto => JumpKind::IfNegative,
        };
        self.asm.jump(past, exit);

        self.gen_block(scope, body)?;

        self.asm.emit(Instruction::Set(step));
        self.asm.emit(Instruction::Add(it.address));
        self.asm.emit(Instruction::Store(it.address));
        self.asm.jump(JumpKind::Always, head);
        self.asm.bind(exit);

        self.symbols.exit_iterator(iterator);
        Ok(())
    }
}

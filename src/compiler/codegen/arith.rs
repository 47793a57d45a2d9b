//! Software multiply, divide and modulo
//!
//! The machine has no multiplier or divider. Both routines work on absolute
//! values in the scratch cells of [`memory::arith`] and restore the sign at
//! the end:
//!
//! - multiply: shift-add (halve one operand, double the other), keeping
//!   `result + a·b = |left|·|right|` on every iteration
//! - divide/modulo: scale the divisor up by doubling, then walk it back down,
//!   subtracting wherever it fits; truncates toward zero and the remainder
//!   takes the sign of the dividend
//!
//! A zero operand short-circuits to 0, including a zero divisor.

use super::CodeGenerator;
use crate::ast::Value;
use crate::compiler::assembler::{JumpKind, Label};
use crate::compiler::instruction::{Address, Instruction};
use crate::compiler::memory::arith::{A, B, POWER, RESULT, SIGN_LEFT, SIGN_RIGHT, TEMP};
use crate::compiler::symbols::Scope;
use crate::Result;

impl CodeGenerator {
    /// Load `value`, jump to `zero` if it is 0, store `|value|` in `abs` and,
    /// if it was negative, run `on_negative` before continuing
    fn gen_absolute(
        &mut self,
        scope: Scope,
        value: &Value,
        abs: Address,
        zero: Label,
        on_negative: &[Instruction],
        on_positive: &[Instruction],
    ) -> Result<()> {
        let positive = self.asm.new_label();
        let done = self.asm.new_label();

        self.load_value(scope, value)?;
        self.asm.jump(JumpKind::IfZero, zero);
        self.asm.jump(JumpKind::IfPositive, positive);

        self.asm.emit(Instruction::Store(TEMP));
        self.asm.emit(Instruction::Set(0));
        self.asm.emit(Instruction::Sub(TEMP));
        self.asm.emit(Instruction::Store(abs));
        for instr in on_negative {
            self.asm.emit(*instr);
        }
        self.asm.jump(JumpKind::Always, done);

        self.asm.bind(positive);
        self.asm.emit(Instruction::Store(abs));
        for instr in on_positive {
            self.asm.emit(*instr);
        }
        self.asm.bind(done);
        Ok(())
    }

    /// `acc ← left * right`
    pub(super) fn gen_multiply(&mut self, scope: Scope, left: &Value, right: &Value) -> Result<()> {
        let zero = self.asm.new_label();
        let end = self.asm.new_label();
        let done = self.asm.new_label();
        let even = self.asm.new_label();
        let positive = self.asm.new_label();

        // SIGN_LEFT holds the sign of the product
        self.asm.emit(Instruction::Set(1));
        self.asm.emit(Instruction::Store(SIGN_LEFT));
        self.gen_absolute(
            scope,
            right,
            B,
            zero,
            &[Instruction::Set(-1), Instruction::Store(SIGN_LEFT)],
            &[],
        )?;
        self.gen_absolute(
            scope,
            left,
            A,
            zero,
            &[
                Instruction::Set(0),
                Instruction::Sub(SIGN_LEFT),
                Instruction::Store(SIGN_LEFT),
            ],
            &[],
        )?;
        self.asm.emit(Instruction::Set(0));
        self.asm.emit(Instruction::Store(RESULT));

        let head = self.asm.here();
        self.asm.emit(Instruction::Load(B));
        self.asm.jump(JumpKind::IfZero, done);
        self.asm.emit(Instruction::Half);
        self.asm.emit(Instruction::Store(TEMP));
        // 2·(b/2) − b is 0 for even b, −1 for odd b
        self.asm.emit(Instruction::Add(TEMP));
        self.asm.emit(Instruction::Sub(B));
        self.asm.jump(JumpKind::IfZero, even);
        self.asm.emit(Instruction::Load(RESULT));
        self.asm.emit(Instruction::Add(A));
        self.asm.emit(Instruction::Store(RESULT));
        self.asm.bind(even);
        self.asm.emit(Instruction::Load(TEMP));
        self.asm.emit(Instruction::Store(B));
        self.asm.emit(Instruction::Load(A));
        self.asm.emit(Instruction::Add(A));
        self.asm.emit(Instruction::Store(A));
        self.asm.jump(JumpKind::Always, head);

        self.asm.bind(done);
        self.asm.emit(Instruction::Load(SIGN_LEFT));
        self.asm.jump(JumpKind::IfPositive, positive);
        self.asm.emit(Instruction::Set(0));
        self.asm.emit(Instruction::Sub(RESULT));
        self.asm.jump(JumpKind::Always, end);
        self.asm.bind(positive);
        self.asm.emit(Instruction::Load(RESULT));
        self.asm.jump(JumpKind::Always, end);

        self.asm.bind(zero);
        self.asm.emit(Instruction::Set(0));
        self.asm.bind(end);
        Ok(())
    }

    /// `acc ← left / right`, or `left % right` when `modulo` is set
    pub(super) fn gen_divide(&mut self, scope: Scope, left: &Value, right: &Value, modulo: bool) -> Result<()> {
        // A: running remainder, B: scaled divisor, RESULT: quotient, POWER: scale
        let zero = self.asm.new_label();
        let end = self.asm.new_label();
        let reduce = self.asm.new_label();
        let finish = self.asm.new_label();
        let positive = self.asm.new_label();

        self.gen_absolute(
            scope,
            right,
            B,
            zero,
            &[Instruction::Set(-1), Instruction::Store(SIGN_RIGHT)],
            &[Instruction::Set(1), Instruction::Store(SIGN_RIGHT)],
        )?;
        self.gen_absolute(
            scope,
            left,
            A,
            zero,
            &[Instruction::Set(-1), Instruction::Store(SIGN_LEFT)],
            &[Instruction::Set(1), Instruction::Store(SIGN_LEFT)],
        )?;
        self.asm.emit(Instruction::Set(0));
        self.asm.emit(Instruction::Store(RESULT));
        self.asm.emit(Instruction::Set(1));
        self.asm.emit(Instruction::Store(POWER));

        // Double the divisor until it exceeds the dividend
        let scale = self.asm.here();
        self.asm.emit(Instruction::Load(B));
        self.asm.emit(Instruction::Sub(A));
        self.asm.jump(JumpKind::IfPositive, reduce);
        self.asm.emit(Instruction::Load(B));
        self.asm.emit(Instruction::Add(B));
        self.asm.emit(Instruction::Store(B));
        self.asm.emit(Instruction::Load(POWER));
        self.asm.emit(Instruction::Add(POWER));
        self.asm.emit(Instruction::Store(POWER));
        self.asm.jump(JumpKind::Always, scale);

        // Halve it back down, subtracting wherever it fits
        self.asm.bind(reduce);
        self.asm.emit(Instruction::Load(POWER));
        self.asm.emit(Instruction::Half);
        self.asm.jump(JumpKind::IfZero, finish);
        self.asm.emit(Instruction::Store(POWER));
        self.asm.emit(Instruction::Load(B));
        self.asm.emit(Instruction::Half);
        self.asm.emit(Instruction::Store(B));
        self.asm.emit(Instruction::Load(A));
        self.asm.emit(Instruction::Sub(B));
        self.asm.jump(JumpKind::IfNegative, reduce);
        self.asm.emit(Instruction::Store(A));
        self.asm.emit(Instruction::Load(RESULT));
        self.asm.emit(Instruction::Add(POWER));
        self.asm.emit(Instruction::Store(RESULT));
        self.asm.jump(JumpKind::Always, reduce);

        self.asm.bind(finish);
        if modulo {
            self.asm.emit(Instruction::Load(SIGN_LEFT));
            self.asm.jump(JumpKind::IfPositive, positive);
            self.asm.emit(Instruction::Set(0));
            self.asm.emit(Instruction::Sub(A));
            self.asm.jump(JumpKind::Always, end);
            self.asm.bind(positive);
            self.asm.emit(Instruction::Load(A));
        } else {
            self.asm.emit(Instruction::Load(SIGN_LEFT));
            self.asm.emit(Instruction::Sub(SIGN_RIGHT));
            self.asm.jump(JumpKind::IfZero, positive);
            self.asm.emit(Instruction::Set(0));
            self.asm.emit(Instruction::Sub(RESULT));
            self.asm.jump(JumpKind::Always, end);
            self.asm.bind(positive);
            self.asm.emit(Instruction::Load(RESULT));
        }
        self.asm.jump(JumpKind::Always, end);

        self.asm.bind(zero);
        self.asm.emit(Instruction::Set(0));
        self.asm.bind(end);
        Ok(())
    }
}

//! Operand access and expression lowering

use super::CodeGenerator;
use crate::ast::{BinaryOp, Expression, Identifier, Value};
use crate::compiler::instruction::{Address, Instruction};
use crate::compiler::memory;
use crate::compiler::symbols::{Binding, ElementAddress, IndexRef, IndexSource, Scope};
use crate::{Error, Result};

/// Where an identifier's value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Place {
    /// Fixed cell
    Direct(Address),
    /// Cell holding the address of the value (scalar parameter)
    Indirect(Address),
    /// Array element whose address is computed at run time
    Element(ElementAddress),
}

impl CodeGenerator {
    /// Resolve an identifier to its storage, without emitting code
    pub(super) fn place(&self, scope: Scope, ident: &Identifier) -> Result<Place> {
        match ident {
            Identifier::Scalar(name) => match self.symbols.resolve(scope, name)? {
                Binding::Variable(var) => Ok(Place::Direct(var.address)),
                Binding::Iterator(it) => Ok(Place::Direct(it.address)),
                Binding::ScalarParam { cell } => Ok(Place::Indirect(cell)),
                binding => Err(Error::TypeMismatch {
                    name: name.clone(),
                    expected: "scalar",
                    got: binding.shape(),
                }),
            },
            Identifier::ArrayNum(array, index) => {
                self.element_place(scope, array, IndexRef::Literal(*index))
            }
            Identifier::ArrayVar(array, index) => {
                self.element_place(scope, array, IndexRef::Name(index.as_str()))
            }
        }
    }

    fn element_place(&self, scope: Scope, array: &str, index: IndexRef<'_>) -> Result<Place> {
        match self.symbols.address_of_element(scope, array, &index)? {
            ElementAddress::Static(addr) => Ok(Place::Direct(addr)),
            element => Ok(Place::Element(element)),
        }
    }

    /// Like [`place`](Self::place), for an identifier that is about to be read
    pub(super) fn operand_place(&mut self, scope: Scope, ident: &Identifier) -> Result<Place> {
        let place = self.place(scope, ident)?;
        if let Identifier::Scalar(name) = ident {
            if let Ok(Binding::Variable(var)) = self.symbols.resolve(scope, name) {
                if !var.initialized {
                    self.warn_uninitialized_read(scope, name);
                }
            }
        }
        Ok(place)
    }

    /// Leave the address of a computed element in the accumulator
    pub(super) fn gen_element_address(&mut self, element: ElementAddress) {
        match element {
            ElementAddress::Static(addr) => self.asm.emit(Instruction::Set(addr as i64)),
            ElementAddress::Offset { origin, index } => match index {
                IndexSource::Literal(i) => self.asm.emit(Instruction::Set(origin + i)),
                IndexSource::Direct(addr) => {
                    self.asm.emit(Instruction::Set(origin));
                    self.asm.emit(Instruction::Add(addr));
                }
                IndexSource::Indirect(cell) => {
                    self.asm.emit(Instruction::Loadi(cell));
                    self.asm.emit(Instruction::Store(memory::INDEX));
                    self.asm.emit(Instruction::Set(origin));
                    self.asm.emit(Instruction::Add(memory::INDEX));
                }
            },
            ElementAddress::Param { cell, index } => {
                match index {
                    IndexSource::Literal(i) => self.asm.emit(Instruction::Set(i)),
                    IndexSource::Direct(addr) => self.asm.emit(Instruction::Load(addr)),
                    IndexSource::Indirect(index_cell) => {
                        self.asm.emit(Instruction::Loadi(index_cell))
                    }
                }
                self.asm.emit(Instruction::Add(cell));
            }
        }
    }

    /// `acc ← value at place`
    pub(super) fn load_place(&mut self, place: Place) {
        match place {
            Place::Direct(addr) => self.asm.emit(Instruction::Load(addr)),
            Place::Indirect(cell) => self.asm.emit(Instruction::Loadi(cell)),
            Place::Element(element) => {
                self.gen_element_address(element);
                self.asm.emit(Instruction::Store(memory::INDEX));
                self.asm.emit(Instruction::Loadi(memory::INDEX));
            }
        }
    }

    /// `acc ← value`
    pub(super) fn load_value(&mut self, scope: Scope, value: &Value) -> Result<()> {
        match value {
            Value::Num(k) => self.asm.emit(Instruction::Set(*k)),
            Value::Id(ident) => {
                let place = self.operand_place(scope, ident)?;
                self.load_place(place);
            }
        }
        Ok(())
    }

    /// Cell usable directly as an `ADD`/`SUB` operand, if the value has one
    pub(super) fn direct_operand(&mut self, scope: Scope, value: &Value) -> Result<Option<Address>> {
        match value {
            Value::Id(ident) => match self.operand_place(scope, ident)? {
                Place::Direct(addr) => Ok(Some(addr)),
                _ => Ok(None),
            },
            Value::Num(_) => Ok(None),
        }
    }

    /// `acc ← left ± right`, spilling the right operand when it has no fixed cell
    pub(super) fn gen_difference(&mut self, scope: Scope, left: &Value, right: &Value, add: bool) -> Result<()> {
        let op = |addr: Address| {
            if add {
                Instruction::Add(addr)
            } else {
                Instruction::Sub(addr)
            }
        };
        match self.direct_operand(scope, right)? {
            Some(addr) => {
                self.load_value(scope, left)?;
                self.asm.emit(op(addr));
            }
            None => {
                self.load_value(scope, right)?;
                self.asm.emit(Instruction::Store(memory::OPERAND));
                self.load_value(scope, left)?;
                self.asm.emit(op(memory::OPERAND));
            }
        }
        Ok(())
    }

    /// `acc ← expression`
    pub(super) fn gen_expression(&mut self, scope: Scope, expr: &Expression) -> Result<()> {
        let (op, left, right) = match expr {
            Expression::Value(value) => return self.load_value(scope, value),
            Expression::Binary { op, left, right } => (*op, left, right),
        };

        // Operands are resolved even when the result folds away.
        for value in [left, right] {
            if let Value::Id(ident) = value {
                self.place(scope, ident)?;
            }
        }

        if let (Value::Num(a), Value::Num(b)) = (left, right) {
            if let Some(folded) = fold(op, *a, *b) {
                self.asm.emit(Instruction::Set(folded));
                return Ok(());
            }
        }

        match op {
            BinaryOp::Add => self.gen_difference(scope, left, right, true),
            BinaryOp::Sub => self.gen_difference(scope, left, right, false),
            BinaryOp::Mul => {
                if matches!(left, Value::Num(0)) || matches!(right, Value::Num(0)) {
                    self.asm.emit(Instruction::Set(0));
                    return Ok(());
                }
                self.gen_multiply(scope, left, right)
            }
            BinaryOp::Div | BinaryOp::Mod => {
                if matches!(left, Value::Num(0)) || matches!(right, Value::Num(0)) {
                    self.asm.emit(Instruction::Set(0));
                    return Ok(());
                }
                self.gen_divide(scope, left, right, op == BinaryOp::Mod)
            }
        }
    }
}

/// Constant-fold `a op b`; `None` when the result does not fit a literal
fn fold(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div if b == 0 => Some(0),
        BinaryOp::Mod if b == 0 => Some(0),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod => a.checked_rem(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_truncates_toward_zero() {
        assert_eq!(fold(BinaryOp::Div, -7, 2), Some(-3));
        assert_eq!(fold(BinaryOp::Mod, -7, 2), Some(-1));
        assert_eq!(fold(BinaryOp::Mod, 7, -2), Some(1));
    }

    #[test]
    fn test_fold_zero_divisor() {
        assert_eq!(fold(BinaryOp::Div, 5, 0), Some(0));
        assert_eq!(fold(BinaryOp::Mod, 5, 0), Some(0));
    }

    #[test]
    fn test_fold_overflow_is_left_to_runtime() {
        assert_eq!(fold(BinaryOp::Add, i64::MAX, 1), None);
        assert_eq!(fold(BinaryOp::Div, i64::MIN, -1), None);
    }
}

//! Label-based instruction buffer
//!
//! Code is emitted against symbolic labels. Jumps are recorded as pending
//! references and rewritten into relative offsets by [`Assembler::finish`]
//! once every label has a position. Return addresses (`SET` of a label) are
//! rewritten into absolute instruction indices.

use super::instruction::Instruction;
use crate::{Error, Result};
use tracing::{debug, trace};

/// Symbolic jump target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

impl Label {
    /// Numeric id, as shown in unresolved-label errors
    pub fn id(self) -> usize {
        self.0
    }
}

/// Branch condition of a pending jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    /// `JUMP`
    Always,
    /// `JPOS`
    IfPositive,
    /// `JZERO`
    IfZero,
    /// `JNEG`
    IfNegative,
}

impl JumpKind {
    fn with_offset(self, offset: i64) -> Instruction {
        match self {
            JumpKind::Always => Instruction::Jump(offset),
            JumpKind::IfPositive => Instruction::Jpos(offset),
            JumpKind::IfZero => Instruction::Jzero(offset),
            JumpKind::IfNegative => Instruction::Jneg(offset),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Fixed(Instruction),
    Jump(JumpKind, Label),
    SetAddress(Label),
}

/// Instruction buffer with deferred label resolution
#[derive(Debug, Default)]
pub struct Assembler {
    slots: Vec<Slot>,
    labels: Vec<Option<usize>>,
}

impl Assembler {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, unbound label
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the position of the next emitted instruction
    pub fn bind(&mut self, label: Label) {
        debug_assert!(self.labels[label.0].is_none(), "label bound twice");
        trace!(label = label.id(), position = self.slots.len(), "bind label");
        self.labels[label.0] = Some(self.slots.len());
    }

    /// Allocate a label bound to the current position
    pub fn here(&mut self) -> Label {
        let label = self.new_label();
        self.bind(label);
        label
    }

    /// Append a fully known instruction
    pub fn emit(&mut self, instr: Instruction) {
        self.slots.push(Slot::Fixed(instr));
    }

    /// Append a jump whose offset is resolved later
    pub fn jump(&mut self, kind: JumpKind, target: Label) {
        self.slots.push(Slot::Jump(kind, target));
    }

    /// Append `SET <absolute index of label>`
    pub fn set_address(&mut self, target: Label) {
        self.slots.push(Slot::SetAddress(target));
    }

    /// Index the next instruction will occupy
    pub fn position(&self) -> usize {
        self.slots.len()
    }

    /// Number of references still waiting for resolution
    pub fn pending(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot, Slot::Fixed(_)))
            .count()
    }

    /// Resolve every label reference and return the final program
    pub fn finish(self) -> Result<Vec<Instruction>> {
        let pending = self.pending();
        let mut program = Vec::with_capacity(self.slots.len());

        for (site, slot) in self.slots.into_iter().enumerate() {
            let instr = match slot {
                Slot::Fixed(instr) => instr,
                Slot::Jump(kind, label) => {
                    let target = resolve(&self.labels, label)?;
                    kind.with_offset(target as i64 - site as i64)
                }
                Slot::SetAddress(label) => {
                    let target = resolve(&self.labels, label)?;
                    Instruction::Set(target as i64)
                }
            };
            program.push(instr);
        }

        debug!(
            instructions = program.len(),
            resolved = pending,
            "labels resolved"
        );
        Ok(program)
    }
}

fn resolve(labels: &[Option<usize>], label: Label) -> Result<usize> {
    labels
        .get(label.0)
        .copied()
        .flatten()
        .ok_or(Error::UnresolvedLabel(label.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_backward_jumps() {
        let mut asm = Assembler::new();
        let head = asm.here();
        let exit = asm.new_label();
        asm.emit(Instruction::Load(20));
        asm.jump(JumpKind::IfZero, exit);
        asm.emit(Instruction::Half);
        asm.jump(JumpKind::Always, head);
        asm.bind(exit);
        asm.emit(Instruction::Halt);
        assert_eq!(asm.pending(), 2);

        let program = asm.finish().unwrap();
        assert_eq!(
            program,
            vec![
                Instruction::Load(20),
                Instruction::Jzero(3),
                Instruction::Half,
                Instruction::Jump(-3),
                Instruction::Halt,
            ]
        );
    }

    #[test]
    fn test_set_address_is_absolute() {
        let mut asm = Assembler::new();
        asm.emit(Instruction::Halt);
        let ret = asm.new_label();
        asm.set_address(ret);
        asm.emit(Instruction::Store(16));
        asm.bind(ret);
        asm.emit(Instruction::Halt);
        let program = asm.finish().unwrap();
        assert_eq!(program[1], Instruction::Set(3));
    }

    #[test]
    fn test_unbound_label_is_an_error() {
        let mut asm = Assembler::new();
        let nowhere = asm.new_label();
        asm.jump(JumpKind::Always, nowhere);
        assert_eq!(asm.finish(), Err(Error::UnresolvedLabel(nowhere.id())));
    }
}

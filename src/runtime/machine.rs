//! Reference accumulator machine
//!
//! Memory is sparse and unbounded; unwritten cells read as 0. Cell 0 is the
//! accumulator. Cells hold `i128` so that programs working on full-range
//! `i64` values can be observed without wrapping; leaving the `i128` range
//! is reported as an error.

use crate::compiler::instruction::{parse_assembly, Address, Instruction};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// Simulator options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    /// Maximum number of executed instructions
    pub step_limit: u64,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            step_limit: 10_000_000,
        }
    }
}

/// Outcome of a run that reached `HALT`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Execution {
    /// Values written by `PUT`, in order
    pub output: Vec<i128>,
    /// Executed instructions, `HALT` included
    pub steps: u64,
    /// Accumulated instruction cost
    pub cost: u64,
}

/// Accumulator machine simulator
#[derive(Debug, Clone)]
pub struct Machine {
    program: Vec<Instruction>,
    memory: HashMap<Address, i128>,
    options: MachineOptions,
}

impl Machine {
    /// Load a program with default options
    pub fn new(program: Vec<Instruction>) -> Self {
        Self::with_options(program, MachineOptions::default())
    }

    /// Load a program with custom options
    pub fn with_options(program: Vec<Instruction>, options: MachineOptions) -> Self {
        Self {
            program,
            memory: HashMap::new(),
            options,
        }
    }

    /// Load a program from assembly text
    pub fn from_assembly(text: &str) -> Result<Self> {
        Ok(Self::new(parse_assembly(text)?))
    }

    /// Value of a memory cell after (or before) a run
    pub fn cell(&self, address: Address) -> i128 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    fn acc(&self) -> i128 {
        self.cell(0)
    }

    fn set_acc(&mut self, value: i128) {
        self.memory.insert(0, value);
    }

    /// Resolve `mem[cell]` as an address
    fn pointer(&self, cell: Address, pc: usize) -> Result<Address> {
        let value = self.cell(cell);
        Address::try_from(value).map_err(|_| Error::InvalidAddress { address: value, pc })
    }

    /// Run from instruction 0 until `HALT`, consuming `input` for `GET`
    ///
    /// Memory is kept between runs; create a fresh machine for a clean state.
    pub fn run(&mut self, input: &[i128]) -> Result<Execution> {
        let mut input: VecDeque<i128> = input.iter().copied().collect();
        let mut exec = Execution::default();
        let mut pc: usize = 0;

        loop {
            if exec.steps >= self.options.step_limit {
                return Err(Error::ExecutionLimitExceeded {
                    limit: self.options.step_limit,
                });
            }
            let instr = *self.program.get(pc).ok_or(Error::InvalidJump {
                target: pc as i128,
                pc: pc.saturating_sub(1),
            })?;
            trace!(pc, %instr, "step");
            exec.steps += 1;
            exec.cost += instr.cost();

            let overflow = Error::Overflow { pc };
            let mut next = pc as i128 + 1;
            match instr {
                Instruction::Get(a) => {
                    let value = input.pop_front().ok_or(Error::InputExhausted { pc })?;
                    self.memory.insert(a, value);
                }
                Instruction::Put(a) => exec.output.push(self.cell(a)),
                Instruction::Load(a) => {
                    let value = self.cell(a);
                    self.set_acc(value);
                }
                Instruction::Loadi(a) => {
                    let target = self.pointer(a, pc)?;
                    let value = self.cell(target);
                    self.set_acc(value);
                }
                Instruction::Store(a) => {
                    let acc = self.acc();
                    self.memory.insert(a, acc);
                }
                Instruction::Storei(a) => {
                    let target = self.pointer(a, pc)?;
                    let acc = self.acc();
                    self.memory.insert(target, acc);
                }
                Instruction::Add(a) => {
                    let value = self.acc().checked_add(self.cell(a)).ok_or(overflow)?;
                    self.set_acc(value);
                }
                Instruction::Sub(a) => {
                    let value = self.acc().checked_sub(self.cell(a)).ok_or(overflow)?;
                    self.set_acc(value);
                }
                Instruction::Set(k) => self.set_acc(k as i128),
                Instruction::Half => {
                    let value = self.acc().div_euclid(2);
                    self.set_acc(value);
                }
                Instruction::Jump(d) => next = pc as i128 + d as i128,
                Instruction::Jpos(d) if self.acc() > 0 => next = pc as i128 + d as i128,
                Instruction::Jzero(d) if self.acc() == 0 => next = pc as i128 + d as i128,
                Instruction::Jneg(d) if self.acc() < 0 => next = pc as i128 + d as i128,
                Instruction::Jpos(_) | Instruction::Jzero(_) | Instruction::Jneg(_) => {}
                Instruction::Rtrn(a) => next = self.cell(a),
                Instruction::Halt => {
                    debug!(
                        steps = exec.steps,
                        cost = exec.cost,
                        outputs = exec.output.len(),
                        "machine halted"
                    );
                    return Ok(exec);
                }
            }

            if next < 0 || next >= self.program.len() as i128 {
                return Err(Error::InvalidJump { target: next, pc });
            }
            pc = next as usize;
        }
    }
}

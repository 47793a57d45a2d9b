//! Target machine instruction set
//!
//! The machine has a single accumulator (aliased to memory cell 0), a flat
//! word-addressed memory and relative jumps. There is no multiply, divide or
//! modulo instruction; `HALF` is the only shift.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Memory cell index
pub type Address = u64;

/// Target machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// Read one input value into `mem[a]`
    Get(Address),
    /// Write `mem[a]` to the output
    Put(Address),
    /// `acc ← mem[a]`
    Load(Address),
    /// `acc ← mem[mem[a]]`
    Loadi(Address),
    /// `mem[a] ← acc`
    Store(Address),
    /// `mem[mem[a]] ← acc`
    Storei(Address),
    /// `acc ← acc + mem[a]`
    Add(Address),
    /// `acc ← acc − mem[a]`
    Sub(Address),
    /// `acc ← k`
    Set(i64),
    /// `acc ← floor(acc / 2)`
    Half,
    /// Relative jump
    Jump(i64),
    /// Relative jump if `acc > 0`
    Jpos(i64),
    /// Relative jump if `acc = 0`
    Jzero(i64),
    /// Relative jump if `acc < 0`
    Jneg(i64),
    /// Jump to the absolute instruction index stored in `mem[a]`
    Rtrn(Address),
    /// Stop execution
    Halt,
}

impl Instruction {
    /// Execution cost on the reference machine
    pub fn cost(&self) -> u64 {
        match self {
            Instruction::Get(_) | Instruction::Put(_) => 100,
            Instruction::Load(_) | Instruction::Store(_) => 10,
            Instruction::Loadi(_) | Instruction::Storei(_) => 20,
            Instruction::Add(_) | Instruction::Sub(_) => 10,
            Instruction::Set(_) => 50,
            Instruction::Half => 5,
            Instruction::Jump(_)
            | Instruction::Jpos(_)
            | Instruction::Jzero(_)
            | Instruction::Jneg(_) => 1,
            Instruction::Rtrn(_) => 10,
            Instruction::Halt => 0,
        }
    }

    /// Relative offset if this is a jump
    pub fn jump_offset(&self) -> Option<i64> {
        match self {
            Instruction::Jump(d)
            | Instruction::Jpos(d)
            | Instruction::Jzero(d)
            | Instruction::Jneg(d) => Some(*d),
            _ => None,
        }
    }

    /// Mnemonic as written in assembly
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Get(_) => "GET",
            Instruction::Put(_) => "PUT",
            Instruction::Load(_) => "LOAD",
            Instruction::Loadi(_) => "LOADI",
            Instruction::Store(_) => "STORE",
            Instruction::Storei(_) => "STOREI",
            Instruction::Add(_) => "ADD",
            Instruction::Sub(_) => "SUB",
            Instruction::Set(_) => "SET",
            Instruction::Half => "HALF",
            Instruction::Jump(_) => "JUMP",
            Instruction::Jpos(_) => "JPOS",
            Instruction::Jzero(_) => "JZERO",
            Instruction::Jneg(_) => "JNEG",
            Instruction::Rtrn(_) => "RTRN",
            Instruction::Halt => "HALT",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match self {
            Instruction::Get(a)
            | Instruction::Put(a)
            | Instruction::Load(a)
            | Instruction::Loadi(a)
            | Instruction::Store(a)
            | Instruction::Storei(a)
            | Instruction::Add(a)
            | Instruction::Sub(a)
            | Instruction::Rtrn(a) => write!(f, "{} {}", name, a),
            Instruction::Set(k)
            | Instruction::Jump(k)
            | Instruction::Jpos(k)
            | Instruction::Jzero(k)
            | Instruction::Jneg(k) => write!(f, "{} {}", name, k),
            Instruction::Half | Instruction::Halt => write!(f, "{}", name),
        }
    }
}

impl FromStr for Instruction {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or_else(|| "empty line".to_string())?;
        let operand = parts.next();
        if parts.next().is_some() {
            return Err(format!("trailing tokens in '{}'", line));
        }

        let address = || -> std::result::Result<Address, String> {
            operand
                .ok_or_else(|| format!("{} needs an address", name))?
                .parse::<Address>()
                .map_err(|e| format!("bad address for {}: {}", name, e))
        };
        let signed = || -> std::result::Result<i64, String> {
            operand
                .ok_or_else(|| format!("{} needs an operand", name))?
                .parse::<i64>()
                .map_err(|e| format!("bad operand for {}: {}", name, e))
        };

        let instr = match name {
            "GET" => Instruction::Get(address()?),
            "PUT" => Instruction::Put(address()?),
            "LOAD" => Instruction::Load(address()?),
            "LOADI" => Instruction::Loadi(address()?),
            "STORE" => Instruction::Store(address()?),
            "STOREI" => Instruction::Storei(address()?),
            "ADD" => Instruction::Add(address()?),
            "SUB" => Instruction::Sub(address()?),
            "RTRN" => Instruction::Rtrn(address()?),
            "SET" => Instruction::Set(signed()?),
            "JUMP" => Instruction::Jump(signed()?),
            "JPOS" => Instruction::Jpos(signed()?),
            "JZERO" => Instruction::Jzero(signed()?),
            "JNEG" => Instruction::Jneg(signed()?),
            "HALF" | "HALT" => {
                if operand.is_some() {
                    return Err(format!("{} takes no operand", name));
                }
                if name == "HALF" {
                    Instruction::Half
                } else {
                    Instruction::Halt
                }
            }
            other => return Err(format!("unknown mnemonic '{}'", other)),
        };
        Ok(instr)
    }
}

/// Render a program as newline-separated assembly
pub fn to_assembly(program: &[Instruction]) -> String {
    let mut out = String::new();
    for instr in program {
        out.push_str(&instr.to_string());
        out.push('\n');
    }
    out
}

/// Parse assembly text, one instruction per line
///
/// Blank lines and `#` comments are skipped.
pub fn parse_assembly(text: &str) -> Result<Vec<Instruction>> {
    let mut program = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let instr = line.parse::<Instruction>().map_err(|reason| Error::InvalidInstruction {
            line: idx + 1,
            text: format!("{} ({})", line, reason),
        })?;
        program.push(instr);
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Instruction::Jneg(-4).to_string(), "JNEG -4");
        assert_eq!(Instruction::Storei(13).to_string(), "STOREI 13");
        assert_eq!(Instruction::Half.to_string(), "HALF");
    }

    #[test]
    fn test_parse_program_with_comments() {
        let program = parse_assembly("SET -3 # negative\n\nPUT 0\nHALT\n").unwrap();
        assert_eq!(
            program,
            vec![Instruction::Set(-3), Instruction::Put(0), Instruction::Halt]
        );
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        let err = parse_assembly("HALT\nLOAD -1\n").unwrap_err();
        assert!(matches!(err, Error::InvalidInstruction { line: 2, .. }));
        assert!(parse_assembly("HALF 2").is_err());
        assert!(parse_assembly("MUL 3").is_err());
    }

    #[test]
    fn test_costs() {
        assert_eq!(Instruction::Set(1).cost(), 50);
        assert_eq!(Instruction::Jzero(2).cost(), 1);
        assert_eq!(Instruction::Halt.cost(), 0);
    }
}

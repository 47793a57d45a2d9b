//! Shared AST builders and run helpers for the integration tests
#![allow(dead_code)]

use impc::ast::{
    BinaryOp, Command, Condition, Declaration, Direction, Expression, Identifier, Main, Param,
    Procedure, Program, RelOp, Value,
};
use impc::{CompileOptions, CompileResult, Compiler, Machine, Result};

pub fn var(name: &str) -> Declaration {
    Declaration::Variable(name.to_string())
}

pub fn array(name: &str, first: i64, last: i64) -> Declaration {
    Declaration::Array {
        name: name.to_string(),
        first,
        last,
    }
}

pub fn id(name: &str) -> Identifier {
    Identifier::Scalar(name.to_string())
}

pub fn at(name: &str, index: i64) -> Identifier {
    Identifier::ArrayNum(name.to_string(), index)
}

pub fn at_var(name: &str, index: &str) -> Identifier {
    Identifier::ArrayVar(name.to_string(), index.to_string())
}

pub fn assign(target: Identifier, value: impl Into<Expression>) -> Command {
    Command::Assign {
        target,
        value: value.into(),
    }
}

pub fn binary(left: Value, op: BinaryOp, right: Value) -> Expression {
    Expression::binary(left, op, right)
}

pub fn read(target: Identifier) -> Command {
    Command::Read(target)
}

pub fn write(value: Value) -> Command {
    Command::Write(value)
}

pub fn cond(left: Value, op: RelOp, right: Value) -> Condition {
    Condition::new(left, op, right)
}

pub fn for_to(iterator: &str, from: Value, to: Value, body: Vec<Command>) -> Command {
    Command::For {
        iterator: iterator.to_string(),
        from,
        to,
        direction: Direction::To,
        body,
    }
}

pub fn for_downto(iterator: &str, from: Value, to: Value, body: Vec<Command>) -> Command {
    Command::For {
        iterator: iterator.to_string(),
        from,
        to,
        direction: Direction::Downto,
        body,
    }
}

pub fn call(name: &str, args: &[&str]) -> Command {
    Command::Call {
        name: name.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

pub fn scalar_param(name: &str) -> Param {
    Param::Scalar(name.to_string())
}

pub fn array_param(name: &str) -> Param {
    Param::Array(name.to_string())
}

pub fn procedure(
    name: &str,
    params: Vec<Param>,
    declarations: Vec<Declaration>,
    commands: Vec<Command>,
) -> Procedure {
    Procedure {
        name: name.to_string(),
        params,
        declarations,
        commands,
    }
}

pub fn program(procedures: Vec<Procedure>, declarations: Vec<Declaration>, commands: Vec<Command>) -> Program {
    Program {
        procedures,
        main: Main {
            declarations,
            commands,
        },
    }
}

pub fn compile(program: &Program) -> Result<CompileResult> {
    Compiler::new(CompileOptions::default()).compile(program)
}

/// Compile, run with `input` and return the written values
pub fn run(program: &Program, input: &[i128]) -> Vec<i128> {
    let result = compile(program).expect("program should compile");
    Machine::new(result.instructions)
        .run(input)
        .expect("program should halt")
        .output
}

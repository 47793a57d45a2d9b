//! Abstract syntax tree handed over by the front end
//!
//! The tree mirrors the source grammar: a program is a list of procedures
//! followed by the main block, expressions are at most one binary operator
//! between two values, and conditions compare two values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Procedures in definition order
    pub procedures: Vec<Procedure>,
    /// Main block
    pub main: Main,
}

/// Main block: `PROGRAM IS declarations BEGIN commands END`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Main {
    /// Global declarations
    pub declarations: Vec<Declaration>,
    /// Main body
    pub commands: Vec<Command>,
}

/// Procedure definition: `PROCEDURE name(params) IS declarations BEGIN commands END`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    /// Procedure name
    pub name: String,
    /// Formal parameters in order
    pub params: Vec<Param>,
    /// Local declarations
    pub declarations: Vec<Declaration>,
    /// Procedure body
    pub commands: Vec<Command>,
}

/// Formal parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Param {
    /// Scalar parameter: `n`
    Scalar(String),
    /// Array parameter: `T t`
    Array(String),
}

impl Param {
    /// Parameter name
    pub fn name(&self) -> &str {
        match self {
            Param::Scalar(name) | Param::Array(name) => name,
        }
    }
}

/// Variable or array declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Declaration {
    /// Scalar variable: `n`
    Variable(String),
    /// Array: `t[first:last]`
    Array {
        /// Array name
        name: String,
        /// First valid index
        first: i64,
        /// Last valid index
        last: i64,
    },
}

/// Commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `target := value;`
    Assign {
        /// Assigned location
        target: Identifier,
        /// Assigned expression
        value: Expression,
    },

    /// `IF condition THEN commands ENDIF`
    If {
        /// Branch condition
        condition: Condition,
        /// Commands run when the condition holds
        then_branch: Vec<Command>,
    },

    /// `IF condition THEN commands ELSE commands ENDIF`
    IfElse {
        /// Branch condition
        condition: Condition,
        /// Commands run when the condition holds
        then_branch: Vec<Command>,
        /// Commands run otherwise
        else_branch: Vec<Command>,
    },

    /// `WHILE condition DO commands ENDWHILE`
    While {
        /// Loop condition, tested before every iteration
        condition: Condition,
        /// Loop body
        body: Vec<Command>,
    },

    /// `REPEAT commands UNTIL condition;`
    Repeat {
        /// Loop body, run at least once
        body: Vec<Command>,
        /// Exit condition, tested after every iteration
        condition: Condition,
    },

    /// `FOR iterator FROM from TO|DOWNTO to DO commands ENDFOR`
    For {
        /// Iterator name, bound only inside the body
        iterator: String,
        /// Start value
        from: Value,
        /// End value (inclusive)
        to: Value,
        /// Counting direction
        direction: Direction,
        /// Loop body
        body: Vec<Command>,
    },

    /// `READ target;`
    Read(Identifier),

    /// `WRITE value;`
    Write(Value),

    /// `name(args);`
    Call {
        /// Called procedure
        name: String,
        /// Argument names (variables or arrays of the caller)
        args: Vec<String>,
    },
}

/// For-loop counting direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending: `TO`
    To,
    /// Descending: `DOWNTO`
    Downto,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::To => write!(f, "TO"),
            Direction::Downto => write!(f, "DOWNTO"),
        }
    }
}

/// Right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    /// Plain value
    Value(Value),
    /// `left op right`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Value,
        /// Right operand
        right: Value,
    },
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

/// `left op right` comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Relational operator
    pub op: RelOp,
    /// Left operand
    pub left: Value,
    /// Right operand
    pub right: Value,
}

/// Relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

impl RelOp {
    /// Evaluate the operator on two known integers
    pub fn holds(self, left: i64, right: i64) -> bool {
        match self {
            RelOp::Eq => left == right,
            RelOp::Ne => left != right,
            RelOp::Gt => left > right,
            RelOp::Lt => left < right,
            RelOp::Ge => left >= right,
            RelOp::Le => left <= right,
        }
    }

    /// Truth value when both operands are the same expression
    pub fn reflexive(self) -> bool {
        matches!(self, RelOp::Eq | RelOp::Ge | RelOp::Le)
    }

    fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "=",
            RelOp::Ne => "!=",
            RelOp::Gt => ">",
            RelOp::Lt => "<",
            RelOp::Ge => ">=",
            RelOp::Le => "<=",
        }
    }
}

/// Operand: literal or identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Integer literal
    Num(i64),
    /// Variable, iterator, parameter or array element
    Id(Identifier),
}

/// Reference to a storage location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    /// `n`
    Scalar(String),
    /// `t[5]`
    ArrayNum(String, i64),
    /// `t[i]`
    ArrayVar(String, String),
}

// Convenience constructors used by front ends and tests.
impl Value {
    /// Literal value
    pub fn num(value: i64) -> Self {
        Value::Num(value)
    }

    /// Scalar reference
    pub fn var(name: &str) -> Self {
        Value::Id(Identifier::Scalar(name.to_string()))
    }

    /// Element reference with a literal index
    pub fn at(array: &str, index: i64) -> Self {
        Value::Id(Identifier::ArrayNum(array.to_string(), index))
    }

    /// Element reference indexed by a variable
    pub fn at_var(array: &str, index: &str) -> Self {
        Value::Id(Identifier::ArrayVar(array.to_string(), index.to_string()))
    }
}

impl Condition {
    /// Build `left op right`
    pub fn new(left: Value, op: RelOp, right: Value) -> Self {
        Self { op, left, right }
    }
}

impl Expression {
    /// Build `left op right`
    pub fn binary(left: Value, op: BinaryOp, right: Value) -> Self {
        Expression::Binary { op, left, right }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Value(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Scalar(name) => write!(f, "{}", name),
            Identifier::ArrayNum(name, index) => write!(f, "{}[{}]", name, index),
            Identifier::ArrayVar(name, index) => write!(f, "{}[{}]", name, index),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{}", n),
            Value::Id(id) => write!(f, "{}", id),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op.symbol(), self.right)
    }
}

//! Property-based tests for the generated arithmetic and comparisons
//!
//! Every property compiles a small program, runs it on the reference machine
//! and compares the output with Rust's own integer semantics (`/` and `%`
//! truncate toward zero), with division or modulo by zero yielding 0.

mod common;

use common::*;
use impc::ast::{BinaryOp, Command, Program, RelOp, Value};
use proptest::prelude::*;

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// Operands biased toward the interesting corners: zero, ±1, powers of two
/// and the ends of the 64-bit range
fn operand() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(0i64),
        Just(1i64),
        Just(-1i64),
        Just(i64::MAX),
        Just(i64::MIN + 1),
        (0u32..63).prop_map(|k| 1i64 << k),
        (0u32..63).prop_map(|k| -(1i64 << k)),
        (40u32..63).prop_map(|k| (1i64 << k) - 1),
        -1_000_000i64..1_000_000i64,
        -(1i64 << 40)..(1i64 << 40),
        (i64::MIN + 1)..=i64::MAX,
    ]
}

fn arith_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
        Just(BinaryOp::Mod),
    ]
}

fn rel_op() -> impl Strategy<Value = RelOp> {
    prop_oneof![
        Just(RelOp::Eq),
        Just(RelOp::Ne),
        Just(RelOp::Gt),
        Just(RelOp::Lt),
        Just(RelOp::Ge),
        Just(RelOp::Le),
    ]
}

// =============================================================================
// HELPERS
// =============================================================================

fn expected(op: BinaryOp, a: i64, b: i64) -> i128 {
    let (a, b) = (a as i128, b as i128);
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0 => 0,
        BinaryOp::Mod if b == 0 => 0,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
    }
}

/// `READ a; READ b; c := a op b; WRITE c;`
fn read_both(op: BinaryOp) -> Program {
    program(
        vec![],
        vec![var("a"), var("b"), var("c")],
        vec![
            read(id("a")),
            read(id("b")),
            assign(id("c"), binary(Value::var("a"), op, Value::var("b"))),
            write(Value::var("c")),
        ],
    )
}

/// `READ a; t[1] := k; c := t[1] op a; WRITE c;` with the element in a procedure array parameter
fn through_parameter(op: BinaryOp, k: i64) -> Program {
    let apply = procedure(
        "apply",
        vec![array_param("t"), scalar_param("x"), scalar_param("r")],
        vec![],
        vec![assign(id("r"), binary(Value::at("t", 1), op, Value::var("x")))],
    );
    program(
        vec![apply],
        vec![var("a"), var("c"), array("t", 1, 1)],
        vec![
            read(id("a")),
            assign(at("t", 1), Value::num(k)),
            call("apply", &["t", "a", "c"]),
            write(Value::var("c")),
        ],
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Generated arithmetic matches truncating integer semantics
    #[test]
    fn arithmetic_matches_rust(op in arith_op(), a in operand(), b in operand()) {
        let output = run(&read_both(op), &[a as i128, b as i128]);
        prop_assert_eq!(output, vec![expected(op, a, b)]);
    }

    /// Literal right operands take the spill path and fold when both sides are literal
    #[test]
    fn literal_operands(op in arith_op(), a in operand(), k in operand()) {
        let prog = program(
            vec![],
            vec![var("a"), var("c")],
            vec![
                read(id("a")),
                assign(id("c"), binary(Value::var("a"), op, Value::num(k))),
                write(Value::var("c")),
                assign(id("c"), binary(Value::num(a), op, Value::num(k))),
                write(Value::var("c")),
            ],
        );
        let output = run(&prog, &[a as i128]);
        prop_assert_eq!(output, vec![expected(op, a, k), expected(op, a, k)]);
    }

    /// Operands reached through parameters and indirect elements
    #[test]
    fn indirect_operands(op in arith_op(), a in operand(), k in operand()) {
        let output = run(&through_parameter(op, k), &[a as i128]);
        prop_assert_eq!(output, vec![expected(op, k, a)]);
    }

    /// Every relational operator branches the same way Rust compares
    #[test]
    fn comparisons_match_rust(op in rel_op(), a in operand(), b in operand()) {
        let prog = program(
            vec![],
            vec![var("a"), var("b")],
            vec![
                read(id("a")),
                read(id("b")),
                Command::IfElse {
                    condition: cond(Value::var("a"), op, Value::var("b")),
                    then_branch: vec![write(Value::num(1))],
                    else_branch: vec![write(Value::num(0))],
                },
            ],
        );
        let output = run(&prog, &[a as i128, b as i128]);
        prop_assert_eq!(output, vec![i128::from(op.holds(a, b))]);
    }

    /// A counted loop runs `to - from + 1` times for any non-empty dynamic range
    #[test]
    fn for_trip_count(from in -50i64..50, len in 0i64..60) {
        let to = from + len;
        let prog = program(
            vec![],
            vec![var("f"), var("t"), var("c")],
            vec![
                read(id("f")),
                read(id("t")),
                assign(id("c"), Value::num(0)),
                for_to("i", Value::var("f"), Value::var("t"), vec![
                    assign(id("c"), binary(Value::var("c"), BinaryOp::Add, Value::num(1))),
                ]),
                write(Value::var("c")),
                for_downto("i", Value::var("t"), Value::var("f"), vec![
                    assign(id("c"), binary(Value::var("c"), BinaryOp::Sub, Value::num(1))),
                ]),
                write(Value::var("c")),
            ],
        );
        let output = run(&prog, &[from as i128, to as i128]);
        prop_assert_eq!(output, vec![(len + 1) as i128, 0]);
    }
}

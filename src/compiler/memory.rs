//! Reserved memory layout
//!
//! Cells `0..RESERVED_CELLS` are scratch space owned by the code generator.
//! User entities are allocated from `RESERVED_CELLS` upward.

use super::instruction::Address;

/// The accumulator; `PUT 0` / `GET 0` go through it directly
pub const ACC: Address = 0;

/// Right operand spill for binary operators and conditions
pub const OPERAND: Address = 1;

/// Element address or index temporary used by indirect loads
pub const INDEX: Address = 2;

/// Working cells of the multiply and divide routines
pub mod arith {
    use super::Address;

    /// Multiply: doubled operand. Divide: running remainder.
    pub const A: Address = 3;
    /// Multiply: halved operand. Divide: scaled divisor.
    pub const B: Address = 4;
    /// Multiply: product. Divide: quotient.
    pub const RESULT: Address = 5;
    /// Divide: current power of two
    pub const POWER: Address = 6;
    /// Sign of the left operand (multiply keeps the product sign here)
    pub const SIGN_LEFT: Address = 7;
    /// Sign of the right operand
    pub const SIGN_RIGHT: Address = 8;
    /// Negation and halving temporary
    pub const TEMP: Address = 9;
}

/// Pointer to the destination of an assignment or `READ` into a computed element
pub const TARGET: Address = 13;

/// Holds the return address while a procedure executes `RTRN`
pub const TRAMPOLINE: Address = 14;

/// Size of the reserved band
pub const RESERVED_CELLS: Address = 15;

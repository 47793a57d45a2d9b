//! Runtime execution of compiled programs on a simulated accumulator machine

mod machine;

pub use machine::{Execution, Machine, MachineOptions};

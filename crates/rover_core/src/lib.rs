//!This is the core library for the rover project. All other rover crates depend on this one.
//!It holds duty-tick arithmetic and the common error type.

pub mod duty;
pub mod error;

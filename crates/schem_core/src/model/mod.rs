//! Model parameter types and their randomization.

mod params;
mod randomize;

pub use params::*;
pub use randomize::*;

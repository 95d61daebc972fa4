mod signal;
pub use signal::*;

pub mod simulator;
pub use simulator::*;

mod trace;
pub use trace::*;

mod testbench;
pub use testbench::*;


pub use test::{bench, BenchResult};

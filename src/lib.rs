//! Cycle-level model of an SPI slave peripheral with a serial clock domain
//! and a main clock domain, plus a master and testbench to drive it.

pub mod error;
pub mod modules;
pub mod simulator;

pub use error::{Error, Result};
pub use modules::{Frame, Mode, SpiSlave};
pub use simulator::{Simulator, Testbench, TestbenchConfig, Tristate};

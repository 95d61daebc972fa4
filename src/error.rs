//! Error types for configuration and testbench operations

use core::fmt;

/// Crate result type
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors reported before or around a simulation run. The protocol core itself
/// never fails at runtime: dropped partial bytes are part of the framing contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// SPI mode outside 0..=3
    InvalidMode(u8),
    /// Frame longer than one word
    InvalidFrame { bits: u8 },
    /// Testbench timing that breaks a synchronizer or preload precondition
    InvalidTiming(&'static str),
    /// Simulation did not settle within the step budget
    Timeout { steps: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidMode(mode) => write!(f, "Invalid SPI mode {} (expected 0..=3)", mode),
            Error::InvalidFrame { bits } => write!(f, "Invalid frame of {} bits (at most 8)", bits),
            Error::InvalidTiming(reason) => write!(f, "Invalid timing: {}", reason),
            Error::Timeout { steps } => write!(f, "Simulation did not settle within {} steps", steps),
        }
    }
}

impl std::error::Error for Error {}

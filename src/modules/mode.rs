use core::fmt;

use crate::error::{Error, Result};

/// SPI mode (clock polarity and phase). Fixed for the lifetime of a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// CPOL=0, CPHA=0
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Mode0, Mode::Mode1, Mode::Mode2, Mode::Mode3];

    /// Clock polarity. Only documents the idle level of the serial clock; the
    /// sampling edge is chosen by the phase alone.
    pub fn polarity(self) -> bool {
        matches!(self, Mode::Mode2 | Mode::Mode3)
    }

    /// Clock phase
    pub fn phase(self) -> bool {
        matches!(self, Mode::Mode1 | Mode::Mode3)
    }

    /// Level of the raw serial clock while the bus is idle
    pub fn idle_clock(self) -> bool {
        self.polarity()
    }

    /// Internal sampling clock derived from the raw serial clock. Serial domain
    /// logic reacts to the rising edge of this signal.
    pub fn effective_clock(self, sclk: bool) -> bool {
        sclk ^ self.phase()
    }
}

impl TryFrom<u8> for Mode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Mode::Mode0),
            1 => Ok(Mode::Mode1),
            2 => Ok(Mode::Mode2),
            3 => Ok(Mode::Mode3),
            _ => Err(Error::InvalidMode(value)),
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        (mode.polarity() as u8) << 1 | mode.phase() as u8
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode {}", u8::from(*self))
    }
}

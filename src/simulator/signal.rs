use core::fmt;

/// Level of a line that can be released. A shared bus has to tell "drives 0"
/// apart from "not driving at all".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tristate {
    Driven(bool),
    HighImpedance,
}

impl Tristate {
    pub fn bit(self) -> Option<bool> {
        match self {
            Tristate::Driven(bit) => Some(bit),
            Tristate::HighImpedance => None,
        }
    }

    pub fn is_driven(self) -> bool {
        matches!(self, Tristate::Driven(_))
    }

    /// Waveform glyph used by traces
    pub fn glyph(self) -> char {
        match self {
            Tristate::Driven(true) => '█',
            Tristate::Driven(false) => '▁',
            Tristate::HighImpedance => 'z',
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        Tristate::Driven(value)
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tristate::Driven(bit) => write!(f, "{}", *bit as u8),
            Tristate::HighImpedance => write!(f, "z"),
        }
    }
}

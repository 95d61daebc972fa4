use log::trace;

/// Bits per transfer word
pub const WORD_BITS: u8 = 8;

/// Index of the last bit of a word
pub const LAST_BIT: u8 = WORD_BITS - 1;

/// Serial clock edges the completion flag stays up after being set, the
/// setting edge included
pub const DONE_PULSE_EDGES: u8 = 2;

// counter value at which the completion flag drops
const DONE_CLEAR_COUNT: u8 = (LAST_BIT + DONE_PULSE_EDGES) % WORD_BITS;

/// Serial clock domain receive shift register. Only the completion flag and the
/// latched byte are meant to be read from another clock domain.
#[derive(Clone, Debug, Default)]
pub struct ReceiveEngine {
    counter: u8,
    shift: u8,
    received: u8,
    done: bool,
}

impl ReceiveEngine {
    /// Shifts in one bit on a rising edge of the effective serial clock
    pub fn tick(&mut self, mosi: bool) {
        let shift = (self.shift << 1) | mosi as u8;

        if self.counter == LAST_BIT {
            self.received = shift;
            self.done = true;
            trace!("rx: latched {:#04x}", shift);
        } else if self.counter == DONE_CLEAR_COUNT {
            self.done = false;
        }

        self.shift = shift;
        self.counter = (self.counter + 1) % WORD_BITS;
    }

    /// Chip-select deassertion. Any partial word is dropped.
    pub fn abort(&mut self) {
        self.counter = 0;
        self.done = false;
    }

    pub fn reset(&mut self) {
        *self = ReceiveEngine::default();
    }

    /// Bits of the current word received so far
    pub fn bits(&self) -> u8 {
        self.counter
    }

    pub fn done(&self) -> bool {
        self.done
    }

    /// Last complete word. Stable while `done` is up.
    pub fn received(&self) -> u8 {
        self.received
    }
}

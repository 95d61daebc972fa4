use log::trace;

use super::*;

/// Serial clock domain transmit shift register, MSB first.
///
/// While `preload` is set the output shows bit 7 of the load register, so the
/// first bit is on the line before the first serial clock edge. The first edge
/// commits the load register into the shift register; from then on the load
/// register can change without touching the word being shifted out.
#[derive(Clone, Debug)]
pub struct TransmitEngine {
    counter: u8,
    shift: u8,
    preload: bool,
}

impl Default for TransmitEngine {
    fn default() -> Self {
        TransmitEngine {
            counter: LAST_BIT,
            shift: 0,
            preload: true,
        }
    }
}

impl TransmitEngine {
    /// Presents the next bit on a rising edge of the effective serial clock
    pub fn tick(&mut self, loaded: u8) {
        if self.preload {
            self.shift = loaded;
            self.preload = false;
        }

        self.counter = (self.counter + WORD_BITS - 1) % WORD_BITS;

        trace!("tx: bit {} = {}", self.counter, self.shifted_bit());
    }

    /// Chip-select deassertion: re-arm the preload for the next window
    pub fn abort(&mut self) {
        self.counter = LAST_BIT;
        self.preload = true;
    }

    pub fn reset(&mut self) {
        *self = TransmitEngine::default();
    }

    pub fn preloading(&self) -> bool {
        self.preload
    }

    /// Output multiplexer: preloaded MSB or the currently shifted bit
    pub fn bit(&self, loaded: u8) -> bool {
        if self.preload {
            loaded & (1 << LAST_BIT) != 0
        } else {
            self.shifted_bit()
        }
    }

    fn shifted_bit(&self) -> bool {
        self.shift & (1 << self.counter) != 0
    }
}

/// Main clock domain transmit byte register. Written only when the consumer
/// offers a byte while the peripheral is active.
#[derive(Clone, Debug, Default)]
pub struct LoadRegister {
    byte: DFlipFlop<u8>,
}

impl LoadRegister {
    pub fn tick(&mut self, data: u8, valid: bool, active: bool, rstn: bool) {
        self.byte.clock(data, valid && active, rstn);
    }

    pub fn byte(&self) -> u8 {
        self.byte.q()
    }
}

/// MISO driver: releases the line while deselected
pub fn drive(selected: bool, bit: bool) -> Tristate {
    if selected {
        Tristate::Driven(bit)
    } else {
        Tristate::HighImpedance
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn shift_out(tx: &mut TransmitEngine, loaded: u8, bits: u8) -> u8 {
        let mut out = 0;
        for _ in 0..bits {
            // sampled before the engine moves on
            out = (out << 1) | tx.bit(loaded) as u8;
            tx.tick(loaded);
        }
        out
    }

    #[test]
    fn test_transmit_byte() {
        for byte in [0x00, 0x5a, 0x80, 0xff, 0x01] {
            let mut tx = TransmitEngine::default();

            assert_eq!(tx.bit(byte), byte & 0x80 != 0);
            assert_eq!(shift_out(&mut tx, byte, 8), byte);
        }
    }

    #[test]
    fn test_preload_tracks_load_register() {
        let tx = TransmitEngine::default();

        assert!(tx.preloading());
        assert!(tx.bit(0x80));
        assert!(!tx.bit(0x7f));
    }

    #[test]
    fn test_load_after_first_edge_is_ignored() {
        let mut tx = TransmitEngine::default();

        let head = shift_out(&mut tx, 0x5a, 3);
        let tail = shift_out(&mut tx, 0xff, 5);

        assert_eq!(head << 5 | tail, 0x5a);

        // the new byte shows up in the next window
        tx.abort();
        assert_eq!(shift_out(&mut tx, 0x0f, 8), 0x0f);
    }

    #[test]
    fn test_abort_mid_word() {
        let mut tx = TransmitEngine::default();
        shift_out(&mut tx, 0xaa, 5);

        tx.abort();

        assert!(tx.preloading());
        assert_eq!(shift_out(&mut tx, 0x81, 8), 0x81);
    }

    #[test]
    fn test_load_register_gated() {
        let mut load = LoadRegister::default();

        load.tick(0x5a, true, false, true);
        assert_eq!(load.byte(), 0x00);

        load.tick(0x5a, false, true, true);
        assert_eq!(load.byte(), 0x00);

        load.tick(0x5a, true, true, true);
        assert_eq!(load.byte(), 0x5a);

        load.tick(0x00, false, false, false);
        assert_eq!(load.byte(), 0x00);
    }

    #[test]
    fn test_drive() {
        assert_eq!(drive(false, true), Tristate::HighImpedance);
        assert_eq!(drive(true, false), Tristate::Driven(false));
        assert_eq!(drive(true, true), Tristate::Driven(true));
    }
}

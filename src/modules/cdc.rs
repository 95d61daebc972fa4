use log::debug;

use super::*;

/// Imports the receive completion flag into the main clock domain.
///
/// `stage1` samples the flag, `stage2` is its delayed copy; a byte is handed
/// over when `stage1 && !stage2`, which happens once per completed byte no
/// matter how long the flag stays up. The received byte is only sampled on
/// that edge, by which point it has been stable for at least one main clock.
///
/// The flag must stay up for at least one full main clock period to be seen.
#[derive(Clone, Debug, Default)]
pub struct Synchronizer {
    stage1: DFlipFlop<bool>,
    stage2: DFlipFlop<bool>,
    valid: DFlipFlop<bool>,
    data: DFlipFlop<u8>,
}

impl Synchronizer {
    /// One main clock edge. The pipeline and data register only advance while
    /// `active`; the strobe always drops after one cycle.
    pub fn tick(&mut self, done: bool, received: u8, active: bool, rstn: bool) {
        let edge = active && self.pending();

        self.stage2.clock(self.stage1.q(), active, rstn);
        self.stage1.clock(done, active, rstn);
        self.data.clock(received, edge, rstn);
        self.valid.clock(edge, true, rstn);

        if edge && rstn {
            debug!("cdc: delivered {:#04x}", received);
        }
    }

    /// A completion has been sampled but not yet handed over
    pub fn pending(&self) -> bool {
        self.stage1.q() && !self.stage2.q()
    }

    pub fn valid(&self) -> bool {
        self.valid.q()
    }

    /// Last delivered byte, held until the next delivery
    pub fn data(&self) -> u8 {
        self.data.q()
    }

    /// The delivered byte during the single cycle its strobe is up
    pub fn output(&self) -> Option<u8> {
        self.valid().then(|| self.data())
    }
}

use std::collections::VecDeque;

use log::debug;

use crate::error::{Error, Result};

use super::*;

/// One chip-select window as driven by the master
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Word sent on MOSI, MSB first
    pub mosi: u8,
    /// Serial clock edges before chip-select is released
    pub bits: u8,
    /// Byte the consumer offers to the slave's transmit register during the
    /// chip-select lead time
    pub tx: Option<u8>,
}

impl Frame {
    pub fn byte(mosi: u8) -> Self {
        Frame {
            mosi,
            bits: WORD_BITS,
            tx: None,
        }
    }

    /// Window cut short after the top `bits` bits of `mosi`
    pub fn partial(mosi: u8, bits: u8) -> Self {
        Frame {
            mosi,
            bits,
            tx: None,
        }
    }

    pub fn with_tx(self, tx: u8) -> Self {
        Frame {
            tx: Some(tx),
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bits > WORD_BITS {
            return Err(Error::InvalidFrame { bits: self.bits });
        }

        Ok(())
    }

    /// Bit sent on the `index`th edge
    fn bit(&self, index: u8) -> bool {
        self.mosi & (1 << (LAST_BIT - index)) != 0
    }
}

/// Master timing, in simulation steps
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timing {
    pub sclk_half_period: usize,
    /// Chip-select assertion to the first serial clock transition
    pub cs_lead: usize,
    /// Last serial clock transition to chip-select release
    pub cs_lag: usize,
    /// Chip-select release to the next assertion
    pub idle_gap: usize,
}

/// A finished window
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameResult {
    pub frame: Frame,
    /// MISO right before the first serial clock edge
    pub first_bit: Tristate,
    /// MISO as sampled on each edge, MSB first in the low `frame.bits` bits
    pub miso: u8,
    /// Edges that found MISO released
    pub released: usize,
    pub start: u64,
    pub last_edge: Option<u64>,
    pub end: u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MasterPins {
    pub cs_n: bool,
    pub sclk: bool,
    pub mosi: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Lead(usize),
    Clocking { toggles: usize, wait: usize },
    Lag(usize),
    Gap(usize),
}

/// Bit-banged SPI master using the same edge convention as the slave: MOSI
/// changes on falling edges of the effective clock and MISO is sampled on the
/// rising edge, before the slave moves on to its next bit.
#[derive(Clone, Debug)]
pub struct Master {
    mode: Mode,
    timing: Timing,
    queue: VecDeque<Frame>,
    phase: Phase,
    pins: MasterPins,
    current: Option<FrameResult>,
    edges: u8,
}

impl Master {
    pub fn new(mode: Mode, timing: Timing) -> Self {
        Master {
            mode,
            timing,
            queue: VecDeque::new(),
            phase: Phase::Idle,
            pins: MasterPins {
                cs_n: true,
                sclk: mode.idle_clock(),
                mosi: false,
            },
            current: None,
            edges: 0,
        }
    }

    pub fn queue(&mut self, frame: Frame) -> Result<()> {
        frame.validate()?;
        self.queue.push_back(frame);
        Ok(())
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle && self.queue.is_empty()
    }

    pub fn pins(&self) -> MasterPins {
        self.pins
    }

    /// Byte offered to the slave's transmit register at this moment
    pub fn tx_request(&self) -> Option<u8> {
        match self.phase {
            Phase::Lead(_) => self.current.as_ref().and_then(|r| r.frame.tx),
            _ => None,
        }
    }

    /// Advances one step. `miso` is the slave output from before this step's
    /// pin changes. Returns the finished window on the step chip-select is
    /// released.
    pub fn step(&mut self, now: u64, miso: Tristate) -> Option<FrameResult> {
        match self.phase {
            Phase::Idle => {
                if let Some(frame) = self.queue.pop_front() {
                    self.start(now, frame);
                }
            },
            Phase::Lead(left) => {
                if left > 1 {
                    self.phase = Phase::Lead(left - 1);
                } else {
                    self.begin_clocking(miso);
                }
            },
            Phase::Clocking { toggles, wait } => {
                if wait > 1 {
                    self.phase = Phase::Clocking { toggles, wait: wait - 1 };
                } else {
                    self.toggle(now, miso);

                    self.phase = if toggles > 1 {
                        Phase::Clocking { toggles: toggles - 1, wait: self.timing.sclk_half_period }
                    } else {
                        Phase::Lag(self.timing.cs_lag)
                    };
                }
            },
            Phase::Lag(left) => {
                if left > 1 {
                    self.phase = Phase::Lag(left - 1);
                } else {
                    self.pins.cs_n = true;
                    self.phase = Phase::Gap(self.timing.idle_gap);

                    let mut result = self.current.take()?;
                    result.end = now;

                    debug!(
                        "master: frame done, sent {:#04x}/{} bits, got {:#04x} (first bit {})",
                        result.frame.mosi, result.frame.bits, result.miso, result.first_bit);

                    return Some(result);
                }
            },
            Phase::Gap(left) => {
                self.phase = if left > 1 { Phase::Gap(left - 1) } else { Phase::Idle };
            },
        }

        None
    }

    fn start(&mut self, now: u64, frame: Frame) {
        debug!("master: frame start, {:#04x}/{} bits", frame.mosi, frame.bits);

        self.pins.cs_n = false;
        self.pins.mosi = frame.bits > 0 && frame.bit(0);
        self.edges = 0;
        self.phase = Phase::Lead(self.timing.cs_lead);
        self.current = Some(FrameResult {
            frame,
            first_bit: Tristate::HighImpedance,
            miso: 0,
            released: 0,
            start: now,
            last_edge: None,
            end: now,
        });
    }

    fn begin_clocking(&mut self, miso: Tristate) {
        let bits = match self.current.as_mut() {
            Some(result) => {
                result.first_bit = miso;
                result.frame.bits
            },
            None => 0,
        };

        self.phase = if bits > 0 {
            Phase::Clocking {
                toggles: 2 * bits as usize,
                wait: self.timing.sclk_half_period,
            }
        } else {
            Phase::Lag(self.timing.cs_lag)
        };
    }

    fn toggle(&mut self, now: u64, miso: Tristate) {
        self.pins.sclk = !self.pins.sclk;

        let Some(result) = self.current.as_mut() else {
            return;
        };

        if self.mode.effective_clock(self.pins.sclk) {
            match miso.bit() {
                Some(bit) => result.miso = (result.miso << 1) | bit as u8,
                None => {
                    result.miso <<= 1;
                    result.released += 1;
                },
            }

            self.edges += 1;
            result.last_edge = Some(now);
        } else if self.edges < result.frame.bits {
            self.pins.mosi = result.frame.bit(self.edges);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TIMING: Timing = Timing {
        sclk_half_period: 2,
        cs_lead: 3,
        cs_lag: 2,
        idle_gap: 2,
    };

    /// Runs the master against a line that answers `miso`, counting rising
    /// effective edges and the MOSI value seen on each
    fn run(mode: Mode, frame: Frame, miso: Tristate) -> (FrameResult, u8, u8) {
        let mut master = Master::new(mode, TIMING);
        master.queue(frame).unwrap();

        let mut prev = mode.effective_clock(master.pins().sclk);
        let mut edges = 0;
        let mut sent = 0u8;

        for now in 0..1000 {
            let result = master.step(now, miso);
            let pins = master.pins();
            let eff = mode.effective_clock(pins.sclk);

            if eff && !prev {
                assert!(!pins.cs_n);
                edges += 1;
                sent = (sent << 1) | pins.mosi as u8;
            }
            prev = eff;

            if let Some(result) = result {
                assert!(pins.cs_n);
                assert_eq!(pins.sclk, mode.idle_clock());
                return (result, edges, sent);
            }
        }

        panic!("frame did not finish");
    }

    #[test]
    fn test_frame() {
        for mode in Mode::ALL {
            let (result, edges, sent) = run(mode, Frame::byte(0xc1), Tristate::Driven(true));

            assert_eq!(edges, 8, "{}", mode);
            assert_eq!(sent, 0xc1, "{}", mode);
            assert_eq!(result.miso, 0xff);
            assert_eq!(result.first_bit, Tristate::Driven(true));
            assert_eq!(result.released, 0);
            assert!(result.last_edge.unwrap() < result.end);
        }
    }

    #[test]
    fn test_partial_frame() {
        let (result, edges, sent) = run(Mode::Mode1, Frame::partial(0xa0, 3), Tristate::HighImpedance);

        assert_eq!(edges, 3);
        assert_eq!(sent, 0b101);
        assert_eq!(result.released, 3);
    }

    #[test]
    fn test_invalid_frame() {
        let mut master = Master::new(Mode::Mode0, TIMING);

        assert_eq!(master.queue(Frame::partial(0, 9)), Err(Error::InvalidFrame { bits: 9 }));
        assert!(master.is_idle());
    }

    #[test]
    fn test_tx_request_during_lead() {
        let mut master = Master::new(Mode::Mode0, TIMING);
        master.queue(Frame::byte(0).with_tx(0x5a)).unwrap();

        master.step(0, Tristate::HighImpedance);
        assert_eq!(master.tx_request(), Some(0x5a));

        for now in 1..=TIMING.cs_lead as u64 {
            master.step(now, Tristate::Driven(false));
        }
        assert_eq!(master.tx_request(), None);
    }
}

/// Edge-triggered D flip-flop with enable and active-low reset. `clock` is one
/// rising edge of whatever clock owns the register.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DFlipFlop<T> {
    q: T,
}

impl<T: Copy + Default> DFlipFlop<T> {
    pub fn q(&self) -> T {
        self.q
    }

    pub fn clock(&mut self, d: T, e: bool, rstn: bool) {
        if !rstn {
            self.q = T::default();
        } else if e {
            self.q = d;
        }
    }
}

/// Rising edge detector for a level that is observed once per change
#[derive(Copy, Clone, Debug, Default)]
pub struct RisingEdge {
    prev: bool,
}

impl RisingEdge {
    pub fn new(level: bool) -> Self {
        RisingEdge { prev: level }
    }

    pub fn level(&self) -> bool {
        self.prev
    }

    /// Returns true if the level went from low to high since the last sample
    pub fn sample(&mut self, level: bool) -> bool {
        let edge = !self.prev && level;
        self.prev = level;
        edge
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_d_flipflop() {
        let mut ff = DFlipFlop::<u8>::default();

        ff.clock(0x12, false, true);
        assert_eq!(ff.q(), 0);

        ff.clock(0x12, true, true);
        assert_eq!(ff.q(), 0x12);

        ff.clock(0x34, false, true);
        assert_eq!(ff.q(), 0x12);

        // reset wins over enable
        ff.clock(0x34, true, false);
        assert_eq!(ff.q(), 0);
    }

    #[test]
    fn test_rising_edge() {
        let mut edge = RisingEdge::new(true);

        assert!(!edge.sample(true));
        assert!(!edge.sample(false));
        assert!(edge.sample(true));
        assert!(!edge.sample(true));
        assert!(edge.level());
    }
}

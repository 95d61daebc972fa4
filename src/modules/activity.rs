use log::debug;

use super::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Activity {
    #[default]
    Idle,
    Active,
}

/// Tracks chip-select on the main clock. Its output gates every main clock
/// domain register; the serial engines use chip-select directly instead.
#[derive(Clone, Debug, Default)]
pub struct ActivityMonitor {
    active: DFlipFlop<bool>,
}

impl ActivityMonitor {
    pub fn tick(&mut self, cs_n: bool, rstn: bool) {
        let before = self.state();
        self.active.clock(!cs_n, true, rstn);

        if self.state() != before {
            debug!("activity: {:?} -> {:?}", before, self.state());
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.q()
    }

    pub fn state(&self) -> Activity {
        if self.is_active() {
            Activity::Active
        } else {
            Activity::Idle
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PowerState {
    #[default]
    Awake,
    LowPower,
}

/// Advisory power indicator for an external power controller. Nothing in the
/// peripheral itself is gated by it.
#[derive(Clone, Debug, Default)]
pub struct PowerTracker {
    low_power: DFlipFlop<bool>,
}

impl PowerTracker {
    /// `active` is the activity flag as of this clock edge, `pending` whether a
    /// received byte is still on its way to the consumer.
    pub fn tick(&mut self, active: bool, pending: bool, rstn: bool) {
        let before = self.state();
        let low_power = !active && (self.low_power.q() || !pending);
        self.low_power.clock(low_power, true, rstn);

        if self.state() != before {
            debug!("power: {:?} -> {:?}", before, self.state());
        }
    }

    pub fn is_low_power(&self) -> bool {
        self.low_power.q()
    }

    pub fn state(&self) -> PowerState {
        if self.is_low_power() {
            PowerState::LowPower
        } else {
            PowerState::Awake
        }
    }
}

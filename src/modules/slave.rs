use log::debug;

use crate::error::Result;

use super::*;

/// Values that cross from the serial clock domain into the main clock domain
#[derive(Copy, Clone, Debug, Default)]
pub struct Crossing {
    pub done: bool,
    pub received: u8,
}

/// State clocked by the effective serial clock. Chip-select deassertion resets
/// it through `abort`, independently of any clock.
#[derive(Clone, Debug, Default)]
pub struct SerialDomain {
    rx: ReceiveEngine,
    tx: TransmitEngine,
}

impl SerialDomain {
    /// One rising edge of the effective serial clock. `loaded` is the main
    /// domain transmit register, read only while the preload is armed.
    pub fn tick(&mut self, mosi: bool, loaded: u8) {
        self.rx.tick(mosi);
        self.tx.tick(loaded);
    }

    pub fn abort(&mut self) {
        if self.rx.bits() != 0 {
            debug!("serial: dropping partial byte after {} bits", self.rx.bits());
        }

        self.rx.abort();
        self.tx.abort();
    }

    pub fn reset(&mut self) {
        self.rx.reset();
        self.tx.reset();
    }

    pub fn crossing(&self) -> Crossing {
        Crossing {
            done: self.rx.done(),
            received: self.rx.received(),
        }
    }

    pub fn tx_bit(&self, loaded: u8) -> bool {
        self.tx.bit(loaded)
    }

    pub fn receive(&self) -> &ReceiveEngine {
        &self.rx
    }

    pub fn transmit(&self) -> &TransmitEngine {
        &self.tx
    }
}

/// Main clock domain input pins
#[derive(Copy, Clone, Debug)]
pub struct MainInputs {
    pub rstn: bool,
    pub cs_n: bool,
    pub tx_data: u8,
    pub tx_valid: bool,
}

impl Default for MainInputs {
    fn default() -> Self {
        MainInputs {
            rstn: true,
            cs_n: true,
            tx_data: 0,
            tx_valid: false,
        }
    }
}

/// State clocked by the main clock
#[derive(Clone, Debug, Default)]
pub struct MainDomain {
    activity: ActivityMonitor,
    sync: Synchronizer,
    load: LoadRegister,
    power: PowerTracker,
}

impl MainDomain {
    /// One rising edge of the main clock. Every register sees the values from
    /// before the edge.
    pub fn tick(&mut self, inp: MainInputs, crossing: Crossing) {
        let active = self.activity.is_active();
        let pending = self.pending();

        self.sync.tick(crossing.done, crossing.received, active, inp.rstn);
        self.load.tick(inp.tx_data, inp.tx_valid, active, inp.rstn);
        self.activity.tick(inp.cs_n, inp.rstn);
        self.power.tick(self.activity.is_active(), pending, inp.rstn);
    }

    /// A received byte has been sampled but the consumer has not seen its strobe yet
    pub fn pending(&self) -> bool {
        self.sync.pending() || self.sync.valid()
    }

    pub fn activity(&self) -> &ActivityMonitor {
        &self.activity
    }

    pub fn sync(&self) -> &Synchronizer {
        &self.sync
    }

    pub fn power(&self) -> &PowerTracker {
        &self.power
    }

    pub fn loaded(&self) -> u8 {
        self.load.byte()
    }
}

/// SPI slave peripheral: the serial and main clock domains plus the pins that
/// connect them to the outside.
#[derive(Clone, Debug)]
pub struct SpiSlave {
    mode: Mode,
    main: MainDomain,
    serial: SerialDomain,
    inputs: MainInputs,
    mosi: bool,
    sclk: bool,
    sclk_edge: RisingEdge,
}

impl SpiSlave {
    pub fn new(mode: Mode) -> Self {
        let sclk = mode.idle_clock();

        SpiSlave {
            mode,
            main: MainDomain::default(),
            serial: SerialDomain::default(),
            inputs: MainInputs::default(),
            mosi: false,
            sclk,
            sclk_edge: RisingEdge::new(mode.effective_clock(sclk)),
        }
    }

    /// Builds a peripheral from a raw mode number, rejecting anything but 0..=3
    pub fn with_mode(mode: u8) -> Result<Self> {
        Ok(SpiSlave::new(Mode::try_from(mode)?))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    // Input pins

    /// Active-low reset. Serial domain state is cleared right away, main domain
    /// state on the next main clock edge.
    pub fn set_reset(&mut self, rstn: bool) {
        if !rstn {
            if self.inputs.rstn {
                debug!("slave: reset asserted");
            }

            self.serial.reset();
        }

        self.inputs.rstn = rstn;
    }

    /// Active-low chip-select. Deassertion aborts the serial domain immediately.
    pub fn set_chip_select(&mut self, cs_n: bool) {
        if cs_n && !self.inputs.cs_n {
            self.serial.abort();
        }

        self.inputs.cs_n = cs_n;
    }

    pub fn set_mosi(&mut self, mosi: bool) {
        self.mosi = mosi;
    }

    /// Raw serial clock level. A rising edge of the effective clock advances
    /// the serial domain when selected.
    pub fn set_sclk(&mut self, sclk: bool) {
        self.sclk = sclk;

        if self.sclk_edge.sample(self.mode.effective_clock(sclk)) && self.selected() {
            self.serial.tick(self.mosi, self.main.loaded());
        }
    }

    /// Byte offered for the transmit register, taken on a main clock edge
    /// while `valid` and the peripheral is active
    pub fn set_tx(&mut self, data: u8, valid: bool) {
        self.inputs.tx_data = data;
        self.inputs.tx_valid = valid;
    }

    /// One rising edge of the main clock
    pub fn clock(&mut self) {
        self.main.tick(self.inputs, self.serial.crossing());
    }

    // Output pins

    pub fn miso(&self) -> Tristate {
        drive(self.selected(), self.serial.tx_bit(self.main.loaded()))
    }

    pub fn rx_valid(&self) -> bool {
        self.main.sync().valid()
    }

    pub fn rx_data(&self) -> u8 {
        self.main.sync().data()
    }

    /// Received byte during its one-cycle strobe
    pub fn rx(&self) -> Option<u8> {
        self.main.sync().output()
    }

    pub fn is_low_power(&self) -> bool {
        self.main.power().is_low_power()
    }

    pub fn power_state(&self) -> PowerState {
        self.main.power().state()
    }

    // Observation

    pub fn activity(&self) -> Activity {
        self.main.activity().state()
    }

    pub fn is_active(&self) -> bool {
        self.main.activity().is_active()
    }

    pub fn pending(&self) -> bool {
        self.main.pending()
    }

    pub fn selected(&self) -> bool {
        self.inputs.rstn && !self.inputs.cs_n
    }

    pub fn inputs(&self) -> MainInputs {
        self.inputs
    }

    pub fn sclk(&self) -> bool {
        self.sclk
    }

    pub fn mosi(&self) -> bool {
        self.mosi
    }

    pub fn main(&self) -> &MainDomain {
        &self.main
    }

    pub fn serial(&self) -> &SerialDomain {
        &self.serial
    }
}

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::modules::*;

use super::{Simulator, Trace};

const TRACE_SIGNALS: [&str; 9] = [
    "clk",
    "rstn",
    "cs_n",
    "sclk",
    "mosi",
    "miso",
    "active",
    "rx_valid",
    "low_power",
];

/// Testbench timing, in simulation steps
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TestbenchConfig {
    pub mode: Mode,
    /// The main clock rises once every `main_period` steps
    pub main_period: usize,
    pub sclk_half_period: usize,
    pub cs_lead: usize,
    pub cs_lag: usize,
    pub idle_gap: usize,
    /// Step budget for one `run_frames` call
    pub max_steps: usize,
    /// Record a waveform snapshot every step
    pub trace: bool,
}

impl Default for TestbenchConfig {
    fn default() -> Self {
        let main_period = Self::MAIN_PERIOD;

        TestbenchConfig {
            mode: Mode::Mode0,
            main_period,
            sclk_half_period: 2 * main_period,
            cs_lead: 3 * main_period,
            cs_lag: 2 * main_period,
            idle_gap: 4 * main_period,
            max_steps: 10_000_000,
            trace: false,
        }
    }
}

impl TestbenchConfig {
    const MAIN_PERIOD: usize = 2;

    /// Serial clock period `ratio` times the main clock period, with the
    /// shortest chip-select timing that still meets the slave's preconditions
    pub fn with_ratio(mode: Mode, ratio: usize) -> Result<Self> {
        let main_period = Self::MAIN_PERIOD;
        let sclk_half_period = ratio
            .checked_mul(main_period)
            .ok_or(Error::InvalidTiming("serial clock ratio out of range"))?
            / 2;

        Ok(TestbenchConfig {
            mode,
            sclk_half_period,
            cs_lead: (3 * main_period).max(sclk_half_period),
            cs_lag: main_period.max(sclk_half_period),
            idle_gap: (4 * main_period).max(sclk_half_period),
            ..TestbenchConfig::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.main_period < 2 {
            return Err(Error::InvalidTiming("main clock period must be at least two steps"));
        }

        if self.sclk_half_period == 0 {
            return Err(Error::InvalidTiming("serial clock half period must be nonzero"));
        }

        // the completion flag lives until chip-select is released
        if self.cs_lag < self.main_period {
            return Err(Error::InvalidTiming("chip-select lag shorter than one main clock period"));
        }

        // one cycle for the activity flag, one for the load register
        if self.cs_lead < 3 * self.main_period {
            return Err(Error::InvalidTiming("chip-select lead too short to load the transmit byte"));
        }

        if self.idle_gap < 2 * self.main_period {
            return Err(Error::InvalidTiming("idle gap too short for the slave to see deselection"));
        }

        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            sclk_half_period: self.sclk_half_period,
            cs_lead: self.cs_lead,
            cs_lag: self.cs_lag,
            idle_gap: self.idle_gap,
        }
    }
}

/// One `rx_valid` strobe seen by the consumer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub byte: u8,
    pub time: u64,
    /// Chip-select window the byte was received in
    pub window: usize,
}

#[derive(Clone, Debug)]
pub struct Report {
    pub mode: Mode,
    pub frames: Vec<FrameResult>,
    pub deliveries: Vec<Delivery>,
    /// Steps on which MISO was driven while chip-select was released
    pub bus_conflicts: usize,
    pub cycles: u64,
    pub low_power_cycles: u64,
}

impl Report {
    fn new(mode: Mode) -> Self {
        Report {
            mode,
            frames: Vec::new(),
            deliveries: Vec::new(),
            bus_conflicts: 0,
            cycles: 0,
            low_power_cycles: 0,
        }
    }

    pub fn received(&self) -> Vec<u8> {
        self.deliveries.iter().map(|d| d.byte).collect()
    }

    /// Words the master read back, one per window
    pub fn transmitted(&self) -> Vec<u8> {
        self.frames.iter().map(|f| f.miso).collect()
    }

    /// Steps from the last serial clock edge of window `index` to the delivery
    /// of its byte
    pub fn latency(&self, index: usize) -> Option<u64> {
        let last_edge = self.frames.get(index)?.last_edge?;

        self.deliveries
            .iter()
            .find(|d| d.window == index)
            .map(|d| d.time - last_edge)
    }
}

/// Drives a slave from a master, stepping both clock domains on a common time
/// base. The main clock and the serial clock have no phase relationship beyond
/// their configured periods.
pub struct Testbench {
    config: TestbenchConfig,
    slave: SpiSlave,
    master: Master,
    time: u64,
    windows: usize,
    report: Report,
    trace: Trace,
}

impl Testbench {
    pub fn new(config: TestbenchConfig) -> Result<Self> {
        config.validate()?;

        Ok(Testbench {
            config,
            slave: SpiSlave::new(config.mode),
            master: Master::new(config.mode, config.timing()),
            time: 0,
            windows: 0,
            report: Report::new(config.mode),
            trace: Trace::new(&TRACE_SIGNALS),
        })
    }

    pub fn config(&self) -> &TestbenchConfig {
        &self.config
    }

    pub fn slave(&self) -> &SpiSlave {
        &self.slave
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn into_report(self) -> Report {
        self.report
    }

    pub fn queue(&mut self, frame: Frame) -> Result<()> {
        self.master.queue(frame)
    }

    /// Queues `frames` and runs until the master is idle and no received byte
    /// is still in flight
    pub fn run_frames(&mut self, frames: impl IntoIterator<Item = Frame>) -> Result<&Report> {
        for frame in frames {
            self.queue(frame)?;
        }

        let max_steps = self.config.max_steps;
        let steps = self
            .step_until_settled(max_steps)
            .ok_or(Error::Timeout { steps: max_steps })?;

        info!(
            "{}: settled after {} steps, {} frames, {} bytes received",
            self.config.mode,
            steps,
            self.report.frames.len(),
            self.report.deliveries.len());

        Ok(&self.report)
    }

    /// Holds the slave in reset for `cycles` main clock cycles
    pub fn reset(&mut self, cycles: usize) {
        self.slave.set_reset(false);
        self.step_by(cycles * self.config.main_period);
        self.slave.set_reset(true);
    }

    fn main_clock(&self) -> bool {
        let period = self.config.main_period as u64;
        self.time % period < period / 2
    }

    fn settled(&self) -> bool {
        self.master.is_idle() && !self.slave.pending()
    }
}

impl Simulator for Testbench {
    fn step(&mut self) {
        let now = self.time;

        if let Some(result) = self.master.step(now, self.slave.miso()) {
            self.report.frames.push(result);
        }

        let pins = self.master.pins();

        if !pins.cs_n && self.slave.inputs().cs_n {
            self.windows += 1;
        }

        self.slave.set_mosi(pins.mosi);
        self.slave.set_chip_select(pins.cs_n);
        self.slave.set_sclk(pins.sclk);

        match self.master.tx_request() {
            Some(tx) => self.slave.set_tx(tx, true),
            None => self.slave.set_tx(0, false),
        }

        if pins.cs_n && self.slave.miso().is_driven() {
            self.report.bus_conflicts += 1;
        }

        if now % self.config.main_period as u64 == 0 {
            self.slave.clock();
            self.report.cycles += 1;

            if self.slave.is_low_power() {
                self.report.low_power_cycles += 1;
            }

            if let Some(byte) = self.slave.rx() {
                debug!("testbench: received {:#04x} at step {}", byte, now);

                self.report.deliveries.push(Delivery {
                    byte,
                    time: now,
                    window: self.windows.saturating_sub(1),
                });
            }
        }

        if self.config.trace {
            self.snapshot();
        }

        self.time += 1;
    }

    fn step_until_settled(&mut self, max_steps: usize) -> Option<usize> {
        for i in 1..=max_steps {
            self.step();

            if self.settled() {
                return Some(i);
            }
        }

        None
    }

    fn snapshot(&mut self) {
        let inputs = self.slave.inputs();

        self.trace.record(&[
            self.main_clock().into(),
            inputs.rstn.into(),
            inputs.cs_n.into(),
            self.slave.sclk().into(),
            self.slave.mosi().into(),
            self.slave.miso(),
            self.slave.is_active().into(),
            self.slave.rx_valid().into(),
            self.slave.is_low_power().into(),
        ]);
    }

    fn show(&self) {
        self.trace.show();
    }

    fn clear(&mut self) {
        self.trace.clear();
    }
}

/// Sends each of `bytes` in its own window, in every mode, with the four modes
/// running in parallel. Every window offers the complement of its byte for
/// transmission.
pub fn sweep(ratio: usize, bytes: &[u8]) -> Result<Vec<Report>> {
    Mode::ALL[..]
        .par_iter()
        .map(|&mode| {
            let mut tb = Testbench::new(TestbenchConfig::with_ratio(mode, ratio)?)?;
            tb.run_frames(bytes.iter().map(|&b| Frame::byte(b).with_tx(!b)))?;
            Ok(tb.into_report())
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn check_report(report: &Report, bytes: &[u8], main_period: usize) {
        let mode = report.mode;

        assert_eq!(report.received(), bytes, "{}", mode);
        assert_eq!(
            report.transmitted(),
            bytes.iter().map(|b| !b).collect::<Vec<_>>(),
            "{}",
            mode);
        assert_eq!(report.bus_conflicts, 0, "{}", mode);

        for (index, frame) in report.frames.iter().enumerate() {
            let preload = Tristate::Driven(frame.frame.tx.unwrap() & 0x80 != 0);
            assert_eq!(frame.first_bit, preload, "{} window {}", mode, index);
            assert_eq!(frame.released, 0, "{} window {}", mode, index);

            let latency = report.latency(index).unwrap();
            assert!(latency < 3 * main_period as u64, "{} window {}: {}", mode, index, latency);
        }
    }

    #[test]
    fn test_sweep_all_bytes() {
        let bytes: Vec<u8> = (0..=255).collect();

        let reports = sweep(1, &bytes).unwrap();
        assert_eq!(reports.len(), 4);

        for report in &reports {
            check_report(report, &bytes, TestbenchConfig::MAIN_PERIOD);
        }
    }

    #[test]
    fn test_clock_ratios() {
        let bytes = [0x00, 0xc1, 0x5a, 0xff, 0x81];

        for ratio in [1, 10, 100] {
            for report in sweep(ratio, &bytes).unwrap() {
                // one strobe per window, never more
                assert_eq!(report.deliveries.len(), bytes.len(), "ratio {}", ratio);
                check_report(&report, &bytes, TestbenchConfig::MAIN_PERIOD);
            }
        }
    }

    #[test]
    fn test_mode1_scenario() {
        let mut tb = Testbench::new(TestbenchConfig::with_ratio(Mode::Mode1, 4).unwrap()).unwrap();
        assert_eq!(tb.config().mode, Mode::Mode1);
        assert_eq!(tb.config().sclk_half_period, 4);

        let report = tb.run_frames([Frame::byte(0xc1).with_tx(0x5a)]).unwrap();

        assert_eq!(report.received(), vec![0xc1]);
        assert_eq!(report.transmitted(), vec![0x5a]);
        assert_eq!(report.frames[0].first_bit, Tristate::Driven(false));
    }

    #[test]
    fn test_partial_frame() {
        for mode in Mode::ALL {
            let mut tb = Testbench::new(TestbenchConfig::with_ratio(mode, 3).unwrap()).unwrap();
            let report = tb
                .run_frames([Frame::partial(0xff, 3), Frame::byte(0x42)])
                .unwrap();

            assert_eq!(report.received(), vec![0x42], "{}", mode);
            assert_eq!(report.deliveries[0].window, 1);
            assert_eq!(report.latency(0), None);
        }
    }

    #[test]
    fn test_tristate_in_trace() {
        let config = TestbenchConfig {
            trace: true,
            ..TestbenchConfig::with_ratio(Mode::Mode2, 2).unwrap()
        };

        let mut tb = Testbench::new(config).unwrap();
        tb.run_frames([Frame::byte(0x3c).with_tx(0x00), Frame::partial(0x80, 5)]).unwrap();

        let trace = tb.trace();
        assert_eq!(trace.len() as u64, tb.time());

        let cs_n = trace.row("cs_n").unwrap().chars();
        let miso = trace.row("miso").unwrap().chars();

        for (cs_n, miso) in cs_n.zip(miso) {
            match cs_n {
                '█' => assert_eq!(miso, 'z'),
                _ => assert_ne!(miso, 'z'),
            }
        }

        tb.clear();
        assert!(tb.trace().is_empty());
    }

    #[test]
    fn test_low_power_between_frames() {
        let mut tb = Testbench::new(TestbenchConfig::with_ratio(Mode::Mode3, 4).unwrap()).unwrap();
        tb.run_frames([Frame::byte(0x12), Frame::byte(0x34)]).unwrap();

        assert!(tb.slave().is_low_power());
        assert!(tb.report().low_power_cycles > 0);
        assert!(tb.report().low_power_cycles < tb.report().cycles);
    }

    #[test]
    fn test_reset() {
        let mut tb = Testbench::new(TestbenchConfig::default()).unwrap();
        tb.run_frames([Frame::byte(0x99).with_tx(0x66)]).unwrap();
        assert_eq!(tb.slave().rx_data(), 0x99);

        tb.reset(2);
        assert_eq!(tb.slave().rx_data(), 0x00);
        assert_eq!(tb.slave().main().loaded(), 0x00);

        let report = tb.run_frames([Frame::byte(0x77).with_tx(0x11)]).unwrap();
        assert_eq!(report.received(), vec![0x99, 0x77]);
        assert_eq!(report.transmitted(), vec![0x66, 0x11]);
    }

    #[test]
    fn test_invalid_config() {
        let config = TestbenchConfig::with_ratio(Mode::Mode0, 0).unwrap();
        assert!(matches!(Testbench::new(config), Err(Error::InvalidTiming(_))));

        // serial clock period would not fit in a step count
        assert!(matches!(
            TestbenchConfig::with_ratio(Mode::Mode0, usize::MAX),
            Err(Error::InvalidTiming(_))
        ));

        let config = TestbenchConfig {
            cs_lag: 1,
            ..TestbenchConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidTiming(_))));

        let config = TestbenchConfig {
            cs_lead: 2,
            ..TestbenchConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidTiming(_))));
    }

    #[test]
    fn test_timeout() {
        let config = TestbenchConfig {
            max_steps: 10,
            ..TestbenchConfig::default()
        };

        let mut tb = Testbench::new(config).unwrap();
        let err = tb.run_frames([Frame::byte(0x01)]).unwrap_err();

        assert_eq!(err, Error::Timeout { steps: 10 });
    }

    #[test]
    fn test_invalid_frame() {
        let mut tb = Testbench::new(TestbenchConfig::default()).unwrap();
        let err = tb.run_frames([Frame::partial(0x00, 12)]).unwrap_err();

        assert_eq!(err, Error::InvalidFrame { bits: 12 });
    }
}

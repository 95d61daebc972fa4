use clap::Parser;
use log::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use spi_slave::simulator::{bench, Simulator, Testbench, TestbenchConfig};
use spi_slave::{Frame, Mode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SPI mode (0-3)
    #[arg(short, long, default_value_t = 0)]
    mode: u8,

    /// Serial clock period in main clock periods
    #[arg(short, long, default_value_t = 4)]
    ratio: usize,

    /// Bytes the master sends, in hex
    #[arg(long, num_args = 1.., value_parser = parse_hex)]
    rx: Vec<u8>,

    /// Bytes offered for transmission, one per frame, in hex. Defaults to the
    /// complement of each sent byte.
    #[arg(long, num_args = 1.., value_parser = parse_hex)]
    tx: Vec<u8>,

    /// Print a waveform of the run
    #[arg(long)]
    trace: bool,

    /// Run a throughput benchmark over this many frames
    #[arg(long)]
    bench: Option<usize>,

    /// Log level, overridden per target by RUST_LOG
    #[arg(long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,
}

fn parse_hex(s: &str) -> Result<u8, std::num::ParseIntError> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u8::from_str_radix(s, 16)
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse().map_err(|_| format!("unknown log level '{}'", s))
}

/// CLI level as the default directive, refined per target by RUST_LOG
fn log_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // log records from the library are bridged into the subscriber
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.log_level))
        .with_writer(std::io::stderr)
        .init();

    let mode = Mode::try_from(args.mode)?;
    let config = TestbenchConfig {
        trace: args.trace,
        ..TestbenchConfig::with_ratio(mode, args.ratio)?
    };

    let rx = if args.rx.is_empty() { b"hello".to_vec() } else { args.rx };
    let frames: Vec<Frame> = rx
        .iter()
        .enumerate()
        .map(|(i, &byte)| Frame::byte(byte).with_tx(args.tx.get(i).copied().unwrap_or(!byte)))
        .collect();

    let mut tb = Testbench::new(config)?;

    info!(
        "{}, main period {} steps, serial half period {} steps, {} frames",
        mode,
        tb.config().main_period,
        tb.config().sclk_half_period,
        frames.len());

    tb.run_frames(frames)?;

    if args.trace {
        tb.show();
    }

    let report = tb.report();

    println!("SPI received: {:02x?}", report.received());
    println!("SPI received: {:?}", String::from_utf8(report.received()));
    println!("SPI transmitted: {:02x?}", report.transmitted());

    if report.bus_conflicts > 0 {
        println!("MISO driven while deselected on {} steps", report.bus_conflicts);
    }

    if let Some(frames) = args.bench {
        let result = bench(config, frames)?;
        println!("{} main clocks in {}µs ({}k/s)", result.cycles, result.elapsed_us, result.kcycles_per_s);
    }

    Ok(())
}

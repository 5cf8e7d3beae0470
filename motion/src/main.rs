//! Streams orientation and temperature from an MPU9250 on a Linux i2c bus

use std::num::ParseIntError;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use common::error::LogErrorExt;
use motion::peripheral::mpu9250::{AccelRange, Dlpf, MPU9250_ADDRESS};
use motion::{Motion, MotionConfig};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// I2C bus number, /dev/i2c-N
    #[arg(short, long, default_value_t = 1)]
    bus: u8,

    /// Sensor address, 0x68 or 0x69 with AD0 high
    #[arg(short, long, default_value = "0x68", value_parser = parse_address)]
    address: u16,

    /// Delay between printed samples
    #[arg(short, long, default_value_t = 100)]
    interval_ms: u64,

    /// Stop after this many samples
    #[arg(short = 'n', long)]
    samples: Option<u64>,

    /// Time to put the sensor down flat before calibrating
    #[arg(long, default_value_t = 1000)]
    settle_ms: u64,

    /// Output rate = internal rate / (1 + divider)
    #[arg(long, default_value_t = 5)]
    sample_rate_divider: u8,

    #[arg(long, value_enum, default_value_t = AccelRange::G2)]
    acc_range: AccelRange,

    #[arg(long, value_enum, default_value_t = Dlpf::_6)]
    acc_dlpf: Dlpf,

    /// Bypass the accelerometer low pass filter
    #[arg(long)]
    no_acc_dlpf: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl From<&Args> for MotionConfig {
    fn from(args: &Args) -> Self {
        MotionConfig {
            bus: args.bus,
            address: args.address,
            settle_time: Duration::from_millis(args.settle_ms),
            acc_bounds: None,
            sample_rate_divider: args.sample_rate_divider,
            acc_range: args.acc_range,
            acc_dlpf: (!args.no_acc_dlpf).then_some(args.acc_dlpf),
        }
    }
}

fn parse_address(arg: &str) -> Result<u16, ParseIntError> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();
    info!("Starting motion");

    let config = MotionConfig::from(&args);
    if config.address != MPU9250_ADDRESS {
        info!("Using address {:#04x}", config.address);
    }

    let mut motion = Motion::open(config).context("Open MPU9250")?;
    motion.init()?;

    println!(
        "{:>10} {:>10} {:>10} | {:>10} {:>10} | {:>10}",
        "Angle X", "Angle Y", "Angle Z", "Roll", "Pitch", "Temp"
    );
    println!("{}", "-".repeat(71));

    let interval = Duration::from_millis(args.interval_ms);
    let mut deadline = Instant::now();
    let mut count = 0;
    while args.samples.map_or(true, |samples| count < samples) {
        deadline += interval;

        let sample = (|| -> anyhow::Result<_> {
            Ok((motion.angles()?, motion.roll()?, motion.pitch()?, motion.temperature()?))
        })();

        if let Some((angles, roll, pitch, temperature)) = sample.log_error("Could not read MPU9250") {
            println!(
                "{:>10} {:>10} {:>10} | {:>10} {:>10} | {:>10}",
                angles.x, angles.y, angles.z, roll, pitch, temperature
            );
        }

        count += 1;
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
    }

    info!("Motion stopped");

    Ok(())
}

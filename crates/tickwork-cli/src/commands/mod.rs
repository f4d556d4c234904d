//! Command implementations for tickctl

pub mod jitter;
pub mod simulate;
pub mod watchdog;

use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tickwork_robot::RobotMode;

/// An extra periodic callback: `PERIOD_MS` or `PERIOD_MS:OFFSET_MS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicSpec {
    pub period: Duration,
    pub offset: Duration,
}

impl PeriodicSpec {
    pub fn label(&self) -> String {
        format!("periodic {}ms+{}ms", self.period.as_millis(), self.offset.as_millis())
    }
}

fn parse_millis(text: &str) -> Result<u64, String> {
    text.trim()
        .parse::<u64>()
        .map_err(|e| format!("'{text}' is not a whole number of milliseconds: {e}"))
}

pub fn parse_periodic(spec: &str) -> Result<PeriodicSpec, String> {
    let (period, offset) = match spec.split_once(':') {
        Some((period, offset)) => (parse_millis(period)?, parse_millis(offset)?),
        None => (parse_millis(spec)?, 0),
    };
    if period == 0 {
        return Err(format!("'{spec}' has a zero period"));
    }
    Ok(PeriodicSpec {
        period: Duration::from_millis(period),
        offset: Duration::from_millis(offset),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl From<ModeArg> for RobotMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Disabled => Self::Disabled,
            ModeArg::Autonomous => Self::Autonomous,
            ModeArg::Teleop => Self::Teleop,
            ModeArg::Test => Self::Test,
        }
    }
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// JSON file with a robot configuration; missing fields take defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Simulated run time
    #[arg(long, default_value_t = 1_000)]
    pub duration_ms: u64,

    /// Override the main-loop period
    #[arg(long)]
    pub period_ms: Option<u64>,

    /// Mode reported by the simulated driver station
    #[arg(long, value_enum, default_value_t = ModeArg::Teleop)]
    pub mode: ModeArg,

    /// Extra periodic callback, PERIOD_MS[:OFFSET_MS]; repeatable
    #[arg(long, value_parser = parse_periodic)]
    pub periodic: Vec<PeriodicSpec>,

    /// Simulated work done inside every robot_periodic call
    #[arg(long, default_value_t = 0)]
    pub work_us: u64,
}

#[derive(Debug, Args)]
pub struct WatchdogArgs {
    /// Watchdog timeout
    #[arg(long, default_value_t = 100)]
    pub timeout_ms: u64,

    /// Interval between feeds
    #[arg(long, default_value_t = 50)]
    pub feed_every_ms: u64,

    /// Simulated run time
    #[arg(long, default_value_t = 1_000)]
    pub duration_ms: u64,
}

#[derive(Debug, Args)]
pub struct JitterArgs {
    /// Notifier period
    #[arg(long, default_value_t = 5)]
    pub period_ms: u64,

    /// Number of ticks to measure
    #[arg(long, default_value_t = 200)]
    pub ticks: u32,
}

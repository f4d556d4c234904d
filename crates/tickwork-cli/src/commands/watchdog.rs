//! Simulated watchdog feeding

use anyhow::Result;
use crossbeam::channel;
use serde::Serialize;
use std::time::Duration;
use tickwork_alarm::{Clock, SimTimebase};
use tickwork_watchdog::{Watchdog, WatchdogConfig, WatchdogRegistry};

use super::WatchdogArgs;
use super::simulate::{Fire, report_fire};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Serialize)]
pub struct WatchdogReport {
    pub timeout_us: u64,
    pub feed_every_us: u64,
    pub duration_us: u64,
    pub feeds: u32,
    pub expiries_us: Vec<u64>,
    pub expired_at_end: bool,
}

pub fn run(args: &WatchdogArgs) -> Result<WatchdogReport, CliError> {
    if args.feed_every_ms == 0 {
        return Err(CliError::InvalidArgument(
            "feed interval must be at least 1 ms".to_string(),
        ));
    }

    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let (events, received) = channel::unbounded::<Fire>();
    let watchdog = {
        let clock = timebase.clone();
        Watchdog::new(&registry, Duration::from_millis(args.timeout_ms), move || {
            report_fire(&events, "expired", clock.now_us());
        })
    };

    watchdog.enable()?;
    let mut elapsed_ms = 0u64;
    let mut feeds = 0u32;
    while elapsed_ms < args.duration_ms {
        let step_ms = args.feed_every_ms.min(args.duration_ms.saturating_sub(elapsed_ms));
        timebase.step(Duration::from_millis(step_ms))?;
        elapsed_ms = elapsed_ms.saturating_add(step_ms);
        if step_ms == args.feed_every_ms {
            watchdog.feed()?;
            feeds = feeds.saturating_add(1);
        }
    }

    let expired_at_end = watchdog.is_expired();
    drop(watchdog);
    registry.close();

    Ok(WatchdogReport {
        timeout_us: args.timeout_ms.saturating_mul(1_000),
        feed_every_us: args.feed_every_ms.saturating_mul(1_000),
        duration_us: args.duration_ms.saturating_mul(1_000),
        feeds,
        expiries_us: received.try_iter().map(|fire| fire.at_us).collect(),
        expired_at_end,
    })
}

pub fn execute(args: &WatchdogArgs, json: bool) -> Result<()> {
    let report = run(args)?;
    if json {
        output::print_json(&report);
        return Ok(());
    }

    output::print_heading("Watchdog:");
    output::print_field("timeout", output::format_us(report.timeout_us));
    output::print_field("feed every", output::format_us(report.feed_every_us));
    output::print_field("duration", output::format_us(report.duration_us));
    output::print_field("feeds", report.feeds);
    output::print_field("expiries", report.expiries_us.len());
    for at_us in &report.expiries_us {
        output::print_field("expired at", output::format_us(*at_us));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn args(timeout_ms: u64, feed_every_ms: u64, duration_ms: u64) -> WatchdogArgs {
        WatchdogArgs {
            timeout_ms,
            feed_every_ms,
            duration_ms,
        }
    }

    #[test]
    fn test_fed_in_time_never_expires() -> TestResult {
        let report = run(&args(100, 50, 1_000))?;
        assert!(report.expiries_us.is_empty());
        assert_eq!(report.feeds, 20);
        assert!(!report.expired_at_end);
        Ok(())
    }

    #[test]
    fn test_slow_feeding_expires_between_feeds() -> TestResult {
        let report = run(&args(100, 150, 450))?;
        assert_eq!(report.expiries_us, vec![100_000, 250_000, 400_000]);
        assert_eq!(report.feeds, 3);
        Ok(())
    }

    #[test]
    fn test_partial_last_step_is_not_a_feed() -> TestResult {
        let report = run(&args(100, 60, 200))?;
        assert_eq!(report.feeds, 3);
        assert!(report.expiries_us.is_empty());
        Ok(())
    }

    #[test]
    fn test_zero_feed_interval_rejected() {
        assert!(matches!(run(&args(100, 0, 100)), Err(CliError::InvalidArgument(_))));
    }
}

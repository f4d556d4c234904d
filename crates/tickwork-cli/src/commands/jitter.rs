//! Notifier lateness on the system clock

use anyhow::Result;
use crossbeam::channel;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickwork_alarm::SystemTimebase;
use tickwork_notifier::Notifier;
use tickwork_scheduler::{DispatchStats, LatenessSnapshot, Scheduler, SchedulerConfig};
use tracing::{debug, info};

use super::JitterArgs;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Clone, Serialize)]
pub struct JitterReport {
    pub period_us: u64,
    pub ticks: u32,
    pub wall_time_us: u64,
    pub stats: DispatchStats,
    pub lateness: LatenessSnapshot,
}

pub fn run(args: &JitterArgs) -> Result<JitterReport, CliError> {
    if args.period_ms == 0 || args.ticks == 0 {
        return Err(CliError::InvalidArgument(
            "period and tick count must be non-zero".to_string(),
        ));
    }
    let period = Duration::from_millis(args.period_ms);
    let tick_timeout = period.saturating_mul(10).saturating_add(Duration::from_secs(1));

    let timebase = SystemTimebase::new();
    let scheduler = Arc::new(Scheduler::new(&timebase, SchedulerConfig::named("tickctl-jitter"))?);
    let (ticks, received) = channel::unbounded::<()>();
    let notifier = Notifier::on_scheduler(
        Arc::clone(&scheduler),
        move || {
            if let Err(err) = ticks.send(()) {
                debug!(%err, "Tick dropped");
            }
        },
        "jitter",
    );

    let started = Instant::now();
    notifier.start_periodic(period)?;
    info!(period_ms = args.period_ms, ticks = args.ticks, "Measuring notifier lateness");
    for seen in 0..args.ticks {
        if received.recv_timeout(tick_timeout).is_err() {
            notifier.close();
            scheduler.close();
            return Err(CliError::Stalled(format!(
                "no tick within {tick_timeout:?} after {seen} ticks"
            )));
        }
    }
    notifier.stop();
    let wall_time = started.elapsed();

    let report = JitterReport {
        period_us: u64::try_from(period.as_micros()).unwrap_or(u64::MAX),
        ticks: args.ticks,
        wall_time_us: u64::try_from(wall_time.as_micros()).unwrap_or(u64::MAX),
        stats: scheduler.stats(),
        lateness: scheduler.lateness(),
    };
    notifier.close();
    scheduler.close();
    Ok(report)
}

pub fn execute(args: &JitterArgs, json: bool) -> Result<()> {
    let report = run(args)?;
    if json {
        output::print_json(&report);
        return Ok(());
    }

    output::print_heading("Jitter:");
    output::print_field("period", output::format_us(report.period_us));
    output::print_field("ticks", report.ticks);
    output::print_field("wall time", output::format_us(report.wall_time_us));
    output::print_stats(&report.stats);
    output::print_lateness(&report.lateness);
    Ok(())
}

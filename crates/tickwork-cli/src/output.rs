//! Output formatting for CLI reports

use anyhow::Error;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use tickwork_scheduler::{DispatchStats, LatenessSnapshot};

use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::InvalidArgument(_)) => "invalid_argument",
        Some(CliError::Stalled(_)) => "stalled",
        Some(CliError::IoError(_)) => "io",
        Some(CliError::JsonError(_)) => "json",
        Some(CliError::Alarm(_)) => "alarm",
        Some(CliError::Scheduler(_)) => "scheduler",
        Some(CliError::Robot(_)) => "robot",
        Some(CliError::Watchdog(_)) => "watchdog",
        Some(CliError::Notifier(_)) => "notifier",
        None => "unknown",
    }
}

/// Print a report as `{"success": true, "report": ...}`.
pub fn print_json<T: Serialize>(report: &T) {
    let output = json!({
        "success": true,
        "report": report
    });
    match serde_json::to_string_pretty(&output) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format report as JSON: {e}"),
    }
}

pub fn print_heading(title: &str) {
    println!("{}", title.bold());
}

pub fn print_field(name: &str, value: impl std::fmt::Display) {
    println!("  {:<18} {}", format!("{name}:").dimmed(), value);
}

pub fn print_stats(stats: &DispatchStats) {
    print_heading("Dispatch:");
    print_field("wakeups", stats.wakeups);
    print_field("empty wakeups", stats.empty_wakeups);
    print_field("dispatched", stats.dispatched);
    let overruns = if stats.overruns > 0 {
        stats.overruns.to_string().yellow()
    } else {
        stats.overruns.to_string().green()
    };
    print_field("overruns", overruns);
    print_field("skipped periods", stats.skipped_periods);
    let faults = if stats.faults > 0 {
        stats.faults.to_string().red()
    } else {
        stats.faults.to_string().green()
    };
    print_field("faults", faults);
}

pub fn print_lateness(lateness: &LatenessSnapshot) {
    print_heading("Lateness:");
    print_field("samples", lateness.total_dispatches);
    print_field("mean", format_us(lateness.mean_us));
    print_field("p50", format_us(lateness.p50_us));
    print_field("p99", format_us(lateness.p99_us));
    print_field("max", format_us(lateness.max_us));
}

pub fn format_us(us: u64) -> String {
    if us >= 1_000 {
        format!("{:.3} ms", std::time::Duration::from_micros(us).as_secs_f64() * 1_000.0)
    } else {
        format!("{us} µs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_us() {
        assert_eq!(format_us(250), "250 µs");
        assert_eq!(format_us(1_500), "1.500 ms");
    }

    #[test]
    fn test_error_type_name() {
        let err = Error::new(CliError::InvalidArgument("x".to_string()));
        assert_eq!(error_type_name(&err), "invalid_argument");
        let other = anyhow::anyhow!("plain");
        assert_eq!(error_type_name(&other), "unknown");
    }
}

//! tickctl - tickwork scheduler driver
//!
//! Runs robot programs, watchdogs and notifiers on simulated or real time and
//! reports how the scheduler loop behaved.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{JitterArgs, SimulateArgs, WatchdogArgs};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "tickctl")]
#[command(about = "Simulate and measure tickwork periodic schedulers")]
#[command(version)]
#[command(long_about = "
tickctl drives the tickwork scheduler facades outside of a real robot program.
`simulate` and `watchdog` run on stepped simulated time and are deterministic;
`jitter` runs a notifier on the system clock and reports wake-up lateness.

Use --json for machine-readable output.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(long, global = true, help = "Output in JSON format for machine parsing")]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated robot main loop
    Simulate(SimulateArgs),

    /// Feed a simulated watchdog on a fixed cadence
    Watchdog(WatchdogArgs),

    /// Measure notifier wake-up lateness on the system clock
    Jitter(JitterArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = match e.downcast_ref::<CliError>() {
                Some(CliError::InvalidArgument(_)) | Some(CliError::JsonError(_)) => 4,
                Some(CliError::Stalled(_)) => 5,
                _ => 1,
            };

            std::process::exit(exit_code);
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Simulate(args) => commands::simulate::execute(args, cli.json),
        Commands::Watchdog(args) => commands::watchdog::execute(args, cli.json),
        Commands::Jitter(args) => commands::jitter::execute(args, cli.json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ModeArg;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_simulate_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["tickctl", "simulate"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        let Commands::Simulate(args) = cli.command else {
            return Err("expected simulate".into());
        };
        assert_eq!(args.duration_ms, 1_000);
        assert_eq!(args.mode, ModeArg::Teleop);
        assert!(args.periodic.is_empty());
        assert!(args.config.is_none());
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["tickctl", "watchdog", "--timeout-ms", "50", "--json", "-vv"])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        let Commands::Watchdog(args) = cli.command else {
            return Err("expected watchdog".into());
        };
        assert_eq!(args.timeout_ms, 50);
        Ok(())
    }

    #[test]
    fn parse_periodic_specs() -> TestResult {
        let cli = Cli::try_parse_from([
            "tickctl", "simulate", "--periodic", "10", "--periodic", "10:5", "--mode", "autonomous",
        ])?;
        let Commands::Simulate(args) = cli.command else {
            return Err("expected simulate".into());
        };
        assert_eq!(args.periodic.len(), 2);
        assert_eq!(args.mode, ModeArg::Autonomous);
        Ok(())
    }

    #[test]
    fn parse_rejects_bad_periodic_spec() {
        let result = Cli::try_parse_from(["tickctl", "simulate", "--periodic", "ten"]);
        assert!(result.is_err_and(|e| e.to_string().contains("ten")));
    }

    #[test]
    fn parse_jitter() -> TestResult {
        let cli = Cli::try_parse_from(["tickctl", "jitter", "--period-ms", "2", "--ticks", "50"])?;
        let Commands::Jitter(args) = cli.command else {
            return Err("expected jitter".into());
        };
        assert_eq!(args.period_ms, 2);
        assert_eq!(args.ticks, 50);
        Ok(())
    }
}

//! Simulated robot main loop

use anyhow::Result;
use crossbeam::channel::{self, Sender};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tickwork_alarm::{Clock, SimTimebase};
use tickwork_robot::{RobotMode, RobotProgram, SimDriverStation, TimedRobot, TimedRobotConfig};
use tickwork_scheduler::{DispatchStats, LatenessSnapshot};
use tracing::{debug, info};

use super::SimulateArgs;
use crate::error::CliError;
use crate::output;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub(crate) struct Fire {
    pub label: String,
    pub at_us: u64,
}

pub(crate) fn report_fire(events: &Sender<Fire>, label: &str, at_us: u64) {
    let fire = Fire {
        label: label.to_string(),
        at_us,
    };
    if let Err(err) = events.send(fire) {
        debug!(%err, "Fire report dropped");
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallbackReport {
    pub label: String,
    pub fires: usize,
    pub first_us: Option<u64>,
    pub last_us: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub duration_us: u64,
    pub period_us: u64,
    pub mode: RobotMode,
    pub callbacks: Vec<CallbackReport>,
    pub stats: DispatchStats,
    pub lateness: LatenessSnapshot,
}

/// Program that reports its hooks and optionally burns simulated time.
struct ReportingProgram {
    timebase: SimTimebase,
    events: Sender<Fire>,
    work_us: u64,
}

impl ReportingProgram {
    fn report(&self, label: &str) {
        report_fire(&self.events, label, self.timebase.now_us());
    }
}

impl RobotProgram for ReportingProgram {
    fn robot_init(&mut self) {
        self.report("robot_init");
    }

    fn robot_periodic(&mut self) {
        self.report("robot_periodic");
        if self.work_us > 0 {
            self.timebase.advance_us(self.work_us);
        }
    }

    fn disabled_init(&mut self) {
        self.report("disabled_init");
    }

    fn autonomous_init(&mut self) {
        self.report("autonomous_init");
    }

    fn teleop_init(&mut self) {
        self.report("teleop_init");
    }

    fn test_init(&mut self) {
        self.report("test_init");
    }
}

pub(crate) fn load_config(path: &Path) -> Result<TimedRobotConfig, CliError> {
    let text = std::fs::read_to_string(path)?;
    let config: TimedRobotConfig = serde_json::from_str(&text)?;
    Ok(config)
}

fn wait_running<P: RobotProgram>(robot: &TimedRobot<P>) -> Result<(), CliError> {
    let give_up = Instant::now() + STARTUP_TIMEOUT;
    while !robot.is_running() {
        if Instant::now() >= give_up {
            return Err(CliError::Stalled("robot did not start".to_string()));
        }
        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

pub(crate) fn summarize(labels: &[String], fires: &[Fire]) -> Vec<CallbackReport> {
    labels
        .iter()
        .map(|label| {
            let times: Vec<u64> = fires
                .iter()
                .filter(|fire| &fire.label == label)
                .map(|fire| fire.at_us)
                .collect();
            CallbackReport {
                label: label.clone(),
                fires: times.len(),
                first_us: times.first().copied(),
                last_us: times.last().copied(),
            }
        })
        .collect()
}

pub fn run(args: &SimulateArgs) -> Result<SimulationReport, CliError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TimedRobotConfig::default(),
    };
    config.simulation = true;
    if let Some(period_ms) = args.period_ms {
        config.period = Duration::from_millis(period_ms);
    }
    config.validate()?;
    let period = config.period;

    let timebase = SimTimebase::new();
    let ds = Arc::new(SimDriverStation::new());
    ds.set_ds_attached(true);
    ds.set_mode(args.mode.into());

    let (events, received) = channel::unbounded();
    let program = ReportingProgram {
        timebase: timebase.clone(),
        events: events.clone(),
        work_us: args.work_us,
    };
    let robot = Arc::new(TimedRobot::new(&timebase, program, ds.clone(), config)?);

    let mut labels = vec!["robot_periodic".to_string()];
    for spec in &args.periodic {
        let label = spec.label();
        let events = events.clone();
        let clock = timebase.clone();
        let fire_label = label.clone();
        robot.add_periodic(
            move || report_fire(&events, &fire_label, clock.now_us()),
            spec.period,
            spec.offset,
        )?;
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    let competition = {
        let robot = Arc::clone(&robot);
        thread::spawn(move || robot.start_competition())
    };
    wait_running(&robot)?;
    info!(duration_ms = args.duration_ms, mode = ?args.mode, "Simulation started");

    let duration = Duration::from_millis(args.duration_ms);
    let stepped = timebase.step(duration);
    robot.end_competition();
    let outcome = competition
        .join()
        .map_err(|panic| CliError::Stalled(format!("competition thread panicked: {panic:?}")))?;
    stepped?;
    outcome?;

    let stats = robot.stats();
    let lateness = robot.lateness();
    robot.close();

    let fires: Vec<Fire> = received.try_iter().collect();
    Ok(SimulationReport {
        duration_us: u64::try_from(duration.as_micros()).unwrap_or(u64::MAX),
        period_us: u64::try_from(period.as_micros()).unwrap_or(u64::MAX),
        mode: args.mode.into(),
        callbacks: summarize(&labels, &fires),
        stats,
        lateness,
    })
}

pub fn execute(args: &SimulateArgs, json: bool) -> Result<()> {
    let report = run(args)?;
    if json {
        output::print_json(&report);
        return Ok(());
    }

    output::print_heading("Simulation:");
    output::print_field("duration", output::format_us(report.duration_us));
    output::print_field("loop period", output::format_us(report.period_us));
    output::print_field("mode", report.mode);
    output::print_heading("Callbacks:");
    for callback in &report.callbacks {
        let span = match (callback.first_us, callback.last_us) {
            (Some(first), Some(last)) => format!(
                "{} fires, {} .. {}",
                callback.fires,
                output::format_us(first),
                output::format_us(last)
            ),
            _ => "never fired".to_string(),
        };
        output::print_field(&callback.label, span);
    }
    output::print_stats(&report.stats);
    output::print_lateness(&report.lateness);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ModeArg, parse_periodic};
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn args(duration_ms: u64, periodic: &[&str]) -> Result<SimulateArgs, String> {
        Ok(SimulateArgs {
            config: None,
            duration_ms,
            period_ms: None,
            mode: ModeArg::Teleop,
            periodic: periodic.iter().map(|spec| parse_periodic(spec)).collect::<Result<_, _>>()?,
            work_us: 0,
        })
    }

    fn callback<'a>(report: &'a SimulationReport, label: &str) -> Option<&'a CallbackReport> {
        report.callbacks.iter().find(|c| c.label == label)
    }

    #[test]
    fn test_loop_and_extra_periodic() -> TestResult {
        let report = run(&args(100, &["10:5"])?)?;

        let loop_ticks = callback(&report, "robot_periodic").ok_or("no loop report")?;
        assert_eq!(loop_ticks.fires, 5);
        assert_eq!(loop_ticks.first_us, Some(20_000));
        assert_eq!(loop_ticks.last_us, Some(100_000));

        let extra = callback(&report, "periodic 10ms+5ms").ok_or("no periodic report")?;
        assert_eq!(extra.fires, 9);
        assert_eq!(extra.first_us, Some(15_000));
        assert_eq!(extra.last_us, Some(95_000));

        assert_eq!(report.stats.dispatched, 14);
        assert_eq!(report.stats.faults, 0);
        Ok(())
    }

    #[test]
    fn test_period_override() -> TestResult {
        let mut args = args(50, &[])?;
        args.period_ms = Some(10);
        let report = run(&args)?;
        assert_eq!(report.period_us, 10_000);
        assert_eq!(callback(&report, "robot_periodic").map(|c| c.fires), Some(5));
        Ok(())
    }

    #[test]
    fn test_config_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, r#"{{"period":{{"secs":0,"nanos":25000000}},"thread_name":"file-loop"}}"#)?;
        let config = load_config(file.path())?;
        assert_eq!(config.period, Duration::from_millis(25));
        assert_eq!(config.thread_name, "file-loop");
        Ok(())
    }

    #[test]
    fn test_bad_config_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "not json")?;
        assert!(matches!(load_config(file.path()), Err(CliError::JsonError(_))));
        Ok(())
    }

    #[test]
    fn test_summarize_keeps_label_order() {
        let fires = vec![
            Fire { label: "b".to_string(), at_us: 5 },
            Fire { label: "a".to_string(), at_us: 7 },
            Fire { label: "b".to_string(), at_us: 9 },
        ];
        let labels = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let reports = summarize(&labels, &fires);
        let fires: Vec<usize> = reports.iter().map(|r| r.fires).collect();
        assert_eq!(fires, vec![1, 2, 0]);
        assert_eq!(reports.get(1).and_then(|r| r.last_us), Some(9));
        assert_eq!(reports.get(2).and_then(|r| r.first_us), None);
    }
}

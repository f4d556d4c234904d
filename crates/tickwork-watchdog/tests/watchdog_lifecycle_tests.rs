//! Watchdog feed, expiry and re-arm behaviour.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tickwork_alarm::{SimTimebase, SystemTimebase};
use tickwork_watchdog::prelude::*;
use tickwork_test_helpers::prelude::*;

const MS: u64 = 1_000;

fn recording(
    registry: &Arc<WatchdogRegistry>,
    timebase: &SimTimebase,
    log: &FireLog,
    label: &str,
    timeout: Duration,
) -> Watchdog {
    let recorder = log.recorder(label, timebase.clone());
    Watchdog::new(registry, timeout, move || recorder())
}

#[test]
fn test_unfed_watchdog_fires_exactly_once() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let log = FireLog::new();
    let watchdog = recording(&registry, &timebase, &log, "deadman", Duration::from_millis(100));

    watchdog.enable()?;
    timebase.step(Duration::from_millis(500))?;

    assert_eq!(log.times("deadman"), vec![100 * MS]);
    assert!(watchdog.is_expired());
    assert!(!watchdog.is_enabled());
    Ok(())
}

#[test]
fn test_feeding_pushes_deadline_out() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let log = FireLog::new();
    let watchdog = recording(&registry, &timebase, &log, "fed", Duration::from_millis(100));

    watchdog.enable()?;
    for _ in 0..3 {
        timebase.step(Duration::from_millis(60))?;
        watchdog.feed()?;
    }
    assert!(log.is_empty());
    assert!(!watchdog.is_expired());

    timebase.step(Duration::from_millis(200))?;
    assert_eq!(log.times("fed"), vec![280 * MS]);
    Ok(())
}

#[test]
fn test_reenable_after_expiry_fires_again() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let log = FireLog::new();
    let watchdog = recording(&registry, &timebase, &log, "again", Duration::from_millis(20));

    watchdog.enable()?;
    timebase.step(Duration::from_millis(50))?;
    assert!(watchdog.is_expired());

    watchdog.reset()?;
    assert!(!watchdog.is_expired());
    timebase.step(Duration::from_millis(50))?;

    assert_eq!(log.times("again"), vec![20 * MS, 70 * MS]);
    Ok(())
}

#[test]
fn test_disable_cancels_pending_timeout() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let log = FireLog::new();
    let watchdog = recording(&registry, &timebase, &log, "off", Duration::from_millis(100));

    watchdog.enable()?;
    timebase.step(Duration::from_millis(50))?;
    watchdog.disable();
    timebase.step(Duration::from_millis(200))?;

    assert!(log.is_empty());
    assert!(!watchdog.is_enabled());
    assert!(!watchdog.is_expired());
    Ok(())
}

#[test]
fn test_set_timeout_restarts() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let log = FireLog::new();
    let watchdog = recording(&registry, &timebase, &log, "retimed", Duration::from_millis(100));

    timebase.step(Duration::from_millis(10))?;
    watchdog.set_timeout(Duration::from_millis(50))?;
    assert!(watchdog.is_enabled());
    assert_eq!(watchdog.timeout(), Duration::from_millis(50));

    timebase.step(Duration::from_millis(100))?;
    assert_eq!(log.times("retimed"), vec![60 * MS]);
    Ok(())
}

#[test]
fn test_zero_timeout_fires_on_next_dispatch() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let log = FireLog::new();
    let watchdog = recording(&registry, &timebase, &log, "zero", Duration::ZERO);

    timebase.step(Duration::from_millis(3))?;
    watchdog.enable()?;
    timebase.wait_for_alarms()?;

    assert_eq!(log.times("zero"), vec![3 * MS]);
    Ok(())
}

#[test]
fn test_epochs_cleared_on_enable() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let watchdog = Watchdog::new(&registry, Duration::from_millis(20), || {});

    watchdog.enable()?;
    timebase.step(Duration::from_millis(5))?;
    watchdog.add_epoch("teleopPeriodic()");
    timebase.step(Duration::from_millis(7))?;
    watchdog.add_epoch("robotPeriodic()");

    assert_eq!(
        watchdog.epochs(),
        vec![
            ("teleopPeriodic()".to_string(), Duration::from_millis(5)),
            ("robotPeriodic()".to_string(), Duration::from_millis(7)),
        ]
    );

    // Runs past the timeout; epochs survive expiry and print once.
    timebase.step(Duration::from_millis(10))?;
    assert!(watchdog.is_expired());
    assert!(watchdog.print_epochs());
    assert!(!watchdog.print_epochs());

    watchdog.reset()?;
    assert!(watchdog.epochs().is_empty());
    Ok(())
}

#[test]
fn test_watchdogs_share_registry_thread() -> TestResult {
    let timebase = SimTimebase::new();
    let config = WatchdogConfig::builder().thread_name("wd-shared").build()?;
    let registry = WatchdogRegistry::new(&timebase, config)?;
    let log = FireLog::new();

    let fast = recording(&registry, &timebase, &log, "fast", Duration::from_millis(10));
    let slow = recording(&registry, &timebase, &log, "slow", Duration::from_millis(30));
    let fed = recording(&registry, &timebase, &log, "fed", Duration::from_millis(20));

    fast.enable()?;
    slow.enable()?;
    fed.enable()?;
    assert_eq!(registry.armed_count(), 3);

    timebase.step(Duration::from_millis(15))?;
    fed.feed()?;
    timebase.step(Duration::from_millis(25))?;

    assert_eq!(log.labels(), vec!["fast", "slow", "fed"]);
    assert_eq!(log.times("fed"), vec![35 * MS]);
    assert!(log.events().iter().all(|e| e.thread.as_deref() == Some("wd-shared")));
    assert_eq!(registry.armed_count(), 0);
    Ok(())
}

#[test]
fn test_callback_can_rearm_other_watchdog() -> TestResult {
    let timebase = SimTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let log = FireLog::new();

    let second = Arc::new(recording(&registry, &timebase, &log, "second", Duration::from_millis(10)));
    let first = {
        let second = Arc::clone(&second);
        let recorder = log.recorder("first", timebase.clone());
        Watchdog::new(&registry, Duration::from_millis(5), move || {
            recorder();
            must(second.enable());
        })
    };

    first.enable()?;
    timebase.step(Duration::from_millis(30))?;

    assert_eq!(log.times("first"), vec![5 * MS]);
    assert_eq!(log.times("second"), vec![15 * MS]);
    Ok(())
}

#[test]
fn test_system_timebase_expiry() -> TestResult {
    let timebase = SystemTimebase::new();
    let registry = WatchdogRegistry::new(&timebase, WatchdogConfig::default())?;
    let count = Arc::new(AtomicU32::new(0));
    let watchdog = {
        let count = Arc::clone(&count);
        Watchdog::new(&registry, Duration::from_millis(15), move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };

    watchdog.enable()?;
    assert!(wait_until(Duration::from_secs(5), || watchdog.is_expired()));
    assert!(watchdog.time_elapsed() >= Duration::from_millis(15));
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(count.load(Ordering::SeqCst), 1);

    registry.close();
    assert!(registry.is_closed());
    Ok(())
}

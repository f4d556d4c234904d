//! User robot program hooks.

use crate::mode::RobotMode;

/// Hooks a robot program overrides. Every hook defaults to doing nothing.
///
/// `robot_init` and `simulation_init` run on the thread that calls
/// [`crate::TimedRobot::start_competition`]; everything else runs on the main
/// loop thread.
pub trait RobotProgram: Send + 'static {
    /// Runs once before the loop starts.
    fn robot_init(&mut self) {}

    /// Runs once after `robot_init` when simulating.
    fn simulation_init(&mut self) {}

    /// Runs the first time a driver station is seen attached.
    fn driver_station_connected(&mut self) {}

    /// Runs every tick regardless of mode, after the mode periodic hook.
    fn robot_periodic(&mut self) {}

    /// Runs every tick after `robot_periodic` when simulating.
    fn simulation_periodic(&mut self) {}

    fn disabled_init(&mut self) {}
    fn disabled_periodic(&mut self) {}
    fn disabled_exit(&mut self) {}

    fn autonomous_init(&mut self) {}
    fn autonomous_periodic(&mut self) {}
    fn autonomous_exit(&mut self) {}

    fn teleop_init(&mut self) {}
    fn teleop_periodic(&mut self) {}
    fn teleop_exit(&mut self) {}

    fn test_init(&mut self) {}
    fn test_periodic(&mut self) {}
    fn test_exit(&mut self) {}
}

/// Which of a mode's three hooks to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hook {
    Init,
    Periodic,
    Exit,
}

impl Hook {
    fn suffix(self) -> &'static str {
        match self {
            Self::Init => "Init()",
            Self::Periodic => "Periodic()",
            Self::Exit => "Exit()",
        }
    }
}

/// Run `hook` of `mode` and return its epoch name, e.g. `teleopPeriodic()`.
pub(crate) fn run_mode_hook<P: RobotProgram + ?Sized>(program: &mut P, mode: RobotMode, hook: Hook) -> String {
    match (mode, hook) {
        (RobotMode::Disabled, Hook::Init) => program.disabled_init(),
        (RobotMode::Disabled, Hook::Periodic) => program.disabled_periodic(),
        (RobotMode::Disabled, Hook::Exit) => program.disabled_exit(),
        (RobotMode::Autonomous, Hook::Init) => program.autonomous_init(),
        (RobotMode::Autonomous, Hook::Periodic) => program.autonomous_periodic(),
        (RobotMode::Autonomous, Hook::Exit) => program.autonomous_exit(),
        (RobotMode::Teleop, Hook::Init) => program.teleop_init(),
        (RobotMode::Teleop, Hook::Periodic) => program.teleop_periodic(),
        (RobotMode::Teleop, Hook::Exit) => program.teleop_exit(),
        (RobotMode::Test, Hook::Init) => program.test_init(),
        (RobotMode::Test, Hook::Periodic) => program.test_periodic(),
        (RobotMode::Test, Hook::Exit) => program.test_exit(),
    }
    format!("{}{}", mode.as_str(), hook.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Calls(Vec<&'static str>);

    impl RobotProgram for Calls {
        fn autonomous_init(&mut self) {
            self.0.push("auto-init");
        }

        fn test_exit(&mut self) {
            self.0.push("test-exit");
        }
    }

    #[test]
    fn test_hook_dispatch_and_epoch_names() {
        let mut program = Calls::default();
        assert_eq!(run_mode_hook(&mut program, RobotMode::Autonomous, Hook::Init), "autonomousInit()");
        assert_eq!(run_mode_hook(&mut program, RobotMode::Test, Hook::Exit), "testExit()");
        assert_eq!(run_mode_hook(&mut program, RobotMode::Teleop, Hook::Periodic), "teleopPeriodic()");
        assert_eq!(program.0, vec!["auto-init", "test-exit"]);
    }
}

//! Main-loop multiplexer for robot programs.
//!
//! [`TimedRobot`] owns one scheduler loop for the lifetime of a robot program.
//! The program's mode dispatch (`loop_func`) is a periodic entry at the
//! configured loop period; extra periodic callbacks added with
//! [`TimedRobot::add_periodic`] share the same thread and are phase-locked to
//! the robot's construction time.
//!
//! Every tick `loop_func` resolves the current [`RobotMode`] from a
//! [`ModeSource`], runs the exit/init hooks when the mode changed, then the mode
//! periodic hook, `robot_periodic` and (in simulation) `simulation_periodic`. A
//! loop-overrun watchdog with a timeout of one loop period records an epoch
//! after each hook and reports them when a tick runs long.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod mode;
pub mod program;
pub mod timed_robot;

pub mod prelude;

pub use config::{TimedRobotConfig, TimedRobotConfigBuilder};
pub use error::{RobotError, RobotResult};
pub use mode::{ModeSource, RobotMode, SimDriverStation};
pub use program::RobotProgram;
pub use timed_robot::TimedRobot;

/// Default main-loop period.
pub const DEFAULT_LOOP_PERIOD_MS: u64 = 20;

//! Prelude module for common robot types.

pub use crate::config::TimedRobotConfig;
pub use crate::error::{RobotError, RobotResult};
pub use crate::mode::{ModeSource, RobotMode, SimDriverStation};
pub use crate::program::RobotProgram;
pub use crate::timed_robot::TimedRobot;

//! Robot modes and where they come from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Operating mode of the robot program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotMode {
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl RobotMode {
    /// Resolve the mode from control word bits.
    ///
    /// Disabled wins over everything, then autonomous, then test; anything else
    /// enabled is teleop.
    #[must_use]
    pub fn resolve(enabled: bool, autonomous: bool, test: bool) -> Self {
        if !enabled {
            Self::Disabled
        } else if autonomous {
            Self::Autonomous
        } else if test {
            Self::Test
        } else {
            Self::Teleop
        }
    }

    /// Lowercase mode name, as used in hook names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Autonomous => "autonomous",
            Self::Teleop => "teleop",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supplies the control word read at the start of every loop tick.
pub trait ModeSource: Send + Sync {
    /// Whether the robot is enabled.
    fn is_enabled(&self) -> bool;

    /// Whether autonomous is selected.
    fn is_autonomous(&self) -> bool;

    /// Whether test is selected.
    fn is_test(&self) -> bool;

    /// Whether a driver station is attached.
    fn is_ds_attached(&self) -> bool {
        true
    }

    /// Current mode.
    fn mode(&self) -> RobotMode {
        RobotMode::resolve(self.is_enabled(), self.is_autonomous(), self.is_test())
    }
}

/// In-process driver station for simulation and tests.
///
/// Starts disabled with no driver station attached.
#[derive(Debug, Default)]
pub struct SimDriverStation {
    enabled: AtomicBool,
    autonomous: AtomicBool,
    test: AtomicBool,
    ds_attached: AtomicBool,
}

impl SimDriverStation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn set_autonomous(&self, autonomous: bool) {
        self.autonomous.store(autonomous, Ordering::Release);
    }

    pub fn set_test(&self, test: bool) {
        self.test.store(test, Ordering::Release);
    }

    pub fn set_ds_attached(&self, attached: bool) {
        self.ds_attached.store(attached, Ordering::Release);
    }

    /// Set all control bits so that [`ModeSource::mode`] returns `mode`.
    pub fn set_mode(&self, mode: RobotMode) {
        self.set_enabled(mode != RobotMode::Disabled);
        self.set_autonomous(mode == RobotMode::Autonomous);
        self.set_test(mode == RobotMode::Test);
    }

    /// Return to the disabled, detached state.
    pub fn reset(&self) {
        self.set_mode(RobotMode::Disabled);
        self.set_ds_attached(false);
    }
}

impl ModeSource for SimDriverStation {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn is_autonomous(&self) -> bool {
        self.autonomous.load(Ordering::Acquire)
    }

    fn is_test(&self) -> bool {
        self.test.load(Ordering::Acquire)
    }

    fn is_ds_attached(&self) -> bool {
        self.ds_attached.load(Ordering::Acquire)
    }
}

//!
//! Work handed from interrupt handlers to the main loop.
//!
//! An alert handler disarms its own line and raises the matching flag; that is
//! all it does.  The main loop takes the flag, talks to the sensor and re-arms
//! the line.  The flags are the only data both contexts touch.
//!

use core::sync::atomic::{AtomicBool, Ordering};

/// A sensor alert line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSource {
    /// MPU-6500 raw data ready.
    Imu,
    /// INA226 conversion ready or limit alert.
    PowerMonitor,
}

pub struct PendingWork {
    imu: AtomicBool,
    power_monitor: AtomicBool,
}

impl PendingWork {
    pub const fn new() -> Self {
        Self {
            imu: AtomicBool::new(false),
            power_monitor: AtomicBool::new(false),
        }
    }

    fn flag(&self, source: AlertSource) -> &AtomicBool {
        match source {
            AlertSource::Imu => &self.imu,
            AlertSource::PowerMonitor => &self.power_monitor,
        }
    }

    /// Called from the alert handler once its line has been disarmed.
    pub fn raise(&self, source: AlertSource) {
        self.flag(source).store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self, source: AlertSource) -> bool {
        self.flag(source).swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self, source: AlertSource) -> bool {
        self.flag(source).load(Ordering::Acquire)
    }
}

impl Default for PendingWork {
    fn default() -> Self {
        Self::new()
    }
}

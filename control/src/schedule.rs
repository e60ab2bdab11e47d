//!
//! Periodic telemetry and loop performance bookkeeping.
//!

use swarmnode_common::LoopPerfTelemetry;

use crate::PERF_WINDOW;

/// Deadline for unsolicited telemetry.
///
/// Each time the deadline passes it moves forward by one interval, so late
/// iterations do not push later reports back.  If the loop fell more than an
/// interval behind, the schedule restarts from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySchedule {
    interval_us: Option<u64>,
    deadline_us: u64,
}

impl TelemetrySchedule {
    pub const fn new() -> Self {
        Self {
            interval_us: None,
            deadline_us: 0,
        }
    }

    /// Report every `interval_us`, starting now, or stop reporting.
    pub fn configure(&mut self, interval_us: Option<u64>, now_us: u64) {
        self.interval_us = interval_us;
        self.deadline_us = now_us;
    }

    pub fn is_enabled(&self) -> bool {
        self.interval_us.is_some()
    }

    /// Whether a report is due at `now_us`.  Consumes the deadline.
    pub fn due(&mut self, now_us: u64) -> bool {
        let Some(interval_us) = self.interval_us else {
            return false;
        };
        if now_us < self.deadline_us {
            return false;
        }

        self.deadline_us += interval_us;
        if self.deadline_us <= now_us {
            self.deadline_us = now_us + interval_us;
        }
        true
    }
}

/// Counts idle iterations over a window of [`PERF_WINDOW`] loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopPerf {
    loops: u16,
    idle: u16,
    window_start_us: u64,
}

impl LoopPerf {
    pub const fn new() -> Self {
        Self {
            loops: 0,
            idle: 0,
            window_start_us: 0,
        }
    }

    /// Start a fresh window at `now_us`.
    pub fn restart(&mut self, now_us: u64) {
        *self = Self {
            window_start_us: now_us,
            ..Self::new()
        };
    }

    pub fn idle(&mut self) {
        self.idle = self.idle.saturating_add(1);
    }

    /// Count one loop iteration.  Returns a report when the window is full.
    pub fn tick(&mut self, now_us: u64) -> Option<LoopPerfTelemetry> {
        self.loops += 1;
        if self.loops < PERF_WINDOW {
            return None;
        }

        Some(self.flush(now_us))
    }

    /// Report the current window and start the next one at `now_us`.
    pub fn flush(&mut self, now_us: u64) -> LoopPerfTelemetry {
        let report = LoopPerfTelemetry {
            idle_count: self.idle,
            elapsed_us: u32::try_from(now_us.saturating_sub(self.window_start_us))
                .unwrap_or(u32::MAX),
        };
        self.restart(now_us);
        report
    }
}

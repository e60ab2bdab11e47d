//!
//! Hardware the node needs from its board.
//!
//! Every method is bounded in time and infallible from the node's point of
//! view: a failed bus transaction is logged by the board and replaced with a
//! fallback value, or with `None` where a fallback would be mistaken for a
//! reading.
//!

use ina226_driver::Poll;
use mpu6500_driver::{Offsets, RawSample, Scale};
use swarmnode_common::{ByteSink, ByteSource, DigitalInputs, LegAngles};

use crate::AlertSource;

/// Monotonic microsecond clock.
pub trait Clock {
    fn now_us(&mut self) -> u64;
}

pub trait ImuDevice {
    /// Burst read of the latest sample.  `None` if the read failed.
    fn read_sample(&mut self) -> Option<RawSample>;

    /// Scale factors for the configured ranges.
    fn scale(&self) -> Scale;

    /// Average `samples` stationary readings.  Blocks until done.  `None` if
    /// the IMU stopped reporting data ready.
    fn calibrate(&mut self, samples: u32) -> Option<Offsets>;
}

pub trait PowerMonitor {
    /// Read and latch-clear the alert source, reading a conversion if one is
    /// ready.
    fn poll_power(&mut self) -> Poll;
}

pub trait ChargeInputs {
    /// Sample the charge and connection-detect lines.
    fn read_inputs(&mut self) -> DigitalInputs;
}

pub trait Actuators {
    fn set_leg_angles(&mut self, angles: &LegAngles);
}

pub trait AlertLines {
    /// Enable the line's interrupt again.  An edge latched while the line was
    /// disarmed fires as soon as it is rearmed.
    fn rearm(&mut self, source: AlertSource);
}

/// Control over the log backend.
pub trait LogControl {
    fn set_min_severity(&mut self, severity: u8);

    /// Queue the latest error record again.  `false` if there is none.
    fn replay_last_error(&mut self) -> bool;

    /// Write queued log records to the link and push queued output to the
    /// host.
    fn flush_logs(&mut self);
}

/// Everything [`Node`](crate::Node) drives.
pub trait Board:
    Clock
    + ImuDevice
    + PowerMonitor
    + ChargeInputs
    + Actuators
    + AlertLines
    + LogControl
    + ByteSource
    + ByteSink
{
}

impl<T> Board for T where
    T: Clock
        + ImuDevice
        + PowerMonitor
        + ChargeInputs
        + Actuators
        + AlertLines
        + LogControl
        + ByteSource
        + ByteSink
{
}

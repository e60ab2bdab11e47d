//!
//! Definitions of the driver errors present on a swarm node to
//! make error handling more smooth.
//!

use teensy4_bsp::hal::{lpi2c::ControllerStatus, lpspi::LpspiError};

use ina226_driver::Ina226Error;
use mpu6500_driver::ImuError;

/// Error for calibrating the IMU
pub type ImuCalibrationError = ImuError<LpspiError>;
/// Error for configuring the power monitor
pub type PowerMonitorInitError = Ina226Error<ControllerStatus>;
/// Error for a single IMU transaction
pub type ImuBusError = LpspiError;

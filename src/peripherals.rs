//!
//! Peripheral Type and Wiring Definitions to ensure
//! the node is correctly wired at compile time.
//!

use teensy4_pins::t41::*;

use teensy4_bsp::board::{self, Lpi2c1, PERCLK_FREQUENCY};
use teensy4_bsp::hal::{
    gpio::{Input, Port},
    gpt::Gpt1,
    lpspi::Lpspi,
    pit::Pit2,
    timer::Blocking,
};

use ina226_driver::Ina226;
use mpu6500_driver::Mpu6500;

/// SPI connected to the IMU
pub type ImuSpi = Lpspi<board::LpspiPins<P11, P12, P13, P10>, 4>;
/// The IMU
pub type Imu = Mpu6500<ImuSpi>;
/// The IMU data ready line (INT)
pub type ImuAlert = Input<P40>;
/// The power monitor
pub type PowerMonitor = Ina226<Lpi2c1>;
/// The power monitor ALERT line
pub type PowerAlert = Input<P41>;
/// Charge lines of the four cells
pub type ChargeLines = (Input<P14>, Input<P15>, Input<P16>, Input<P17>);
/// Pulled low while the node sits in its dock
pub type ConnectDetect = Input<P38>;
/// The free running timer behind the microsecond clock
pub type ClockTimer = Gpt1;
/// The PIT-defined delay for configuring and calibrating the IMU.
pub type PitDelay = Blocking<Pit2, PERCLK_FREQUENCY>;
/// The first GPIO port, home of both alert lines
pub type Gpio1 = Port<1>;

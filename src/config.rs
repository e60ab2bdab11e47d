//!
//! Build-time configuration of a swarm node.
//!
//! Pins are listed in [`crate::peripherals`] so that a wiring mistake is a
//! type error.
//!

use ina226_driver::registers::{
    Averaging, Configuration, ConversionTime, MaskEnable, OperatingMode,
};
use ina226_driver::AlertLimits;
use mpu6500_driver::registers::{
    AccelFilter, AccelRange, GyroFilter, GyroRange, IntEnable, IntPinConfig,
};
use mpu6500_driver::Config;
use usb_device::device::UsbVidPid;

/// 7-bit I2C address of the INA226 (A0 and A1 grounded).
pub const INA226_ADDRESS: u8 = 0b100_0000;
/// Largest current the power monitor is scaled for.
pub const MAX_CURRENT_UA: u32 = 20_000_000;
/// Shunt resistor in micro-ohms.
pub const SHUNT_UOHM: u32 = 2_000;
/// Alert on every completed conversion, active low.
pub const POWER_MONITOR_ALERT: MaskEnable = MaskEnable::CONVERSION_READY;
/// Unused while only conversion-ready alerts are enabled.
pub const POWER_MONITOR_LIMITS: AlertLimits = AlertLimits {
    shunt_voltage_nv: 0,
    bus_voltage_uv: 0,
    power_uw: 0,
};

/// Averaging and conversion times of the power monitor.
pub fn power_monitor_configuration() -> Configuration {
    Configuration {
        averaging: Averaging::Avg16,
        bus_conversion: ConversionTime::Us1100,
        shunt_conversion: ConversionTime::Us1100,
        mode: OperatingMode::BusShuntContinuous,
        ..Configuration::default()
    }
}

pub const IMU_CONFIG: Config = Config {
    gyro_filter: GyroFilter::Hz184,
    gyro_range: GyroRange::Dps250,
    accel_filter: AccelFilter::Hz184,
    accel_range: AccelRange::G2,
};
/// Raw data ready drives INT low until the status register is read.
pub const IMU_ALERT: IntEnable = IntEnable::RAW_RDY_EN;
pub const IMU_ALERT_PIN: IntPinConfig = IntPinConfig::ACTIVE_LOW.union(IntPinConfig::LATCH);
/// The MPU-6500 accepts at most 1MHz while its configuration is written.
pub const IMU_SPI_FREQUENCY: u32 = 1_000_000;
/// 1us polls of data ready per calibration sample before giving up.
pub const CALIBRATION_POLLS: u32 = 20_000;

/// Matches the host tooling's port filter.
pub const VID_PID: UsbVidPid = UsbVidPid(0x5824, 0x27dd);
pub const USB_MANUFACTURER: &str = "swarmnode";
pub const USB_PRODUCT: &str = "swarmnode serial";

/// Bytes of encoded log records held until the main loop drains them.
pub const LOG_OUTBOX_LEN: usize = 4096;
/// Bytes of outgoing frames held while the host is not reading.
pub const SERIAL_TX_LEN: usize = 2048;

/// Frequency of the microsecond clock.
pub const CLOCK_FREQUENCY: u32 = 1_000_000;

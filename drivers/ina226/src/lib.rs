//!
//! Driver for the INA226 current and power monitor over I2C.
//!
//! [Datasheet](https://www.ti.com/lit/ds/symlink/ina226.pdf)
//!

#![no_std]

use embedded_hal::blocking::i2c;
use packed_struct::{PackedStruct, PackingError};
use registers::{Configuration, MaskEnable};

pub mod registers;

pub mod state;
pub use state::{Calibration, Measurement, PowerState, RawReadings};

/// Limits compared against when a limit alert is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlertLimits {
    pub shunt_voltage_nv: i32,
    pub bus_voltage_uv: u32,
    pub power_uw: u32,
}

/// Level the ALERT pin is driven to while an alert is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolarity {
    ActiveHigh,
    ActiveLow,
}

/// What an alert turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A limit alert fired.
    Limit(MaskEnable),
    /// A conversion completed and was read.
    Converted(Measurement),
    /// Nothing usable; the conversion overflowed or was not ready.
    Skipped(MaskEnable),
}

#[derive(Debug)]
pub enum Ina226Error<I2cError> {
    I2C(I2cError),
    Packing(PackingError),
}

impl<I2cError> From<I2cError> for Ina226Error<I2cError> {
    fn from(err: I2cError) -> Self {
        Self::I2C(err)
    }
}

pub struct Ina226<I2C> {
    i2c: I2C,
    address: u8,
    calibration: Calibration,
}

impl<I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>, E> Ina226<I2C> {
    pub fn new(i2c: I2C, address: u8, calibration: Calibration) -> Self {
        Self {
            i2c,
            address,
            calibration,
        }
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Write the calibration register so the device computes current and
    /// power.
    pub fn calibrate(&mut self) -> Result<(), E> {
        log::info!(
            "INA226 calibration {} (current LSB {}uA).",
            self.calibration.register,
            self.calibration.current_lsb_ua
        );
        self.write_register(registers::CALIBRATION, self.calibration.register)
    }

    pub fn configure(&mut self, configuration: &Configuration) -> Result<(), Ina226Error<E>> {
        let packed = configuration.pack().map_err(Ina226Error::Packing)?;
        self.write_register(registers::CONFIGURATION, u16::from_be_bytes(packed))?;
        Ok(())
    }

    /// Select the alert source and, for limit alerts, the matching limit.
    /// Returns the polarity so the caller knows which edge to arm.
    pub fn configure_alert(
        &mut self,
        alert: MaskEnable,
        limits: &AlertLimits,
    ) -> Result<AlertPolarity, E> {
        self.write_register(MaskEnable::ADDR, alert.bits())?;

        if let Some(limit) = self.alert_limit(alert, limits) {
            self.write_register(registers::ALERT_LIMIT, limit)?;
        }

        Ok(if alert.contains(MaskEnable::ALERT_ACTIVE_HIGH) {
            AlertPolarity::ActiveHigh
        } else {
            AlertPolarity::ActiveLow
        })
    }

    /// Limit register value for the first enabled limit alert.
    fn alert_limit(&self, alert: MaskEnable, limits: &AlertLimits) -> Option<u16> {
        let limit = if alert.intersects(MaskEnable::SHUNT_LIMITS) {
            let steps = limits.shunt_voltage_nv / registers::SHUNT_VOLTAGE_LSB_NV;
            let steps = steps.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
            u16::from_be_bytes(steps.to_be_bytes())
        } else if alert.intersects(MaskEnable::BUS_LIMITS) {
            u16::try_from(limits.bus_voltage_uv / registers::BUS_VOLTAGE_LSB_UV).unwrap_or(u16::MAX)
        } else if alert.contains(MaskEnable::POWER_OVER_LIMIT) {
            u16::try_from(limits.power_uw / self.calibration.power_lsb_uw).unwrap_or(u16::MAX)
        } else {
            0
        };

        (limit != 0).then_some(limit)
    }

    /// Read the mask/enable register, which also releases a latched alert.
    pub fn read_mask_enable(&mut self) -> Result<MaskEnable, E> {
        Ok(MaskEnable::from_bits_retain(self.read_register(MaskEnable::ADDR)?))
    }

    /// Handle an alert: find out why it fired and read the measurement
    /// registers if a conversion is ready.
    ///
    /// Bus failures read as zero.
    pub fn poll(&mut self) -> Poll {
        let flags = MaskEnable::from_bits_retain(self.read_or_zero(MaskEnable::ADDR));
        if flags.contains(MaskEnable::ALERT_FUNCTION_FLAG) {
            return Poll::Limit(flags);
        }
        if !flags.contains(MaskEnable::CONVERSION_READY_FLAG)
            || flags.contains(MaskEnable::MATH_OVERFLOW_FLAG)
        {
            return Poll::Skipped(flags);
        }

        let raw = RawReadings {
            shunt_voltage: self.read_or_zero(registers::SHUNT_VOLTAGE),
            bus_voltage: self.read_or_zero(registers::BUS_VOLTAGE),
            power: self.read_or_zero(registers::POWER),
            current: self.read_or_zero(registers::CURRENT),
        };
        Poll::Converted(Measurement::from_raw(&raw, &self.calibration))
    }

    pub fn manufacturer_id(&mut self) -> Result<u16, E> {
        self.read_register(registers::MANUFACTURER_ID)
    }

    pub fn die_id(&mut self) -> Result<u16, E> {
        self.read_register(registers::DIE_ID)
    }

    fn read_or_zero(&mut self, address: u8) -> u16 {
        match self.read_register(address) {
            Ok(value) => value,
            Err(_) => {
                log::warn!("INA226 read of register {:#04x} failed.", address);
                0
            }
        }
    }

    fn read_register(&mut self, address: u8) -> Result<u16, E> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[address], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_register(&mut self, address: u8, value: u16) -> Result<(), E> {
        let [high, low] = value.to_be_bytes();
        self.i2c.write(self.address, &[address, high, low])
    }
}

//!
//! Conversion of raw readings and energy accumulation.
//!

use crate::registers::{BUS_VOLTAGE_LSB_UV, SHUNT_VOLTAGE_LSB_NV};

/// Scale factors derived from the shunt and the largest expected current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub current_lsb_ua: u32,
    pub power_lsb_uw: u32,
    /// Value of the calibration register.
    pub register: u16,
}

impl Calibration {
    pub fn new(max_current_ua: u32, shunt_uohm: u32) -> Self {
        let current_lsb_ua = max_current_ua.div_ceil(32768).max(1);
        let register = 5_120_000_000u64 / (u64::from(current_lsb_ua) * u64::from(shunt_uohm.max(1)));
        Self {
            current_lsb_ua,
            power_lsb_uw: current_lsb_ua * 25,
            register: u16::try_from(register).unwrap_or(u16::MAX),
        }
    }
}

/// Reinterpret a two's complement register value.
pub fn signed(raw: u16) -> i16 {
    i16::from_be_bytes(raw.to_be_bytes())
}

/// Raw register values of one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawReadings {
    pub shunt_voltage: u16,
    pub bus_voltage: u16,
    pub power: u16,
    pub current: u16,
}

/// One conversion in physical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    pub shunt_voltage_nv: i32,
    pub bus_voltage_uv: u32,
    pub power_uw: u32,
    pub current_ua: u32,
}

impl Measurement {
    pub fn from_raw(raw: &RawReadings, calibration: &Calibration) -> Self {
        Self {
            shunt_voltage_nv: i32::from(signed(raw.shunt_voltage)) * SHUNT_VOLTAGE_LSB_NV,
            bus_voltage_uv: u32::from(raw.bus_voltage) * BUS_VOLTAGE_LSB_UV,
            power_uw: u32::from(raw.power).saturating_mul(calibration.power_lsb_uw),
            current_ua: u32::from(raw.current).saturating_mul(calibration.current_lsb_ua),
        }
    }
}

/// Latest measurement and the energy drawn since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerState {
    pub latest: Measurement,
    /// Microjoules.
    pub energy_uj: u64,
    /// Time of the latest measurement in microseconds.
    pub last_sample_us: Option<u64>,
}

impl PowerState {
    /// Record `measurement`, taken at `now_us`, and integrate its power over
    /// the time since the previous one.
    pub fn apply(&mut self, measurement: &Measurement, now_us: u64) {
        if let Some(last) = self.last_sample_us {
            let elapsed_us = now_us.saturating_sub(last);
            self.energy_uj = self
                .energy_uj
                .saturating_add(u64::from(measurement.power_uw) / 1000 * elapsed_us / 1000);
        }
        self.latest = *measurement;
        self.last_sample_us = Some(now_us);
    }
}

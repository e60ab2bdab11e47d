use bitflags::bitflags;
use packed_struct::prelude::*;

pub const CONFIGURATION: u8 = 0x00;
pub const SHUNT_VOLTAGE: u8 = 0x01;
pub const BUS_VOLTAGE: u8 = 0x02;
pub const POWER: u8 = 0x03;
pub const CURRENT: u8 = 0x04;
pub const CALIBRATION: u8 = 0x05;
pub const ALERT_LIMIT: u8 = 0x07;
pub const MANUFACTURER_ID: u8 = 0xFE;
pub const DIE_ID: u8 = 0xFF;

/// Bus voltage LSB in microvolts.
pub const BUS_VOLTAGE_LSB_UV: u32 = 1250;
/// Shunt voltage LSB in nanovolts.
pub const SHUNT_VOLTAGE_LSB_NV: i32 = 2500;

/// Number of samples averaged per reading.
#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Averaging {
    Avg1 = 0b000,
    Avg4 = 0b001,
    Avg16 = 0b010,
    Avg64 = 0b011,
    Avg128 = 0b100,
    Avg256 = 0b101,
    Avg512 = 0b110,
    Avg1024 = 0b111,
}

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionTime {
    Us140 = 0b000,
    Us204 = 0b001,
    Us332 = 0b010,
    Us588 = 0b011,
    Us1100 = 0b100,
    Us2116 = 0b101,
    Us4156 = 0b110,
    Us8244 = 0b111,
}

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    Shutdown = 0b000,
    ShuntTriggered = 0b001,
    BusTriggered = 0b010,
    BusShuntTriggered = 0b011,
    ShuntContinuous = 0b101,
    BusContinuous = 0b110,
    BusShuntContinuous = 0b111,
}

/// The configuration register.
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0")]
pub struct Configuration {
    #[packed_field(bits = "0")]
    pub reset: bool,
    #[packed_field(bits = "1..=3")]
    pub reserved: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "4..=6", ty = "enum")]
    pub averaging: Averaging,
    #[packed_field(bits = "7..=9", ty = "enum")]
    pub bus_conversion: ConversionTime,
    #[packed_field(bits = "10..=12", ty = "enum")]
    pub shunt_conversion: ConversionTime,
    #[packed_field(bits = "13..=15", ty = "enum")]
    pub mode: OperatingMode,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            reset: false,
            reserved: 0b100.into(),
            averaging: Averaging::Avg1,
            bus_conversion: ConversionTime::Us1100,
            shunt_conversion: ConversionTime::Us1100,
            mode: OperatingMode::BusShuntContinuous,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct MaskEnable: u16 {
        const SHUNT_OVER_VOLTAGE = 1 << 15;
        const SHUNT_UNDER_VOLTAGE = 1 << 14;
        const BUS_OVER_VOLTAGE = 1 << 13;
        const BUS_UNDER_VOLTAGE = 1 << 12;
        const POWER_OVER_LIMIT = 1 << 11;
        const CONVERSION_READY = 1 << 10;

        const ALERT_FUNCTION_FLAG = 1 << 4;
        const CONVERSION_READY_FLAG = 1 << 3;
        const MATH_OVERFLOW_FLAG = 1 << 2;
        const ALERT_ACTIVE_HIGH = 1 << 1;
        const ALERT_LATCH = 1;
    }
}

impl MaskEnable {
    pub const ADDR: u8 = 0x06;

    pub const SHUNT_LIMITS: Self = Self::SHUNT_OVER_VOLTAGE.union(Self::SHUNT_UNDER_VOLTAGE);
    pub const BUS_LIMITS: Self = Self::BUS_OVER_VOLTAGE.union(Self::BUS_UNDER_VOLTAGE);
}

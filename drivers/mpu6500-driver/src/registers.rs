use bitflags::bitflags;

pub const RATE_DIVIDER: u8 = 25;
pub const CONFIG: u8 = 26;
pub const GYRO_CONFIG: u8 = 27;
pub const ACCEL_CONFIG: u8 = 28;
pub const ACCEL_CONFIG2: u8 = 29;
pub const ACCEL_XOUT_H: u8 = 59;
pub const WHO_AM_I: u8 = 117;

/// Set on the register address to read instead of write.
pub const READ: u8 = 0x80;

/// Length of the accelerometer, temperature and gyro burst starting at
/// [`ACCEL_XOUT_H`].
pub const SAMPLE_LEN: usize = 14;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct PowerManagement: u8 {
        const H_RESET = 1 << 7;
        const SLEEP = 1 << 6;
        const CYCLE = 1 << 5;
        const GYRO_STANDBY = 1 << 4;
        const PD_PTAT = 1 << 3;
        const CLKSEL_AUTO = 0b001;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct UserControl: u8 {
        const DMP_EN = 1 << 7;
        const FIFO_EN = 1 << 6;
        const I2C_MST_EN = 1 << 5;
        const I2C_IF_DIS = 1 << 4;
        const DMP_RST = 1 << 3;
        const FIFO_RST = 1 << 2;
        const I2C_MST_RST = 1 << 1;
        const SIG_COND_RST = 1;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct IntPinConfig: u8 {
        const ACTIVE_LOW = 1 << 7;
        const OPEN_DRAIN = 1 << 6;
        const LATCH = 1 << 5;
        const ANY_READ_CLEARS = 1 << 4;
        const FSYNC_ACTIVE_LOW = 1 << 3;
        const FSYNC_EN = 1 << 2;
        const BYPASS_EN = 1 << 1;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct IntEnable: u8 {
        const WOM_EN = 1 << 6;
        const FIFO_OVERFLOW_EN = 1 << 4;
        const FSYNC_INT_EN = 1 << 3;
        const RAW_RDY_EN = 1;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct IntStatus: u8 {
        const WOM = 1 << 6;
        const FIFO_OVERFLOW = 1 << 4;
        const FSYNC = 1 << 3;
        const RAW_DATA_READY = 1;
    }
}

impl PowerManagement {
    pub const ADDR: u8 = 107;
}

impl UserControl {
    pub const ADDR: u8 = 106;
}

impl IntPinConfig {
    pub const ADDR: u8 = 55;
}

impl IntEnable {
    pub const ADDR: u8 = 56;
}

impl IntStatus {
    pub const ADDR: u8 = 58;
}

/// Gyro low pass filter, which also fixes the internal sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroFilter {
    Bypass8800Hz,
    Bypass3600Hz,
    Hz250,
    Hz184,
    Hz92,
    Hz41,
    Hz20,
    Hz10,
    Hz5,
    Hz3600,
}

impl GyroFilter {
    /// `DLPF_CFG` for [`CONFIG`], or `None` when the filter is bypassed.
    pub fn dlpf_cfg(self) -> Option<u8> {
        match self {
            Self::Bypass8800Hz | Self::Bypass3600Hz => None,
            Self::Hz250 => Some(0),
            Self::Hz184 => Some(1),
            Self::Hz92 => Some(2),
            Self::Hz41 => Some(3),
            Self::Hz20 => Some(4),
            Self::Hz10 => Some(5),
            Self::Hz5 => Some(6),
            Self::Hz3600 => Some(7),
        }
    }

    /// `FCHOICE_B` bits of [`GYRO_CONFIG`].
    pub fn fchoice_b(self) -> u8 {
        match self {
            Self::Bypass8800Hz => 0b11,
            Self::Bypass3600Hz => 0b10,
            _ => 0b00,
        }
    }

    pub fn sample_rate_hz(self) -> u32 {
        match self {
            Self::Bypass8800Hz | Self::Bypass3600Hz => 32_000,
            Self::Hz250 | Self::Hz3600 => 8_000,
            _ => 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroRange {
    Dps250 = 0b00,
    Dps500 = 0b01,
    Dps1000 = 0b10,
    Dps2000 = 0b11,
}

impl GyroRange {
    pub fn bits(self) -> u8 {
        (self as u8) << 3
    }

    /// LSB per degree per second.
    pub fn sensitivity(self) -> f32 {
        match self {
            Self::Dps250 => 131.0,
            Self::Dps500 => 65.5,
            Self::Dps1000 => 32.8,
            Self::Dps2000 => 16.4,
        }
    }
}

/// Accelerometer low pass filter, written to [`ACCEL_CONFIG2`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelFilter {
    Bypass1130Hz = 0b1000,
    Hz460 = 0,
    Hz184 = 1,
    Hz92 = 2,
    Hz41 = 3,
    Hz20 = 4,
    Hz10 = 5,
    Hz5 = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelRange {
    G2 = 0b00,
    G4 = 0b01,
    G8 = 0b10,
    G16 = 0b11,
}

impl AccelRange {
    pub fn bits(self) -> u8 {
        (self as u8) << 3
    }

    /// LSB per g.
    pub fn sensitivity(self) -> u16 {
        match self {
            Self::G2 => 16384,
            Self::G4 => 8192,
            Self::G8 => 4096,
            Self::G16 => 2048,
        }
    }
}

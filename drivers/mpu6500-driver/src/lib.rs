//!
//! Driver for the MPU-6500 six axis IMU over SPI.
//!
//! [Datasheet](https://invensense.tdk.com/wp-content/uploads/2015/02/MPU-6500-Datasheet2.pdf)
//!
//! [Register map](https://invensense.tdk.com/wp-content/uploads/2015/02/MPU-6500-Register-Map2.pdf)
//!

#![no_std]

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::spi::{Transfer, Write};
use registers::{
    AccelFilter, AccelRange, GyroFilter, GyroRange, IntEnable, IntPinConfig, IntStatus,
    PowerManagement, UserControl, READ, SAMPLE_LEN,
};

pub mod registers;

pub mod estimator;
pub use estimator::{Calibration, ImuState, Offsets, RawSample, Scale};

/// Expected contents of the WHO_AM_I register.
pub const WHO_AM_I_EXPECTED: u8 = 0x70;

/// Full-scale and filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub gyro_filter: GyroFilter,
    pub gyro_range: GyroRange,
    pub accel_filter: AccelFilter,
    pub accel_range: AccelRange,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gyro_filter: GyroFilter::Hz184,
            gyro_range: GyroRange::Dps250,
            accel_filter: AccelFilter::Hz184,
            accel_range: AccelRange::G2,
        }
    }
}

/// Level the INT pin is driven to while an interrupt is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolarity {
    ActiveHigh,
    ActiveLow,
}

#[derive(Debug)]
pub enum ImuError<SpiError> {
    Spi(SpiError),
    /// No sample became ready within the allotted polls.
    DataReadyTimeout { collected: u32 },
}

impl<SpiError> From<SpiError> for ImuError<SpiError> {
    fn from(err: SpiError) -> Self {
        Self::Spi(err)
    }
}

pub struct Mpu6500<SPI> {
    spi: SPI,
    scale: Scale,
    sample_rate_hz: u32,
}

impl<SPI: Transfer<u8, Error = E> + Write<u8, Error = E>, E> Mpu6500<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            scale: Scale::default(),
            sample_rate_hz: GyroFilter::Hz184.sample_rate_hz(),
        }
    }

    pub fn who_am_i(&mut self) -> Result<u8, E> {
        self.read_register(registers::WHO_AM_I)
    }

    /// Reset the device and apply `config`.
    pub fn configure(&mut self, config: &Config, delay: &mut impl DelayUs<u32>) -> Result<Scale, E> {
        self.write_register(PowerManagement::ADDR, PowerManagement::H_RESET.bits())?;
        delay.delay_us(1_000);

        log::info!("Disabling the I2C interface.");
        self.write_register(
            UserControl::ADDR,
            (UserControl::I2C_IF_DIS | UserControl::SIG_COND_RST).bits(),
        )?;

        match config.gyro_filter.dlpf_cfg() {
            Some(dlpf_cfg) => {
                self.write_register(registers::CONFIG, dlpf_cfg)?;
                self.write_register(registers::GYRO_CONFIG, config.gyro_range.bits())?;
            }
            None => {
                self.write_register(
                    registers::GYRO_CONFIG,
                    config.gyro_range.bits() | config.gyro_filter.fchoice_b(),
                )?;
            }
        }
        self.write_register(registers::ACCEL_CONFIG, config.accel_range.bits())?;
        self.write_register(registers::ACCEL_CONFIG2, config.accel_filter as u8)?;

        self.sample_rate_hz = config.gyro_filter.sample_rate_hz();
        self.scale = Scale {
            gyro: config.gyro_range.sensitivity(),
            accel: f32::from(config.accel_range.sensitivity()),
        };
        log::info!("MPU-6500 sampling at {}Hz.", self.sample_rate_hz);

        Ok(self.scale)
    }

    /// Select which events drive the INT pin and how.  Returns the polarity
    /// so the caller knows which edge to arm.
    pub fn configure_alert(
        &mut self,
        enable: IntEnable,
        pin: IntPinConfig,
    ) -> Result<AlertPolarity, E> {
        self.write_register(IntEnable::ADDR, enable.bits())?;
        self.write_register(IntPinConfig::ADDR, pin.bits())?;

        Ok(if pin.contains(IntPinConfig::ACTIVE_LOW) {
            AlertPolarity::ActiveLow
        } else {
            AlertPolarity::ActiveHigh
        })
    }

    /// Read (and so clear) the interrupt status.
    pub fn clear_alert(&mut self) -> Result<IntStatus, E> {
        Ok(IntStatus::from_bits_truncate(
            self.read_register(IntStatus::ADDR)?,
        ))
    }

    pub fn data_ready(&mut self) -> Result<bool, E> {
        Ok(self.clear_alert()?.contains(IntStatus::RAW_DATA_READY))
    }

    pub fn read_sample(&mut self) -> Result<RawSample, E> {
        let mut burst = [0u8; SAMPLE_LEN];
        self.read_registers(registers::ACCEL_XOUT_H, &mut burst)?;
        Ok(RawSample::from_burst(&burst))
    }

    /// Average `samples` readings taken while the device is at rest.
    ///
    /// Blocks until every sample has been read.  Each sample may take at most
    /// `max_polls` 1us polls of the data ready flag.
    pub fn calibrate(
        &mut self,
        delay: &mut impl DelayUs<u32>,
        samples: u32,
        max_polls: u32,
    ) -> Result<Offsets, ImuError<E>> {
        let mut calibration = Calibration::new();
        for collected in 0..samples {
            let mut polls = 0;
            while !self.data_ready()? {
                if polls == max_polls {
                    return Err(ImuError::DataReadyTimeout { collected });
                }
                polls += 1;
                delay.delay_us(1);
            }
            // the registers settle shortly after the flag is raised
            delay.delay_us(1);
            calibration.add(&self.read_sample()?);
        }

        Ok(calibration.offsets().unwrap_or_default())
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), E> {
        self.spi.write(&[address, value])
    }

    fn read_register(&mut self, address: u8) -> Result<u8, E> {
        let mut buf = [0u8; 1];
        self.read_registers(address, &mut buf)?;
        Ok(buf[0])
    }

    /// Burst read starting at `address`; the device auto-increments.
    fn read_registers(&mut self, address: u8, out: &mut [u8]) -> Result<(), E> {
        let mut frame = [0u8; SAMPLE_LEN + 1];
        let frame = &mut frame[..out.len() + 1];
        frame[0] = address | READ;
        let received = self.spi.transfer(frame)?;
        out.copy_from_slice(&received[1..]);
        Ok(())
    }
}

//!
//! Conversion of raw samples into physical units and dead reckoning.
//!

use crate::registers::SAMPLE_LEN;

/// Standard gravity in m/s^2.
pub const GRAVITY: f32 = 9.8067;
/// Magnitudes at or below this are treated as noise and not integrated.
pub const NOISE_GATE: f32 = 0.1;

const TEMPERATURE_SENSITIVITY: f32 = 333.87;
const TEMPERATURE_OFFSET: f32 = 21.0;

/// One accelerometer, temperature and gyro reading, as read from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    pub accel: [i16; 3],
    pub temperature: i16,
    pub gyro: [i16; 3],
}

impl RawSample {
    pub fn from_burst(burst: &[u8; SAMPLE_LEN]) -> Self {
        let word = |index: usize| i16::from_be_bytes([burst[index], burst[index + 1]]);
        Self {
            accel: [word(0), word(2), word(4)],
            temperature: word(6),
            gyro: [word(8), word(10), word(12)],
        }
    }
}

/// Sensitivities of the configured full-scale ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    /// LSB per degree per second.
    pub gyro: f32,
    /// LSB per g.
    pub accel: f32,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            gyro: 131.0,
            accel: 16384.0,
        }
    }
}

/// Biases added to every raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offsets {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

/// Accumulates raw samples taken while the device is stationary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calibration {
    count: i32,
    accel: [i64; 3],
    gyro: [i64; 3],
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn add(&mut self, sample: &RawSample) {
        self.count += 1;
        for axis in 0..3 {
            self.accel[axis] += i64::from(sample.accel[axis]);
            self.gyro[axis] += i64::from(sample.gyro[axis]);
        }
    }

    /// Negated per-axis mean of the samples, or `None` if there were none.
    /// A mean of `i16::MIN` (a saturated axis) saturates to `i16::MAX`.
    pub fn offsets(&self) -> Option<Offsets> {
        if self.count == 0 {
            return None;
        }

        let count = i64::from(self.count);
        let negated_mean = |sum: i64| {
            let offset = -(sum / count);
            i16::try_from(offset).unwrap_or(if offset < 0 { i16::MIN } else { i16::MAX })
        };
        Some(Offsets {
            accel: self.accel.map(negated_mean),
            gyro: self.gyro.map(negated_mean),
        })
    }
}

/// Latest readings and the integrated motion estimate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuState {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Degrees per second.
    pub angular_velocity: [f32; 3],
    /// Degrees.
    pub heading: [f64; 3],
    /// m/s^2.
    pub acceleration: [f32; 3],
    /// m/s.
    pub velocity: [f64; 3],
    /// m.
    pub displacement: [f64; 3],
    pub offsets: Offsets,
}

impl ImuState {
    /// Fold a sample taken `dt_s` seconds after the previous one into the
    /// state.
    pub fn apply(&mut self, sample: &RawSample, scale: &Scale, dt_s: f64) {
        for axis in 0..3 {
            let accel = (i32::from(sample.accel[axis]) + i32::from(self.offsets.accel[axis])) as f32
                * GRAVITY
                / scale.accel;
            self.acceleration[axis] = accel;
            if libm::fabsf(accel) > NOISE_GATE {
                self.velocity[axis] += f64::from(accel) * dt_s;
                self.displacement[axis] += self.velocity[axis] * dt_s;
            }

            let rate = (i32::from(sample.gyro[axis]) + i32::from(self.offsets.gyro[axis])) as f32
                / scale.gyro;
            self.angular_velocity[axis] = rate;
            if libm::fabsf(rate) > NOISE_GATE {
                self.heading[axis] += f64::from(rate) * dt_s;
            }
        }

        self.temperature = f32::from(sample.temperature) / TEMPERATURE_SENSITIVITY + TEMPERATURE_OFFSET;
    }

    /// Zero the integrated quantities.  Offsets and the latest readings are
    /// kept.
    pub fn reset_dead_reckoning(&mut self) {
        self.velocity = [0.0; 3];
        self.displacement = [0.0; 3];
        self.heading = [0.0; 3];
    }
}

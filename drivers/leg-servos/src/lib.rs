//!
//! Hobby servos for the four three-joint legs.
//!
//! Each joint is one channel of a PWM peripheral running at 50Hz.  0 degrees is a 0.7ms pulse,
//! 180 degrees a 2.3ms pulse.
//!

#![no_std]

use embedded_hal::Pwm;

/// Servo PWM frequency.
pub const SERVO_FREQUENCY_HZ: u32 = 50;
/// Length of one PWM period.
pub const PERIOD_US: u32 = 1_000_000 / SERVO_FREQUENCY_HZ;
/// Pulse width at 0 degrees.
pub const MIN_PULSE_US: u32 = 700;
/// Pulse width at [`MAX_ANGLE`].
pub const MAX_PULSE_US: u32 = 2_300;
/// Largest commandable angle; larger angles are clamped.
pub const MAX_ANGLE: u8 = 180;

/// Pulse width for `angle` degrees.
pub fn pulse_us(angle: u8) -> u32 {
    let angle = u32::from(angle.min(MAX_ANGLE));
    MIN_PULSE_US + (MAX_PULSE_US - MIN_PULSE_US) * angle / u32::from(MAX_ANGLE)
}

/// Duty value producing the pulse for `angle` on a channel whose full period
/// is `max_duty`.
pub fn duty_for(angle: u8, max_duty: u16) -> u16 {
    (u32::from(max_duty) * pulse_us(angle) / PERIOD_US) as u16
}

/// The legs in command order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    RightFront = 0,
    RightBack = 1,
    LeftFront = 2,
    LeftBack = 3,
}

/// Twelve joints on one multi-channel PWM peripheral.
pub struct LegServos<PWM: Pwm> {
    pwm: PWM,
    joints: [[PWM::Channel; 3]; 4],
    angles: [[u8; 3]; 4],
}

impl<PWM> LegServos<PWM>
where
    PWM: Pwm<Duty = u16>,
    PWM::Channel: Copy,
{
    /// Take over `pwm`.  `joints` are grouped right-front, right-back,
    /// left-front, left-back.  Every joint starts idle.
    pub fn new(mut pwm: PWM, joints: [[PWM::Channel; 3]; 4]) -> Self {
        for &joint in joints.iter().flatten() {
            pwm.set_duty(joint, 0);
            pwm.enable(joint);
        }
        Self {
            pwm,
            joints,
            angles: [[0; 3]; 4],
        }
    }

    /// Drive every joint to the given angles, grouped like [`Leg`].
    pub fn set_angles(&mut self, angles: [[u8; 3]; 4]) {
        let max_duty = self.pwm.get_max_duty();
        for (leg, (joints, targets)) in self.joints.iter().zip(angles).enumerate() {
            for (&joint, angle) in joints.iter().zip(targets) {
                if angle > MAX_ANGLE {
                    log::warn!("Clamping leg {} angle {} to {}.", leg, angle, MAX_ANGLE);
                }
                self.pwm.set_duty(joint, duty_for(angle, max_duty));
            }
        }
        self.angles = angles.map(|leg| leg.map(|angle| angle.min(MAX_ANGLE)));
    }

    /// Last commanded angles of `leg`.
    pub fn angles(&self, leg: Leg) -> [u8; 3] {
        self.angles[leg as usize]
    }

    /// Stop driving every joint.
    pub fn idle(&mut self) {
        for &joint in self.joints.iter().flatten() {
            self.pwm.set_duty(joint, 0);
        }
    }

    pub fn release(self) -> PWM {
        self.pwm
    }
}

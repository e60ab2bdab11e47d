//!
//! The twelve leg servos on FlexPWM.
//!
//! | Leg         | Joint 0 | Joint 1 | Joint 2 |
//! | ----------- | ------- | ------- | ------- |
//! | right front | p8      | p7      | p4      |
//! | right back  | p33     | p6      | p9      |
//! | left front  | p36     | p37     | p2      |
//! | left back   | p3      | p22     | p23     |
//!
//! Every submodule runs from the IPG clock divided by 128, which gives a 20ms
//! period in 23437 counts.
//!

use teensy4_bsp::board::IPG_FREQUENCY;
use teensy4_bsp::hal::flexpwm::{
    Channel, ClockSelect, LoadMode, Output, PairOperation, Prescaler, Pwm, Submodule,
    FULL_RELOAD_VALUE_REGISTER,
};
use teensy4_pins::t41::*;

use leg_servos::{LegServos, SERVO_FREQUENCY_HZ};

const PRESCALER: Prescaler = Prescaler::Prescaler128;
/// Counts in one servo period.
pub const PERIOD_COUNTS: u16 = (IPG_FREQUENCY / 128 / SERVO_FREQUENCY_HZ) as u16;

/// The submodules with at least one servo attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoSubmodule {
    Pwm1Sm3,
    Pwm2Sm0,
    Pwm2Sm2,
    Pwm2Sm3,
    Pwm4Sm0,
    Pwm4Sm1,
    Pwm4Sm2,
}

/// One servo output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoChannel {
    pub submodule: ServoSubmodule,
    pub output: Channel,
}

const fn channel(submodule: ServoSubmodule, output: Channel) -> ServoChannel {
    ServoChannel { submodule, output }
}

/// Joints grouped right-front, right-back, left-front, left-back.
pub const JOINTS: [[ServoChannel; 3]; 4] = [
    [
        channel(ServoSubmodule::Pwm1Sm3, Channel::A),
        channel(ServoSubmodule::Pwm1Sm3, Channel::B),
        channel(ServoSubmodule::Pwm2Sm0, Channel::A),
    ],
    [
        channel(ServoSubmodule::Pwm2Sm0, Channel::B),
        channel(ServoSubmodule::Pwm2Sm2, Channel::A),
        channel(ServoSubmodule::Pwm2Sm2, Channel::B),
    ],
    [
        channel(ServoSubmodule::Pwm2Sm3, Channel::A),
        channel(ServoSubmodule::Pwm2Sm3, Channel::B),
        channel(ServoSubmodule::Pwm4Sm2, Channel::A),
    ],
    [
        channel(ServoSubmodule::Pwm4Sm2, Channel::B),
        channel(ServoSubmodule::Pwm4Sm0, Channel::A),
        channel(ServoSubmodule::Pwm4Sm1, Channel::A),
    ],
];

/// Output pins, kept so that nothing else can claim them.
pub struct ServoPins {
    pub p8: Output<P8>,
    pub p7: Output<P7>,
    pub p4: Output<P4>,
    pub p33: Output<P33>,
    pub p6: Output<P6>,
    pub p9: Output<P9>,
    pub p36: Output<P36>,
    pub p37: Output<P37>,
    pub p2: Output<P2>,
    pub p3: Output<P3>,
    pub p22: Output<P22>,
    pub p23: Output<P23>,
}

/// FlexPWM modules and submodules driving the servos.
pub struct ServoModules {
    pub pwm1: Pwm<1>,
    pub pwm2: Pwm<2>,
    pub pwm4: Pwm<4>,
    pub pwm1_sm3: Submodule<1, 3>,
    pub pwm2_sm0: Submodule<2, 0>,
    pub pwm2_sm2: Submodule<2, 2>,
    pub pwm2_sm3: Submodule<2, 3>,
    pub pwm4_sm0: Submodule<4, 0>,
    pub pwm4_sm1: Submodule<4, 1>,
    pub pwm4_sm2: Submodule<4, 2>,
}

/// Run `$body` with the module and submodule behind a [`ServoSubmodule`].
macro_rules! with_submodule {
    ($modules:expr, $which:expr, |$pwm:ident, $sm:ident| $body:expr) => {
        match $which {
            ServoSubmodule::Pwm1Sm3 => {
                let ($pwm, $sm) = (&mut $modules.pwm1, &mut $modules.pwm1_sm3);
                $body
            }
            ServoSubmodule::Pwm2Sm0 => {
                let ($pwm, $sm) = (&mut $modules.pwm2, &mut $modules.pwm2_sm0);
                $body
            }
            ServoSubmodule::Pwm2Sm2 => {
                let ($pwm, $sm) = (&mut $modules.pwm2, &mut $modules.pwm2_sm2);
                $body
            }
            ServoSubmodule::Pwm2Sm3 => {
                let ($pwm, $sm) = (&mut $modules.pwm2, &mut $modules.pwm2_sm3);
                $body
            }
            ServoSubmodule::Pwm4Sm0 => {
                let ($pwm, $sm) = (&mut $modules.pwm4, &mut $modules.pwm4_sm0);
                $body
            }
            ServoSubmodule::Pwm4Sm1 => {
                let ($pwm, $sm) = (&mut $modules.pwm4, &mut $modules.pwm4_sm1);
                $body
            }
            ServoSubmodule::Pwm4Sm2 => {
                let ($pwm, $sm) = (&mut $modules.pwm4, &mut $modules.pwm4_sm2);
                $body
            }
        }
    };
}

const SUBMODULES: [ServoSubmodule; 7] = [
    ServoSubmodule::Pwm1Sm3,
    ServoSubmodule::Pwm2Sm0,
    ServoSubmodule::Pwm2Sm2,
    ServoSubmodule::Pwm2Sm3,
    ServoSubmodule::Pwm4Sm0,
    ServoSubmodule::Pwm4Sm1,
    ServoSubmodule::Pwm4Sm2,
];

/// Every servo channel as one [`embedded_hal::Pwm`].
pub struct ServoBank {
    modules: ServoModules,
    _pins: ServoPins,
}

impl ServoBank {
    /// Configure every submodule for a 50Hz period and start them with all
    /// outputs low.
    pub fn new(mut modules: ServoModules, pins: ServoPins) -> Self {
        for which in SUBMODULES {
            with_submodule!(modules, which, |pwm, sm| {
                sm.set_running(pwm, false);
                sm.set_debug_enable(true);
                sm.set_wait_enable(true);
                sm.set_clock_select(ClockSelect::Ipg);
                sm.set_pair_operation(PairOperation::Independent);
                sm.set_prescaler(PRESCALER);
                sm.set_load_mode(LoadMode::reload_full());
                sm.set_initial_count(pwm, 0);
                sm.set_value(FULL_RELOAD_VALUE_REGISTER, (PERIOD_COUNTS - 1) as i16);
                sm.set_turn_on(Channel::A, 0);
                sm.set_turn_on(Channel::B, 0);
                sm.set_turn_off(Channel::A, 0);
                sm.set_turn_off(Channel::B, 0);
                sm.set_load_ok(pwm);
                sm.set_running(pwm, true);
            });
        }

        Self {
            modules,
            _pins: pins,
        }
    }

    pub fn into_leg_servos(self) -> LegServos<Self> {
        LegServos::new(self, JOINTS)
    }
}

impl embedded_hal::Pwm for ServoBank {
    type Channel = ServoChannel;
    /// Period in FlexPWM counts.
    type Time = u16;
    type Duty = u16;

    fn disable(&mut self, channel: ServoChannel) {
        with_submodule!(self.modules, channel.submodule, |pwm, sm| {
            sm.set_output_enable(pwm, channel.output, false)
        });
    }

    fn enable(&mut self, channel: ServoChannel) {
        with_submodule!(self.modules, channel.submodule, |pwm, sm| {
            sm.set_output_enable(pwm, channel.output, true)
        });
    }

    fn get_period(&self) -> u16 {
        PERIOD_COUNTS
    }

    fn get_duty(&self, channel: ServoChannel) -> u16 {
        let modules = &self.modules;
        let turn_off = match channel.submodule {
            ServoSubmodule::Pwm1Sm3 => modules.pwm1_sm3.turn_off(channel.output),
            ServoSubmodule::Pwm2Sm0 => modules.pwm2_sm0.turn_off(channel.output),
            ServoSubmodule::Pwm2Sm2 => modules.pwm2_sm2.turn_off(channel.output),
            ServoSubmodule::Pwm2Sm3 => modules.pwm2_sm3.turn_off(channel.output),
            ServoSubmodule::Pwm4Sm0 => modules.pwm4_sm0.turn_off(channel.output),
            ServoSubmodule::Pwm4Sm1 => modules.pwm4_sm1.turn_off(channel.output),
            ServoSubmodule::Pwm4Sm2 => modules.pwm4_sm2.turn_off(channel.output),
        };
        turn_off.max(0) as u16
    }

    fn get_max_duty(&self) -> u16 {
        PERIOD_COUNTS
    }

    fn set_duty(&mut self, channel: ServoChannel, duty: u16) {
        let duty = duty.min(PERIOD_COUNTS) as i16;
        with_submodule!(self.modules, channel.submodule, |pwm, sm| {
            sm.set_turn_off(channel.output, duty);
            sm.set_load_ok(pwm);
        });
    }

    fn set_period<P>(&mut self, _period: P)
    where
        P: Into<u16>,
    {
        log::warn!("Servo period is fixed at {}Hz.", SERVO_FREQUENCY_HZ);
    }
}

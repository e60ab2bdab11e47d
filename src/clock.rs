//!
//! Clock Constants and the microsecond clock
//!

use teensy4_bsp::{
    board::PERCLK_FREQUENCY,
    hal::gpt::{ClockSource, Mode},
};

use swarmnode_control::Clock;

use crate::config::CLOCK_FREQUENCY;
use crate::peripherals::ClockTimer;

/// Reference clock for the GPT clocks
pub const GPT_CLOCK_SOURCE: ClockSource = ClockSource::HighFrequencyReferenceClock;
/// Divider for the microsecond clock
pub const GPT_1_DIVIDER: u32 = PERCLK_FREQUENCY / CLOCK_FREQUENCY;

/// GPT1 counting microseconds, extended to 64 bits.
///
/// The counter wraps every ~71 minutes, so [`Clock::now_us`] has to be called
/// at least that often.  The main loop calls it every iteration.
pub struct MicrosecondClock {
    gpt: ClockTimer,
    last_count: u32,
    wraps: u64,
}

impl MicrosecondClock {
    pub fn new(mut gpt: ClockTimer) -> Self {
        gpt.disable();
        gpt.set_divider(GPT_1_DIVIDER);
        gpt.set_clock_source(GPT_CLOCK_SOURCE);
        gpt.set_mode(Mode::FreeRunning);
        gpt.enable();

        Self {
            gpt,
            last_count: 0,
            wraps: 0,
        }
    }
}

impl Clock for MicrosecondClock {
    fn now_us(&mut self) -> u64 {
        let count = self.gpt.count();
        if count < self.last_count {
            self.wraps += 1;
        }
        self.last_count = count;
        (self.wraps << 32) | u64::from(count)
    }
}

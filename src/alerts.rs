//!
//! The two sensor alert lines on GPIO1.
//!
//! Both lines share the GPIO1 16-31 interrupt.  The handler only finds out
//! which line fired, disables it and raises the matching work flag.  The main
//! loop re-enables a line once the sensor's own latch has been cleared, so an
//! edge seen while the line was disabled fires as soon as it is armed again.
//!

use teensy4_bsp::hal::gpio::Trigger;

use swarmnode_control::{AlertSource, PendingWork};

use crate::peripherals::{Gpio1, ImuAlert, PowerAlert};

/// Edge announcing a new alert on a line with the given polarity.
pub fn alert_edge(active_low: bool) -> Trigger {
    if active_low {
        Trigger::FallingEdge
    } else {
        Trigger::RisingEdge
    }
}

pub struct AlertPins {
    gpio: Gpio1,
    imu: ImuAlert,
    imu_edge: Trigger,
    power_monitor: PowerAlert,
    power_monitor_edge: Trigger,
}

impl AlertPins {
    /// Take both lines.  They stay disabled until first re-armed.
    pub fn new(
        mut gpio: Gpio1,
        imu: ImuAlert,
        imu_edge: Trigger,
        power_monitor: PowerAlert,
        power_monitor_edge: Trigger,
    ) -> Self {
        gpio.set_interrupt(&imu, None);
        gpio.set_interrupt(&power_monitor, None);
        imu.clear_triggered();
        power_monitor.clear_triggered();

        Self {
            gpio,
            imu,
            imu_edge,
            power_monitor,
            power_monitor_edge,
        }
    }

    /// Called from the interrupt handler.
    pub fn disarm_fired(&mut self, pending: &PendingWork) {
        if self.imu.is_triggered() {
            self.imu.clear_triggered();
            self.gpio.set_interrupt(&self.imu, None);
            pending.raise(AlertSource::Imu);
        }

        if self.power_monitor.is_triggered() {
            self.power_monitor.clear_triggered();
            self.gpio.set_interrupt(&self.power_monitor, None);
            pending.raise(AlertSource::PowerMonitor);
        }
    }

    pub fn rearm(&mut self, source: AlertSource) {
        match source {
            AlertSource::Imu => self.gpio.set_interrupt(&self.imu, Some(self.imu_edge)),
            AlertSource::PowerMonitor => self
                .gpio
                .set_interrupt(&self.power_monitor, Some(self.power_monitor_edge)),
        }
    }
}

//!
//! The node's hardware behind the seams of [`swarmnode_control::Board`].
//!
//! Bus failures never leave this module: they are logged and replaced by
//! zero readings.
//!

use embedded_hal::digital::v2::InputPin;
use log::{error, info, warn};
use rtic::Mutex;

use ina226_driver::registers::MaskEnable;
use ina226_driver::{AlertPolarity as PowerAlertPolarity, Poll};
use leg_servos::LegServos;
use mpu6500_driver::registers::IntPinConfig;
use mpu6500_driver::{AlertPolarity as ImuAlertPolarity, Offsets, RawSample, Scale, WHO_AM_I_EXPECTED};
use swarmnode_common::{critical, ByteSink, ByteSource, DigitalInputs, LegAngles};
use swarmnode_control::{
    Actuators, AlertLines, AlertSource, ChargeInputs, Clock, ImuDevice, LogControl, PowerMonitor,
};

use crate::alerts::AlertPins;
use crate::clock::MicrosecondClock;
use crate::errors::{ImuBusError, ImuCalibrationError, PowerMonitorInitError};
use crate::config::{
    power_monitor_configuration, CALIBRATION_POLLS, IMU_ALERT, IMU_ALERT_PIN, IMU_CONFIG,
    POWER_MONITOR_ALERT, POWER_MONITOR_LIMITS,
};
use crate::peripherals::{self, ChargeLines, ConnectDetect, Imu, PitDelay};
use crate::serial::{SerialLink, UsbSerial};
use crate::servos::ServoBank;
use crate::LOGGER;

/// Check the IMU is present and set it up.  Returns whether its alert line is
/// active low.
pub fn configure_imu(imu: &mut Imu, delay: &mut PitDelay) -> bool {
    match imu.who_am_i() {
        Ok(WHO_AM_I_EXPECTED) => info!("Found MPU-6500."),
        Ok(other) => critical!(
            "IMU WHO_AM_I is {:#04x}, expected {:#04x}",
            other,
            WHO_AM_I_EXPECTED
        ),
        Err(err) => critical!("IMU is not responding: {:?}", err),
    }

    match imu.configure(&IMU_CONFIG, delay) {
        Ok(scale) => info!(
            "IMU sampling at {}Hz, {} LSB/dps, {} LSB/g",
            imu.sample_rate_hz(),
            scale.gyro,
            scale.accel
        ),
        Err(err) => error!("Unable to configure the IMU: {:?}", err),
    }

    match imu.configure_alert(IMU_ALERT, IMU_ALERT_PIN) {
        Ok(polarity) => polarity == ImuAlertPolarity::ActiveLow,
        Err(err) => {
            error!("Unable to configure the IMU alert: {:?}", err);
            IMU_ALERT_PIN.contains(IntPinConfig::ACTIVE_LOW)
        }
    }
}

fn setup_power_monitor(
    power_monitor: &mut peripherals::PowerMonitor,
) -> Result<PowerAlertPolarity, PowerMonitorInitError> {
    power_monitor.configure(&power_monitor_configuration())?;
    power_monitor.calibrate()?;
    Ok(power_monitor.configure_alert(POWER_MONITOR_ALERT, &POWER_MONITOR_LIMITS)?)
}

/// Set up the power monitor.  Returns whether its alert line is active low.
pub fn configure_power_monitor(power_monitor: &mut peripherals::PowerMonitor) -> bool {
    match power_monitor.manufacturer_id() {
        Ok(id) => info!("Found INA226 from manufacturer {:#06x}.", id),
        Err(err) => critical!("Power monitor is not responding: {:?}", err),
    }

    match setup_power_monitor(power_monitor) {
        Ok(polarity) => polarity == PowerAlertPolarity::ActiveLow,
        Err(err) => {
            error!("Unable to configure the power monitor: {:?}", err);
            !POWER_MONITOR_ALERT.contains(MaskEnable::ALERT_ACTIVE_HIGH)
        }
    }
}

/// Peripherals only the main loop touches.
pub struct Hardware {
    pub imu: Imu,
    pub power_monitor: peripherals::PowerMonitor,
    pub charge: ChargeLines,
    pub connect: ConnectDetect,
    pub servos: LegServos<ServoBank>,
    pub clock: MicrosecondClock,
    pub delay: PitDelay,
}

impl Hardware {
    fn read_imu(&mut self) -> Result<RawSample, ImuBusError> {
        // reading the status releases the latched INT line
        self.imu.clear_alert()?;
        self.imu.read_sample()
    }

    fn calibrate_imu(&mut self, samples: u32) -> Result<Offsets, ImuCalibrationError> {
        self.imu.calibrate(&mut self.delay, samples, CALIBRATION_POLLS)
    }
}

/// [`Hardware`] plus the resources shared with interrupt handlers.
pub struct NodeBoard<'a, A, S> {
    hardware: &'a mut Hardware,
    alerts: A,
    serial: SerialLink<S>,
}

impl<'a, A, S> NodeBoard<'a, A, S>
where
    A: Mutex<T = AlertPins>,
    S: Mutex<T = UsbSerial>,
{
    pub fn new(hardware: &'a mut Hardware, alerts: A, usb: S) -> Self {
        Self {
            hardware,
            alerts,
            serial: SerialLink::new(usb),
        }
    }
}

/// Pulled-up lines read low when asserted.
fn asserted<P: InputPin>(pin: &P) -> bool {
    pin.is_low().unwrap_or(false)
}

impl<A, S> Clock for NodeBoard<'_, A, S> {
    fn now_us(&mut self) -> u64 {
        self.hardware.clock.now_us()
    }
}

impl<A, S> ImuDevice for NodeBoard<'_, A, S> {
    fn read_sample(&mut self) -> Option<RawSample> {
        match self.hardware.read_imu() {
            Ok(sample) => Some(sample),
            Err(err) => {
                warn!("IMU read failed: {:?}", err);
                None
            }
        }
    }

    fn scale(&self) -> Scale {
        self.hardware.imu.scale()
    }

    fn calibrate(&mut self, samples: u32) -> Option<Offsets> {
        match self.hardware.calibrate_imu(samples) {
            Ok(offsets) => Some(offsets),
            Err(err) => {
                error!("IMU calibration failed: {:?}", err);
                None
            }
        }
    }
}

impl<A, S> PowerMonitor for NodeBoard<'_, A, S> {
    fn poll_power(&mut self) -> Poll {
        self.hardware.power_monitor.poll()
    }
}

impl<A, S> ChargeInputs for NodeBoard<'_, A, S> {
    fn read_inputs(&mut self) -> DigitalInputs {
        let (one, two, three, four) = &self.hardware.charge;
        DigitalInputs {
            charge: [
                asserted(one),
                asserted(two),
                asserted(three),
                asserted(four),
            ],
            connected: asserted(&self.hardware.connect),
        }
    }
}

impl<A, S> Actuators for NodeBoard<'_, A, S> {
    fn set_leg_angles(&mut self, angles: &LegAngles) {
        self.hardware.servos.set_angles(angles.legs());
    }
}

impl<A: Mutex<T = AlertPins>, S> AlertLines for NodeBoard<'_, A, S> {
    fn rearm(&mut self, source: AlertSource) {
        self.alerts.lock(|alerts| alerts.rearm(source));
    }
}

impl<A, S: Mutex<T = UsbSerial>> LogControl for NodeBoard<'_, A, S> {
    fn set_min_severity(&mut self, severity: u8) {
        LOGGER.set_min_severity(severity);
    }

    fn replay_last_error(&mut self) -> bool {
        LOGGER.replay_last_error()
    }

    fn flush_logs(&mut self) {
        LOGGER.drain(&mut self.serial);
        self.serial.pump();
    }
}

impl<A, S: Mutex<T = UsbSerial>> ByteSource for NodeBoard<'_, A, S> {
    fn read_byte(&mut self) -> Option<u8> {
        self.serial.read_byte()
    }
}

impl<A, S: Mutex<T = UsbSerial>> ByteSink for NodeBoard<'_, A, S> {
    fn write_all(&mut self, bytes: &[u8]) {
        self.serial.write_all(bytes);
    }
}

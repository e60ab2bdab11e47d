//!
//! Everything the node knows about itself.  Owned by the main loop.
//!

use ina226_driver::PowerState;
use mpu6500_driver::ImuState;
use swarmnode_common::{CurrentTelemetry, DigitalInputs, ImuTelemetry};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceState {
    /// Sampled whenever input telemetry is sent.
    pub inputs: DigitalInputs,
    pub power: PowerState,
    pub imu: ImuState,
}

impl DeviceState {
    pub fn current_telemetry(&self) -> CurrentTelemetry {
        let latest = &self.power.latest;
        CurrentTelemetry {
            shunt_voltage_nv: latest.shunt_voltage_nv,
            bus_voltage_uv: latest.bus_voltage_uv,
            power_uw: latest.power_uw,
            energy_uj: self.power.energy_uj,
            current_ua: latest.current_ua,
        }
    }

    pub fn imu_telemetry(&self) -> ImuTelemetry {
        let imu = &self.imu;
        ImuTelemetry {
            temperature: imu.temperature,
            angular_velocity: imu.angular_velocity,
            heading: imu.heading,
            acceleration: imu.acceleration,
            velocity: imu.velocity,
            displacement: imu.displacement,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use ina226_driver::Measurement;

    use super::*;

    #[test]
    fn test_current_telemetry() {
        let mut state = DeviceState::default();
        let measurement = Measurement {
            shunt_voltage_nv: -2_500,
            bus_voltage_uv: 12_000_000,
            power_uw: 2_000_000,
            current_ua: 166_000,
        };
        state.power.apply(&measurement, 0);
        state.power.apply(&measurement, 1_000_000);

        assert_eq!(
            state.current_telemetry(),
            CurrentTelemetry {
                shunt_voltage_nv: -2_500,
                bus_voltage_uv: 12_000_000,
                power_uw: 2_000_000,
                energy_uj: 2_000_000,
                current_ua: 166_000,
            }
        );
    }

    #[test]
    fn test_imu_telemetry() {
        let mut state = DeviceState::default();
        state.imu.temperature = 25.5;
        state.imu.angular_velocity = [1.0, 2.0, 3.0];
        state.imu.heading = [4.0, 5.0, 6.0];
        state.imu.acceleration = [7.0, 8.0, 9.0];
        state.imu.velocity = [10.0, 11.0, 12.0];
        state.imu.displacement = [13.0, 14.0, 15.0];

        let telemetry = state.imu_telemetry();
        assert_eq!(telemetry.temperature, 25.5);
        assert_eq!(telemetry.angular_velocity, [1.0, 2.0, 3.0]);
        assert_eq!(telemetry.heading, [4.0, 5.0, 6.0]);
        assert_eq!(telemetry.acceleration, [7.0, 8.0, 9.0]);
        assert_eq!(telemetry.velocity, [10.0, 11.0, 12.0]);
        assert_eq!(telemetry.displacement, [13.0, 14.0, 15.0]);
    }
}

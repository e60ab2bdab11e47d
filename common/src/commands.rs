//!
//! Messages sent from the host to a node.
//!
//! A message is one opcode byte followed by a payload whose length is fixed by
//! the opcode.
//!

pub const SET_SERVO_ANGLES: u8 = 0;
pub const REQUEST_STATE: u8 = 1;
pub const CALIBRATE_IMU: u8 = 2;
pub const EMIT_BUFFERED_ERROR_LOG: u8 = 3;
pub const RESET_DEAD_RECKONING: u8 = 4;
pub const SET_PROGRAM_OPTIONS: u8 = 5;

/// Target angles in degrees for the three joints of every leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LegAngles {
    pub right_front: [u8; 3],
    pub right_back: [u8; 3],
    pub left_front: [u8; 3],
    pub left_back: [u8; 3],
}

impl LegAngles {
    pub const LEN: usize = 12;

    pub fn from_payload(payload: &[u8; Self::LEN]) -> Self {
        let group = |start: usize| [payload[start], payload[start + 1], payload[start + 2]];
        Self {
            right_front: group(0),
            right_back: group(3),
            left_front: group(6),
            left_back: group(9),
        }
    }

    /// Every leg in payload order.
    pub fn legs(&self) -> [[u8; 3]; 4] {
        [self.right_front, self.right_back, self.left_front, self.left_back]
    }
}

/// Runtime options the host may change at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramOptions {
    /// Minimum severity of log records forwarded to the host.
    pub log_level: u8,
    /// Period of unsolicited telemetry in milliseconds.  Negative disables it.
    pub telemetry_interval_ms: i16,
    /// Whether loop performance reports are produced.
    pub loop_perf: bool,
}

impl ProgramOptions {
    pub const LEN: usize = 4;

    pub fn from_payload(payload: &[u8; Self::LEN]) -> Self {
        Self {
            log_level: payload[0],
            telemetry_interval_ms: i16::from_be_bytes([payload[1], payload[2]]),
            loop_perf: payload[3] != 0,
        }
    }

    /// Telemetry period in microseconds, if periodic telemetry is enabled.
    pub fn telemetry_interval_us(&self) -> Option<u64> {
        u64::try_from(self.telemetry_interval_ms)
            .ok()
            .map(|ms| ms * 1_000)
    }
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            log_level: crate::logging::Severity::Info as u8,
            telemetry_interval_ms: -1,
            loop_perf: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetServoAngles(LegAngles),
    RequestState,
    CalibrateImu,
    EmitBufferedErrorLog,
    ResetDeadReckoning,
    SetProgramOptions(ProgramOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The message had no opcode.
    Empty,
    UnknownOpcode(u8),
    /// The payload length does not match the opcode.
    InvalidLength { opcode: u8, len: usize },
}

impl Command {
    /// Payload length expected after `opcode`, or `None` for unknown opcodes.
    pub const fn payload_len(opcode: u8) -> Option<usize> {
        match opcode {
            SET_SERVO_ANGLES => Some(LegAngles::LEN),
            SET_PROGRAM_OPTIONS => Some(ProgramOptions::LEN),
            REQUEST_STATE | CALIBRATE_IMU | EMIT_BUFFERED_ERROR_LOG | RESET_DEAD_RECKONING => {
                Some(0)
            }
            _ => None,
        }
    }

    pub fn parse(message: &[u8]) -> Result<Self, CommandError> {
        let (&opcode, payload) = message.split_first().ok_or(CommandError::Empty)?;
        let expected = Self::payload_len(opcode).ok_or(CommandError::UnknownOpcode(opcode))?;
        if payload.len() != expected {
            return Err(CommandError::InvalidLength {
                opcode,
                len: payload.len(),
            });
        }

        let invalid = |_| CommandError::InvalidLength {
            opcode,
            len: payload.len(),
        };
        Ok(match opcode {
            SET_SERVO_ANGLES => {
                Command::SetServoAngles(LegAngles::from_payload(payload.try_into().map_err(invalid)?))
            }
            SET_PROGRAM_OPTIONS => Command::SetProgramOptions(ProgramOptions::from_payload(
                payload.try_into().map_err(invalid)?,
            )),
            REQUEST_STATE => Command::RequestState,
            CALIBRATE_IMU => Command::CalibrateImu,
            EMIT_BUFFERED_ERROR_LOG => Command::EmitBufferedErrorLog,
            RESET_DEAD_RECKONING => Command::ResetDeadReckoning,
            _ => return Err(CommandError::UnknownOpcode(opcode)),
        })
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Command::SetServoAngles(_) => SET_SERVO_ANGLES,
            Command::RequestState => REQUEST_STATE,
            Command::CalibrateImu => CALIBRATE_IMU,
            Command::EmitBufferedErrorLog => EMIT_BUFFERED_ERROR_LOG,
            Command::ResetDeadReckoning => RESET_DEAD_RECKONING,
            Command::SetProgramOptions(_) => SET_PROGRAM_OPTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_parse_servo_angles() {
        let message = [0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let command = Command::parse(&message).unwrap();
        assert_eq!(
            command,
            Command::SetServoAngles(LegAngles {
                right_front: [10, 20, 30],
                right_back: [40, 50, 60],
                left_front: [70, 80, 90],
                left_back: [100, 110, 120],
            })
        );
        assert_eq!(command.opcode(), SET_SERVO_ANGLES);
    }

    #[test]
    fn test_parse_program_options() {
        let command = Command::parse(&[5, 20, 0x01, 0xF4, 1]).unwrap();
        let Command::SetProgramOptions(options) = command else {
            panic!("unexpected command {:?}", command);
        };
        assert_eq!(options.log_level, 20);
        assert_eq!(options.telemetry_interval_ms, 500);
        assert!(options.loop_perf);
        assert_eq!(options.telemetry_interval_us(), Some(500_000));
    }

    #[test]
    fn test_negative_interval_disables_telemetry() {
        let options = ProgramOptions::from_payload(&[10, 0xFF, 0x9C, 0]);
        assert_eq!(options.telemetry_interval_ms, -100);
        assert_eq!(options.telemetry_interval_us(), None);
        assert!(!options.loop_perf);

        let options = ProgramOptions::from_payload(&[10, 0x00, 0x00, 7]);
        assert_eq!(options.telemetry_interval_us(), Some(0));
        assert!(options.loop_perf);
    }

    #[test]
    fn test_parse_bare_opcodes() {
        assert_eq!(Command::parse(&[1]), Ok(Command::RequestState));
        assert_eq!(Command::parse(&[2]), Ok(Command::CalibrateImu));
        assert_eq!(Command::parse(&[3]), Ok(Command::EmitBufferedErrorLog));
        assert_eq!(Command::parse(&[4]), Ok(Command::ResetDeadReckoning));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse(&[]), Err(CommandError::Empty));
        assert_eq!(Command::parse(&[6]), Err(CommandError::UnknownOpcode(6)));
        assert_eq!(Command::parse(&[0xFF, 1, 2]), Err(CommandError::UnknownOpcode(0xFF)));
        assert_eq!(
            Command::parse(&[1, 0]),
            Err(CommandError::InvalidLength { opcode: 1, len: 1 })
        );
        assert_eq!(
            Command::parse(&[0, 1, 2, 3]),
            Err(CommandError::InvalidLength { opcode: 0, len: 3 })
        );
        assert_eq!(
            Command::parse(&[5, 1, 2, 3, 4, 5]),
            Err(CommandError::InvalidLength { opcode: 5, len: 5 })
        );
    }
}

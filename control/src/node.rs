//!
//! The main loop of a swarm node.
//!
//! [`Node::step`] is called forever from the board's idle loop.  Each call
//! drains the serial input, then services at most one of: the IMU alert, the
//! power monitor alert, periodic telemetry, or nothing (an idle iteration).
//!

use log::{debug, error, info, warn};
use swarmnode_common::{
    events, Command, CommandError, Event, FrameError, FrameSync, LegAngles, ProgramOptions,
    RawBytes, Severity, StateSnapshot, StringMessage, MAX_MESSAGE_LEN,
};
use ina226_driver::Poll;

use crate::{
    AlertSource, Board, DeviceState, LoopPerf, PendingWork, TelemetrySchedule,
    CALIBRATION_SAMPLES,
};

/// Sent once startup is complete.
pub const BANNER: &str = concat!("swarmnode ", env!("CARGO_PKG_VERSION"), " ready");

/// Answer to a buffered error request when nothing has been logged.
pub const NO_BUFFERED_ERROR: &str = "no error has been logged";

pub struct Node {
    state: DeviceState,
    options: ProgramOptions,
    frames: FrameSync<MAX_MESSAGE_LEN>,
    message: [u8; MAX_MESSAGE_LEN],
    telemetry: TelemetrySchedule,
    perf: LoopPerf,
    last_imu_sample_us: Option<u64>,
}

impl Node {
    pub fn new() -> Self {
        Self {
            state: DeviceState::default(),
            options: ProgramOptions::default(),
            frames: FrameSync::new(),
            message: [0; MAX_MESSAGE_LEN],
            telemetry: TelemetrySchedule::new(),
            perf: LoopPerf::new(),
            last_imu_sample_us: None,
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn options(&self) -> &ProgramOptions {
        &self.options
    }

    /// Bring the node up once the sensors have been configured.
    ///
    /// Runs a stationary calibration, arms both alert lines and announces the
    /// node to the host.
    pub fn startup<B: Board>(&mut self, board: &mut B) {
        board.set_min_severity(self.options.log_level);

        self.calibrate_imu(board);
        self.state.imu.reset_dead_reckoning();

        board.rearm(AlertSource::Imu);
        board.rearm(AlertSource::PowerMonitor);

        self.state.inputs = board.read_inputs();
        Self::emit(board, &StateSnapshot { inputs: self.state.inputs });
        Self::emit(board, &StringMessage(BANNER));

        board.flush_logs();
    }

    /// One main loop iteration.
    pub fn step<B: Board>(&mut self, board: &mut B, pending: &PendingWork) {
        self.process_commands(board);

        if pending.take(AlertSource::Imu) {
            self.service_imu(board);
        } else if pending.take(AlertSource::PowerMonitor) {
            self.service_power_monitor(board);
        } else if self.telemetry.due(board.now_us()) {
            self.emit_telemetry(board);
        } else if self.options.loop_perf {
            self.perf.idle();
        }

        if self.options.loop_perf {
            if let Some(report) = self.perf.tick(board.now_us()) {
                Self::emit(board, &report);
            }
        }

        board.flush_logs();
    }

    /// Feed every byte available right now through the frame synchronizer and
    /// execute each complete command.
    fn process_commands<B: Board>(&mut self, board: &mut B) {
        while let Some(byte) = board.read_byte() {
            let len = match self.frames.push(byte, &mut self.message) {
                Ok(Some(len)) => len,
                Ok(None) => continue,
                Err(FrameError::Overflow) => {
                    error!("frame longer than {} bytes dropped", MAX_MESSAGE_LEN);
                    continue;
                }
                Err(FrameError::Decode(err)) => {
                    error!(
                        "undecodable frame dropped: {:?} after {} bytes",
                        err.status, err.written
                    );
                    if self.options.log_level <= Severity::Debug as u8 {
                        let recovered = err.written.min(MAX_MESSAGE_LEN);
                        Self::emit(board, &RawBytes(&self.message[..recovered]));
                    }
                    continue;
                }
            };

            match Command::parse(&self.message[..len]) {
                Ok(command) => self.execute(command, board),
                Err(CommandError::Empty) => error!("empty message ignored"),
                Err(CommandError::UnknownOpcode(opcode)) => {
                    error!("unknown opcode {} ignored", opcode)
                }
                Err(CommandError::InvalidLength { opcode, len }) => error!(
                    "opcode {} expects {:?} payload bytes, got {}",
                    opcode,
                    Command::payload_len(opcode),
                    len
                ),
            }
        }
    }

    /// Run a single command.
    pub fn execute<B: Board>(&mut self, command: Command, board: &mut B) {
        debug!("executing {:?}", command);
        match command {
            Command::SetServoAngles(angles) => self.set_servo_angles(&angles, board),
            Command::RequestState => self.emit_telemetry(board),
            Command::CalibrateImu => self.calibrate_imu(board),
            Command::EmitBufferedErrorLog => {
                if !board.replay_last_error() {
                    Self::emit(board, &StringMessage(NO_BUFFERED_ERROR));
                }
            }
            Command::ResetDeadReckoning => self.state.imu.reset_dead_reckoning(),
            Command::SetProgramOptions(options) => self.set_program_options(options, board),
        }
    }

    fn set_servo_angles<B: Board>(&mut self, angles: &LegAngles, board: &mut B) {
        board.set_leg_angles(angles);
    }

    fn set_program_options<B: Board>(&mut self, options: ProgramOptions, board: &mut B) {
        self.options = options;
        board.set_min_severity(options.log_level);

        let now_us = board.now_us();
        self.telemetry.configure(options.telemetry_interval_us(), now_us);
        if options.loop_perf {
            self.perf.restart(now_us);
        }

        info!(
            "log level {}, telemetry every {} ms, loop perf {}",
            options.log_level, options.telemetry_interval_ms, options.loop_perf
        );
    }

    /// Blocks for the whole calibration pass.
    fn calibrate_imu<B: Board>(&mut self, board: &mut B) {
        info!("calibrating IMU over {} samples", CALIBRATION_SAMPLES);
        match board.calibrate(CALIBRATION_SAMPLES) {
            Some(offsets) => {
                self.state.imu.offsets = offsets;
                info!(
                    "IMU offsets accel {:?} gyro {:?}",
                    offsets.accel, offsets.gyro
                );
            }
            None => error!("IMU calibration abandoned, keeping previous offsets"),
        }
        // the time spent calibrating is not motion
        self.last_imu_sample_us = None;
    }

    /// A failed read is skipped; the next good sample integrates over the
    /// whole gap.
    fn service_imu<B: Board>(&mut self, board: &mut B) {
        if let Some(sample) = board.read_sample() {
            let now_us = board.now_us();
            let dt_s = match self.last_imu_sample_us {
                Some(last) => now_us.saturating_sub(last) as f64 / 1_000_000.0,
                None => 0.0,
            };
            self.state.imu.apply(&sample, &board.scale(), dt_s);
            self.last_imu_sample_us = Some(now_us);
        }

        board.rearm(AlertSource::Imu);
    }

    fn service_power_monitor<B: Board>(&mut self, board: &mut B) {
        match board.poll_power() {
            Poll::Converted(measurement) => {
                let now_us = board.now_us();
                self.state.power.apply(&measurement, now_us);
            }
            Poll::Limit(flags) => warn!("power monitor limit alert {:?}", flags),
            Poll::Skipped(flags) => debug!("power monitor alert without conversion {:?}", flags),
        }

        board.rearm(AlertSource::PowerMonitor);
    }

    fn emit_telemetry<B: Board>(&mut self, board: &mut B) {
        self.state.inputs = board.read_inputs();
        Self::emit(board, &self.state.current_telemetry());
        Self::emit(board, &self.state.inputs);
        Self::emit(board, &self.state.imu_telemetry());
    }

    fn emit<B: Board, E: Event>(board: &mut B, event: &E) {
        if let Err(err) = events::emit(board, event) {
            error!("could not emit {:?}: {:?}", E::KIND, err);
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::collections::VecDeque;
    use std::string::String;
    use std::sync::Once;
    use std::vec;
    use std::vec::Vec;

    use log::{LevelFilter, Log, Metadata, Record};

    use ina226_driver::registers::MaskEnable;
    use ina226_driver::Measurement;
    use mpu6500_driver::{Calibration, Offsets, RawSample, Scale};
    use swarmnode_common::{
        cobs, frame_message, ByteSink, ByteSource, DigitalInputs, EventKind, EventLogger,
        MAX_EVENT_FRAME_LEN,
    };

    use super::*;
    use crate::{Actuators, AlertLines, ChargeInputs, Clock, ImuDevice, LogControl, PowerMonitor};

    std::thread_local! {
        static RECORDS: EventLogger<4096> = EventLogger::new();
    }

    /// Routes records to a logger owned by the test's thread so that tests
    /// running side by side see only their own records.
    struct ThreadLogger;

    impl Log for ThreadLogger {
        fn enabled(&self, _: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            RECORDS.with(|logger| logger.log(record));
        }

        fn flush(&self) {}
    }

    static THREAD_LOGGER: ThreadLogger = ThreadLogger;

    fn capture_logs() {
        static INSTALL: Once = Once::new();
        INSTALL.call_once(|| {
            log::set_logger(&THREAD_LOGGER).ok();
            log::set_max_level(LevelFilter::Trace);
        });
    }

    #[derive(Default)]
    struct Wire(Vec<u8>);

    impl ByteSink for Wire {
        fn write_all(&mut self, bytes: &[u8]) {
            self.0.extend_from_slice(bytes);
        }
    }

    fn unstuff(wire: &[u8]) -> Vec<Vec<u8>> {
        wire.split(|&byte| byte == 0)
            .filter(|frame| !frame.is_empty())
            .map(|frame| {
                let mut message = [0; MAX_EVENT_FRAME_LEN];
                let len = cobs::decode(frame, &mut message).unwrap();
                message[..len].to_vec()
            })
            .collect()
    }

    #[derive(Default)]
    struct FakeBoard {
        now_us: u64,
        input: VecDeque<u8>,
        output: Vec<u8>,
        samples: VecDeque<RawSample>,
        stationary: Vec<RawSample>,
        polls: VecDeque<Poll>,
        inputs: DigitalInputs,
        angles: Vec<LegAngles>,
        rearmed: Vec<AlertSource>,
        min_severity: Vec<u8>,
        has_error: bool,
        replays: usize,
        flushes: usize,
        logged: Wire,
    }

    impl FakeBoard {
        fn send(&mut self, message: &[u8]) {
            let mut frame = [0; MAX_EVENT_FRAME_LEN];
            let len = frame_message(message, &mut frame).unwrap();
            self.input.extend(&frame[..len]);
        }

        /// Unstuff everything written so far.
        fn events(&mut self) -> Vec<Vec<u8>> {
            unstuff(&core::mem::take(&mut self.output))
        }

        /// Severity and text of every LogRecord flushed so far.
        fn logs(&mut self) -> Vec<(u8, String)> {
            unstuff(&core::mem::take(&mut self.logged.0))
                .into_iter()
                .map(|record| {
                    assert_eq!(record[0], EventKind::LogRecord as u8);
                    let tag_end = record.iter().skip(1).position(|&b| b == 0).unwrap() + 1;
                    let severity = record[tag_end + 1];
                    let text = String::from_utf8(record[tag_end + 6..].to_vec()).unwrap();
                    (severity, text)
                })
                .collect()
        }

        fn errors(&mut self) -> Vec<String> {
            self.logs()
                .into_iter()
                .filter(|(severity, _)| *severity == Severity::Error as u8)
                .map(|(_, text)| text)
                .collect()
        }

        fn kinds(&mut self) -> Vec<u8> {
            self.events().iter().map(|event| event[0]).collect()
        }
    }

    impl Clock for FakeBoard {
        fn now_us(&mut self) -> u64 {
            self.now_us
        }
    }

    impl ImuDevice for FakeBoard {
        fn read_sample(&mut self) -> Option<RawSample> {
            self.samples.pop_front()
        }

        fn scale(&self) -> Scale {
            Scale::default()
        }

        fn calibrate(&mut self, samples: u32) -> Option<Offsets> {
            if self.stationary.is_empty() {
                return None;
            }
            let mut calibration = Calibration::new();
            for sample in self.stationary.iter().cycle().take(samples as usize) {
                calibration.add(sample);
            }
            calibration.offsets()
        }
    }

    impl PowerMonitor for FakeBoard {
        fn poll_power(&mut self) -> Poll {
            self.polls
                .pop_front()
                .unwrap_or(Poll::Skipped(MaskEnable::empty()))
        }
    }

    impl ChargeInputs for FakeBoard {
        fn read_inputs(&mut self) -> DigitalInputs {
            self.inputs
        }
    }

    impl Actuators for FakeBoard {
        fn set_leg_angles(&mut self, angles: &LegAngles) {
            self.angles.push(*angles);
        }
    }

    impl AlertLines for FakeBoard {
        fn rearm(&mut self, source: AlertSource) {
            self.rearmed.push(source);
        }
    }

    impl LogControl for FakeBoard {
        fn set_min_severity(&mut self, severity: u8) {
            self.min_severity.push(severity);
        }

        fn replay_last_error(&mut self) -> bool {
            self.replays += 1;
            self.has_error
        }

        fn flush_logs(&mut self) {
            self.flushes += 1;
            let logged = &mut self.logged;
            RECORDS.with(|logger| logger.drain(logged));
        }
    }

    impl ByteSource for FakeBoard {
        fn read_byte(&mut self) -> Option<u8> {
            self.input.pop_front()
        }
    }

    impl ByteSink for FakeBoard {
        fn write_all(&mut self, bytes: &[u8]) {
            self.output.extend_from_slice(bytes);
        }
    }

    fn stationary_sample() -> RawSample {
        RawSample {
            accel: [12, -40, 16_300],
            temperature: 100,
            gyro: [-3, 5, 1],
        }
    }

    fn options(level: u8, interval_ms: i16, perf: bool) -> [u8; 5] {
        let [hi, lo] = interval_ms.to_be_bytes();
        [5, level, hi, lo, perf as u8]
    }

    #[test]
    fn test_startup() {
        let mut board = FakeBoard {
            stationary: vec![stationary_sample()],
            inputs: DigitalInputs {
                charge: [true, false, false, true],
                connected: true,
            },
            ..Default::default()
        };
        let mut node = Node::new();
        node.startup(&mut board);

        assert_eq!(board.min_severity, vec![Severity::Info as u8]);
        assert_eq!(
            node.state().imu.offsets,
            Offsets {
                accel: [-12, 40, -16_300],
                gyro: [3, -5, -1],
            }
        );
        assert_eq!(board.rearmed, vec![AlertSource::Imu, AlertSource::PowerMonitor]);
        assert_eq!(board.flushes, 1);

        let events = board.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], vec![EventKind::StateSnapshot as u8, 1, 0, 0, 1, 1]);
        assert_eq!(events[1][0], EventKind::StringMessage as u8);
        assert_eq!(&events[1][1..], BANNER.as_bytes());
    }

    #[test]
    fn test_startup_without_imu_keeps_zero_offsets() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        node.startup(&mut board);

        assert_eq!(node.state().imu.offsets, Offsets::default());
        assert_eq!(board.kinds(), vec![EventKind::StateSnapshot as u8, EventKind::StringMessage as u8]);
    }

    #[test]
    fn test_set_servo_angles() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        let mut message = vec![0];
        message.extend(1..=12);
        board.send(&message);
        node.step(&mut board, &pending);

        assert_eq!(board.angles.len(), 1);
        assert_eq!(
            board.angles[0].legs(),
            [[1, 2, 3], [4, 5, 6], [7, 8, 9], [10, 11, 12]]
        );
    }

    #[test]
    fn test_servo_angles_with_wrong_length_are_ignored() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        let mut short = vec![0];
        short.extend(1..=11);
        let mut long = vec![0];
        long.extend(1..=13);
        capture_logs();
        board.send(&short);
        board.send(&long);
        node.step(&mut board, &pending);

        assert!(board.angles.is_empty());
        assert!(board.output.is_empty());
        let errors = board.errors();
        assert!(errors.iter().any(|text| text.starts_with("opcode 0 expects") && text.ends_with("got 11")));
        assert!(errors.iter().any(|text| text.starts_with("opcode 0 expects") && text.ends_with("got 13")));
    }

    #[test]
    fn test_unknown_opcode_does_not_stop_processing() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        board.send(&[42, 1, 2]);
        board.send(&[1]);
        node.step(&mut board, &pending);

        assert_eq!(
            board.kinds(),
            vec![
                EventKind::CurrentSensor as u8,
                EventKind::DigitalInputs as u8,
                EventKind::Imu as u8,
            ]
        );
    }

    #[test]
    fn test_spurious_delimiter_loses_only_the_corrupt_frame() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        // a servo command cut short by a stray delimiter
        board.input.extend([0, 13, 0, 0, 1, 2, 3]);
        board.input.push_back(0);
        let mut message = vec![0];
        message.extend(21..=32);
        board.send(&message);
        node.step(&mut board, &pending);

        assert_eq!(board.angles.len(), 1);
        assert_eq!(board.angles[0].right_front, [21, 22, 23]);
        assert_eq!(board.angles[0].left_back, [30, 31, 32]);
    }

    #[test]
    fn test_overflowing_frame_then_valid_frame() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        capture_logs();
        board.input.push_back(0);
        board.input.extend(core::iter::repeat(7).take(MAX_MESSAGE_LEN + 10));
        board.input.push_back(0);
        let mut message = vec![0];
        message.extend([9; 12]);
        board.send(&message);
        node.step(&mut board, &pending);

        assert_eq!(board.angles.len(), 1);
        assert_eq!(board.angles[0].legs(), [[9; 3]; 4]);
        assert!(board
            .errors()
            .contains(&std::format!("frame longer than {} bytes dropped", MAX_MESSAGE_LEN)));
    }

    #[test]
    fn test_undecodable_frame_dumped_at_debug() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        board.input.extend([0, 5, 1, 0]);
        node.step(&mut board, &pending);
        assert!(board.events().is_empty());

        board.send(&options(Severity::Debug as u8, -1, false));
        board.input.extend([0, 5, 1, 0]);
        node.step(&mut board, &pending);
        assert_eq!(board.kinds(), vec![EventKind::RawBytes as u8]);
    }

    #[test]
    fn test_request_state() {
        let mut board = FakeBoard {
            inputs: DigitalInputs {
                charge: [false, true, false, false],
                connected: false,
            },
            ..Default::default()
        };
        let mut node = Node::new();
        let pending = PendingWork::new();

        board.send(&[1]);
        node.step(&mut board, &pending);

        let events = board.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0][0], EventKind::CurrentSensor as u8);
        assert_eq!(events[0].len(), 1 + 24);
        assert_eq!(events[1], vec![EventKind::DigitalInputs as u8, 0, 1, 0, 0, 0]);
        assert_eq!(events[2][0], EventKind::Imu as u8);
        assert_eq!(events[2].len(), 1 + 4 + 12 + 24 + 12 + 24 + 24);
        assert_eq!(node.state().inputs, board.inputs);
    }

    #[test]
    fn test_imu_is_serviced_before_power_monitor() {
        let mut board = FakeBoard::default();
        board.samples.push_back(RawSample {
            accel: [0, 0, 16_384],
            temperature: 0,
            gyro: [131, 0, 0],
        });
        let mut node = Node::new();
        let pending = PendingWork::new();
        pending.raise(AlertSource::PowerMonitor);
        pending.raise(AlertSource::Imu);

        node.step(&mut board, &pending);
        assert_eq!(board.rearmed, vec![AlertSource::Imu]);
        assert!(pending.is_pending(AlertSource::PowerMonitor));
        assert_eq!(node.state().imu.angular_velocity, [1.0, 0.0, 0.0]);
        assert!((node.state().imu.acceleration[2] - 9.8067).abs() < 1e-4);
        // first sample only establishes the time base
        assert_eq!(node.state().imu.velocity, [0.0; 3]);

        node.step(&mut board, &pending);
        assert_eq!(board.rearmed, vec![AlertSource::Imu, AlertSource::PowerMonitor]);
        assert!(!pending.is_pending(AlertSource::PowerMonitor));
    }

    #[test]
    fn test_imu_integrates_over_clock_delta() {
        let mut board = FakeBoard::default();
        let sample = RawSample {
            accel: [16_384, 0, 0],
            temperature: 0,
            gyro: [0, 0, 131],
        };
        board.samples.extend([sample, sample]);
        let mut node = Node::new();
        let pending = PendingWork::new();

        board.now_us = 1_000_000;
        pending.raise(AlertSource::Imu);
        node.step(&mut board, &pending);

        board.now_us = 1_500_000;
        pending.raise(AlertSource::Imu);
        node.step(&mut board, &pending);

        let imu = &node.state().imu;
        assert!((imu.velocity[0] - 9.8067 * 0.5).abs() < 1e-4);
        assert!((imu.displacement[0] - 9.8067 * 0.25).abs() < 1e-4);
        assert_eq!(imu.heading, [0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_failed_imu_read_is_not_integrated() {
        let mut board = FakeBoard {
            stationary: vec![stationary_sample()],
            ..Default::default()
        };
        let mut node = Node::new();
        let pending = PendingWork::new();
        node.startup(&mut board);
        board.rearmed.clear();

        board.samples.push_back(stationary_sample());
        board.now_us = 1_000_000;
        pending.raise(AlertSource::Imu);
        node.step(&mut board, &pending);

        // no sample queued: the read fails
        board.now_us = 1_500_000;
        pending.raise(AlertSource::Imu);
        node.step(&mut board, &pending);

        let imu = &node.state().imu;
        assert_eq!(imu.acceleration, [0.0; 3]);
        assert_eq!(imu.velocity, [0.0; 3]);
        assert_eq!(imu.displacement, [0.0; 3]);
        assert_eq!(board.rearmed, vec![AlertSource::Imu; 2]);

        board.samples.push_back(RawSample {
            accel: [12 + 16_384, -40, 16_300],
            ..stationary_sample()
        });
        board.now_us = 2_000_000;
        pending.raise(AlertSource::Imu);
        node.step(&mut board, &pending);
        assert!((node.state().imu.velocity[0] - 9.8067).abs() < 1e-4);
    }

    #[test]
    fn test_power_monitor_accumulates_energy() {
        let measurement = Measurement {
            shunt_voltage_nv: 25_000,
            bus_voltage_uv: 12_000_000,
            power_uw: 6_000_000,
            current_ua: 500_000,
        };
        let mut board = FakeBoard::default();
        board.polls.extend([
            Poll::Converted(measurement),
            Poll::Limit(MaskEnable::ALERT_FUNCTION_FLAG),
            Poll::Converted(measurement),
        ]);
        let mut node = Node::new();
        let pending = PendingWork::new();

        for now_us in [0, 100_000, 250_000] {
            board.now_us = now_us;
            pending.raise(AlertSource::PowerMonitor);
            node.step(&mut board, &pending);
        }

        assert_eq!(node.state().power.latest, measurement);
        assert_eq!(node.state().power.energy_uj, 6_000 * 250_000 / 1_000);
        assert_eq!(board.rearmed, vec![AlertSource::PowerMonitor; 3]);
    }

    #[test]
    fn test_periodic_telemetry() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        node.step(&mut board, &pending);
        assert!(board.events().is_empty());

        board.now_us = 1_000;
        board.send(&options(Severity::Info as u8, 100, false));
        node.step(&mut board, &pending);
        assert_eq!(board.events().len(), 3);
        assert_eq!(node.options().telemetry_interval_ms, 100);

        board.now_us = 60_000;
        node.step(&mut board, &pending);
        assert!(board.events().is_empty());

        // a late iteration does not shift the following deadline
        board.now_us = 130_000;
        node.step(&mut board, &pending);
        assert_eq!(board.events().len(), 3);
        board.now_us = 200_999;
        node.step(&mut board, &pending);
        assert!(board.events().is_empty());
        board.now_us = 201_000;
        node.step(&mut board, &pending);
        assert_eq!(board.events().len(), 3);

        board.send(&options(Severity::Info as u8, -1, false));
        board.now_us = 10_000_000;
        node.step(&mut board, &pending);
        assert!(board.events().is_empty());
        assert_eq!(board.min_severity, vec![Severity::Info as u8; 2]);
    }

    #[test]
    fn test_pending_work_preempts_telemetry() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        board.send(&options(Severity::Info as u8, 0, false));
        pending.raise(AlertSource::Imu);
        node.step(&mut board, &pending);
        assert!(board.events().is_empty());

        node.step(&mut board, &pending);
        assert_eq!(board.events().len(), 3);
    }

    #[test]
    fn test_loop_perf_report() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        board.send(&options(Severity::Info as u8, -1, true));
        for now_us in 0..9_999 {
            board.now_us = now_us;
            node.step(&mut board, &pending);
        }
        assert!(board.events().is_empty());

        board.now_us = 9_999;
        node.step(&mut board, &pending);
        assert_eq!(
            board.events(),
            vec![vec![EventKind::LoopPerf as u8, 0x27, 0x10, 0, 0, 0x27, 0x0F]]
        );
    }

    #[test]
    fn test_emit_buffered_error_log() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        board.send(&[3]);
        node.step(&mut board, &pending);
        let events = board.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0][0], EventKind::StringMessage as u8);
        assert_eq!(&events[0][1..], NO_BUFFERED_ERROR.as_bytes());

        board.has_error = true;
        board.send(&[3]);
        node.step(&mut board, &pending);
        assert!(board.events().is_empty());
        assert_eq!(board.replays, 2);
    }

    #[test]
    fn test_reset_dead_reckoning_keeps_offsets_and_readings() {
        let mut board = FakeBoard {
            stationary: vec![stationary_sample()],
            ..Default::default()
        };
        let sample = RawSample {
            accel: [16_384 + 12, 0, 0],
            temperature: 0,
            gyro: [134, 0, 0],
        };
        board.samples.extend([sample, sample]);
        let mut node = Node::new();
        let pending = PendingWork::new();
        node.startup(&mut board);

        for now_us in [0, 10_000] {
            board.now_us = now_us;
            pending.raise(AlertSource::Imu);
            node.step(&mut board, &pending);
        }
        let before = node.state().imu;
        assert!(before.velocity[0] > 0.0);

        board.send(&[4]);
        node.step(&mut board, &pending);

        let after = node.state().imu;
        assert_eq!(after.velocity, [0.0; 3]);
        assert_eq!(after.displacement, [0.0; 3]);
        assert_eq!(after.heading, [0.0; 3]);
        assert_eq!(after.offsets, before.offsets);
        assert_eq!(after.acceleration, before.acceleration);
        assert_eq!(after.angular_velocity, before.angular_velocity);
    }

    #[test]
    fn test_calibrate_command() {
        let mut board = FakeBoard::default();
        let mut node = Node::new();
        let pending = PendingWork::new();

        // no data ready: offsets untouched
        board.send(&[2]);
        node.step(&mut board, &pending);
        assert_eq!(node.state().imu.offsets, Offsets::default());

        let samples = vec![
            RawSample {
                accel: [10, 20, 16_000],
                temperature: 0,
                gyro: [1, 2, 3],
            },
            RawSample {
                accel: [14, 24, 16_010],
                temperature: 0,
                gyro: [3, 4, 5],
            },
        ];
        board.stationary = samples.clone();
        board.send(&[2]);
        node.step(&mut board, &pending);

        let offsets = node.state().imu.offsets;
        for axis in 0..3 {
            let accel: i32 = samples
                .iter()
                .map(|s| i32::from(s.accel[axis]) + i32::from(offsets.accel[axis]))
                .sum();
            let gyro: i32 = samples
                .iter()
                .map(|s| i32::from(s.gyro[axis]) + i32::from(offsets.gyro[axis]))
                .sum();
            assert!(accel.abs() <= samples.len() as i32);
            assert!(gyro.abs() <= samples.len() as i32);
        }
    }
}

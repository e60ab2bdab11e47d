//!
//! Board binding of a swarm node: a Teensy 4.1 with an MPU-6500 on LPSPI4, an
//! INA226 on LPI2C1, twelve leg servos on FlexPWM and serial over USB to the
//! host.
//!

#![no_std]

pub mod alerts;
pub use alerts::*;

pub mod board;
pub use board::*;

pub mod clock;
pub use clock::*;

pub mod config;

pub mod errors;
pub use errors::*;

pub mod peripherals;
pub use peripherals::*;

pub mod serial;
pub use serial::*;

pub mod servos;
pub use servos::*;

use swarmnode_common::EventLogger;
use swarmnode_control::PendingWork;

use config::LOG_OUTBOX_LEN;

/// The `log` backend.  Records become LogRecord events on the serial link.
pub static LOGGER: EventLogger<LOG_OUTBOX_LEN> = EventLogger::new();

/// Work raised by the alert interrupt for the main loop.
pub static PENDING: PendingWork = PendingWork::new();

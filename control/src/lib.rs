//!
//! Board independent behaviour of a swarm node.
//!
//! The board binding implements the traits in [`board`], owns a [`Node`] and
//! calls [`Node::step`] forever.  Interrupt handlers only disarm their line
//! and raise a flag in [`PendingWork`].
//!

#![no_std]

pub mod board;
pub use board::*;

pub mod handoff;
pub use handoff::*;

pub mod schedule;
pub use schedule::*;

pub mod state;
pub use state::*;

pub mod node;
pub use node::*;

/// Readings averaged by a stationary IMU calibration.
pub const CALIBRATION_SAMPLES: u32 = 2048;

/// Main loop iterations covered by one loop performance report.
pub const PERF_WINDOW: u16 = 10_000;

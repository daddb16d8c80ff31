//! # LcrMeter
//!
//! Bench LCR meter firmware core.
//!
//! ## Architecture
//!
//! One blocking command loop owns everything:
//! - [`console`] reads a line, tokenizes it and dispatches a command
//! - [`measure::MeasurementEngine`] sequences the analog front end
//!   ([`frontend`]) through the board traits in [`hal`]
//! - The capture edge is the only concurrent party; it hands its interval
//!   to the engine through [`capture::CaptureCell`] and logs through
//!   [`log_globals::ISR_LOG_STREAM`]
//!
//! No heap, no locks.

#![cfg_attr(not(test), no_std)]

pub mod capture;
pub mod config;
pub mod console;
pub mod frontend;
pub mod hal;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod measure;

pub use capture::{CaptureCell, CaptureSample};
pub use config::CONFIG;
pub use console::{Console, ConsoleError, Outcome};
pub use frontend::{ControlLine, FrontEndState};
pub use log_globals::{APP_LOG_STREAM, ISR_LOG_STREAM};
pub use measure::{auto_detect, MeasureError, MeasurementEngine, MeasurementResult};

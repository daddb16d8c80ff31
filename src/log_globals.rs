//! Global log stream instances.
//!
//! One stream per execution context, each with a single consumer (the
//! command loop drain).

use crate::logging::LogStream;

/// Capture event stream.
///
/// Written only from the capture edge handler, which may interrupt the
/// command loop at any instruction boundary.
pub static ISR_LOG_STREAM: LogStream = LogStream::new();

/// Application stream for the measurement engine and console.
pub static APP_LOG_STREAM: LogStream = LogStream::new();

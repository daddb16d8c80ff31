//! Hardware Abstraction Layer for the LCR meter.
//!
//! Thin I/O seams. Measurement logic stays in core modules and only talks
//! to the board through these traits:
//!
//! - [`ControlPins`]: the five front-end control lines
//! - [`AnalogInput`]: one raw 12-bit ADC conversion of the sense node
//! - [`Timebase`]: blocking delays and a microsecond clock
//! - [`CaptureTimer`]: zero/enable the edge-latched counter
//! - [`SerialLine`]: terminal byte I/O
//! - [`Restart`]: full controller restart
//!
//! The capture *value* does not flow through these traits; the board's edge
//! handler publishes it into a [`crate::capture::CaptureCell`].

use crate::frontend::ControlLine;

pub mod sim;

#[cfg(target_os = "espidf")]
pub mod esp;

/// Front-end control line outputs.
pub trait ControlPins {
    /// Drive one line. `asserted` is the logical level; polarity is the
    /// board's business.
    fn write_line(&mut self, line: ControlLine, asserted: bool);
}

/// Comparator-referenced analog sample source.
pub trait AnalogInput {
    /// One raw conversion, 0..=4095.
    fn read_raw(&mut self) -> u16;
}

/// Blocking delays. Nothing else runs while waiting, except the capture edge.
pub trait Timebase {
    fn delay_us(&mut self, us: u32);

    /// Monotonic microseconds since boot (log timestamps).
    fn now_us(&self) -> i64;

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1000);
        }
    }
}

/// Edge-latched free-running counter.
pub trait CaptureTimer {
    /// Zero the counter. The next edge measures from here.
    fn rearm(&mut self);

    /// Let the counter run and the edge event fire. Idempotent.
    fn enable(&mut self);
}

/// Everything the measurement engine drives.
pub trait Board: ControlPins + AnalogInput + Timebase + CaptureTimer {}

impl<T: ControlPins + AnalogInput + Timebase + CaptureTimer> Board for T {}

/// Byte-level terminal session.
pub trait SerialLine {
    /// Block until a byte arrives.
    fn read_byte(&mut self) -> u8;

    fn write_bytes(&mut self, bytes: &[u8]);

    fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

/// Adapter so `core::fmt` output can target a [`SerialLine`].
pub struct SerialWriter<'a, S: SerialLine + ?Sized>(pub &'a mut S);

impl<'a, S: SerialLine + ?Sized> core::fmt::Write for SerialWriter<'a, S> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.0.write_bytes(s.as_bytes());
        Ok(())
    }
}

/// Full controller restart.
pub trait Restart {
    fn restart(&mut self) -> !;
}

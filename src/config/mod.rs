//! Module: config
//!
//! Purpose: Runtime configuration for the LCR meter.
//!
//! Architecture:
//! - `CONFIG`: single global, every field an atomic
//! - Read from the capture event handler, so access must never lock
//! - Board wiring (`PinMap`) and serial framing (`UartConfig`) are fixed
//!
//! Calibration constants live in `measure::convert` and are not
//! operator-adjustable.
//!
//! Safety: RT-safe. All access via atomics, no locks.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::logging::LogLevel;

/// Capture timer ticks per microsecond in the reference clocking (40 MHz).
pub const DEFAULT_TICKS_PER_US: u32 = 40;

/// Runtime configuration, lock-free.
pub struct MeterConfig {
    /// Capture timer ticks per microsecond.
    pub ticks_per_us: AtomicU32,
    /// Echo accepted input bytes back to the terminal.
    pub echo: AtomicBool,
    /// Log every capture event with its elapsed interval.
    pub capture_log: AtomicBool,
    /// Most verbose level that still reaches the log streams.
    pub log_level: AtomicU8,
}

impl MeterConfig {
    /// Create configuration with defaults.
    pub const fn new() -> Self {
        Self {
            ticks_per_us: AtomicU32::new(DEFAULT_TICKS_PER_US),
            echo: AtomicBool::new(false),
            capture_log: AtomicBool::new(true),
            log_level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Capture timer ticks per microsecond (never zero).
    #[inline]
    pub fn ticks_per_us(&self) -> u32 {
        self.ticks_per_us.load(Ordering::Relaxed).max(1)
    }

    #[inline]
    pub fn echo(&self) -> bool {
        self.echo.load(Ordering::Relaxed)
    }

    pub fn set_echo(&self, on: bool) {
        self.echo.store(on, Ordering::Relaxed);
    }

    #[inline]
    pub fn capture_log(&self) -> bool {
        self.capture_log.load(Ordering::Relaxed)
    }

    pub fn set_capture_log(&self, on: bool) {
        self.capture_log.store(on, Ordering::Relaxed);
    }

    /// Current maximum log level.
    #[inline]
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.log_level.load(Ordering::Relaxed))
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.log_level.store(level as u8, Ordering::Relaxed);
    }

    /// True if messages at `level` should be recorded.
    #[inline]
    pub fn log_enabled(&self, level: LogLevel) -> bool {
        level <= self.log_level()
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Global configuration instance.
pub static CONFIG: MeterConfig = MeterConfig::new();

/// Serial console framing. 8N1 is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    pub baud_rate: u32,
    pub tx_pin: i32,
    pub rx_pin: i32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            tx_pin: 43, // U0TXD on ESP32-S3
            rx_pin: 44, // U0RXD
        }
    }
}

/// GPIO assignment of the analog front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub integrate: i32,
    pub lowside_r: i32,
    pub highside_r: i32,
    pub meas_c: i32,
    pub meas_lr: i32,
    /// Comparator output feeding the capture input.
    pub comparator: i32,
    /// ADC1 channel wired to the front-end sense node.
    pub adc_channel: u32,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            integrate: 4,
            lowside_r: 5,
            highside_r: 6,
            meas_c: 7,
            meas_lr: 15,
            comparator: 16,
            adc_channel: 0, // GPIO1
        }
    }
}

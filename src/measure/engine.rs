//! Measurement engine.
//!
//! Owns the board and the front-end state. Every routine is a blocking
//! sequence of line changes, waits and capture/ADC reads; nothing runs in
//! the background. The only concurrent party is the capture edge, which
//! talks to the engine exclusively through the [`CaptureCell`].

use core::fmt;

use crate::capture::{CaptureCell, CaptureSample, CaptureWindow};
use crate::config::CONFIG;
use crate::frontend::{ControlLine, FrontEndState};
use crate::hal::Board;
use crate::log_globals::APP_LOG_STREAM;

use super::convert;
use super::esr::EsrFilter;

use ControlLine::{HighsideR, Integrate, LowsideR, MeasC, MeasLr};

/// `voltage`: settle after selecting the MEAS_C path.
pub const VOLTAGE_SETTLE_MS: u32 = 500;
/// `resistance`: integrator precharge with the low side closed.
pub const RESISTANCE_PRECHARGE_MS: u32 = 1000;
/// `resistance`: window for the capture edge.
pub const RESISTANCE_WINDOW_MS: u32 = 2000;
/// `capacitance`: discharge through the low side.
pub const CAPACITANCE_DISCHARGE_MS: u32 = 2000;
/// `capacitance`: window for the capture edge.
pub const CAPACITANCE_WINDOW_MS: u32 = 3000;
/// `test`: discharge before arming the probe.
pub const PROBE_DISCHARGE_MS: u32 = 3000;
/// `inductance`: settle before sampling the sense node.
pub const INDUCTANCE_SETTLE_MS: u32 = 300;
/// `inductance`: pause between sampling and reporting.
pub const INDUCTANCE_REPORT_US: u32 = 3000;
/// `inductance`: discharge hold after reporting.
pub const INDUCTANCE_HOLD_MS: u32 = 7000;

/// One measured quantity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MeasurementResult {
    Resistance { ohms: f32 },
    Capacitance { microfarads: f32 },
    /// `volts` is the instantaneous sense sample that fed the ESR filter.
    Inductance { microhenries: f32, esr_ohms: f32, volts: f32 },
    Voltage { volts: f32 },
}

/// Why a routine produced no result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasureError {
    /// The capture window closed without an edge.
    NoCapture,
    /// Inductance needs a capture from an earlier call and none exists.
    NoPriorCapture,
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureError::NoCapture => f.write_str("no capture edge in window"),
            MeasureError::NoPriorCapture => f.write_str("no prior capture"),
        }
    }
}

/// Front-end sequencer and unit conversion.
pub struct MeasurementEngine<'c, B: Board> {
    board: B,
    capture: &'c CaptureCell,
    lines: FrontEndState,
    window: CaptureWindow,
    esr: EsrFilter,
}

impl<'c, B: Board> MeasurementEngine<'c, B> {
    /// Take ownership of the board and drive every line to its idle level.
    pub fn new(mut board: B, capture: &'c CaptureCell) -> Self {
        for line in ControlLine::ALL {
            board.write_line(line, false);
        }
        Self {
            board,
            capture,
            lines: FrontEndState::IDLE,
            window: capture.open_window(),
            esr: EsrFilter::new(),
        }
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Current control line levels.
    pub fn lines(&self) -> FrontEndState {
        self.lines
    }

    /// Current ESR filter state.
    pub fn esr_filter(&self) -> &EsrFilter {
        &self.esr
    }

    // --- Primitives ---

    /// Set one line, with the MEAS_C/MEAS_LR interlock.
    pub fn set_line(&mut self, line: ControlLine, asserted: bool) {
        self.apply(self.lines.with(line, asserted));
    }

    /// Set several lines as one step. Later entries win.
    pub fn set_front_end(&mut self, settings: &[(ControlLine, bool)]) {
        self.apply(self.lines.with_all(settings));
    }

    /// De-assert every line.
    pub fn release_all(&mut self) {
        self.apply(FrontEndState::IDLE);
    }

    fn apply(&mut self, target: FrontEndState) {
        for write in self.lines.transition(target) {
            self.board.write_line(write.line, write.asserted);
        }
        self.lines = target;
        crate::rt_trace!(APP_LOG_STREAM, self.board.now_us(), "front end: {}", target);
    }

    pub fn wait_ms(&mut self, ms: u32) {
        self.board.delay_ms(ms);
    }

    pub fn wait_us(&mut self, us: u32) {
        self.board.delay_us(us);
    }

    /// Zero the capture counter and open a new measurement window.
    ///
    /// The board stops latching before the window opens, so an edge still
    /// pending from an earlier arming lands in the old window and is never
    /// returned by [`Self::read_capture`] afterwards.
    pub fn rearm_capture(&mut self) {
        self.board.rearm();
        self.window = self.capture.open_window();
    }

    /// Let the capture counter run.
    pub fn start_capture(&mut self) {
        self.board.enable();
    }

    /// Elapsed microseconds latched inside the current window.
    pub fn read_capture(&self) -> Result<u32, MeasureError> {
        self.capture
            .fresh(self.window)
            .map(|sample| sample.micros(CONFIG.ticks_per_us()))
            .ok_or(MeasureError::NoCapture)
    }

    /// Most recent capture since boot, from any window. Used to hand an
    /// earlier measurement to [`Self::inductance`].
    pub fn latest_capture(&self) -> Option<CaptureSample> {
        self.capture.latest()
    }

    /// One offset-corrected sense sample, in volts.
    pub fn sample_voltage(&mut self) -> f32 {
        convert::sense_volts(self.board.read_raw())
    }

    /// One pass-through input sample, in volts.
    pub fn sample_passthrough_voltage(&mut self) -> f32 {
        convert::passthrough_volts(self.board.read_raw())
    }

    // --- Routines ---

    /// Pass-through input voltage on the MEAS_C path.
    pub fn voltage(&mut self) -> MeasurementResult {
        self.set_line(MeasC, true);
        self.wait_ms(VOLTAGE_SETTLE_MS);
        let volts = self.sample_passthrough_voltage();
        crate::rt_debug!(APP_LOG_STREAM, self.board.now_us(), "voltage: {} V", volts);
        MeasurementResult::Voltage { volts }
    }

    /// Resistance from the integrator ramp time.
    pub fn resistance(&mut self) -> Result<MeasurementResult, MeasureError> {
        self.set_front_end(&[(Integrate, true), (LowsideR, true), (HighsideR, false)]);
        self.wait_ms(RESISTANCE_PRECHARGE_MS);

        self.rearm_capture();
        self.set_front_end(&[(LowsideR, false), (MeasLr, true)]);
        self.start_capture();
        self.wait_ms(RESISTANCE_WINDOW_MS);

        let t = self.read_capture().inspect_err(|_| self.log_missing("resistance"))?;
        let ohms = convert::resistance_ohms(t);
        crate::rt_debug!(APP_LOG_STREAM, self.board.now_us(), "resistance: t={} us", t);
        Ok(MeasurementResult::Resistance { ohms })
    }

    /// Capacitance from the charge time through the high side.
    pub fn capacitance(&mut self) -> Result<MeasurementResult, MeasureError> {
        self.set_front_end(&[
            (Integrate, false),
            (MeasC, true),
            (LowsideR, true),
            (HighsideR, false),
        ]);
        self.wait_ms(CAPACITANCE_DISCHARGE_MS);

        self.rearm_capture();
        self.set_front_end(&[(LowsideR, false), (HighsideR, true)]);
        self.start_capture();
        self.wait_ms(CAPACITANCE_WINDOW_MS);

        let t = self.read_capture().inspect_err(|_| self.log_missing("capacitance"))?;
        let microfarads = convert::capacitance_uf(t);
        crate::rt_debug!(APP_LOG_STREAM, self.board.now_us(), "capacitance: t={} us", t);
        Ok(MeasurementResult::Capacitance { microfarads })
    }

    /// Arm a capture on the charge path and return without waiting.
    ///
    /// The edge arrives later and is published (and logged) by the capture
    /// handler; a following [`Self::inductance`] consumes it.
    pub fn capture_probe(&mut self) {
        self.set_front_end(&[(Integrate, true), (LowsideR, true), (HighsideR, false)]);
        self.wait_ms(PROBE_DISCHARGE_MS);

        self.set_line(LowsideR, false);
        self.rearm_capture();
        self.set_line(HighsideR, true);
        self.start_capture();
        crate::rt_debug!(APP_LOG_STREAM, self.board.now_us(), "probe armed");
    }

    /// Inductance and ESR.
    ///
    /// `prior` is the capture latched by an earlier measurement (normally the
    /// `test` probe). It must be read by the caller before this routine
    /// rearms the timer.
    ///
    /// `report` runs once the values are known, before the 7 s discharge
    /// hold, so the operator sees the result without waiting for it.
    pub fn inductance<F>(&mut self, prior: CaptureSample, report: F) -> MeasurementResult
    where
        F: FnOnce(&MeasurementResult),
    {
        let t = prior.micros(CONFIG.ticks_per_us());

        self.set_front_end(&[
            (HighsideR, false),
            (Integrate, false),
            (LowsideR, true),
            (MeasLr, true),
        ]);
        self.rearm_capture();
        self.wait_ms(INDUCTANCE_SETTLE_MS);

        let volts = self.sample_voltage();
        let filtered = self.esr.update(volts);
        let esr_ohms = convert::esr_ohms(filtered);
        let microhenries = convert::inductance_uh(t, esr_ohms);
        crate::rt_debug!(
            APP_LOG_STREAM,
            self.board.now_us(),
            "inductance: t={} us v={} iir={}",
            t,
            volts,
            filtered
        );

        self.wait_us(INDUCTANCE_REPORT_US);
        let result = MeasurementResult::Inductance { microhenries, esr_ohms, volts };
        report(&result);

        self.set_front_end(&[(LowsideR, false), (MeasLr, false)]);
        self.wait_ms(INDUCTANCE_HOLD_MS);
        result
    }

    fn log_missing(&self, routine: &str) {
        crate::rt_warn!(APP_LOG_STREAM, self.board.now_us(), "{}: no capture edge", routine);
    }
}

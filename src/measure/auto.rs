//! Component auto-detection.
//!
//! Single pass, no retries:
//!
//! ```text
//! capacitor probe ── v >= 2.2 ──▶ capacitor: 6 charge cycles
//!       │
//!       └─ else ─▶ inductor probe ── v >= 2.4 ──▶ inductor: inductance routine
//!                        │
//!                        └─ else ─▶ resistor: 6 integrate cycles
//! ```
//!
//! A reading exactly at a threshold takes the first branch.

use core::fmt::{self, Write};

use crate::frontend::ControlLine::{HighsideR, Integrate, LowsideR, MeasC, MeasLr};
use crate::hal::Board;
use crate::log_globals::APP_LOG_STREAM;

use super::convert::{self, CAPACITOR_THRESHOLD_V, INDUCTOR_THRESHOLD_V};
use super::engine::{MeasureError, MeasurementEngine, MeasurementResult};
use super::report;

/// Probe settle time for both the capacitor and inductor probes.
pub const PROBE_SETTLE_MS: u32 = 5000;
/// Low-side discharge pulse in the capacitor probe and charge cycles.
pub const CAP_DISCHARGE_PULSE_US: u32 = 3000;
/// Charge time per capacitor cycle.
pub const CAP_CHARGE_MS: u32 = 2500;
/// Low-side pulse and gap in the resistor cycles.
pub const RES_PULSE_US: u32 = 1010;
/// Integration time per resistor cycle.
pub const RES_INTEGRATE_MS: u32 = 500;
/// Repetitions in the capacitor and resistor branches. Only the last counts.
pub const AUTO_CYCLES: usize = 6;

/// What the decision tree concluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    Capacitor,
    Inductor,
    Resistor,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Capacitor => "Capacitor",
            ComponentKind::Inductor => "Inductor",
            ComponentKind::Resistor => "Resistor",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification plus the measurement of the detected component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub kind: ComponentKind,
    /// The probe voltage the decision was taken on.
    pub probe_volts: f32,
    pub result: MeasurementResult,
}

/// Capacitor probe decision. Inclusive threshold.
#[inline]
pub fn is_capacitor(probe_volts: f32) -> bool {
    probe_volts >= CAPACITOR_THRESHOLD_V
}

/// Inductor probe decision. Inclusive threshold.
#[inline]
pub fn is_inductor(probe_volts: f32) -> bool {
    probe_volts >= INDUCTOR_THRESHOLD_V
}

/// Run the full decision tree and the matching measurement, reporting
/// progress to `out` as it goes.
pub fn auto_detect<B: Board>(
    engine: &mut MeasurementEngine<'_, B>,
    out: &mut dyn Write,
) -> Result<Detection, MeasureError> {
    let cap_probe = capacitor_probe(engine);
    crate::rt_info!(APP_LOG_STREAM, engine.board().now_us(), "auto: C probe {} V", cap_probe);

    if is_capacitor(cap_probe) {
        announce(out, ComponentKind::Capacitor);
        let microfarads = measure_capacitor(engine)?;
        report::auto_capacitance(out, microfarads);
        return Ok(Detection {
            kind: ComponentKind::Capacitor,
            probe_volts: cap_probe,
            result: MeasurementResult::Capacitance { microfarads },
        });
    }

    let lr_probe = inductor_probe(engine);
    crate::rt_info!(APP_LOG_STREAM, engine.board().now_us(), "auto: LR probe {} V", lr_probe);

    if is_inductor(lr_probe) {
        announce(out, ComponentKind::Inductor);
        let prior = engine.latest_capture().ok_or(MeasureError::NoPriorCapture)?;
        let result = engine.inductance(prior, |r| report::result(out, r));
        return Ok(Detection {
            kind: ComponentKind::Inductor,
            probe_volts: lr_probe,
            result,
        });
    }

    announce(out, ComponentKind::Resistor);
    let ohms = measure_resistor(engine)?;
    // whole ohms, truncated like the integer report
    report::auto_resistance(out, ohms as u32);
    Ok(Detection {
        kind: ComponentKind::Resistor,
        probe_volts: lr_probe,
        result: MeasurementResult::Resistance { ohms },
    })
}

fn announce(out: &mut dyn Write, kind: ComponentKind) {
    let _ = write!(out, "{} Detected.\r\n", kind);
}

/// Charge through the high side on the MEAS_C path; a capacitor holds the
/// node up.
fn capacitor_probe<B: Board>(engine: &mut MeasurementEngine<'_, B>) -> f32 {
    engine.set_front_end(&[(MeasLr, false), (MeasC, true), (LowsideR, true)]);
    engine.wait_us(CAP_DISCHARGE_PULSE_US);
    engine.set_front_end(&[(LowsideR, false), (HighsideR, true)]);
    engine.wait_ms(PROBE_SETTLE_MS);
    engine.sample_voltage()
}

/// Low side on the MEAS_LR path; an inductor's low DC resistance pulls the
/// sense node up.
fn inductor_probe<B: Board>(engine: &mut MeasurementEngine<'_, B>) -> f32 {
    engine.set_front_end(&[(HighsideR, false), (MeasC, false), (LowsideR, true), (MeasLr, true)]);
    engine.wait_ms(PROBE_SETTLE_MS);
    let volts = engine.sample_voltage();
    engine.set_front_end(&[(LowsideR, false), (MeasLr, false)]);
    volts
}

fn measure_capacitor<B: Board>(engine: &mut MeasurementEngine<'_, B>) -> Result<f32, MeasureError> {
    // Open the high side first so the discharge pulse never overlaps it.
    engine.set_front_end(&[(HighsideR, false), (MeasLr, false), (MeasC, true)]);

    let mut last = Err(MeasureError::NoCapture);
    for _ in 0..AUTO_CYCLES {
        engine.set_line(LowsideR, true);
        engine.wait_us(CAP_DISCHARGE_PULSE_US);
        engine.set_line(LowsideR, false);

        engine.rearm_capture();
        engine.set_line(HighsideR, true);
        engine.start_capture();
        engine.wait_ms(CAP_CHARGE_MS);
        last = engine.read_capture();

        engine.set_line(HighsideR, false);
        engine.wait_us(CAP_DISCHARGE_PULSE_US);
    }

    let t = last?;
    crate::rt_debug!(APP_LOG_STREAM, engine.board().now_us(), "auto: C t={} us", t);
    Ok(convert::auto_capacitance_uf(t))
}

fn measure_resistor<B: Board>(engine: &mut MeasurementEngine<'_, B>) -> Result<f32, MeasureError> {
    engine.release_all();
    engine.set_line(Integrate, true);

    let mut last = Err(MeasureError::NoCapture);
    for _ in 0..AUTO_CYCLES {
        engine.set_line(LowsideR, true);
        engine.wait_us(RES_PULSE_US);
        engine.set_line(LowsideR, false);

        engine.rearm_capture();
        engine.set_line(MeasLr, true);
        engine.start_capture();
        engine.wait_ms(RES_INTEGRATE_MS);
        last = engine.read_capture();

        engine.set_line(MeasLr, false);
        engine.wait_us(RES_PULSE_US);
    }

    let t = last?;
    crate::rt_debug!(APP_LOG_STREAM, engine.board().now_us(), "auto: R t={} us", t);
    Ok(convert::resistance_ohms(t))
}

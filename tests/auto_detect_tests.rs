//! Auto-detect tests on the simulated board

use std::collections::VecDeque;

use lcr_meter::frontend::ControlLine;
use lcr_meter::hal::sim::{CapacitanceModel, Component, SimBoard};
use lcr_meter::hal::{AnalogInput, CaptureTimer, ControlPins, Timebase};
use lcr_meter::measure::auto::{is_capacitor, is_inductor};
use lcr_meter::measure::convert::{self, CAPACITOR_THRESHOLD_V, INDUCTOR_THRESHOLD_V};
use lcr_meter::measure::{auto_detect, ComponentKind};
use lcr_meter::{CaptureCell, MeasureError, MeasurementEngine, MeasurementResult, CONFIG};

#[test]
fn test_threshold_ties_take_first_branch() {
    assert!(is_capacitor(2.20));
    assert!(!is_capacitor(2.19));
    assert!(is_inductor(2.40));
    assert!(!is_inductor(2.39));
}

#[test]
fn test_capacitor_threshold_at_adc_resolution() {
    let raw = first_raw_at(CAPACITOR_THRESHOLD_V);

    let cell = CaptureCell::new();
    let mut engine = MeasurementEngine::new(ProbeBoard::new(&cell, &[raw]), &cell);
    let detection = auto_detect(&mut engine, &mut String::new()).unwrap();
    assert_eq!(detection.kind, ComponentKind::Capacitor);
    assert_eq!(detection.probe_volts, convert::sense_volts(raw));

    // one count lower falls through to the LR probe, which reads 0
    let cell = CaptureCell::new();
    let mut engine = MeasurementEngine::new(ProbeBoard::new(&cell, &[raw - 1, 0]), &cell);
    let detection = auto_detect(&mut engine, &mut String::new()).unwrap();
    assert_eq!(detection.kind, ComponentKind::Resistor);
}

#[test]
fn test_inductor_threshold_at_adc_resolution() {
    let raw = first_raw_at(INDUCTOR_THRESHOLD_V);

    let cell = CaptureCell::new();
    cell.publish(45 * CONFIG.ticks_per_us());
    let mut engine = MeasurementEngine::new(ProbeBoard::new(&cell, &[0, raw]), &cell);
    let detection = auto_detect(&mut engine, &mut String::new()).unwrap();
    assert_eq!(detection.kind, ComponentKind::Inductor);
    assert_eq!(detection.probe_volts, convert::sense_volts(raw));

    let cell = CaptureCell::new();
    let mut engine = MeasurementEngine::new(ProbeBoard::new(&cell, &[0, raw - 1]), &cell);
    let detection = auto_detect(&mut engine, &mut String::new()).unwrap();
    assert_eq!(detection.kind, ComponentKind::Resistor);
    assert_eq!(detection.probe_volts, convert::sense_volts(raw - 1));
}

#[test]
fn test_detects_resistor() {
    let cell = CaptureCell::new();
    let mut engine = MeasurementEngine::new(SimBoard::new(&cell, Component::Resistor { ohms: 1000.0 }), &cell);
    let mut out = String::new();

    let detection = auto_detect(&mut engine, &mut out).unwrap();

    assert_eq!(detection.kind, ComponentKind::Resistor);
    assert!(detection.probe_volts < 2.4);
    let MeasurementResult::Resistance { ohms } = detection.result else {
        panic!("unexpected {:?}", detection.result);
    };
    assert!((ohms - 1000.0).abs() < 0.01);
    assert_eq!(
        out,
        format!("Resistor Detected.\r\nResistance: {:7} Ohms\r\n", ohms as u32)
    );
    assert!(!engine.board().interlock_violated());
}

#[test]
fn test_detects_capacitor() {
    let cell = CaptureCell::new();
    let board = SimBoard::new(&cell, Component::Capacitor { microfarads: 1.0 })
        .with_capacitance_model(CapacitanceModel::Auto);
    let mut engine = MeasurementEngine::new(board, &cell);
    let mut out = String::new();

    let detection = auto_detect(&mut engine, &mut out).unwrap();

    assert_eq!(detection.kind, ComponentKind::Capacitor);
    assert!(detection.probe_volts >= 2.2);
    let MeasurementResult::Capacitance { microfarads } = detection.result else {
        panic!("unexpected {:?}", detection.result);
    };
    assert!((microfarads - 1.0).abs() < 1e-4);
    assert!(out.starts_with("Capacitor Detected.\r\nCapacitance: "));
    assert!(out.ends_with(" uF\r\n"));
    assert!(!engine.board().interlock_violated());
}

#[test]
fn test_detects_inductor_after_probe() {
    let cell = CaptureCell::new();
    let inductor = Component::Inductor { microhenries: 1000.0, esr_ohms: 5.0 };
    let mut engine = MeasurementEngine::new(SimBoard::new(&cell, inductor), &cell);

    engine.capture_probe();
    engine.board_mut().delay_ms(10);

    let mut out = String::new();
    let detection = auto_detect(&mut engine, &mut out).unwrap();

    assert_eq!(detection.kind, ComponentKind::Inductor);
    let MeasurementResult::Inductance { microhenries, esr_ohms, .. } = detection.result else {
        panic!("unexpected {:?}", detection.result);
    };
    assert!((esr_ohms - 5.0).abs() < 0.1);
    assert!((microhenries - 1000.0).abs() < 40.0);
    assert!(out.starts_with("Inductor Detected.\r\nVoltage: "));
    assert!(out.contains("\r\nESR: "));
    assert!(out.ends_with(" uH\r\n"));
    assert!(!engine.board().interlock_violated());
}

#[test]
fn test_inductor_without_prior_capture() {
    let cell = CaptureCell::new();
    let inductor = Component::Inductor { microhenries: 1000.0, esr_ohms: 5.0 };
    let mut engine = MeasurementEngine::new(SimBoard::new(&cell, inductor), &cell);
    let mut out = String::new();

    assert_eq!(auto_detect(&mut engine, &mut out), Err(MeasureError::NoPriorCapture));
    assert_eq!(out, "Inductor Detected.\r\n");
}

#[test]
fn test_open_terminals_read_as_capacitor_without_edge() {
    let cell = CaptureCell::new();
    let mut engine = MeasurementEngine::new(SimBoard::new(&cell, Component::Open), &cell);
    let mut out = String::new();

    assert_eq!(auto_detect(&mut engine, &mut out), Err(MeasureError::NoCapture));
    assert_eq!(out, "Capacitor Detected.\r\n");
}

#[test]
fn test_auto_leaves_engine_reusable() {
    let cell = CaptureCell::new();
    let mut engine = MeasurementEngine::new(SimBoard::new(&cell, Component::Resistor { ohms: 470.0 }), &cell);
    let mut out = String::new();
    auto_detect(&mut engine, &mut out).unwrap();

    engine.board_mut().set_component(Component::Resistor { ohms: 2200.0 });
    let MeasurementResult::Resistance { ohms } = engine.resistance().unwrap() else {
        panic!("expected resistance");
    };
    assert!((ohms - 2200.0).abs() < 1.0);
}

// Smallest ADC count whose sense voltage reaches `volts`.
fn first_raw_at(volts: f32) -> u16 {
    let raw = (0..4096u16).find(|&r| convert::sense_volts(r) >= volts).unwrap();
    assert!(convert::sense_volts(raw - 1) < volts);
    raw
}

/// Fixed ADC script, one 1299 us capture edge per enable.
struct ProbeBoard<'c> {
    cell: &'c CaptureCell,
    adc: VecDeque<u16>,
    now_us: i64,
}

impl<'c> ProbeBoard<'c> {
    fn new(cell: &'c CaptureCell, raw: &[u16]) -> Self {
        Self { cell, adc: raw.iter().copied().collect(), now_us: 0 }
    }
}

impl ControlPins for ProbeBoard<'_> {
    fn write_line(&mut self, _line: ControlLine, _asserted: bool) {}
}

impl AnalogInput for ProbeBoard<'_> {
    fn read_raw(&mut self) -> u16 {
        self.adc.pop_front().unwrap_or(0)
    }
}

impl Timebase for ProbeBoard<'_> {
    fn delay_us(&mut self, us: u32) {
        self.now_us += i64::from(us);
    }

    fn now_us(&self) -> i64 {
        self.now_us
    }
}

impl CaptureTimer for ProbeBoard<'_> {
    fn rearm(&mut self) {}

    fn enable(&mut self) {
        self.cell.publish(1299 * CONFIG.ticks_per_us());
    }
}

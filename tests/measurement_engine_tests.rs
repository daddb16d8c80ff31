//! Measurement engine tests against a scripted board

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use lcr_meter::frontend::ControlLine::{self, HighsideR, Integrate, LowsideR, MeasC, MeasLr};
use lcr_meter::hal::{AnalogInput, CaptureTimer, ControlPins, Timebase};
use lcr_meter::measure::convert;
use lcr_meter::measure::engine::INDUCTANCE_HOLD_MS;
use lcr_meter::{CaptureCell, CaptureSample, MeasureError, MeasurementEngine, MeasurementResult, CONFIG};

#[test]
fn test_resistance_from_capture() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell).edge_after_us(1299);
    let mut engine = MeasurementEngine::new(board, &cell);

    let result = engine.resistance().unwrap();
    let MeasurementResult::Resistance { ohms } = result else {
        panic!("unexpected {:?}", result);
    };
    assert_eq!(format!("{:.2}", ohms), "1000.00");
}

#[test]
fn test_capacitance_from_capture() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell).edge_after_us(129_000);
    let mut engine = MeasurementEngine::new(board, &cell);

    let result = engine.capacitance().unwrap();
    let MeasurementResult::Capacitance { microfarads } = result else {
        panic!("unexpected {:?}", result);
    };
    assert_eq!(format!("{:.2}", microfarads), "1.00");
}

#[test]
fn test_stale_capture_is_never_used() {
    let cell = CaptureCell::new();
    // edge from an earlier measurement, nothing after the rearm
    cell.publish(1299 * CONFIG.ticks_per_us());
    let mut engine = MeasurementEngine::new(ScriptedBoard::new(&cell), &cell);

    assert_eq!(engine.resistance(), Err(MeasureError::NoCapture));
    assert_eq!(engine.capacitance(), Err(MeasureError::NoCapture));
    // still available as the prior capture for inductance
    assert!(engine.latest_capture().is_some());
}

#[test]
fn test_edge_pending_at_rearm_is_stale() {
    let cell = CaptureCell::new();
    // the previous arming fires while the engine rearms, nothing afterwards
    let board = ScriptedBoard::new(&cell).edge_during_rearm_us(1299);
    let mut engine = MeasurementEngine::new(board, &cell);

    assert_eq!(engine.resistance(), Err(MeasureError::NoCapture));
    assert_eq!(engine.latest_capture().map(|s| s.micros(CONFIG.ticks_per_us())), Some(1299));
}

#[test]
fn test_resistance_sequence() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell).edge_after_us(1299);
    let events = board.events.clone();
    let mut engine = MeasurementEngine::new(board, &cell);
    events.borrow_mut().clear();

    engine.resistance().unwrap();

    let log = events.borrow();
    let rearm = log.iter().position(|e| *e == Ev::Rearm).unwrap();
    let enable = log.iter().position(|e| *e == Ev::Enable).unwrap();
    let low_off = log.iter().position(|e| *e == Ev::Line(LowsideR, false)).unwrap();
    let lr_on = log.iter().position(|e| *e == Ev::Line(MeasLr, true)).unwrap();

    assert_eq!(&log[..3], &[Ev::Line(Integrate, true), Ev::Line(LowsideR, true), Ev::DelayMs(1000)]);
    assert!(rearm < low_off);
    assert!(low_off < lr_on);
    assert!(lr_on < enable);
    assert_eq!(log.last(), Some(&Ev::DelayMs(2000)));
}

#[test]
fn test_set_line_interlock() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell);
    let events = board.events.clone();
    let mut engine = MeasurementEngine::new(board, &cell);
    events.borrow_mut().clear();

    engine.set_line(MeasC, true);
    engine.set_line(MeasLr, true);

    assert!(engine.lines().is_asserted(MeasLr));
    assert!(!engine.lines().is_asserted(MeasC));
    assert!(engine.lines().is_valid());
    // break before make
    assert_eq!(
        *events.borrow(),
        vec![Ev::Line(MeasC, true), Ev::Line(MeasC, false), Ev::Line(MeasLr, true)]
    );
}

#[test]
fn test_set_line_same_level_writes_nothing() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell);
    let events = board.events.clone();
    let mut engine = MeasurementEngine::new(board, &cell);
    events.borrow_mut().clear();

    engine.set_line(HighsideR, false);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_voltage_uses_passthrough_formula() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell).with_adc(&[2047]);
    let mut engine = MeasurementEngine::new(board, &cell);

    let result = engine.voltage();
    assert_eq!(result, MeasurementResult::Voltage { volts: convert::passthrough_volts(2047) });
    assert!(engine.lines().is_asserted(MeasC));
}

#[test]
fn test_esr_filter_seeds_then_blends() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell).with_adc(&[3500, 3400]);
    let mut engine = MeasurementEngine::new(board, &cell);
    let prior = CaptureSample::from_micros(45, CONFIG.ticks_per_us());

    let v1 = convert::sense_volts(3500);
    let v2 = convert::sense_volts(3400);

    engine.inductance(prior, |_| {});
    assert_eq!(engine.esr_filter().value(), Some(v1));

    engine.inductance(prior, |_| {});
    let blended = engine.esr_filter().value().unwrap();
    assert!((blended - (v1 * 0.99 + v2 * 0.01)).abs() < 1e-6);
}

#[test]
fn test_inductance_values() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell).with_adc(&[3500]);
    let mut engine = MeasurementEngine::new(board, &cell);

    let result = engine.inductance(CaptureSample::from_micros(45, CONFIG.ticks_per_us()), |_| {});

    let volts = convert::sense_volts(3500);
    let esr = convert::esr_ohms(volts);
    let expected = MeasurementResult::Inductance {
        microhenries: convert::inductance_uh(45, esr),
        esr_ohms: esr,
        volts,
    };
    assert_eq!(result, expected);
}

#[test]
fn test_inductance_reports_before_hold() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell).with_adc(&[3500]);
    let events = board.events.clone();
    let mut engine = MeasurementEngine::new(board, &cell);
    events.borrow_mut().clear();

    let sink = events.clone();
    engine.inductance(CaptureSample::from_micros(45, CONFIG.ticks_per_us()), move |_| {
        sink.borrow_mut().push(Ev::Report);
    });

    let log = events.borrow();
    let n = log.len();
    assert_eq!(
        &log[n - 4..],
        &[
            Ev::Report,
            Ev::Line(LowsideR, false),
            Ev::Line(MeasLr, false),
            Ev::DelayMs(INDUCTANCE_HOLD_MS),
        ]
    );
    assert!(!log.contains(&Ev::Line(MeasC, true)));
    assert!(!log.contains(&Ev::Enable));
}

#[test]
fn test_capture_probe_returns_armed() {
    let cell = CaptureCell::new();
    let board = ScriptedBoard::new(&cell);
    let events = board.events.clone();
    let mut engine = MeasurementEngine::new(board, &cell);

    engine.capture_probe();

    assert_eq!(events.borrow().last(), Some(&Ev::Enable));
    assert!(engine.lines().is_asserted(HighsideR));
    assert!(engine.lines().is_asserted(Integrate));
    assert!(!engine.lines().is_asserted(LowsideR));
}

// --- Scripted board ---

#[derive(Clone, Copy, Debug, PartialEq)]
enum Ev {
    Line(ControlLine, bool),
    DelayUs(u32),
    DelayMs(u32),
    Rearm,
    Enable,
    Report,
}

/// Records every board call. Publishes one capture `edge_us` after each
/// enable, and `rearm_edge_us` once from inside the next rearm, when
/// configured.
struct ScriptedBoard<'c> {
    cell: &'c CaptureCell,
    events: Rc<RefCell<Vec<Ev>>>,
    adc: VecDeque<u16>,
    edge_us: Option<u32>,
    rearm_edge_us: Option<u32>,
    now_us: i64,
}

impl<'c> ScriptedBoard<'c> {
    fn new(cell: &'c CaptureCell) -> Self {
        Self {
            cell,
            events: Rc::new(RefCell::new(Vec::new())),
            adc: VecDeque::new(),
            edge_us: None,
            rearm_edge_us: None,
            now_us: 0,
        }
    }

    fn edge_after_us(mut self, us: u32) -> Self {
        self.edge_us = Some(us);
        self
    }

    fn edge_during_rearm_us(mut self, us: u32) -> Self {
        self.rearm_edge_us = Some(us);
        self
    }

    fn with_adc(mut self, raw: &[u16]) -> Self {
        self.adc = raw.iter().copied().collect();
        self
    }
}

impl ControlPins for ScriptedBoard<'_> {
    fn write_line(&mut self, line: ControlLine, asserted: bool) {
        self.events.borrow_mut().push(Ev::Line(line, asserted));
    }
}

impl AnalogInput for ScriptedBoard<'_> {
    fn read_raw(&mut self) -> u16 {
        self.adc.pop_front().unwrap_or(0)
    }
}

impl Timebase for ScriptedBoard<'_> {
    fn delay_us(&mut self, us: u32) {
        self.now_us += i64::from(us);
        self.events.borrow_mut().push(Ev::DelayUs(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.now_us += i64::from(ms) * 1000;
        self.events.borrow_mut().push(Ev::DelayMs(ms));
    }

    fn now_us(&self) -> i64 {
        self.now_us
    }
}

impl CaptureTimer for ScriptedBoard<'_> {
    fn rearm(&mut self) {
        if let Some(us) = self.rearm_edge_us.take() {
            self.cell.publish(us * CONFIG.ticks_per_us());
        }
        self.events.borrow_mut().push(Ev::Rearm);
    }

    fn enable(&mut self) {
        self.events.borrow_mut().push(Ev::Enable);
        if let Some(us) = self.edge_us {
            self.cell.publish(us * CONFIG.ticks_per_us());
        }
    }
}

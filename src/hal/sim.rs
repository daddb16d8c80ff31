//! Simulated board with a virtual component under test.
//!
//! Time is virtual: it only advances in [`Timebase::delay_us`]. A charge
//! transient starts at the last [`CaptureTimer::rearm`] and fires the capture
//! edge once the counter is enabled and the transient has elapsed, through
//! the same [`on_capture_edge`] handler the hardware interrupt uses.
//!
//! The component models are the measurement formulas run backwards, so a
//! simulated `Resistor { ohms: 1000.0 }` measures as 1000 ohms.

use crate::capture::{on_capture_edge, CaptureCell};
use crate::config::CONFIG;
use crate::frontend::ControlLine;
use crate::measure::convert::{
    passthrough_raw_for, sense_raw_for, AUTO_CAPACITANCE_CAL, CAPACITANCE_CAL,
    CAPACITANCE_SCALE, ESR_OFFSET_OHM, ESR_SUPPLY_V, INDUCTANCE_LONG_OFFSET_UH,
    RESISTANCE_US_PER_OHM, SENSE_R_OHM,
};

use super::{AnalogInput, CaptureTimer, ControlPins, Timebase};

use ControlLine::{HighsideR, Integrate, LowsideR, MeasC, MeasLr};

/// Sense voltage a charged capacitor holds on the MEAS_C path.
pub const CHARGED_CAP_V: f32 = 3.2;

/// Device between the probe terminals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Component {
    /// Nothing connected.
    Open,
    Resistor { ohms: f32 },
    Capacitor { microfarads: f32 },
    Inductor { microhenries: f32, esr_ohms: f32 },
}

/// Which capacitance calibration the simulated charge time follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CapacitanceModel {
    /// Matches the `capacitance` command.
    #[default]
    Command,
    /// Matches the auto-detect capacitor branch.
    Auto,
}

/// Host-side board.
pub struct SimBoard<'c> {
    capture: &'c CaptureCell,
    component: Component,
    cap_model: CapacitanceModel,
    /// Voltage on the pass-through input.
    input_volts: f32,
    /// Raw pin levels, bit n = `ControlLine` n.
    pins: u8,
    now_us: i64,
    armed_at_us: i64,
    counting: bool,
    fired: bool,
    interlock_violated: bool,
}

impl<'c> SimBoard<'c> {
    pub fn new(capture: &'c CaptureCell, component: Component) -> Self {
        Self {
            capture,
            component,
            cap_model: CapacitanceModel::Command,
            input_volts: 0.0,
            pins: 0,
            now_us: 0,
            armed_at_us: 0,
            counting: false,
            fired: false,
            interlock_violated: false,
        }
    }

    pub fn with_input_volts(mut self, volts: f32) -> Self {
        self.input_volts = volts;
        self
    }

    pub fn with_capacitance_model(mut self, model: CapacitanceModel) -> Self {
        self.cap_model = model;
        self
    }

    /// Swap the component between measurements.
    pub fn set_component(&mut self, component: Component) {
        self.component = component;
    }

    pub fn is_asserted(&self, line: ControlLine) -> bool {
        self.pins & (1 << line as u8) != 0
    }

    /// True if MEAS_C and MEAS_LR were ever driven high together.
    pub fn interlock_violated(&self) -> bool {
        self.interlock_violated
    }

    /// Charge transient for the current pin levels, in microseconds, or
    /// `None` when the comparator never trips.
    fn transient_us(&self) -> Option<f32> {
        let on = |line| self.is_asserted(line);
        if on(LowsideR) {
            return None;
        }

        if on(MeasC) && on(HighsideR) {
            return match self.component {
                Component::Capacitor { microfarads } => {
                    let cal = match self.cap_model {
                        CapacitanceModel::Command => CAPACITANCE_CAL,
                        CapacitanceModel::Auto => AUTO_CAPACITANCE_CAL,
                    };
                    Some(microfarads * cal * CAPACITANCE_SCALE)
                }
                _ => None,
            };
        }

        if on(Integrate) && (on(MeasLr) || on(HighsideR)) {
            return match self.component {
                Component::Resistor { ohms } => Some(ohms * RESISTANCE_US_PER_OHM),
                Component::Inductor { microhenries, esr_ohms } => {
                    if on(MeasLr) {
                        Some(esr_ohms * RESISTANCE_US_PER_OHM)
                    } else {
                        Some(
                            (microhenries + INDUCTANCE_LONG_OFFSET_UH) * RESISTANCE_US_PER_OHM
                                / (SENSE_R_OHM + esr_ohms),
                        )
                    }
                }
                _ => None,
            };
        }
        None
    }

    /// Voltage the ADC sees, and whether it goes through the pass-through
    /// divider.
    fn sense_node(&self) -> (f32, bool) {
        let on = |line| self.is_asserted(line);
        if on(MeasC) && !on(HighsideR) && !on(LowsideR) {
            return (self.input_volts, true);
        }
        if on(MeasC) && on(HighsideR) {
            let volts = match self.component {
                Component::Capacitor { .. } | Component::Open => CHARGED_CAP_V,
                _ => 0.5,
            };
            return (volts, false);
        }
        if on(MeasLr) && on(LowsideR) {
            let dc_ohms = match self.component {
                Component::Resistor { ohms } => Some(ohms),
                Component::Inductor { esr_ohms, .. } => Some(esr_ohms),
                _ => None,
            };
            let volts = dc_ohms.map_or(0.0, |r| SENSE_R_OHM * ESR_SUPPLY_V / (r + ESR_OFFSET_OHM));
            return (volts, false);
        }
        (0.0, false)
    }

    fn poll_capture(&mut self, until_us: i64) {
        if !self.counting || self.fired {
            return;
        }
        let Some(t) = self.transient_us() else {
            return;
        };
        let micros = (t + 0.5) as u32;
        let edge_at = (self.armed_at_us + i64::from(micros)).max(self.now_us);
        if edge_at <= until_us {
            self.now_us = edge_at;
            self.fired = true;
            let ticks = micros.saturating_mul(CONFIG.ticks_per_us());
            on_capture_edge(self.capture, ticks, edge_at);
        }
    }
}

impl ControlPins for SimBoard<'_> {
    fn write_line(&mut self, line: ControlLine, asserted: bool) {
        if asserted {
            self.pins |= 1 << line as u8;
        } else {
            self.pins &= !(1 << line as u8);
        }
        if self.is_asserted(MeasC) && self.is_asserted(MeasLr) {
            self.interlock_violated = true;
        }
    }
}

impl AnalogInput for SimBoard<'_> {
    fn read_raw(&mut self) -> u16 {
        match self.sense_node() {
            (volts, true) => passthrough_raw_for(volts),
            (volts, false) => sense_raw_for(volts),
        }
    }
}

impl Timebase for SimBoard<'_> {
    fn delay_us(&mut self, us: u32) {
        let until = self.now_us + i64::from(us);
        self.poll_capture(until);
        self.now_us = until;
    }

    fn now_us(&self) -> i64 {
        self.now_us
    }
}

impl CaptureTimer for SimBoard<'_> {
    fn rearm(&mut self) {
        self.armed_at_us = self.now_us;
        self.counting = false;
        self.fired = false;
    }

    fn enable(&mut self) {
        self.counting = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_edge_after_rearm() {
        let cell = CaptureCell::new();
        let mut board = SimBoard::new(&cell, Component::Resistor { ohms: 1000.0 });
        board.write_line(Integrate, true);
        board.write_line(MeasLr, true);
        board.rearm();
        board.enable();
        board.delay_us(1000);
        assert_eq!(cell.latest(), None);
        board.delay_us(1000);
        let sample = cell.latest().unwrap();
        assert_eq!(sample.micros(CONFIG.ticks_per_us()), 1299);
    }

    #[test]
    fn test_no_edge_without_enable() {
        let cell = CaptureCell::new();
        let mut board = SimBoard::new(&cell, Component::Resistor { ohms: 10.0 });
        board.write_line(Integrate, true);
        board.write_line(MeasLr, true);
        board.rearm();
        board.delay_ms(10);
        assert_eq!(cell.latest(), None);
    }

    #[test]
    fn test_interlock_violation_recorded() {
        let cell = CaptureCell::new();
        let mut board = SimBoard::new(&cell, Component::Open);
        board.write_line(MeasC, true);
        assert!(!board.interlock_violated());
        board.write_line(MeasLr, true);
        assert!(board.interlock_violated());
    }
}

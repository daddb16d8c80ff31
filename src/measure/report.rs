//! Operator-facing result text.
//!
//! Line layouts are part of the serial protocol; front-end scripts parse
//! them, so spacing and precision stay exactly as they are.

use core::fmt::Write;

use super::engine::MeasurementResult;

pub fn voltage(out: &mut dyn Write, volts: f32) {
    let _ = write!(out, "\r\nVoltage: {:3.1} Volts\r\n", volts);
}

pub fn resistance(out: &mut dyn Write, ohms: f32) {
    let _ = write!(out, "\r\nResistance: {:.2}  Ohm\r\n", ohms);
}

pub fn capacitance(out: &mut dyn Write, microfarads: f32) {
    let _ = write!(out, "\r\nCapacitance: {:.2}  microF\r\n", microfarads);
}

/// Three lines: instantaneous voltage, ESR, inductance.
pub fn inductance(out: &mut dyn Write, volts: f32, esr_ohms: f32, microhenries: f32) {
    let _ = write!(out, "Voltage: {:.6} Volts\r\n", volts);
    let _ = write!(out, "ESR: {:7.6}\r\n", esr_ohms);
    let _ = write!(out, "L: {:7.6} uH\r\n", microhenries);
}

/// Auto-detect capacitor branch.
pub fn auto_capacitance(out: &mut dyn Write, microfarads: f32) {
    let _ = write!(out, "Capacitance: {:.6} uF\r\n", microfarads);
}

/// Auto-detect resistor branch: whole ohms, right-aligned in 7 columns.
pub fn auto_resistance(out: &mut dyn Write, ohms: u32) {
    let _ = write!(out, "Resistance: {:7} Ohms\r\n", ohms);
}

/// Report any result in the layout of its dedicated command.
pub fn result(out: &mut dyn Write, result: &MeasurementResult) {
    match *result {
        MeasurementResult::Voltage { volts } => voltage(out, volts),
        MeasurementResult::Resistance { ohms } => resistance(out, ohms),
        MeasurementResult::Capacitance { microfarads } => capacitance(out, microfarads),
        MeasurementResult::Inductance { microhenries, esr_ohms, volts } => {
            inductance(out, volts, esr_ohms, microhenries)
        }
    }
}

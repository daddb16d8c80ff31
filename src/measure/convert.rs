//! Empirical conversion formulas.
//!
//! Every constant here is a hardware calibration of the reference front end.
//! They are kept exactly as measured; none of them is derived from the
//! others and none may be "simplified".

/// ADC full-scale count (12-bit).
pub const ADC_FULL_SCALE: f32 = 4096.0;

/// ADC reference voltage.
pub const ADC_REF_V: f32 = 3.3;

/// Sense-node offset removed from every offset-corrected sample
/// (0.02 V comparator offset + 0.05 V switch drop).
pub const ADC_OFFSET_V: f32 = 0.07;

/// Full-scale span of the pass-through `voltage` input divider.
pub const PASSTHROUGH_SPAN_V: f32 = 10.45;

/// Resistance time constant: microseconds of integration per ohm.
pub const RESISTANCE_US_PER_OHM: f32 = 1.299;

/// Capacitance command calibration.
pub const CAPACITANCE_CAL: f32 = 1.29;

/// Auto-detect capacitor branch uses the resistance constant instead.
pub const AUTO_CAPACITANCE_CAL: f32 = 1.299;

/// Charge time per microfarad through the 100 kOhm charge resistor, before calibration.
pub const CAPACITANCE_SCALE: f32 = 100_000.0;

/// Sense resistor in the inductor path.
pub const SENSE_R_OHM: f32 = 33.0;

/// Supply rail plus diode correction used by the ESR estimate.
pub const ESR_SUPPLY_V: f32 = 3.3 + 0.034;

/// Fixed resistance removed from the ESR estimate (33 sense + 2 wiring).
pub const ESR_OFFSET_OHM: f32 = 35.0;

/// Elapsed-time boundary between the two inductance offsets.
pub const INDUCTANCE_SHORT_US: u32 = 10;

/// Inductance offset for short transients.
pub const INDUCTANCE_SHORT_OFFSET_UH: f32 = 10.0;

/// Inductance offset for everything else.
pub const INDUCTANCE_LONG_OFFSET_UH: f32 = 320.0;

/// Auto-detect: capacitor probe voltage at or above this is a capacitor.
pub const CAPACITOR_THRESHOLD_V: f32 = 2.2;

/// Auto-detect: inductor probe voltage at or above this is an inductor.
pub const INDUCTOR_THRESHOLD_V: f32 = 2.4;

/// Offset-corrected sense voltage: `raw/4096*3.3 - 0.07`.
#[inline]
pub fn sense_volts(raw: u16) -> f32 {
    (raw as f32 / ADC_FULL_SCALE) * ADC_REF_V - ADC_OFFSET_V
}

/// Pass-through input voltage: `(10.45/2)*(raw+0.5)/4096`.
///
/// Only the `voltage` command uses this scale. It is not equivalent to
/// [`sense_volts`].
#[inline]
pub fn passthrough_volts(raw: u16) -> f32 {
    (PASSTHROUGH_SPAN_V / 2.0) * (raw as f32 + 0.5) / ADC_FULL_SCALE
}

/// Ohms from the integration time.
#[inline]
pub fn resistance_ohms(t_us: u32) -> f32 {
    t_us as f32 / RESISTANCE_US_PER_OHM
}

/// Microfarads from the charge time (capacitance command).
#[inline]
pub fn capacitance_uf(t_us: u32) -> f32 {
    t_us as f32 / (CAPACITANCE_SCALE * CAPACITANCE_CAL)
}

/// Microfarads from the charge time (auto-detect capacitor branch).
#[inline]
pub fn auto_capacitance_uf(t_us: u32) -> f32 {
    t_us as f32 / (AUTO_CAPACITANCE_CAL * CAPACITANCE_SCALE)
}

/// Equivalent series resistance from the filtered sense voltage.
#[inline]
pub fn esr_ohms(filtered_volts: f32) -> f32 {
    SENSE_R_OHM * ESR_SUPPLY_V / filtered_volts - ESR_OFFSET_OHM
}

/// Microhenries from the prior capture and the ESR estimate.
#[inline]
pub fn inductance_uh(t_us: u32, esr_ohms: f32) -> f32 {
    let scaled = t_us as f32 * (SENSE_R_OHM + esr_ohms) / RESISTANCE_US_PER_OHM;
    if t_us < INDUCTANCE_SHORT_US {
        scaled - INDUCTANCE_SHORT_OFFSET_UH
    } else {
        scaled - INDUCTANCE_LONG_OFFSET_UH
    }
}

/// Raw ADC count that [`sense_volts`] maps closest to `volts`. Inverse used
/// by the simulated board.
pub fn sense_raw_for(volts: f32) -> u16 {
    let raw = (volts + ADC_OFFSET_V) / ADC_REF_V * ADC_FULL_SCALE;
    clamp_raw(raw)
}

/// Raw ADC count that [`passthrough_volts`] maps closest to `volts`.
pub fn passthrough_raw_for(volts: f32) -> u16 {
    let raw = volts * ADC_FULL_SCALE / (PASSTHROUGH_SPAN_V / 2.0) - 0.5;
    clamp_raw(raw)
}

fn clamp_raw(raw: f32) -> u16 {
    if raw <= 0.0 {
        0
    } else if raw >= ADC_FULL_SCALE - 1.0 {
        (ADC_FULL_SCALE as u16) - 1
    } else {
        // round half up without libm
        (raw + 0.5) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn test_resistance_reference_point() {
        assert!(close(resistance_ohms(1299), 1000.0, 0.01));
        assert_eq!(format!("{:.2}", resistance_ohms(1299)), "1000.00");
    }

    #[test]
    fn test_capacitance_reference_point() {
        assert!(close(capacitance_uf(129_000), 1.0, 1e-5));
        assert_eq!(format!("{:.2}", capacitance_uf(129_000)), "1.00");
    }

    #[test]
    fn test_auto_capacitance_uses_its_own_constant() {
        assert!(close(auto_capacitance_uf(129_900), 1.0, 1e-5));
        assert!(!close(auto_capacitance_uf(129_000), capacitance_uf(129_000), 1e-4));
    }

    #[test]
    fn test_sense_volts() {
        assert!(close(sense_volts(0), -0.07, 1e-6));
        assert!(close(sense_volts(2048), 1.58, 1e-5));
    }

    #[test]
    fn test_passthrough_volts_differs_from_sense() {
        assert!(close(passthrough_volts(0), 5.225 * 0.5 / 4096.0, 1e-7));
        assert!(close(passthrough_volts(4095), 5.225 * 4095.5 / 4096.0, 1e-5));
        assert!(!close(passthrough_volts(2048), sense_volts(2048), 0.1));
    }

    #[test]
    fn test_esr() {
        // 33 * 3.334 / 3.0 - 35 = 1.674
        assert!(close(esr_ohms(3.0), 1.674, 1e-4));
    }

    #[test]
    fn test_inductance_offsets() {
        // short transient: t*(33+esr)/1.299 - 10
        assert!(close(inductance_uh(5, 0.0), 5.0 * 33.0 / 1.299 - 10.0, 1e-3));
        // boundary at 10 takes the long offset
        assert!(close(inductance_uh(10, 0.0), 10.0 * 33.0 / 1.299 - 320.0, 1e-3));
        assert!(close(inductance_uh(100, 2.0), 100.0 * 35.0 / 1.299 - 320.0, 1e-2));
    }

    #[test]
    fn test_inverse_helpers() {
        let raw = sense_raw_for(2.5);
        assert!(close(sense_volts(raw), 2.5, 0.001));

        let raw = passthrough_raw_for(1.2);
        assert!(close(passthrough_volts(raw), 1.2, 0.002));

        assert_eq!(sense_raw_for(-1.0), 0);
        assert_eq!(sense_raw_for(10.0), 4095);
    }
}

//! Module: frontend
//!
//! Purpose: Model of the five analog front-end control lines.
//!
//! Architecture:
//! - `ControlLine`: the named lines, resolvable from operator text
//! - `FrontEndState`: one bit per line, copyable snapshot
//! - Interlock: MEAS_C and MEAS_LR are never asserted together. Asserting
//!   one through [`FrontEndState::with`] de-asserts the other.
//! - [`FrontEndState::transition`] orders line writes break-before-make so
//!   no contradictory combination appears on the pins even transiently.
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

use core::fmt;

/// A front-end control line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlLine {
    /// Integrator enable (resistance path).
    Integrate = 0,
    /// Low-side discharge switch.
    LowsideR = 1,
    /// High-side charge switch.
    HighsideR = 2,
    /// Capacitance measurement path.
    MeasC = 3,
    /// Inductance/resistance measurement path.
    MeasLr = 4,
}

impl ControlLine {
    /// All lines in write order.
    pub const ALL: [ControlLine; 5] = [
        ControlLine::Integrate,
        ControlLine::LowsideR,
        ControlLine::HighsideR,
        ControlLine::MeasC,
        ControlLine::MeasLr,
    ];

    /// Operator-facing name.
    pub const fn name(self) -> &'static str {
        match self {
            ControlLine::Integrate => "INTEGRATE",
            ControlLine::LowsideR => "LOWSIDE_R",
            ControlLine::HighsideR => "HIGHSIDE_R",
            ControlLine::MeasC => "MEAS_C",
            ControlLine::MeasLr => "MEAS_LR",
        }
    }

    /// Resolve a name case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|line| line.name().eq_ignore_ascii_case(name))
    }

    /// The line this one may never be asserted together with.
    pub const fn interlocked_with(self) -> Option<ControlLine> {
        match self {
            ControlLine::MeasC => Some(ControlLine::MeasLr),
            ControlLine::MeasLr => Some(ControlLine::MeasC),
            _ => None,
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Levels of all five control lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrontEndState {
    bits: u8,
}

/// One pin write produced by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineWrite {
    pub line: ControlLine,
    pub asserted: bool,
}

impl FrontEndState {
    /// Everything de-asserted (power-on state).
    pub const IDLE: Self = Self { bits: 0 };

    #[inline]
    pub const fn is_asserted(self, line: ControlLine) -> bool {
        self.bits & line.bit() != 0
    }

    /// Copy with `line` set to `asserted`, honoring the MEAS_C/MEAS_LR
    /// interlock.
    #[must_use]
    pub fn with(self, line: ControlLine, asserted: bool) -> Self {
        let mut bits = self.bits;
        if asserted {
            bits |= line.bit();
            if let Some(other) = line.interlocked_with() {
                bits &= !other.bit();
            }
        } else {
            bits &= !line.bit();
        }
        Self { bits }
    }

    /// Apply a list of line settings in order.
    #[must_use]
    pub fn with_all(self, settings: &[(ControlLine, bool)]) -> Self {
        settings
            .iter()
            .fold(self, |state, &(line, asserted)| state.with(line, asserted))
    }

    /// True if no contradictory combination is asserted.
    pub const fn is_valid(self) -> bool {
        !(self.is_asserted(ControlLine::MeasC) && self.is_asserted(ControlLine::MeasLr))
    }

    /// Pin writes that take `self` to `target`: de-assertions first, then
    /// assertions. At most five writes.
    pub fn transition(self, target: FrontEndState) -> impl Iterator<Item = LineWrite> {
        let from = self;
        let releases = ControlLine::ALL.into_iter().filter(move |&line| {
            from.is_asserted(line) && !target.is_asserted(line)
        });
        let asserts = ControlLine::ALL.into_iter().filter(move |&line| {
            !from.is_asserted(line) && target.is_asserted(line)
        });
        releases
            .map(|line| LineWrite { line, asserted: false })
            .chain(asserts.map(|line| LineWrite { line, asserted: true }))
    }

    /// Raw bit pattern, bit n = `ControlLine` n.
    pub const fn bits(self) -> u8 {
        self.bits
    }
}

impl fmt::Display for FrontEndState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for line in ControlLine::ALL {
            if self.is_asserted(line) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(line.name())?;
                first = false;
            }
        }
        if first {
            f.write_str("idle")?;
        }
        Ok(())
    }
}

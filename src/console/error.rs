//! Console error types

use crate::measure::MeasureError;

/// Console error, reported to the operator as its message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleError {
    /// No command matched the line
    UnknownCommand,
    /// Capture window closed without an edge
    NoCapture,
    /// Inductance requested before any capture
    NoPriorCapture,
}

impl ConsoleError {
    /// Operator-facing text, written between CRLFs.
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "Enter the correct string",
            Self::NoCapture => "No capture edge detected",
            Self::NoPriorCapture => "No capture recorded, run 'test' first",
        }
    }
}

impl From<MeasureError> for ConsoleError {
    fn from(err: MeasureError) -> Self {
        match err {
            MeasureError::NoCapture => Self::NoCapture,
            MeasureError::NoPriorCapture => Self::NoPriorCapture,
        }
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

//! Measurement engine and auto-detection.
//!
//! - `convert`: calibration constants and conversion formulas
//! - `esr`: sense-voltage filter for the ESR estimate
//! - `engine`: front-end sequencing for each measurement
//! - `auto`: component classification
//! - `report`: result text

pub mod auto;
pub mod convert;
pub mod engine;
pub mod esr;
pub mod report;

pub use auto::{auto_detect, ComponentKind, Detection};
pub use engine::{MeasureError, MeasurementEngine, MeasurementResult};
pub use esr::EsrFilter;

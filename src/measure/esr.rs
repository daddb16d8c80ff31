//! Exponential moving average of the inductor sense voltage.

/// Weight of the previous filtered value.
pub const ESR_FILTER_ALPHA: f32 = 0.99;

/// First-order IIR filter, `y = y*0.99 + x*0.01`, seeded by its first input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EsrFilter {
    value: Option<f32>,
}

impl EsrFilter {
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Feed one sample and return the filtered value.
    ///
    /// The very first update returns `volts` unchanged.
    pub fn update(&mut self, volts: f32) -> f32 {
        let next = match self.value {
            None => volts,
            Some(prev) => prev * ESR_FILTER_ALPHA + volts * (1.0 - ESR_FILTER_ALPHA),
        };
        self.value = Some(next);
        next
    }

    /// Filtered value, `None` until the first update.
    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn is_seeded(&self) -> bool {
        self.value.is_some()
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

use std::f64::consts::PI;
/// Incremental unweighted mean.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningAverage {
    value: f64,
    count: u32,
}
impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.count = 0;
    }
    pub fn update(&mut self, sample: f64) {
        let count = f64::from(self.count);
        self.value = (count * self.value + sample) / (count + 1.0);
        self.count += 1;
    }
    pub fn value(&self) -> f64 {
        self.value
    }
    pub fn count(&self) -> u32 {
        self.count
    }
}
/// First order lowpass filter with a fixed time step.
///
/// The cutoff frequency is stored as the smoothing coefficient
/// `alpha = 2π·dt·fc / (2π·dt·fc + 1)` and converted back on read.
#[derive(Clone, Copy, Debug)]
pub struct LowpassFilter {
    dt: f64,
    alpha: f64,
    value: f64,
}
impl LowpassFilter {
    pub fn new(cutoff_hz: f64, initial: f64, dt: f64) -> Self {
        let mut filter = Self {
            dt,
            alpha: 0.0,
            value: initial,
        };
        filter.set_cutoff_hz(cutoff_hz);
        filter
    }
    pub fn cutoff_hz(&self) -> f64 {
        self.alpha / ((1.0 - self.alpha) * 2.0 * PI * self.dt)
    }
    pub fn set_cutoff_hz(&mut self, cutoff_hz: f64) {
        let w = 2.0 * PI * self.dt * cutoff_hz;
        self.alpha = w / (w + 1.0);
    }
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
    pub fn value(&self) -> f64 {
        self.value
    }
    pub fn update(&mut self, sample: f64) -> f64 {
        self.value = self.alpha * sample + (1.0 - self.alpha) * self.value;
        self.value
    }
}

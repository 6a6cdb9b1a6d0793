// src/battery.rs
use crate::drivers::{code_to_volts, AnalogInput, LowpassFilter};
use log::warn;
/// Raw readings thrown away before the filter is seeded; the first few come back low.
pub const VOLT_NUM_INIT: usize = 5;
pub const FREQ_CUTOFF_HZ: f64 = 0.02;
/// Lipo battery monitor. The battery is read through a 2:1 divider.
///
/// `update` must be called once per loop period; the lowpass value is meant
/// for display and does not jump around like the raw reading.
pub struct BatteryMonitor {
    input: Box<dyn AnalogInput>,
    dt: f64,
    cutoff_hz: f64,
    lowpass: Option<LowpassFilter>,
}
impl BatteryMonitor {
    pub fn new(input: Box<dyn AnalogInput>, dt: f64) -> Self {
        Self::with_cutoff(input, dt, FREQ_CUTOFF_HZ)
    }
    pub fn with_cutoff(input: Box<dyn AnalogInput>, dt: f64, cutoff_hz: f64) -> Self {
        Self {
            input,
            dt,
            cutoff_hz,
            lowpass: None,
        }
    }
    pub fn update(&mut self) {
        if let Some(filter) = &mut self.lowpass {
            if let Some(v) = read_raw(self.input.as_mut()) {
                filter.update(v);
            }
            return;
        }
        for _ in 0..VOLT_NUM_INIT {
            let _ = read_raw(self.input.as_mut());
        }
        if let Some(seed) = read_raw(self.input.as_mut()) {
            self.lowpass = Some(LowpassFilter::new(self.cutoff_hz, seed, self.dt));
        }
    }
    pub fn voltage_raw(&mut self) -> Option<f64> {
        read_raw(self.input.as_mut())
    }
    /// Filtered voltage, `0.0` until the first successful update.
    pub fn voltage_lowpass(&self) -> f64 {
        self.lowpass.map(|f| f.value()).unwrap_or(0.0)
    }
}
fn read_raw(input: &mut dyn AnalogInput) -> Option<f64> {
    match input.read_code() {
        Ok(code) => Some(2.0 * code_to_volts(code, input.reference_voltage())),
        Err(err) => {
            warn!("battery read failed: {err}");
            None
        }
    }
}

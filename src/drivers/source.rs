use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use crate::drivers::units::volts_to_code;
use crate::drivers::PstatError;
/// Analog input pin returning raw 16-bit codes.
pub trait AnalogInput {
    fn read_code(&mut self) -> Result<u16, PstatError>;
    /// Full-scale voltage of the converter, i.e. the board supply.
    fn reference_voltage(&self) -> f64;
}
/// Analog output pin accepting raw 16-bit codes.
pub trait AnalogOutput {
    fn write_code(&mut self, code: u16) -> Result<(), PstatError>;
}
/// Digital output pin. `true` is a high level.
pub trait DigitalOutput {
    fn set_level(&mut self, high: bool);
    fn level(&self) -> bool;
}
/// Temperature probe that converts asynchronously (one-wire style).
pub trait TemperatureProbe {
    /// Select the conversion resolution in bits (9 to 12). Finer is slower.
    fn set_resolution(&mut self, bits: u8) -> Result<(), PstatError>;
    /// Kick off a conversion and return how long it takes.
    fn start_conversion(&mut self) -> Result<Duration, PstatError>;
    fn read_celsius(&mut self) -> Result<f64, PstatError>;
}
/// Input whose voltage is produced by a closure; used for tests and the host simulator.
pub struct SimAnalogIn {
    reference_voltage: f64,
    volts: Box<dyn FnMut() -> f64>,
}
impl SimAnalogIn {
    pub fn new(reference_voltage: f64, volts: impl FnMut() -> f64 + 'static) -> Self {
        Self {
            reference_voltage,
            volts: Box::new(volts),
        }
    }
    /// Input that follows a shared voltage level.
    pub fn following(reference_voltage: f64, level: Rc<Cell<f64>>) -> Self {
        Self::new(reference_voltage, move || level.get())
    }
}
impl AnalogInput for SimAnalogIn {
    fn read_code(&mut self) -> Result<u16, PstatError> {
        Ok(volts_to_code((self.volts)(), self.reference_voltage))
    }
    fn reference_voltage(&self) -> f64 {
        self.reference_voltage
    }
}
/// Output that publishes the last written code through a shared cell.
#[derive(Clone, Default)]
pub struct SimAnalogOut {
    code: Rc<Cell<u16>>,
}
impl SimAnalogOut {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn code(&self) -> u16 {
        self.code.get()
    }
}
impl AnalogOutput for SimAnalogOut {
    fn write_code(&mut self, code: u16) -> Result<(), PstatError> {
        self.code.set(code);
        Ok(())
    }
}
#[derive(Clone, Default)]
pub struct SimDigitalOut {
    high: Rc<Cell<bool>>,
}
impl SimDigitalOut {
    pub fn new() -> Self {
        Self::default()
    }
}
impl DigitalOutput for SimDigitalOut {
    fn set_level(&mut self, high: bool) {
        self.high.set(high);
    }
    fn level(&self) -> bool {
        self.high.get()
    }
}
/// Probe that replays queued readings, then holds the last one.
///
/// `conversion` is the 12-bit conversion time; each bit less halves it.
pub struct ManualProbe {
    readings: VecDeque<f64>,
    last: f64,
    conversion: Duration,
    resolution: u8,
}
impl ManualProbe {
    pub fn new(conversion: Duration, readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            last: 0.0,
            conversion,
            resolution: MAX_RESOLUTION,
        }
    }
    pub fn resolution(&self) -> u8 {
        self.resolution
    }
}
const MIN_RESOLUTION: u8 = 9;
const MAX_RESOLUTION: u8 = 12;
impl TemperatureProbe for ManualProbe {
    fn set_resolution(&mut self, bits: u8) -> Result<(), PstatError> {
        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&bits) {
            return Err(PstatError::Hardware(format!("unsupported probe resolution {bits}")));
        }
        self.resolution = bits;
        Ok(())
    }
    fn start_conversion(&mut self) -> Result<Duration, PstatError> {
        Ok(self.conversion / (1 << (MAX_RESOLUTION - self.resolution)))
    }
    fn read_celsius(&mut self) -> Result<f64, PstatError> {
        if let Some(next) = self.readings.pop_front() {
            self.last = next;
        }
        Ok(self.last)
    }
}

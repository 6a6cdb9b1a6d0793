// src/potentiostat.rs
use crate::drivers::{
    code_to_volts, volts_to_code, AnalogInput, AnalogOutput, DigitalOutput, PstatError,
};
use log::warn;
use std::fmt;
use std::str::FromStr;
pub const DEFAULT_NUM_AVG: usize = 15;
/// Full-scale current range, selected by the transimpedance amplifier resistor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CurrentRange {
    Range1uA,
    Range10uA,
    Range100uA,
    Range1000uA,
}
impl CurrentRange {
    pub const ALL: [CurrentRange; 4] = [
        CurrentRange::Range1uA,
        CurrentRange::Range10uA,
        CurrentRange::Range100uA,
        CurrentRange::Range1000uA,
    ];
    pub fn tia_resistor_ohms(self) -> f64 {
        match self {
            CurrentRange::Range1uA => 1_650_000.0,
            CurrentRange::Range10uA => 165_000.0,
            CurrentRange::Range100uA => 16_500.0,
            CurrentRange::Range1000uA => 1_650.0,
        }
    }
    pub fn from_tia_resistor(ohms: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|range| range.tia_resistor_ohms() == ohms)
    }
    pub fn label(self) -> &'static str {
        match self {
            CurrentRange::Range1uA => "1uA",
            CurrentRange::Range10uA => "10uA",
            CurrentRange::Range100uA => "100uA",
            CurrentRange::Range1000uA => "1000uA",
        }
    }
}
impl FromStr for CurrentRange {
    type Err = PstatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|range| range.label() == s)
            .ok_or_else(|| PstatError::InvalidRange(s.to_owned()))
    }
}
impl fmt::Display for CurrentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
/// Hardware handles owned by the potentiostat.
pub struct PotentiostatPins {
    pub setpoint_out: Box<dyn AnalogOutput>,
    pub tia_in: Box<dyn AnalogInput>,
    pub ref_in: Box<dyn AnalogInput>,
    pub counter_switch: Box<dyn DigitalOutput>,
}
/// Single working electrode potentiostat.
///
/// The set-point output and both inputs are referenced to a virtual ground
/// at half the supply voltage. The counter electrode switch is active low:
/// a low level closes it and connects the cell.
pub struct Potentiostat {
    pins: PotentiostatPins,
    range: CurrentRange,
    num_avg: usize,
    vpow: f64,
    vgnd: f64,
    offset: f64,
    voltage: f64,
    last_tia_volts: f64,
    last_ref_volts: f64,
}
impl Potentiostat {
    pub fn new(
        pins: PotentiostatPins,
        range: CurrentRange,
        num_avg: usize,
    ) -> Result<Self, PstatError> {
        if num_avg == 0 {
            return Err(PstatError::ZeroAveraging);
        }
        let vpow = pins.tia_in.reference_voltage();
        let mut pstat = Self {
            pins,
            range,
            num_avg,
            vpow,
            vgnd: 0.5 * vpow,
            offset: 0.0,
            voltage: 0.0,
            last_tia_volts: 0.0,
            last_ref_volts: 0.0,
        };
        pstat.set_connected(false);
        pstat.set_voltage(0.0)?;
        Ok(pstat)
    }
    pub fn current_range(&self) -> CurrentRange {
        self.range
    }
    pub fn set_current_range(&mut self, label: &str) -> Result<(), PstatError> {
        self.range = label.parse()?;
        Ok(())
    }
    pub fn tia_resistor_ohms(&self) -> f64 {
        self.range.tia_resistor_ohms()
    }
    pub fn averaging(&self) -> usize {
        self.num_avg
    }
    pub fn set_averaging(&mut self, num_avg: usize) -> Result<(), PstatError> {
        if num_avg == 0 {
            return Err(PstatError::ZeroAveraging);
        }
        self.num_avg = num_avg;
        Ok(())
    }
    pub fn offset(&self) -> f64 {
        self.offset
    }
    /// Calibration offset added to every set-point write. Takes effect on the next write.
    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }
    pub fn connected(&self) -> bool {
        !self.pins.counter_switch.level()
    }
    pub fn set_connected(&mut self, connected: bool) {
        self.pins.counter_switch.set_level(!connected);
    }
    /// Last set-point written, exactly as given.
    pub fn voltage(&self) -> f64 {
        self.voltage
    }
    pub fn set_voltage(&mut self, volts: f64) -> Result<(), PstatError> {
        let shifted = self.vgnd + volts + self.offset;
        let code = volts_to_code(shifted, self.vpow);
        self.pins.setpoint_out.write_code(code)?;
        self.voltage = volts;
        Ok(())
    }
    /// Working electrode current in amps.
    pub fn read_current(&mut self) -> f64 {
        self.tia_voltage() / self.tia_resistor_ohms()
    }
    pub fn tia_voltage(&mut self) -> f64 {
        let volts = average_volts(self.pins.tia_in.as_mut(), self.num_avg, self.vgnd);
        match volts {
            Some(v) => self.last_tia_volts = v,
            None => warn!("TIA input unreadable, holding {:.4} V", self.last_tia_volts),
        }
        self.last_tia_volts
    }
    pub fn read_reference_voltage(&mut self) -> f64 {
        let volts = average_volts(self.pins.ref_in.as_mut(), self.num_avg, self.vgnd);
        match volts {
            Some(v) => self.last_ref_volts = v,
            None => warn!("reference input unreadable, holding {:.4} V", self.last_ref_volts),
        }
        self.last_ref_volts
    }
}
/// Mean of `num` readings relative to `vgnd`. Failed reads are skipped;
/// `None` when every read failed.
fn average_volts(input: &mut dyn AnalogInput, num: usize, vgnd: f64) -> Option<f64> {
    let vref = input.reference_voltage();
    let mut sum = 0.0;
    let mut good = 0usize;
    for _ in 0..num {
        match input.read_code() {
            Ok(code) => {
                sum += code_to_volts(code, vref) - vgnd;
                good += 1;
            }
            Err(err) => warn!("analog read failed: {err}"),
        }
    }
    (good > 0).then(|| sum / good as f64)
}

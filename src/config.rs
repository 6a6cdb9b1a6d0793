// src/config.rs
use crate::drivers::PstatError;
use crate::potentiostat::{CurrentRange, DEFAULT_NUM_AVG};
use crate::types::Action;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
/// Everything fixed at start-up. Missing JSON fields fall back to the firmware defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_setpoint: f64,
    pub setpoint_step: f64,
    pub setpoint_min: f64,
    pub setpoint_max: f64,
    /// Calibration offset added to every set-point write (volts).
    pub setpoint_offset: f64,
    pub current_range: String,
    pub num_avg: usize,
    /// Main loop period (seconds); also the battery filter time step.
    pub loop_dt: f64,
    pub battery_cutoff_hz: f64,
    pub temperature: TemperatureConfig,
    pub logger: LoggerConfig,
    pub keys: BTreeMap<u8, Action>,
    /// File written by the boot stage; contains `read-only` when storage is locked.
    pub boot_status_file: PathBuf,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    pub enabled: bool,
    /// Probe resolution in bits (9 to 12).
    pub resolution: u8,
    /// Averaging windows as `(t_start, t_stop)` in seconds since run start.
    pub schedule: Vec<(f64, f64)>,
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub data_dir: PathBuf,
    pub data_prefix: String,
    pub temp_prefix: String,
    /// Append the temperature as a fourth column of the data file.
    pub temp_in_data_file: bool,
}
impl Default for AppConfig {
    fn default() -> Self {
        let keys = BTreeMap::from([
            (1, Action::ClearFiles),
            (2, Action::Start),
            (3, Action::Stop),
            (5, Action::SetpointDecr),
            (6, Action::SetpointIncr),
        ]);
        Self {
            default_setpoint: 0.5,
            setpoint_step: 0.05,
            setpoint_min: -1.6,
            setpoint_max: 1.6,
            setpoint_offset: 0.0,
            current_range: CurrentRange::Range100uA.label().to_owned(),
            num_avg: DEFAULT_NUM_AVG,
            loop_dt: 0.1,
            battery_cutoff_hz: crate::battery::FREQ_CUTOFF_HZ,
            temperature: TemperatureConfig::default(),
            logger: LoggerConfig::default(),
            keys,
            boot_status_file: PathBuf::from("boot_out.txt"),
        }
    }
}
impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            resolution: 12,
            schedule: vec![(5.0, 10.0), (20.0, 30.0)],
        }
    }
}
impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data_files"),
            data_prefix: "data".to_owned(),
            temp_prefix: "temp".to_owned(),
            temp_in_data_file: false,
        }
    }
}
impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
    pub fn from_json_str(text: &str) -> Result<Self, PstatError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| PstatError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
    pub fn current_range(&self) -> Result<CurrentRange, PstatError> {
        self.current_range.parse()
    }
    pub fn validate(&self) -> Result<(), PstatError> {
        let invalid = |msg: String| Err(PstatError::InvalidConfiguration(msg));
        self.current_range()?;
        if self.num_avg == 0 {
            return Err(PstatError::ZeroAveraging);
        }
        if !(self.setpoint_step.is_finite() && self.setpoint_step > 0.0) {
            return invalid(format!("setpoint_step must be positive, got {}", self.setpoint_step));
        }
        if !(self.setpoint_min <= self.setpoint_max) {
            return invalid(format!(
                "setpoint bounds [{}, {}] are empty",
                self.setpoint_min, self.setpoint_max
            ));
        }
        if !(self.setpoint_min..=self.setpoint_max).contains(&self.default_setpoint) {
            return invalid(format!(
                "default_setpoint {} outside [{}, {}]",
                self.default_setpoint, self.setpoint_min, self.setpoint_max
            ));
        }
        if !(self.loop_dt.is_finite() && self.loop_dt > 0.0) {
            return invalid(format!("loop_dt must be positive, got {}", self.loop_dt));
        }
        if !(self.battery_cutoff_hz > 0.0) {
            return invalid(format!(
                "battery_cutoff_hz must be positive, got {}",
                self.battery_cutoff_hz
            ));
        }
        if !(9..=12).contains(&self.temperature.resolution) {
            return invalid(format!(
                "temperature resolution must be 9-12 bits, got {}",
                self.temperature.resolution
            ));
        }
        if let Some((start, stop)) = self.temperature.schedule.iter().find(|(a, b)| !(a <= b)) {
            return invalid(format!("temperature window ({start}, {stop}) is reversed"));
        }
        let logger = &self.logger;
        if logger.data_prefix.is_empty() || logger.temp_prefix.is_empty() {
            return invalid("file prefixes must not be empty".to_owned());
        }
        // the file count scan matches on the data prefix
        if logger.temp_prefix.contains(&logger.data_prefix) {
            return invalid(format!(
                "temp_prefix `{}` must not contain data_prefix `{}`",
                logger.temp_prefix, logger.data_prefix
            ));
        }
        Ok(())
    }
}
/// Reads the boot stage status file. Missing or unreadable means read-write.
pub fn is_read_only(boot_status_file: &Path) -> bool {
    match fs::read_to_string(boot_status_file) {
        Ok(text) => text.lines().any(|line| line.contains("read-only")),
        Err(err) => {
            log::debug!("no boot status at {}: {err}", boot_status_file.display());
            false
        }
    }
}

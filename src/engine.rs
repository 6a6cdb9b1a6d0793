// src/engine.rs
use crate::battery::BatteryMonitor;
use crate::config::AppConfig;
use crate::drivers::{amps_to_microamps, AnalogInput, PstatError, TemperatureProbe};
use crate::potentiostat::{Potentiostat, PotentiostatPins};
use crate::recorder::DataLogger;
use crate::temperature::TemperatureSensor;
use crate::types::*;
use log::{debug, error, info, warn};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// Board peripherals handed to the app at start-up.
pub struct Hardware {
    pub pins: PotentiostatPins,
    pub battery_in: Box<dyn AnalogInput>,
    pub temp_probe: Option<Box<dyn TemperatureProbe>>,
}

/// Constant voltage app: button handling, sampling and logging.
pub struct ConstVoltApp {
    config: AppConfig,
    state: RunState,
    t_start: Instant,
    setpoint: f64,
    pstat: Potentiostat,
    battery: BatteryMonitor,
    temperature: TemperatureSensor,
    logger: DataLogger,
    display: Sender<DisplayFrame>,
}

impl ConstVoltApp {
    /// Fails only on configuration errors. Storage problems are logged and
    /// surface again when a run is started.
    pub fn new(
        config: AppConfig,
        hardware: Hardware,
        read_only: bool,
        display: Sender<DisplayFrame>,
        now: Instant,
    ) -> Result<Self, PstatError> {
        config.validate()?;
        let mut pstat = Potentiostat::new(hardware.pins, config.current_range()?, config.num_avg)?;
        pstat.set_offset(config.setpoint_offset);
        pstat.set_connected(false);

        let battery = BatteryMonitor::with_cutoff(
            hardware.battery_in,
            config.loop_dt,
            config.battery_cutoff_hz,
        );
        let temperature = if config.temperature.enabled {
            TemperatureSensor::new(hardware.temp_probe, config.temperature.resolution, now)
        } else {
            TemperatureSensor::absent()
        };
        let schedule = temperature
            .is_available()
            .then_some(config.temperature.schedule.as_slice());
        let logger = DataLogger::new(config.logger.clone(), read_only, schedule);

        info!(
            "const volt app ready: range {}, offset {:.3} V, {} mode",
            pstat.current_range(),
            pstat.offset(),
            if logger.read_only() { "read-only" } else { "read-write" }
        );
        Ok(Self {
            setpoint: config.default_setpoint,
            config,
            state: RunState::Idle,
            t_start: now,
            pstat,
            battery,
            temperature,
            logger,
            display,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }
    pub fn potentiostat(&self) -> &Potentiostat {
        &self.pstat
    }
    pub fn logger(&self) -> &DataLogger {
        &self.logger
    }

    pub fn action_for(&self, key: u8) -> Option<Action> {
        self.config.keys.get(&key).copied()
    }

    /// One pass of the main loop: at most one key, sensor refresh, and a sample if running.
    pub fn step(&mut self, key: Option<u8>, now: Instant) {
        if let Some(key) = key {
            match self.action_for(key) {
                Some(action) => self.handle_action(action, now),
                None => debug!("key {key} not mapped"),
            }
        }

        self.battery.update();
        if let Err(e) = self.temperature.update(now) {
            warn!("temperature read failed: {e}");
        }

        let (elapsed, current_ua) = match self.state {
            RunState::Running => {
                let record = self.sample(now);
                (record.elapsed, Some(record.current_ua))
            }
            RunState::Idle => (0.0, None),
        };
        let frame = DisplayFrame {
            running: self.state == RunState::Running,
            elapsed,
            setpoint: self.setpoint,
            current_ua,
            battery_volts: self.battery.voltage_lowpass(),
            temperature: self.temperature.value(),
            read_only: self.logger.read_only(),
            file_name: self.logger.data_file_name(),
        };
        // 显示端断开不影响采集
        self.display.send(frame).ok();
    }

    pub fn handle_action(&mut self, action: Action, now: Instant) {
        match action {
            Action::Start => self.on_start(now),
            Action::Stop => self.on_stop(),
            Action::SetpointIncr => {
                self.setpoint = (self.setpoint + self.config.setpoint_step).min(self.config.setpoint_max);
            }
            Action::SetpointDecr => {
                self.setpoint = (self.setpoint - self.config.setpoint_step).max(self.config.setpoint_min);
            }
            Action::ClearFiles => self.on_clear_files(),
        }
    }

    fn on_start(&mut self, now: Instant) {
        if self.state == RunState::Running {
            debug!("start ignored, already running");
            return;
        }
        self.pstat.set_connected(true);
        self.apply_setpoint(self.setpoint);
        self.t_start = now;
        match self.logger.start() {
            Ok(()) => {
                self.state = RunState::Running;
                info!("run started at {:.2} V", self.setpoint);
            }
            Err(e) => {
                error!("cannot start run: {e}");
                self.pstat.set_connected(false);
                self.apply_setpoint(0.0);
            }
        }
    }

    fn on_stop(&mut self) {
        self.pstat.set_connected(false);
        self.apply_setpoint(0.0);
        if self.state == RunState::Running {
            info!("run stopped");
        }
        self.state = RunState::Idle;
        self.logger.stop();
    }

    fn on_clear_files(&mut self) {
        if self.state == RunState::Running {
            warn!("clear files ignored while running");
            return;
        }
        if let Err(e) = self.logger.reset() {
            error!("clearing data files failed: {e}");
        }
    }

    fn apply_setpoint(&mut self, volts: f64) {
        if let Err(e) = self.pstat.set_voltage(volts) {
            warn!("set-point write failed: {e}");
        }
    }

    fn sample(&mut self, now: Instant) -> RunRecord {
        let elapsed = now.saturating_duration_since(self.t_start).as_secs_f64();
        // 每个 tick 重新写入设定值, 跟随按键调整
        self.apply_setpoint(self.setpoint);
        let current_ua = amps_to_microamps(self.pstat.read_current());
        let record = RunRecord {
            elapsed,
            setpoint: self.setpoint,
            current_ua,
            temperature: self.temperature.value(),
        };
        self.logger.update(&record);
        record
    }

    /// Fixed-period loop. Returns once the key source hangs up, stopping any run first.
    pub fn run(mut self, keys: Receiver<u8>) {
        let period = Duration::from_secs_f64(self.config.loop_dt);
        loop {
            let tick = Instant::now();
            let key = match keys.try_recv() {
                Ok(k) => Some(k),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    self.handle_action(Action::Stop, tick);
                    info!("key source closed, leaving main loop");
                    return;
                }
            };
            self.step(key, tick);
            if let Some(rest) = period.checked_sub(tick.elapsed()) {
                thread::sleep(rest);
            }
        }
    }
}

// src/main.rs
mod battery;
mod config;
mod drivers;
mod engine;
mod potentiostat;
mod recorder;
mod temperature;
mod types;
use anyhow::{Context, Result};
use config::AppConfig;
use drivers::{
    code_to_volts, DigitalOutput, ManualProbe, SimAnalogIn, SimAnalogOut, SimDigitalOut,
    TemperatureProbe,
};
use engine::{ConstVoltApp, Hardware};
use potentiostat::PotentiostatPins;
use rand::Rng;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use types::{Action, DisplayFrame};
/// Supply of the simulated board.
const SIM_VPOW: f64 = 3.3;
/// Dummy cell: a plain resistor between counter and working electrode.
const SIM_CELL_OHMS: f64 = 100_000.0;
const SIM_NOISE_VOLTS: f64 = 0.002;
// 模拟硬件: 设定值输出经过虚拟电阻回到 TIA 输入
fn simulated_hardware(config: &AppConfig) -> Result<Hardware> {
    let range = config.current_range()?;
    let setpoint_out = SimAnalogOut::new();
    let switch = SimDigitalOut::new();
    let vgnd = SIM_VPOW / 2.0;
    let tia_in = {
        let out = setpoint_out.clone();
        let switch = switch.clone();
        let gain = range.tia_resistor_ohms();
        let mut rng = rand::thread_rng();
        SimAnalogIn::new(SIM_VPOW, move || {
            let noise = rng.gen_range(-SIM_NOISE_VOLTS..SIM_NOISE_VOLTS);
            // switch is active low
            if switch.level() {
                return vgnd + noise;
            }
            let cell_volts = code_to_volts(out.code(), SIM_VPOW) - vgnd;
            vgnd + cell_volts / SIM_CELL_OHMS * gain + noise
        })
    };
    let mut rng = rand::thread_rng();
    let ref_in = SimAnalogIn::new(SIM_VPOW, move || vgnd + rng.gen_range(-0.001..0.001));
    let mut rng = rand::thread_rng();
    let battery_in = SimAnalogIn::new(SIM_VPOW, move || 1.95 + rng.gen_range(-0.02..0.02));
    let temp_probe = config.temperature.enabled.then(|| {
        let readings = (0..10_000).map(|i| 22.0 + 0.5 * (f64::from(i) / 30.0).sin());
        Box::new(ManualProbe::new(Duration::from_millis(750), readings)) as Box<dyn TemperatureProbe>
    });
    Ok(Hardware {
        pins: PotentiostatPins {
            setpoint_out: Box::new(setpoint_out),
            tia_in: Box::new(tia_in),
            ref_in: Box::new(ref_in),
            counter_switch: Box::new(switch),
        },
        battery_in: Box::new(battery_in),
        temp_probe,
    })
}
/// Maps typed words to the board's key numbers so the sim can be driven from a terminal.
fn key_for_word(config: &AppConfig, word: &str) -> Option<u8> {
    let action = match word {
        "start" | "s" => Action::Start,
        "stop" | "x" => Action::Stop,
        "up" | "+" => Action::SetpointIncr,
        "down" | "-" => Action::SetpointDecr,
        "clear" => Action::ClearFiles,
        other => return other.parse().ok(),
    };
    config
        .keys
        .iter()
        .find(|(_, a)| **a == action)
        .map(|(key, _)| *key)
}
fn spawn_key_reader(config: AppConfig, tx: mpsc::Sender<u8>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match key_for_word(&config, line.trim()) {
                Some(key) => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                None => log::warn!("unknown key `{}`", line.trim()),
            }
        }
    });
}
fn spawn_display(rx: mpsc::Receiver<DisplayFrame>) {
    thread::spawn(move || {
        let mut last_print = Instant::now();
        let mut last_running = false;
        for frame in rx {
            // 降频输出, 状态变化时立即打印
            if frame.running == last_running && last_print.elapsed() < Duration::from_secs(1) {
                continue;
            }
            last_running = frame.running;
            last_print = Instant::now();
            let fmt_opt = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "--".into());
            log::info!(
                "[{}] t={:.2}s vset={:.2}V iwrk={}uA temp={} vbat={:.2}V mode={} file={}",
                if frame.running { "RUNNING" } else { "STOPPED" },
                frame.elapsed,
                frame.setpoint,
                fmt_opt(frame.current_ua),
                fmt_opt(frame.temperature),
                frame.battery_volts,
                if frame.read_only { "READ-ONLY" } else { "READ-WRITE" },
                frame.file_name.as_deref().unwrap_or("NONE"),
            );
        }
    });
}
fn main() -> Result<()> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&PathBuf::from(path))?,
        None => AppConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    // 启动时只读一次
    let read_only = config::is_read_only(&config.boot_status_file);
    let hardware = simulated_hardware(&config)?;
    let (display_tx, display_rx) = mpsc::channel();
    let (key_tx, key_rx) = mpsc::channel();
    spawn_display(display_rx);
    spawn_key_reader(config.clone(), key_tx);
    let app = ConstVoltApp::new(config, hardware, read_only, display_tx, Instant::now())
        .context("starting const volt app")?;
    log::info!("keys: start, stop, up, down, clear (or a raw key number)");
    app.run(key_rx);
    Ok(())
}

// src/types.rs
use serde::{Deserialize, Serialize};

// 按键动作
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Action {
    Start,
    Stop,
    SetpointIncr,
    SetpointDecr,
    ClearFiles,
}

// 采集状态
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

/// One sample tick while running; the unit written to the data file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunRecord {
    pub elapsed: f64,
    pub setpoint: f64,
    pub current_ua: f64,
    pub temperature: Option<f64>,
}

// 后台发给显示屏的数据 (每个 tick 一帧)
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DisplayFrame {
    pub running: bool,
    pub elapsed: f64,
    pub setpoint: f64,
    pub current_ua: Option<f64>, // None = 未运行
    pub battery_volts: f64,
    pub temperature: Option<f64>,
    pub read_only: bool,
    pub file_name: Option<String>,
}

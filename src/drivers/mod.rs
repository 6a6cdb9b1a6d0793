// src/drivers/mod.rs
// 硬件抽象层: 引脚 trait、单位换算、滤波器
pub mod error;
pub mod filter;
pub mod source;
pub mod units;
// 公开导出, 方便外部调用
pub use error::PstatError;
pub use filter::{LowpassFilter, RunningAverage};
pub use source::{
    AnalogInput, AnalogOutput, DigitalOutput, ManualProbe, SimAnalogIn, SimAnalogOut,
    SimDigitalOut, TemperatureProbe,
};
pub use units::{amps_to_microamps, code_to_volts, volts_to_code};

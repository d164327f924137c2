//! 车辆接口错误类型
//!
//! 唯一允许中止的类别是构建期的参数不变量违例（空断点表、
//! 倒置的加速度界等），它们不可能由合法运行时输入触达。
//! 周期内的 `decode` / `synthesize` 永不返回错误：
//! 可恢复状况全部吸收进下一周期的内部状态。

use thiserror::Error;

/// 车辆接口错误
#[derive(Error, Debug)]
pub enum VehicleError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Breakpoint table `{table}` is empty")]
    EmptyBreakpointTable { table: &'static str },

    #[error("Breakpoint table `{table}` is not monotonically increasing")]
    NonMonotonicBreakpoints { table: &'static str },

    #[error("Breakpoint table `{table}` length mismatch: {bp_len} breakpoints, {v_len} values")]
    BreakpointLengthMismatch {
        table: &'static str,
        bp_len: usize,
        v_len: usize,
    },

    #[error("Acceleration bounds inverted: min {min} >= max {max}")]
    InvertedAccelBounds { min: f64, max: f64 },

    #[error("SecOC platform requires a key")]
    MissingSecocKey,

    #[error("Failed to parse params: {0}")]
    ParamsParse(#[from] toml::de::Error),
}

//! # Kaze Control
//!
//! 标量控制原语：解码器与指令合成器共用的数值基础件。
//!
//! ## 模块
//!
//! - `filter`: 单极点低通滤波器（带"未初始化"哨兵态）
//! - `kf`: 定增益二阶运动学滤波器（速度 / 加速度估计）
//! - `pid`: PID 控制器（抗积分饱和、可逐周期更新限幅）
//! - `limits`: 执行量限幅工具（插值、速率限制、故障规避）
//!
//! 所有原语均为纯内存运算：不阻塞、不分配、不做 IO，
//! 给定相同输入序列与初始状态，输出逐位可复现。

pub mod filter;
pub mod kf;
pub mod limits;
pub mod pid;

pub use filter::FirstOrderFilter;
pub use kf::SpeedKf;
pub use limits::{
    AngleRateLimit, TorqueLimits, apply_meas_steer_torque_limits, apply_std_steer_angle_limits,
    common_fault_avoidance, interp, rate_limit,
};
pub use pid::PidController;

/// 控制周期（秒）：解码 / 合成各执行一次的固定节拍
pub const DT_CTRL: f64 = 0.01;

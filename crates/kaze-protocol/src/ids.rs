//! CAN 地址与发送节拍常量
//!
//! 地址对应动力总线上的出站控制消息。节拍以控制周期（10ms）为单位，
//! 用帧计数器取模判断，保证确定性（禁止依赖壁钟时间）。

/// 转矩转向指令（每周期发送）
pub const ID_STEER_TORQUE: u16 = 0x2E4;

/// 角度转向指令
pub const ID_STEER_ANGLE: u16 = 0x191;

/// 角度转向辅助指令（SecOC 平台要求的配套帧）
pub const ID_STEER_ANGLE_AUX: u16 = 0x131;

/// 纵向加速度指令
pub const ID_ACCEL: u16 = 0x343;

/// FCW / 前向碰撞 HUD
pub const ID_FCW_HUD: u16 = 0x411;

/// 车道保持 HUD
pub const ID_LKAS_HUD: u16 = 0x412;

/// 转矩转向指令的发送节拍（每个控制周期）
pub const STEER_TORQUE_STEP: u64 = 1;

/// 角度转向指令的发送节拍（每 2 个控制周期）
pub const STEER_ANGLE_STEP: u64 = 2;

/// 加速度指令的发送节拍（每 3 个控制周期）
pub const ACCEL_STEP: u64 = 3;

/// 跟车距离按键轮询节拍（每 6 个控制周期）
pub const DISTANCE_BUTTON_STEP: u64 = 6;

/// 车道保持 HUD 的发送节拍（5Hz，告警沿触发时立即补发）
pub const LKAS_HUD_STEP: u64 = 20;

/// FCW HUD 的发送节拍（1Hz，告警沿触发时立即补发）
pub const FCW_HUD_STEP: u64 = 100;

//! 会话级车辆参数
//!
//! 由指纹识别协作者在会话启动时导出，整个行程不可变。
//! 所有平台差异（认证、角度/转矩控制、能力开关）都表达为
//! 显式的类型化字段：核心里没有隐藏的继承层次，
//! 也没有文件系统旁路开关。
//!
//! 参数可从 TOML 反序列化（调参 / 回放场景），
//! 会话构建前必须通过 [`VehicleParams::validate`]：
//! 空断点表、非单调断点、倒置加速度界在这里中止构建，
//! 不可能由合法运行时输入触达。

use crate::error::VehicleError;
use kaze_control::{AngleRateLimit, TorqueLimits};
use serde::Deserialize;

/// 横向控制方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SteerControlType {
    /// 转矩控制（车道保持辅助路径）
    #[default]
    Torque,
    /// 角度控制（车道循迹路径，转矩恒为零）
    Angle,
}

/// 平台能力开关
///
/// 每个开关用普通分支测试，不做虚分派。
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PlatformFlags {
    /// 指令帧需要 SecOC 认证
    pub secoc: bool,
    /// 本层拥有纵向控制权
    pub owns_longitudinal: bool,
    /// 平台无静止保持计时器（忽略巡航静止状态位）
    pub no_stop_timer: bool,
    /// 装有盲区监测
    pub enable_bsm: bool,
    /// 启用短时角度预测（尽力而为的平滑层，非安全关键）
    pub angle_prediction: bool,
    /// 混动平台（纵向执行器响应更快）
    pub hybrid: bool,
}

/// 会话级车辆参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    /// 横向控制方式
    pub steer_control_type: SteerControlType,

    /// 转矩限幅表
    pub torque_limits: TorqueLimitsConfig,

    /// 角度速率限幅表（绕紧方向）
    pub angle_rate_limit_up: AngleRateLimitConfig,
    /// 角度速率限幅表（回正方向）
    pub angle_rate_limit_down: AngleRateLimitConfig,

    /// 纵向加速度下限 (m/s²)
    pub accel_min: f64,
    /// 纵向加速度上限 (m/s²)
    pub accel_max: f64,

    /// 转向执行器延迟 (s)
    pub steer_actuator_delay: f64,
    /// 纵向执行器延迟 (s)
    pub long_actuator_delay: f64,

    /// 整备质量 (kg)
    pub mass: f64,
    /// 轴距 (m)
    pub wheelbase: f64,

    /// 轮速标定系数（厂商差异）
    pub wheel_speed_factor: f64,
    /// EPS 转矩缩放（百分比表示，100 = 不缩放）
    pub eps_torque_scale: f64,

    /// 平台能力开关
    pub flags: PlatformFlags,

    /// SecOC 共享密钥（认证平台必填）
    pub secoc_key: Option<[u8; 16]>,
}

/// 转矩限幅表的配置形态
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TorqueLimitsConfig {
    pub steer_max: i32,
    pub steer_delta_up: i32,
    pub steer_delta_down: i32,
    pub steer_error_max: i32,
}

impl Default for TorqueLimitsConfig {
    fn default() -> Self {
        Self {
            steer_max: 1500,
            steer_delta_up: 15,
            steer_delta_down: 25,
            steer_error_max: 350,
        }
    }
}

/// 角度速率限幅表的配置形态
#[derive(Debug, Clone, Deserialize)]
pub struct AngleRateLimitConfig {
    pub speed_bp: Vec<f64>,
    pub angle_v: Vec<f64>,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            steer_control_type: SteerControlType::Torque,
            torque_limits: TorqueLimitsConfig::default(),
            angle_rate_limit_up: AngleRateLimitConfig {
                speed_bp: vec![5.0, 25.0],
                angle_v: vec![0.3, 0.15],
            },
            angle_rate_limit_down: AngleRateLimitConfig {
                speed_bp: vec![5.0, 25.0],
                angle_v: vec![0.36, 0.26],
            },
            accel_min: -3.5,
            accel_max: 2.0,
            steer_actuator_delay: 0.12,
            long_actuator_delay: 0.2,
            mass: 1600.0,
            wheelbase: 2.7,
            wheel_speed_factor: 1.0,
            eps_torque_scale: 100.0,
            flags: PlatformFlags::default(),
            secoc_key: None,
        }
    }
}

impl VehicleParams {
    /// 从 TOML 文本解析并校验
    pub fn from_toml_str(text: &str) -> Result<Self, VehicleError> {
        let params: Self = toml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// 构建期不变量校验
    pub fn validate(&self) -> Result<(), VehicleError> {
        if self.accel_min >= self.accel_max {
            return Err(VehicleError::InvertedAccelBounds {
                min: self.accel_min,
                max: self.accel_max,
            });
        }
        if self.torque_limits.steer_max <= 0
            || self.torque_limits.steer_delta_up <= 0
            || self.torque_limits.steer_delta_down <= 0
            || self.torque_limits.steer_error_max <= 0
        {
            return Err(VehicleError::InvalidParams(
                "torque limits must be positive".into(),
            ));
        }
        validate_table("angle_rate_limit_up", &self.angle_rate_limit_up)?;
        validate_table("angle_rate_limit_down", &self.angle_rate_limit_down)?;
        if self.mass <= 0.0 || self.wheelbase <= 0.0 {
            return Err(VehicleError::InvalidParams(
                "mass and wheelbase must be positive".into(),
            ));
        }
        if self.flags.secoc && self.secoc_key.is_none() {
            return Err(VehicleError::MissingSecocKey);
        }
        Ok(())
    }

    /// 转矩限幅表（运行时形态）
    pub fn torque_limits(&self) -> TorqueLimits {
        TorqueLimits {
            steer_max: self.torque_limits.steer_max,
            steer_delta_up: self.torque_limits.steer_delta_up,
            steer_delta_down: self.torque_limits.steer_delta_down,
            steer_error_max: self.torque_limits.steer_error_max,
        }
    }

    /// 角度速率限幅表（运行时形态）：(绕紧, 回正)
    pub fn angle_rate_limits(&self) -> (AngleRateLimit, AngleRateLimit) {
        let up = AngleRateLimit {
            speed_bp: self.angle_rate_limit_up.speed_bp.clone(),
            angle_v: self.angle_rate_limit_up.angle_v.clone(),
        };
        let down = AngleRateLimit {
            speed_bp: self.angle_rate_limit_down.speed_bp.clone(),
            angle_v: self.angle_rate_limit_down.angle_v.clone(),
        };
        (up, down)
    }
}

fn validate_table(name: &'static str, table: &AngleRateLimitConfig) -> Result<(), VehicleError> {
    if table.speed_bp.is_empty() {
        return Err(VehicleError::EmptyBreakpointTable { table: name });
    }
    if table.speed_bp.len() != table.angle_v.len() {
        return Err(VehicleError::BreakpointLengthMismatch {
            table: name,
            bp_len: table.speed_bp.len(),
            v_len: table.angle_v.len(),
        });
    }
    if table.speed_bp.windows(2).any(|w| w[0] >= w[1]) {
        return Err(VehicleError::NonMonotonicBreakpoints { table: name });
    }
    Ok(())
}

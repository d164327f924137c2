//! 执行量限幅工具
//!
//! 合成器的安全包络在这里实现：绝对限幅、速率限幅、
//! 基于实测助力转矩的转矩限幅、基于车速的角度速率限幅、
//! 以及持续越限时的故障规避（撤销使能位）。
//!
//! 越界一律静默夹断，从不报错：本层的正确性定义是
//! "永不超出安全包络"，而不是"永不进入错误状态"。

/// 断点线性插值，端点外取端点值
///
/// `xp` 必须单调不减且与 `fp` 等长（由参数校验在会话构建时保证）。
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    debug_assert!(!xp.is_empty());

    if x <= xp[0] {
        return fp[0];
    }
    let last = xp.len() - 1;
    if x >= xp[last] {
        return fp[last];
    }
    let mut hi = 1;
    while xp[hi] < x {
        hi += 1;
    }
    let lo = hi - 1;
    fp[lo] + (x - xp[lo]) * (fp[hi] - fp[lo]) / (xp[hi] - xp[lo])
}

/// 非对称速率限幅：输出相对上一周期的变化被夹在 `[down_step, up_step]`
///
/// `down_step` 为负值。
pub fn rate_limit(new_value: f64, last_value: f64, down_step: f64, up_step: f64) -> f64 {
    new_value.clamp(last_value + down_step, last_value + up_step)
}

/// 转矩限幅参数表（EPS 内部转矩单位）
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueLimits {
    /// 绝对转矩上限
    pub steer_max: i32,
    /// 同向增大时的每周期最大变化
    pub steer_delta_up: i32,
    /// 回落时的每周期最大变化
    pub steer_delta_down: i32,
    /// 指令与实测助力转矩允许的最大偏差
    pub steer_error_max: i32,
}

/// 基于实测助力转矩的转矩限幅
///
/// 绝对上限随实测助力转矩移动：避免在 EPS 已经报告反向受力时
/// 继续朝对抗方向加转矩（否则会触发助力故障）。
/// 之后再套每周期速率限幅：同向增大用慢速率，回落用快速率。
pub fn apply_meas_steer_torque_limits(
    apply_torque: i32,
    apply_torque_last: i32,
    motor_torque: f64,
    limits: &TorqueLimits,
) -> i32 {
    let motor = motor_torque.round() as i32;
    let max_lim = (motor + limits.steer_error_max)
        .max(limits.steer_error_max)
        .min(limits.steer_max);
    let min_lim = (motor - limits.steer_error_max)
        .min(-limits.steer_error_max)
        .max(-limits.steer_max);

    let mut torque = apply_torque.clamp(min_lim, max_lim);

    torque = if apply_torque_last > 0 {
        torque.clamp(
            (apply_torque_last - limits.steer_delta_down).max(-limits.steer_delta_up),
            apply_torque_last + limits.steer_delta_up,
        )
    } else {
        torque.clamp(
            apply_torque_last - limits.steer_delta_up,
            (apply_torque_last + limits.steer_delta_down).min(limits.steer_delta_up),
        )
    };
    torque
}

/// 角度速率限幅表：车速断点 → 每周期最大角度变化 (deg)
#[derive(Debug, Clone, PartialEq)]
pub struct AngleRateLimit {
    /// 车速断点 (m/s)
    pub speed_bp: Vec<f64>,
    /// 对应的每周期角度变化上限 (deg)
    pub angle_v: Vec<f64>,
}

/// 基于车速的目标角度速率限幅
///
/// 远离中位（绕紧）用 `limit_up`，回正（卸载）用 `limit_down`；
/// 车速越高允许的速率越低。
pub fn apply_std_steer_angle_limits(
    apply_angle: f64,
    apply_angle_last: f64,
    v_ego: f64,
    limit_up: &AngleRateLimit,
    limit_down: &AngleRateLimit,
) -> f64 {
    let steer_up =
        apply_angle_last * apply_angle >= 0.0 && apply_angle.abs() > apply_angle_last.abs();
    let rate_limits = if steer_up { limit_up } else { limit_down };
    let angle_rate_lim = interp(v_ego, &rate_limits.speed_bp, &rate_limits.angle_v);
    apply_angle.clamp(apply_angle_last - angle_rate_lim, apply_angle_last + angle_rate_lim)
}

/// 持续越限故障规避
///
/// 条件与请求同时成立时逐帧计数；计数到 `max_above_limit_frames`
/// 时撤销该周期的请求并复位计数器。给定恒定越限输入，
/// 请求恰好每 `max_above_limit_frames` 帧被撤销一次。
pub fn common_fault_avoidance(
    fault_condition: bool,
    request: bool,
    above_limit_frames: u32,
    max_above_limit_frames: u32,
) -> (u32, bool) {
    let frames = if request && fault_condition {
        above_limit_frames + 1
    } else {
        0
    };

    if frames >= max_above_limit_frames {
        (0, false)
    } else {
        (frames, request)
    }
}

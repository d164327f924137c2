//! 上游规划层的期望执行意图与回传反馈
//!
//! 规划 / 控制层每个周期产出一份 [`DesiredIntent`]；
//! 合成器返回 [`AppliedFeedback`]：实际施加的（限幅后）执行量，
//! 供下一周期的遥测与规划参考。遥测是结构化返回值，
//! 不存在文件旁路通道。

/// 纵向控制状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongControlState {
    /// 纵向未接合
    #[default]
    Off,
    /// 正常闭环
    Pid,
    /// 减速进站
    Stopping,
    /// 起步
    Starting,
}

/// 期望执行意图（单周期快照）
#[derive(Debug, Clone, Default)]
pub struct DesiredIntent {
    /// 期望转向转矩，归一化到 [-1, 1]
    pub steer_torque: f64,
    /// 期望转向角 (deg)，角度控制平台使用
    pub steering_angle_deg: f64,
    /// 期望加速度 (m/s²)
    pub accel: f64,
    /// 纵向控制状态
    pub long_control_state: LongControlState,

    /// 横向控制接合
    pub lat_active: bool,
    /// 纵向控制接合
    pub long_active: bool,
    /// 整体接合（HUD 显示用）
    pub enabled: bool,
    /// 请求平台取消巡航
    pub cancel_request: bool,

    /// 车身俯仰角 (rad)，坡道补偿用
    pub pitch_rad: f64,

    /// HUD：前车可见
    pub lead_visible: bool,
    /// HUD：期望跟车距离档位 (1-3)
    pub lead_distance_bars: u8,
    /// HUD：FCW 告警
    pub fcw_alert: bool,
    /// HUD：请求驾驶员接管告警
    pub steer_required_alert: bool,
    /// HUD：左车道线可见
    pub left_lane_visible: bool,
    /// HUD：右车道线可见
    pub right_lane_visible: bool,
    /// HUD：左车道偏离
    pub left_lane_depart: bool,
    /// HUD：右车道偏离
    pub right_lane_depart: bool,
}

/// 实际施加的执行量（限幅后），回传给上游
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AppliedFeedback {
    /// 实际转矩，归一化到 [-1, 1]
    pub steer_torque: f64,
    /// 实际转矩（EPS 内部单位，总线上发送的原值）
    pub steer_torque_can: i32,
    /// 实际目标角度 (deg)
    pub steering_angle_deg: f64,
    /// 实际加速度指令 (m/s²)
    pub accel: f64,
}

//! 规范化车辆状态
//!
//! 解码器每个控制周期恰好产出一个 [`VehicleState`]，
//! 由调用方持有，本周期内消费后丢弃。
//! 所有字段都有定义好的"未知 / 假"缺省值，不存在可省略字段。

use num_enum::FromPrimitive;

/// 换挡器位置（原始总线编码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive)]
#[repr(u8)]
pub enum GearShifter {
    Drive = 0,
    Low = 1,
    Neutral = 8,
    Reverse = 16,
    Park = 32,
    /// 未收到或未知编码
    #[default]
    Unknown = 255,
}

/// 巡航 / ACC 状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CruiseState {
    /// 主开关开启
    pub available: bool,
    /// 巡航接合
    pub enabled: bool,
    /// 巡航静止保持中
    pub standstill: bool,
    /// 处于非自适应巡航子模式
    pub non_adaptive: bool,
    /// 设定速度 (m/s)
    pub speed: f64,
    /// 仪表显示的设定速度 (m/s)，首次接合前为 0
    pub speed_cluster: f64,
}

/// 离散按键事件（仅在上升沿产出一次）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// 跟车距离调节按下
    GapAdjustPressed,
}

/// SecOC 同步快照（认证平台由总线下发）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecocSync {
    /// 行程计数器
    pub trip_counter: u32,
    /// 复位计数器
    pub reset_counter: u32,
    /// 总线报告的同步认证码（24 位）
    pub authenticator: u32,
}

/// 单周期规范化车辆状态
#[derive(Debug, Clone, Default)]
pub struct VehicleState {
    /// 原始融合轮速 (m/s)
    pub v_ego_raw: f64,
    /// 滤波车速 (m/s)
    pub v_ego: f64,
    /// 仪表车速 (m/s)
    pub v_ego_cluster: f64,
    /// 加速度估计 (m/s²)
    pub a_ego: f64,
    /// 静止（按原始轮速判定，避免滤波滞后）
    pub standstill: bool,

    /// 转向角 (deg)，偏移修正后
    pub steering_angle_deg: f64,
    /// 转向角速度 (deg/s)
    pub steering_rate_deg: f64,
    /// 学习到的精角度传感器偏移 (deg)
    pub steering_angle_offset_deg: f64,
    /// 驾驶员转矩（传感器单位）
    pub steering_torque: f64,
    /// EPS 助力转矩（缩放后）
    pub steering_torque_eps: f64,
    /// 驾驶员握持判定
    pub steering_pressed: bool,
    /// 暂时性转向故障（可恢复）
    pub steer_fault_temporary: bool,
    /// 永久性转向故障
    pub steer_fault_permanent: bool,
    /// 角度控制所需的精角度传感器尚未就绪
    pub vehicle_sensors_invalid: bool,

    /// 换挡器位置
    pub gear: GearShifter,
    /// 左转向灯
    pub left_blinker: bool,
    /// 右转向灯
    pub right_blinker: bool,

    /// 任一车门开启
    pub door_open: bool,
    /// 驾驶员安全带未系
    pub seatbelt_unlatched: bool,
    /// 驻车制动
    pub parking_brake: bool,
    /// 制动踏板按下
    pub brake_pressed: bool,
    /// 自动驻车保持中
    pub brake_hold_active: bool,
    /// 制动灯点亮（含 ACC 制动）
    pub brake_lights: bool,
    /// 油门踏板按下
    pub gas_pressed: bool,
    /// 油门踏板开度（原始百分比，遥测用）
    pub gas: f64,
    /// 发动机转速 (rpm)，混动 / 认证平台不上报时为 0
    pub engine_rpm: f64,
    /// 车身稳定系统被关闭
    pub esp_disabled: bool,
    /// 灯光拨杆的自动远光开关（通用拨动位）
    pub generic_toggle: bool,

    /// 巡航状态
    pub cruise: CruiseState,
    /// ACC 故障
    pub acc_faulted: bool,
    /// 平台自身正在 ACC 制动
    pub acc_braking: bool,
    /// ACC 模块类型编码
    pub acc_type: u8,
    /// 平台当前跟车距离档位
    pub follow_distance: u8,

    /// 左盲区告警
    pub left_blindspot: bool,
    /// 右盲区告警
    pub right_blindspot: bool,

    /// 原厂 AEB 触发中
    pub stock_aeb: bool,
    /// 原厂 FCW 告警中
    pub stock_fcw: bool,

    /// 巡航状态机原始编码（合成器的静止释放逻辑需要）
    pub pcm_acc_status: u8,

    /// 本周期的离散按键事件
    pub button_events: Vec<ButtonEvent>,

    /// SecOC 同步快照（仅认证平台）
    pub secoc_sync: Option<SecocSync>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gear_from_raw_codes() {
        assert_eq!(GearShifter::from_primitive(0), GearShifter::Drive);
        assert_eq!(GearShifter::from_primitive(16), GearShifter::Reverse);
        assert_eq!(GearShifter::from_primitive(32), GearShifter::Park);
        assert_eq!(GearShifter::from_primitive(77), GearShifter::Unknown);
    }

    #[test]
    fn test_default_state_is_unknown_false() {
        let state = VehicleState::default();
        assert_eq!(state.gear, GearShifter::Unknown);
        assert!(!state.standstill);
        assert_eq!(state.v_ego, 0.0);
        assert!(state.button_events.is_empty());
        assert!(state.secoc_sync.is_none());
    }
}

//! 状态解码器
//!
//! 每个控制周期消费一份信号快照，产出规范化的 [`VehicleState`]。
//! 除自身内部状态外是纯函数：不阻塞、不做 IO、分配有界，
//! 给定相同的输入序列与初始状态，输出逐位可复现。
//!
//! 缺失信号（NaN）一律落到"未知 / 假"缺省或保持上一周期的值，
//! 任何情况下都不会让错误逃出周期调用。

use crate::params::{SteerControlType, VehicleParams};
use crate::state::{ButtonEvent, GearShifter, SecocSync, VehicleState};
use kaze_control::{DT_CTRL, FirstOrderFilter, SpeedKf};
use kaze_protocol::SignalSnapshot;
use num_enum::FromPrimitive;

const KPH_TO_MS: f64 = 1.0 / 3.6;
const MPH_TO_MS: f64 = 0.44704;

/// 驾驶员握持判定阈值（转矩传感器单位）
const STEER_THRESHOLD: f64 = 100.0;

/// 静止判定阈值 (m/s)，作用于原始轮速
const STANDSTILL_EPS: f64 = 1e-3;

// EPS 状态码分类。高转向速率故障短暂进入 21/25 再回 9；
// 指令丢帧先 9 后 11，持续约 2 秒后转 3；
// 17 是驾驶员长时间强转矩的永久故障。
const TEMP_STEER_FAULTS: [u8; 5] = [0, 9, 11, 21, 25];
const PERM_STEER_FAULTS: [u8; 2] = [3, 17];

/// 偏移学习门限：大角度 / 高角速度下原始偏移不可靠
const ANGLE_OFFSET_MAX_DEG: f64 = 90.0;
const ANGLE_OFFSET_MAX_RATE: f64 = 100.0;

/// 偏移滤波时间常数（秒）
const ANGLE_OFFSET_RC: f64 = 60.0;

/// 角度预测窗口长度与外推节拍数（尽力而为的平滑层，常数可调）
const ANGLE_HISTORY_LEN: usize = 13;
const ANGLE_PREDICT_TICKS: f64 = 10.0;

/// 急弯截止：超过该角度停止预测
const ANGLE_PREDICT_MAX_DEG: f64 = 35.0;

/// 状态解码器
///
/// 内部状态为其独占，跨周期存活，跨会话不共享。
#[derive(Debug)]
pub struct StateDecoder {
    params: VehicleParams,

    speed_kf: SpeedKf,
    prev_v_raw: f64,

    // 自适应角度偏移：精角度传感器上电归零，
    // 与粗传感器同时可读后开始学习差值
    angle_offset: FirstOrderFilter,
    accurate_angle_seen: bool,

    // 短时角度预测
    angle_history: Vec<f64>,
    accumulated_prediction: f64,
    prev_angle: f64,

    prev_brake_lights: bool,
    prev_distance_button: f64,

    acc_type: u8,
    follow_distance: u8,

    secoc_sync: SecocSync,
}

impl StateDecoder {
    /// 从会话参数创建解码器
    pub fn new(params: &VehicleParams) -> Self {
        Self {
            params: params.clone(),
            speed_kf: SpeedKf::new(),
            prev_v_raw: 0.0,
            angle_offset: FirstOrderFilter::uninitialized(ANGLE_OFFSET_RC, DT_CTRL),
            accurate_angle_seen: false,
            angle_history: Vec::with_capacity(ANGLE_HISTORY_LEN + 1),
            accumulated_prediction: 0.0,
            prev_angle: 0.0,
            prev_brake_lights: false,
            prev_distance_button: 0.0,
            acc_type: 1,
            follow_distance: 0,
            secoc_sync: SecocSync::default(),
        }
    }

    /// 解码一个周期的信号快照
    pub fn decode(&mut self, cp: &SignalSnapshot) -> VehicleState {
        let mut ret = VehicleState::default();

        self.decode_body(cp, &mut ret);
        self.decode_speed(cp, &mut ret);
        self.decode_steering(cp, &mut ret);
        self.decode_cruise(cp, &mut ret);
        self.decode_buttons(cp, &mut ret);

        if self.params.flags.secoc {
            self.update_secoc_sync(cp);
            ret.secoc_sync = Some(self.secoc_sync);
        }

        ret
    }

    fn decode_body(&mut self, cp: &SignalSnapshot, ret: &mut VehicleState) {
        ret.door_open = cp.flag("BODY_CONTROL_STATE", "DOOR_OPEN_FL")
            || cp.flag("BODY_CONTROL_STATE", "DOOR_OPEN_FR")
            || cp.flag("BODY_CONTROL_STATE", "DOOR_OPEN_RL")
            || cp.flag("BODY_CONTROL_STATE", "DOOR_OPEN_RR");
        ret.seatbelt_unlatched = cp.flag("BODY_CONTROL_STATE", "SEATBELT_DRIVER_UNLATCHED");
        ret.parking_brake = cp.value("BODY_CONTROL_STATE", "PARKING_BRAKE") == 1.0;

        ret.brake_pressed = cp.flag("BRAKE_MODULE", "BRAKE_PRESSED");
        ret.brake_hold_active = cp.value("ESP_CONTROL", "BRAKE_HOLD_ACTIVE") == 1.0;
        ret.esp_disabled = cp.flag("ESP_CONTROL", "TC_DISABLED");

        // 制动灯沿状态：合成器不消费，但保持给遥测
        let brake_lights = cp.flag("ESP_CONTROL", "BRAKE_LIGHTS_ACC") || ret.brake_pressed;
        if brake_lights != self.prev_brake_lights {
            tracing::debug!(brake_lights, "brake light state changed");
            self.prev_brake_lights = brake_lights;
        }
        ret.brake_lights = brake_lights;

        if self.params.flags.secoc {
            ret.gas_pressed = cp.value("GAS_PEDAL", "GAS_PEDAL_USER") > 0.0;
        } else {
            // GAS_RELEASED 低有效；NaN 比较恒假，缺失时不判定为踩下
            ret.gas_pressed = cp.value("PCM_CRUISE", "GAS_RELEASED") == 0.0;

            let rpm = cp.value("ENGINE_RPM", "RPM");
            if rpm.is_finite() {
                ret.engine_rpm = rpm;
            }

            // 踏板开度只做遥测，混动平台走专用消息
            let pedal_message = if self.params.flags.hybrid {
                "GAS_PEDAL_HYBRID"
            } else {
                "GAS_PEDAL"
            };
            let gas = cp.value(pedal_message, "GAS_PEDAL");
            if gas.is_finite() {
                ret.gas = gas;
            }
        }

        let gear_message = if self.params.flags.secoc {
            "GEAR_PACKET_HYBRID"
        } else {
            "GEAR_PACKET"
        };
        let gear_raw = cp.value(gear_message, "GEAR");
        ret.gear = if gear_raw.is_finite() {
            GearShifter::from_primitive(gear_raw as u8)
        } else {
            GearShifter::Unknown
        };

        let turn_signals = cp.value("BLINKERS_STATE", "TURN_SIGNALS");
        ret.left_blinker = turn_signals == 1.0;
        ret.right_blinker = turn_signals == 2.0;

        if self.params.flags.enable_bsm {
            ret.left_blindspot =
                cp.flag("BSM", "L_ADJACENT") || cp.flag("BSM", "L_APPROACHING");
            ret.right_blindspot =
                cp.flag("BSM", "R_ADJACENT") || cp.flag("BSM", "R_APPROACHING");
        }

        ret.stock_aeb = cp.flag("PRE_COLLISION", "PRECOLLISION_ACTIVE")
            && cp.value("PRE_COLLISION", "FORCE") < -1e-5;
        ret.stock_fcw = cp.flag("PCS_HUD", "FCW");

        ret.generic_toggle = cp.flag("LIGHT_STALK", "AUTO_HIGH_BEAM");
    }

    fn decode_speed(&mut self, cp: &SignalSnapshot, ret: &mut VehicleState) {
        let factor = self.params.wheel_speed_factor * KPH_TO_MS;
        let fl = cp.value("WHEEL_SPEEDS", "WHEEL_SPEED_FL");
        let fr = cp.value("WHEEL_SPEEDS", "WHEEL_SPEED_FR");
        let rl = cp.value("WHEEL_SPEEDS", "WHEEL_SPEED_RL");
        let rr = cp.value("WHEEL_SPEEDS", "WHEEL_SPEED_RR");
        let v_raw = (fl + fr + rl + rr) / 4.0 * factor;

        if v_raw.is_finite() {
            let (v, a) = self.speed_kf.update(v_raw);
            self.prev_v_raw = v_raw;
            ret.v_ego_raw = v_raw;
            ret.v_ego = v;
            ret.a_ego = a;
            // 静止判定用原始值：滤波滞后会推迟安全相关的静止检出
            ret.standstill = v_raw.abs() < STANDSTILL_EPS;
        } else {
            // 轮速帧尚未收到：保持上一周期的估计，不判定静止
            ret.v_ego_raw = self.prev_v_raw;
            ret.v_ego = self.speed_kf.v;
            ret.a_ego = self.speed_kf.a;
        }
        ret.v_ego_cluster = ret.v_ego * 1.015;
    }

    fn decode_steering(&mut self, cp: &SignalSnapshot, ret: &mut VehicleState) {
        let coarse_angle = cp.value("STEER_ANGLE_SENSOR", "STEER_ANGLE")
            + cp.value("STEER_ANGLE_SENSOR", "STEER_FRACTION");
        let rate = cp.value("STEER_ANGLE_SENSOR", "STEER_RATE");
        let fine_angle = cp.value("STEER_TORQUE_SENSOR", "STEER_ANGLE");

        ret.steering_rate_deg = if rate.is_finite() { rate } else { 0.0 };

        // 精角度传感器初始化完成前读数为 0 且标志位置位
        if fine_angle.is_finite()
            && fine_angle.abs() > 1e-3
            && !cp.flag("STEER_TORQUE_SENSOR", "STEER_ANGLE_INITIALIZING")
        {
            self.accurate_angle_seen = true;
        }

        let mut angle = if coarse_angle.is_finite() { coarse_angle } else { 0.0 };

        if self.accurate_angle_seen {
            // 大角度 / 高角速度 / 总线无效期间偏移不可靠，不学习
            if coarse_angle.is_finite()
                && fine_angle.is_finite()
                && coarse_angle.abs() < ANGLE_OFFSET_MAX_DEG
                && ret.steering_rate_deg.abs() < ANGLE_OFFSET_MAX_RATE
                && cp.bus_valid()
            {
                self.angle_offset.update(fine_angle - coarse_angle);
            }

            if self.angle_offset.initialized() && fine_angle.is_finite() {
                ret.steering_angle_offset_deg = self.angle_offset.x;
                angle = fine_angle - self.angle_offset.x;
            }
        }

        let angle_org = angle;
        if self.params.flags.angle_prediction && angle_org.abs() < ANGLE_PREDICT_MAX_DEG {
            angle = self.predict_angle(angle);
        }
        ret.steering_angle_deg = angle;

        ret.steering_torque = cp.value("STEER_TORQUE_SENSOR", "STEER_TORQUE_DRIVER");
        if !ret.steering_torque.is_finite() {
            ret.steering_torque = 0.0;
        }
        let eps_torque = cp.value("STEER_TORQUE_SENSOR", "STEER_TORQUE_EPS");
        ret.steering_torque_eps = if eps_torque.is_finite() {
            eps_torque * self.params.eps_torque_scale / 100.0
        } else {
            0.0
        };
        // 不用总线上的接管位：它的触发转矩偏高
        ret.steering_pressed = ret.steering_torque.abs() > STEER_THRESHOLD;

        let lka_state = cp.value("EPS_STATUS", "LKA_STATE");
        if lka_state.is_finite() {
            let code = lka_state as u8;
            ret.steer_fault_temporary = TEMP_STEER_FAULTS.contains(&code);
            ret.steer_fault_permanent = PERM_STEER_FAULTS.contains(&code);
        }

        if self.params.steer_control_type == SteerControlType::Angle {
            let lta_state = cp.value("EPS_STATUS", "LTA_STATE");
            if lta_state.is_finite() {
                let code = lta_state as u8;
                ret.steer_fault_temporary |= TEMP_STEER_FAULTS.contains(&code);
                ret.steer_fault_permanent |= PERM_STEER_FAULTS.contains(&code);
            }
            // 精角度传感器就绪前角度控制不可用
            ret.vehicle_sensors_invalid = !self.accurate_angle_seen;
        }
    }

    /// 短时角度预测：在最近 13 个样本上求平均角速度与角加速度，
    /// 按匀加速运动学外推 10 个节拍。
    ///
    /// 这是延迟补偿性质的尽力而为平滑层，不是标定过的估计器。
    fn predict_angle(&mut self, angle: f64) -> f64 {
        if !angle.is_finite() {
            return angle;
        }

        self.angle_history.push(angle);
        if self.angle_history.len() <= ANGLE_HISTORY_LEN {
            return angle;
        }
        self.angle_history.remove(0);

        let n = self.angle_history.len();
        let velocities: Vec<f64> = self
            .angle_history
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect();
        let accelerations: Vec<f64> = velocities.windows(2).map(|w| w[1] - w[0]).collect();
        let ang_v: f64 = velocities.iter().sum::<f64>() / velocities.len() as f64;
        let ang_a: f64 = accelerations.iter().sum::<f64>() / accelerations.len() as f64;
        debug_assert_eq!(n, ANGLE_HISTORY_LEN);

        self.accumulated_prediction += ang_v;
        // Δ = n·v + n(n−1)/2·a
        let lookahead = ANGLE_PREDICT_TICKS * ang_v
            + (ANGLE_PREDICT_TICKS - 1.0) * ANGLE_PREDICT_TICKS / 2.0 * ang_a;

        // 偏移估计刚从新传感器读数收敛时，累积项失效，重新起算
        if self.prev_angle != angle || self.accurate_angle_seen {
            self.accumulated_prediction = 0.0;
        }
        self.prev_angle = angle;

        angle + self.accumulated_prediction + lookahead
    }

    fn decode_cruise(&mut self, cp: &SignalSnapshot, ret: &mut VehicleState) {
        ret.acc_faulted = cp.flag("PCM_CRUISE_2", "ACC_FAULTED");
        ret.cruise.available = cp.flag("PCM_CRUISE_2", "MAIN_ON");
        let set_speed = cp.value("PCM_CRUISE_2", "SET_SPEED");
        ret.cruise.speed = if set_speed.is_finite() {
            set_speed * KPH_TO_MS
        } else {
            0.0
        };

        // 主开关开启时 UI_SET_SPEED 恒非零，首次接合前不显示
        if ret.cruise.speed != 0.0 {
            let units = cp.value("BODY_CONTROL_STATE_2", "UNITS");
            let is_metric = units == 1.0 || units == 2.0;
            let conversion = if is_metric { KPH_TO_MS } else { MPH_TO_MS };
            let cluster_set_speed = cp.value("PCM_CRUISE_SM", "UI_SET_SPEED");
            if cluster_set_speed.is_finite() {
                ret.cruise.speed_cluster = cluster_set_speed * conversion;
            }
        }

        // 部分平台低速锁定位常置，仅类型 1 的 ACC 作故障处理
        if self.params.flags.owns_longitudinal
            && self.acc_type == 1
            && cp.value("PCM_CRUISE_2", "LOW_SPEED_LOCKOUT") == 2.0
        {
            ret.acc_faulted = true;
        }

        let cruise_state = cp.value("PCM_CRUISE", "CRUISE_STATE");
        let status = if cruise_state.is_finite() {
            cruise_state as u8
        } else {
            0
        };
        ret.pcm_acc_status = status;
        // 状态机按值集合查表，7 = 巡航静止保持；
        // 无静止计时器的平台只需加速度请求即可重新起步，忽略该位
        if !self.params.flags.no_stop_timer {
            ret.cruise.standstill = status == 7;
        }
        ret.cruise.enabled = cp.flag("PCM_CRUISE", "CRUISE_ACTIVE");
        ret.cruise.non_adaptive = (1..=6).contains(&status);
        ret.acc_braking = cp.flag("PCM_CRUISE", "ACC_BRAKING");

        let acc_type = cp.value("ACC_CONTROL", "ACC_TYPE");
        if acc_type.is_finite() {
            self.acc_type = acc_type as u8;
        }
        ret.acc_type = self.acc_type;

        let follow_distance = cp.value("PCM_CRUISE_2", "PCM_FOLLOW_DISTANCE");
        if follow_distance.is_finite() {
            self.follow_distance = follow_distance as u8;
        }
        ret.follow_distance = self.follow_distance;
    }

    fn decode_buttons(&mut self, cp: &SignalSnapshot, ret: &mut VehicleState) {
        // 距离按键接在 ACC 模块上；只在上升沿产出事件
        let distance_button = cp.value("ACC_CONTROL", "DISTANCE");
        if distance_button == 1.0 && self.prev_distance_button != 1.0 {
            ret.button_events.push(ButtonEvent::GapAdjustPressed);
        }
        if distance_button.is_finite() {
            self.prev_distance_button = distance_button;
        }
    }

    fn update_secoc_sync(&mut self, cp: &SignalSnapshot) {
        let trip = cp.value("SECOC_SYNCHRONIZATION", "TRIP_CNT");
        let reset = cp.value("SECOC_SYNCHRONIZATION", "RESET_CNT");
        let auth = cp.value("SECOC_SYNCHRONIZATION", "AUTHENTICATOR");
        // 同步帧缺失时保持上一快照
        if trip.is_finite() && reset.is_finite() && auth.is_finite() {
            self.secoc_sync = SecocSync {
                trip_counter: trip as u32,
                reset_counter: reset as u32,
                authenticator: auth as u32,
            };
        }
    }
}

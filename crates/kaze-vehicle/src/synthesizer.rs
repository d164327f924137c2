//! 指令合成器
//!
//! 每个控制周期消费一份期望意图与当周期车辆状态，产出
//! 限幅后的出站帧列表与实际执行量反馈。安全包络在这里收口：
//! 无论上游给出什么，离开本层的转矩 / 角度 / 加速度
//! 都不会超出会话参数定义的界。
//!
//! 帧节拍：转矩转向逐帧，角度转向每 2 帧，加速度每 3 帧，
//! 距离按键每 6 帧，车道 HUD 每 20 帧（告警沿立即补发），
//! FCW HUD 每 100 帧。转向帧始终排在加速度帧之前。

use crate::intent::{AppliedFeedback, DesiredIntent, LongControlState};
use crate::params::{SteerControlType, VehicleParams};
use crate::state::VehicleState;
use kaze_control::{
    AngleRateLimit, DT_CTRL, FirstOrderFilter, PidController, TorqueLimits,
    apply_meas_steer_torque_limits, apply_std_steer_angle_limits, common_fault_avoidance,
    rate_limit,
};
use kaze_protocol::commands::{
    accel_command, angle_steer_aux_command, angle_steer_command, fcw_command,
    steer_torque_command, ui_command,
};
use kaze_protocol::ids::{
    ACCEL_STEP, DISTANCE_BUTTON_STEP, FCW_HUD_STEP, LKAS_HUD_STEP, STEER_ANGLE_STEP,
};
use kaze_protocol::{CanFrame, secoc};
use smallvec::SmallVec;

/// 每周期出站帧缓冲（最坏情形 6 帧，栈上分配）
pub type FrameBuf = SmallVec<[CanFrame; 8]>;

// 起步时让油门 / 制动快速退绕；回落速率大致匹配平台
// 自身的请求变化率，减少补偿回路的积分堆积
const ACCEL_WINDUP_LIMIT: f64 = 3.0 * DT_CTRL * 3.0; // m/s² / 周期
const ACCEL_WINDDOWN_LIMIT: f64 = -5.0 * DT_CTRL * 3.0; // m/s² / 周期

// 转向速率超过 100 deg/s 时持续施加转矩会触发 EPS 故障
const MAX_STEER_RATE: f64 = 100.0; // deg/s
const MAX_STEER_RATE_FRAMES: u32 = 18;

/// 驾驶员转矩超过该值 50 帧后 EPS 永久故障，提前让位
const MAX_USER_TORQUE: f64 = 500.0;

// 角度控制限值：EPS 忽略超过该角度的指令并引发故障
const MAX_LTA_ANGLE: f64 = 94.9461; // deg
/// 略高于握持阈值，允许驾驶员变道时带阻力融合
const MAX_LTA_DRIVER_TORQUE_ALLOWANCE: f64 = 150.0;

const ACCELERATION_DUE_TO_GRAVITY: f64 = 9.81; // m/s²

// 制动许可回滞窗口
const PERMIT_BRAKING_WITHDRAW: f64 = 0.2; // m/s²
const PERMIT_BRAKING_RESTORE: f64 = 0.1; // m/s²

/// SecOC 认证码不匹配的报告上限
const SECOC_MISMATCH_REPORT_LIMIT: u32 = 100;

/// 指令合成器
///
/// 内部状态（限幅历史、滤波器、计数器）跨周期存活。
pub struct CommandSynthesizer {
    params: VehicleParams,
    torque_limits: TorqueLimits,
    angle_limit_up: AngleRateLimit,
    angle_limit_down: AngleRateLimit,

    frame: u64,

    last_steer: i32,
    last_angle: f64,
    steer_rate_counter: u32,

    pid: PidController,
    aego: FirstOrderFilter,
    error_rate: FirstOrderFilter,
    prev_error: f64,
    pitch: FirstOrderFilter,
    accel_cmd_filter: FirstOrderFilter,
    accel_compensation: FirstOrderFilter,
    prev_accel: f64,
    accel: f64,

    permit_braking: bool,
    last_brake_frame: u64,
    standstill_req: bool,
    last_standstill: bool,

    alert_active: bool,
    distance_button: bool,

    secoc_lka_counter: u32,
    secoc_lta_counter: u32,
    secoc_prev_reset: u32,
    secoc_mismatch_counter: u32,
}

impl CommandSynthesizer {
    /// 从会话参数创建合成器
    pub fn new(params: &VehicleParams) -> Self {
        let (angle_limit_up, angle_limit_down) = params.angle_rate_limits();
        // 加速度误差校正在延迟滤波后的指令上进行；
        // 混动平台执行器响应快，少垫 0.15s
        let cmd_rc = params.long_actuator_delay + if params.flags.hybrid { 0.0 } else { 0.15 };
        Self {
            torque_limits: params.torque_limits(),
            angle_limit_up,
            angle_limit_down,
            frame: 0,
            last_steer: 0,
            last_angle: 0.0,
            steer_rate_counter: 0,
            pid: PidController::new(
                0.5,
                0.25,
                0.0,
                0.125,
                params.accel_max,
                params.accel_min,
                1.0 / DT_CTRL / 3.0,
            ),
            aego: FirstOrderFilter::new(0.0, 0.25, DT_CTRL),
            error_rate: FirstOrderFilter::new(0.0, 0.25, DT_CTRL * 3.0),
            prev_error: 0.0,
            pitch: FirstOrderFilter::new(0.0, 0.5, DT_CTRL),
            accel_cmd_filter: FirstOrderFilter::new(0.0, cmd_rc, DT_CTRL * 3.0),
            accel_compensation: FirstOrderFilter::new(0.0, 0.5, DT_CTRL * 3.0),
            prev_accel: 0.0,
            accel: 0.0,
            permit_braking: true,
            last_brake_frame: 0,
            standstill_req: false,
            last_standstill: false,
            alert_active: false,
            distance_button: false,
            secoc_lka_counter: 0,
            secoc_lta_counter: 0,
            secoc_prev_reset: 0,
            secoc_mismatch_counter: 0,
            params: params.clone(),
        }
    }

    /// 合成一个周期的出站帧
    ///
    /// 返回实际执行量反馈与待发送帧；转向帧排在加速度帧之前。
    pub fn synthesize(&mut self, intent: &DesiredIntent, state: &VehicleState) -> (AppliedFeedback, FrameBuf) {
        let mut frames = FrameBuf::new();

        let stopping = intent.long_control_state == LongControlState::Stopping;
        // 驾驶员强转矩下让位，避免 EPS 永久故障
        let lat_active = intent.lat_active && state.steering_torque.abs() < MAX_USER_TORQUE;

        self.pitch.update(intent.pitch_rad);

        let (trip, reset) = self.handle_secoc_sync(state);

        // *** 转矩转向 ***
        let new_steer = (intent.steer_torque * self.torque_limits.steer_max as f64).round() as i32;
        let mut apply_steer = apply_meas_steer_torque_limits(
            new_steer,
            self.last_steer,
            state.steering_torque_eps,
            &self.torque_limits,
        );

        let (counter, mut apply_steer_req) = common_fault_avoidance(
            state.steering_rate_deg.abs() >= MAX_STEER_RATE,
            lat_active,
            self.steer_rate_counter,
            MAX_STEER_RATE_FRAMES,
        );
        self.steer_rate_counter = counter;

        if !lat_active {
            apply_steer = 0;
        }

        // *** 角度转向 ***
        let angle_control = self.params.steer_control_type == SteerControlType::Angle;
        if angle_control {
            // 角度路径下转矩指令恒为零
            apply_steer = 0;
            apply_steer_req = false;
            if self.frame % STEER_ANGLE_STEP == 0 {
                // EPS 以转矩传感器角度为基准，补偿学习到的偏移
                let mut apply_angle =
                    intent.steering_angle_deg + state.steering_angle_offset_deg;
                apply_angle = apply_std_steer_angle_limits(
                    apply_angle,
                    self.last_angle,
                    state.v_ego_raw,
                    &self.angle_limit_up,
                    &self.angle_limit_down,
                );
                if !lat_active {
                    apply_angle = state.steering_angle_deg + state.steering_angle_offset_deg;
                }
                self.last_angle = apply_angle.clamp(-MAX_LTA_ANGLE, MAX_LTA_ANGLE);
            }
        }

        self.last_steer = apply_steer;

        let mut steer_frame = steer_torque_command(
            self.frame as u32,
            apply_steer as i16,
            apply_steer_req,
            self.params.flags.secoc,
        );
        if let Some(key) = &self.params.secoc_key {
            if self.params.flags.secoc {
                attach_or_log(key, trip, reset, self.secoc_lka_counter, &mut steer_frame);
                self.secoc_lka_counter += 1;
            }
        }
        frames.push(steer_frame);

        if self.frame % STEER_ANGLE_STEP == 0 {
            let lta_active = lat_active && angle_control;
            // EPS 助力或驾驶员转矩越过阈值时用 TORQUE_WIND_DOWN 卸载，
            // 分别限制最大侧向加速度与实现驾驶员转矩融合
            let full_torque_condition = state.steering_torque_eps.abs()
                < self.torque_limits.steer_max as f64
                && state.steering_torque.abs() < MAX_LTA_DRIVER_TORQUE_ALLOWANCE;
            let torque_wind_down = if lta_active && full_torque_condition { 100 } else { 0 };
            frames.push(angle_steer_command(
                (self.frame / STEER_ANGLE_STEP) as u32,
                self.last_angle,
                lta_active,
                torque_wind_down,
            ));

            if let Some(key) = &self.params.secoc_key {
                if self.params.flags.secoc {
                    let mut aux = angle_steer_aux_command((self.frame / STEER_ANGLE_STEP) as u32);
                    attach_or_log(key, trip, reset, self.secoc_lta_counter, &mut aux);
                    self.secoc_lta_counter += 1;
                    frames.push(aux);
                }
            }
        }

        // *** 纵向 ***

        let prev_aego = self.aego.x;
        self.aego.update(state.a_ego);
        let jerk = (self.aego.x - prev_aego) / DT_CTRL;
        let future_aego = state.a_ego + jerk * 0.5;

        // 进入静止时请求静止保持，平台进入静止态 (8) 或失活后撤销
        if state.standstill
            && !self.last_standstill
            && !self.params.flags.owns_longitudinal
            && !self.params.flags.no_stop_timer
        {
            self.standstill_req = true;
        }
        if state.pcm_acc_status != 8 {
            self.standstill_req = false;
        }
        self.last_standstill = state.standstill;

        let fcw_alert = intent.fcw_alert;
        let steer_alert = intent.steer_required_alert;
        // 低速时始终按有前车处理，否则 ACC 无法接合
        let lead = intent.lead_visible || state.v_ego < 12.0;

        // 按到目标档位为止逐次按距离按键；仅接合状态下按，
        // 避免跳过平台的启动弹窗
        if self.frame % DISTANCE_BUTTON_STEP == 0 && self.params.flags.owns_longitudinal {
            let desired_distance = 4u8.saturating_sub(intent.lead_distance_bars);
            if state.cruise.enabled && state.follow_distance != desired_distance {
                self.distance_button = !self.distance_button;
            } else {
                self.distance_button = false;
            }
        }

        if self.params.flags.owns_longitudinal {
            if self.frame % ACCEL_STEP == 0 {
                let accel = self.run_long_control(intent, state, stopping, future_aego);
                frames.push(accel_command(
                    accel,
                    intent.cancel_request,
                    self.permit_braking,
                    self.standstill_req,
                    lead,
                    state.acc_type,
                    fcw_alert,
                    self.distance_button,
                ));
                self.accel = accel;
            }
        } else if intent.cancel_request {
            // 仅横向控制时也可以用指令帧取消平台巡航
            frames.push(accel_command(
                0.0,
                true,
                true,
                self.standstill_req,
                lead,
                state.acc_type,
                false,
                false,
            ));
        }

        // *** HUD ***

        // HUD 帧低速率发送，但有内容要开始 / 停止显示时立即补发
        let alert = fcw_alert || steer_alert;
        let mut send_ui = false;
        if alert != self.alert_active {
            send_ui = true;
            self.alert_active = alert;
        } else if intent.cancel_request {
            // 强制平台脱开会响难听的故障音，换一个提示音盖过去
            send_ui = true;
        }

        if self.frame % LKAS_HUD_STEP == 0 || send_ui {
            frames.push(ui_command(
                steer_alert,
                intent.cancel_request,
                intent.left_lane_visible,
                intent.right_lane_visible,
                intent.left_lane_depart,
                intent.right_lane_depart,
                intent.enabled,
            ));
        }
        if self.frame % FCW_HUD_STEP == 0 || send_ui {
            frames.push(fcw_command(fcw_alert));
        }

        let feedback = AppliedFeedback {
            steer_torque: apply_steer as f64 / self.torque_limits.steer_max as f64,
            steer_torque_can: apply_steer,
            steering_angle_deg: self.last_angle,
            accel: self.accel,
        };

        self.frame += 1;
        (feedback, frames)
    }

    /// 纵向闭环（每 3 帧一次）
    ///
    /// 平台的内燃机 / 制动执行链响应慢且有补偿回路，本层在
    /// 延迟滤波后的指令与半拍外推的实测加速度之间闭环修正。
    fn run_long_control(
        &mut self,
        intent: &DesiredIntent,
        state: &VehicleState,
        stopping: bool,
        future_aego: f64,
    ) -> f64 {
        // 平台内部的油门指令可能卡在负加速度退绕中，放宽的
        // 速率限幅让它尽快解脱
        let mut accel_cmd = intent.accel;
        if intent.long_active {
            accel_cmd = rate_limit(
                accel_cmd,
                self.prev_accel,
                ACCEL_WINDDOWN_LIMIT,
                ACCEL_WINDUP_LIMIT,
            );
        }
        self.prev_accel = accel_cmd;
        self.accel_cmd_filter.update(accel_cmd);

        let accel_due_to_pitch = self.pitch.x.sin() * ACCELERATION_DUE_TO_GRAVITY;

        if intent.long_active && !state.cruise.standstill {
            let error = accel_cmd - state.a_ego;
            self.error_rate.update((error - self.prev_error) / (DT_CTRL * 3.0));
            self.prev_error = error;

            // 停车进站交给平台自己处理
            if !stopping {
                // 限幅围绕当前指令重定：PID 输出是补偿量
                self.pid.neg_limit = self.params.accel_min - accel_cmd;
                self.pid.pos_limit = self.params.accel_max - accel_cmd;

                let compensation = self.pid.update(
                    self.accel_cmd_filter.x - future_aego,
                    self.error_rate.x,
                    0.0,
                    state.standstill,
                    state.standstill,
                );
                accel_cmd += self.accel_compensation.update(compensation);
            } else {
                self.pid.reset();
                self.accel_compensation.reset(0.0);
            }
        } else {
            self.pid.reset();
            self.accel_cmd_filter.reset(0.0);
            self.accel_compensation.reset(0.0);
        }

        // 制动许可回滞：净请求（含坡道分量）明确为正时撤回许可，
        // 回到明确为负 / 进站 / 失活时恢复；平台自身制动后
        // 两个纵向周期内不撤回
        if state.acc_braking {
            self.last_brake_frame = self.frame;
        }
        let net_request = intent.accel + accel_due_to_pitch;
        if net_request < PERMIT_BRAKING_RESTORE
            || stopping
            || !intent.long_active
            || self.frame - self.last_brake_frame <= 2 * ACCEL_STEP
        {
            self.permit_braking = true;
        } else if net_request > PERMIT_BRAKING_WITHDRAW {
            self.permit_braking = false;
        }

        accel_cmd.clamp(self.params.accel_min, self.params.accel_max)
    }

    /// SecOC 同步处理：复位计数器变化时消息计数器清零，
    /// 并用同步认证码校验密钥。返回当前 (行程, 复位) 计数器。
    fn handle_secoc_sync(&mut self, state: &VehicleState) -> (u32, u32) {
        let Some(sync) = state.secoc_sync else {
            return (0, 0);
        };
        if !self.params.flags.secoc {
            return (sync.trip_counter, sync.reset_counter);
        }

        if sync.reset_counter != self.secoc_prev_reset {
            self.secoc_lka_counter = 0;
            self.secoc_lta_counter = 0;
            self.secoc_prev_reset = sync.reset_counter;

            if let Some(key) = &self.params.secoc_key {
                let expected = secoc::build_sync_code(key, sync.trip_counter, sync.reset_counter);
                if sync.authenticator != expected
                    && self.secoc_mismatch_counter < SECOC_MISMATCH_REPORT_LIMIT
                {
                    tracing::error!(
                        trip = sync.trip_counter,
                        reset = sync.reset_counter,
                        "SecOC synchronization code mismatch, wrong key?"
                    );
                    self.secoc_mismatch_counter += 1;
                }
            }
        }
        (sync.trip_counter, sync.reset_counter)
    }
}

fn attach_or_log(key: &[u8; secoc::KEY_LEN], trip: u32, reset: u32, counter: u32, frame: &mut CanFrame) {
    if let Err(err) = secoc::attach_code(key, trip, reset, counter, frame) {
        tracing::error!(id = frame.id, %err, "failed to attach SecOC code");
    }
}

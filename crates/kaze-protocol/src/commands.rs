//! 出站控制帧构建
//!
//! 把合成器算出的执行量打包成平台期望的字节布局。
//! 所有布局均为大端（Motorola），最后一个字节为平台校验和；
//! 需要 SecOC 认证的帧尾部预留 4 字节认证段，
//! 由 [`secoc::attach_code`](crate::secoc::attach_code) 回填。
//!
//! 数值越界在这里是程序错误：调用方（合成器）负责先把执行量
//! 夹到安全包络内，打包层只做缩放与位域拼装。

use crate::ids::{
    ID_ACCEL, ID_FCW_HUD, ID_LKAS_HUD, ID_STEER_ANGLE, ID_STEER_ANGLE_AUX, ID_STEER_TORQUE,
};
use crate::{CanFrame, i16_to_bytes_be};

/// 角度指令的缩放（deg / LSB）
pub const ANGLE_SCALE: f64 = 0.0573;

/// 加速度指令的缩放（m/s² / LSB）
pub const ACCEL_SCALE: f64 = 0.001;

/// 平台校验和：地址字节、总长度与数据字节求和后取低 8 位
///
/// `payload` 不含校验和字节本身，总长度按含校验和计算。
pub fn platform_checksum(addr: u16, payload: &[u8]) -> u8 {
    let mut sum = (addr >> 8) as u32 + (addr & 0xFF) as u32 + (payload.len() as u32 + 1);
    for b in payload {
        sum += *b as u32;
    }
    (sum & 0xFF) as u8
}

fn with_checksum(id: u16, payload: &[u8], bus: u8) -> CanFrame {
    let mut data = [0u8; 8];
    data[..payload.len()].copy_from_slice(payload);
    data[payload.len()] = platform_checksum(id, payload);
    CanFrame::new(id, &data[..payload.len() + 1], bus)
}

/// 转矩转向指令 (0x2E4)
///
/// 布局（非认证平台，5 字节）：
/// - byte0: bit7 恒 1，bit6-1 计数器，bit0 转矩请求使能
/// - byte1-2: 转矩 (i16, EPS 内部单位)
/// - byte3: 0
/// - byte4: 校验和
///
/// 认证平台改为 8 字节：byte0-3 同上（无校验和），
/// byte4-7 为认证段，由 SecOC 层回填。
pub fn steer_torque_command(counter: u32, steer_torque: i16, steer_request: bool, secoc: bool) -> CanFrame {
    let torque = i16_to_bytes_be(steer_torque);
    let head = [
        0x80 | (((counter & 0x3F) as u8) << 1) | steer_request as u8,
        torque[0],
        torque[1],
        0x00,
    ];
    if secoc {
        // 认证段占据尾部 4 字节，不附加校验和
        CanFrame::new(ID_STEER_TORQUE, &[head[0], head[1], head[2], head[3], 0, 0, 0, 0], 0)
    } else {
        with_checksum(ID_STEER_TORQUE, &head, 0)
    }
}

/// 角度转向指令 (0x191)
///
/// 布局（8 字节）：
/// - byte0: bit7 恒 1，bit5-0 计数器
/// - byte1: bit0 转向请求，bit1 转向请求副位（同值发送）
/// - byte2: 转矩收敛度（0 = 以最大速率卸载转矩，100 = 全转矩）
/// - byte3-4: 目标角度 (i16, 0.0573 deg/LSB)
/// - byte5-6: 0
/// - byte7: 校验和
pub fn angle_steer_command(counter: u32, angle_deg: f64, steer_request: bool, torque_wind_down: u8) -> CanFrame {
    let raw = (angle_deg / ANGLE_SCALE).round() as i16;
    let angle = i16_to_bytes_be(raw);
    let req = steer_request as u8;
    let payload = [
        0x80 | (counter & 0x3F) as u8,
        req | (req << 1),
        torque_wind_down,
        angle[0],
        angle[1],
        0x00,
        0x00,
    ];
    with_checksum(ID_STEER_ANGLE, &payload, 0)
}

/// 角度转向辅助指令 (0x131)
///
/// 认证平台要求与 0x191 配对发送的帧；byte4-7 为认证段。
pub fn angle_steer_aux_command(counter: u32) -> CanFrame {
    CanFrame::new(
        ID_STEER_ANGLE_AUX,
        &[(counter & 0x3F) as u8, 0x00, 0x01, 0x00, 0, 0, 0, 0],
        0,
    )
}

/// 纵向加速度指令 (0x343)
///
/// 布局（8 字节）：
/// - byte0-1: 加速度 (i16, 0.001 m/s²/LSB)
/// - byte2: bit7-6 ACC 类型，bit4 距离按键，bit3 前车显示，
///   bit1 允许制动，bit0 静止释放请求
/// - byte3: bit4 FCW 告警，bit0 取消请求
/// - byte4-6: 0
/// - byte7: 校验和
#[allow(clippy::too_many_arguments)]
pub fn accel_command(
    accel: f64,
    pcm_cancel: bool,
    permit_braking: bool,
    release_standstill: bool,
    lead_visible: bool,
    acc_type: u8,
    fcw_alert: bool,
    distance_button: bool,
) -> CanFrame {
    let raw = (accel / ACCEL_SCALE).round() as i16;
    let accel_bytes = i16_to_bytes_be(raw);
    let payload = [
        accel_bytes[0],
        accel_bytes[1],
        ((acc_type & 0x3) << 6)
            | (distance_button as u8) << 4
            | (lead_visible as u8) << 3
            | (permit_braking as u8) << 1
            | release_standstill as u8,
        (fcw_alert as u8) << 4 | pcm_cancel as u8,
        0x00,
        0x00,
        0x00,
    ];
    with_checksum(ID_ACCEL, &payload, 0)
}

/// 车道保持 HUD 指令 (0x412)
///
/// 低速率 UI 状态帧，固定节拍发送（告警沿触发时立即补发）。
pub fn ui_command(
    steer_alert: bool,
    sound_beep: bool,
    left_lane_visible: bool,
    right_lane_visible: bool,
    left_lane_depart: bool,
    right_lane_depart: bool,
    engaged: bool,
) -> CanFrame {
    // 车道线字段：2 = 显示，3 = 偏离闪烁，1 = 隐藏
    let lane_code = |visible: bool, depart: bool| -> u8 {
        if depart {
            3
        } else if visible {
            2
        } else {
            1
        }
    };
    let payload = [
        0x01, // SET_ME_X01
        (lane_code(left_lane_visible, left_lane_depart) << 4)
            | lane_code(right_lane_visible, right_lane_depart),
        (engaged as u8) << 7 | (steer_alert as u8) << 6 | (sound_beep as u8) << 5,
        0x00,
        0x00,
        0x00,
        0x00,
    ];
    with_checksum(ID_LKAS_HUD, &payload, 0)
}

/// FCW HUD 指令 (0x411)
pub fn fcw_command(fcw_alert: bool) -> CanFrame {
    let payload = [(fcw_alert as u8) << 4 | 0x01, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00];
    with_checksum(ID_FCW_HUD, &payload, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytes_to_i16_be;

    #[test]
    fn test_platform_checksum() {
        // 0x2E4 -> 0x02 + 0xE4, 总长 5, 数据 [0x80, 0, 0, 0]
        let cs = platform_checksum(0x2E4, &[0x80, 0, 0, 0]);
        assert_eq!(cs, (0x02u32 + 0xE4 + 5 + 0x80) as u8);
    }

    #[test]
    fn test_steer_torque_command_layout() {
        let frame = steer_torque_command(3, -1500, true, false);
        assert_eq!(frame.id, ID_STEER_TORQUE);
        assert_eq!(frame.len, 5);
        assert_eq!(frame.data[0], 0x80 | (3 << 1) | 1);
        assert_eq!(bytes_to_i16_be([frame.data[1], frame.data[2]]), -1500);
        assert_eq!(
            frame.data[4],
            platform_checksum(ID_STEER_TORQUE, &frame.data[..4])
        );
    }

    #[test]
    fn test_steer_torque_command_secoc_reserves_tail() {
        let frame = steer_torque_command(0, 200, true, true);
        assert_eq!(frame.len, 8);
        assert_eq!(&frame.data[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_angle_steer_command_scaling() {
        let frame = angle_steer_command(0, 10.0, true, 100);
        let raw = bytes_to_i16_be([frame.data[3], frame.data[4]]);
        assert_eq!(raw, (10.0f64 / ANGLE_SCALE).round() as i16);
        assert_eq!(frame.data[1], 0b11);
        assert_eq!(frame.data[2], 100);
    }

    #[test]
    fn test_angle_steer_command_inactive() {
        let frame = angle_steer_command(5, 0.0, false, 0);
        assert_eq!(frame.data[1], 0);
    }

    #[test]
    fn test_accel_command_scaling_and_flags() {
        let frame = accel_command(-3.5, false, true, false, true, 1, false, false);
        let raw = bytes_to_i16_be([frame.data[0], frame.data[1]]);
        assert_eq!(raw, -3500);
        // ACC 类型 1，前车显示，允许制动
        assert_eq!(frame.data[2], (1 << 6) | (1 << 3) | (1 << 1));
        assert_eq!(frame.data[3], 0);
    }

    #[test]
    fn test_accel_command_cancel() {
        let frame = accel_command(0.0, true, true, false, false, 1, false, false);
        assert_eq!(frame.data[3] & 0x01, 1);
    }

    #[test]
    fn test_ui_command_lane_codes() {
        let frame = ui_command(false, false, true, false, false, true, true);
        // 左：显示(2)，右：偏离(3)
        assert_eq!(frame.data[1], (2 << 4) | 3);
        assert_eq!(frame.data[2] & 0x80, 0x80);
    }

    proptest::proptest! {
        /// 任意转矩与计数器下，帧尾校验和始终与载荷一致
        #[test]
        fn steer_frame_checksum_consistent(torque in -1500i16..=1500, counter in 0u32..64) {
            let frame = steer_torque_command(counter, torque, true, false);
            let payload = &frame.data[..frame.len as usize - 1];
            proptest::prop_assert_eq!(
                frame.data[frame.len as usize - 1],
                platform_checksum(frame.id, payload)
            );
        }
    }

    #[test]
    fn test_fcw_command() {
        let on = fcw_command(true);
        let off = fcw_command(false);
        assert_eq!(on.data[0] & 0x10, 0x10);
        assert_eq!(off.data[0] & 0x10, 0x00);
    }
}

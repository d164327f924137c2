//! SecOC 消息认证（截断 MAC）
//!
//! 认证平台要求关键控制帧携带认证段，防止重放与伪造。
//! 认证码由共享密钥与三个单调递增的计数器导出：
//!
//! - 行程计数器 (trip)：每次上电行程递增，由总线同步帧下发
//! - 复位计数器 (reset)：行程内复位递增，由总线同步帧下发
//! - 消息计数器 (msg)：每种认证消息各自独立持有，逐帧递增
//!
//! 本模块无状态：计数器的生命周期由调用方（合成器）持有，
//! 每种消息类型一个独立字段，避免跨类型串号。
//!
//! # 构造
//!
//! `code = SHA-256(key ‖ trip ‖ reset ‖ msg ‖ addr ‖ payload[..4])[..3]`
//!
//! 所有整数按大端序列化。认证段占帧尾 4 字节：
//! `[msg 低 8 位, code0, code1, code2]`。

use crate::{CanFrame, ProtocolError};
use sha2::{Digest, Sha256};

/// 共享密钥长度（字节）
pub const KEY_LEN: usize = 16;

/// 认证段长度（字节）：1 字节计数器 + 3 字节认证码
pub const AUTH_TAIL_LEN: usize = 4;

/// 截断认证码长度（字节）
pub const CODE_LEN: usize = 3;

/// 计算一条出站帧的截断认证码
///
/// 认证覆盖帧地址与认证段之前的全部载荷；
/// 给定相同计数器与载荷，结果完全确定。
pub fn compute_code(
    key: &[u8; KEY_LEN],
    trip_counter: u32,
    reset_counter: u32,
    msg_counter: u32,
    frame: &CanFrame,
) -> [u8; CODE_LEN] {
    let payload = frame.data_slice();
    let auth_end = payload.len().saturating_sub(AUTH_TAIL_LEN);

    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(trip_counter.to_be_bytes());
    hasher.update(reset_counter.to_be_bytes());
    hasher.update(msg_counter.to_be_bytes());
    hasher.update(frame.id.to_be_bytes());
    hasher.update(&payload[..auth_end]);
    let digest = hasher.finalize();

    [digest[0], digest[1], digest[2]]
}

/// 计算周期同步握手的期望认证码（24 位）
///
/// 总线的同步帧携带此码；与本地计算值持续不一致
/// 强烈暗示密钥错误。
pub fn build_sync_code(key: &[u8; KEY_LEN], trip_counter: u32, reset_counter: u32) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.update(trip_counter.to_be_bytes());
    hasher.update(reset_counter.to_be_bytes());
    let digest = hasher.finalize();

    u32::from_be_bytes([0, digest[0], digest[1], digest[2]])
}

/// 把认证段写入帧尾
///
/// 帧必须是预留了 4 字节尾部的 8 字节帧；
/// 更短的帧说明打包层用错了布局，视为构建错误。
pub fn attach_code(
    key: &[u8; KEY_LEN],
    trip_counter: u32,
    reset_counter: u32,
    msg_counter: u32,
    frame: &mut CanFrame,
) -> Result<(), ProtocolError> {
    if (frame.len as usize) < AUTH_TAIL_LEN + 1 {
        return Err(ProtocolError::FrameTooShort {
            id: frame.id,
            len: frame.len,
        });
    }

    let code = compute_code(key, trip_counter, reset_counter, msg_counter, frame);
    let tail = frame.len as usize - AUTH_TAIL_LEN;
    let data = frame.data_slice_mut();
    data[tail] = (msg_counter & 0xFF) as u8;
    data[tail + 1..tail + 4].copy_from_slice(&code);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [0x11; KEY_LEN];

    fn test_frame() -> CanFrame {
        CanFrame::new(0x2E4, &[0x81, 0x05, 0xDC, 0x00, 0, 0, 0, 0], 0)
    }

    #[test]
    fn test_compute_code_deterministic() {
        let frame = test_frame();
        let a = compute_code(&KEY, 1, 2, 3, &frame);
        let b = compute_code(&KEY, 1, 2, 3, &frame);
        assert_eq!(a, b);
    }

    #[test]
    fn test_any_single_counter_changes_code() {
        let frame = test_frame();
        let base = compute_code(&KEY, 1, 2, 3, &frame);
        assert_ne!(base, compute_code(&KEY, 2, 2, 3, &frame));
        assert_ne!(base, compute_code(&KEY, 1, 3, 3, &frame));
        assert_ne!(base, compute_code(&KEY, 1, 2, 4, &frame));
    }

    #[test]
    fn test_key_changes_code() {
        let frame = test_frame();
        let other_key = [0x22; KEY_LEN];
        assert_ne!(
            compute_code(&KEY, 1, 2, 3, &frame),
            compute_code(&other_key, 1, 2, 3, &frame)
        );
    }

    #[test]
    fn test_payload_changes_code() {
        let a = compute_code(&KEY, 1, 2, 3, &test_frame());
        let mut other = test_frame();
        other.data[1] ^= 0xFF;
        assert_ne!(a, compute_code(&KEY, 1, 2, 3, &other));
    }

    #[test]
    fn test_code_ignores_auth_tail() {
        // 认证段自身不参与认证，回填后码不变
        let clean = test_frame();
        let mut attached = clean;
        attach_code(&KEY, 1, 2, 3, &mut attached).unwrap();
        assert_eq!(
            compute_code(&KEY, 1, 2, 3, &clean),
            compute_code(&KEY, 1, 2, 3, &attached)
        );
    }

    #[test]
    fn test_attach_code_layout() {
        let mut frame = test_frame();
        attach_code(&KEY, 7, 8, 0x1A2, &mut frame).unwrap();
        let code = compute_code(&KEY, 7, 8, 0x1A2, &frame);
        assert_eq!(frame.data[4], 0xA2); // 计数器低 8 位
        assert_eq!(&frame.data[5..8], &code);
    }

    #[test]
    fn test_attach_code_rejects_short_frame() {
        let mut frame = CanFrame::new(0x2E4, &[1, 2, 3], 0);
        assert!(attach_code(&KEY, 0, 0, 0, &mut frame).is_err());
    }

    #[test]
    fn test_sync_code_counter_sensitivity() {
        let base = build_sync_code(&KEY, 10, 20);
        assert_eq!(base, build_sync_code(&KEY, 10, 20));
        assert_ne!(base, build_sync_code(&KEY, 11, 20));
        assert_ne!(base, build_sync_code(&KEY, 10, 21));
        assert!(base <= 0x00FF_FFFF);
    }
}

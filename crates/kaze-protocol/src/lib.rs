//! # Kaze Protocol
//!
//! 车载 CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: CAN 地址与发送节拍常量
//! - `signals`: 每个控制周期的信号快照（上游总线解析器的输出）
//! - `commands`: 出站控制帧构建（转向 / 加速 / HUD）
//! - `secoc`: 消息认证码（截断 MAC）计算
//!
//! ## 字节序
//!
//! 协议使用 Motorola (MSB) 高位在前（大端字节序）。
//! 本模块提供了字节序转换工具函数。

pub mod commands;
pub mod ids;
pub mod secoc;
pub mod signals;

pub use commands::*;
pub use ids::*;
pub use signals::{SignalSnapshot, SignalSnapshotBuilder};

use thiserror::Error;

/// CAN 2.0 标准帧的统一抽象
///
/// 协议层和收发器层之间的中间抽象：上层只组装 `CanFrame`，
/// 如何把它写到总线由外部收发器决定。
///
/// # 设计特性
///
/// - **Copy trait**：零成本复制，适合高频控制场景（100Hz 控制周期）
/// - **固定 8 字节**：避免堆分配，有效长度由 `len` 标记
/// - **总线编号**：同一整车可能有动力总线 / 摄像头总线等多条总线
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CanFrame {
    /// CAN 地址（11-bit 标准帧）
    pub id: u16,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 总线编号（0 = 动力总线）
    pub bus: u8,
}

impl CanFrame {
    /// 在指定总线上创建标准帧
    pub fn new(id: u16, data: &[u8], bus: u8) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            bus,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取可变数据切片（认证码回填用）
    pub fn data_slice_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len as usize]
    }
}

/// 协议构建错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Frame 0x{id:X} too short for authentication tail ({len} bytes)")]
    FrameTooShort { id: u16, len: u8 },
}

/// 字节序转换工具函数
///
/// 协议使用 Motorola (MSB) 高位在前（大端字节序），
/// 这些函数用于在协议层进行字节序转换。
///
/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// i16 转大端字节序
pub fn i16_to_bytes_be(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}

//! 每个控制周期的信号快照
//!
//! 上游总线解析器（外部协作者）把原始帧解析成
//! `(消息名, 信号名) -> 数值` 的映射后交给核心。
//! 核心每个周期只读取一次快照，不做任何阻塞 IO。
//!
//! # 缺失语义
//!
//! - 从未收到的信号读出 `NaN`（"尚未可知"，而不是 0）
//! - 从未收到的消息视为无效
//! - 所有 NaN 比较恒为 false，因此下游的阈值判断自然落到安全缺省

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct MessageValues {
    valid: bool,
    signals: HashMap<String, f64>,
}

/// 单周期信号快照
///
/// 由 [`SignalSnapshotBuilder`] 构建，构建后只读。
#[derive(Debug, Clone, Default)]
pub struct SignalSnapshot {
    messages: HashMap<String, MessageValues>,
    bus_valid: bool,
}

impl SignalSnapshot {
    /// 创建构建器
    pub fn builder() -> SignalSnapshotBuilder {
        SignalSnapshotBuilder::default()
    }

    /// 读取信号值，缺失时返回 `NaN`
    pub fn value(&self, message: &str, signal: &str) -> f64 {
        self.messages
            .get(message)
            .and_then(|m| m.signals.get(signal))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// 读取布尔信号（非零为真，缺失为假）
    pub fn flag(&self, message: &str, signal: &str) -> bool {
        let v = self.value(message, signal);
        v.is_finite() && v != 0.0
    }

    /// 某条消息本周期是否有效（校验和通过且未超时）
    pub fn message_valid(&self, message: &str) -> bool {
        self.messages.get(message).map(|m| m.valid).unwrap_or(false)
    }

    /// 整条总线本周期是否有效（全部期望消息均在鲜度窗口内）
    pub fn bus_valid(&self) -> bool {
        self.bus_valid
    }
}

/// [`SignalSnapshot`] 构建器
///
/// 解析协作者逐条填入信号值。写入任何信号即默认该消息有效，
/// 可用 [`message_valid`](Self::message_valid) 显式覆盖。
#[derive(Debug, Clone)]
pub struct SignalSnapshotBuilder {
    snapshot: SignalSnapshot,
}

impl Default for SignalSnapshotBuilder {
    fn default() -> Self {
        Self {
            snapshot: SignalSnapshot {
                messages: HashMap::new(),
                bus_valid: true,
            },
        }
    }
}

impl SignalSnapshotBuilder {
    /// 写入一个信号值
    pub fn signal(mut self, message: &str, signal: &str, value: f64) -> Self {
        let entry = self.snapshot.messages.entry(message.to_owned()).or_insert_with(|| {
            MessageValues {
                valid: true,
                signals: HashMap::new(),
            }
        });
        entry.signals.insert(signal.to_owned(), value);
        self
    }

    /// 显式标记某条消息的有效性
    pub fn message_valid(mut self, message: &str, valid: bool) -> Self {
        self.snapshot
            .messages
            .entry(message.to_owned())
            .or_default()
            .valid = valid;
        self
    }

    /// 标记整条总线的有效性
    pub fn bus_valid(mut self, valid: bool) -> Self {
        self.snapshot.bus_valid = valid;
        self
    }

    /// 完成构建
    pub fn build(self) -> SignalSnapshot {
        self.snapshot
    }
}

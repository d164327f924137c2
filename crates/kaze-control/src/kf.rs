//! 定增益二阶运动学滤波器
//!
//! 对原始轮速做稳态卡尔曼滤波，状态为 [速度, 加速度]：
//!
//! ```text
//! 预测:  v' = v + a·dt
//!        a' = a
//! 校正:  x += K · (测量 − v')
//! ```
//!
//! 增益 K 离线求解（10ms 周期下的稳态解），运行时不再更新协方差，
//! 每周期只有常数次乘加，满足实时预算。
//!
//! 静止判定必须用原始速度而不是滤波速度：滤波器的相位滞后
//! 会推迟静止检出，这在安全相关逻辑里不可接受。

use crate::DT_CTRL;

/// 10ms 周期下的稳态卡尔曼增益
const GAIN: [f64; 2] = [0.12287673, 0.29666309];

/// 速度 / 加速度估计滤波器
#[derive(Debug, Clone)]
pub struct SpeedKf {
    /// 滤波速度 (m/s)
    pub v: f64,
    /// 加速度估计 (m/s²)
    pub a: f64,
    dt: f64,
    initialized: bool,
}

impl Default for SpeedKf {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedKf {
    /// 创建滤波器（控制周期节拍）
    pub fn new() -> Self {
        Self {
            v: 0.0,
            a: 0.0,
            dt: DT_CTRL,
            initialized: false,
        }
    }

    /// 喂入一个原始速度样本，返回 (滤波速度, 加速度估计)
    ///
    /// 首个样本直接吸收为速度状态，避免从 0 起步的斜坡伪象。
    pub fn update(&mut self, v_raw: f64) -> (f64, f64) {
        if !self.initialized {
            self.initialized = true;
            self.v = v_raw;
            self.a = 0.0;
            return (self.v, self.a);
        }

        let v_pred = self.v + self.a * self.dt;
        let innovation = v_raw - v_pred;
        self.v = v_pred + GAIN[0] * innovation;
        self.a += GAIN[1] * innovation;
        (self.v, self.a)
    }
}

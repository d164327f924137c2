//! PID 控制器
//!
//! 纵向闭环使用的比例-积分-微分控制器。与教科书实现的差异：
//!
//! - **限幅可逐周期更新**：调用方每周期围绕当前指令值重定 `pos_limit` /
//!   `neg_limit`，使输出表示"补偿量"而不是绝对执行量
//! - **抗积分饱和**：积分项被夹到"其余各项之和距离限幅的余量"内，
//!   饱和期间不再累积
//! - **接管 (override)**：接管周期内 P/D/F 全部旁路，积分项按固定
//!   速率缓慢退绕，接管解除时输出无跳变

/// PID 控制器
#[derive(Debug, Clone)]
pub struct PidController {
    /// 比例增益
    pub k_p: f64,
    /// 积分增益
    pub k_i: f64,
    /// 微分增益
    pub k_d: f64,
    /// 前馈增益
    pub k_f: f64,

    /// 输出上限（调用方可逐周期更新）
    pub pos_limit: f64,
    /// 输出下限（调用方可逐周期更新）
    pub neg_limit: f64,

    i: f64,
    i_rate: f64,
    i_unwind_rate: f64,
    control: f64,
}

impl PidController {
    /// 创建控制器
    ///
    /// - `rate`: 调用频率 (Hz)，积分与退绕速率按它归一
    pub fn new(k_p: f64, k_i: f64, k_f: f64, k_d: f64, pos_limit: f64, neg_limit: f64, rate: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            k_f,
            pos_limit,
            neg_limit,
            i: 0.0,
            i_rate: 1.0 / rate,
            i_unwind_rate: 0.3 / rate,
            control: 0.0,
        }
    }

    /// 一次控制更新
    ///
    /// - `error`: 目标与测量的偏差
    /// - `error_rate`: 偏差变化率（由调用方滤波后提供）
    /// - `feedforward`: 前馈量
    /// - `freeze_integrator`: 为真时积分项保持不变
    /// - `override_active`: 为真时旁路 P/D/F，积分缓慢退绕
    pub fn update(
        &mut self,
        error: f64,
        error_rate: f64,
        feedforward: f64,
        freeze_integrator: bool,
        override_active: bool,
    ) -> f64 {
        if override_active {
            if self.i.abs() <= self.i_unwind_rate {
                self.i = 0.0;
            } else {
                self.i -= self.i_unwind_rate * self.i.signum();
            }
            self.control = self.i.clamp(self.neg_limit, self.pos_limit);
            return self.control;
        }

        let p = error * self.k_p;
        let d = error_rate * self.k_d;
        let f = feedforward * self.k_f;

        if !freeze_integrator {
            self.i += error * self.k_i * self.i_rate;
            // 积分项只允许占用其余各项留下的限幅余量
            let control_no_i = (p + d + f).clamp(self.neg_limit, self.pos_limit);
            self.i = self
                .i
                .clamp(self.neg_limit - control_no_i, self.pos_limit - control_no_i);
        }

        self.control = (p + self.i + d + f).clamp(self.neg_limit, self.pos_limit);
        self.control
    }

    /// 当前积分项（调试 / 测试用）
    pub fn integral(&self) -> f64 {
        self.i
    }

    /// 最近一次输出
    pub fn control(&self) -> f64 {
        self.control
    }

    /// 清零积分与输出历史（闭环失活时调用，避免重新接合时输出陈旧值）
    pub fn reset(&mut self) {
        self.i = 0.0;
        self.control = 0.0;
    }
}

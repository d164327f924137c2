//! 单极点低通滤波器（指数平滑）
//!
//! `x' = x + α(input − x)`，α 由时间常数与更新周期导出。
//!
//! # 未初始化哨兵态
//!
//! "从未更新过"与"更新到 0"是两种不同状态：
//! 角度偏移估计等调用方在滤波器首次喂入样本之前不得信任其值。
//! 用 `initialized` 标志显式区分，而不是用 NaN 哨兵做算术。

/// 单极点低通滤波器
#[derive(Debug, Clone)]
pub struct FirstOrderFilter {
    /// 当前滤波值
    pub x: f64,
    alpha: f64,
    dt: f64,
    initialized: bool,
}

impl FirstOrderFilter {
    /// 创建已初始化的滤波器
    ///
    /// - `x0`: 初始值
    /// - `rc`: 时间常数（秒）
    /// - `dt`: 更新周期（秒）
    pub fn new(x0: f64, rc: f64, dt: f64) -> Self {
        let mut f = Self {
            x: x0,
            alpha: 0.0,
            dt,
            initialized: true,
        };
        f.update_alpha(rc);
        f
    }

    /// 创建未初始化的滤波器：首次 `update` 直接吸收输入值
    pub fn uninitialized(rc: f64, dt: f64) -> Self {
        let mut f = Self::new(0.0, rc, dt);
        f.initialized = false;
        f
    }

    /// 重设时间常数（周期不变）
    pub fn update_alpha(&mut self, rc: f64) {
        self.alpha = self.dt / (rc + self.dt);
    }

    /// 喂入一个样本，返回新的滤波值
    pub fn update(&mut self, sample: f64) -> f64 {
        if self.initialized {
            self.x = (1.0 - self.alpha) * self.x + self.alpha * sample;
        } else {
            self.initialized = true;
            self.x = sample;
        }
        self.x
    }

    /// 滤波值是否已可信（至少吸收过一个样本）
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// 强制回到指定值（保持已初始化状态）
    pub fn reset(&mut self, x0: f64) {
        self.x = x0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_to_constant_input() {
        let mut f = FirstOrderFilter::new(0.0, 0.1, 0.01);
        for _ in 0..1000 {
            f.update(5.0);
        }
        assert!((f.x - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_uninitialized_absorbs_first_sample() {
        let mut f = FirstOrderFilter::uninitialized(60.0, 0.01);
        assert!(!f.initialized());
        f.update(3.7);
        assert!(f.initialized());
        // 长时间常数下首个样本仍被完整吸收
        assert_eq!(f.x, 3.7);
    }

    #[test]
    fn test_zero_is_distinct_from_uninitialized() {
        let mut f = FirstOrderFilter::uninitialized(1.0, 0.01);
        f.update(0.0);
        assert!(f.initialized());
        assert_eq!(f.x, 0.0);
    }

    #[test]
    fn test_update_alpha_changes_response() {
        let mut slow = FirstOrderFilter::new(0.0, 1.0, 0.01);
        let mut fast = FirstOrderFilter::new(0.0, 0.01, 0.01);
        slow.update(1.0);
        fast.update(1.0);
        assert!(fast.x > slow.x);
    }

    #[test]
    fn test_reset_keeps_initialized() {
        let mut f = FirstOrderFilter::new(2.0, 0.5, 0.01);
        f.reset(0.0);
        assert!(f.initialized());
        assert_eq!(f.x, 0.0);
    }
}

//! 控制会话
//!
//! 把解码器与合成器装配成驱动边界的单一入口：
//! 每个控制周期调用一次 [`ControlSession::run_cycle`]，
//! 先解码后合成，全程同步、无 IO、无阻塞。
//! 帧的实际收发由外部收发器协作者负责。

use crate::decoder::StateDecoder;
use crate::error::VehicleError;
use crate::intent::{AppliedFeedback, DesiredIntent};
use crate::params::VehicleParams;
use crate::state::VehicleState;
use crate::synthesizer::{CommandSynthesizer, FrameBuf};
use kaze_protocol::SignalSnapshot;

/// 单周期输出
#[derive(Debug)]
pub struct CycleOutput {
    /// 本周期的规范化车辆状态
    pub state: VehicleState,
    /// 实际施加的执行量
    pub feedback: AppliedFeedback,
    /// 待发送的出站帧（转向帧在前）
    pub frames: FrameBuf,
}

/// 控制会话
///
/// 参数在构建时校验并冻结，整个行程不可变。
pub struct ControlSession {
    decoder: StateDecoder,
    synthesizer: CommandSynthesizer,
    params: VehicleParams,
}

impl ControlSession {
    /// 用校验过的参数构建会话
    ///
    /// 参数不变量违例（空断点表、倒置加速度界、缺失 SecOC 密钥）
    /// 在这里中止，运行期不再出错。
    pub fn new(params: VehicleParams) -> Result<Self, VehicleError> {
        params.validate()?;
        Ok(Self {
            decoder: StateDecoder::new(&params),
            synthesizer: CommandSynthesizer::new(&params),
            params,
        })
    }

    /// 会话参数
    pub fn params(&self) -> &VehicleParams {
        &self.params
    }

    /// 执行一个控制周期：解码快照，然后合成指令
    pub fn run_cycle(&mut self, snapshot: &SignalSnapshot, intent: &DesiredIntent) -> CycleOutput {
        let state = self.decoder.decode(snapshot);
        let (feedback, frames) = self.synthesizer.synthesize(intent, &state);
        CycleOutput {
            state,
            feedback,
            frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaze_protocol::ids::ID_STEER_TORQUE;

    #[test]
    fn test_invalid_params_abort_construction() {
        let mut params = VehicleParams::default();
        params.accel_min = 5.0;
        assert!(ControlSession::new(params).is_err());
    }

    #[test]
    fn test_cycle_is_deterministic() {
        let snapshot = SignalSnapshot::builder()
            .signal("WHEEL_SPEEDS", "WHEEL_SPEED_FL", 36.0)
            .signal("WHEEL_SPEEDS", "WHEEL_SPEED_FR", 36.0)
            .signal("WHEEL_SPEEDS", "WHEEL_SPEED_RL", 36.0)
            .signal("WHEEL_SPEEDS", "WHEEL_SPEED_RR", 36.0)
            .signal("STEER_TORQUE_SENSOR", "STEER_TORQUE_EPS", 500.0)
            .build();
        let intent = DesiredIntent {
            lat_active: true,
            steer_torque: 0.5,
            ..Default::default()
        };

        let mut a = ControlSession::new(VehicleParams::default()).unwrap();
        let mut b = ControlSession::new(VehicleParams::default()).unwrap();
        for _ in 0..50 {
            let out_a = a.run_cycle(&snapshot, &intent);
            let out_b = b.run_cycle(&snapshot, &intent);
            assert_eq!(out_a.feedback, out_b.feedback);
            assert_eq!(out_a.frames.as_slice(), out_b.frames.as_slice());
        }
    }

    #[test]
    fn test_cycle_emits_steer_frame() {
        let mut session = ControlSession::new(VehicleParams::default()).unwrap();
        let out = session.run_cycle(&SignalSnapshot::builder().build(), &DesiredIntent::default());
        assert!(out.frames.iter().any(|f| f.id == ID_STEER_TORQUE));
    }
}

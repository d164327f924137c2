//! # Kaze Vehicle
//!
//! 车辆 CAN 接口核心：状态解码 + 指令合成
//!
//! 上游的规划 / 控制层产出抽象的期望意图（转矩、角度、加速度），
//! 本 crate 负责双向翻译：
//!
//! - [`StateDecoder`]：把每周期的信号快照解码成规范化的 [`VehicleState`]
//! - [`CommandSynthesizer`]：把 [`DesiredIntent`] 合成为限幅后的出站帧
//! - [`ControlSession`]：驱动边界的装配入口，每周期一次 `run_cycle`
//!
//! ## 周期契约
//!
//! 控制周期 10ms（100Hz）。周期内无阻塞、无 IO、分配有界；
//! 给定相同的输入序列与初始状态，输出逐位可复现。
//! 唯一可失败的路径是会话构建时的参数校验。
//!
//! ## 使用示例
//!
//! ```
//! use kaze_vehicle::{ControlSession, DesiredIntent, VehicleParams};
//! use kaze_protocol::SignalSnapshot;
//!
//! let mut session = ControlSession::new(VehicleParams::default())?;
//! let snapshot = SignalSnapshot::builder().build();
//! let intent = DesiredIntent::default();
//! let out = session.run_cycle(&snapshot, &intent);
//! assert!(!out.frames.is_empty());
//! # Ok::<(), kaze_vehicle::VehicleError>(())
//! ```

pub mod decoder;
pub mod error;
pub mod intent;
pub mod params;
pub mod session;
pub mod state;
pub mod synthesizer;

pub use decoder::StateDecoder;
pub use error::VehicleError;
pub use intent::{AppliedFeedback, DesiredIntent, LongControlState};
pub use params::{PlatformFlags, SteerControlType, VehicleParams};
pub use session::{ControlSession, CycleOutput};
pub use state::{ButtonEvent, CruiseState, GearShifter, SecocSync, VehicleState};
pub use synthesizer::{CommandSynthesizer, FrameBuf};

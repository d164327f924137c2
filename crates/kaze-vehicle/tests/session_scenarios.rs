//! 整会话场景测试：快照 → 解码 → 合成 → 出站帧
//!
//! 单元测试覆盖各模块的边界行为，这里验证跨模块的闭环性质：
//! 任意输入下的安全包络、偏移学习对角度指令的贯通、
//! SecOC 计数器全链路、离散按键事件的会话级可见性。

use kaze_protocol::ids::{ID_ACCEL, ID_STEER_ANGLE, ID_STEER_TORQUE};
use kaze_protocol::{SignalSnapshot, SignalSnapshotBuilder, bytes_to_i16_be, commands::ANGLE_SCALE};
use kaze_vehicle::{
    ButtonEvent, ControlSession, DesiredIntent, SteerControlType, VehicleParams,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn driving_snapshot() -> SignalSnapshotBuilder {
    SignalSnapshot::builder()
        .signal("WHEEL_SPEEDS", "WHEEL_SPEED_FL", 54.0)
        .signal("WHEEL_SPEEDS", "WHEEL_SPEED_FR", 54.0)
        .signal("WHEEL_SPEEDS", "WHEEL_SPEED_RL", 54.0)
        .signal("WHEEL_SPEEDS", "WHEEL_SPEED_RR", 54.0)
        .signal("STEER_ANGLE_SENSOR", "STEER_ANGLE", 0.0)
        .signal("STEER_ANGLE_SENSOR", "STEER_FRACTION", 0.0)
        .signal("STEER_ANGLE_SENSOR", "STEER_RATE", 0.0)
        .signal("STEER_TORQUE_SENSOR", "STEER_TORQUE_DRIVER", 0.0)
        .signal("STEER_TORQUE_SENSOR", "STEER_TORQUE_EPS", 0.0)
        .signal("EPS_STATUS", "LKA_STATE", 1.0)
        .signal("PCM_CRUISE", "CRUISE_STATE", 8.0)
        .signal("PCM_CRUISE", "CRUISE_ACTIVE", 1.0)
        .signal("PCM_CRUISE", "GAS_RELEASED", 1.0)
        .signal("PCM_CRUISE_2", "MAIN_ON", 1.0)
        .signal("PCM_CRUISE_2", "SET_SPEED", 60.0)
}

fn engaged_intent() -> DesiredIntent {
    DesiredIntent {
        lat_active: true,
        long_active: true,
        enabled: true,
        lead_distance_bars: 3,
        ..Default::default()
    }
}

#[test]
fn random_intents_never_escape_safety_envelope() {
    init_tracing();
    let mut params = VehicleParams::default();
    params.flags.owns_longitudinal = true;
    let mut session = ControlSession::new(params.clone()).unwrap();

    let mut rng = StdRng::seed_from_u64(0x6B617A65);
    let mut last_torque = 0i32;
    for _ in 0..2000 {
        let mut intent = engaged_intent();
        intent.steer_torque = rng.gen_range(-3.0..3.0);
        intent.accel = rng.gen_range(-50.0..50.0);
        let eps = rng.gen_range(-2000.0..2000.0);
        let out = session.run_cycle(
            &driving_snapshot()
                .signal("STEER_TORQUE_SENSOR", "STEER_TORQUE_EPS", eps)
                .build(),
            &intent,
        );

        let steer = out.frames.iter().find(|f| f.id == ID_STEER_TORQUE).unwrap();
        let torque = bytes_to_i16_be([steer.data[1], steer.data[2]]) as i32;
        assert!(torque.abs() <= 1500);
        assert!((torque - last_torque).abs() <= 25);
        last_torque = torque;

        if let Some(accel) = out.frames.iter().find(|f| f.id == ID_ACCEL) {
            let raw = bytes_to_i16_be([accel.data[0], accel.data[1]]) as f64 * 0.001;
            assert!(raw <= params.accel_max + 0.001);
            assert!(raw >= params.accel_min - 0.001);
        }
    }
}

#[test]
fn learned_offset_flows_into_angle_command() {
    init_tracing();
    let mut params = VehicleParams::default();
    params.steer_control_type = SteerControlType::Angle;
    let mut session = ControlSession::new(params).unwrap();

    // 精角度传感器就绪，相对粗传感器偏移 +2°
    let snapshot = driving_snapshot()
        .signal("STEER_ANGLE_SENSOR", "STEER_ANGLE", 5.0)
        .signal("STEER_TORQUE_SENSOR", "STEER_ANGLE", 7.0)
        .signal("STEER_TORQUE_SENSOR", "STEER_ANGLE_INITIALIZING", 0.0)
        .build();
    let mut intent = engaged_intent();
    intent.steering_angle_deg = 5.0;

    let mut last_raw = 0i16;
    for _ in 0..4000 {
        let out = session.run_cycle(&snapshot, &intent);
        assert!(!out.state.vehicle_sensors_invalid);
        if let Some(frame) = out.frames.iter().find(|f| f.id == ID_STEER_ANGLE) {
            last_raw = bytes_to_i16_be([frame.data[3], frame.data[4]]);
        }
    }
    // 指令角 = 期望角 + 学习到的偏移（EPS 以转矩传感器角度为基准）
    let expected = ((5.0 + 2.0) / ANGLE_SCALE).round() as i16;
    assert_eq!(last_raw, expected);
}

#[test]
fn gap_button_events_surface_through_session() {
    init_tracing();
    let mut session = ControlSession::new(VehicleParams::default()).unwrap();
    let script = [0.0, 1.0, 1.0, 0.0, 1.0];
    let mut presses = 0;
    for value in script {
        let out = session.run_cycle(
            &driving_snapshot().signal("ACC_CONTROL", "DISTANCE", value).build(),
            &DesiredIntent::default(),
        );
        presses += out
            .state
            .button_events
            .iter()
            .filter(|e| **e == ButtonEvent::GapAdjustPressed)
            .count();
    }
    assert_eq!(presses, 2);
}

#[test]
fn secoc_counters_follow_bus_resets_end_to_end() {
    init_tracing();
    let key = [0x5A; 16];
    let mut params = VehicleParams::default();
    params.flags.secoc = true;
    params.secoc_key = Some(key);
    let mut session = ControlSession::new(params).unwrap();

    let sync_snapshot = |reset: f64| {
        driving_snapshot()
            .signal("SECOC_SYNCHRONIZATION", "TRIP_CNT", 2.0)
            .signal("SECOC_SYNCHRONIZATION", "RESET_CNT", reset)
            .signal(
                "SECOC_SYNCHRONIZATION",
                "AUTHENTICATOR",
                kaze_protocol::secoc::build_sync_code(&key, 2, reset as u32) as f64,
            )
            .build()
    };

    let intent = engaged_intent();
    for expected in 0..3u8 {
        let out = session.run_cycle(&sync_snapshot(7.0), &intent);
        let steer = out.frames.iter().find(|f| f.id == ID_STEER_TORQUE).unwrap();
        assert_eq!(steer.len, 8);
        assert_eq!(steer.data[4], expected);
    }

    // 总线复位计数器前进：消息计数器回零
    let out = session.run_cycle(&sync_snapshot(8.0), &intent);
    let steer = out.frames.iter().find(|f| f.id == ID_STEER_TORQUE).unwrap();
    assert_eq!(steer.data[4], 0);
}

#[test]
fn empty_bus_cycle_still_produces_safe_frames() {
    init_tracing();
    let mut params = VehicleParams::default();
    params.flags.owns_longitudinal = true;
    let mut session = ControlSession::new(params).unwrap();

    let mut intent = engaged_intent();
    intent.steer_torque = 1.0;
    intent.accel = 2.0;

    // 空快照：所有信号缺失，解码落到安全缺省，指令仍被限幅
    let out = session.run_cycle(&SignalSnapshot::builder().build(), &intent);
    let steer = out.frames.iter().find(|f| f.id == ID_STEER_TORQUE).unwrap();
    let torque = bytes_to_i16_be([steer.data[1], steer.data[2]]);
    assert!(torque.abs() <= 25);
    assert!(!out.state.standstill);
    assert!(out.state.v_ego == 0.0);
}

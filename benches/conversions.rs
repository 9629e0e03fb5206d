//! Benchmarks for the per-sample hot path
//!
//! Every odometry message is decoded, converted to Euler angles, and turned
//! into display strings. At bridge rates of 30-50 Hz this must stay far
//! below a millisecond.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use groundlink::protocol::BridgeOp;
use groundlink::telemetry::{DerivedTelemetry, Point, TelemetrySnapshot};
use groundlink::test_utils::OdometrySample;
use groundlink::{OdometryMessage, Quaternion, quaternion_to_rpy};
use std::hint::black_box;

fn sample() -> OdometrySample {
    OdometrySample::new()
        .stamp(1_700_000_000, 125_000_000)
        .position(12.0, -4.0, 35.5)
        .orientation(0.02, -0.01, 0.6, 0.8)
        .linear(3.0, 4.0, -0.5)
        .angular(0.0, 0.0, 0.1)
}

fn bench_quaternion_to_rpy(c: &mut Criterion) {
    let q = Quaternion::new(0.02, -0.01, 0.6, 0.8);
    c.bench_function("quaternion_to_rpy", |b| b.iter(|| black_box(quaternion_to_rpy(black_box(q)))));
}

fn bench_decode(c: &mut Criterion) {
    let frame = BridgeOp::Publish { topic: "mavros/local_position/odom".to_string(), msg: sample().to_json() }
        .encode()
        .expect("encode publish op");

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(frame.len() as u64));

    group.bench_function("publish_frame", |b| {
        b.iter(|| black_box(BridgeOp::decode(black_box(&frame)).expect("decode frame")))
    });

    let value = sample().to_json();
    group.bench_function("odometry_message", |b| {
        b.iter(|| {
            black_box(serde_json::from_value::<OdometryMessage>(black_box(value.clone())).expect("decode"))
        })
    });

    group.finish();
}

fn bench_derive_and_display(c: &mut Criterion) {
    let msg: OdometryMessage = serde_json::from_value(sample().to_json()).expect("decode sample");
    let waypoint = Some(Point::new(0.0, 0.0, 30.0));

    c.bench_function("derive_telemetry", |b| {
        b.iter(|| black_box(DerivedTelemetry::from_message(black_box(&msg), waypoint)))
    });

    let mut snapshot = TelemetrySnapshot { waypoint, ..Default::default() };
    snapshot.apply(msg.clone());
    c.bench_function("snapshot_display", |b| b.iter(|| black_box(snapshot.display())));
}

criterion_group!(benches, bench_quaternion_to_rpy, bench_decode, bench_derive_and_display);
criterion_main!(benches);

//! Benchmarks for telemetry verification of captured ticks
//!
//! Measures the cost a test pays per captured tick: decoding, layout checks
//! and CRC-32 recomputation, plus a full reference device tick for scale.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use firmware_harness::checksum::Crc32;
use firmware_harness::test_utils::load_wire_fixture;
use firmware_harness::{Harness, PulseCounterDevice, TransmissionRecord, WireVerifier};
use std::hint::black_box;

fn fixture_records() -> Vec<TransmissionRecord> {
    let fixture = load_wire_fixture("pulse_counters.yaml").expect("wire fixture");
    fixture
        .frames()
        .into_iter()
        .map(|frame| {
            let size = frame.len() as u16;
            TransmissionRecord::new(1, frame, size, 1000)
        })
        .collect()
}

fn bench_crc32(c: &mut Criterion) {
    let data = vec![0xA5u8; 1024];
    let mut group = c.benchmark_group("crc32");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("1k", |b| b.iter(|| black_box(Crc32::checksum(black_box(&data)))));
    group.finish();
}

fn bench_verify_tick(c: &mut Criterion) {
    let records = fixture_records();
    let verifier = WireVerifier::default();

    let mut group = c.benchmark_group("wire_verification");
    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("verify_all_one_tick", |b| {
        b.iter(|| black_box(verifier.verify_all(black_box(&records)).expect("valid tick")))
    });
    group.bench_function("verify_frame_single", |b| {
        b.iter(|| black_box(verifier.verify_frame(black_box(&records[0].payload)).expect("valid frame")))
    });
    group.finish();
}

fn bench_reference_tick(c: &mut Criterion) {
    let harness = Harness::new(PulseCounterDevice::new());
    harness.serial().set_verbose(false);
    harness.init().expect("init");

    c.bench_function("reference_device_tick_and_capture", |b| {
        b.iter(|| {
            harness.tick().expect("tick");
            harness.reset_captures();
        })
    });
}

criterion_group!(benches, bench_crc32, bench_verify_tick, bench_reference_tick);
criterion_main!(benches);

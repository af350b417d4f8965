//! Audio engine benchmarks
//!
//! Measures the per-period passthrough path with synthetic devices.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use pulsar_core::{
    CaptureDevice, DiscardPlayback, PlaybackDevice, SharedAudioBuffer, SignalCapture,
    StreamConfig,
};

fn benchmark_passthrough(c: &mut Criterion) {
    let mut group = c.benchmark_group("passthrough");

    // 10ms, 25ms and 50ms periods at 44.1kHz
    for period_ms in [10u32, 25, 50].iter() {
        let config = StreamConfig::from_period_ms(44100, 2, *period_ms);
        let mut capture = SignalCapture::new(config, 440.0, false);
        let mut playback = DiscardPlayback::new(config.channels);
        let shared = SharedAudioBuffer::new(
            config.frames_per_period as usize,
            config.channels as usize,
        )
        .unwrap();
        let mut period = vec![0i16; config.samples_per_period()];

        group.throughput(Throughput::Elements(config.frames_per_period as u64));
        group.bench_function(format!("period_{}ms", period_ms), |b| {
            b.iter(|| {
                let read = capture.read_period(black_box(&mut period)).unwrap();
                shared.publish(&period).unwrap();
                playback.write_period(&period[..read * 2]).unwrap();
            })
        });
    }

    group.finish();
}

fn benchmark_snapshot(c: &mut Criterion) {
    let config = StreamConfig::default();
    let shared =
        SharedAudioBuffer::new(config.frames_per_period as usize, config.channels as usize)
            .unwrap();

    c.bench_function("shared_snapshot", |b| {
        b.iter(|| black_box(shared.snapshot()));
    });
}

criterion_group!(benches, benchmark_passthrough, benchmark_snapshot);
criterion_main!(benches);

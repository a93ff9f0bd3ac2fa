//! Criterion benchmarks for the screen locator.
//!
//! The locator runs on every captured frame.  Run with:
//! ```bash
//! cargo bench --package touchpilot-core --bench locator_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use touchpilot_core::{Frame, LocatorConfig, ScreenLocator, ThresholdPolicy};

/// A black frame with a bright centered block covering half of each axis.
fn letterboxed(width: u32, height: u32) -> Frame {
    let mut data = vec![0u8; (width * height * 3) as usize];
    for y in height / 4..height * 3 / 4 {
        for x in width / 4..width * 3 / 4 {
            let i = ((y * width + x) * 3) as usize;
            data[i..i + 3].copy_from_slice(&[200, 210, 220]);
        }
    }
    Frame::from_raw(width, height, 3, data).expect("valid frame")
}

fn bench_locate(c: &mut Criterion) {
    let policies = [
        ("otsu", ThresholdPolicy::Otsu),
        (
            "fixed_blur",
            ThresholdPolicy::Fixed {
                level: 60,
                blur_sigma: 1.5,
            },
        ),
    ];

    let mut group = c.benchmark_group("locate");
    for (width, height) in [(640u32, 360u32), (1280, 720), (1920, 1080)] {
        let frame = letterboxed(width, height);
        for (name, policy) in policies {
            let locator = ScreenLocator::new(LocatorConfig {
                policy,
                ..LocatorConfig::default()
            });
            group.bench_with_input(
                BenchmarkId::new(name, format!("{width}x{height}")),
                &frame,
                |b, frame| b.iter(|| locator.locate(black_box(frame))),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_locate);
criterion_main!(benches);

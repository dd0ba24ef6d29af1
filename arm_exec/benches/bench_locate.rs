//! # Target Location Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};

use arm_lib::vision::{locate, HlsBounds};

fn locate_benchmark(c: &mut Criterion) {
    // ---- Build a dummy frame ----

    // Grey background with a blue square, roughly where a target would sit
    let mut frame = RgbImage::from_pixel(640, 480, Rgb([90, 90, 90]));
    for y in 180..300 {
        for x in 260..380 {
            frame.put_pixel(x, y, Rgb([20, 40, 200]));
        }
    }

    let bounds = HlsBounds::new([200.0, 260.0], [20.0, 80.0], [40.0, 100.0]);

    // ---- Benchmark ----

    c.bench_function("locate 640x480", |b| b.iter(|| {
        locate(black_box(&frame), &bounds, 100)
    }));

    let empty = RgbImage::from_pixel(640, 480, Rgb([90, 90, 90]));
    c.bench_function("locate 640x480 no target", |b| b.iter(|| {
        locate(black_box(&empty), &bounds, 100)
    }));
}

criterion_group!(benches, locate_benchmark);
criterion_main!(benches);

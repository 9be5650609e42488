//! Criterion benchmarks for frame pack and unpack throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vidpak::{PackContext, PixelLayout};

/// Generate a smooth gradient frame of the specified size
fn generate_gradient_frame(width: usize, height: usize) -> Vec<u16> {
    let mut data = vec![0u16; width * height];
    for y in 0..height {
        for x in 0..width {
            data[y * width + x] = (((x + y) * 4095) / (width + height - 2)) as u16;
        }
    }
    data
}

/// Generate a deterministic sensor-like frame: a gradient with a little
/// low-amplitude noise on top
fn generate_sensor_frame(width: usize, height: usize) -> Vec<u16> {
    let mut state = 0x9E3779B97F4A7C15u64;
    let mut data = generate_gradient_frame(width, height);
    for p in data.iter_mut() {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        *p = (*p + ((state >> 60) as u16)) & 0x0FFF;
    }
    data
}

fn benchmark_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");

    let sizes: &[(usize, usize, &str)] = &[
        (256, 256, "256x256"),
        (512, 512, "512x512"),
        (1024, 1024, "1024x1024"),
    ];

    for &(width, height, label) in sizes {
        group.throughput(Throughput::Bytes((width * height * 2) as u64));

        let frame = generate_sensor_frame(width, height);
        let mut ctx = PackContext::new(width, height, 12, 64, 64).unwrap();
        let mut packed = vec![0u8; ctx.max_packed_size()];

        group.bench_with_input(BenchmarkId::new("sensor", label), &frame, |b, frame| {
            b.iter(|| {
                ctx.pack(black_box(frame), PixelLayout::contiguous(width), &mut packed)
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack");

    let sizes: &[(usize, usize, &str)] = &[
        (256, 256, "256x256"),
        (512, 512, "512x512"),
        (1024, 1024, "1024x1024"),
    ];

    for &(width, height, label) in sizes {
        group.throughput(Throughput::Bytes((width * height * 2) as u64));

        let frame = generate_sensor_frame(width, height);
        let mut ctx = PackContext::new(width, height, 12, 64, 64).unwrap();
        let mut packed = vec![0u8; ctx.max_packed_size()];
        let n = ctx
            .pack(&frame, PixelLayout::contiguous(width), &mut packed)
            .unwrap();
        packed.truncate(n);

        let mut output = vec![0u16; width * height];
        group.bench_with_input(BenchmarkId::new("sensor", label), &packed, |b, packed| {
            b.iter(|| {
                ctx.unpack(black_box(packed), &mut output, PixelLayout::contiguous(width))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn benchmark_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");

    let sizes: &[(usize, usize, &str)] = &[(256, 256, "256x256"), (512, 512, "512x512")];

    for &(width, height, label) in sizes {
        group.throughput(Throughput::Bytes((width * height * 2) as u64));

        let frame = generate_gradient_frame(width, height);
        let mut ctx = PackContext::new(width, height, 12, 64, 64).unwrap();
        let mut packed = vec![0u8; ctx.max_packed_size()];
        let mut output = vec![0u16; width * height];

        group.bench_with_input(BenchmarkId::new("gradient", label), &frame, |b, frame| {
            b.iter(|| {
                let n = ctx
                    .pack(black_box(frame), PixelLayout::contiguous(width), &mut packed)
                    .unwrap();
                ctx.unpack(&packed[..n], &mut output, PixelLayout::contiguous(width))
                    .unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_pack, benchmark_unpack, benchmark_roundtrip);
criterion_main!(benches);

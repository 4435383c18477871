//! Benchmarks for the CPU reference and GPU two-pass resamplers.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sigscope::gpu::SpectrogramRenderer;
use sigscope::resample::{cpu, Quality};
use sigscope::signal::{synth, CropWindow, LuminanceTexture, Placement};
use sigscope::RendererConfig;

fn texture(width: u32, height: u32) -> Option<LuminanceTexture> {
    LuminanceTexture::new(synth::chirp_grid(width, height), width, height, Placement::default()).ok()
}

fn full_crop(texture: &LuminanceTexture) -> CropWindow {
    CropWindow {
        left: 0.0,
        top: 0.0,
        width: texture.width() as f64,
        height: texture.height() as f64,
    }
}

fn bench_cpu_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("CPU Resample");
    let Some(source) = texture(1024, 256) else {
        return;
    };
    let crop = full_crop(&source);

    for (width, height, name) in [(256, 64, "downsample_4x"), (1024, 256, "identity"), (2048, 512, "upsample_2x")] {
        for quality in [Quality::Bilinear, Quality::Lanczos3] {
            group.bench_function(BenchmarkId::new(format!("{quality:?}"), name), |b| {
                b.iter(|| {
                    black_box(cpu::resample(&source, &crop, width, height, quality, None).ok());
                });
            });
        }
    }

    group.finish();
}

fn bench_gpu_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("GPU Resample");

    let mut renderer = match pollster::block_on(SpectrogramRenderer::headless(RendererConfig::default())) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Skipping GPU benchmarks: {}", e);
            return;
        }
    };
    let Some(source) = texture(4096, 512) else {
        return;
    };
    let crop = full_crop(&source);

    for (width, height, name) in [(800, 200, "800x200"), (1920, 400, "1920x400")] {
        for quality in [Quality::Bilinear, Quality::Lanczos3] {
            group.bench_function(BenchmarkId::new(format!("{quality:?}"), name), |b| {
                b.iter(|| {
                    black_box(renderer.resample_to_vec(&source, &crop, width, height, quality).ok());
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_cpu_resample, bench_gpu_resample);
criterion_main!(benches);

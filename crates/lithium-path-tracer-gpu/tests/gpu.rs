//! Needs a gpu adapter, run with `cargo test -- --ignored`.

use glam::Vec3;
use lithium_path_tracer::{CameraConfig, CpuBackend, PathTracer, RenderConfig, Sky, SphereScene};
use lithium_path_tracer_gpu::WgpuBackend;
use lithium_wgpu::Context;

fn camera() -> CameraConfig {
    CameraConfig::new(Vec3::new(0.0, 1.0, 4.0), Vec3::new(0.0, 0.5, 0.0), 40.0)
}

fn gpu_tracer(scene: &SphereScene) -> PathTracer<WgpuBackend> {
    let ctx = Context::init_blocking().unwrap();
    PathTracer::new(WgpuBackend::new(ctx, scene))
}

#[test]
#[ignore]
fn misses_return_the_background() {
    let background = Vec3::new(0.25, 0.5, 0.75);
    let film = gpu_tracer(&SphereScene::new(Sky::constant(background)))
        .render(&RenderConfig::new(4, 4, 1, 0), &camera())
        .unwrap();

    for pixel in film.pixels() {
        assert!(pixel.truncate().abs_diff_eq(background, 1e-6), "{pixel}");
    }
}

#[test]
#[ignore]
fn matches_the_cpu_backend() {
    let scene = SphereScene::showcase();
    let config = RenderConfig::new(16, 9, 4, 3).with_seed(3);

    let gpu = gpu_tracer(&scene).render(&config, &camera()).unwrap();
    let cpu = PathTracer::new(CpuBackend::new(scene))
        .render(&config, &camera())
        .unwrap();

    // Transcendentals differ between host and device, so paths may diverge
    // after a bounce. Compare the image mean rather than single pixels.
    let mean = |pixels: &[glam::Vec4]| {
        pixels.iter().map(|p| p.truncate()).sum::<Vec3>() / pixels.len() as f32
    };
    let (gpu_mean, cpu_mean) = (mean(gpu.pixels()), mean(cpu.pixels()));
    assert!(
        gpu_mean.abs_diff_eq(cpu_mean, 0.1 * cpu_mean.max_element()),
        "{gpu_mean} vs {cpu_mean}"
    );
}

#[test]
#[ignore]
fn batches_and_group_widths_agree() {
    let scene = SphereScene::showcase();
    let config = RenderConfig::new(8, 8, 6, 2);

    let single = gpu_tracer(&scene).render(&config, &camera()).unwrap();
    let ctx = Context::init_blocking().unwrap();
    let batched = PathTracer::new(WgpuBackend::new(ctx, &scene).with_group_width(7))
        .render(&config.with_max_batch_lanes(64 * 2), &camera())
        .unwrap();

    for (a, b) in single.pixels().iter().zip(batched.pixels()) {
        assert!(a.abs_diff_eq(*b, 1e-3 * a.max_element().max(1.0)), "{a} != {b}");
    }
}

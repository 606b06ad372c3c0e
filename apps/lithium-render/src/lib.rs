use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use glam::Vec3;
use lithium::lithium_path_tracer::{
    CameraConfig, CpuBackend, Film, PathTracer, RenderConfig, SphereScene,
};
use lithium::lithium_path_tracer_gpu::WgpuBackend;
use lithium::lithium_wgpu::Context;
use lithium::Lithium;

pub mod export;

use export::{FileExporter, ImageExporter, DEFAULT_GAMMA};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Rayon thread pool
    Cpu,
    /// WGSL compute kernels through wgpu
    Gpu,
}

#[derive(Parser, Debug)]
#[command(version, about = "Renders the showcase scene to an image", long_about = None)]
pub struct Args {
    /// Image width in pixels
    #[arg(long, default_value_t = 480)]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 270)]
    pub height: u32,

    /// Samples per pixel
    #[arg(long, short, default_value_t = 16)]
    pub samples: u32,

    /// Maximum scatter events per path
    #[arg(long, short, default_value_t = 4)]
    pub bounces: u32,

    /// Camera position as x,y,z
    #[arg(long, value_parser = parse_vec3, default_value = "0,1,4")]
    pub origin: Vec3,

    /// Point the camera looks at as x,y,z
    #[arg(long, value_parser = parse_vec3, default_value = "0,0.5,0")]
    pub target: Vec3,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 40.0)]
    pub fov: f32,

    /// Distance to the plane in focus, defaults to the target distance
    #[arg(long)]
    pub focus_distance: Option<f32>,

    /// Lens radius, 0 disables depth of field
    #[arg(long, default_value_t = 0.0)]
    pub aperture: f32,

    #[arg(long, value_enum, default_value_t = Backend::Cpu)]
    pub backend: Backend,

    /// Lanes per group, defaults to the backend's preference
    #[arg(long)]
    pub group_width: Option<u32>,

    #[arg(long, default_value_t = 0)]
    pub seed: u32,

    /// Upper bound on lanes traced at once
    #[arg(long)]
    pub max_batch_lanes: Option<u64>,

    /// Path depth from which Russian roulette may end paths
    #[arg(long)]
    pub russian_roulette: Option<u32>,

    /// Output image, png, bmp, jpg or ppm
    #[arg(long, short, default_value = "render.png")]
    pub output: PathBuf,

    #[arg(long, default_value_t = DEFAULT_GAMMA)]
    pub gamma: f32,

    /// Collect puffin profiling scopes
    #[arg(long, default_value_t = false)]
    pub profile: bool,
}

impl Args {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            width: self.width,
            height: self.height,
            sample_count: self.samples,
            bounce_count: self.bounces,
            seed: self.seed,
            max_batch_lanes: self.max_batch_lanes,
            russian_roulette_depth: self.russian_roulette,
        }
    }

    pub fn camera_config(&self) -> CameraConfig {
        let mut camera = CameraConfig::new(self.origin, self.target, self.fov)
            .with_aperture_radius(self.aperture);
        if let Some(focus_distance) = self.focus_distance {
            camera = camera.with_focus_distance(focus_distance);
        }
        camera
    }
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let components = s
        .split(',')
        .map(|c| c.trim().parse::<f32>().map_err(|e| format!("{c:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    match components[..] {
        [x, y, z] => Ok(Vec3::new(x, y, z)),
        _ => Err(format!("expected x,y,z, got {} components", components.len())),
    }
}

fn render(args: &Args, scene: SphereScene) -> Result<Film> {
    let config = args.render_config();
    let camera = args.camera_config();

    let film = match args.backend {
        Backend::Cpu => {
            let mut backend = CpuBackend::new(scene);
            if let Some(group_width) = args.group_width {
                backend = backend.with_group_width(group_width);
            }
            PathTracer::new(backend).render(&config, &camera)?
        }
        Backend::Gpu => {
            let ctx = Context::init_blocking().context("Failed to initialize gpu")?;
            let mut backend = WgpuBackend::new(ctx, &scene);
            if let Some(group_width) = args.group_width {
                backend = backend.with_group_width(group_width);
            }
            PathTracer::new(backend).render(&config, &camera)?
        }
    };

    Ok(film)
}

pub fn internal_main() -> Result<()> {
    let args = Args::parse();
    let lithium = Lithium::new("Lithium Render");
    lithium.set_profiling(args.profile);

    // Fail on a bad output path before spending time on the render.
    let exporter = FileExporter::new(&args.output, args.gamma)?;

    let film = render(&args, SphereScene::showcase())?;
    lithium.end_frame();

    exporter
        .export(&film)
        .with_context(|| format!("Failed to write {}", exporter.path().display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vectors() {
        assert_eq!(parse_vec3("1, -2.5,3"), Ok(Vec3::new(1.0, -2.5, 3.0)));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,2,x").is_err());
    }

    #[test]
    fn args_map_onto_the_render_configuration() {
        let args = Args::try_parse_from([
            "lithium-render",
            "--width",
            "64",
            "--height",
            "32",
            "-s",
            "8",
            "--bounces",
            "2",
            "--origin",
            "0,0,5",
            "--target",
            "0,0,0",
            "--aperture",
            "0.1",
            "--focus-distance",
            "4",
            "--russian-roulette",
            "3",
            "--backend",
            "gpu",
        ])
        .unwrap();

        let config = args.render_config();
        assert_eq!(config, RenderConfig::new(64, 32, 8, 2).with_russian_roulette_depth(3));
        assert_eq!(config.validate(), Ok(()));

        let camera = args.camera_config();
        assert_eq!(camera.origin, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.focus_distance(), 4.0);
        assert_eq!(camera.aperture_radius, 0.1);
        assert_eq!(args.backend, Backend::Gpu);
    }

    #[test]
    fn renders_a_small_image_on_the_cpu() {
        let args = Args::try_parse_from([
            "lithium-render",
            "--width",
            "8",
            "--height",
            "4",
            "-s",
            "2",
            "--group-width",
            "5",
        ])
        .unwrap();

        let film = render(&args, SphereScene::showcase()).unwrap();
        assert_eq!((film.width(), film.height()), (8, 4));
        assert!(film
            .pixels()
            .iter()
            .all(|p| p.is_finite() && p.min_element() >= 0.0));
    }
}

//! Monte Carlo path tracing as three data parallel kernels over sample lanes.
//!
//! A render spawns one primary ray per (pixel, sample) lane, traces every lane
//! through at most `bounce_count` scatter events and averages the lanes of each
//! pixel into the film. The kernels are written once for the host in this
//! crate and mirrored in WGSL by `lithium-path-tracer-gpu`, both sides share
//! [`FrameConstants`] and [`LaneRecord`] byte for byte.

pub mod accumulator;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod film;
pub mod frame;
pub mod lanes;
pub mod math;
pub mod path_integrator;
pub mod path_tracer;
pub mod sampling;
pub mod scene;
pub mod spawner;

pub use backend::{ComputeBackend, CpuBackend, CpuBuffer, CpuPipeline};
pub use config::RenderConfig;
pub use dispatch::{plan_batches, DispatchDescriptor, Kernel, SampleBatch};
pub use error::{BackendError, ConfigError, RenderError, Stage};
pub use film::Film;
pub use frame::FrameConstants;
pub use lanes::LaneRecord;
pub use path_integrator::PathIntegrator;
pub use path_tracer::PathTracer;
pub use scene::{HitRecord, Material, Ray, Scene, Sky, Sphere, SphereScene};

pub use lithium_camera::{CameraBasis, CameraConfig, CameraError};

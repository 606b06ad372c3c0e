#![doc(html_no_source)]

mod lithium;
pub use lithium::Lithium;

// Reexport all crates
pub use lithium_camera;
pub use lithium_path_tracer;
pub use lithium_path_tracer_gpu;
pub use lithium_wgpu;

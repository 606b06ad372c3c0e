use std::fmt;

use lithium_camera::CameraError;
use thiserror::Error;

/// Invalid input, detected before anything is allocated or dispatched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("image must have at least one pixel, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },
    #[error("image of {width}x{height} pixels does not fit a 32 bit pixel index")]
    ImageTooLarge { width: u32, height: u32 },
    #[error("sample count must be at least 1")]
    NoSamples,
    #[error("a single sample for {pixel_count} pixels needs more lanes than the {max_batch_lanes} that fit a batch")]
    BatchTooSmall { pixel_count: u32, max_batch_lanes: u64 },
}

/// Failure reported by a [`crate::ComputeBackend`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    #[error("failed to compile kernel `{kernel}`: {message}")]
    Compile {
        kernel: &'static str,
        message: String,
    },
    #[error("cannot allocate {requested} bytes for `{label}`, the limit is {limit}")]
    Allocation {
        label: String,
        requested: u64,
        limit: u64,
    },
    #[error("kernel `{kernel}` binds {expected} buffers, got {actual}")]
    Bindings {
        kernel: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("buffer `{label}` holds {size} bytes, kernel `{kernel}` needs {required}")]
    BufferTooSmall {
        kernel: &'static str,
        label: String,
        size: u64,
        required: u64,
    },
    #[error("buffer `{label}` is bound more than once by kernel `{kernel}`")]
    AliasedBinding { kernel: &'static str, label: String },
    #[error("kernel `{kernel}` was built for groups of {expected} lanes, dispatched with {actual}")]
    GroupWidth {
        kernel: &'static str,
        expected: u32,
        actual: u32,
    },
    #[error("kernel `{kernel}` launches {launched} lanes, {required} are active")]
    LaunchTooSmall {
        kernel: &'static str,
        launched: u64,
        required: u64,
    },
    #[error("{group_count} groups do not fit the device dispatch grid")]
    GridTooLarge { group_count: u32 },
    #[error("write of {size} bytes at the start of `{label}` overflows the buffer")]
    WriteOutOfBounds { label: String, size: u64 },
    #[error("read {actual} bytes back from `{label}`, expected at least {expected}")]
    Readback {
        label: String,
        expected: u64,
        actual: u64,
    },
    #[error("device error: {0}")]
    Device(String),
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Kernel compilation and buffer allocation.
    Setup,
    Spawn,
    Trace,
    Accumulate,
    Readback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Setup => "setup",
            Stage::Spawn => "spawn",
            Stage::Trace => "trace",
            Stage::Accumulate => "accumulate",
            Stage::Readback => "readback",
        })
    }
}

/// Terminal failure of a render, no partial image is produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{stage} stage failed: {source}")]
    Backend {
        stage: Stage,
        #[source]
        source: BackendError,
    },
}

impl RenderError {
    pub fn backend(stage: Stage) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::Backend { stage, source }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            RenderError::Config(_) => None,
            RenderError::Backend { stage, .. } => Some(*stage),
        }
    }
}

impl From<CameraError> for RenderError {
    fn from(value: CameraError) -> Self {
        Self::Config(value.into())
    }
}

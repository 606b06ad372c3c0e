use std::fmt;

/// The three kernels of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    Spawn,
    Trace,
    Accumulate,
}

impl Kernel {
    pub const ALL: [Kernel; 3] = [Kernel::Spawn, Kernel::Trace, Kernel::Accumulate];

    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Spawn => "spawn",
            Kernel::Trace => "trace",
            Kernel::Accumulate => "accumulate",
        }
    }

    /// Number of buffers bound by the kernel: frame constants and lanes, plus
    /// the pixel buffer for accumulation.
    pub fn binding_count(&self) -> usize {
        match self {
            Kernel::Spawn | Kernel::Trace => 2,
            Kernel::Accumulate => 3,
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Partition of `lane_count` lanes into groups of `lanes_per_group`.
///
/// The last group may contain lanes past `lane_count`, every kernel has to
/// bounds check its lane index and do nothing for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchDescriptor {
    pub lane_count: u32,
    pub group_count: u32,
    pub lanes_per_group: u32,
}

impl DispatchDescriptor {
    /// `group_width` must be at least 1.
    pub fn new(lane_count: u32, group_width: u32) -> Self {
        debug_assert!(group_width > 0);
        let lanes_per_group = group_width.max(1);

        Self {
            lane_count,
            group_count: lane_count.div_ceil(lanes_per_group),
            lanes_per_group,
        }
    }

    /// Lanes launched including the inactive tail of the last group.
    pub fn launched_lanes(&self) -> u64 {
        self.group_count as u64 * self.lanes_per_group as u64
    }

    /// Folds the group count into a 2D grid for devices that limit a single
    /// dimension to `max_per_dimension` groups. Kernels linearise the group
    /// id as `id.y * count.x + id.x`, so groups past `group_count` only run
    /// inactive lanes. `None` if even the 2D grid cannot hold every group.
    pub fn grid(&self, max_per_dimension: u32) -> Option<(u32, u32)> {
        let max_per_dimension = max_per_dimension.max(1);
        let x = self.group_count.clamp(1, max_per_dimension);
        let y = self.group_count.div_ceil(x).max(1);
        (y <= max_per_dimension).then_some((x, y))
    }
}

/// A window of samples traced together, sized so its lanes fit one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleBatch {
    pub sample_offset: u32,
    pub sample_count: u32,
}

/// Splits `sample_count` samples per pixel into batches of at most
/// `max_batch_lanes / pixel_count` samples. Returns an empty list when a
/// single sample per pixel already exceeds `max_batch_lanes`.
pub fn plan_batches(
    pixel_count: u32,
    sample_count: u32,
    max_batch_lanes: u64,
) -> Vec<SampleBatch> {
    let samples_per_batch = (max_batch_lanes / pixel_count.max(1) as u64)
        .min(sample_count as u64) as u32;
    if samples_per_batch == 0 {
        return Vec::new();
    }

    (0..sample_count)
        .step_by(samples_per_batch as usize)
        .map(|sample_offset| SampleBatch {
            sample_offset,
            sample_count: samples_per_batch.min(sample_count - sample_offset),
        })
        .collect()
}

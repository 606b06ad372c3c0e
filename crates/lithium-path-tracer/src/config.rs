use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel.
    pub sample_count: u32,
    /// Maximum number of scatter events per path, 0 only traces primary rays.
    pub bounce_count: u32,
    pub seed: u32,
    /// Upper bound on lanes traced at once, `None` lets the backend's buffer
    /// limit decide.
    pub max_batch_lanes: Option<u64>,
    /// Depth from which paths are terminated by Russian roulette.
    pub russian_roulette_depth: Option<u32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 270,
            sample_count: 16,
            bounce_count: 4,
            seed: 0,
            max_batch_lanes: None,
            russian_roulette_depth: None,
        }
    }
}

impl RenderConfig {
    pub fn new(width: u32, height: u32, sample_count: u32, bounce_count: u32) -> Self {
        Self {
            width,
            height,
            sample_count,
            bounce_count,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_batch_lanes(mut self, max_batch_lanes: u64) -> Self {
        self.max_batch_lanes = Some(max_batch_lanes);
        self
    }

    pub fn with_russian_roulette_depth(mut self, depth: u32) -> Self {
        self.russian_roulette_depth = Some(depth);
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyImage {
                width: self.width,
                height: self.height,
            });
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(ConfigError::ImageTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        if self.sample_count == 0 {
            return Err(ConfigError::NoSamples);
        }
        if self.max_batch_lanes == Some(0) {
            return Err(ConfigError::BatchTooSmall {
                pixel_count: self.pixel_count(),
                max_batch_lanes: 0,
            });
        }

        Ok(())
    }
}

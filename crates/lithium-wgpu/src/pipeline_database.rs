use anyhow::{anyhow, Result};
use std::{borrow::Cow, collections::HashMap, sync::Arc};

/// Includes a file from the calling crate's `assets/shaders` directory.
#[macro_export]
macro_rules! include_shader_src {
    ($NAME:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/shaders/", $NAME))
    };
}

/// Caches shader modules by source and compute pipelines by label.
pub struct PipelineDatabase {
    shader_modules: HashMap<String, Arc<wgpu::ShaderModule>>,
    compute_pipelines: HashMap<String, Arc<wgpu::ComputePipeline>>,
}

impl Default for PipelineDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineDatabase {
    pub fn new() -> Self {
        Self {
            shader_modules: HashMap::new(),
            compute_pipelines: HashMap::new(),
        }
    }

    pub fn shader_from_src(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        src: &str,
    ) -> Arc<wgpu::ShaderModule> {
        puffin::profile_function!();

        if let Some(module) = self.shader_modules.get(src) {
            return module.clone();
        }

        let module = Arc::new(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(src)),
        }));

        self.shader_modules.insert(src.to_owned(), module.clone());
        module
    }

    pub fn compute_pipeline<F>(
        &mut self,
        device: &wgpu::Device,
        descriptor: wgpu::ComputePipelineDescriptor,
        create_layout_fn: F,
    ) -> Result<Arc<wgpu::ComputePipeline>>
    where
        F: Fn() -> wgpu::PipelineLayout,
    {
        puffin::profile_function!();

        let entry = descriptor
            .label
            .ok_or_else(|| anyhow!("Every pipeline must contain a label!"))?;
        if let Some(pipeline) = self.compute_pipelines.get(entry) {
            return Ok(pipeline.clone());
        }

        let pipeline_layout = create_layout_fn();
        let descriptor = wgpu::ComputePipelineDescriptor {
            layout: Some(&pipeline_layout),
            ..descriptor
        };

        let pipeline = Arc::new(device.create_compute_pipeline(&descriptor));
        log::debug!("Compiled compute pipeline `{}`", entry);

        self.compute_pipelines
            .insert(entry.to_owned(), pipeline.clone());
        Ok(pipeline)
    }

    /// Drops every cached pipeline and module, e.g. after a failed compile.
    pub fn clear(&mut self) {
        self.shader_modules.clear();
        self.compute_pipelines.clear();
    }
}

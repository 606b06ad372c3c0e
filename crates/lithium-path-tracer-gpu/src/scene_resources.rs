use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use lithium_path_tracer::{Material, Sphere, SphereScene};
use lithium_wgpu::wgpu::{self, util::DeviceExt};

use crate::buffer_layout_entry;

pub const MATERIAL_DIFFUSE: u32 = 0;
pub const MATERIAL_CONDUCTOR: u32 = 1;
pub const MATERIAL_DIELECTRIC: u32 = 2;

/// Sphere as read by `trace.wgsl`.
#[derive(Debug, Pod, Clone, Copy, Zeroable, PartialEq)]
#[repr(C)]
pub struct PackedSphere {
    pub center: Vec3,
    pub radius: f32,
    pub albedo: Vec3,
    pub material: u32,
    pub emission: Vec3,
    /// Roughness for conductors, index of refraction for dielectrics.
    pub material_parameter: f32,
}

impl From<&Sphere> for PackedSphere {
    fn from(sphere: &Sphere) -> Self {
        let (albedo, material, material_parameter) = match sphere.material {
            Material::Diffuse { albedo } => (albedo, MATERIAL_DIFFUSE, 0.0),
            Material::Conductor { albedo, roughness } => (albedo, MATERIAL_CONDUCTOR, roughness),
            Material::Dielectric { ior } => (Vec3::ONE, MATERIAL_DIELECTRIC, ior),
        };

        Self {
            center: sphere.center,
            radius: sphere.radius,
            albedo,
            material,
            emission: sphere.emission,
            material_parameter,
        }
    }
}

#[derive(Debug, Pod, Clone, Copy, Zeroable, PartialEq)]
#[repr(C)]
pub struct PackedSky {
    pub horizon: Vec3,
    pub sphere_count: u32,
    pub zenith: Vec3,
    pub _padding0: u32,
}

pub fn pack_scene(scene: &SphereScene) -> (Vec<PackedSphere>, PackedSky) {
    let mut spheres: Vec<PackedSphere> = scene.spheres.iter().map(PackedSphere::from).collect();
    let sky = PackedSky {
        horizon: scene.sky.horizon,
        sphere_count: spheres.len() as u32,
        zenith: scene.sky.zenith,
        _padding0: 0,
    };

    // Zero sized storage bindings are invalid, `sphere_count` excludes the padding.
    if spheres.is_empty() {
        spheres.push(PackedSphere::zeroed());
    }

    (spheres, sky)
}

/// Sphere scene uploaded once, bound as group 1 of the trace kernel.
pub struct SceneResources {
    sphere_count: u32,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl SceneResources {
    pub fn new(scene: &SphereScene, device: &wgpu::Device) -> Self {
        let (spheres, sky) = pack_scene(scene);

        let spheres_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lithium-path-tracer-gpu spheres"),
            contents: bytemuck::cast_slice(&spheres),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let sky_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lithium-path-tracer-gpu sky"),
            contents: bytemuck::bytes_of(&sky),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lithium-path-tracer-gpu scene"),
            entries: &[
                buffer_layout_entry(0, wgpu::BufferBindingType::Storage { read_only: true }),
                buffer_layout_entry(1, wgpu::BufferBindingType::Uniform),
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lithium-path-tracer-gpu scene"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: spheres_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: sky_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            sphere_count: sky.sphere_count,
            bind_group_layout,
            bind_group,
        }
    }

    pub fn sphere_count(&self) -> u32 {
        self.sphere_count
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use lithium_path_tracer::Sky;

    use super::*;

    #[test]
    fn layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<PackedSphere>(), 48);
        assert_eq!(std::mem::size_of::<PackedSky>(), 32);
    }

    #[test]
    fn packs_materials() {
        let scene = SphereScene::new(Sky::constant(Vec3::ONE))
            .with_sphere(Sphere::new(Vec3::ZERO, 1.0, Material::dielectric(1.5)))
            .with_sphere(
                Sphere::new(Vec3::X, 2.0, Material::conductor(Vec3::splat(0.5), 0.25))
                    .with_emission(Vec3::Y),
            );

        let (spheres, sky) = pack_scene(&scene);
        assert_eq!(sky.sphere_count, 2);
        assert_eq!(spheres[0].material, MATERIAL_DIELECTRIC);
        assert_eq!(spheres[0].material_parameter, 1.5);
        assert_eq!(spheres[1].material, MATERIAL_CONDUCTOR);
        assert_eq!(spheres[1].albedo, Vec3::splat(0.5));
        assert_eq!(spheres[1].emission, Vec3::Y);
    }

    #[test]
    fn empty_scene_keeps_a_padding_sphere() {
        let (spheres, sky) = pack_scene(&SphereScene::default());
        assert_eq!(spheres.len(), 1);
        assert_eq!(sky.sphere_count, 0);
    }
}

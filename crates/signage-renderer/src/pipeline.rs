use crate::geometry::MeshVertex;
use crate::scene::{DirectionalLight, SceneObject};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Lights uploaded per draw; extra scene lights are ignored.
pub const MAX_LIGHTS: usize = 4;

/// Per-object uniform data sent to the shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Uniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x: colour influence, y: lighting on, z: has texture, w: light count.
    pub params: [f32; 4],
    /// xyz: direction, w: power.
    pub light_directions: [[f32; 4]; MAX_LIGHTS],
    /// xyz: colour.
    pub light_colors: [[f32; 4]; MAX_LIGHTS],
}

impl Uniforms {
    pub fn new(
        object: &SceneObject,
        lights: &[DirectionalLight],
        view: Mat4,
        projection: Mat4,
    ) -> Self {
        let material = &object.material;
        let mut light_directions = [[0.0; 4]; MAX_LIGHTS];
        let mut light_colors = [[0.0; 4]; MAX_LIGHTS];
        for (i, light) in lights.iter().take(MAX_LIGHTS).enumerate() {
            light_directions[i] = light.direction.extend(light.power).to_array();
            light_colors[i] = light.color.extend(0.0).to_array();
        }

        Self {
            model: object.model_matrix().to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            color: material.color.to_array(),
            params: [
                material.color_influence,
                if material.lighting { 1.0 } else { 0.0 },
                if material.texture.is_some() { 1.0 } else { 0.0 },
                lights.len().min(MAX_LIGHTS) as f32,
            ],
            light_directions,
            light_colors,
        }
    }
}

/// wgpu pipelines for the background feed and the signage.
pub struct RenderPipelines {
    pub objects: wgpu::RenderPipeline,
    pub background: wgpu::RenderPipeline,
    pub uniform_bind_group_layout: wgpu::BindGroupLayout,
    pub texture_bind_group_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
    pub depth_format: wgpu::TextureFormat,
}

impl RenderPipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../assets/shaders/scene.wgsl").into(),
            ),
        });
        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("background_shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../../../assets/shaders/background.wgsl").into(),
            ),
        });

        // Uniforms (matrices, material, lights).
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("uniform_bind_group_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        // Texture + sampler.
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("texture_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let depth_format = wgpu::TextureFormat::Depth32Float;

        let objects_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("objects_pipeline_layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let objects = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("objects_pipeline"),
            layout: Some(&objects_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let background_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("background_pipeline_layout"),
            bind_group_layouts: &[&texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Drawn first, never occludes anything.
        let background = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("background_pipeline"),
            layout: Some(&background_layout),
            vertex: wgpu::VertexState {
                module: &background_shader,
                entry_point: Some("vs_main"),
                buffers: &[MeshVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &background_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_format,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scene_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            objects,
            background,
            uniform_bind_group_layout,
            texture_bind_group_layout,
            sampler,
            depth_format,
        }
    }

    /// Create the uniform bind group for one object.
    pub fn create_uniform_bind_group(
        &self,
        device: &wgpu::Device,
        uniform_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &self.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        })
    }

    /// Create a texture bind group.
    pub fn create_texture_bind_group(
        &self,
        device: &wgpu::Device,
        texture_view: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Depth target matching the surface size.
    pub fn create_depth_texture(
        &self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::plane;
    use crate::scene::{Material, SceneObject};
    use glam::{Quat, Vec3, Vec4};

    fn object(lighting: bool) -> SceneObject {
        SceneObject {
            name: "sign".into(),
            mesh: plane(1.0, 1.0, 1, 1),
            material: Material {
                texture: None,
                color: Vec4::new(1.0, 0.5, 0.0, 1.0),
                color_influence: 0.25,
                lighting,
            },
            position: Vec3::new(0.0, 0.0, -2.0),
            rotation: Quat::IDENTITY,
            animation: None,
        }
    }

    fn light(power: f32) -> DirectionalLight {
        DirectionalLight {
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            power,
        }
    }

    #[test]
    fn uniform_size_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<Uniforms>() % 16, 0);
    }

    #[test]
    fn packs_material_and_lights() {
        let lights = [light(0.8), light(1.0)];
        let u = Uniforms::new(&object(true), &lights, Mat4::IDENTITY, Mat4::IDENTITY);

        assert_eq!(u.color, [1.0, 0.5, 0.0, 1.0]);
        assert_eq!(u.params, [0.25, 1.0, 0.0, 2.0]);
        assert_eq!(u.light_directions[0], [0.0, -1.0, 0.0, 0.8]);
        assert_eq!(u.light_directions[2], [0.0; 4]);
        assert_eq!(u.model[3], [0.0, 0.0, -2.0, 1.0]);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights: Vec<_> = (0..6).map(|i| light(i as f32)).collect();
        let u = Uniforms::new(&object(false), &lights, Mat4::IDENTITY, Mat4::IDENTITY);
        assert_eq!(u.params[3], MAX_LIGHTS as f32);
        assert_eq!(u.params[1], 0.0);
    }
}

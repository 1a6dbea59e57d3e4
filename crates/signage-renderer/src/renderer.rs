use crate::context::RenderContext;
use crate::geometry::{screen_quad, Mesh};
use crate::pipeline::{RenderPipelines, Uniforms};
use crate::scene::Scene;
use crate::texture::{DecodedImage, TextureId, TextureRegistry};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

/// Colour format of every sampled texture.
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// A sampled texture and its bind group.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
    pub size: (u32, u32),
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn new(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_vertex_buffer")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}_index_buffer")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// GPU resources for a single scene object.
struct ObjectGpuResources {
    mesh: MeshBuffers,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture: TextureId,
}

struct BackgroundGpuResources {
    mesh: MeshBuffers,
    texture: TextureId,
}

/// Draws the camera feed and the signage into a surface texture.
pub struct SceneRenderer {
    pipelines: RenderPipelines,
    textures: TextureRegistry<GpuTexture>,
    objects: Vec<ObjectGpuResources>,
    background: Option<BackgroundGpuResources>,
    depth_view: wgpu::TextureView,
}

impl SceneRenderer {
    /// Upload every mesh and texture in `scene`.
    ///
    /// `camera_resolution` sizes the streaming texture the colour feed is
    /// written into.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
        scene: &Scene,
        camera_resolution: (u32, u32),
    ) -> Self {
        let pipelines = RenderPipelines::new(device, color_format);
        let mut textures = TextureRegistry::new();

        // Untextured materials sample this and ignore the result.
        let white = DecodedImage {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        };
        let white_id = textures.insert(upload_image(device, queue, &pipelines, "white", &white));

        let background = scene.background.then(|| {
            let (width, height) = camera_resolution;
            let texture = create_texture(
                device,
                &pipelines,
                "camera_texture",
                width,
                height,
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            );
            BackgroundGpuResources {
                mesh: MeshBuffers::new(device, &screen_quad(), "background"),
                texture: textures.insert(texture),
            }
        });

        let objects = scene
            .objects
            .iter()
            .map(|object| {
                let texture = match &object.material.texture {
                    Some(image) => textures.insert(upload_image(
                        device,
                        queue,
                        &pipelines,
                        &object.name,
                        image,
                    )),
                    None => white_id,
                };

                let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{}_uniform_buffer", object.name)),
                    size: std::mem::size_of::<Uniforms>() as wgpu::BufferAddress,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let uniform_bind_group =
                    pipelines.create_uniform_bind_group(device, &uniform_buffer);

                ObjectGpuResources {
                    mesh: MeshBuffers::new(device, &object.mesh, &object.name),
                    uniform_buffer,
                    uniform_bind_group,
                    texture,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            objects = objects.len(),
            textures = textures.len(),
            "Scene uploaded to GPU"
        );

        let depth_view = pipelines.create_depth_texture(device, surface_size.0, surface_size.1);

        Self {
            pipelines,
            textures,
            objects,
            background,
            depth_view,
        }
    }

    /// Texture the colour camera feed is streamed into.
    pub fn camera_texture_id(&self) -> Option<TextureId> {
        self.background.as_ref().map(|b| b.texture)
    }

    /// Recreate size-dependent targets.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_view = self.pipelines.create_depth_texture(device, width, height);
    }

    /// Write an RGBA8 frame into a texture. Returns `false` (and logs) if the
    /// handle is unknown or the frame does not match the texture size.
    pub fn upload_camera_frame(
        &self,
        queue: &wgpu::Queue,
        id: TextureId,
        data: &[u8],
        width: u32,
        height: u32,
    ) -> bool {
        let Some(target) = self.textures.get(id) else {
            warn!(?id, "Frame for unknown texture");
            return false;
        };
        if target.size != (width, height) || data.len() != (width * height * 4) as usize {
            warn!(
                ?id,
                width,
                height,
                bytes = data.len(),
                expected = ?target.size,
                "Frame does not match camera texture"
            );
            return false;
        }

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        true
    }

    /// Record one frame: background feed, then every scene object as seen
    /// from `ctx.camera`.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        ctx: &RenderContext,
    ) -> wgpu::CommandBuffer {
        let view = ctx.camera.view_matrix();
        let projection = ctx.camera.projection();

        for (object, resources) in ctx.scene.objects.iter().zip(&self.objects) {
            let uniforms = Uniforms::new(object, &ctx.scene.lights, view, projection);
            queue.write_buffer(&resources.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene_render"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(background) = &self.background {
                if let Some(texture) = self.textures.get(background.texture) {
                    pass.set_pipeline(&self.pipelines.background);
                    pass.set_bind_group(0, &texture.bind_group, &[]);
                    background.mesh.draw(&mut pass);
                }
            }

            pass.set_pipeline(&self.pipelines.objects);
            for resources in &self.objects {
                let Some(texture) = self.textures.get(resources.texture) else {
                    continue;
                };
                pass.set_bind_group(0, &resources.uniform_bind_group, &[]);
                pass.set_bind_group(1, &texture.bind_group, &[]);
                resources.mesh.draw(&mut pass);
            }
        }

        encoder.finish()
    }
}

fn create_texture(
    device: &wgpu::Device,
    pipelines: &RenderPipelines,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> GpuTexture {
    let texture = device.create_texture(&texture_descriptor(label, width, height, usage));
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = pipelines.create_texture_bind_group(device, &view);
    GpuTexture {
        texture,
        view,
        bind_group,
        size: (width, height),
    }
}

fn upload_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipelines: &RenderPipelines,
    label: &str,
    image: &DecodedImage,
) -> GpuTexture {
    let texture = device.create_texture_with_data(
        queue,
        &texture_descriptor(label, image.width, image.height, wgpu::TextureUsages::TEXTURE_BINDING),
        wgpu::util::TextureDataOrder::LayerMajor,
        &image.rgba,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = pipelines.create_texture_bind_group(device, &view);
    GpuTexture {
        texture,
        view,
        bind_group,
        size: (image.width, image.height),
    }
}

fn texture_descriptor(
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureDescriptor<'_> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage,
        view_formats: &[],
    }
}

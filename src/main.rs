use anyhow::{Context, Result};
use signage_config::AppConfig;
use signage_feed::{FrameSource, TestPatternFeed};
use signage_renderer::{
    projection_from_intrinsics, FsTextures, PoseTiming, RenderContext, Scene, SceneRenderer,
};
use signage_tracking::TrackingClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Application state.
struct App {
    config: AppConfig,
    tracking: TrackingClient,
    feed: Box<dyn FrameSource>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
}

struct GpuState {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: SceneRenderer,
    context: RenderContext,
    last_frame: Instant,
    frame_count: u64,
}

impl App {
    fn new(config: AppConfig, tracking: TrackingClient, feed: Box<dyn FrameSource>) -> Self {
        Self {
            config,
            tracking,
            feed,
            window: None,
            gpu: None,
        }
    }

    fn init_gpu(&self, window: Arc<Window>) -> Result<GpuState> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;

        let (device, queue, adapter) = pollster::block_on(async {
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .context("No suitable GPU adapter found")?;

            info!(name = adapter.get_info().name, "Using GPU");

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("signage_device"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: Default::default(),
                    },
                    None,
                )
                .await?;

            anyhow::Ok((device, queue, adapter))
        })?;

        let win_size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("Surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: win_size.width.max(1),
            height: win_size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let textures = FsTextures::new(&self.config.assets.texture_root);
        let scene = Scene::from_config(&self.config.scene, &textures);

        let renderer = SceneRenderer::new(
            &device,
            &queue,
            format,
            (surface_config.width, surface_config.height),
            &scene,
            self.feed.resolution(),
        );

        let mut context = RenderContext::new(scene, &self.config.tracking);
        context.set_camera_texture(renderer.camera_texture_id());
        context.on_surface_size_changed(surface_config.width, surface_config.height);

        Ok(GpuState {
            device,
            queue,
            surface,
            surface_config,
            renderer,
            context,
            last_frame: Instant::now(),
            frame_count: 0,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        // Match the colour camera's aspect so the feed is not stretched.
        let intrinsics = self.tracking.intrinsics();
        let attrs = Window::default_attributes()
            .with_title("Signage AR")
            .with_inner_size(PhysicalSize::new(intrinsics.width, intrinsics.height));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!(?e, "Failed to create window");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        match self.init_gpu(window) {
            Ok(gpu) => {
                info!(
                    objects = gpu.context.scene.objects.len(),
                    camera_texture = ?gpu.context.camera_texture_id(),
                    "Application initialized"
                );
                self.gpu = Some(gpu);
            }
            Err(e) => {
                error!(?e, "Failed to initialize rendering");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                // Leave an editable file behind on first run; never replace one.
                if let Err(e) = signage_config::write_config_if_missing(&self.config) {
                    error!(?e, "Failed to write default config");
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    if let Some(gpu) = &mut self.gpu {
                        gpu.surface_config.width = size.width;
                        gpu.surface_config.height = size.height;
                        gpu.surface.configure(&gpu.device, &gpu.surface_config);
                        gpu.renderer.resize(&gpu.device, size.width, size.height);
                        gpu.context.on_surface_size_changed(size.width, size.height);
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == winit::event::ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    event_loop.exit();
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(gpu) = &mut self.gpu {
                    let now = Instant::now();
                    let dt = now - gpu.last_frame;
                    gpu.last_frame = now;

                    // Projection is reset by every resize.
                    if !gpu.context.is_scene_camera_configured() {
                        let tracking = &self.config.tracking;
                        let projection = projection_from_intrinsics(
                            &self.tracking.intrinsics(),
                            tracking.near,
                            tracking.far,
                        );
                        gpu.context.set_projection_matrix(projection);
                        gpu.context.mark_scene_camera_configured();
                        info!(size = ?gpu.context.surface_size(), "Scene camera configured");
                    }

                    // Colour frame first, then the pose that belongs to it.
                    if let Some(id) = gpu.context.camera_texture_id() {
                        match self.feed.try_frame() {
                            Ok(Some(frame)) => {
                                if gpu.renderer.upload_camera_frame(
                                    &gpu.queue,
                                    id,
                                    &frame.data,
                                    frame.width,
                                    frame.height,
                                ) {
                                    gpu.context.set_frame_timestamp(frame.timestamp);
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(?e, "Camera frame unavailable"),
                        }
                    }

                    // A pose captured after the frame on screen waits for its
                    // own frame.
                    if self.tracking.has_new_pose() {
                        match gpu.context.pose_timing(&self.tracking.latest_pose()) {
                            PoseTiming::Early => {}
                            timing => {
                                let pose = self.tracking.take_pose();
                                if timing == PoseTiming::Stale {
                                    debug!(
                                        pose = pose.timestamp,
                                        frame = ?gpu.context.frame_timestamp(),
                                        "Pose older than camera frame"
                                    );
                                }
                                if let Err(e) = gpu.context.update_render_camera_pose(&pose) {
                                    warn!(%e, timestamp = pose.timestamp, "Dropping pose");
                                }
                            }
                        }
                    }

                    gpu.context.scene.advance(dt);

                    let output = match gpu.surface.get_current_texture() {
                        Ok(output) => output,
                        Err(e) => {
                            warn!(?e, "Failed to get surface texture");
                            return;
                        }
                    };
                    let view = output
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());

                    let cmd = gpu
                        .renderer
                        .render(&gpu.device, &gpu.queue, &view, &gpu.context);
                    gpu.queue.submit(std::iter::once(cmd));
                    output.present();

                    gpu.frame_count += 1;
                    if gpu.frame_count % 300 == 0 {
                        debug!(frames = gpu.frame_count, "Render heartbeat");
                    }
                }

                // Request next frame.
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "signage_ar=info,signage_renderer=info,signage_tracking=info".into()
            }),
        )
        .init();

    info!("Signage AR starting");

    // Load config.
    let config = signage_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    info!(
        objects = config.scene.objects.len(),
        handedness = ?config.tracking.handedness,
        validation = ?config.tracking.validation,
        "Config loaded"
    );

    // Connect to tracking (fall back to a fixed pose if the device is absent).
    let intrinsics = config.tracking.intrinsics;
    let tracking = match TrackingClient::connect(&config.tracking.address, intrinsics).await {
        Ok(client) => client,
        Err(e) => {
            warn!(?e, "Tracking not available, using mock (no pose updates)");
            TrackingClient::mock(intrinsics)
        }
    };

    let feed: Box<dyn FrameSource> =
        Box::new(TestPatternFeed::new(intrinsics.width, intrinsics.height));

    // Run the application.
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, tracking, feed);
    event_loop.run_app(&mut app)?;

    Ok(())
}

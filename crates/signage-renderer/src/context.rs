use crate::camera::RenderCamera;
use crate::pose::{self, PoseError};
use crate::scene::Scene;
use crate::texture::TextureId;
use glam::Mat4;
use signage_config::{HandednessCorrection, PoseValidation, TrackingConfig};
use signage_tracking::Pose;

/// How far apart (seconds) a pose and a camera frame may be and still count
/// as the same instant.
pub const FRAME_SYNC_TOLERANCE: f64 = 0.02;

/// Where a pose sits relative to the camera frame on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseTiming {
    /// Same instant as the frame, or the frame carries no tracker time.
    Aligned,
    /// Older than the frame. The best pose available for it.
    Stale,
    /// Captured after the frame on screen; hold it until its frame arrives.
    Early,
}

/// Everything the render thread mutates between frames.
///
/// Not thread-safe by construction: every operation takes `&mut self`, so
/// pose updates, resizes and rendering happen in sequence on one thread.
pub struct RenderContext {
    pub camera: RenderCamera,
    pub scene: Scene,
    correction: HandednessCorrection,
    validation: PoseValidation,
    /// Cleared on every resize; set by the caller once it has applied a
    /// projection for the new surface.
    camera_configured: bool,
    surface_size: (u32, u32),
    camera_texture: Option<TextureId>,
    /// Tracker time of the camera frame currently in the background texture.
    frame_timestamp: Option<f64>,
}

impl RenderContext {
    pub fn new(scene: Scene, tracking: &TrackingConfig) -> Self {
        Self {
            camera: RenderCamera::new(),
            scene,
            correction: tracking.handedness,
            validation: tracking.validation,
            camera_configured: false,
            surface_size: (0, 0),
            camera_texture: None,
            frame_timestamp: None,
        }
    }

    /// Move the render camera to the tracked colour camera pose.
    pub fn update_render_camera_pose(&mut self, pose: &Pose) -> Result<(), PoseError> {
        pose::update_render_camera_pose(&mut self.camera, pose, self.correction, self.validation)
    }

    /// Assign a column-major projection matrix to the camera.
    pub fn set_projection_matrix(&mut self, values: [f32; 16]) {
        self.camera.set_projection(Mat4::from_cols_array(&values));
    }

    pub fn on_surface_size_changed(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
        self.camera_configured = false;
        tracing::debug!(width, height, "Surface resized, camera needs projection");
    }

    pub fn is_scene_camera_configured(&self) -> bool {
        self.camera_configured
    }

    pub fn mark_scene_camera_configured(&mut self) {
        self.camera_configured = true;
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    /// Texture the colour camera feed should be written to, if the
    /// background is set up.
    pub fn camera_texture_id(&self) -> Option<TextureId> {
        self.camera_texture
    }

    pub fn set_camera_texture(&mut self, id: Option<TextureId>) {
        self.camera_texture = id;
    }

    /// Record the tracker time of the frame just written to the camera texture.
    pub fn set_frame_timestamp(&mut self, timestamp: Option<f64>) {
        self.frame_timestamp = timestamp;
    }

    pub fn frame_timestamp(&self) -> Option<f64> {
        self.frame_timestamp
    }

    /// Compare `pose` against the frame on screen.
    pub fn pose_timing(&self, pose: &Pose) -> PoseTiming {
        let Some(frame) = self.frame_timestamp else {
            return PoseTiming::Aligned;
        };
        let delta = pose.timestamp - frame;
        if delta.abs() <= FRAME_SYNC_TOLERANCE {
            PoseTiming::Aligned
        } else if delta < 0.0 {
            PoseTiming::Stale
        } else {
            PoseTiming::Early
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{AssetError, DecodedImage, TextureSource};
    use glam::{Quat, Vec3};
    use signage_config::SceneConfig;
    use std::path::Path;

    struct NoTextures;

    impl TextureSource for NoTextures {
        fn load(&self, path: &Path) -> Result<DecodedImage, AssetError> {
            Err(AssetError::Empty {
                path: path.to_path_buf(),
            })
        }
    }

    fn context() -> RenderContext {
        let scene = Scene::from_config(&SceneConfig::signage(), &NoTextures);
        RenderContext::new(scene, &TrackingConfig::default())
    }

    #[test]
    fn resize_clears_configured_flag() {
        let mut ctx = context();
        ctx.on_surface_size_changed(800, 600);
        assert!(!ctx.is_scene_camera_configured());

        ctx.mark_scene_camera_configured();
        ctx.on_surface_size_changed(1024, 768);
        assert!(!ctx.is_scene_camera_configured());
        assert_eq!(ctx.surface_size(), (1024, 768));
    }

    #[test]
    fn projection_does_not_touch_configured_flag() {
        let mut ctx = context();
        let values = Mat4::perspective_rh(1.0, 1.5, 0.1, 50.0).to_cols_array();

        ctx.set_projection_matrix(values);
        assert!(!ctx.is_scene_camera_configured());

        ctx.mark_scene_camera_configured();
        ctx.set_projection_matrix(values);
        assert!(ctx.is_scene_camera_configured());
        assert_eq!(ctx.camera.projection().to_cols_array(), values);
    }

    #[test]
    fn pose_update_uses_configured_correction() {
        let mut ctx = context();
        let q = Quat::from_rotation_x(0.5);
        ctx.update_render_camera_pose(&Pose::new(q.to_array(), [1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(ctx.camera.rotation(), q.conjugate());
        assert_eq!(ctx.camera.position(), Vec3::new(1.0, 2.0, 3.0));

        let tracking = TrackingConfig {
            handedness: HandednessCorrection::Identity,
            ..TrackingConfig::default()
        };
        let scene = Scene::from_config(&SceneConfig::signage(), &NoTextures);
        let mut ctx = RenderContext::new(scene, &tracking);
        ctx.update_render_camera_pose(&Pose::new(q.to_array(), [0.0; 3]))
            .unwrap();
        assert_eq!(ctx.camera.rotation(), q);
    }

    #[test]
    fn camera_texture_starts_unassigned() {
        let mut ctx = context();
        assert_eq!(ctx.camera_texture_id(), None);
        ctx.set_camera_texture(Some(TextureId(3)));
        assert_eq!(ctx.camera_texture_id(), Some(TextureId(3)));
    }

    #[test]
    fn pose_timing_against_frame() {
        let mut ctx = context();
        let pose = |t: f64| Pose::default().with_timestamp(t);

        // No frame clock: anything goes.
        assert_eq!(ctx.pose_timing(&pose(42.0)), PoseTiming::Aligned);

        ctx.set_frame_timestamp(Some(10.0));
        assert_eq!(ctx.frame_timestamp(), Some(10.0));
        assert_eq!(ctx.pose_timing(&pose(10.0)), PoseTiming::Aligned);
        assert_eq!(ctx.pose_timing(&pose(10.015)), PoseTiming::Aligned);
        assert_eq!(ctx.pose_timing(&pose(9.9)), PoseTiming::Stale);
        assert_eq!(ctx.pose_timing(&pose(10.1)), PoseTiming::Early);

        ctx.set_frame_timestamp(None);
        assert_eq!(ctx.pose_timing(&pose(10.1)), PoseTiming::Aligned);
    }
}

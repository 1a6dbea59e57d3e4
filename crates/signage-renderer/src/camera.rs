use glam::{Mat4, Quat, Vec3, Vec4};
use signage_tracking::CameraIntrinsics;

/// Virtual camera that follows the tracked colour camera.
pub struct RenderCamera {
    /// Orientation in the left-handed storage convention: the inverse of the
    /// camera's world rotation.
    rotation: Quat,
    /// World position (meters).
    position: Vec3,
    projection: Mat4,
}

impl RenderCamera {
    pub fn new() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            // Placeholder until the intrinsics-based projection is applied.
            projection: Mat4::perspective_rh(46.0_f32.to_radians(), 16.0 / 9.0, 0.1, 100.0),
        }
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn set_transform(&mut self, rotation: Quat, position: Vec3) {
        self.rotation = rotation;
        self.position = position;
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    /// View matrix (inverse of camera world transform).
    pub fn view_matrix(&self) -> Mat4 {
        // Stored rotation is already inverted.
        Mat4::from_quat(self.rotation) * Mat4::from_translation(-self.position)
    }
}

impl Default for RenderCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Perspective projection matching a pinhole camera, column-major.
///
/// Off-center principal points shift the frustum so rendered geometry lines
/// up with the camera image. Right-handed, clip depth in `0..1`.
pub fn projection_from_intrinsics(intrinsics: &CameraIntrinsics, near: f32, far: f32) -> [f32; 16] {
    let (n, f) = (near as f64, far as f64);
    let width = intrinsics.width as f64;
    let height = intrinsics.height as f64;

    let x_scale = n / intrinsics.fx;
    let y_scale = n / intrinsics.fy;
    let x_offset = (intrinsics.cx - width / 2.0) * x_scale;
    // Image rows grow downward, clip-space Y grows upward.
    let y_offset = -(intrinsics.cy - height / 2.0) * y_scale;

    let left = x_scale * -width / 2.0 - x_offset;
    let right = x_scale * width / 2.0 - x_offset;
    let bottom = y_scale * -height / 2.0 - y_offset;
    let top = y_scale * height / 2.0 - y_offset;

    frustum_rh(left, right, bottom, top, n, f).to_cols_array()
}

fn frustum_rh(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Mat4 {
    let a = (right + left) / (right - left);
    let b = (top + bottom) / (top - bottom);
    let depth = far / (near - far);

    Mat4::from_cols(
        Vec4::new((2.0 * near / (right - left)) as f32, 0.0, 0.0, 0.0),
        Vec4::new(0.0, (2.0 * near / (top - bottom)) as f32, 0.0, 0.0),
        Vec4::new(a as f32, b as f32, depth as f32, -1.0),
        Vec4::new(0.0, 0.0, (depth * near) as f32, 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_intrinsics_match_symmetric_perspective() {
        let intrinsics = CameraIntrinsics {
            width: 1280,
            height: 720,
            fx: 1000.0,
            fy: 1000.0,
            cx: 640.0,
            cy: 360.0,
        };
        let m = Mat4::from_cols_array(&projection_from_intrinsics(&intrinsics, 0.1, 100.0));

        let fov_y = 2.0 * (360.0_f32 / 1000.0).atan();
        let expected = Mat4::perspective_rh(fov_y, 1280.0 / 720.0, 0.1, 100.0);
        assert!(m.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn principal_point_shifts_frustum() {
        let intrinsics = CameraIntrinsics {
            cx: 700.0,
            cy: 300.0,
            ..CameraIntrinsics::default()
        };
        let m = projection_from_intrinsics(&intrinsics, 0.1, 100.0);
        // Column 2 carries the off-axis terms.
        assert!(m[8] < 0.0);
        assert!(m[9] < 0.0);
        assert_eq!(m[11], -1.0);
    }

    #[test]
    fn view_matrix_undoes_camera_transform() {
        let world = Quat::from_rotation_y(0.8);
        let position = Vec3::new(1.0, 2.0, 3.0);
        let mut camera = RenderCamera::new();
        camera.set_transform(world.conjugate(), position);

        // A point one meter in front of the camera lands on the view axis.
        let ahead = position + world * Vec3::NEG_Z;
        let in_view = camera.view_matrix().transform_point3(ahead);
        assert!(in_view.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }
}

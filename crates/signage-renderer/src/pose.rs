//! Tracker pose → render camera transform.
//!
//! The tracker reports right-handed rotations. The renderer stores the camera
//! rotation in the left-handed convention (see [`RenderCamera::view_matrix`]),
//! so the default correction is a quaternion conjugate. Renderers with a
//! different convention pick another [`HandednessCorrection`].

use crate::camera::RenderCamera;
use glam::{Quat, Vec3, Vec4};
use signage_config::{HandednessCorrection, PoseValidation};
use signage_tracking::Pose;
use thiserror::Error;

/// Largest accepted deviation of `|q|` from 1 under [`PoseValidation::Reject`].
pub const UNIT_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Error, PartialEq)]
pub enum PoseError {
    #[error("Pose contains a non-finite component")]
    NonFinite,
    #[error("Pose rotation is not unit length (|q| = {norm})")]
    NotUnit { norm: f32 },
}

/// Apply `correction` to a tracker rotation.
pub fn correct_rotation(q: Quat, correction: HandednessCorrection) -> Quat {
    match correction {
        HandednessCorrection::Conjugate => q.conjugate(),
        // glam's `inverse` assumes unit length; this one does not.
        HandednessCorrection::Inverse => {
            Quat::from_vec4(Vec4::from(q.conjugate()) / q.length_squared())
        }
        HandednessCorrection::Identity => q,
    }
}

/// Check a pose against `policy` and unpack it.
pub fn validate(pose: &Pose, policy: PoseValidation) -> Result<(Quat, Vec3), PoseError> {
    let [x, y, z, w] = pose.rotation;
    let rotation = Quat::from_xyzw(x, y, z, w);
    let translation = Vec3::from_array(pose.translation);

    if policy == PoseValidation::Reject {
        if !rotation.is_finite() || !translation.is_finite() {
            return Err(PoseError::NonFinite);
        }
        let norm = rotation.length();
        if (norm - 1.0).abs() > UNIT_TOLERANCE {
            return Err(PoseError::NotUnit { norm });
        }
    }

    Ok((rotation, translation))
}

/// Move the render camera to `pose`.
///
/// The camera rotation becomes the corrected pose rotation and the camera
/// position becomes the pose translation, unchanged. On error the camera is
/// left as it was.
///
/// The pose must belong to the colour frame most recently uploaded to the
/// background texture; that alignment is the caller's job.
pub fn update_render_camera_pose(
    camera: &mut RenderCamera,
    pose: &Pose,
    correction: HandednessCorrection,
    policy: PoseValidation,
) -> Result<(), PoseError> {
    let (rotation, translation) = validate(pose, policy)?;
    camera.set_transform(correct_rotation(rotation, correction), translation);
    Ok(())
}

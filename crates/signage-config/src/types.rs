use glam::Vec3;
use serde::{Deserialize, Serialize};
use signage_tracking::CameraIntrinsics;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pose source and camera model.
    pub tracking: TrackingConfig,
    /// Where texture images are looked up.
    pub assets: AssetsConfig,
    /// Signage placed in the world.
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// `host:port` of the tracking bridge.
    pub address: String,
    /// Colour camera intrinsics, used to build the projection matrix.
    pub intrinsics: CameraIntrinsics,
    /// Correction from the tracker's rotation convention to the renderer's.
    pub handedness: HandednessCorrection,
    /// What to do with malformed pose rotations.
    pub validation: PoseValidation,
    /// Near clipping plane (meters).
    pub near: f32,
    /// Far clipping plane (meters).
    pub far: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:47800".to_string(),
            intrinsics: CameraIntrinsics::default(),
            handedness: HandednessCorrection::Conjugate,
            validation: PoseValidation::Reject,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// How a tracker rotation is turned into a render-camera rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HandednessCorrection {
    /// Negate the vector part. Flips chirality for a unit quaternion.
    #[default]
    Conjugate,
    /// Full quaternion inverse. Equals `Conjugate` for unit input.
    Inverse,
    /// Pass the rotation through unchanged.
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PoseValidation {
    /// Refuse non-finite or non-unit rotations and keep the previous camera.
    #[default]
    Reject,
    /// Apply every pose as received.
    Tolerate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory texture paths in the scene are relative to.
    pub texture_root: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            texture_root: PathBuf::from("assets/textures"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub lights: Vec<LightConfig>,
    #[serde(default)]
    pub objects: Vec<SceneObjectConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::signage()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Draw the colour camera feed behind everything else.
    pub enabled: bool,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A directional light.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightConfig {
    /// Direction the light travels in.
    #[serde(with = "vec3_serde")]
    pub direction: Vec3,
    /// Linear RGB.
    pub color: [f32; 3],
    pub power: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObjectConfig {
    /// Unique name, used in logs.
    pub name: String,
    pub geometry: GeometryConfig,
    pub material: MaterialConfig,
    /// World-space center (meters).
    #[serde(with = "vec3_serde")]
    pub position: Vec3,
    /// Static rotations, applied in order.
    #[serde(default)]
    pub rotation: Vec<AxisAngle>,
    #[serde(default)]
    pub animation: Option<AnimationConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometryConfig {
    /// Rectangular prism centered on the origin.
    Box { width: f32, height: f32, depth: f32 },
    /// Plane in XY facing +Z, subdivided into a grid.
    Plane {
        width: f32,
        height: f32,
        #[serde(default = "one")]
        segments_w: u32,
        #[serde(default = "one")]
        segments_h: u32,
    },
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// Image path relative to `assets.texture_root`.
    #[serde(default)]
    pub texture: Option<PathBuf>,
    /// Base colour (linear RGBA).
    pub color: [f32; 4],
    /// Blend between texture (0.0) and `color` (1.0).
    pub color_influence: f32,
    /// Lambert diffuse shading from the scene lights.
    pub lighting: bool,
}

impl MaterialConfig {
    /// Lit, fully textured material.
    pub fn textured(texture: impl Into<PathBuf>) -> Self {
        Self {
            texture: Some(texture.into()),
            color: [1.0, 1.0, 1.0, 1.0],
            color_influence: 0.0,
            lighting: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAngle {
    pub axis: Axis,
    pub degrees: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimationConfig {
    /// Linear rotation about a principal axis.
    RotateOnAxis {
        axis: Axis,
        from_degrees: f32,
        to_degrees: f32,
        duration_ms: u64,
        repeat: RepeatMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Play once and hold the final value.
    Once,
    /// Restart from the beginning forever.
    Infinite,
    /// Play forward, then backward, forever.
    ReverseInfinite,
}

impl SceneConfig {
    /// The wayfinding layout: shop signs, terminal arrows and a restroom sign
    /// placed relative to where tracking started.
    pub fn signage() -> Self {
        let sign = |name: &str, geometry: GeometryConfig, texture: &str, position: [f32; 3]| {
            SceneObjectConfig {
                name: name.to_string(),
                geometry,
                material: MaterialConfig::textured(texture),
                position: Vec3::from_array(position),
                rotation: Vec::new(),
                animation: None,
            }
        };
        let cube = |w: f32, h: f32, d: f32| GeometryConfig::Box {
            width: w,
            height: h,
            depth: d,
        };
        let plane = |w: f32, h: f32| GeometryConfig::Plane {
            width: w,
            height: h,
            segments_w: 1,
            segments_h: 1,
        };

        let mut arrow = sign("arrow", plane(2.0, 5.0), "arrow2.png", [0.0, -3.0, -15.0]);
        // Tipped back so it lies nearly flat, pointing along the floor.
        arrow.rotation.push(AxisAngle {
            axis: Axis::X,
            degrees: -80.0,
        });

        let mut shop3 = sign("shop3", cube(2.0, 1.0, 1.0), "shop3.png", [-1.0, 1.0, -8.0]);
        shop3.animation = Some(AnimationConfig::RotateOnAxis {
            axis: Axis::Y,
            from_degrees: 0.0,
            to_degrees: 180.0,
            duration_ms: 60_000,
            repeat: RepeatMode::Infinite,
        });

        Self {
            background: BackgroundConfig::default(),
            lights: vec![
                LightConfig {
                    direction: Vec3::new(1.0, 0.2, -1.0),
                    color: [1.0, 1.0, 1.0],
                    power: 0.8,
                },
                LightConfig {
                    direction: Vec3::new(1.0, -5.0, 1.0),
                    color: [1.0, 1.0, 1.0],
                    power: 1.0,
                },
            ],
            objects: vec![
                sign("shop4", cube(1.0, 1.0, 1.0), "shop4.png", [1.0, 2.0, -13.0]),
                arrow,
                sign("terminal1", cube(2.0, 1.0, 1.0), "terminal123.png", [0.0, -4.0, -12.0]),
                sign("arrow3", plane(5.0, 3.0), "arrow6.png", [15.0, -4.0, -15.0]),
                sign("bathroom", cube(2.0, 2.0, 1.0), "bathroom.png", [-8.0, 1.0, -60.0]),
                sign("shop1", cube(1.0, 1.0, 1.0), "shop1.png", [-4.0, 1.0, -10.0]),
                shop3,
                sign("shop2", cube(2.0, 1.0, 1.0), "shop2.png", [4.0, 1.0, -13.0]),
            ],
        }
    }
}

// glam types serialize as structs; arrays read better in TOML.
mod vec3_serde {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y, v.z].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
        let [x, y, z] = <[f32; 3]>::deserialize(d)?;
        Ok(Vec3::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_survives_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();

        let names: Vec<_> = parsed.scene.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            names,
            ["shop4", "arrow", "terminal1", "arrow3", "bathroom", "shop1", "shop3", "shop2"]
        );
        assert_eq!(parsed.scene.lights.len(), 2);
        assert_eq!(parsed.tracking.handedness, HandednessCorrection::Conjugate);
        assert_eq!(parsed.scene.objects[6].animation, config.scene.objects[6].animation);
    }

    #[test]
    fn minimal_scene_uses_defaults() {
        let text = r#"
            [background]
            enabled = false

            [[objects]]
            name = "sign"
            position = [0.0, 1.0, -2.0]
            geometry = { kind = "plane", width = 1.0, height = 0.5 }
            material = { color = [1.0, 0.0, 0.0, 1.0], color_influence = 1.0, lighting = false }
        "#;
        let scene: SceneConfig = toml::from_str(text).unwrap();

        assert!(!scene.background.enabled);
        assert!(scene.lights.is_empty());
        let sign = &scene.objects[0];
        assert_eq!(sign.position, Vec3::new(0.0, 1.0, -2.0));
        assert!(sign.material.texture.is_none());
        assert!(sign.rotation.is_empty());
        assert_eq!(
            sign.geometry,
            GeometryConfig::Plane {
                width: 1.0,
                height: 0.5,
                segments_w: 1,
                segments_h: 1
            }
        );
    }

    #[test]
    fn signage_layout_has_one_animated_sign() {
        let scene = SceneConfig::signage();
        let animated: Vec<_> = scene
            .objects
            .iter()
            .filter(|o| o.animation.is_some())
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(animated, ["shop3"]);
        assert!(scene.objects.iter().all(|o| o.material.texture.is_some()));
    }
}

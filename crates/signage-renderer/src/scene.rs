use crate::animation::AxisRotation;
use crate::geometry::{mesh_for, Mesh};
use crate::texture::{DecodedImage, TextureSource};
use glam::{Mat4, Quat, Vec3, Vec4};
use signage_config::{LightConfig, MaterialConfig, SceneConfig, SceneObjectConfig};
use std::time::Duration;
use tracing::{info, warn};

/// Surface appearance of a scene object.
pub struct Material {
    /// `None` if there was no texture or it failed to load.
    pub texture: Option<DecodedImage>,
    pub color: Vec4,
    pub color_influence: f32,
    pub lighting: bool,
}

/// A textured primitive placed in the world.
pub struct SceneObject {
    pub name: String,
    pub mesh: Mesh,
    pub material: Material,
    pub position: Vec3,
    /// Static orientation from config.
    pub rotation: Quat,
    pub animation: Option<AxisRotation>,
}

impl SceneObject {
    fn from_config(config: &SceneObjectConfig, textures: &dyn TextureSource) -> Self {
        let rotation = config
            .rotation
            .iter()
            .fold(Quat::IDENTITY, |q, step| {
                q * Quat::from_axis_angle(step.axis.unit(), step.degrees.to_radians())
            });

        Self {
            name: config.name.clone(),
            mesh: mesh_for(&config.geometry),
            material: load_material(&config.name, &config.material, textures),
            position: config.position,
            rotation,
            animation: config.animation.as_ref().map(AxisRotation::from_config),
        }
    }

    /// Current orientation including any running animation.
    pub fn orientation(&self) -> Quat {
        match &self.animation {
            Some(anim) => self.rotation * anim.rotation(),
            None => self.rotation,
        }
    }

    /// Compute the model matrix for this object.
    pub fn model_matrix(&self) -> Mat4 {
        // Size is baked into the mesh.
        Mat4::from_rotation_translation(self.orientation(), self.position)
    }
}

/// A texture that cannot be loaded leaves the material untextured; the object
/// still renders in its base colour.
fn load_material(name: &str, config: &MaterialConfig, textures: &dyn TextureSource) -> Material {
    let texture = config.texture.as_deref().and_then(|path| match textures.load(path) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(object = name, error = %e, "Texture unavailable, rendering untextured");
            None
        }
    });

    Material {
        texture,
        color: Vec4::from_array(config.color),
        color_influence: config.color_influence,
        lighting: config.lighting,
    }
}

pub struct DirectionalLight {
    /// Unit vector the light travels along.
    pub direction: Vec3,
    pub color: Vec3,
    pub power: f32,
}

impl DirectionalLight {
    fn from_config(config: &LightConfig) -> Self {
        Self {
            direction: config.direction.try_normalize().unwrap_or(Vec3::NEG_Y),
            color: Vec3::from_array(config.color),
            power: config.power,
        }
    }
}

/// The signage scene. Built once at startup; only animations change it.
pub struct Scene {
    /// Draw the colour camera feed behind the signage.
    pub background: bool,
    pub lights: Vec<DirectionalLight>,
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn from_config(config: &SceneConfig, textures: &dyn TextureSource) -> Self {
        let objects: Vec<SceneObject> = config
            .objects
            .iter()
            .map(|o| SceneObject::from_config(o, textures))
            .collect();

        let untextured = objects.iter().filter(|o| o.material.texture.is_none()).count();
        info!(
            objects = objects.len(),
            lights = config.lights.len(),
            untextured,
            "Scene built"
        );

        Self {
            background: config.background.enabled,
            lights: config.lights.iter().map(DirectionalLight::from_config).collect(),
            objects,
        }
    }

    /// Step every animation by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        for anim in self.objects.iter_mut().filter_map(|o| o.animation.as_mut()) {
            anim.advance(dt);
        }
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::AssetError;
    use std::path::{Path, PathBuf};

    /// Serves a 1x1 image for every path except `missing`.
    struct StubTextures {
        missing: &'static str,
    }

    impl TextureSource for StubTextures {
        fn load(&self, path: &Path) -> Result<DecodedImage, AssetError> {
            if path == Path::new(self.missing) {
                return Err(AssetError::Empty {
                    path: PathBuf::from(path),
                });
            }
            Ok(DecodedImage {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            })
        }
    }

    fn signage(missing: &'static str) -> Scene {
        Scene::from_config(&SceneConfig::signage(), &StubTextures { missing })
    }

    #[test]
    fn builds_every_configured_object() {
        let scene = signage("");
        assert_eq!(scene.objects.len(), 8);
        assert_eq!(scene.lights.len(), 2);
        assert!(scene.background);
        assert!(scene.objects.iter().all(|o| o.material.texture.is_some()));
    }

    #[test]
    fn missing_texture_does_not_abort_construction() {
        let scene = signage("bathroom.png");
        assert_eq!(scene.objects.len(), 8);

        let bathroom = scene.object("bathroom").unwrap();
        assert!(bathroom.material.texture.is_none());
        assert_eq!(bathroom.position, Vec3::new(-8.0, 1.0, -60.0));
        assert!(scene.object("shop1").unwrap().material.texture.is_some());
    }

    #[test]
    fn static_rotation_is_applied() {
        let scene = signage("");
        let arrow = scene.object("arrow").unwrap();
        let normal = arrow.model_matrix().transform_vector3(Vec3::Z);
        // Tilted back to lie almost flat, facing up.
        assert!(normal.y > 0.9);
    }

    #[test]
    fn advance_only_moves_animated_objects() {
        let mut scene = signage("");
        let before_shop1 = scene.object("shop1").unwrap().model_matrix();
        let before_shop3 = scene.object("shop3").unwrap().model_matrix();

        scene.advance(Duration::from_secs(10));

        assert_eq!(scene.object("shop1").unwrap().model_matrix(), before_shop1);
        assert_ne!(scene.object("shop3").unwrap().model_matrix(), before_shop3);
        // Rotation happens in place.
        let shop3 = scene.object("shop3").unwrap();
        assert_eq!(
            shop3.model_matrix().transform_point3(Vec3::ZERO),
            Vec3::new(-1.0, 1.0, -8.0)
        );
    }

    #[test]
    fn light_directions_are_normalized() {
        let scene = signage("");
        for light in &scene.lights {
            assert!((light.direction.length() - 1.0).abs() < 1e-6);
        }
    }
}

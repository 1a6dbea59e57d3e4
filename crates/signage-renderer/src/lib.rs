pub mod animation;
pub mod camera;
pub mod context;
pub mod geometry;
pub mod pipeline;
pub mod pose;
pub mod renderer;
pub mod scene;
pub mod texture;

pub use camera::{projection_from_intrinsics, RenderCamera};
pub use context::{PoseTiming, RenderContext};
pub use pose::PoseError;
pub use renderer::SceneRenderer;
pub use scene::Scene;
pub use texture::{AssetError, FsTextures, TextureId, TextureSource};

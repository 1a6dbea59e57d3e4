use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Failed to read texture {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode texture {path:?}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Texture {path:?} has zero size")]
    Empty { path: PathBuf },
}

/// CPU-side RGBA8 image ready for upload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Where material textures come from.
pub trait TextureSource {
    fn load(&self, path: &Path) -> Result<DecodedImage, AssetError>;
}

/// Loads textures from a directory on disk.
pub struct FsTextures {
    root: PathBuf,
}

impl FsTextures {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TextureSource for FsTextures {
    fn load(&self, path: &Path) -> Result<DecodedImage, AssetError> {
        let full = self.root.join(path);
        let bytes = std::fs::read(&full).map_err(|source| AssetError::Io {
            path: full.clone(),
            source,
        })?;
        decode_image(&full, &bytes)
    }
}

/// Decode PNG/JPEG bytes into RGBA8.
pub fn decode_image(path: &Path, bytes: &[u8]) -> Result<DecodedImage, AssetError> {
    let image = image::load_from_memory(bytes).map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(AssetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Integer handle for a GPU texture, handed to frame producers so they know
/// where to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Hands out [`TextureId`]s and owns whatever they refer to.
pub struct TextureRegistry<T> {
    next_id: u32,
    entries: HashMap<TextureId, T>,
}

impl<T> TextureRegistry<T> {
    pub fn new() -> Self {
        Self {
            // Zero is never handed out.
            next_id: 1,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, texture: T) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, texture);
        id
    }

    pub fn get(&self, id: TextureId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TextureRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

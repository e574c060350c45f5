//! CPU-side texture loading. Renderers upload from here.

use std::path::{Path, PathBuf};

use anyhow::Context;
use id_arena::{Arena, Id};

pub type TextureId = Id<TextureAsset>;

/// Colour of the missing-texture fallback.
pub const FALLBACK_PIXEL: [u8; 4] = [255, 0, 255, 255];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, top row first.
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn solid(pixel: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: pixel.to_vec(),
        }
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?
            .to_rgba8();

        Ok(Self {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureData {
    Flat(ImageData),
    /// Faces in +X, -X, +Y, -Y, +Z, -Z order.
    Cube(Box<[ImageData; 6]>),
}

#[derive(Debug)]
pub struct TextureAsset {
    pub label: String,
    pub data: TextureData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    Fallback(String),
}

/// Result of a texture load. A failed load still carries a usable id that
/// points at fallback pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureHandle {
    pub id: TextureId,
    pub status: LoadStatus,
}

impl TextureHandle {
    pub fn is_fallback(&self) -> bool {
        matches!(self.status, LoadStatus::Fallback(_))
    }
}

pub struct TextureStore {
    textures: Arena<TextureAsset>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self {
            textures: Arena::new(),
        }
    }

    pub fn load_texture(&mut self, path: &Path) -> TextureHandle {
        let label = path.display().to_string();

        match ImageData::read(path) {
            Ok(image) => self.insert(label, TextureData::Flat(image), LoadStatus::Loaded),
            Err(error) => {
                log::warn!("Using fallback for texture {label}: {error:#}");
                self.insert(
                    label,
                    TextureData::Flat(ImageData::solid(FALLBACK_PIXEL)),
                    LoadStatus::Fallback(format!("{error:#}")),
                )
            }
        }
    }

    pub fn load_cube_map(&mut self, faces: &[PathBuf; 6]) -> TextureHandle {
        let label = format!("Cube map ({})", faces[0].display());

        match read_cube_faces(faces) {
            Ok(images) => self.insert(label, TextureData::Cube(images), LoadStatus::Loaded),
            Err(error) => {
                log::warn!("Using fallback for {label}: {error:#}");
                let solid = ImageData::solid(FALLBACK_PIXEL);
                self.insert(
                    label,
                    TextureData::Cube(Box::new(std::array::from_fn(|_| solid.clone()))),
                    LoadStatus::Fallback(format!("{error:#}")),
                )
            }
        }
    }

    fn insert(&mut self, label: String, data: TextureData, status: LoadStatus) -> TextureHandle {
        let id = self.textures.alloc(TextureAsset { label, data });
        TextureHandle { id, status }
    }

    pub fn get(&self, id: TextureId) -> Option<&TextureAsset> {
        self.textures.get(id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.len() == 0
    }
}

impl Default for TextureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_cube_faces(faces: &[PathBuf; 6]) -> anyhow::Result<Box<[ImageData; 6]>> {
    let mut images = Vec::with_capacity(6);
    for path in faces {
        images.push(ImageData::read(path)?);
    }

    let (width, height) = (images[0].width, images[0].height);
    if width != height {
        anyhow::bail!("Cube map faces must be square, got {width}x{height}");
    }
    if let Some(face) = images
        .iter()
        .position(|image| image.width != width || image.height != height)
    {
        anyhow::bail!(
            "Cube map face {} is {}x{}, expected {width}x{height}",
            faces[face].display(),
            images[face].width,
            images[face].height
        );
    }

    let images: [ImageData; 6] = images
        .try_into()
        .map_err(|_| anyhow::anyhow!("Cube map needs exactly six faces"))?;

    Ok(Box::new(images))
}

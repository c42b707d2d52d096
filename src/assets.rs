//! Asset registry collaborator.
//!
//! The compiler consults a read-only [`ImageResolver`] to turn image
//! references into concrete files, and appends every texture/include it
//! touches to a shared [`AssetRegistry`]. The registry is append-only and
//! order-insensitive so independent material compiles may run in parallel.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorSpace {
    Srgb,
    Linear,
    NonColor,
}

impl Default for ColorSpace {
    fn default() -> Self {
        ColorSpace::Srgb
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TexInterpolation {
    Linear,
    Closest,
    Cubic,
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TexProjection {
    Flat,
    Box,
}

/// Image reference carried by a TexImage node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub file: String,
    #[serde(default)]
    pub color_space: ColorSpace,
    #[serde(default = "default_interpolation")]
    pub interpolation: TexInterpolation,
    #[serde(default = "default_projection")]
    pub projection: TexProjection,
}

fn default_interpolation() -> TexInterpolation {
    TexInterpolation::Linear
}

fn default_projection() -> TexProjection {
    TexProjection::Flat
}

impl ImageRef {
    pub fn new(file: &str) -> Self {
        ImageRef {
            file: file.to_string(),
            color_space: ColorSpace::Srgb,
            interpolation: TexInterpolation::Linear,
            projection: TexProjection::Flat,
        }
    }
}

/// A resolved, on-disk image the host pipeline can bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub file_name: String,
    /// The host pipeline converts unsupported container formats before upload.
    pub needs_conversion: bool,
    pub color_space: ColorSpace,
}

/// Read-only lookup from image reference to backing file. Resolution failures
/// surface as `None`; the compiler substitutes a placeholder and continues.
pub trait ImageResolver: Sync {
    fn resolve_image(&self, image: &ImageRef) -> Option<ResolvedImage>;
}

/// Extensions the GPU upload path accepts without conversion.
const NATIVE_EXTENSIONS: [&str; 4] = ["jpg", "png", "hdr", "mp4"];

fn needs_conversion(file: &str) -> bool {
    let ext = file.rsplit('.').next().unwrap_or("");
    !NATIVE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// Resolver backed by the local filesystem, rooted at a project directory.
#[derive(Debug, Clone)]
pub struct FsImageResolver {
    pub root: PathBuf,
}

impl FsImageResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsImageResolver { root: root.into() }
    }
}

impl ImageResolver for FsImageResolver {
    fn resolve_image(&self, image: &ImageRef) -> Option<ResolvedImage> {
        let path = self.root.join(&image.file);
        if !path.is_file() {
            return None;
        }
        Some(ResolvedImage {
            file_name: image.file.clone(),
            needs_conversion: needs_conversion(&image.file),
            color_space: image.color_space,
        })
    }
}

/// In-memory resolver with a fixed file set. Used by tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryImageResolver {
    files: BTreeSet<String>,
}

impl MemoryImageResolver {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(files: I) -> Self {
        MemoryImageResolver {
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

impl ImageResolver for MemoryImageResolver {
    fn resolve_image(&self, image: &ImageRef) -> Option<ResolvedImage> {
        if !self.files.contains(&image.file) {
            return None;
        }
        Some(ResolvedImage {
            file_name: image.file.clone(),
            needs_conversion: needs_conversion(&image.file),
            color_space: image.color_space,
        })
    }
}

/// Shared append-only registry of every texture file and include library the
/// compiled materials reference. Entry order carries no meaning; downstream
/// consumers get sorted snapshots.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    textures: Mutex<BTreeSet<String>>,
    includes: Mutex<BTreeSet<String>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_texture_asset(&self, path: &str) {
        self.textures.lock().unwrap().insert(path.to_string());
    }

    pub fn register_include(&self, path: &str) {
        self.includes.lock().unwrap().insert(path.to_string());
    }

    pub fn textures(&self) -> Vec<String> {
        self.textures.lock().unwrap().iter().cloned().collect()
    }

    pub fn includes(&self) -> Vec<String> {
        self.includes.lock().unwrap().iter().cloned().collect()
    }
}

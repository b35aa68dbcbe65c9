use crate::assets::{AssetBundle, AssetKind, parse_data_uri};
use crate::error::{ComposeError, Result};
use crate::font::{LoadedFont, find_font_file, system_font_dirs};
use crate::raster::Raster;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeOptions {
    /// Shape text with rustybuzz; plain glyph advances otherwise.
    pub shape_text: bool,
    /// Also search the platform font directories.
    pub system_fonts: bool,
    /// Upper bound on `Shadow` blur passes. `None` means unbounded.
    pub max_shadow_intensity: Option<u32>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            shape_text: true,
            system_fonts: true,
            max_shadow_intensity: None,
        }
    }
}

/// Picture source: a reference resolved at composition time, or raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// `data:` URI, asset name, or filesystem path, tried in that order.
    Reference(String),
    Bytes(Arc<Vec<u8>>),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Reference(r) if r.starts_with("data:") => "data: URI".to_string(),
            ImageSource::Reference(r) => r.clone(),
            ImageSource::Bytes(b) => format!("{} in-memory bytes", b.len()),
        }
    }
}

impl From<&str> for ImageSource {
    fn from(value: &str) -> Self {
        ImageSource::Reference(value.to_string())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(value: Vec<u8>) -> Self {
        ImageSource::Bytes(Arc::new(value))
    }
}

/// Everything a composition pass reads besides the tree itself.
#[derive(Debug, Default)]
pub struct ComposeContext {
    options: ComposeOptions,
    base_dir: Option<PathBuf>,
    font_dirs: Vec<PathBuf>,
    assets: AssetBundle,
    font_cache: Mutex<HashMap<String, LoadedFont>>,
}

impl ComposeContext {
    pub fn new(
        options: ComposeOptions,
        base_dir: Option<PathBuf>,
        font_dirs: Vec<PathBuf>,
        assets: AssetBundle,
    ) -> Self {
        Self {
            options,
            base_dir,
            font_dirs,
            assets,
            font_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    fn resolve_path(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub(crate) fn load_image(&self, source: &ImageSource) -> Result<Raster> {
        let unavailable =
            |reason: String| ComposeError::SourceUnavailable(format!("{}: {reason}", source.describe()));
        let bytes: Arc<Vec<u8>> = match source {
            ImageSource::Bytes(bytes) => bytes.clone(),
            ImageSource::Reference(reference) => {
                if reference.starts_with("data:") {
                    let (_, data) = parse_data_uri(reference)
                        .ok_or_else(|| unavailable("malformed data URI".to_string()))?;
                    Arc::new(data)
                } else if let Some(asset) = self.assets.find(AssetKind::Image, reference) {
                    asset.data.clone()
                } else {
                    let path = self.resolve_path(reference);
                    let data = std::fs::read(&path)
                        .map_err(|err| unavailable(format!("{}: {err}", path.display())))?;
                    Arc::new(data)
                }
            }
        };
        let decoded =
            image::load_from_memory(bytes.as_slice()).map_err(|err| unavailable(err.to_string()))?;
        let rgba = decoded.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(unavailable("image has no pixels".to_string()));
        }
        log::trace!(
            "decoded image {} ({}x{})",
            source.describe(),
            rgba.width(),
            rgba.height()
        );
        Raster::from_rgba_image(&rgba)
    }

    pub(crate) fn load_font(&self, reference: &str) -> Result<LoadedFont> {
        if let Ok(cache) = self.font_cache.lock() {
            if let Some(font) = cache.get(reference) {
                return Ok(font.clone());
            }
        }
        let font = self.resolve_font(reference)?;
        log::debug!("resolved font `{reference}` to {}", font.name());
        if let Ok(mut cache) = self.font_cache.lock() {
            cache.insert(reference.to_string(), font.clone());
        }
        Ok(font)
    }

    fn resolve_font(&self, reference: &str) -> Result<LoadedFont> {
        if let Some(asset) = self.assets.find(AssetKind::Font, reference) {
            return LoadedFont::from_bytes(asset.name.clone(), asset.data.clone());
        }
        let path = self.resolve_path(reference);
        if path.is_file() {
            return LoadedFont::from_path(&path);
        }
        let mut dirs = self.font_dirs.clone();
        if self.options.system_fonts {
            dirs.extend(system_font_dirs());
        }
        match find_font_file(&dirs, reference) {
            Some(found) => LoadedFont::from_path(found),
            None => Err(ComposeError::FontUnavailable(format!(
                "`{reference}` not found as an asset, a file, or in {} font directories",
                dirs.len()
            ))),
        }
    }
}

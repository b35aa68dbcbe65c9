mod assets;
mod attrs;
mod builder;
mod container;
mod context;
mod error;
mod fit_text;
mod font;
mod node;
mod picture;
mod raster;
mod types;
mod value;

pub use assets::{Asset, AssetBundle, AssetKind};
pub use attrs::{Attribute, Attributes};
pub use builder::{build_tree, build_tree_from_path, build_tree_from_reader};
pub use container::{PaddedSlot, Padding, Root, Shadow, Table};
pub use context::{ComposeContext, ComposeOptions, ImageSource};
pub use error::{ComposeError, Result};
pub use fit_text::{FitText, TextBlock, fit_text_block};
pub use font::{LoadedFont, TextMeasure};
pub use node::{Compose, Filler, Node, NodeType, Shape};
pub use picture::{Picture, Placement};
pub use raster::{Bounds, Raster};
pub use types::{Axis, Color, Extent, FitMode, Insets, Length};
pub use value::{AttrValue, LiteralError, coerce, parse_literal};

use image::RgbaImage;
use std::path::PathBuf;

/// Renders node trees against one configured set of fonts, images and limits.
#[derive(Debug)]
pub struct Composer {
    context: ComposeContext,
}

#[derive(Debug, Clone)]
pub struct ComposerBuilder {
    options: ComposeOptions,
    base_dir: Option<PathBuf>,
    font_dirs: Vec<PathBuf>,
    asset_bundle: AssetBundle,
}

impl Default for ComposerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposerBuilder {
    pub fn new() -> Self {
        Self {
            options: ComposeOptions::default(),
            base_dir: None,
            font_dirs: Vec::new(),
            asset_bundle: AssetBundle::default(),
        }
    }

    // Relative `img_source` and `font_path` references resolve against this directory.
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(path.into());
        self
    }

    pub fn register_font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn register_asset(mut self, asset: Asset) -> Self {
        self.asset_bundle.add(asset);
        self
    }

    // Toggle rustybuzz shaping. Disabling lays glyphs out by their plain advances.
    pub fn shape_text(mut self, enabled: bool) -> Self {
        self.options.shape_text = enabled;
        self
    }

    pub fn system_fonts(mut self, enabled: bool) -> Self {
        self.options.system_fonts = enabled;
        self
    }

    pub fn max_shadow_intensity(mut self, limit: Option<u32>) -> Self {
        self.options.max_shadow_intensity = limit;
        self
    }

    /// Applies `BANNERKIT_FONT_DIR`, `BANNERKIT_SHAPE_TEXT` and
    /// `BANNERKIT_MAX_SHADOW_INTENSITY` from the process environment.
    pub fn from_env(self) -> Self {
        self.apply_env(|name| std::env::var(name).ok())
    }

    fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dirs) = lookup("BANNERKIT_FONT_DIR") {
            self.font_dirs.extend(
                std::env::split_paths(&dirs).filter(|p| !p.as_os_str().is_empty()),
            );
        }
        if let Some(v) = lookup("BANNERKIT_SHAPE_TEXT") {
            let v = v.trim();
            self.options.shape_text = !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false");
        }
        if let Some(v) = lookup("BANNERKIT_MAX_SHADOW_INTENSITY") {
            match v.trim().parse::<u32>() {
                Ok(limit) => self.options.max_shadow_intensity = Some(limit),
                Err(err) => {
                    log::warn!("ignoring BANNERKIT_MAX_SHADOW_INTENSITY={v:?}: {err}");
                }
            }
        }
        self
    }

    pub fn build(self) -> Composer {
        log::debug!(
            "composer: {} font dirs, {} assets, {:?}",
            self.font_dirs.len(),
            self.asset_bundle.assets.len(),
            self.options
        );
        Composer {
            context: ComposeContext::new(
                self.options,
                self.base_dir,
                self.font_dirs,
                self.asset_bundle,
            ),
        }
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        ComposerBuilder::new().build()
    }

    pub fn builder() -> ComposerBuilder {
        ComposerBuilder::new()
    }

    pub fn compose(&self, root: &Root, extent: Extent) -> Result<Raster> {
        root.compose(extent, &self.context)
    }

    /// Composes `root` at `width` x `height` into a straight-alpha image.
    pub fn render(&self, root: &Root, width: u32, height: u32) -> Result<RgbaImage> {
        Ok(self.compose(root, Extent::new(width, height))?.to_rgba_image())
    }

    pub fn render_markup(&self, markup: &str, width: u32, height: u32) -> Result<RgbaImage> {
        let root = build_tree(markup)?;
        self.render(&root, width, height)
    }

    /// Renders at the extent given by the root's `width`/`height` attributes.
    pub fn render_default(&self, root: &Root) -> Result<RgbaImage> {
        let extent = root.default_extent().ok_or_else(|| {
            ComposeError::InvalidGeometry("<Root> declares no width/height".to_string())
        })?;
        self.render(root, extent.width, extent.height)
    }
}

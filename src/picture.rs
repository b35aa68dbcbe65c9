use crate::attrs::Attributes;
use crate::context::{ComposeContext, ImageSource};
use crate::error::Result;
use crate::node::{Compose, Node, NodeType, discard_extent_hint, expect_leaf, take_background};
use crate::raster::Raster;
use crate::types::{Color, Extent, FitMode};

/// Image scaled into its box, either entirely visible or covering it.
#[derive(Debug, Clone)]
pub struct Picture {
    background: Color,
    source: ImageSource,
    mode: FitMode,
}

/// Scaled size and top-left corner of an image inside a frame.
/// `x`/`y` are negative when a `fill` image overflows the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub ratio: f64,
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
}

impl Placement {
    pub fn compute(frame: Extent, image: Extent, mode: FitMode) -> Placement {
        if image.is_empty() {
            return Placement {
                ratio: 0.0,
                width: 0,
                height: 0,
                x: 0,
                y: 0,
            };
        }
        let rx = frame.width as f64 / image.width as f64;
        let ry = frame.height as f64 / image.height as f64;
        let ratio = match mode {
            FitMode::Fit => rx.min(ry),
            FitMode::Fill => rx.max(ry),
        };
        let width = (image.width as f64 * ratio).round_ties_even() as u32;
        let height = (image.height as f64 * ratio).round_ties_even() as u32;
        Placement {
            ratio,
            width,
            height,
            x: (frame.width as i64 - width as i64).div_euclid(2),
            y: (frame.height as i64 - height as i64).div_euclid(2),
        }
    }
}

impl Picture {
    pub fn new(background: Color, source: impl Into<ImageSource>, mode: FitMode) -> Self {
        Self {
            background,
            source: source.into(),
            mode,
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }

    pub(crate) fn from_markup(mut attrs: Attributes, children: Vec<Node>) -> Result<Self> {
        expect_leaf(NodeType::Picture, &children)?;
        let background = take_background(&mut attrs)?;
        let source = attrs.required_text("img_source")?;
        let raw = attrs.required_text("mode")?;
        let mode = FitMode::from_str(&raw).ok_or_else(|| {
            attrs.invalid("mode", format!("expected `fit` or `fill`, got `{raw}`"))
        })?;
        discard_extent_hint(&mut attrs);
        attrs.finish()?;
        Ok(Self::new(background, ImageSource::Reference(source), mode))
    }
}

impl Compose for Picture {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster> {
        let mut out = Raster::new(extent, self.background)?;
        let image = ctx.load_image(&self.source)?;
        if extent.is_empty() {
            return Ok(out);
        }
        let placement = Placement::compute(extent, image.extent(), self.mode);
        log::debug!(
            "picture {} {:?} into {extent}: {}x{} at ({}, {})",
            self.source.describe(),
            self.mode,
            placement.width,
            placement.height,
            placement.x,
            placement.y
        );
        out.paste_scaled(
            &image,
            placement.x as i32,
            placement.y as i32,
            placement.width,
            placement.height,
        );
        Ok(out)
    }
}

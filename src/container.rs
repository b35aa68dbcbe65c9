use crate::attrs::Attributes;
use crate::context::ComposeContext;
use crate::error::{ComposeError, Result};
use crate::node::{
    Compose, Node, NodeType, discard_extent_hint, expect_single_child, take_background,
};
use crate::raster::Raster;
use crate::types::{Axis, Color, Extent, Insets, Length};

/// Top of a tree; the only node whose extent comes straight from the caller.
#[derive(Debug, Clone)]
pub struct Root {
    background: Color,
    child: Box<Node>,
    default_extent: Option<Extent>,
}

impl Root {
    pub fn new(background: Color, child: impl Into<Node>) -> Self {
        Self {
            background,
            child: Box::new(child.into()),
            default_extent: None,
        }
    }

    pub fn with_default_extent(mut self, extent: Extent) -> Self {
        self.default_extent = Some(extent);
        self
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn child(&self) -> &Node {
        &self.child
    }

    /// Extent declared by the markup's `width`/`height`, if any.
    pub fn default_extent(&self) -> Option<Extent> {
        self.default_extent
    }

    pub(crate) fn from_markup(mut attrs: Attributes, children: Vec<Node>) -> Result<Self> {
        let child = expect_single_child(NodeType::Root, children)?;
        let background = take_background(&mut attrs)?;
        let width = attrs.u32("width")?;
        let height = attrs.u32("height")?;
        let default_extent = match (width, height) {
            (Some(w), Some(h)) => Some(Extent::new(w, h)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(attrs.invalid("height", "width given without height"));
            }
            (None, Some(_)) => {
                return Err(attrs.invalid("width", "height given without width"));
            }
        };
        attrs.finish()?;
        let root = Self::new(background, child);
        Ok(match default_extent {
            Some(extent) => root.with_default_extent(extent),
            None => root,
        })
    }
}

impl Compose for Root {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster> {
        let mut out = Raster::new(extent, self.background)?;
        let child = self.child.compose(extent, ctx)?;
        out.paste(&child, 0, 0);
        Ok(out)
    }
}

/// Children laid out side by side along one axis, each starting at its offset.
#[derive(Debug, Clone)]
pub struct Table {
    background: Color,
    axis: Axis,
    offsets: Vec<Length>,
    children: Vec<Node>,
}

impl Table {
    pub fn new(
        background: Color,
        axis: Axis,
        offsets: Vec<Length>,
        children: Vec<Node>,
    ) -> Result<Self> {
        if children.is_empty() {
            return Err(ComposeError::MalformedTree(
                "<Table> needs at least one child".to_string(),
            ));
        }
        if offsets.len() != children.len() {
            return Err(ComposeError::MalformedTree(format!(
                "<Table> has {} offsets for {} children",
                offsets.len(),
                children.len()
            )));
        }
        for (idx, offset) in offsets.iter().enumerate() {
            if offset.is_negative() {
                return Err(ComposeError::InvalidGeometry(format!(
                    "table offset {idx} is negative: {offset:?}"
                )));
            }
            if matches!(offset, Length::Percent(pct) if *pct > 100.0) {
                return Err(ComposeError::InvalidGeometry(format!(
                    "table offset {idx} exceeds 100%: {offset:?}"
                )));
            }
        }
        for (idx, pair) in offsets.windows(2).enumerate() {
            let same_kind = std::mem::discriminant(&pair[0]) == std::mem::discriminant(&pair[1]);
            if same_kind && pair[1].magnitude() < pair[0].magnitude() {
                return Err(ComposeError::InvalidGeometry(format!(
                    "table offsets must not decrease: {:?} follows {:?} at index {}",
                    pair[1],
                    pair[0],
                    idx + 1
                )));
            }
        }
        Ok(Self {
            background,
            axis,
            offsets,
            children,
        })
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn offsets(&self) -> &[Length] {
        &self.offsets
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// `(offset, span)` of every child along an axis of `axis_len` pixels.
    /// The last child takes whatever remains after its offset.
    pub fn spans(&self, axis_len: u32) -> Result<Vec<(u32, u32)>> {
        let resolved: Vec<i64> = self.offsets.iter().map(|o| o.resolve(axis_len)).collect();
        let axis_end = axis_len as i64;
        let mut spans = Vec::with_capacity(resolved.len());
        for (idx, &start) in resolved.iter().enumerate() {
            let end = resolved.get(idx + 1).copied().unwrap_or(axis_end);
            if start < 0 || end < start || end > axis_end {
                return Err(ComposeError::InvalidGeometry(format!(
                    "table offsets {resolved:?} do not fit a {axis_len}px axis"
                )));
            }
            spans.push((start as u32, (end - start) as u32));
        }
        Ok(spans)
    }

    pub(crate) fn from_markup(mut attrs: Attributes, children: Vec<Node>) -> Result<Self> {
        let background = take_background(&mut attrs)?;
        let direction = attrs.required_text("direction")?;
        let axis = Axis::from_str(&direction).ok_or_else(|| {
            attrs.invalid("direction", format!("expected `h` or `v`, got `{direction}`"))
        })?;
        let use_percent = attrs.bool("use_percent")?.unwrap_or(false);
        let offsets = attrs
            .lengths("offsets", use_percent)?
            .ok_or_else(|| attrs.invalid("offsets", "attribute is required"))?;
        discard_extent_hint(&mut attrs);
        attrs.finish()?;
        Self::new(background, axis, offsets, children)
    }
}

impl Compose for Table {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster> {
        let mut out = Raster::new(extent, self.background)?;
        let spans = self.spans(self.axis.length(extent))?;
        log::debug!(
            "table {:?} {extent}: spans {:?}",
            self.axis,
            spans
        );
        for (child, (offset, span)) in self.children.iter().zip(spans) {
            let raster = child.compose(self.axis.slot(extent, span), ctx)?;
            let (x, y) = self.axis.origin(offset as i32);
            out.paste(&raster, x, y);
        }
        Ok(out)
    }
}

/// One child inset from the node's edges.
#[derive(Debug, Clone)]
pub struct Padding {
    background: Color,
    insets: Insets,
    child: Box<Node>,
}

/// Where a padded child lands inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddedSlot {
    pub x: i32,
    pub y: i32,
    pub extent: Extent,
}

impl Padding {
    pub fn new(background: Color, insets: Insets, child: impl Into<Node>) -> Result<Self> {
        for (name, inset) in [
            ("left", insets.left),
            ("right", insets.right),
            ("top", insets.top),
            ("bottom", insets.bottom),
        ] {
            if inset.is_negative() {
                return Err(ComposeError::InvalidGeometry(format!(
                    "padding {name} is negative: {inset:?}"
                )));
            }
        }
        Ok(Self {
            background,
            insets,
            child: Box::new(child.into()),
        })
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn insets(&self) -> Insets {
        self.insets
    }

    pub fn child(&self) -> &Node {
        &self.child
    }

    pub fn slot(&self, extent: Extent) -> Result<PaddedSlot> {
        let left = self.insets.left.resolve(extent.width);
        let right = self.insets.right.resolve(extent.width);
        let top = self.insets.top.resolve(extent.height);
        let bottom = self.insets.bottom.resolve(extent.height);
        let exceeds = || {
            ComposeError::InvalidGeometry(format!(
                "padding ({left}, {right}, {top}, {bottom}) exceeds a {extent} box"
            ))
        };
        let inner = |len: u32, lead: i64, trail: i64| {
            i64::from(len)
                .checked_sub(lead)
                .and_then(|rest| rest.checked_sub(trail))
                .and_then(|rest| u32::try_from(rest).ok())
        };
        let width = inner(extent.width, left, right).ok_or_else(exceeds)?;
        let height = inner(extent.height, top, bottom).ok_or_else(exceeds)?;
        let x = i32::try_from(left).map_err(|_| exceeds())?;
        let y = i32::try_from(top).map_err(|_| exceeds())?;
        Ok(PaddedSlot {
            x,
            y,
            extent: Extent::new(width, height),
        })
    }

    pub(crate) fn from_markup(mut attrs: Attributes, children: Vec<Node>) -> Result<Self> {
        let child = expect_single_child(NodeType::Padding, children)?;
        let background = take_background(&mut attrs)?;
        let use_percent = attrs.bool("use_percent")?.unwrap_or(false);
        let values = attrs
            .lengths("padding", use_percent)?
            .ok_or_else(|| attrs.invalid("padding", "attribute is required"))?;
        let insets = match values.as_slice() {
            [left, right, top, bottom] => Insets {
                left: *left,
                right: *right,
                top: *top,
                bottom: *bottom,
            },
            [all] => Insets::uniform(*all),
            _ => {
                return Err(attrs.invalid(
                    "padding",
                    format!("expected (left, right, top, bottom), got {} values", values.len()),
                ));
            }
        };
        discard_extent_hint(&mut attrs);
        attrs.finish()?;
        Self::new(background, insets, child)
    }
}

impl Compose for Padding {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster> {
        let mut out = Raster::new(extent, self.background)?;
        let slot = self.slot(extent)?;
        let child = self.child.compose(slot.extent, ctx)?;
        out.paste(&child, slot.x, slot.y);
        Ok(out)
    }
}

/// Drop shadow under a single child.
#[derive(Debug, Clone)]
pub struct Shadow {
    background: Color,
    color: Color,
    intensity: u32,
    offset: (i32, i32),
    child: Box<Node>,
}

impl Shadow {
    pub fn new(
        background: Color,
        color: Color,
        intensity: u32,
        offset: (i32, i32),
        child: impl Into<Node>,
    ) -> Self {
        Self {
            background,
            color,
            intensity,
            offset,
            child: Box::new(child.into()),
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    pub fn child(&self) -> &Node {
        &self.child
    }

    pub(crate) fn from_markup(mut attrs: Attributes, children: Vec<Node>) -> Result<Self> {
        let child = expect_single_child(NodeType::Shadow, children)?;
        let background = take_background(&mut attrs)?;
        let color = attrs
            .optional_color("shadow_color")?
            .ok_or_else(|| attrs.invalid("shadow_color", "attribute is required"))?;
        let intensity = attrs
            .u32("shadow_intensity")?
            .ok_or_else(|| attrs.invalid("shadow_intensity", "attribute is required"))?;
        let offset = attrs
            .point("shadow_offset")?
            .ok_or_else(|| attrs.invalid("shadow_offset", "attribute is required"))?;
        discard_extent_hint(&mut attrs);
        attrs.finish()?;
        Ok(Self::new(background, color, intensity, offset, child))
    }
}

impl Compose for Shadow {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster> {
        if let Some(limit) = ctx.options().max_shadow_intensity {
            if self.intensity > limit {
                return Err(ComposeError::ResourceLimit(format!(
                    "shadow intensity {} exceeds the configured maximum of {limit}",
                    self.intensity
                )));
            }
        }
        let mut out = Raster::new(extent, self.background)?;
        let child = self.child.compose(extent, ctx)?;
        out.paste_silhouette(&child, self.color, self.offset.0, self.offset.1)?;
        log::debug!(
            "shadow {extent}: offset {:?}, {} blur passes",
            self.offset,
            self.intensity
        );
        for _ in 0..self.intensity {
            out.blur();
        }
        out.paste(&child, 0, 0);
        Ok(out)
    }
}

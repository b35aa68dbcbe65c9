use crate::attrs::Attributes;
use crate::context::ComposeContext;
use crate::error::{ComposeError, Result};
use crate::font::{FontRenderer, TextMeasure};
use crate::node::{Compose, Node, NodeType, discard_extent_hint, expect_leaf, take_background};
use crate::raster::Raster;
use crate::types::{Color, Extent};

/// Text wrapped and sized to the largest font size that fits its box,
/// then centred on its ink.
#[derive(Debug, Clone)]
pub struct FitText {
    background: Color,
    text: String,
    max_font_size: u32,
    line_spacing: f32,
    font: String,
    font_color: Color,
}

/// Outcome of the font-size search.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub font_size: u32,
    /// Distance between consecutive line tops, spacing included.
    pub line_height: f32,
    pub lines: Vec<String>,
}

/// Searches sizes from `max_font_size` down to 1 and returns the first whose
/// greedy word wrap fits `frame`. `None` when no size fits or `text` has no words.
pub fn fit_text_block<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    frame: Extent,
    max_font_size: u32,
    line_spacing: f32,
) -> Option<TextBlock> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }
    let width = frame.width as f32;
    let height = frame.height as f32;
    for size in (1..=max_font_size).rev() {
        let Some(lines) = wrap_words(measure, &words, size, width) else {
            log::trace!("size {size}: a word is wider than {width}px");
            continue;
        };
        let line_height = measure.line_height(size) * line_spacing;
        let last = lines.last().map(String::as_str).unwrap_or_default();
        let block_height =
            line_height * (lines.len() - 1) as f32 + measure.ink_height(last, size);
        if block_height > height {
            log::trace!(
                "size {size}: {} lines need {block_height:.1}px of {height}px",
                lines.len()
            );
            continue;
        }
        return Some(TextBlock {
            font_size: size,
            line_height,
            lines,
        });
    }
    None
}

/// Greedy packing; `None` when a single word does not fit the width.
fn wrap_words<M: TextMeasure + ?Sized>(
    measure: &M,
    words: &[&str],
    size: u32,
    width: f32,
) -> Option<Vec<String>> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in words {
        if measure.ink_width(word, size) >= width {
            return None;
        }
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word}");
        if measure.ink_width(&candidate, size) > width {
            lines.push(std::mem::replace(&mut line, (*word).to_string()));
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    Some(lines)
}

impl FitText {
    pub fn new(
        background: Color,
        text: impl Into<String>,
        max_font_size: u32,
        font: impl Into<String>,
    ) -> Self {
        Self {
            background,
            text: text.into(),
            max_font_size,
            line_spacing: 1.0,
            font: font.into(),
            font_color: Color::BLACK,
        }
    }

    pub fn with_line_spacing(mut self, line_spacing: f32) -> Self {
        self.line_spacing = line_spacing;
        self
    }

    pub fn with_font_color(mut self, font_color: Color) -> Self {
        self.font_color = font_color;
        self
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn max_font_size(&self) -> u32 {
        self.max_font_size
    }

    pub fn line_spacing(&self) -> f32 {
        self.line_spacing
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    pub fn font_color(&self) -> Color {
        self.font_color
    }

    pub(crate) fn from_markup(mut attrs: Attributes, children: Vec<Node>) -> Result<Self> {
        expect_leaf(NodeType::FitText, &children)?;
        let background = take_background(&mut attrs)?;
        let text = attrs.required_text("text")?;
        let max_font_size = attrs
            .u32("max_font_size")?
            .ok_or_else(|| attrs.invalid("max_font_size", "attribute is required"))?;
        let font = attrs.required_text("font_path")?;
        let line_spacing = attrs.f32("line_spacing")?.unwrap_or(1.0);
        if line_spacing < 0.0 {
            return Err(attrs.invalid("line_spacing", "must not be negative"));
        }
        let font_color = attrs.color("font_color", Color::BLACK)?;
        discard_extent_hint(&mut attrs);
        attrs.finish()?;
        Ok(Self::new(background, text, max_font_size, font)
            .with_line_spacing(line_spacing)
            .with_font_color(font_color))
    }
}

impl Compose for FitText {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster> {
        let mut out = Raster::new(extent, self.background)?;
        if extent.is_empty() || self.text.trim().is_empty() {
            return Ok(out);
        }
        let font = ctx.load_font(&self.font)?;
        let renderer = font.renderer(ctx.options().shape_text)?;
        let block = fit_text_block(
            &renderer,
            &self.text,
            extent,
            self.max_font_size,
            self.line_spacing,
        )
        .ok_or(ComposeError::NoFittingSize {
            max_font_size: self.max_font_size,
            width: extent.width,
            height: extent.height,
        })?;
        log::debug!(
            "fit text {extent}: size {} in {} lines",
            block.font_size,
            block.lines.len()
        );
        if let Some(ink) = self.render_ink(&renderer, &block, extent)? {
            let x = (extent.width as i64 - ink.width() as i64).div_euclid(2);
            let y = (extent.height as i64 - ink.height() as i64).div_euclid(2);
            out.paste(&ink, x as i32, y as i32);
        }
        Ok(out)
    }
}

impl FitText {
    /// Draws the block on a scratch layer with a one-em margin and crops it
    /// to its painted pixels. `None` when nothing was painted.
    fn render_ink(
        &self,
        renderer: &FontRenderer<'_>,
        block: &TextBlock,
        extent: Extent,
    ) -> Result<Option<Raster>> {
        let margin = block.font_size;
        let ascent = renderer.ascent(block.font_size);
        let lines_span = block.line_height.max(0.0) * (block.lines.len() - 1) as f32;
        let scratch_extent = Extent::new(
            extent.width + 2 * margin,
            (lines_span + ascent + renderer.descent(block.font_size)).ceil() as u32
                + 2 * margin
                + 1,
        );
        let mut scratch = Raster::transparent(scratch_extent)?;
        for (idx, line) in block.lines.iter().enumerate() {
            // Baselines sit on whole pixels so the painted height matches the measured one.
            let baseline = (margin as f32 + idx as f32 * block.line_height + ascent).round();
            renderer.draw_line(
                &mut scratch,
                line,
                block.font_size,
                margin as f32,
                baseline - ascent,
                self.font_color,
            );
        }
        match scratch.opaque_bounds() {
            Some(bounds) => Ok(Some(scratch.crop(bounds)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Asset, AssetBundle};
    use crate::context::ComposeOptions;
    use crate::font::testing::system_font_path;

    /// Monospaced stand-in: every char is half an em wide, ink is 0.7 em tall.
    struct Mono;

    impl TextMeasure for Mono {
        fn line_height(&self, size: u32) -> f32 {
            size as f32
        }

        fn ink_width(&self, text: &str, size: u32) -> f32 {
            text.chars().count() as f32 * size as f32 * 0.5
        }

        fn ink_height(&self, text: &str, size: u32) -> f32 {
            if text.is_empty() { 0.0 } else { size as f32 * 0.7 }
        }
    }

    #[test]
    fn short_text_keeps_max_size() {
        let block = fit_text_block(&Mono, "Hi", Extent::new(100, 50), 40, 1.0).unwrap();
        assert_eq!(block.font_size, 40);
        assert_eq!(block.lines, vec!["Hi"]);
    }

    #[test]
    fn words_wrap_greedily() {
        let block =
            fit_text_block(&Mono, "aaaa bbbb cccc", Extent::new(100, 100), 20, 1.0).unwrap();
        assert_eq!(block.font_size, 20);
        assert_eq!(block.lines, vec!["aaaa bbbb", "cccc"]);
        assert_eq!(block.line_height, 20.0);
    }

    #[test]
    fn long_word_forces_smaller_size() {
        // 10 chars at half an em must stay strictly narrower than 50px.
        let block = fit_text_block(&Mono, "abcdefghij", Extent::new(50, 100), 30, 1.0).unwrap();
        assert_eq!(block.font_size, 9);
    }

    #[test]
    fn height_and_spacing_shrink_size() {
        let block = fit_text_block(&Mono, "aa bb cc", Extent::new(20, 25), 10, 1.0).unwrap();
        assert_eq!(block.font_size, 9);
        assert_eq!(block.lines, vec!["aa", "bb", "cc"]);

        let spaced = fit_text_block(&Mono, "aa bb cc", Extent::new(20, 25), 10, 2.0).unwrap();
        assert_eq!(spaced.font_size, 8);
        assert_eq!(spaced.lines, vec!["aa bb", "cc"]);
        assert_eq!(spaced.line_height, 16.0);
    }

    #[test]
    fn search_terminates_without_fit() {
        assert!(fit_text_block(&Mono, "Hello", Extent::new(1, 1), 500, 1.0).is_none());
        assert!(fit_text_block(&Mono, "Hi", Extent::new(100, 50), 0, 1.0).is_none());
        assert!(fit_text_block(&Mono, "  \n ", Extent::new(100, 50), 10, 1.0).is_none());
        assert!(fit_text_block(&Mono, "Hi", Extent::new(100, 50), 1, 1.0).is_some());
    }

    #[test]
    fn markup_attributes_and_defaults() {
        let attrs = Attributes::new("FitText")
            .with("text", "'Fresh deals'")
            .with("max_font_size", "72")
            .with("font_path", "fonts/Roca.ttf")
            .with("width", "10");
        let Node::FitText(node) = NodeType::FitText.construct(attrs, Vec::new()).unwrap() else {
            panic!("expected fit text");
        };
        assert_eq!(node.text(), "Fresh deals");
        assert_eq!(node.max_font_size(), 72);
        assert_eq!(node.line_spacing(), 1.0);
        assert_eq!(node.font_color(), Color::BLACK);
        assert_eq!(node.font(), "fonts/Roca.ttf");

        let attrs = Attributes::new("FitText")
            .with("text", "x")
            .with("font_path", "a.ttf");
        let err = NodeType::FitText.construct(attrs, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("max_font_size"));

        let attrs = Attributes::new("FitText")
            .with("text", "x")
            .with("max_font_size", "10")
            .with("font_path", "a.ttf")
            .with("line_spacing", "1e39");
        let err = NodeType::FitText.construct(attrs, Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::InvalidAttribute { ref name, .. } if name == "line_spacing"
        ));
    }

    #[test]
    fn empty_text_renders_background_only() {
        let node = FitText::new(Color::WHITE, "   ", 30, "missing-font.ttf");
        let raster = node
            .compose(Extent::new(20, 10), &ComposeContext::default())
            .unwrap();
        assert_eq!(raster.pixel(10, 5), Some(Color::WHITE));
    }

    #[test]
    fn missing_font_is_reported() {
        let ctx = ComposeContext::new(
            ComposeOptions {
                system_fonts: false,
                ..ComposeOptions::default()
            },
            None,
            Vec::new(),
            AssetBundle::default(),
        );
        let node = FitText::new(Color::WHITE, "Hi", 30, "no-such-font-anywhere.ttf");
        let err = node.compose(Extent::new(100, 50), &ctx).unwrap_err();
        assert!(matches!(err, ComposeError::FontUnavailable(_)));
    }

    fn font_context() -> Option<(ComposeContext, String)> {
        let path = system_font_path()?;
        let bytes = std::fs::read(path).ok()?;
        let mut assets = AssetBundle::default();
        assets.add(Asset::font("banner-font", bytes));
        let ctx = ComposeContext::new(ComposeOptions::default(), None, Vec::new(), assets);
        Some((ctx, "banner-font".to_string()))
    }

    #[test]
    fn rendered_text_is_centred_inside_the_box() {
        let Some((ctx, font)) = font_context() else {
            eprintln!("skipping: no system font installed");
            return;
        };
        let node = FitText::new(Color::TRANSPARENT, "Hi", 40, font).with_font_color(Color::BLACK);
        let raster = node.compose(Extent::new(100, 50), &ctx).unwrap();
        assert_eq!(raster.extent(), Extent::new(100, 50));
        let bounds = raster.opaque_bounds().expect("text was drawn");
        let left = bounds.x as i64;
        let right = 100 - (bounds.x + bounds.width) as i64;
        let top = bounds.y as i64;
        let bottom = 50 - (bounds.y + bounds.height) as i64;
        assert!((left - right).abs() <= 1, "left {left} right {right}");
        assert!((top - bottom).abs() <= 1, "top {top} bottom {bottom}");
    }

    #[test]
    fn painted_ink_stays_within_the_box_before_pasting() {
        let Some((ctx, font)) = font_context() else {
            eprintln!("skipping: no system font installed");
            return;
        };
        let loaded = ctx.load_font(&font).unwrap();
        let renderer = loaded.renderer(true).unwrap();
        // One box is width-bound and the other height-bound, so the chosen
        // size sits at the edge of the box.
        let cases = [
            ("Wavy", Extent::new(57, 400), 300),
            ("Hg", Extent::new(400, 23), 300),
        ];
        for (text, extent, max) in cases {
            let node = FitText::new(Color::TRANSPARENT, text, max, font.clone());
            let block = fit_text_block(&renderer, text, extent, max, 1.0).unwrap();
            let ink = node
                .render_ink(&renderer, &block, extent)
                .unwrap()
                .expect("text was drawn");
            assert!(
                ink.width() < extent.width,
                "{text:?} at {}: ink {}px wide in {extent}",
                block.font_size,
                ink.width()
            );
            assert!(
                ink.height() <= extent.height,
                "{text:?} at {}: ink {}px tall in {extent}",
                block.font_size,
                ink.height()
            );
        }
    }

    #[test]
    fn smallest_max_size_terminates() {
        let Some((ctx, font)) = font_context() else {
            eprintln!("skipping: no system font installed");
            return;
        };
        let node = FitText::new(Color::TRANSPARENT, "Hi", 1, font.clone());
        match node.compose(Extent::new(100, 50), &ctx) {
            Ok(raster) => assert_eq!(raster.extent(), Extent::new(100, 50)),
            Err(err) => assert!(matches!(err, ComposeError::NoFittingSize { .. })),
        }

        let node = FitText::new(Color::TRANSPARENT, "Supercalifragilistic", 60, font);
        let err = node.compose(Extent::new(4, 4), &ctx).unwrap_err();
        assert!(matches!(
            err,
            ComposeError::NoFittingSize { max_font_size: 60, width: 4, height: 4 }
        ));
    }
}

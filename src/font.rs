use crate::assets::is_supported_font_path;
use crate::error::{ComposeError, Result};
use crate::raster::Raster;
use crate::types::Color;
use rustybuzz::{Direction as HbDirection, Face as HbFace, UnicodeBuffer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::{FillRule, Paint, PathBuilder, Transform};
use ttf_parser::{GlyphId, OutlineBuilder};

const FONT_SEARCH_DEPTH: usize = 4;

/// Font program bytes that have been checked to parse.
#[derive(Debug, Clone)]
pub struct LoadedFont {
    name: String,
    data: Arc<Vec<u8>>,
}

impl LoadedFont {
    pub fn from_bytes(name: impl Into<String>, data: Arc<Vec<u8>>) -> Result<Self> {
        let name = name.into();
        if let Err(err) = ttf_parser::Face::parse(data.as_slice(), 0) {
            return Err(ComposeError::FontUnavailable(format!(
                "invalid font data for {name}: {err}"
            )));
        }
        Ok(Self { name, data })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|err| {
            ComposeError::FontUnavailable(format!("{}: {err}", path.display()))
        })?;
        let name = path
            .file_stem()
            .and_then(|v| v.to_str())
            .unwrap_or("font")
            .to_string();
        Self::from_bytes(name, Arc::new(data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn renderer(&self, shape_text: bool) -> Result<FontRenderer<'_>> {
        let face = ttf_parser::Face::parse(self.data.as_slice(), 0).map_err(|err| {
            ComposeError::FontUnavailable(format!("invalid font data for {}: {err}", self.name))
        })?;
        let hb_face = if shape_text {
            HbFace::from_slice(self.data.as_slice(), 0)
        } else {
            None
        };
        Ok(FontRenderer { face, hb_face })
    }
}

/// Text metrics consumed by the font-size search, in pixels at `size`.
pub trait TextMeasure {
    /// Line advance before any spacing multiplier is applied.
    fn line_height(&self, size: u32) -> f32;
    /// Width of the painted footprint, anti-aliased edge pixels included.
    fn ink_width(&self, text: &str, size: u32) -> f32;
    fn ink_height(&self, text: &str, size: u32) -> f32;
}

/// Ink rectangle relative to the pen origin, y growing downward from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct InkBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl InkBox {
    fn union(self, other: InkBox) -> InkBox {
        InkBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[derive(Clone, Copy)]
struct GlyphPlacement {
    glyph_id: u16,
    // Pen position in pixels, y up.
    x: f32,
    y: f32,
}

pub(crate) struct FontRenderer<'a> {
    face: ttf_parser::Face<'a>,
    hb_face: Option<HbFace<'a>>,
}

impl FontRenderer<'_> {
    fn scale(&self, size: u32) -> f32 {
        size as f32 / self.face.units_per_em().max(1) as f32
    }

    pub(crate) fn ascent(&self, size: u32) -> f32 {
        self.face.ascender() as f32 * self.scale(size)
    }

    pub(crate) fn descent(&self, size: u32) -> f32 {
        (self.face.descender() as f32).abs() * self.scale(size)
    }

    pub(crate) fn ink_bounds(&self, text: &str, size: u32) -> Option<InkBox> {
        let scale = self.scale(size);
        let mut bounds: Option<InkBox> = None;
        for placement in self.layout(text, size) {
            let Some(rect) = self.face.glyph_bounding_box(GlyphId(placement.glyph_id)) else {
                continue;
            };
            let glyph = InkBox {
                left: placement.x + rect.x_min as f32 * scale,
                right: placement.x + rect.x_max as f32 * scale,
                top: -(placement.y + rect.y_max as f32 * scale),
                bottom: -(placement.y + rect.y_min as f32 * scale),
            };
            bounds = Some(match bounds {
                Some(acc) => acc.union(glyph),
                None => glyph,
            });
        }
        bounds
    }

    /// Draws `text` with its pen origin at `left` and the ascender line at `top`.
    pub(crate) fn draw_line(
        &self,
        raster: &mut Raster,
        text: &str,
        size: u32,
        left: f32,
        top: f32,
        color: Color,
    ) -> usize {
        let baseline = top + self.ascent(size);
        let scale = self.scale(size);
        let placements = self.layout(text, size);
        let Some(pixmap) = raster.pixmap_mut() else {
            return 0;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;

        let mut drawn = 0usize;
        for placement in placements {
            let mut builder =
                GlyphPathBuilder::new(left + placement.x, baseline - placement.y, scale);
            if self
                .face
                .outline_glyph(GlyphId(placement.glyph_id), &mut builder)
                .is_none()
            {
                continue;
            }
            let Some(path) = builder.finish() else {
                continue;
            };
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            drawn += 1;
        }
        drawn
    }

    fn layout(&self, text: &str, size: u32) -> Vec<GlyphPlacement> {
        let Some(hb_face) = self.hb_face.as_ref() else {
            return self.layout_unshaped(text, size);
        };
        let font_size = size as f32;
        let hb_units = hb_face.units_per_em().max(1) as f32;
        let mut buffer = UnicodeBuffer::new();
        buffer.set_direction(detect_direction(text));
        buffer.push_str(text);
        let output = rustybuzz::shape(hb_face, &[], buffer);
        let infos = output.glyph_infos();
        let positions = output.glyph_positions();
        if infos.is_empty() || infos.len() != positions.len() {
            return self.layout_unshaped(text, size);
        }

        let mut out = Vec::with_capacity(infos.len());
        let mut pen_x = 0.0f32;
        let mut pen_y = 0.0f32;
        for (info, pos) in infos.iter().zip(positions.iter()) {
            let gid = info.glyph_id as u16;
            if gid != 0 {
                out.push(GlyphPlacement {
                    glyph_id: gid,
                    x: pen_x + (pos.x_offset as f32 / hb_units) * font_size,
                    y: pen_y + (pos.y_offset as f32 / hb_units) * font_size,
                });
            }
            pen_x += (pos.x_advance as f32 / hb_units) * font_size;
            pen_y += (pos.y_advance as f32 / hb_units) * font_size;
        }
        out
    }

    fn layout_unshaped(&self, text: &str, size: u32) -> Vec<GlyphPlacement> {
        let font_size = size as f32;
        let units_per_em = self.face.units_per_em().max(1) as f32;
        let mut out = Vec::new();
        let mut pen_x = 0.0f32;
        for ch in text.chars() {
            let gid = self.face.glyph_index(ch).map(|id| id.0).unwrap_or(0);
            if gid == 0 {
                pen_x += font_size * 0.5;
                continue;
            }
            out.push(GlyphPlacement {
                glyph_id: gid,
                x: pen_x,
                y: 0.0,
            });
            let advance_units = self.face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as f32;
            let mut adv = (advance_units / units_per_em) * font_size;
            if adv <= 0.0 {
                adv = font_size * 0.5;
            }
            pen_x += adv;
        }
        out
    }
}

impl TextMeasure for FontRenderer<'_> {
    fn line_height(&self, size: u32) -> f32 {
        self.ascent(size) - self.descent(size)
    }

    // Whole pixels touched by the outline when drawn at an integer pen
    // position and baseline.
    fn ink_width(&self, text: &str, size: u32) -> f32 {
        self.ink_bounds(text, size)
            .map(|b| b.right.ceil() - b.left.floor())
            .unwrap_or(0.0)
    }

    fn ink_height(&self, text: &str, size: u32) -> f32 {
        self.ink_bounds(text, size)
            .map(|b| b.bottom.ceil() - b.top.floor())
            .unwrap_or(0.0)
    }
}

fn detect_direction(text: &str) -> HbDirection {
    for ch in text.chars() {
        let code = ch as u32;
        let rtl = matches!(
            code,
            0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF | 0x1EE00..=0x1EEFF
        );
        if rtl {
            return HbDirection::RightToLeft;
        }
    }
    HbDirection::LeftToRight
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }

    // Font units are y-up; rasters are y-down.
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

pub(crate) fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    #[cfg(target_os = "windows")]
    {
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(&home).join(".fonts"));
            dirs.push(PathBuf::from(home).join(".local/share/fonts"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    dirs
}

/// Finds a font file in `dirs` by exact file name, falling back to a
/// normalised stem match (`"DejaVu Sans"` finds `DejaVuSans.ttf`).
pub(crate) fn find_font_file(dirs: &[PathBuf], reference: &str) -> Option<PathBuf> {
    let reference_path = Path::new(reference);
    let file_name = reference_path.file_name()?.to_str()?.to_ascii_lowercase();
    let stem_key = normalize_name(
        reference_path
            .file_stem()
            .and_then(|v| v.to_str())
            .unwrap_or(reference),
    );

    let mut stem_match = None;
    for dir in dirs {
        let mut files = Vec::new();
        collect_font_files(dir, FONT_SEARCH_DEPTH, &mut files);
        files.sort();
        for path in files {
            let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
                continue;
            };
            if name.to_ascii_lowercase() == file_name {
                return Some(path);
            }
            if stem_match.is_none() {
                let stem = path.file_stem().and_then(|v| v.to_str()).unwrap_or("");
                if !stem_key.is_empty() && normalize_name(stem) == stem_key {
                    stem_match = Some(path);
                }
            }
        }
    }
    stem_match
}

fn collect_font_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if depth > 0 {
                collect_font_files(&path, depth - 1, out);
            }
        } else if is_supported_font_path(&path) {
            out.push(path);
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}


#[cfg(test)]
mod tests {
    use super::testing::system_font;
    use super::*;
    use crate::types::Extent;

    #[test]
    fn find_font_file_prefers_exact_name_then_stem() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("truetype").join("family");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("Roca Regular.ttf"), b"x").unwrap();
        fs::write(dir.path().join("RocaRegular.otf"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let dirs = vec![dir.path().to_path_buf()];

        let exact = find_font_file(&dirs, "fonts/Roca Regular.ttf").unwrap();
        assert_eq!(exact, nested.join("Roca Regular.ttf"));
        let by_stem = find_font_file(&dirs, "roca-regular").unwrap();
        assert!(by_stem.ends_with("RocaRegular.otf") || by_stem.ends_with("Roca Regular.ttf"));
        assert!(find_font_file(&dirs, "notes.txt").is_none());
        assert!(find_font_file(&dirs, "Missing.ttf").is_none());
    }

    #[test]
    fn garbage_bytes_are_not_a_font() {
        let err = LoadedFont::from_bytes("junk", Arc::new(vec![0u8; 16])).unwrap_err();
        assert!(matches!(err, ComposeError::FontUnavailable(_)));
    }

    #[test]
    fn ink_grows_with_size_and_text() {
        let Some(font) = system_font() else {
            eprintln!("skipping: no system font installed");
            return;
        };
        for shape in [true, false] {
            let renderer = font.renderer(shape).unwrap();
            let small = renderer.ink_width("Hello", 12);
            let large = renderer.ink_width("Hello", 48);
            assert!(small > 0.0);
            assert!(large > small * 3.0, "{small} vs {large}");
            assert!(renderer.ink_width("Hello world", 24) > renderer.ink_width("Hello", 24));
            assert_eq!(renderer.ink_width("   ", 24), 0.0);
            assert!(renderer.ink_height("Hg", 40) > renderer.ink_height("a", 40));
            assert!(renderer.ascent(40) > 0.0 && renderer.descent(40) > 0.0);
        }
    }

    #[test]
    fn draw_line_paints_inside_the_raster() {
        let Some(font) = system_font() else {
            eprintln!("skipping: no system font installed");
            return;
        };
        let renderer = font.renderer(true).unwrap();
        let mut raster = Raster::transparent(Extent::new(200, 60)).unwrap();
        let drawn = renderer.draw_line(&mut raster, "Hi there", 32, 0.0, 0.0, Color::BLACK);
        assert!(drawn >= 6, "drew {drawn} glyphs");
        let bounds = raster.opaque_bounds().unwrap();
        assert!(bounds.y < 20);
        assert!(bounds.y + bounds.height <= 60);
    }
}

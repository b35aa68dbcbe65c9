#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().strip_prefix('#')?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).ok();
        match hex.len() {
            3 => {
                let mut out = [0u8; 3];
                for (slot, ch) in out.iter_mut().zip(hex.chars()) {
                    let v = ch.to_digit(16)? as u8;
                    *slot = v * 16 + v;
                }
                Some(Color::rgb(out[0], out[1], out[2]))
            }
            6 => Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Color::rgba(
                channel(0)?,
                channel(2)?,
                channel(4)?,
                channel(6)?,
            )),
            _ => None,
        }
    }

    pub(crate) fn premultiplied(self) -> tiny_skia::PremultipliedColorU8 {
        tiny_skia::ColorU8::from_rgba(self.r, self.g, self.b, self.a).premultiply()
    }

    /// Same colour with its alpha scaled by `coverage / 255`.
    pub(crate) fn with_coverage(self, coverage: u8) -> Self {
        let a = ((self.a as u16) * (coverage as u16) + 127) / 255;
        Self { a: a as u8, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "h" | "horizontal" | "row" => Some(Axis::Horizontal),
            "v" | "vertical" | "column" => Some(Axis::Vertical),
            _ => None,
        }
    }

    pub fn length(self, extent: Extent) -> u32 {
        match self {
            Axis::Horizontal => extent.width,
            Axis::Vertical => extent.height,
        }
    }

    /// Extent of a slot that spans `span` along this axis and the full cross dimension.
    pub fn slot(self, extent: Extent, span: u32) -> Extent {
        match self {
            Axis::Horizontal => Extent::new(span, extent.height),
            Axis::Vertical => Extent::new(extent.width, span),
        }
    }

    pub fn origin(self, offset: i32) -> (i32, i32) {
        match self {
            Axis::Horizontal => (offset, 0),
            Axis::Vertical => (0, offset),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitMode {
    Fit,
    Fill,
}

impl FitMode {
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fit" | "contain" => Some(FitMode::Fit),
            "fill" | "cover" => Some(FitMode::Fill),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(i64),
    Percent(f64),
}

impl Length {
    /// Pixels along an axis of `axis_len`; percentages truncate toward zero.
    pub fn resolve(self, axis_len: u32) -> i64 {
        match self {
            Length::Px(px) => px,
            Length::Percent(pct) => (pct * axis_len as f64 / 100.0) as i64,
        }
    }

    pub(crate) fn is_negative(self) -> bool {
        match self {
            Length::Px(px) => px < 0,
            Length::Percent(pct) => pct < 0.0,
        }
    }

    pub(crate) fn magnitude(self) -> f64 {
        match self {
            Length::Px(px) => px as f64,
            Length::Percent(pct) => pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insets {
    pub left: Length,
    pub right: Length,
    pub top: Length,
    pub bottom: Length,
}

impl Insets {
    pub fn uniform(value: Length) -> Self {
        Self {
            left: value,
            right: value,
            top: value,
            bottom: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_length_truncates() {
        assert_eq!(Length::Percent(50.0).resolve(800), 400);
        assert_eq!(Length::Percent(33.3).resolve(100), 33);
        assert_eq!(Length::Percent(12.5).resolve(7), 0);
        assert_eq!(Length::Px(-3).resolve(100), -3);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Color::from_hex("#ff8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(
            Color::from_hex("#10203040"),
            Some(Color::rgba(16, 32, 48, 64))
        );
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("ff8000"), None);
        assert_eq!(Color::from_hex("#ggg"), None);
    }

    #[test]
    fn coverage_scales_alpha() {
        let c = Color::rgba(10, 20, 30, 200);
        assert_eq!(c.with_coverage(255), c);
        assert_eq!(c.with_coverage(0).a, 0);
        assert_eq!(c.with_coverage(128).a, 100);
    }

    #[test]
    fn axis_slots() {
        let extent = Extent::new(800, 100);
        assert_eq!(Axis::Horizontal.slot(extent, 400), Extent::new(400, 100));
        assert_eq!(Axis::Vertical.slot(extent, 40), Extent::new(800, 40));
        assert_eq!(Axis::from_str("h"), Some(Axis::Horizontal));
        assert_eq!(Axis::from_str("V"), Some(Axis::Vertical));
        assert_eq!(Axis::from_str("x"), None);
    }
}

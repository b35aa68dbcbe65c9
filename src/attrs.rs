use crate::error::{ComposeError, Result};
use crate::types::{Color, Length};
use crate::value::{AttrValue, coerce};

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub raw: String,
    pub value: AttrValue,
}

impl Attribute {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let value = coerce(&raw);
        Self { raw, value }
    }

    /// Text content: a quoted literal's contents, otherwise the raw text.
    pub fn text(&self) -> &str {
        match &self.value {
            AttrValue::Str(s) => s,
            _ => &self.raw,
        }
    }
}

/// Coerced attributes of one markup element.
///
/// Constructors consume the attributes they understand; anything left over
/// once the constructor finishes is reported as unknown.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    tag: String,
    entries: Vec<(String, Attribute)>,
}

impl Attributes {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.insert(name, raw);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, raw: impl Into<String>) {
        let name = name.into();
        let attr = Attribute::new(raw);
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = attr;
        } else {
            self.entries.push((name, attr));
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.entries
            .iter()
            .find_map(|(k, v)| if k == name { Some(v) } else { None })
    }

    pub(crate) fn take(&mut self, name: &str) -> Option<Attribute> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub(crate) fn invalid(&self, name: &str, message: impl Into<String>) -> ComposeError {
        ComposeError::attribute(self.tag.clone(), name, message)
    }

    pub(crate) fn color(&mut self, name: &str, default: Color) -> Result<Color> {
        Ok(self.optional_color(name)?.unwrap_or(default))
    }

    pub(crate) fn optional_color(&mut self, name: &str) -> Result<Option<Color>> {
        let Some(attr) = self.take(name) else {
            return Ok(None);
        };
        if let AttrValue::Str(s) = &attr.value {
            return Color::from_hex(s)
                .map(Some)
                .ok_or_else(|| self.invalid(name, format!("`{}` is not a colour", attr.raw)));
        }
        let channels = attr
            .value
            .as_tuple()
            .filter(|items| items.len() == 3 || items.len() == 4)
            .ok_or_else(|| {
                self.invalid(name, "expected an (r, g, b) or (r, g, b, a) tuple")
            })?;
        let mut rgba = [255u8; 4];
        for (slot, item) in rgba.iter_mut().zip(channels) {
            *slot = item
                .as_i64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| self.invalid(name, "colour channels must be integers in 0..=255"))?;
        }
        Ok(Some(Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3])))
    }

    pub(crate) fn text(&mut self, name: &str) -> Option<String> {
        self.take(name).map(|attr| attr.text().to_string())
    }

    pub(crate) fn required_text(&mut self, name: &str) -> Result<String> {
        self.text(name)
            .ok_or_else(|| self.invalid(name, "attribute is required"))
    }

    pub(crate) fn u32(&mut self, name: &str) -> Result<Option<u32>> {
        let Some(attr) = self.take(name) else {
            return Ok(None);
        };
        attr.value
            .as_i64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                self.invalid(
                    name,
                    format!("expected a non-negative integer, got `{}`", attr.raw),
                )
            })
    }

    pub(crate) fn f32(&mut self, name: &str) -> Result<Option<f32>> {
        let Some(attr) = self.take(name) else {
            return Ok(None);
        };
        match attr.value.as_f64().map(|v| v as f32) {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(self.invalid(name, format!("expected a number, got `{}`", attr.raw))),
        }
    }

    pub(crate) fn bool(&mut self, name: &str) -> Result<Option<bool>> {
        let Some(attr) = self.take(name) else {
            return Ok(None);
        };
        attr.value
            .as_bool()
            .map(Some)
            .ok_or_else(|| self.invalid(name, format!("expected True or False, got `{}`", attr.raw)))
    }

    pub(crate) fn point(&mut self, name: &str) -> Result<Option<(i32, i32)>> {
        let Some(attr) = self.take(name) else {
            return Ok(None);
        };
        let pair = attr
            .value
            .as_tuple()
            .filter(|items| items.len() == 2)
            .and_then(|items| {
                let x = i32::try_from(items[0].as_i64()?).ok()?;
                let y = i32::try_from(items[1].as_i64()?).ok()?;
                Some((x, y))
            });
        pair.map(Some)
            .ok_or_else(|| self.invalid(name, "expected an (x, y) integer pair"))
    }

    /// A number or a tuple of numbers, read as pixel or percentage lengths.
    pub(crate) fn lengths(&mut self, name: &str, percent: bool) -> Result<Option<Vec<Length>>> {
        let Some(attr) = self.take(name) else {
            return Ok(None);
        };
        let items: Vec<&AttrValue> = match &attr.value {
            AttrValue::Tuple(items) => items.iter().collect(),
            scalar => vec![scalar],
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let length = if percent {
                item.as_f64()
                    .filter(|v| v.is_finite())
                    .map(Length::Percent)
            } else {
                item.as_i64().map(Length::Px)
            };
            let Some(length) = length else {
                let expected = if percent { "numbers" } else { "integers" };
                return Err(self.invalid(
                    name,
                    format!("expected {expected}, got `{}`", attr.raw),
                ));
            };
            out.push(length);
        }
        Ok(Some(out))
    }

    pub(crate) fn finish(self) -> Result<()> {
        match self.entries.first() {
            Some((name, _)) => Err(self.invalid(name, "unknown attribute")),
            None => Ok(()),
        }
    }
}

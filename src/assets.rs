use base64::Engine;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Font,
    Image,
}

/// Named in-memory bytes that markup can reference instead of a file path.
#[derive(Debug, Clone)]
pub struct Asset {
    pub name: String,
    pub kind: AssetKind,
    pub data: Arc<Vec<u8>>,
}

impl Asset {
    pub fn new(name: impl Into<String>, kind: AssetKind, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            data: Arc::new(data),
        }
    }

    pub fn font(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, AssetKind::Font, data)
    }

    pub fn image(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::new(name, AssetKind::Image, data)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub assets: Vec<Asset>,
}

impl AssetBundle {
    /// Later additions shadow earlier ones with the same kind and name.
    pub fn add(&mut self, asset: Asset) {
        self.assets.push(asset);
    }

    pub fn find(&self, kind: AssetKind, name: &str) -> Option<&Asset> {
        self.assets
            .iter()
            .rev()
            .find(|asset| asset.kind == kind && asset.name == name)
    }
}

pub(crate) fn is_supported_font_path(path: &std::path::Path) -> bool {
    let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
        return false;
    };
    matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf")
}

/// Splits a `data:` URI into its mime type and decoded payload.
pub(crate) fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    if !uri.starts_with("data:") {
        return None;
    }
    let (header, payload) = uri.split_once(',')?;
    let mime = header
        .trim_start_matches("data:")
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = if header.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()?
    } else {
        payload.as_bytes().to_vec()
    };
    Some((mime, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_uri_base64_decodes_payload() {
        let (mime, data) = parse_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, b"hello");
        assert!(parse_data_uri("img/tv.png").is_none());
        assert!(parse_data_uri("data:image/png;base64,@@@").is_none());
    }

    #[test]
    fn later_assets_shadow_earlier_ones() {
        let mut bundle = AssetBundle::default();
        bundle.add(Asset::image("logo", vec![1]));
        bundle.add(Asset::font("logo", vec![2]));
        bundle.add(Asset::image("logo", vec![3]));
        let found = bundle.find(AssetKind::Image, "logo").unwrap();
        assert_eq!(found.data.as_slice(), &[3]);
        let font = bundle.find(AssetKind::Font, "logo").unwrap();
        assert_eq!(font.data.as_slice(), &[2]);
        assert!(bundle.find(AssetKind::Font, "missing").is_none());
    }

    #[test]
    fn font_extensions() {
        assert!(is_supported_font_path(std::path::Path::new("a/B.TTF")));
        assert!(is_supported_font_path(std::path::Path::new("x.otf")));
        assert!(!is_supported_font_path(std::path::Path::new("x.woff")));
    }
}

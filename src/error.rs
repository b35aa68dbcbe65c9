use thiserror::Error;

pub type Result<T> = std::result::Result<T, ComposeError>;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("unknown node type: <{0}>")]
    UnknownNodeType(String),
    #[error("malformed tree: {0}")]
    MalformedTree(String),
    #[error("invalid attribute `{name}` on <{tag}>: {message}")]
    InvalidAttribute {
        tag: String,
        name: String,
        message: String,
    },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("image source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("font unavailable: {0}")]
    FontUnavailable(String),
    #[error("no font size from {max_font_size} down to 1 fits the text into {width}x{height}")]
    NoFittingSize {
        max_font_size: u32,
        width: u32,
        height: u32,
    },
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
    #[error("markup error: {0}")]
    Markup(#[from] roxmltree::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComposeError {
    pub(crate) fn attribute(
        tag: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ComposeError::InvalidAttribute {
            tag: tag.into(),
            name: name.into(),
            message: message.into(),
        }
    }
}

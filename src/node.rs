use crate::attrs::Attributes;
use crate::container::{Padding, Root, Shadow, Table};
use crate::context::ComposeContext;
use crate::error::{ComposeError, Result};
use crate::fit_text::FitText;
use crate::picture::Picture;
use crate::raster::Raster;
use crate::types::{Color, Extent};
use std::fmt;

/// Two-phase layout contract: the caller picks the extent, the node renders
/// exactly that many pixels.
pub trait Compose {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Filler,
    Root,
    Table,
    Padding,
    Shadow,
    Picture,
    FitText,
}

impl NodeType {
    pub const ALL: [NodeType; 7] = [
        NodeType::Filler,
        NodeType::Root,
        NodeType::Table,
        NodeType::Padding,
        NodeType::Shadow,
        NodeType::Picture,
        NodeType::FitText,
    ];

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "Filler" | "VNode" => Ok(NodeType::Filler),
            "Root" => Ok(NodeType::Root),
            "Table" | "FTable" => Ok(NodeType::Table),
            "Padding" => Ok(NodeType::Padding),
            "Shadow" => Ok(NodeType::Shadow),
            "Picture" => Ok(NodeType::Picture),
            "FitText" => Ok(NodeType::FitText),
            other => Err(ComposeError::UnknownNodeType(other.to_string())),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            NodeType::Filler => "Filler",
            NodeType::Root => "Root",
            NodeType::Table => "Table",
            NodeType::Padding => "Padding",
            NodeType::Shadow => "Shadow",
            NodeType::Picture => "Picture",
            NodeType::FitText => "FitText",
        }
    }

    /// Builds a node of this type from coerced markup attributes and its
    /// already-built children.
    pub fn construct(self, attrs: Attributes, children: Vec<Node>) -> Result<Node> {
        Ok(match self {
            NodeType::Filler => Node::Filler(Filler::from_markup(attrs, children)?),
            NodeType::Root => Node::Root(Root::from_markup(attrs, children)?),
            NodeType::Table => Node::Table(Table::from_markup(attrs, children)?),
            NodeType::Padding => Node::Padding(Padding::from_markup(attrs, children)?),
            NodeType::Shadow => Node::Shadow(Shadow::from_markup(attrs, children)?),
            NodeType::Picture => Node::Picture(Picture::from_markup(attrs, children)?),
            NodeType::FitText => Node::FitText(FitText::from_markup(attrs, children)?),
        })
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Filler(Filler),
    Root(Root),
    Table(Table),
    Padding(Padding),
    Shadow(Shadow),
    Picture(Picture),
    FitText(FitText),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Filler(_) => NodeType::Filler,
            Node::Root(_) => NodeType::Root,
            Node::Table(_) => NodeType::Table,
            Node::Padding(_) => NodeType::Padding,
            Node::Shadow(_) => NodeType::Shadow,
            Node::Picture(_) => NodeType::Picture,
            Node::FitText(_) => NodeType::FitText,
        }
    }

    pub fn background(&self) -> Color {
        match self {
            Node::Filler(n) => n.background,
            Node::Root(n) => n.background(),
            Node::Table(n) => n.background(),
            Node::Padding(n) => n.background(),
            Node::Shadow(n) => n.background(),
            Node::Picture(n) => n.background(),
            Node::FitText(n) => n.background(),
        }
    }

    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Filler(_) | Node::Picture(_) | Node::FitText(_) => Vec::new(),
            Node::Root(n) => vec![n.child()],
            Node::Padding(n) => vec![n.child()],
            Node::Shadow(n) => vec![n.child()],
            Node::Table(n) => n.children().iter().collect(),
        }
    }

    pub fn shape(&self) -> Shape {
        Shape {
            node_type: self.node_type(),
            children: self.children().into_iter().map(Node::shape).collect(),
        }
    }
}

impl Compose for Node {
    fn compose(&self, extent: Extent, ctx: &ComposeContext) -> Result<Raster> {
        let raster = match self {
            Node::Filler(n) => n.compose(extent, ctx),
            Node::Root(n) => n.compose(extent, ctx),
            Node::Table(n) => n.compose(extent, ctx),
            Node::Padding(n) => n.compose(extent, ctx),
            Node::Shadow(n) => n.compose(extent, ctx),
            Node::Picture(n) => n.compose(extent, ctx),
            Node::FitText(n) => n.compose(extent, ctx),
        }?;
        debug_assert_eq!(raster.extent(), extent);
        Ok(raster)
    }
}

macro_rules! impl_into_node {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Node {
                fn from(value: $variant) -> Self {
                    Node::$variant(value)
                }
            }
        )*
    };
}

impl_into_node!(Filler, Root, Table, Padding, Shadow, Picture, FitText);

/// Tag-and-children skeleton of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub node_type: NodeType,
    pub children: Vec<Shape>,
}

impl Shape {
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(Shape::depth).max().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Shape::node_count).sum::<usize>()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.children.is_empty() {
            return write!(f, "<{}/>", self.node_type);
        }
        write!(f, "<{}>", self.node_type)?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.node_type)
    }
}

/// Solid rectangle of the background colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Filler {
    pub background: Color,
}

impl Filler {
    pub fn new(background: Color) -> Self {
        Self { background }
    }

    pub(crate) fn from_markup(mut attrs: Attributes, children: Vec<Node>) -> Result<Self> {
        expect_leaf(NodeType::Filler, &children)?;
        let background = take_background(&mut attrs)?;
        discard_extent_hint(&mut attrs);
        attrs.finish()?;
        Ok(Self::new(background))
    }
}

impl Compose for Filler {
    fn compose(&self, extent: Extent, _ctx: &ComposeContext) -> Result<Raster> {
        Raster::new(extent, self.background)
    }
}

pub(crate) fn take_background(attrs: &mut Attributes) -> Result<Color> {
    attrs.color("bg_color", Color::TRANSPARENT)
}

/// `width`/`height` are accepted on every element for markup compatibility;
/// only `Root` gives them meaning.
pub(crate) fn discard_extent_hint(attrs: &mut Attributes) {
    for name in ["width", "height"] {
        if let Some(attr) = attrs.take(name) {
            log::trace!("ignoring {name}={} on <{}>", attr.raw, attrs.tag());
        }
    }
}

pub(crate) fn expect_leaf(node_type: NodeType, children: &[Node]) -> Result<()> {
    if children.is_empty() {
        Ok(())
    } else {
        Err(ComposeError::MalformedTree(format!(
            "<{node_type}> takes no children, found {}",
            children.len()
        )))
    }
}

pub(crate) fn expect_single_child(node_type: NodeType, mut children: Vec<Node>) -> Result<Node> {
    match (children.pop(), children.is_empty()) {
        (Some(child), true) => Ok(child),
        (popped, _) => Err(ComposeError::MalformedTree(format!(
            "<{node_type}> needs exactly one child, found {}",
            children.len() + usize::from(popped.is_some())
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_resolve_including_legacy_aliases() {
        for node_type in NodeType::ALL {
            assert_eq!(NodeType::from_tag(node_type.tag()).unwrap(), node_type);
        }
        assert_eq!(NodeType::from_tag("VNode").unwrap(), NodeType::Filler);
        assert_eq!(NodeType::from_tag("FTable").unwrap(), NodeType::Table);
        let err = NodeType::from_tag("Marquee").unwrap_err();
        assert!(matches!(err, ComposeError::UnknownNodeType(ref tag) if tag == "Marquee"));
    }

    #[test]
    fn filler_composes_solid_rectangle() {
        let ctx = ComposeContext::default();
        let raster = Filler::new(Color::rgb(1, 2, 3))
            .compose(Extent::new(7, 5), &ctx)
            .unwrap();
        assert_eq!(raster.extent(), Extent::new(7, 5));
        assert_eq!(raster.pixel(6, 4), Some(Color::rgb(1, 2, 3)));
    }

    #[test]
    fn filler_rejects_children() {
        let attrs = Attributes::new("Filler");
        let child = Node::from(Filler::new(Color::BLACK));
        let err = NodeType::Filler.construct(attrs, vec![child]).unwrap_err();
        assert!(matches!(err, ComposeError::MalformedTree(_)));
    }

    #[test]
    fn single_child_counts() {
        let one = vec![Node::from(Filler::new(Color::BLACK))];
        assert!(expect_single_child(NodeType::Padding, one).is_ok());
        let err = expect_single_child(NodeType::Padding, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("found 0"));
        let two = vec![
            Node::from(Filler::new(Color::BLACK)),
            Node::from(Filler::new(Color::WHITE)),
        ];
        let err = expect_single_child(NodeType::Shadow, two).unwrap_err();
        assert!(err.to_string().contains("found 2"));
    }

    #[test]
    fn shape_display_and_depth() {
        let shape = Shape {
            node_type: NodeType::Root,
            children: vec![Shape {
                node_type: NodeType::Table,
                children: vec![
                    Shape {
                        node_type: NodeType::Filler,
                        children: Vec::new(),
                    },
                    Shape {
                        node_type: NodeType::Picture,
                        children: Vec::new(),
                    },
                ],
            }],
        };
        assert_eq!(
            shape.to_string(),
            "<Root><Table><Filler/><Picture/></Table></Root>"
        );
        assert_eq!(shape.depth(), 3);
        assert_eq!(shape.node_count(), 4);
    }
}

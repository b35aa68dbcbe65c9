use crate::attrs::Attributes;
use crate::container::Root;
use crate::error::{ComposeError, Result};
use crate::node::{Node, NodeType};
use std::io::Read;
use std::path::Path;

/// Parses banner markup into a tree. The document element must be `<Root>`.
pub fn build_tree(markup: &str) -> Result<Root> {
    let doc = roxmltree::Document::parse(markup)?;
    let top = doc.root_element();
    let node_type = NodeType::from_tag(top.tag_name().name())?;
    if node_type != NodeType::Root {
        return Err(ComposeError::MalformedTree(format!(
            "document element must be <Root>, found <{node_type}>"
        )));
    }
    match build_element(top)? {
        Node::Root(root) => Ok(root),
        other => Err(ComposeError::MalformedTree(format!(
            "document element built as <{}>",
            other.node_type()
        ))),
    }
}

pub fn build_tree_from_reader<R: Read>(mut reader: R) -> Result<Root> {
    let mut markup = String::new();
    reader.read_to_string(&mut markup)?;
    build_tree(&markup)
}

pub fn build_tree_from_path(path: impl AsRef<Path>) -> Result<Root> {
    let markup = std::fs::read_to_string(path.as_ref())?;
    build_tree(&markup)
}

fn build_element(element: roxmltree::Node<'_, '_>) -> Result<Node> {
    let tag = element.tag_name().name();
    let node_type = NodeType::from_tag(tag)?;
    let mut attrs = Attributes::new(tag);
    for attr in element.attributes() {
        attrs.insert(attr.name(), attr.value());
    }

    let mut children = Vec::new();
    for child in element.children() {
        if child.is_element() {
            children.push(build_element(child)?);
        } else if child.is_text() {
            let text = child.text().unwrap_or_default().trim();
            if !text.is_empty() {
                log::warn!("ignoring text {text:?} inside <{tag}>");
            }
        }
    }
    node_type.construct(attrs, children)
}

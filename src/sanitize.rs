//! Subtractive clean-up: remove unwanted elements from the whole tree before
//! extraction walks it.

use crate::dom::DocNode;
use crate::error::{guard_depth, PipelineError};

const STRIPPED_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "link", "meta"];

/// True when the element's `class` or `id` mentions "advertisement".
pub fn is_advertisement(node: &DocNode) -> bool {
    ["class", "id"].iter().any(|key| {
        node.attr(key)
            .is_some_and(|v| v.to_lowercase().contains("advertisement"))
    })
}

fn is_stripped(node: &DocNode) -> bool {
    match node.tag() {
        Some(tag) => STRIPPED_TAGS.contains(&tag.to_ascii_lowercase().as_str()) || is_advertisement(node),
        None => false,
    }
}

/// Copy of `doc` without stripped elements and their subtrees.
pub fn strip(doc: &DocNode, max_depth: usize) -> Result<DocNode, PipelineError> {
    strip_node(doc, 0, max_depth)
}

fn strip_node(node: &DocNode, depth: usize, max_depth: usize) -> Result<DocNode, PipelineError> {
    guard_depth(depth, max_depth)?;

    let keep = |children: &[DocNode]| -> Result<Vec<DocNode>, PipelineError> {
        children
            .iter()
            .filter(|c| !is_stripped(c))
            .map(|c| strip_node(c, depth + 1, max_depth))
            .collect()
    };

    Ok(match node {
        DocNode::Document { children } => DocNode::Document {
            children: keep(children)?,
        },
        DocNode::Element {
            name,
            attributes,
            children,
        } => DocNode::Element {
            name: name.clone(),
            attributes: attributes.clone(),
            children: keep(children)?,
        },
        other => other.clone(),
    })
}

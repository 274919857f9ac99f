use std::collections::VecDeque;

use serde::Serialize;

use super::raw::RawNode;
use super::PipelineOptions;
use crate::error::{guard_depth, PipelineError};
use crate::observe::{DropReason, PipelineEvent, PipelineObserver, Stage};

/// Pruned, content-only tree node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntermediateNode {
    pub tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Link target, kept for `a` elements so paragraphs can resolve anchors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<IntermediateNode>,
}

impl IntermediateNode {
    pub fn new(tag: &str, content: &str, children: Vec<IntermediateNode>) -> Self {
        IntermediateNode {
            tag: tag.to_string(),
            content: content.to_string(),
            href: None,
            children,
        }
    }

    /// Own content plus every descendant's, space-joined in document order.
    pub fn text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if !node.content.is_empty() {
                parts.push(&node.content);
            }
            stack.extend(node.children.iter().rev());
        }
        parts.join(" ").trim().to_string()
    }

    /// Breadth-first search for the closest anchor carrying an href.
    pub fn nearest_href(&self) -> Option<&str> {
        let mut queue: VecDeque<&IntermediateNode> = VecDeque::from([self]);
        while let Some(node) = queue.pop_front() {
            if let Some(href) = node.href.as_deref() {
                return Some(href);
            }
            queue.extend(&node.children);
        }
        None
    }
}

/// Post-order prune: a node survives iff it has content or a surviving child.
///
/// The extractor already filters empties; this pass re-checks independently
/// and is idempotent.
pub fn normalize(
    nodes: &[RawNode],
    opts: &PipelineOptions,
    obs: &mut dyn PipelineObserver,
) -> Result<Vec<IntermediateNode>, PipelineError> {
    normalize_level(nodes, 1, opts.max_depth, obs)
}

fn normalize_level(
    nodes: &[RawNode],
    depth: usize,
    max_depth: usize,
    obs: &mut dyn PipelineObserver,
) -> Result<Vec<IntermediateNode>, PipelineError> {
    guard_depth(depth, max_depth)?;

    let mut out = Vec::with_capacity(nodes.len());
    for raw in nodes {
        let children = if raw.children.is_empty() {
            Vec::new()
        } else {
            normalize_level(&raw.children, depth + 1, max_depth, obs)?
        };

        let node = IntermediateNode {
            tag: raw.tag.clone(),
            content: raw.text_content.trim().to_string(),
            href: anchor_href(raw),
            children,
        };

        if node.content.is_empty() && node.children.is_empty() {
            obs.on_event(&PipelineEvent::NodeDropped {
                stage: Stage::Normalize,
                tag: raw.tag.clone(),
                reason: DropReason::NoContent,
            });
            continue;
        }

        obs.on_event(&PipelineEvent::NodeVisited {
            stage: Stage::Normalize,
            tag: raw.tag.clone(),
        });
        out.push(node);
    }
    Ok(out)
}

fn anchor_href(raw: &RawNode) -> Option<String> {
    if raw.tag != "a" {
        return None;
    }
    raw.attributes
        .get("href")
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

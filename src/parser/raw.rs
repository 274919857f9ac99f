use std::collections::{BTreeMap, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use super::PipelineOptions;
use crate::dom::DocNode;
use crate::error::{guard_depth, PipelineError};
use crate::observe::{DropReason, PipelineEvent, PipelineObserver, Stage};
use crate::sanitize;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Tag given to nodes built from document text.
pub const TEXT_TAG: &str = "#text";

const BLOCKED_TAGS: &[&str] = &[
    "script", "style", "meta", "link", "noscript", "nav", "footer", "header", "iframe", "svg",
    // never page content
    "head", "title", "template",
];

/// Link and button labels that are site chrome, not content.
pub const IRRELEVANT_PHRASES: &[&str] = &[
    "back to top",
    "sign in",
    "sign up",
    "log in",
    "login",
    "skip to content",
    "skip to main content",
    "read more",
    "menu",
    "close",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawNode {
    pub tag: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(rename = "content", skip_serializing_if = "String::is_empty")]
    pub text_content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawNode>,
}

impl RawNode {
    pub fn text(s: &str) -> Self {
        RawNode {
            tag: TEXT_TAG.to_string(),
            text_content: s.to_string(),
            ..Default::default()
        }
    }

    pub fn element(tag: &str, children: Vec<RawNode>) -> Self {
        RawNode {
            tag: tag.to_string(),
            children,
            ..Default::default()
        }
    }
}

/// Trim and fold every whitespace run into a single space.
pub fn collapse_whitespace(s: &str) -> String {
    WS_RE.replace_all(s.trim(), " ").into_owned()
}

/// Walk the document from its content root and return the surviving
/// top-level nodes in source order.
pub fn extract_raw(
    doc: &DocNode,
    opts: &PipelineOptions,
    obs: &mut dyn PipelineObserver,
) -> Result<Vec<RawNode>, PipelineError> {
    let Some(root) = find_content_root(doc) else {
        warn!("No content root element found; nothing to extract");
        return Ok(Vec::new());
    };
    info!("Content root: <{}>", root.tag().unwrap_or("#document"));

    let mut extractor = Extractor { opts, obs };
    let mut nodes = Vec::new();
    for child in root.children() {
        if let Some(node) = extractor.traverse(child, 1)? {
            nodes.push(node);
        }
    }

    if nodes.is_empty() {
        warn!("Content root yielded no children; check markup or filtering");
    } else {
        info!("Extracted {} top-level nodes", nodes.len());
    }
    Ok(nodes)
}

/// First `<body>` breadth-first, else the first element under the document.
fn find_content_root(doc: &DocNode) -> Option<&DocNode> {
    let mut queue: VecDeque<&DocNode> = VecDeque::from([doc]);
    while let Some(node) = queue.pop_front() {
        if node.tag().is_some_and(|t| t.eq_ignore_ascii_case("body")) {
            return Some(node);
        }
        queue.extend(node.children());
    }

    match doc {
        DocNode::Element { .. } => Some(doc),
        _ => doc.children().iter().find(|c| c.tag().is_some()),
    }
}

struct Extractor<'a> {
    opts: &'a PipelineOptions,
    obs: &'a mut dyn PipelineObserver,
}

impl Extractor<'_> {
    fn traverse(&mut self, node: &DocNode, depth: usize) -> Result<Option<RawNode>, PipelineError> {
        guard_depth(depth, self.opts.max_depth)?;

        match node {
            DocNode::Comment(_) => {
                self.drop_node("#comment", DropReason::Comment);
                Ok(None)
            }
            DocNode::Doctype(_) => {
                self.drop_node("#doctype", DropReason::Doctype);
                Ok(None)
            }
            DocNode::Text(raw) => {
                let text = raw.replace(['\n', '\r'], " ");
                let text = text.trim();
                if text.is_empty() {
                    self.drop_node(TEXT_TAG, DropReason::EmptyText);
                    return Ok(None);
                }
                self.visit(TEXT_TAG);
                Ok(Some(RawNode::text(text)))
            }
            DocNode::Document { children } => self.element("#document", &[], children, depth),
            DocNode::Element {
                name,
                attributes,
                children,
            } => {
                let tag = name.to_ascii_lowercase();
                if BLOCKED_TAGS.contains(&tag.as_str()) {
                    self.drop_node(&tag, DropReason::BlockedTag);
                    return Ok(None);
                }
                if sanitize::is_advertisement(node) {
                    self.drop_node(&tag, DropReason::Advertisement);
                    return Ok(None);
                }
                if (tag == "a" || tag == "button")
                    && self.opts.is_irrelevant_phrase(&subtree_text(node))
                {
                    self.drop_node(&tag, DropReason::IrrelevantControl);
                    return Ok(None);
                }
                self.element(&tag, attributes, children, depth)
            }
        }
    }

    fn element(
        &mut self,
        tag: &str,
        attributes: &[(String, String)],
        children: &[DocNode],
        depth: usize,
    ) -> Result<Option<RawNode>, PipelineError> {
        self.visit(tag);

        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if let Some(raw) = self.traverse(child, depth + 1)? {
                kept.push(raw);
            }
        }

        if kept.is_empty() {
            self.drop_node(tag, DropReason::NoContent);
            return Ok(None);
        }

        Ok(Some(RawNode {
            tag: tag.to_string(),
            // later duplicates overwrite earlier ones
            attributes: attributes.iter().cloned().collect(),
            text_content: String::new(),
            children: kept,
        }))
    }

    fn visit(&mut self, tag: &str) {
        self.obs.on_event(&PipelineEvent::NodeVisited {
            stage: Stage::Extract,
            tag: tag.to_string(),
        });
    }

    fn drop_node(&mut self, tag: &str, reason: DropReason) {
        self.obs.on_event(&PipelineEvent::NodeDropped {
            stage: Stage::Extract,
            tag: tag.to_string(),
            reason,
        });
    }
}

/// All text under `node`, whitespace-collapsed. Runs ahead of the depth
/// guard, so it must not recurse.
fn subtree_text(node: &DocNode) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        match n {
            DocNode::Text(t) => parts.push(t.as_str()),
            _ => stack.extend(n.children().iter().rev()),
        }
    }
    collapse_whitespace(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::observe::EventCounts;

    fn extract(html: &str) -> Vec<RawNode> {
        let doc = parse_html(html.as_bytes(), 64).unwrap();
        extract_raw(&doc, &PipelineOptions::default(), &mut ()).unwrap()
    }

    fn contains_tag(nodes: &[RawNode], tag: &str) -> bool {
        nodes.iter().any(|n| n.tag == tag || contains_tag(&n.children, tag))
    }

    #[test]
    fn starts_at_body_and_skips_head() {
        let nodes = extract("<html><head><title>T</title></head><body><p>Hello</p></body></html>");
        assert_eq!(nodes, vec![RawNode::element("p", vec![RawNode::text("Hello")])]);
    }

    #[test]
    fn script_is_absent() {
        let nodes = extract("<body><script>var x = 1;</script><p>Body</p></body>");
        assert!(!contains_tag(&nodes, "script"));
        let json = serde_json::to_string(&nodes).unwrap();
        assert!(!json.contains("var x"));
    }

    #[test]
    fn chrome_elements_dropped() {
        let nodes = extract(
            "<body><header>Site</header><nav><a href='/'>Home</a></nav>\
             <main><p>Keep</p></main><footer>(c)</footer></body>",
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].tag, "main");
    }

    #[test]
    fn irrelevant_controls_dropped() {
        let mut counts = EventCounts::default();
        let doc = parse_html(
            b"<body><a href='#top'>  Back to\n  Top </a><button>Sign In</button><a href='/x'>Apply now</a></body>",
            64,
        )
        .unwrap();
        let nodes = extract_raw(&doc, &PipelineOptions::default(), &mut counts).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].attributes.get("href").map(String::as_str), Some("/x"));
        assert_eq!(counts.dropped_with(DropReason::IrrelevantControl), 2);
    }

    #[test]
    fn advertisement_blocks_dropped() {
        let nodes = extract(
            "<body><div class='Sidebar ADVERTISEMENT'><p>Buy</p></div>\
             <aside id='advertisement-1'>Ad</aside><p>Real</p></body>",
        );
        assert_eq!(nodes, vec![RawNode::element("p", vec![RawNode::text("Real")])]);
    }

    #[test]
    fn extra_phrases_extend_the_set() {
        let doc = parse_html(b"<body><a href='/c'>Accept cookies</a><p>x</p></body>", 64).unwrap();
        let opts = PipelineOptions {
            extra_irrelevant_phrases: vec!["Accept Cookies".into()],
            ..Default::default()
        };
        let nodes = extract_raw(&doc, &opts, &mut ()).unwrap();
        assert!(!contains_tag(&nodes, "a"));
    }

    #[test]
    fn empty_elements_and_comments_dropped() {
        let nodes = extract("<body><div>  </div><!-- c --><div><span></span></div><p>x</p></body>");
        assert_eq!(nodes, vec![RawNode::element("p", vec![RawNode::text("x")])]);
    }

    #[test]
    fn text_newlines_become_spaces() {
        let nodes = extract("<body><p>\n  line one\nline two  </p></body>");
        assert_eq!(nodes[0].children[0].text_content, "line one line two");
    }

    #[test]
    fn duplicate_attributes_last_wins() {
        let doc = DocNode::Document {
            children: vec![DocNode::element(
                "body",
                &[],
                vec![DocNode::element(
                    "div",
                    &[("data-k", "first"), ("data-k", "second")],
                    vec![DocNode::text("t")],
                )],
            )],
        };
        let nodes = extract_raw(&doc, &PipelineOptions::default(), &mut ()).unwrap();
        assert_eq!(nodes[0].attributes.get("data-k").map(String::as_str), Some("second"));
    }

    #[test]
    fn missing_root_is_empty_not_error() {
        let doc = DocNode::Document { children: vec![DocNode::Comment("only".into())] };
        let nodes = extract_raw(&doc, &PipelineOptions::default(), &mut ()).unwrap();
        assert!(nodes.is_empty());

        assert!(extract("").is_empty());
    }

    #[test]
    fn falls_back_to_first_element() {
        let doc = DocNode::Document {
            children: vec![
                DocNode::Doctype("html".into()),
                DocNode::element("article", &[], vec![DocNode::element("p", &[], vec![DocNode::text("a")])]),
            ],
        };
        let nodes = extract_raw(&doc, &PipelineOptions::default(), &mut ()).unwrap();
        assert_eq!(nodes[0].tag, "p");
    }

    #[test]
    fn depth_guard() {
        let html = format!("<body>{}deep{}</body>", "<div>".repeat(20), "</div>".repeat(20));
        let doc = parse_html(html.as_bytes(), 64).unwrap();
        let opts = PipelineOptions {
            max_depth: 10,
            ..Default::default()
        };
        let err = extract_raw(&doc, &opts, &mut ()).unwrap_err();
        assert_eq!(err, PipelineError::DepthExceeded { limit: 10 });
    }

    #[test]
    fn collapse() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}

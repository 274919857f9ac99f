//! Parsed-document input tree.
//!
//! The pipeline only depends on this minimal shape; `parse_html` is the one
//! place that knows about the HTML parser behind it.

use scraper::{ElementRef, Html, Node};

use crate::error::{guard_depth, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    Document {
        children: Vec<DocNode>,
    },
    Element {
        name: String,
        /// Source order; duplicates are kept as written.
        attributes: Vec<(String, String)>,
        children: Vec<DocNode>,
    },
    Text(String),
    Comment(String),
    Doctype(String),
}

impl DocNode {
    pub fn element(name: &str, attributes: &[(&str, &str)], children: Vec<DocNode>) -> Self {
        DocNode::Element {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    pub fn text(s: &str) -> Self {
        DocNode::Text(s.to_string())
    }

    /// Element name, `None` for every other kind.
    pub fn tag(&self) -> Option<&str> {
        match self {
            DocNode::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn children(&self) -> &[DocNode] {
        match self {
            DocNode::Document { children } | DocNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// Last value written for `key`, mirroring DOM attribute semantics.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            DocNode::Element { attributes, .. } => attributes
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Parse raw bytes into a `DocNode` tree.
///
/// The HTML5 parser recovers from any markup, so the only parse failure is
/// input that is not UTF-8.
pub fn parse_html(bytes: &[u8], max_depth: usize) -> Result<DocNode, PipelineError> {
    let source = std::str::from_utf8(bytes)?;
    from_html(&Html::parse_document(source), max_depth)
}

fn from_html(html: &Html, max_depth: usize) -> Result<DocNode, PipelineError> {
    let mut children = Vec::new();
    // fragments splice their children in place
    let mut pending: Vec<_> = html.tree.root().children().rev().collect();
    while let Some(child) = pending.pop() {
        match child.value() {
            Node::Doctype(d) => children.push(DocNode::Doctype(d.name().to_string())),
            Node::Comment(c) => children.push(DocNode::Comment(c.comment.to_string())),
            Node::Fragment => pending.extend(child.children().rev()),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    children.push(convert_element(el, 1, max_depth)?);
                }
            }
            _ => {}
        }
    }

    Ok(DocNode::Document { children })
}

fn convert_element(el: ElementRef, depth: usize, max_depth: usize) -> Result<DocNode, PipelineError> {
    guard_depth(depth, max_depth)?;

    let value = el.value();
    let attributes = value
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let mut children = Vec::new();
    let mut pending: Vec<_> = el.children().rev().collect();
    while let Some(child) = pending.pop() {
        match child.value() {
            Node::Text(t) => children.push(DocNode::Text(t.text.to_string())),
            Node::Comment(c) => children.push(DocNode::Comment(c.comment.to_string())),
            Node::Fragment => pending.extend(child.children().rev()),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    children.push(convert_element(child_el, depth + 1, max_depth)?);
                }
            }
            // processing instructions carry no content
            _ => {}
        }
    }

    Ok(DocNode::Element {
        name: value.name().to_string(),
        attributes,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(node: &'a DocNode, tag: &str) -> Option<&'a DocNode> {
        if node.tag() == Some(tag) {
            return Some(node);
        }
        node.children().iter().find_map(|c| find(c, tag))
    }

    #[test]
    fn parses_document_shell() {
        let doc = parse_html(b"<!DOCTYPE html><html><body><p>Hi</p></body></html>", 64).unwrap();
        let DocNode::Document { children } = &doc else {
            panic!("expected document root, got {:?}", doc);
        };
        assert!(matches!(&children[0], DocNode::Doctype(name) if name == "html"));
        let p = find(&doc, "p").unwrap();
        assert_eq!(p.children(), &[DocNode::text("Hi")]);
    }

    #[test]
    fn keeps_comments_and_attributes() {
        let doc = parse_html(b"<body><!-- note --><a href=\"/x\" class=\"btn\">go</a></body>", 64).unwrap();
        let body = find(&doc, "body").unwrap();
        assert!(matches!(&body.children()[0], DocNode::Comment(c) if c.trim() == "note"));
        let a = find(&doc, "a").unwrap();
        assert_eq!(a.attr("href"), Some("/x"));
        assert_eq!(a.attr("class"), Some("btn"));
        assert_eq!(a.attr("id"), None);
    }

    #[test]
    fn attr_last_write_wins() {
        let node = DocNode::element("div", &[("id", "a"), ("id", "b")], vec![]);
        assert_eq!(node.attr("id"), Some("b"));
    }

    #[test]
    fn fragment_children_are_spliced() {
        use scraper::Selector;

        let mut html = Html::parse_document("<body><p>a</p><i>b</i></body>");
        let body_id = html.select(&Selector::parse("body").unwrap()).next().unwrap().id();
        let italic = html.select(&Selector::parse("i").unwrap()).next().unwrap().value().clone();
        let mut body = html.tree.get_mut(body_id).unwrap();
        body.append(Node::Fragment).append(Node::Element(italic));

        let doc = from_html(&html, 64).unwrap();
        let tags: Vec<_> = find(&doc, "body").unwrap().children().iter().map(|c| c.tag()).collect();
        assert_eq!(tags, vec![Some("p"), Some("i"), Some("i")]);
    }

    #[test]
    fn invalid_utf8_is_parse_error() {
        let err = parse_html(&[0x3c, 0x70, 0x3e, 0xff, 0xfe], 64).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn deep_nesting_trips_guard() {
        let html = format!("{}x{}", "<div>".repeat(40), "</div>".repeat(40));
        let err = parse_html(html.as_bytes(), 16).unwrap_err();
        assert_eq!(err, PipelineError::DepthExceeded { limit: 16 });
        assert!(parse_html(html.as_bytes(), 64).is_ok());
    }
}

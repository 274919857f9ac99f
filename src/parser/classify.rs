use super::keywords;
use super::normalize::IntermediateNode;
use super::raw::TEXT_TAG;
use super::PipelineOptions;
use crate::error::{guard_depth, PipelineError};
use crate::observe::{DropReason, PipelineEvent, PipelineObserver, RoutedField, Stage};
use crate::section::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Heading(u8),
    Paragraph,
    List,
    Container,
}

/// Tags that never break a run of text.
const INLINE_TAGS: &[&str] = &[
    "a", "b", "strong", "em", "i", "code", "small", "u", "mark", "abbr", "time", "br",
];

fn role(node: &IntermediateNode) -> Role {
    match node.tag.as_str() {
        "p" | "span" | "#text" => Role::Paragraph,
        "ul" | "ol" => Role::List,
        tag => match heading_level(tag) {
            Some(level) => Role::Heading(level),
            None if is_inline_run(node) => Role::Paragraph,
            None => Role::Container,
        },
    }
}

/// Element whose children are all text or inline markup, read as one paragraph.
fn is_inline_run(node: &IntermediateNode) -> bool {
    !node.children.is_empty()
        && node
            .children
            .iter()
            .all(|c| c.tag == TEXT_TAG || INLINE_TAGS.contains(&c.tag.as_str()))
}

fn heading_level(tag: &str) -> Option<u8> {
    let digit = tag.strip_prefix('h')?;
    match digit.parse::<u8>() {
        Ok(level @ 1..=6) => Some(level),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct OpenSection {
    section: Section,
    /// `None` for a headless section opened by leading content.
    level: Option<u8>,
}

impl OpenSection {
    fn headless() -> Self {
        OpenSection {
            section: Section::default(),
            level: None,
        }
    }
}

/// Traversal context threaded through the fold by value.
#[derive(Debug, Clone, Default)]
struct FoldState {
    flushed: Vec<Section>,
    current: Option<OpenSection>,
    /// Index of the active subsection within `current`.
    subheading: Option<usize>,
}

impl FoldState {
    fn flush(mut self, obs: &mut dyn PipelineObserver) -> Self {
        if let Some(open) = self.current.take() {
            obs.on_event(&PipelineEvent::SectionFlushed {
                heading: open.section.heading_opt(),
            });
            self.flushed.push(open.section);
        }
        self.subheading = None;
        self
    }

    fn open(&mut self) -> &mut Section {
        &mut self.current.get_or_insert_with(OpenSection::headless).section
    }

    /// Active subsection if one is open, else the section itself.
    fn target(&mut self) -> &mut Section {
        let sub = self.subheading;
        let section = self.open();
        match sub {
            Some(i) => &mut section.subsections[i],
            None => section,
        }
    }

    /// h1-h3 open a new section unless a shallower heading is already open.
    fn starts_section(&self, level: u8) -> bool {
        if level > 3 {
            return false;
        }
        match &self.current {
            None => true,
            Some(OpenSection { level: None, .. }) => true,
            Some(OpenSection { level: Some(open), .. }) => *open >= level,
        }
    }
}

struct Classifier<'a> {
    opts: &'a PipelineOptions,
    obs: &'a mut dyn PipelineObserver,
}

/// Fold sibling nodes into sections, then drop every invalid section
/// bottom-up. Never reorders; never fails except on the depth guard.
pub fn classify(
    nodes: &[IntermediateNode],
    opts: &PipelineOptions,
    obs: &mut dyn PipelineObserver,
) -> Result<Vec<Section>, PipelineError> {
    let mut classifier = Classifier { opts, obs };
    let state = classifier.fold(nodes, FoldState::default(), 1)?;
    let state = state.flush(classifier.obs);
    Ok(retain_valid(state.flushed, classifier.obs))
}

impl Classifier<'_> {
    fn fold(
        &mut self,
        nodes: &[IntermediateNode],
        mut state: FoldState,
        depth: usize,
    ) -> Result<FoldState, PipelineError> {
        guard_depth(depth, self.opts.max_depth)?;

        for node in nodes {
            self.obs.on_event(&PipelineEvent::NodeVisited {
                stage: Stage::Classify,
                tag: node.tag.clone(),
            });

            state = match role(node) {
                Role::Heading(level) => self.heading(node, level, state),
                Role::Paragraph => self.paragraph(node, state),
                Role::List => self.list(node, state),
                Role::Container => self.fold(&node.children, state, depth + 1)?,
            };
        }
        Ok(state)
    }

    fn heading(&mut self, node: &IntermediateNode, level: u8, mut state: FoldState) -> FoldState {
        let text = node.text();
        if text.is_empty() {
            self.blank(node);
            return state;
        }

        if state.starts_section(level) {
            state = state.flush(self.obs);
            state.current = Some(OpenSection {
                section: Section::with_heading(&text),
                level: Some(level),
            });
        } else {
            let subsections = &mut state.open().subsections;
            subsections.push(Section::with_heading(&text));
            let index = subsections.len() - 1;
            state.subheading = Some(index);
        }
        state
    }

    fn paragraph(&mut self, node: &IntermediateNode, mut state: FoldState) -> FoldState {
        let text = node.text();
        if text.is_empty() {
            self.blank(node);
            return state;
        }

        let target = state.target();
        match keywords::route_for(&text).filter(|_| self.opts.keyword_routing) {
            Some(route) => keywords::apply(route, target, &text, node, self.obs),
            None => target.append_content(&text),
        }
        state
    }

    fn list(&mut self, node: &IntermediateNode, mut state: FoldState) -> FoldState {
        let items: Vec<String> = node
            .children
            .iter()
            .filter(|child| child.tag == "li")
            .map(IntermediateNode::text)
            .filter(|text| !text.is_empty())
            .collect();
        if items.is_empty() {
            return state;
        }

        if state.subheading.is_some() {
            state.target().list_items.extend(items);
        } else if self.opts.keyword_routing && keywords::mentions_required_documents(&items) {
            state.open().required_documents.extend(items);
            self.obs.on_event(&PipelineEvent::FieldRouted {
                field: RoutedField::RequiredDocuments,
            });
        } else {
            state.open().list_items.extend(items);
        }
        state
    }

    fn blank(&mut self, node: &IntermediateNode) {
        self.obs.on_event(&PipelineEvent::NodeDropped {
            stage: Stage::Classify,
            tag: node.tag.clone(),
            reason: DropReason::BlankText,
        });
    }
}

fn retain_valid(sections: Vec<Section>, obs: &mut dyn PipelineObserver) -> Vec<Section> {
    sections
        .into_iter()
        .filter_map(|mut section| {
            section.subsections = retain_valid(std::mem::take(&mut section.subsections), obs);
            if section.is_valid() {
                Some(section)
            } else {
                obs.on_event(&PipelineEvent::SectionDiscarded {
                    heading: section.heading_opt(),
                });
                None
            }
        })
        .collect()
}

//! Structured pipeline events.
//!
//! Stages report what they visit, drop and emit through a `PipelineObserver`
//! instead of printing, so callers can log or count without parsing text.

use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Normalize,
    Classify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    NodeVisited { stage: Stage, tag: String },
    NodeDropped { stage: Stage, tag: String, reason: DropReason },
    SectionFlushed { heading: Option<String> },
    SectionDiscarded { heading: Option<String> },
    FieldRouted { field: RoutedField },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Comment,
    Doctype,
    BlockedTag,
    Advertisement,
    IrrelevantControl,
    EmptyText,
    NoContent,
    /// Heading or paragraph whose text was blank.
    BlankText,
    /// A second contact paragraph for a target that already has one.
    ContactAlreadySet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutedField {
    Contact,
    Submission,
    StudyType,
    RequiredDocuments,
}

pub trait PipelineObserver {
    fn on_event(&mut self, event: &PipelineEvent);
}

impl PipelineObserver for () {
    fn on_event(&mut self, _event: &PipelineEvent) {}
}

impl<A: PipelineObserver, B: PipelineObserver> PipelineObserver for (A, B) {
    fn on_event(&mut self, event: &PipelineEvent) {
        self.0.on_event(event);
        self.1.on_event(event);
    }
}

/// Forwards events to `tracing`.
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::NodeVisited { stage, tag } => trace!(?stage, %tag, "visit"),
            PipelineEvent::NodeDropped { stage, tag, reason } => {
                debug!(?stage, %tag, ?reason, "dropped node")
            }
            PipelineEvent::SectionFlushed { heading } => debug!(?heading, "section flushed"),
            PipelineEvent::SectionDiscarded { heading } => {
                debug!(?heading, "invalid section discarded")
            }
            PipelineEvent::FieldRouted { field } => trace!(?field, "keyword routed"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventCounts {
    pub visited: usize,
    pub dropped: usize,
    pub flushed: usize,
    pub discarded: usize,
    pub routed: usize,
    pub drops: Vec<(String, DropReason)>,
}

impl PipelineObserver for EventCounts {
    fn on_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::NodeVisited { .. } => self.visited += 1,
            PipelineEvent::NodeDropped { tag, reason, .. } => {
                self.dropped += 1;
                self.drops.push((tag.clone(), *reason));
            }
            PipelineEvent::SectionFlushed { .. } => self.flushed += 1,
            PipelineEvent::SectionDiscarded { .. } => self.discarded += 1,
            PipelineEvent::FieldRouted { .. } => self.routed += 1,
        }
    }
}

impl EventCounts {
    pub fn dropped_with(&self, reason: DropReason) -> usize {
        self.drops.iter().filter(|(_, r)| *r == reason).count()
    }
}

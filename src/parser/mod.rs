pub mod classify;
pub mod keywords;
pub mod normalize;
pub mod raw;

use serde::Deserialize;
use tracing::{info, warn};

use crate::dom::{self, DocNode};
use crate::error::PipelineError;
use crate::observe::PipelineObserver;
use crate::sanitize;
use crate::section::Section;
use raw::RawNode;

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// How unwanted markup is removed before the tree is walked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Filter node by node during extraction.
    #[default]
    Inline,
    /// Strip unwanted elements from the whole tree first, then extract.
    Subtractive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_depth: usize,
    pub keyword_routing: bool,
    pub strategy: Strategy,
    /// Added to the built-in irrelevant link/button labels.
    pub extra_irrelevant_phrases: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            keyword_routing: true,
            strategy: Strategy::Inline,
            extra_irrelevant_phrases: Vec::new(),
        }
    }
}

impl PipelineOptions {
    /// `text` is expected whitespace-collapsed; comparison ignores case.
    pub fn is_irrelevant_phrase(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        raw::IRRELEVANT_PHRASES.contains(&lower.as_str())
            || self
                .extra_irrelevant_phrases
                .iter()
                .any(|p| raw::collapse_whitespace(p).to_lowercase() == lower)
    }
}

/// Everything one document produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDocument {
    pub raw: Vec<RawNode>,
    pub sections: Vec<Section>,
}

/// Three-stage pipeline: document → raw tree → pruned tree → sections.
pub fn process_document(
    doc: &DocNode,
    opts: &PipelineOptions,
    obs: &mut dyn PipelineObserver,
) -> Result<ProcessedDocument, PipelineError> {
    let stripped;
    let doc = match opts.strategy {
        Strategy::Inline => doc,
        Strategy::Subtractive => {
            stripped = sanitize::strip(doc, opts.max_depth)?;
            &stripped
        }
    };

    let raw = raw::extract_raw(doc, opts, obs)?;

    let intermediate = normalize::normalize(&raw, opts, obs)?;
    if intermediate.is_empty() {
        warn!("No intermediate nodes survived normalization");
    } else {
        info!("Normalized into {} intermediate nodes", intermediate.len());
    }

    let sections = classify::classify(&intermediate, opts, obs)?;
    if sections.is_empty() {
        warn!("Classification produced no sections");
    } else {
        info!("Classified {} sections", sections.len());
    }

    Ok(ProcessedDocument { raw, sections })
}

/// Parse `bytes` as HTML and run the pipeline over it.
pub fn process_html(
    bytes: &[u8],
    opts: &PipelineOptions,
    obs: &mut dyn PipelineObserver,
) -> Result<ProcessedDocument, PipelineError> {
    let doc = dom::parse_html(bytes, opts.max_depth)?;
    process_document(&doc, opts, obs)
}

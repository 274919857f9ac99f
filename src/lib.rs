//! HTML to hierarchical JSON sections.
//!
//! Pipeline: parsed document → raw tree (filtered) → intermediate tree
//! (pruned) → `Section` sequence. Acquisition and JSON writing live in
//! `fetch` and `output`; the stages in `parser` are pure and synchronous.

pub mod dom;
pub mod error;
pub mod fetch;
pub mod observe;
pub mod output;
pub mod parser;
pub mod sanitize;
pub mod section;
pub mod settings;

pub use dom::DocNode;
pub use error::PipelineError;
pub use parser::{process_document, process_html, PipelineOptions, ProcessedDocument, Strategy};
pub use section::{Section, StudyType};

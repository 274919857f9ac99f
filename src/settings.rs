use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::{PipelineOptions, Strategy, DEFAULT_MAX_DEPTH};

const ENV_PREFIX: &str = "HTML_SECTIONS";
const CONFIG_FILE: &str = "html_sections";

/// Layered settings: defaults, then an optional `html_sections.*` file,
/// then `HTML_SECTIONS_*` environment variables. CLI flags are applied on top
/// by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub max_depth: usize,
    pub keyword_routing: bool,
    pub strategy: Strategy,
    pub extra_irrelevant_phrases: Vec<String>,
    pub output: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_depth: DEFAULT_MAX_DEPTH,
            keyword_routing: true,
            strategy: Strategy::Inline,
            extra_irrelevant_phrases: Vec::new(),
            output: PathBuf::from("result.json"),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .try_parsing(true)
                        .list_separator(",")
                        .with_list_parse_key("extra_irrelevant_phrases"),
                ),
        )
    }

    fn from_builder(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let defaults = Settings::default();
        builder
            .set_default("max_depth", defaults.max_depth as i64)?
            .set_default("keyword_routing", defaults.keyword_routing)?
            .set_default("strategy", "inline")?
            .set_default("extra_irrelevant_phrases", Vec::<String>::new())?
            .set_default("output", defaults.output.to_string_lossy().to_string())?
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_depth: self.max_depth,
            keyword_routing: self.keyword_routing,
            strategy: self.strategy,
            extra_irrelevant_phrases: self.extra_irrelevant_phrases.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_without_sources() {
        let s = Settings::from_builder(Config::builder()).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.pipeline_options(), PipelineOptions::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = r#"
            max_depth = 32
            keyword_routing = false
            strategy = "subtractive"
            extra_irrelevant_phrases = ["share this", "print"]
        "#;
        let s = Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
            .unwrap();
        assert_eq!(s.max_depth, 32);
        assert!(!s.keyword_routing);
        assert_eq!(s.strategy, Strategy::Subtractive);
        assert_eq!(s.extra_irrelevant_phrases, vec!["share this".to_string(), "print".to_string()]);
        assert_eq!(s.output, PathBuf::from("result.json"));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let toml = r#"strategy = "sideways""#;
        let err = Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)));
        assert!(err.is_err());
    }
}

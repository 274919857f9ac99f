use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use html_sections::observe::{EventCounts, TracingObserver};
use html_sections::output::write_json;
use html_sections::settings::Settings;
use html_sections::{fetch, process_html, PipelineOptions, Strategy};

#[derive(Parser)]
#[command(name = "html_sections", about = "Convert HTML pages into hierarchical JSON sections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract sections from one URL or HTML file
    Extract {
        /// URL (http/https) or local file path
        input: String,
        /// Where to write the sections (default: `output` setting, result.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write the filtered raw tree here
        #[arg(long)]
        raw_out: Option<PathBuf>,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Extract every .html/.htm file in a directory
    Batch {
        dir: PathBuf,
        /// Directory for the .json results (default: next to each input)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Args)]
struct PipelineArgs {
    /// Maximum document nesting before giving up
    #[arg(long)]
    max_depth: Option<usize>,
    /// Markup removal strategy
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,
    /// Route every paragraph to plain content (no contact/submit/study-type fields)
    #[arg(long)]
    no_keywords: bool,
}

impl PipelineArgs {
    fn resolve(&self, settings: &Settings) -> PipelineOptions {
        let mut opts = settings.pipeline_options();
        if let Some(depth) = self.max_depth {
            opts.max_depth = depth;
        }
        if let Some(strategy) = self.strategy {
            opts.strategy = strategy;
        }
        if self.no_keywords {
            opts.keyword_routing = false;
        }
        opts
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(?settings, "Settings loaded");

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            raw_out,
            pipeline,
        } => {
            let opts = pipeline.resolve(&settings);
            let output = output.unwrap_or_else(|| settings.output.clone());

            let bytes = fetch::load_source(&input).await?;
            let mut observer = (TracingObserver, EventCounts::default());
            let doc = process_html(&bytes, &opts, &mut observer)
                .with_context(|| format!("Extraction failed for {}", input))?;

            if let Some(raw_path) = raw_out {
                write_json(&raw_path, &doc.raw)?;
                println!("Raw tree saved to {}", raw_path.display());
            }
            write_json(&output, &doc.sections)?;

            let counts = observer.1;
            println!(
                "Extracted {} sections ({} nodes visited, {} dropped, {} invalid sections discarded).",
                doc.sections.len(),
                counts.visited,
                counts.dropped,
                counts.discarded,
            );
            println!("Data saved to {}", output.display());
            Ok(())
        }
        Commands::Batch {
            dir,
            out_dir,
            pipeline,
        } => {
            let opts = pipeline.resolve(&settings);
            let files = html_files(&dir)?;
            if files.is_empty() {
                println!("No .html files in {}.", dir.display());
                return Ok(());
            }
            println!("Processing {} files...", files.len());
            let stats = process_files(&files, out_dir.as_deref(), &opts)?;
            println!(
                "Done: {} files ({} ok, {} errors), {} sections.",
                stats.total, stats.ok, stats.errors, stats.sections
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct BatchStats {
    total: usize,
    ok: usize,
    errors: usize,
    sections: usize,
}

fn html_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn json_path_for(file: &Path, out_dir: Option<&Path>) -> PathBuf {
    let name = file.with_extension("json");
    match (out_dir, name.file_name()) {
        (Some(dir), Some(file_name)) => dir.join(file_name),
        _ => name,
    }
}

/// Documents run in parallel; each one goes through the pipeline on a single thread.
fn process_files(files: &[PathBuf], out_dir: Option<&Path>, opts: &PipelineOptions) -> Result<BatchStats> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let results: Vec<Result<usize>> = files
        .par_iter()
        .map(|file| {
            let outcome = process_file(file, out_dir, opts);
            if let Err(e) = &outcome {
                warn!("{}: {:#}", file.display(), e);
            }
            pb.inc(1);
            outcome
        })
        .collect();
    pb.finish_and_clear();

    let mut stats = BatchStats {
        total: files.len(),
        ok: 0,
        errors: 0,
        sections: 0,
    };
    for r in results {
        match r {
            Ok(n) => {
                stats.ok += 1;
                stats.sections += n;
            }
            Err(_) => stats.errors += 1,
        }
    }
    Ok(stats)
}

fn process_file(file: &Path, out_dir: Option<&Path>, opts: &PipelineOptions) -> Result<usize> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let doc = process_html(&bytes, opts, &mut TracingObserver)?;
    write_json(&json_path_for(file, out_dir), &doc.sections)?;
    Ok(doc.sections.len())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

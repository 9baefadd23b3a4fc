use anyhow::{Context, Result, bail};
use clap::Parser;
use creacube::io::catalog_store::load_catalog;
use creacube::io::decoder::CsvLayout;
use creacube::io::event_writer::{output_path_for, write_events};
use creacube::{ParallelPipeline, SequenceJob};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

mod inputs;
mod settings;

/// Annotate CreaCube tracking exports with configuration-change events.
#[derive(Debug, Parser)]
#[command(name = "auto_annotator", version)]
struct Cli {
    /// Tracking export files, or directories searched recursively for them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON catalog of known configurations.
    #[arg(short, long)]
    catalog: PathBuf,

    /// JSON file overriding pipeline settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write annotation files here instead of next to each input.
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of annotation workers (defaults to the number of CPUs).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Minimum log level; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Argument Parsing & Logging ---
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    // --- 2. Settings & Catalog ---
    let config = settings::load_pipeline_config(cli.config.as_deref())?;
    let catalog = load_catalog(&cli.catalog)
        .with_context(|| format!("loading catalog {}", cli.catalog.display()))?;
    if catalog.is_empty() {
        warn!("catalog is empty; no frame can match a configuration");
    }

    // --- 3. Input Discovery ---
    let files = inputs::discover(&cli.inputs)?;
    if files.is_empty() {
        bail!("no tracking exports found in the given inputs");
    }
    let outputs = plan_outputs(&files, cli.output_dir.as_deref())?;
    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }
    info!(inputs = files.len(), "annotating tracking exports");

    // --- 4. Annotation ---
    let catalog = Arc::new(catalog);
    let pipeline = match cli.jobs {
        Some(workers) => ParallelPipeline::with_workers(config, catalog, CsvLayout::default(), workers),
        None => ParallelPipeline::new(config, catalog),
    };
    let jobs = files.iter().map(SequenceJob::from_csv).collect();
    let outcomes = pipeline.annotate_all(jobs).await?;

    // --- 5. Output ---
    let mut failures = 0usize;
    for ((input, output), outcome) in files.iter().zip(outputs).zip(outcomes) {
        let written = outcome.result.map_err(anyhow::Error::from).and_then(|run| {
            write_events(&output, &run.events)?;
            Ok((output, run))
        });
        match written {
            Ok((output, run)) => info!(
                input = %input.display(),
                output = %output.display(),
                frames = run.summary.frames_processed,
                matched = run.summary.frames_matched,
                events = run.events.len(),
                "annotations written"
            ),
            Err(err) => {
                failures += 1;
                error!(input = %input.display(), error = %format!("{err:#}"), "annotation failed");
            }
        }
    }
    pipeline.shutdown().await;

    if failures > 0 {
        bail!("{failures} of {} inputs failed", files.len());
    }
    Ok(())
}

/// Resolves the annotation file of every input, refusing inputs that would write to
/// the same file.
fn plan_outputs(files: &[PathBuf], output_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::with_capacity(files.len());
    let mut outputs = Vec::with_capacity(files.len());
    for input in files {
        let output = output_path_for(input, output_dir);
        if let Some(previous) = claimed.insert(output.clone(), input) {
            bail!(
                "{} and {} would both write {}",
                previous.display(),
                input.display(),
                output.display()
            );
        }
        outputs.push(output);
    }
    Ok(outputs)
}

/// Installs a compact stderr subscriber. Later calls are no-ops.
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "auto_annotator",
            "--catalog",
            "configs.json",
            "-o",
            "out",
            "-j",
            "4",
            "p359.csv",
            "sessions/",
        ])
        .unwrap();
        assert_eq!(cli.inputs, vec![PathBuf::from("p359.csv"), PathBuf::from("sessions/")]);
        assert_eq!(cli.catalog, PathBuf::from("configs.json"));
        assert_eq!(cli.jobs, Some(4));
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn catalog_and_inputs_are_required() {
        assert!(Cli::try_parse_from(["auto_annotator", "p359.csv"]).is_err());
        assert!(Cli::try_parse_from(["auto_annotator", "--catalog", "c.json"]).is_err());
    }

    #[test]
    fn outputs_sit_next_to_inputs_by_default() {
        let files = vec![PathBuf::from("s/a/p359.csv"), PathBuf::from("s/b/p359.csv")];
        let outputs = plan_outputs(&files, None).unwrap();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("s/a/p359_annotations.csv"),
                PathBuf::from("s/b/p359_annotations.csv")
            ]
        );
    }

    #[test]
    fn shared_stems_in_one_output_dir_are_refused() {
        let files = vec![PathBuf::from("s/a/p359.csv"), PathBuf::from("s/b/p359.csv")];
        let err = plan_outputs(&files, Some(Path::new("out"))).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("s/a/p359.csv"));
        assert!(message.contains("s/b/p359.csv"));
    }

    #[test]
    fn distinct_stems_share_an_output_dir() {
        let files = vec![PathBuf::from("s/a/p359.csv"), PathBuf::from("s/b/p360.csv")];
        let outputs = plan_outputs(&files, Some(Path::new("out"))).unwrap();
        assert_eq!(outputs[0], Path::new("out").join("p359_annotations.csv"));
        assert_eq!(outputs[1], Path::new("out").join("p360_annotations.csv"));
    }

    #[test]
    fn init_logging_twice_does_not_panic() {
        init_logging("debug");
        init_logging("warn");
    }
}

pub mod config;
pub mod error;
pub mod pipeline;

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use config::PipelineConfig;
use error::{PipelineError, ValidationError};
use pipeline::validator::MAX_FILE_SIZE;
use pipeline::{format_batch, to_json, DocumentPipeline, SourceFile};

/// Initialize tracing with the RUST_LOG env filter.
/// Default: warn for dependencies, info for this crate. Logs go to stderr.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,clause_scan=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Command line options
#[derive(Debug, Default)]
struct Options {
    json: bool,
    paths: Vec<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Options {
    let mut options = Options::default();
    for arg in args {
        match arg.as_str() {
            "--json" => options.json = true,
            _ => options.paths.push(PathBuf::from(arg)),
        }
    }
    options
}

/// Expand directories into the files beneath them
fn collect_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }

        for entry in WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }

    files
}

async fn read_file(path: &Path) -> Result<SourceFile, PipelineError> {
    SourceFile::from_path(path)
        .await
        .map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// Read every path that can be read. Unreadable and oversized files are
/// skipped with a message; oversized ones are never loaded into memory.
async fn load_files(paths: &[PathBuf]) -> (Vec<SourceFile>, Vec<String>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut skipped = Vec::new();

    for path in paths {
        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                skipped.push(format!("{}: {}", path.display(), e));
                continue;
            }
        };

        if size > MAX_FILE_SIZE {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            skipped.push(
                ValidationError::TooLarge {
                    name,
                    size,
                    limit: MAX_FILE_SIZE,
                }
                .to_string(),
            );
            continue;
        }

        match read_file(path).await {
            Ok(file) => files.push(file),
            Err(e) => skipped.push(e.to_string()),
        }
    }

    (files, skipped)
}

/// Ingest, extract and analyze the given files and directories, then print
/// the summaries to stdout. Ctrl-C cancels the run.
pub async fn run(args: impl IntoIterator<Item = String>) -> Result<(), PipelineError> {
    let options = parse_args(args);
    let paths = collect_paths(&options.paths);
    if paths.is_empty() {
        return Err(PipelineError::NothingToDo);
    }

    let config = PipelineConfig::from_env()?;

    let (files, skipped) = load_files(&paths).await;
    for reason in skipped {
        eprintln!("skipped: {}", reason);
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            trigger.cancel();
        }
    });

    let pipeline = DocumentPipeline::from_config(&config);

    for rejected in pipeline.ingest(files).await? {
        eprintln!("skipped: {}", rejected);
    }

    for failure in pipeline.extract_all(&cancel).await? {
        eprintln!("extraction failed: {}", failure);
    }

    let results = pipeline.analyze(&cancel).await;
    tracing::info!("Analyzed {} of {} file(s)", results.len(), paths.len());

    if options.json {
        println!("{}", to_json(&results)?);
    } else {
        print!("{}", format_batch(&results));
    }

    Ok(())
}

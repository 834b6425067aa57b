//! Batch orchestration over a file or a directory of files.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::pipeline::{self, FileError, PipelineContext};

/// Recognized input extensions: cached spectrograms and PCM audio.
const INPUT_EXTENSIONS: [&str; 2] = ["npy", "wav"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "An explicit output file only makes sense for a single-file input; {path} is a directory"
    )]
    OutputWithDirectory { path: PathBuf },
    #[error("Failed to inspect input path {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to list directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How a run's input was resolved, decided once up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputSelection {
    SingleFile { input: PathBuf, output: PathBuf },
    Directory(PathBuf),
}

impl InputSelection {
    /// Classify the input path and validate the output combination.
    ///
    /// A directory combined with an explicit output file is ambiguous and
    /// fails here, before any file is touched.
    pub fn resolve(
        data_path: &Path,
        explicit_output: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let metadata = std::fs::metadata(data_path).map_err(|source| ConfigError::Inspect {
            path: data_path.to_path_buf(),
            source,
        })?;
        if metadata.is_dir() {
            if explicit_output.is_some() {
                return Err(ConfigError::OutputWithDirectory {
                    path: data_path.to_path_buf(),
                });
            }
            Ok(InputSelection::Directory(data_path.to_path_buf()))
        } else {
            let output = explicit_output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| pipeline::derived_output_path(data_path));
            Ok(InputSelection::SingleFile {
                input: data_path.to_path_buf(),
                output,
            })
        }
    }
}

/// Outcome of a run. Failures never abort the remaining files.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failures: Vec<FileError>,
}

/// Run the pipeline for the resolved selection.
pub fn run(
    selection: &InputSelection,
    ctx: &PipelineContext<'_>,
) -> Result<BatchSummary, ConfigError> {
    match selection {
        InputSelection::SingleFile { input, output } => {
            let mut summary = BatchSummary::default();
            match pipeline::process_file(input, output, ctx) {
                Ok(_) => summary.processed += 1,
                Err(err) => {
                    tracing::warn!("{err}");
                    summary.failures.push(err);
                }
            }
            Ok(summary)
        }
        InputSelection::Directory(dir) => {
            let files = enumerate_inputs(dir)?;
            tracing::info!("Annotating {} inputs in {}", files.len(), dir.display());
            Ok(process_many(&files, ctx))
        }
    }
}

fn enumerate_inputs(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| ConfigError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if !path.is_file() {
            continue;
        }
        let recognized = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                INPUT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if recognized {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Process independent files on a bounded worker pool.
///
/// Workers share only the read-only pipeline context; each claims the next
/// unprocessed index until the list is drained.
fn process_many(files: &[PathBuf], ctx: &PipelineContext<'_>) -> BatchSummary {
    if files.is_empty() {
        return BatchSummary::default();
    }
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(files.len());
    let next = AtomicUsize::new(0);
    let outcomes: Mutex<Vec<Result<(), FileError>>> = Mutex::new(Vec::with_capacity(files.len()));
    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    let Some(input) = files.get(idx) else { break };
                    let output = pipeline::derived_output_path(input);
                    let outcome = pipeline::process_file(input, &output, ctx).map(|_| ());
                    if let Err(err) = &outcome {
                        tracing::warn!("{err}");
                    }
                    if let Ok(mut guard) = outcomes.lock() {
                        guard.push(outcome);
                    }
                }
            });
        }
    });
    let collected = outcomes
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut summary = BatchSummary::default();
    for outcome in collected {
        match outcome {
            Ok(()) => summary.processed += 1,
            Err(err) => summary.failures.push(err),
        }
    }
    summary.failures.sort_by(|a, b| a.path.cmp(&b.path));
    summary
}

//! Per-file stage sequencing.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analysis::{
    self, FeatureError, NormalizationStats, NormalizeError, mel_bands_from_spectrogram,
    mel_bands_from_waveform,
};
use crate::classifier::{Classifier, ClassifierError};
use crate::io::npy::{self, NpyError};
use crate::io::wav::{self, WavError};
use crate::postprocess::annotate::{Annotation, AnnotationError};
use crate::postprocess::smooth::smooth_decisions;
use crate::postprocess::threshold::{ThresholdError, apply_threshold};
use crate::types::{CLASS_COUNT, MelBandMatrix};

/// Pipeline stage names used in per-file error reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Read,
    Features,
    Normalize,
    Classify,
    Threshold,
    Write,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::Features => "features",
            Stage::Normalize => "normalize",
            Stage::Classify => "classify",
            Stage::Threshold => "threshold",
            Stage::Write => "write",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Npy(#[from] NpyError),
    #[error(transparent)]
    Wav(#[from] WavError),
    #[error(transparent)]
    Features(#[from] FeatureError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Classify(#[from] ClassifierError),
    #[error(transparent)]
    Threshold(#[from] ThresholdError),
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
}

/// A pipeline failure tied to the file and stage it happened in.
#[derive(Debug, Error)]
#[error("{stage} stage failed for {path}: {source}")]
pub struct FileError {
    pub path: PathBuf,
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

/// Read-only state shared by every file in a run.
pub struct PipelineContext<'a> {
    pub stats: &'a NormalizationStats,
    pub classifier: &'a dyn Classifier,
    pub thresholds: [f32; CLASS_COUNT],
    pub smoothing: bool,
}

/// Run the full pipeline for one input file and write its annotation.
pub fn process_file(
    input: &Path,
    output: &Path,
    ctx: &PipelineContext<'_>,
) -> Result<Annotation, FileError> {
    let mels = extract_features(input)?;
    let normalized = ctx
        .stats
        .apply(&mels)
        .map_err(|err| stage_error(input, Stage::Normalize, err.into()))?;
    let probabilities = ctx
        .classifier
        .predict(&normalized)
        .map_err(|err| stage_error(input, Stage::Classify, err.into()))?;
    let mut decisions = apply_threshold(&probabilities, &ctx.thresholds)
        .map_err(|err| stage_error(input, Stage::Threshold, err.into()))?;
    if ctx.smoothing {
        smooth_decisions(&mut decisions, analysis::smoothing_min_frames());
    }
    let annotation = Annotation::encode(&decisions, analysis::hop_seconds());
    annotation
        .write_to(output)
        .map_err(|err| stage_error(input, Stage::Write, err.into()))?;
    tracing::debug!(
        "Annotated {} -> {} ({} intervals)",
        input.display(),
        output.display(),
        annotation.intervals().len()
    );
    Ok(annotation)
}

/// Cached spectrograms skip the waveform front end; everything else goes
/// through the full STFT path.
fn extract_features(input: &Path) -> Result<MelBandMatrix, FileError> {
    let cached = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("npy"));
    if cached {
        let spec = npy::read_matrix(input)
            .map_err(|err| stage_error(input, Stage::Read, err.into()))?;
        mel_bands_from_spectrogram(spec)
            .map_err(|err| stage_error(input, Stage::Features, err.into()))
    } else {
        let waveform = wav::load_mono_waveform(input)
            .map_err(|err| stage_error(input, Stage::Read, err.into()))?;
        mel_bands_from_waveform(&waveform)
            .map_err(|err| stage_error(input, Stage::Features, err.into()))
    }
}

fn stage_error(path: &Path, stage: Stage, source: StageError) -> FileError {
    FileError {
        path: path.to_path_buf(),
        stage,
        source,
    }
}

/// Annotation path derived from the input filename.
pub fn derived_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_prediction.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_output_replaces_the_extension() {
        assert_eq!(
            derived_output_path(Path::new("/data/mix.npy")),
            PathBuf::from("/data/mix_prediction.txt")
        );
        assert_eq!(
            derived_output_path(Path::new("clip.wav")),
            PathBuf::from("clip_prediction.txt")
        );
    }

    #[test]
    fn file_errors_name_path_and_stage() {
        let err = stage_error(
            Path::new("/data/mix.wav"),
            Stage::Normalize,
            NormalizeError::BandCountMismatch { stats: 80, bands: 3 }.into(),
        );
        let text = err.to_string();
        assert!(text.contains("/data/mix.wav"));
        assert!(text.contains("normalize"));
    }
}

mod support;

use std::path::Path;

use ndarray::Array2;
use tempfile::TempDir;

use melmark::analysis::{self, NormalizationStats, MEL_BANDS, SPECTRUM_BINS};
use melmark::batch::{self, InputSelection};
use melmark::classifier::{Classifier, ClassifierError};
use melmark::pipeline::{PipelineContext, Stage};
use melmark::postprocess::annotate::Annotation;
use melmark::postprocess::threshold::DEFAULT_THRESHOLDS;
use melmark::types::{CLASS_COUNT, Label, MelBandMatrix, ProbabilityMatrix};

use support::npy::{write_matrix_npy, write_vector_npy};
use support::wav::write_mono_wav;

/// Emits a fixed per-frame speech probability pattern, repeating it when an
/// input is longer than the script. The music track stays silent.
struct ScriptedClassifier {
    speech: Vec<f32>,
}

impl ScriptedClassifier {
    fn from_bits(bits: &[u8]) -> Self {
        Self {
            speech: bits.iter().map(|&b| if b != 0 { 0.9 } else { 0.1 }).collect(),
        }
    }
}

impl Classifier for ScriptedClassifier {
    fn predict(&self, features: &MelBandMatrix) -> Result<ProbabilityMatrix, ClassifierError> {
        let frames = features.nrows();
        let mut probs = Array2::zeros((frames, CLASS_COUNT));
        for frame in 0..frames {
            probs[(frame, Label::Speech.index())] = self.speech[frame % self.speech.len()];
        }
        Ok(probs)
    }
}

fn unit_stats() -> NormalizationStats {
    NormalizationStats::new(
        ndarray::Array1::zeros(MEL_BANDS),
        ndarray::Array1::ones(MEL_BANDS),
    )
    .expect("build stats")
}

fn write_spectrogram(path: &Path, frames: usize) {
    write_matrix_npy(path, frames, SPECTRUM_BINS, &vec![0.1; frames * SPECTRUM_BINS]);
}

fn context<'a>(
    stats: &'a NormalizationStats,
    classifier: &'a dyn Classifier,
    smoothing: bool,
) -> PipelineContext<'a> {
    PipelineContext {
        stats,
        classifier,
        thresholds: DEFAULT_THRESHOLDS,
        smoothing,
    }
}

#[test]
fn single_file_annotation_lands_at_the_explicit_output() {
    let temp = TempDir::new().expect("create tempdir");
    let input = temp.path().join("mix.npy");
    let output = temp.path().join("regions.txt");
    let bits = [1, 1, 0, 1, 1, 1, 0, 0, 1, 1];
    write_spectrogram(&input, bits.len());

    let stats = unit_stats();
    let classifier = ScriptedClassifier::from_bits(&bits);
    let selection = InputSelection::resolve(&input, Some(&output)).expect("resolve input");
    let summary =
        batch::run(&selection, &context(&stats, &classifier, false)).expect("run batch");

    assert_eq!(summary.processed, 1);
    assert!(summary.failures.is_empty());

    let text = std::fs::read_to_string(&output).expect("read annotation");
    let annotation = Annotation::from_text(&text).expect("parse annotation");
    let hop = analysis::hop_seconds();
    let intervals = annotation.intervals();
    assert_eq!(intervals.len(), 3);
    assert!(intervals.iter().all(|i| i.label == Label::Speech));
    let frame_bounds: Vec<(usize, usize)> = intervals
        .iter()
        .map(|i| {
            (
                (i.start / hop).round() as usize,
                (i.end / hop).round() as usize,
            )
        })
        .collect();
    assert_eq!(frame_bounds, vec![(0, 2), (3, 6), (8, 10)]);

    let rebuilt = annotation.to_decisions(hop, bits.len());
    let expected: Vec<bool> = bits.iter().map(|&b| b != 0).collect();
    let speech: Vec<bool> = rebuilt.column(Label::Speech.index()).iter().copied().collect();
    assert_eq!(speech, expected);
    assert!(rebuilt.column(Label::Music.index()).iter().all(|&v| !v));
}

#[test]
fn smoothing_bridges_classifier_jitter_end_to_end() {
    let temp = TempDir::new().expect("create tempdir");
    let input = temp.path().join("talk.npy");
    let frames = 3 * analysis::smoothing_min_frames();
    let mut bits = vec![1u8; frames];
    bits[frames / 2] = 0;
    write_spectrogram(&input, frames);

    let stats = unit_stats();
    let classifier = ScriptedClassifier::from_bits(&bits);
    let selection = InputSelection::resolve(&input, None).expect("resolve input");

    let summary = batch::run(&selection, &context(&stats, &classifier, true)).expect("run batch");
    assert_eq!(summary.processed, 1);

    let derived = temp.path().join("talk_prediction.txt");
    let annotation =
        Annotation::from_text(&std::fs::read_to_string(&derived).expect("read annotation"))
            .expect("parse annotation");
    let intervals = annotation.intervals();
    assert_eq!(intervals.len(), 1, "the one-frame dropout should be bridged");
    assert!((intervals[0].start - 0.0).abs() < 1e-9);
    let expected_end = frames as f64 * analysis::hop_seconds();
    assert!((intervals[0].end - expected_end).abs() < 1e-6);
}

#[test]
fn directory_batch_continues_past_bad_files() {
    let temp = TempDir::new().expect("create tempdir");
    write_spectrogram(&temp.path().join("good.npy"), 8);
    write_mono_wav(
        &temp.path().join("clip.wav"),
        analysis::ANALYSIS_SAMPLE_RATE,
        &vec![0.25; 2048],
    );
    std::fs::write(temp.path().join("broken.npy"), b"not a numpy file").expect("write junk");
    std::fs::write(temp.path().join("notes.txt"), b"ignored").expect("write notes");

    let stats = unit_stats();
    let classifier = ScriptedClassifier::from_bits(&[1]);
    let selection = InputSelection::resolve(temp.path(), None).expect("resolve input");
    let summary =
        batch::run(&selection, &context(&stats, &classifier, false)).expect("run batch");

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failures.len(), 1);
    let failure = &summary.failures[0];
    assert!(failure.path.ends_with("broken.npy"));
    assert_eq!(failure.stage, Stage::Read);
    assert!(failure.to_string().contains("broken.npy"));

    assert!(temp.path().join("good_prediction.txt").exists());
    assert!(temp.path().join("clip_prediction.txt").exists());
    assert!(!temp.path().join("broken_prediction.txt").exists());
    assert!(!temp.path().join("notes_prediction.txt").exists());
}

#[test]
fn stats_files_feed_the_pipeline() {
    let temp = TempDir::new().expect("create tempdir");
    let mean_path = temp.path().join("mean.npy");
    let std_path = temp.path().join("std.npy");
    write_vector_npy(&mean_path, &vec![0.0; MEL_BANDS]);
    write_vector_npy(&std_path, &vec![1.0; MEL_BANDS]);
    let stats = NormalizationStats::load(&mean_path, &std_path).expect("load stats");
    assert_eq!(stats.band_count(), MEL_BANDS);

    let input = temp.path().join("mix.npy");
    write_spectrogram(&input, 4);
    let classifier = ScriptedClassifier::from_bits(&[1]);
    let selection = InputSelection::resolve(&input, None).expect("resolve input");
    let summary =
        batch::run(&selection, &context(&stats, &classifier, false)).expect("run batch");
    assert_eq!(summary.processed, 1);
    assert!(summary.failures.is_empty());
}

#[test]
fn mismatched_stats_fail_in_the_normalize_stage() {
    let temp = TempDir::new().expect("create tempdir");
    let input = temp.path().join("mix.npy");
    write_spectrogram(&input, 4);

    let stats = NormalizationStats::new(
        ndarray::Array1::zeros(MEL_BANDS + 1),
        ndarray::Array1::ones(MEL_BANDS + 1),
    )
    .expect("build stats");
    let classifier = ScriptedClassifier::from_bits(&[1]);
    let selection = InputSelection::resolve(&input, None).expect("resolve input");
    let summary =
        batch::run(&selection, &context(&stats, &classifier, false)).expect("run batch");

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].stage, Stage::Normalize);
}

#[test]
fn silent_input_writes_an_empty_artifact() {
    let temp = TempDir::new().expect("create tempdir");
    let input = temp.path().join("quiet.npy");
    write_spectrogram(&input, 12);

    let stats = unit_stats();
    let classifier = ScriptedClassifier::from_bits(&[0]);
    let selection = InputSelection::resolve(&input, None).expect("resolve input");
    let summary = batch::run(&selection, &context(&stats, &classifier, true)).expect("run batch");

    assert_eq!(summary.processed, 1);
    let text = std::fs::read_to_string(temp.path().join("quiet_prediction.txt"))
        .expect("read annotation");
    assert!(text.is_empty());
}

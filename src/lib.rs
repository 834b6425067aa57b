//! Library exports for reuse in the CLI and integration tests.
/// Spectral front end: STFT, mel projection and normalization.
pub mod analysis;
/// Batch orchestration over files and directories.
pub mod batch;
/// Classifier capability trait and the ONNX-backed implementation.
pub mod classifier;
/// Readers for the recognized input file formats.
pub mod io;
/// Tracing subscriber setup.
pub mod logging;
/// Per-file stage sequencing.
pub mod pipeline;
/// Thresholding, smoothing and annotation encoding.
pub mod postprocess;
/// Shared matrix aliases and the label set.
pub mod types;

//! Model boundary for the pipeline.
//!
//! The classifier is a capability: a function from a normalized feature
//! batch to per-frame class probabilities. The batch runner only ever sees
//! the trait, so tests substitute a mock and the production path plugs in
//! an ONNX session loaded once per run.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::{Array2, Array3, Axis};
use ort::session::Session;
use ort::value::Tensor;
use thiserror::Error;

use crate::types::{CLASS_COUNT, MelBandMatrix, ProbabilityMatrix};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model file not found at {path}")]
    MissingModel { path: PathBuf },
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("Classifier session lock poisoned")]
    Poisoned,
    #[error("Model produced no output tensor")]
    NoOutput,
    #[error("Model returned shape {got:?}; expected a (1, {frames}, {classes}) probability batch")]
    OutputShape {
        got: Vec<i64>,
        frames: usize,
        classes: usize,
    },
}

/// Probability-batch-from-feature-batch capability.
pub trait Classifier: Send + Sync {
    /// Per-frame, per-class probabilities for a (frames x bands) feature
    /// matrix. Implementations must return one row per input frame.
    fn predict(&self, features: &MelBandMatrix) -> Result<ProbabilityMatrix, ClassifierError>;
}

/// ONNX-backed classifier, loaded once per run and shared by the batch.
///
/// `Session::run` needs `&mut self`, so inference calls are serialized
/// behind a mutex and one session serves every batch worker. The session
/// itself runs single-threaded; parallelism comes from the batch loop.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::MissingModel {
                path: path.to_path_buf(),
            });
        }
        let session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(path)?;
        tracing::info!("Loaded classifier model from {}", path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &MelBandMatrix) -> Result<ProbabilityMatrix, ClassifierError> {
        let frames = features.nrows();
        let batch: Array3<f32> = features.clone().insert_axis(Axis(0));
        let input = Tensor::from_array(batch)?;
        let mut session = self.session.lock().map_err(|_| ClassifierError::Poisoned)?;
        let outputs = session.run(ort::inputs![input])?;
        let (_, value) = outputs.iter().next().ok_or(ClassifierError::NoOutput)?;
        let (shape, data) = value.try_extract_tensor::<f32>()?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        if dims != [1, frames as i64, CLASS_COUNT as i64] {
            return Err(ClassifierError::OutputShape {
                got: dims,
                frames,
                classes: CLASS_COUNT,
            });
        }
        let matrix = Array2::from_shape_vec((frames, CLASS_COUNT), data.to_vec()).map_err(|_| {
            ClassifierError::OutputShape {
                got: vec![1, frames as i64, CLASS_COUNT as i64],
                frames,
                classes: CLASS_COUNT,
            }
        })?;
        Ok(matrix)
    }
}

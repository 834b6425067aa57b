use std::path::{Path, PathBuf};

use ndarray::Array1;
use thiserror::Error;

use crate::io::npy::{self, NpyError};
use crate::types::MelBandMatrix;

/// Smallest standard deviation the normalizer will divide by.
const STD_FLOOR: f32 = 1e-6;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Failed to load normalization stats from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: NpyError,
    },
    #[error("Mean vector holds {mean} values but std vector holds {std}")]
    StatsLengthMismatch { mean: usize, std: usize },
    #[error("Normalization stats cover {stats} bands but the feature matrix has {bands}")]
    BandCountMismatch { stats: usize, bands: usize },
}

/// Per-band mean/std computed at training time.
///
/// Loaded once per run and shared read-only by every file in a batch.
#[derive(Clone, Debug)]
pub struct NormalizationStats {
    mean: Array1<f32>,
    std: Array1<f32>,
}

impl NormalizationStats {
    pub fn new(mean: Array1<f32>, std: Array1<f32>) -> Result<Self, NormalizeError> {
        if mean.len() != std.len() {
            return Err(NormalizeError::StatsLengthMismatch {
                mean: mean.len(),
                std: std.len(),
            });
        }
        Ok(Self { mean, std })
    }

    /// Load the mean and std vectors from their `.npy` files.
    pub fn load(mean_path: &Path, std_path: &Path) -> Result<Self, NormalizeError> {
        let mean = npy::read_vector(mean_path).map_err(|source| NormalizeError::Load {
            path: mean_path.to_path_buf(),
            source,
        })?;
        let std = npy::read_vector(std_path).map_err(|source| NormalizeError::Load {
            path: std_path.to_path_buf(),
            source,
        })?;
        Self::new(Array1::from_vec(mean), Array1::from_vec(std))
    }

    pub fn band_count(&self) -> usize {
        self.mean.len()
    }

    /// `(value - mean[band]) / std[band]`, element-wise.
    ///
    /// Standard deviations below [`STD_FLOOR`] are clamped so a dead band
    /// can never turn the matrix into NaN or infinities.
    pub fn apply(&self, bands: &MelBandMatrix) -> Result<MelBandMatrix, NormalizeError> {
        if bands.ncols() != self.mean.len() {
            return Err(NormalizeError::BandCountMismatch {
                stats: self.mean.len(),
                bands: bands.ncols(),
            });
        }
        let clamped = self.std.iter().filter(|std| **std < STD_FLOOR).count();
        if clamped > 0 {
            tracing::warn!(
                "{clamped} of {} normalization bands have near-zero std; clamping to {STD_FLOOR}",
                self.std.len()
            );
        }
        let mut out = bands.clone();
        for mut row in out.rows_mut() {
            for ((value, &mean), &std) in row.iter_mut().zip(self.mean.iter()).zip(self.std.iter())
            {
                *value = (*value - mean) / std.max(STD_FLOOR);
            }
        }
        Ok(out)
    }
}

use thiserror::Error;

use super::mel::MelFilterBank;
use super::stft::power_spectrogram;
use super::{ANALYSIS_SAMPLE_RATE, SPECTRUM_BINS, STFT_HOP, STFT_N_FFT};
use crate::types::{MelBandMatrix, SpectralMatrix};

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Input waveform is empty")]
    EmptyWaveform,
    #[error("Cached spectrogram is empty")]
    EmptySpectrogram,
    #[error(
        "Cached spectrogram shape {rows}x{cols} matches {expected} frequency bins on neither axis"
    )]
    UnexpectedSpectrumShape {
        rows: usize,
        cols: usize,
        expected: usize,
    },
}

/// Log-scaled mel band matrix for a mono waveform at the analysis rate.
pub fn mel_bands_from_waveform(samples: &[f32]) -> Result<MelBandMatrix, FeatureError> {
    if samples.is_empty() {
        return Err(FeatureError::EmptyWaveform);
    }
    let power = power_spectrogram(samples, STFT_N_FFT, STFT_HOP);
    let bank = MelFilterBank::new(ANALYSIS_SAMPLE_RATE, STFT_N_FFT);
    Ok(log_scale(bank.project(&power)))
}

/// Log-scaled mel band matrix for a cached magnitude spectrogram.
///
/// Caches written by the extraction tool are frequency-major; a time-major
/// matrix is accepted as well. Magnitudes are squared into power so both
/// input paths feed the filter bank identically.
pub fn mel_bands_from_spectrogram(spec: SpectralMatrix) -> Result<MelBandMatrix, FeatureError> {
    if spec.is_empty() {
        return Err(FeatureError::EmptySpectrogram);
    }
    let (rows, cols) = spec.dim();
    let time_major = if cols == SPECTRUM_BINS {
        spec
    } else if rows == SPECTRUM_BINS {
        spec.reversed_axes()
    } else {
        return Err(FeatureError::UnexpectedSpectrumShape {
            rows,
            cols,
            expected: SPECTRUM_BINS,
        });
    };
    let power = time_major.mapv(|m| {
        let m = m.max(0.0);
        m * m
    });
    let bank = MelFilterBank::new(ANALYSIS_SAMPLE_RATE, STFT_N_FFT);
    Ok(log_scale(bank.project(&power)))
}

fn log_scale(mut bands: MelBandMatrix) -> MelBandMatrix {
    const AMIN: f32 = 1e-10;
    bands.mapv_inplace(|energy| {
        let db = 10.0 * energy.max(AMIN).log10();
        if db.is_finite() { db } else { 0.0 }
    });
    bands
}

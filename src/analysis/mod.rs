//! Spectral front end: STFT, mel projection and feature normalization.

/// Fixed sample rate the classifier was trained at.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;
/// STFT window length in samples.
pub const STFT_N_FFT: usize = 1024;
/// STFT hop in samples.
pub const STFT_HOP: usize = 512;
/// Frequency bins per spectral frame (0..=Nyquist).
pub const SPECTRUM_BINS: usize = STFT_N_FFT / 2 + 1;
/// Mel bands per feature frame.
pub const MEL_BANDS: usize = 80;
pub const MEL_FMIN_HZ: f32 = 27.5;
pub const MEL_FMAX_HZ: f32 = 8_000.0;
/// Shortest region the smoother keeps, in seconds.
pub const SMOOTHING_MIN_SECONDS: f32 = 0.5;

mod features;
mod mel;
mod normalize;
mod stft;

pub use features::{FeatureError, mel_bands_from_spectrogram, mel_bands_from_waveform};
pub use mel::MelFilterBank;
pub use normalize::{NormalizationStats, NormalizeError};
pub use stft::power_spectrogram;

/// Duration of one frame hop in seconds.
pub fn hop_seconds() -> f64 {
    STFT_HOP as f64 / ANALYSIS_SAMPLE_RATE as f64
}

/// Minimum smoothing run length in frames, derived from the time constant.
pub fn smoothing_min_frames() -> usize {
    ((SMOOTHING_MIN_SECONDS as f64 / hop_seconds()).round() as usize).max(1)
}

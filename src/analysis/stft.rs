use ndarray::Array2;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;

use crate::types::SpectralMatrix;

/// Power spectra (0..=Nyquist) for overlapping Hann-windowed frames.
///
/// Frames start every `hop` samples while the start index is inside the
/// signal; the final partial window is zero-padded, so an input of `len`
/// samples yields `ceil(len / hop)` frames.
pub fn power_spectrogram(samples: &[f32], n_fft: usize, hop: usize) -> SpectralMatrix {
    let n_fft = n_fft.max(1);
    let hop = hop.max(1);
    let bins = n_fft / 2 + 1;
    if samples.is_empty() {
        return Array2::zeros((0, bins));
    }
    let frames = samples.len().div_ceil(hop);
    let window = hann_window(n_fft);
    let fft = FftPlanner::new().plan_fft_forward(n_fft);
    let mut buf = vec![Complex::new(0.0_f32, 0.0); n_fft];
    let mut out = Array2::zeros((frames, bins));
    for (frame_idx, mut row) in out.rows_mut().into_iter().enumerate() {
        fill_windowed(&mut buf, samples, frame_idx * hop, &window);
        fft.process(&mut buf);
        for (bin, slot) in row.iter_mut().enumerate() {
            let c = buf[bin];
            *slot = (c.re * c.re + c.im * c.im).max(0.0);
        }
    }
    out
}

pub(super) fn hann_window(length: usize) -> Vec<f32> {
    if length <= 1 {
        return vec![1.0_f32; length.max(1)];
    }
    let denom = (length - 1) as f32;
    (0..length)
        .map(|n| 0.5_f32 * (1.0 - (2.0 * std::f32::consts::PI * n as f32 / denom).cos()))
        .collect()
}

fn fill_windowed(target: &mut [Complex<f32>], samples: &[f32], start: usize, window: &[f32]) {
    for (i, cell) in target.iter_mut().enumerate() {
        let src = samples.get(start + i).copied().unwrap_or(0.0);
        let win = window.get(i).copied().unwrap_or(1.0);
        *cell = Complex::new(sanitize(src) * win, 0.0);
    }
}

fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

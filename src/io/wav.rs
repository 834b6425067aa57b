use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analysis::ANALYSIS_SAMPLE_RATE;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("Failed to open WAV {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("Failed to decode a sample in {path}: {source}")]
    Sample {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("{path} has {got} channels; the pipeline expects mono input")]
    ChannelCount { path: PathBuf, got: u16 },
    #[error("{path} is sampled at {got} Hz; the model was trained at {expected} Hz")]
    SampleRate {
        path: PathBuf,
        got: u32,
        expected: u32,
    },
    #[error("Unsupported WAV sample format in {path}: {bits}-bit {format:?}")]
    UnsupportedFormat {
        path: PathBuf,
        bits: u16,
        format: hound::SampleFormat,
    },
}

/// Load a mono waveform at the fixed analysis rate.
///
/// Inputs that diverge from the training-time front end (extra channels,
/// a different sample rate) are rejected rather than silently converted.
pub fn load_mono_waveform(path: &Path) -> Result<Vec<f32>, WavError> {
    let mut reader = hound::WavReader::open(path).map_err(|source| WavError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(WavError::ChannelCount {
            path: path.to_path_buf(),
            got: spec.channels,
        });
    }
    if spec.sample_rate != ANALYSIS_SAMPLE_RATE {
        return Err(WavError::SampleRate {
            path: path.to_path_buf(),
            got: spec.sample_rate,
            expected: ANALYSIS_SAMPLE_RATE,
        });
    }
    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|sample| {
                sample.map_err(|source| WavError::Sample {
                    path: path.to_path_buf(),
                    source,
                })
            })
            .collect(),
        (hound::SampleFormat::Int, bits @ (16 | 24 | 32)) => {
            let scale = (1_i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| {
                    sample.map(|v| v as f32 / scale).map_err(|source| WavError::Sample {
                        path: path.to_path_buf(),
                        source,
                    })
                })
                .collect()
        }
        (format, bits) => Err(WavError::UnsupportedFormat {
            path: path.to_path_buf(),
            bits,
            format,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use tempfile::TempDir;

    fn spec(channels: u16, sample_rate: u32, bits: u16, format: SampleFormat) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: bits,
            sample_format: format,
        }
    }

    #[test]
    fn float_wav_loads_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("float.wav");
        let mut writer =
            WavWriter::create(&path, spec(1, ANALYSIS_SAMPLE_RATE, 32, SampleFormat::Float))
                .unwrap();
        for &sample in &[0.0_f32, 0.5, -0.5, 1.0] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let samples = load_mono_waveform(&path).unwrap();
        assert_eq!(samples, vec![0.0, 0.5, -0.5, 1.0]);
    }

    #[test]
    fn int_wav_is_scaled_to_unit_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("int.wav");
        let mut writer =
            WavWriter::create(&path, spec(1, ANALYSIS_SAMPLE_RATE, 16, SampleFormat::Int))
                .unwrap();
        for &sample in &[0_i16, i16::MAX, i16::MIN] {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let samples = load_mono_waveform(&path).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 1.0).abs() < 1e-3);
        assert!((samples[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn stereo_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stereo.wav");
        let mut writer =
            WavWriter::create(&path, spec(2, ANALYSIS_SAMPLE_RATE, 32, SampleFormat::Float))
                .unwrap();
        for _ in 0..4 {
            writer.write_sample(0.0_f32).unwrap();
        }
        writer.finalize().unwrap();

        assert!(matches!(
            load_mono_waveform(&path),
            Err(WavError::ChannelCount { got: 2, .. })
        ));
    }

    #[test]
    fn wrong_sample_rate_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rate.wav");
        let mut writer =
            WavWriter::create(&path, spec(1, 44_100, 32, SampleFormat::Float)).unwrap();
        writer.write_sample(0.0_f32).unwrap();
        writer.finalize().unwrap();

        assert!(matches!(
            load_mono_waveform(&path),
            Err(WavError::SampleRate { got: 44_100, .. })
        ));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.wav");
        let err = load_mono_waveform(&path).unwrap_err();
        assert!(err.to_string().contains("missing.wav"));
    }
}

//! Minimal reader for NumPy `.npy` files.
//!
//! Covers the subset the pipeline consumes: format versions 1.0 and 2.0,
//! little-endian `f4`/`f8` payloads, C order, one or two dimensions.

use std::path::Path;

use ndarray::Array2;
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not an NPY file (bad magic)")]
    BadMagic,
    #[error("Truncated NPY header")]
    TruncatedHeader,
    #[error("Unsupported NPY format version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },
    #[error("Malformed NPY header: {0}")]
    MalformedHeader(String),
    #[error("Unsupported dtype {0:?}; expected little-endian f4 or f8")]
    UnsupportedDtype(String),
    #[error("Fortran-order arrays are not supported")]
    FortranOrder,
    #[error("Expected a {expected}-dimensional array, got shape {shape:?}")]
    WrongDimensions { expected: usize, shape: Vec<usize> },
    #[error("Payload holds {got} values but the header shape needs {expected}")]
    PayloadSizeMismatch { expected: usize, got: usize },
}

/// Read a 1-D array as `f32`.
pub fn read_vector(path: &Path) -> Result<Vec<f32>, NpyError> {
    let raw = read_raw(path)?;
    match raw.shape[..] {
        [_] => Ok(raw.values),
        _ => Err(NpyError::WrongDimensions {
            expected: 1,
            shape: raw.shape,
        }),
    }
}

/// Read a 2-D array as an `f32` matrix, in the stored row/column order.
pub fn read_matrix(path: &Path) -> Result<Array2<f32>, NpyError> {
    let raw = read_raw(path)?;
    let [rows, cols] = raw.shape[..] else {
        return Err(NpyError::WrongDimensions {
            expected: 2,
            shape: raw.shape,
        });
    };
    let got = raw.values.len();
    Array2::from_shape_vec((rows, cols), raw.values).map_err(|_| NpyError::PayloadSizeMismatch {
        expected: rows * cols,
        got,
    })
}

struct RawArray {
    shape: Vec<usize>,
    values: Vec<f32>,
}

fn read_raw(path: &Path) -> Result<RawArray, NpyError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < 8 || &bytes[..6] != MAGIC {
        return Err(NpyError::BadMagic);
    }
    let major = bytes[6];
    let minor = bytes[7];
    let (header, payload) = match major {
        1 => {
            let len = bytes
                .get(8..10)
                .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
                .ok_or(NpyError::TruncatedHeader)?;
            let header = bytes.get(10..10 + len).ok_or(NpyError::TruncatedHeader)?;
            (header, &bytes[10 + len..])
        }
        2 => {
            let len = bytes
                .get(8..12)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
                .ok_or(NpyError::TruncatedHeader)?;
            let header = bytes.get(12..12 + len).ok_or(NpyError::TruncatedHeader)?;
            (header, &bytes[12 + len..])
        }
        _ => return Err(NpyError::UnsupportedVersion { major, minor }),
    };
    let header = std::str::from_utf8(header)
        .map_err(|_| NpyError::MalformedHeader("header is not UTF-8".into()))?;

    let descr = quoted_field(header, "descr")?;
    let width = match descr.as_str() {
        "<f4" => 4,
        "<f8" => 8,
        _ => return Err(NpyError::UnsupportedDtype(descr)),
    };
    if bool_field(header, "fortran_order")? {
        return Err(NpyError::FortranOrder);
    }
    let shape = shape_field(header)?;

    let expected: usize = shape.iter().product();
    let available = payload.len() / width;
    if available < expected {
        return Err(NpyError::PayloadSizeMismatch {
            expected,
            got: available,
        });
    }
    let values = match width {
        4 => payload[..expected * 4]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        _ => payload[..expected * 8]
            .chunks_exact(8)
            .map(|b| {
                f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
            })
            .collect(),
    };
    Ok(RawArray { shape, values })
}

/// Raw text of one value in the header dict, trimmed.
fn field<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let marker = format!("'{key}'");
    let key_pos = header
        .find(&marker)
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing {key}")))?;
    let after_key = &header[key_pos + marker.len()..];
    let colon = after_key
        .find(':')
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing value for {key}")))?;
    let value = &after_key[colon + 1..];
    let mut depth = 0usize;
    let mut end = value.len();
    for (idx, ch) in value.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' | '}' if depth == 0 => {
                end = idx;
                break;
            }
            _ => {}
        }
    }
    Ok(value[..end].trim())
}

fn quoted_field(header: &str, key: &str) -> Result<String, NpyError> {
    let raw = field(header, key)?;
    let inner = raw
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .or_else(|| raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')))
        .ok_or_else(|| NpyError::MalformedHeader(format!("expected quoted string for {key}")))?;
    Ok(inner.to_string())
}

fn bool_field(header: &str, key: &str) -> Result<bool, NpyError> {
    match field(header, key)? {
        "True" => Ok(true),
        "False" => Ok(false),
        other => Err(NpyError::MalformedHeader(format!(
            "expected True or False for {key}, got {other:?}"
        ))),
    }
}

fn shape_field(header: &str) -> Result<Vec<usize>, NpyError> {
    let raw = field(header, "shape")?;
    let inner = raw
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| NpyError::MalformedHeader(format!("expected a shape tuple, got {raw:?}")))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| NpyError::MalformedHeader(format!("bad shape entry {part:?}")))
        })
        .collect()
}

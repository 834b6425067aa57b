//! Run-length encoding of decision tracks into labeled time intervals.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

use crate::types::{CLASS_COUNT, DecisionMatrix, Label};

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Failed to write annotation to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed annotation line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// One labeled region on a class track, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    pub label: Label,
}

/// Ordered set of labeled regions for one input file.
///
/// Intervals are sorted by start time, ties broken by class enumeration
/// order; within one class track they never overlap. Different tracks may
/// overlap freely.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotation {
    intervals: Vec<Interval>,
}

impl Annotation {
    /// Collapse consecutive true frames per class track into intervals.
    ///
    /// An all-false matrix yields an empty annotation; that is a valid
    /// result, not an error.
    pub fn encode(decisions: &DecisionMatrix, hop_seconds: f64) -> Self {
        let mut intervals = Vec::new();
        for label in Label::ALL {
            let mut run_start: Option<usize> = None;
            for (frame, &on) in decisions.column(label.index()).iter().enumerate() {
                match (on, run_start) {
                    (true, None) => run_start = Some(frame),
                    (false, Some(start)) => {
                        intervals.push(interval(start, frame, label, hop_seconds));
                        run_start = None;
                    }
                    _ => {}
                }
            }
            if let Some(start) = run_start {
                intervals.push(interval(start, decisions.nrows(), label, hop_seconds));
            }
        }
        intervals.sort_by(|a, b| {
            a.start
                .total_cmp(&b.start)
                .then_with(|| a.label.index().cmp(&b.label.index()))
        });
        Self { intervals }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// One `start<TAB>end<TAB>label` line per interval.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for interval in &self.intervals {
            let _ = writeln!(
                out,
                "{:.6}\t{:.6}\t{}",
                interval.start, interval.end, interval.label
            );
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<(), AnnotationError> {
        std::fs::write(path, self.to_text()).map_err(|source| AnnotationError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse the textual annotation format.
    pub fn from_text(text: &str) -> Result<Self, AnnotationError> {
        let mut intervals = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let [start, end, label] = fields[..] else {
                return Err(AnnotationError::Parse {
                    line: line_no,
                    reason: format!("expected three tab-separated fields, got {}", fields.len()),
                });
            };
            let start = parse_seconds(start, line_no)?;
            let end = parse_seconds(end, line_no)?;
            let label = Label::parse(label.trim()).ok_or_else(|| AnnotationError::Parse {
                line: line_no,
                reason: format!("unknown label {label:?}"),
            })?;
            intervals.push(Interval { start, end, label });
        }
        Ok(Self { intervals })
    }

    /// Reconstruct the boolean frame tracks this annotation covers.
    pub fn to_decisions(&self, hop_seconds: f64, frames: usize) -> DecisionMatrix {
        let mut out = Array2::from_elem((frames, CLASS_COUNT), false);
        for interval in &self.intervals {
            let first = (interval.start / hop_seconds).round() as usize;
            let past_last = ((interval.end / hop_seconds).round() as usize).min(frames);
            for frame in first..past_last {
                out[(frame, interval.label.index())] = true;
            }
        }
        out
    }
}

fn interval(start_frame: usize, end_frame: usize, label: Label, hop_seconds: f64) -> Interval {
    Interval {
        start: start_frame as f64 * hop_seconds,
        end: end_frame as f64 * hop_seconds,
        label,
    }
}

fn parse_seconds(field: &str, line_no: usize) -> Result<f64, AnnotationError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|err| AnnotationError::Parse {
            line: line_no,
            reason: err.to_string(),
        })
}

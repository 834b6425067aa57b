//! Command-line entry point for the speech/music region annotator.

use std::path::PathBuf;

use melmark::analysis::NormalizationStats;
use melmark::batch::{self, InputSelection};
use melmark::classifier::OnnxClassifier;
use melmark::logging;
use melmark::pipeline::PipelineContext;
use melmark::postprocess::threshold::DEFAULT_THRESHOLDS;

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    data_path: PathBuf,
    output: Option<PathBuf>,
    model_path: PathBuf,
    mean_path: PathBuf,
    std_path: PathBuf,
    smoothing: bool,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let stats = NormalizationStats::load(&options.mean_path, &options.std_path)
        .map_err(|err| err.to_string())?;
    let classifier = OnnxClassifier::load(&options.model_path).map_err(|err| err.to_string())?;
    let selection = InputSelection::resolve(&options.data_path, options.output.as_deref())
        .map_err(|err| err.to_string())?;

    let ctx = PipelineContext {
        stats: &stats,
        classifier: &classifier,
        thresholds: DEFAULT_THRESHOLDS,
        smoothing: options.smoothing,
    };
    let summary = batch::run(&selection, &ctx).map_err(|err| err.to_string())?;
    tracing::info!("Annotated {} file(s)", summary.processed);
    if summary.failures.is_empty() {
        return Ok(());
    }
    let mut report = format!("{} file(s) failed:", summary.failures.len());
    for failure in &summary.failures {
        report.push_str(&format!("\n- {failure}"));
    }
    Err(report)
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut data_path = PathBuf::from("audio_test");
    let mut output: Option<PathBuf> = None;
    let mut model_path = PathBuf::from("trained/model.onnx");
    let mut mean_path = PathBuf::from("trained/mean.npy");
    let mut std_path = PathBuf::from("trained/std.npy");
    let mut smoothing = true;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                data_path = PathBuf::from(value);
            }
            "--output" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--output requires a value".to_string())?;
                output = Some(PathBuf::from(value));
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = PathBuf::from(value);
            }
            "--mean" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--mean requires a value".to_string())?;
                mean_path = PathBuf::from(value);
            }
            "--std" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--std requires a value".to_string())?;
                std_path = PathBuf::from(value);
            }
            "--no-smoothing" => smoothing = false,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        data_path,
        output,
        model_path,
        mean_path,
        std_path,
        smoothing,
    })
}

fn help_text() -> String {
    [
        "melmark",
        "",
        "Annotates speech and music regions in audio or cached spectrogram files.",
        "",
        "Usage:",
        "  melmark [--data <path>] [options]",
        "",
        "Options:",
        "  --data <path>    Input file or directory of .wav/.npy files (default: audio_test).",
        "  --output <file>  Annotation path; only valid with a single-file input.",
        "  --model <path>   ONNX classifier model (default: trained/model.onnx).",
        "  --mean <path>    Per-band mean vector (default: trained/mean.npy).",
        "  --std <path>     Per-band std vector (default: trained/std.npy).",
        "  --no-smoothing   Skip the minimum-duration smoothing pass.",
    ]
    .join("\n")
}

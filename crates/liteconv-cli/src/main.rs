//! liteconv - command-line driver for the converter front-end.
//!
//! Builds a conversion request from named input arrays (or a SavedModel
//! directory), dispatches it to the converter, and writes the resulting
//! flatbuffer. The exit status reflects the error category.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use liteconv_core::{
    BinaryLocator, ConversionDispatcher, ConversionOptions, LiteconvError, TransportStrategy,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "liteconv")]
#[command(about = "Convert a frozen graph or SavedModel to a TFLite flatbuffer")]
struct Args {
    /// Serialized input model (frozen GraphDef); not used for SavedModels
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the converted model
    #[arg(short, long)]
    output: PathBuf,

    /// JSON file with conversion options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Input array as NAME=D0,D1,... (use -1 for unknown dimensions); repeatable
    #[arg(long = "input-array", value_parser = parse_input_array)]
    input_arrays: Vec<(String, Vec<i64>)>,

    /// Output array name; repeatable
    #[arg(long = "output-array")]
    output_arrays: Vec<String>,

    /// Convert the SavedModel in this directory instead of --input
    #[arg(long, conflicts_with = "input")]
    saved_model_dir: Option<String>,

    /// Converter executable (defaults to toco_from_protos on PATH)
    #[arg(long)]
    converter_binary: Option<PathBuf>,

    /// Use the MLIR conversion pipeline
    #[arg(long)]
    enable_mlir_converter: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Parse `NAME=D0,D1,...` into an input array name and its shape.
fn parse_input_array(value: &str) -> Result<(String, Vec<i64>), String> {
    let (name, dims) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=D0,D1,..., got '{value}'"))?;
    if name.is_empty() {
        return Err("input array name is empty".to_string());
    }

    let dims = dims.trim();
    if dims.is_empty() {
        return Ok((name.to_string(), Vec::new()));
    }
    let dims = dims
        .split(',')
        .map(|d| {
            let d = d.trim();
            if d == "?" {
                return Ok(-1);
            }
            d.parse::<i64>()
                .map_err(|e| format!("invalid dimension '{d}' for {name}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((name.to_string(), dims))
}

async fn run(args: Args) -> liteconv_core::Result<()> {
    let mut options = match &args.options {
        Some(path) => ConversionOptions::from_path(path)?,
        None => ConversionOptions::default(),
    };
    if let Some(dir) = &args.saved_model_dir {
        options.saved_model_dir = Some(dir.clone());
    }

    let locator = match &args.converter_binary {
        Some(path) => BinaryLocator::explicit(path),
        None => BinaryLocator::default(),
    };
    let dispatcher = ConversionDispatcher::builder()
        .strategy(TransportStrategy::OutOfProcess(locator))
        .build()?;

    let model = if options.uses_saved_model() {
        info!("Converting SavedModel {:?}", options.saved_model_dir);
        dispatcher.convert_saved_model(&options).await?
    } else {
        let input = args.input.as_ref().ok_or_else(|| {
            LiteconvError::config("--input is required unless a SavedModel directory is given")
        })?;
        if args.input_arrays.is_empty() {
            return Err(LiteconvError::config("at least one --input-array is required"));
        }
        if args.output_arrays.is_empty() {
            return Err(LiteconvError::config("at least one --output-array is required"));
        }

        let graph = tokio::fs::read(input)
            .await
            .map_err(|e| LiteconvError::io("reading input model", input, e))?;
        info!("Converting {} ({} bytes)", input.display(), graph.len());
        dispatcher
            .convert_arrays(
                &graph,
                &args.input_arrays,
                &args.output_arrays,
                &options,
                args.enable_mlir_converter,
            )
            .await?
    };

    tokio::fs::write(&args.output, &model)
        .await
        .map_err(|e| LiteconvError::io("writing converted model", &args.output, e))?;
    info!("Wrote {} bytes to {}", model.len(), args.output.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_array() {
        assert_eq!(
            parse_input_array("input=1,224,224,3").unwrap(),
            ("input".to_string(), vec![1, 224, 224, 3])
        );
        assert_eq!(
            parse_input_array("x=-1,?,8").unwrap(),
            ("x".to_string(), vec![-1, -1, 8])
        );
    }

    #[test]
    fn test_parse_scalar_input_array() {
        assert_eq!(
            parse_input_array("scalar=").unwrap(),
            ("scalar".to_string(), Vec::new())
        );
    }

    #[test]
    fn test_parse_input_array_errors() {
        assert!(parse_input_array("no_shape").is_err());
        assert!(parse_input_array("=1,2").is_err());
        assert!(parse_input_array("x=1,two").is_err());
    }

    #[tokio::test]
    async fn test_missing_input_is_config_error() {
        let args = Args::try_parse_from(["liteconv", "--output", "out.tflite"]).unwrap();
        let err = run(args).await.unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_saved_model_dir_flag() {
        let args = Args::try_parse_from([
            "liteconv",
            "--output",
            "out.tflite",
            "--saved-model-dir",
            "/models/mobilenet",
        ])
        .unwrap();
        assert_eq!(args.saved_model_dir.as_deref(), Some("/models/mobilenet"));
        assert!(args.input.is_none());
    }

    #[tokio::test]
    async fn test_saved_model_from_options_needs_no_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let options = dir.path().join("options.json");
        std::fs::write(&options, r#"{"saved_model_dir": "/models/mobilenet"}"#).unwrap();

        let args = Args::try_parse_from([
            "liteconv",
            "-o",
            dir.path().join("out.tflite").to_str().unwrap(),
            "--options",
            options.to_str().unwrap(),
            "--converter-binary",
            "/nonexistent/toco_from_protos",
        ])
        .unwrap();
        // The SavedModel branch is taken, so the failure is the missing converter.
        let err = run(args).await.unwrap_err();
        assert!(matches!(err, LiteconvError::BackendUnavailable { .. }));
    }

    #[test]
    fn test_args_repeat_arrays() {
        let args = Args::try_parse_from([
            "liteconv",
            "-i",
            "graph.pb",
            "-o",
            "out.tflite",
            "--input-array",
            "a=1,4",
            "--input-array",
            "b=1",
            "--output-array",
            "y",
            "--enable-mlir-converter",
        ])
        .unwrap();
        assert_eq!(args.input_arrays.len(), 2);
        assert_eq!(args.output_arrays, vec!["y".to_string()]);
        assert!(args.enable_mlir_converter);
    }

    #[tokio::test]
    async fn test_missing_input_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = Args::try_parse_from([
            "liteconv",
            "-i",
            dir.path().join("missing.pb").to_str().unwrap(),
            "-o",
            dir.path().join("out.tflite").to_str().unwrap(),
            "--input-array",
            "a=1",
            "--output-array",
            "y",
            "--converter-binary",
            "/nonexistent/toco_from_protos",
        ])
        .unwrap();
        let err = run(args).await.unwrap_err();
        assert!(matches!(err, LiteconvError::Io { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}

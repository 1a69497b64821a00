//! Out-of-process conversion through scratch files and a child process.
//!
//! The request is written to four scratch files (model flags, converter
//! flags, input model, debug info) and a fifth is reserved for the result.
//! The converter is run as
//! `<binary> <model-flags> <converter-flags> <input> <output> --debug_proto_file=<debug>`
//! and its exit status decides between reading the output file and reporting
//! the captured console output. Scratch files are removed on every exit path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempPath;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{BackendConfig, ScratchConfig};
use crate::error::{IoResultExt, LiteconvError, Result};
use crate::request::EncodedRequest;

/// Scratch files of one dispatch. Each file is deleted when dropped.
struct ScratchFiles {
    model_flags: TempPath,
    converter_flags: TempPath,
    input: TempPath,
    debug_info: TempPath,
    output: TempPath,
}

impl ScratchFiles {
    /// Write all inputs and reserve the output file.
    ///
    /// On failure, the files created so far are dropped (and deleted) before
    /// the error is returned.
    fn create(dir: Option<&Path>, request: &EncodedRequest, input_data: &[u8]) -> Result<Self> {
        let model_flags = write_scratch(dir, ScratchConfig::MODEL_FLAGS_PREFIX, &request.model_flags)?;
        let converter_flags = write_scratch(
            dir,
            ScratchConfig::CONVERTER_FLAGS_PREFIX,
            &request.converter_flags,
        )?;
        let input = write_scratch(dir, ScratchConfig::INPUT_PREFIX, input_data)?;
        let debug_info = write_scratch(
            dir,
            ScratchConfig::DEBUG_INFO_PREFIX,
            request.debug_info.as_deref().unwrap_or_default(),
        )?;
        let output = write_scratch(dir, ScratchConfig::OUTPUT_PREFIX, &[])?;

        Ok(Self {
            model_flags,
            converter_flags,
            input,
            debug_info,
            output,
        })
    }

    /// Delete every scratch file. Files that are already gone are not an error.
    fn close(self) {
        for path in [
            self.model_flags,
            self.converter_flags,
            self.input,
            self.debug_info,
            self.output,
        ] {
            let shown = path.to_path_buf();
            if let Err(e) = path.close() {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Failed to remove scratch file {}: {}", shown.display(), e);
                }
            }
        }
    }
}

fn write_scratch(dir: Option<&Path>, prefix: &str, contents: &[u8]) -> Result<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir).with_path(dir)?,
        None => builder
            .tempfile()
            .map_err(|e| LiteconvError::io("creating scratch file", std::env::temp_dir(), e))?,
    };
    let path = file.path().to_path_buf();
    file.write_all(contents).with_path(&path)?;
    file.flush().with_path(&path)?;
    // Close the handle so the converter can open the file on every platform.
    Ok(file.into_temp_path())
}

/// Decode captured console output, replacing invalid UTF-8 sequences.
pub(crate) fn decode_console_output(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Run the converter executable at `binary` on an encoded request.
///
/// `scratch_dir` overrides the system temporary directory.
pub(crate) async fn convert(
    binary: &Path,
    request: &EncodedRequest,
    input_data: &[u8],
    enable_mlir_converter: bool,
    scratch_dir: Option<&Path>,
) -> Result<Vec<u8>> {
    let files = ScratchFiles::create(scratch_dir, request, input_data)?;
    let result = run_converter(binary, &files, enable_mlir_converter).await;
    files.close();
    result
}

/// Run the converter once and collect its result.
///
/// stdout and stderr are captured on separate pipes and reported one after
/// the other, so lines the converter interleaved across the two streams are
/// not kept in write order.
async fn run_converter(
    binary: &Path,
    files: &ScratchFiles,
    enable_mlir_converter: bool,
) -> Result<Vec<u8>> {
    let debug_flag = format!(
        "{}={}",
        BackendConfig::DEBUG_PROTO_FLAG,
        files.debug_info.display()
    );

    let mut cmd = Command::new(binary);
    cmd.arg(&*files.model_flags)
        .arg(&*files.converter_flags)
        .arg(&*files.input)
        .arg(&*files.output)
        .arg(&debug_flag);
    if enable_mlir_converter {
        cmd.arg(BackendConfig::MLIR_CONVERTER_FLAG);
    }

    info!("Running converter {}", binary.display());
    debug!("Converter output file: {}", files.output.display());

    let output = cmd
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            LiteconvError::conversion(format!(
                "Failed to run converter {}: {e}",
                binary.display()
            ))
        })?;

    if output.status.success() {
        let output_path: PathBuf = files.output.to_path_buf();
        let bytes = tokio::fs::read(&output_path).await.with_path(&output_path)?;
        debug!("Converter produced {} bytes", bytes.len());
        return Ok(bytes);
    }

    warn!(
        "Converter {} exited with status: {}",
        binary.display(),
        output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "terminated by signal".to_string())
    );
    Err(LiteconvError::conversion(format!(
        "{}\n{}\n{}\n",
        BackendConfig::CONSOLE_HINT,
        decode_console_output(&output.stdout),
        decode_console_output(&output.stderr)
    )))
}

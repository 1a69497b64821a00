//! Centralized configuration constants for liteconv.
//!
//! Runtime choices (which transport to use, where scratch files go) are made
//! explicitly through `ConversionDispatcher::builder()`. This module only holds
//! the fixed names and strings the converter contract depends on.

/// Converter backend executable and its command-line contract.
pub struct BackendConfig;

impl BackendConfig {
    /// Name of the out-of-process converter looked up on `PATH`.
    pub const DEFAULT_BINARY_NAME: &'static str = "toco_from_protos";
    /// Location of the converter relative to a package resource directory
    /// (used by source builds that ship the helper next to the library).
    pub const BUNDLED_RELATIVE_PATH: &'static str = "../toco/python/toco_from_protos";
    /// Flag naming the debug-info scratch file.
    pub const DEBUG_PROTO_FLAG: &'static str = "--debug_proto_file";
    /// Flag selecting the MLIR conversion pipeline inside the executable.
    pub const MLIR_CONVERTER_FLAG: &'static str = "--enable_mlir_converter";
    /// Prefix of the error message built from captured converter output.
    pub const CONSOLE_HINT: &'static str = "See console for info.";
    /// Operator guidance when the converter cannot be found.
    pub const NOT_FOUND_GUIDANCE: &'static str = "Could not find the toco_from_protos binary. \
Make sure your virtualenv bin directory or pip local bin directory is in your PATH. \
If the converter was installed with --user, add the user install directory to PATH \
(Linux: export PATH=$PATH:~/.local/bin/, macOS: export PATH=$PATH:~/Library/Python/<version>/bin), \
or use a virtualenv.";
    /// Guidance when in-process conversion is required but no backend is registered.
    pub const NO_IN_PROCESS_GUIDANCE: &'static str =
        "No in-process converter backend is registered with this dispatcher.";
}

/// Prefixes for the scratch files of an out-of-process dispatch.
pub struct ScratchConfig;

impl ScratchConfig {
    pub const MODEL_FLAGS_PREFIX: &'static str = "liteconv-model-flags-";
    pub const CONVERTER_FLAGS_PREFIX: &'static str = "liteconv-converter-flags-";
    pub const INPUT_PREFIX: &'static str = "liteconv-input-";
    pub const DEBUG_INFO_PREFIX: &'static str = "liteconv-debug-info-";
    pub const OUTPUT_PREFIX: &'static str = "liteconv-output-";
}

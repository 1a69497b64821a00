//! Dispatches conversion requests to the configured backend.
//!
//! The dispatcher owns the transport policy and nothing else: every call gets
//! its own scratch files (or its own in-process call), so one dispatcher can
//! serve concurrent conversions without locking.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::BackendConfig;
use crate::error::{LiteconvError, Result};
use crate::request::{ConversionOptions, ConversionRequest, TensorDescriptor};
use crate::transport::{
    out_of_process, BinaryLocator, BinaryResolution, ConversionBackend, QuantizeOptions,
    TransportStrategy,
};

/// Sends conversion requests to an in-process backend or the converter executable.
///
/// # Example
///
/// ```rust,ignore
/// use liteconv_core::{ConversionDispatcher, ConversionOptions, ConversionRequest};
///
/// let dispatcher = ConversionDispatcher::builder().build()?;
/// let request = ConversionRequest::from_arrays_with_shape(
///     &[("input".to_string(), vec![1, 224, 224, 3])],
///     &["output"],
///     &ConversionOptions::default(),
/// )?;
/// let tflite = dispatcher.dispatch(&request, &graph_def_bytes, false).await?;
/// ```
pub struct ConversionDispatcher {
    strategy: TransportStrategy,
    backend: Option<Arc<dyn ConversionBackend>>,
    scratch_dir: Option<PathBuf>,
}

/// Transport picked for a single call.
enum Route<'a> {
    InProcess(&'a dyn ConversionBackend),
    OutOfProcess(&'a BinaryLocator),
}

impl ConversionDispatcher {
    /// Dispatcher that runs the converter executable found on `PATH`.
    pub fn new() -> Self {
        Self {
            strategy: TransportStrategy::default(),
            backend: None,
            scratch_dir: None,
        }
    }

    pub fn builder() -> ConversionDispatcherBuilder {
        ConversionDispatcherBuilder::new()
    }

    pub fn strategy(&self) -> &TransportStrategy {
        &self.strategy
    }

    pub fn has_in_process_backend(&self) -> bool {
        self.backend.is_some()
    }

    fn route(&self, enable_mlir_converter: bool) -> Result<Route<'_>> {
        match (&self.strategy, self.backend.as_deref()) {
            (TransportStrategy::InProcess, Some(backend)) => Ok(Route::InProcess(backend)),
            (TransportStrategy::InProcess, None) => Err(no_in_process_backend()),
            (TransportStrategy::OutOfProcess(_), Some(backend)) if enable_mlir_converter => {
                Ok(Route::InProcess(backend))
            }
            (TransportStrategy::OutOfProcess(locator), _) => Ok(Route::OutOfProcess(locator)),
        }
    }

    fn in_process_backend(&self) -> Result<&dyn ConversionBackend> {
        self.backend.as_deref().ok_or_else(no_in_process_backend)
    }

    /// Convert `input_data` as described by `request`.
    ///
    /// `enable_mlir_converter` selects the MLIR pipeline. It routes the call to
    /// the in-process backend when one is registered; otherwise the executable
    /// is run with the MLIR flag. Bytes are returned only when the backend
    /// reports success.
    pub async fn dispatch(
        &self,
        request: &ConversionRequest,
        input_data: &[u8],
        enable_mlir_converter: bool,
    ) -> Result<Vec<u8>> {
        let encoded = request.encode();

        match self.route(enable_mlir_converter)? {
            Route::InProcess(backend) => {
                info!("Converting in-process with {}", backend.name());
                backend
                    .convert(&encoded, input_data, enable_mlir_converter)
                    .await
                    .map_err(|e| LiteconvError::conversion(format!("{e:#}")))
            }
            Route::OutOfProcess(locator) => {
                let binary = match locator.resolve() {
                    BinaryResolution::Found(path) => path,
                    BinaryResolution::NotFound { searched } => {
                        return Err(LiteconvError::BackendUnavailable {
                            backend: "out-of-process".to_string(),
                            guidance: format!(
                                "{} (searched {searched})",
                                BackendConfig::NOT_FOUND_GUIDANCE
                            ),
                        })
                    }
                };
                debug!("Resolved converter executable: {}", binary.display());
                out_of_process::convert(
                    &binary,
                    &encoded,
                    input_data,
                    enable_mlir_converter,
                    self.scratch_dir.as_deref(),
                )
                .await
            }
        }
    }

    /// Build a request from graph tensors and dispatch it.
    pub async fn convert_tensors(
        &self,
        input_data: &[u8],
        inputs: &[TensorDescriptor],
        outputs: &[TensorDescriptor],
        options: &ConversionOptions,
        debug_info: Option<Vec<u8>>,
        enable_mlir_converter: bool,
    ) -> Result<Vec<u8>> {
        let request = ConversionRequest::from_tensors(inputs, outputs, options, debug_info)?;
        self.dispatch(&request, input_data, enable_mlir_converter).await
    }

    /// Build a request from `(name, shape)` pairs and dispatch it.
    ///
    /// For graphs that cannot be loaded to discover tensor types.
    pub async fn convert_arrays<S: AsRef<str>>(
        &self,
        input_data: &[u8],
        inputs: &[(String, Vec<i64>)],
        outputs: &[S],
        options: &ConversionOptions,
        enable_mlir_converter: bool,
    ) -> Result<Vec<u8>> {
        let request = ConversionRequest::from_arrays_with_shape(inputs, outputs, options)?;
        self.dispatch(&request, input_data, enable_mlir_converter).await
    }

    /// Convert the SavedModel named by `options.saved_model_dir`.
    ///
    /// SavedModels are only understood by the MLIR pipeline, and the backend
    /// reads the model from disk, so no input bytes are sent.
    pub async fn convert_saved_model(&self, options: &ConversionOptions) -> Result<Vec<u8>> {
        let request = ConversionRequest::from_saved_model(options)?;
        self.dispatch(&request, &[], true).await
    }

    /// Quantize a calibrated model with the in-process backend.
    pub async fn quantize(&self, model: &[u8], options: &QuantizeOptions) -> Result<Vec<u8>> {
        options.inference_type.to_io_data_type()?;
        let backend = self.in_process_backend()?;
        backend
            .quantize(model, options)
            .await
            .map_err(|e| LiteconvError::conversion(format!("{e:#}")))
    }

    /// Encode sparse tensors of a converted model with the in-process backend.
    pub async fn sparsify(&self, model: &[u8]) -> Result<Vec<u8>> {
        let backend = self.in_process_backend()?;
        backend
            .sparsify(model)
            .await
            .map_err(|e| LiteconvError::conversion(format!("{e:#}")))
    }

    /// Register custom op definitions with the in-process backend.
    pub async fn register_custom_opdefs(&self, opdefs: &[String]) -> Result<bool> {
        let backend = self.in_process_backend()?;
        backend
            .register_custom_opdefs(opdefs)
            .await
            .map_err(|e| LiteconvError::conversion(format!("{e:#}")))
    }
}

impl Default for ConversionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn no_in_process_backend() -> LiteconvError {
    LiteconvError::BackendUnavailable {
        backend: "in-process".to_string(),
        guidance: BackendConfig::NO_IN_PROCESS_GUIDANCE.to_string(),
    }
}

/// Builder for `ConversionDispatcher`.
pub struct ConversionDispatcherBuilder {
    strategy: TransportStrategy,
    backend: Option<Arc<dyn ConversionBackend>>,
    scratch_dir: Option<PathBuf>,
}

impl ConversionDispatcherBuilder {
    pub fn new() -> Self {
        Self {
            strategy: TransportStrategy::default(),
            backend: None,
            scratch_dir: None,
        }
    }

    /// Transport policy.
    ///
    /// Default: run `toco_from_protos` found on `PATH`.
    pub fn strategy(mut self, strategy: TransportStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Register the in-process converter backend.
    pub fn in_process_backend(mut self, backend: Arc<dyn ConversionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Directory for out-of-process scratch files.
    ///
    /// Default: the system temporary directory.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<ConversionDispatcher> {
        if matches!(self.strategy, TransportStrategy::InProcess) && self.backend.is_none() {
            return Err(LiteconvError::config(
                "The in-process transport requires an in-process backend",
            ));
        }
        if let Some(dir) = &self.scratch_dir {
            if !dir.is_dir() {
                return Err(LiteconvError::config(format!(
                    "Scratch directory does not exist: {}",
                    dir.display()
                )));
            }
        }

        Ok(ConversionDispatcher {
            strategy: self.strategy,
            backend: self.backend,
            scratch_dir: self.scratch_dir,
        })
    }
}

impl Default for ConversionDispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::EncodedRequest;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingBackend {
        called: AtomicBool,
        saw_mlir: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ConversionBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        async fn convert(
            &self,
            _request: &EncodedRequest,
            input_data: &[u8],
            enable_mlir_converter: bool,
        ) -> anyhow::Result<Vec<u8>> {
            self.called.store(true, Ordering::SeqCst);
            self.saw_mlir.store(enable_mlir_converter, Ordering::SeqCst);
            Ok(input_data.to_vec())
        }
    }

    struct FailingBackend;

    #[async_trait::async_trait]
    impl ConversionBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        async fn convert(
            &self,
            _request: &EncodedRequest,
            _input_data: &[u8],
            _enable_mlir_converter: bool,
        ) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("'tf.FancyOp' op is neither a custom op nor a flex op")
        }
    }

    fn simple_request() -> ConversionRequest {
        ConversionRequest::from_arrays_with_shape(
            &[("input".to_string(), vec![1, 4])],
            &["output"],
            &ConversionOptions::default(),
        )
        .unwrap()
    }

    fn missing_binary() -> TransportStrategy {
        TransportStrategy::OutOfProcess(BinaryLocator::explicit("/nonexistent/toco_from_protos"))
    }

    #[tokio::test]
    async fn test_in_process_strategy() {
        let backend = Arc::new(RecordingBackend::default());
        let dispatcher = ConversionDispatcher::builder()
            .strategy(TransportStrategy::InProcess)
            .in_process_backend(backend.clone())
            .build()
            .unwrap();

        let out = dispatcher.dispatch(&simple_request(), b"graph", false).await.unwrap();
        assert_eq!(out, b"graph");
        assert!(backend.called.load(Ordering::SeqCst));
        assert!(!backend.saw_mlir.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_mlir_request_prefers_in_process() {
        let backend = Arc::new(RecordingBackend::default());
        let dispatcher = ConversionDispatcher::builder()
            .strategy(missing_binary())
            .in_process_backend(backend.clone())
            .build()
            .unwrap();

        dispatcher.dispatch(&simple_request(), b"graph", true).await.unwrap();
        assert!(backend.saw_mlir.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_out_of_process_ignores_backend_without_mlir() {
        let backend = Arc::new(RecordingBackend::default());
        let dispatcher = ConversionDispatcher::builder()
            .strategy(missing_binary())
            .in_process_backend(backend.clone())
            .build()
            .unwrap();

        let err = dispatcher
            .dispatch(&simple_request(), b"graph", false)
            .await
            .unwrap_err();
        assert!(matches!(err, LiteconvError::BackendUnavailable { .. }));
        assert!(!backend.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_binary_carries_guidance() {
        let dispatcher = ConversionDispatcher::builder()
            .strategy(missing_binary())
            .build()
            .unwrap();
        let err = dispatcher
            .dispatch(&simple_request(), b"graph", false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("PATH"));
        assert!(err.to_string().contains("/nonexistent/toco_from_protos"));
    }

    #[tokio::test]
    async fn test_backend_error_becomes_conversion_error() {
        let dispatcher = ConversionDispatcher::builder()
            .strategy(TransportStrategy::InProcess)
            .in_process_backend(Arc::new(FailingBackend))
            .build()
            .unwrap();
        let err = dispatcher
            .dispatch(&simple_request(), b"graph", false)
            .await
            .unwrap_err();
        match err {
            LiteconvError::ConversionFailed { message } => {
                assert!(message.contains("'tf.FancyOp' op is neither a custom op nor a flex op"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_in_process_strategy_requires_backend() {
        let err = ConversionDispatcher::builder()
            .strategy(TransportStrategy::InProcess)
            .build()
            .err()
            .expect("no backend registered");
        assert!(err.is_config_error());
    }

    #[test]
    fn test_missing_scratch_dir_rejected() {
        let result = ConversionDispatcher::builder()
            .scratch_dir("/nonexistent/scratch")
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_backend_only_operations_need_backend() {
        let dispatcher = ConversionDispatcher::new();
        assert!(!dispatcher.has_in_process_backend());
        assert!(matches!(
            dispatcher.sparsify(b"model").await,
            Err(LiteconvError::BackendUnavailable { .. })
        ));
        assert!(matches!(
            dispatcher.register_custom_opdefs(&[]).await,
            Err(LiteconvError::BackendUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_backend_operation_is_conversion_error() {
        let dispatcher = ConversionDispatcher::builder()
            .in_process_backend(Arc::new(RecordingBackend::default()))
            .build()
            .unwrap();
        let err = dispatcher
            .quantize(b"model", &QuantizeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LiteconvError::ConversionFailed { .. }));
    }

    #[tokio::test]
    async fn test_saved_model_uses_mlir() {
        let backend = Arc::new(RecordingBackend::default());
        let dispatcher = ConversionDispatcher::builder()
            .in_process_backend(backend.clone())
            .build()
            .unwrap();
        let options = ConversionOptions {
            saved_model_dir: Some("/models/mobilenet".into()),
            saved_model_tags: vec!["serve".into()],
            ..Default::default()
        };
        let out = dispatcher.convert_saved_model(&options).await.unwrap();
        assert!(out.is_empty());
        assert!(backend.saw_mlir.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_config_errors_precede_dispatch() {
        let backend = Arc::new(RecordingBackend::default());
        let dispatcher = ConversionDispatcher::builder()
            .strategy(TransportStrategy::InProcess)
            .in_process_backend(backend.clone())
            .build()
            .unwrap();
        let options = ConversionOptions {
            inference_type: crate::types::ElementType::UInt8,
            ..Default::default()
        };
        let err = dispatcher
            .convert_arrays(b"graph", &[("input".to_string(), vec![1])], &["out"], &options, false)
            .await
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(!backend.called.load(Ordering::SeqCst));
    }
}

//! In-process converter backend.
//!
//! The converter library itself (graph import, legalization, quantization,
//! flatbuffer export) lives behind `ConversionBackend`. Implementations wrap
//! a native binding; this crate only marshals requests to it and translates
//! its errors.

use serde::{Deserialize, Serialize};

use crate::request::EncodedRequest;
use crate::types::ElementType;

/// Options for post-calibration quantization of a converted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeOptions {
    /// Quantize per tensor instead of per channel.
    pub disable_per_channel: bool,
    /// Also quantize model inputs and outputs.
    pub fully_quantize: bool,
    /// Activation type.
    pub inference_type: ElementType,
    /// Insert numeric verification ops (debug models only).
    pub enable_numeric_verify: bool,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            disable_per_channel: false,
            fully_quantize: false,
            inference_type: ElementType::Int8,
            enable_numeric_verify: false,
        }
    }
}

/// A converter running inside the current process.
///
/// Errors are reported as values; a backend must not abort the host process.
#[async_trait::async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Convert `input_data` according to the encoded request.
    async fn convert(
        &self,
        request: &EncodedRequest,
        input_data: &[u8],
        enable_mlir_converter: bool,
    ) -> anyhow::Result<Vec<u8>>;

    /// Quantize a model that carries calibration results.
    async fn quantize(&self, _model: &[u8], _options: &QuantizeOptions) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("{} does not support quantization", self.name())
    }

    /// Re-encode sparse tensors of a converted model.
    async fn sparsify(&self, _model: &[u8]) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("{} does not support sparsification", self.name())
    }

    /// Register custom op definitions with the backend's op registry.
    async fn register_custom_opdefs(&self, _opdefs: &[String]) -> anyhow::Result<bool> {
        anyhow::bail!("{} does not support custom op registration", self.name())
    }
}

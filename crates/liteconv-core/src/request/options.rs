//! Recognized conversion options.
//!
//! Every option the request builder understands is a field here with its
//! default. Unknown keys are rejected when loading from JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, LiteconvError, Result};
use crate::shape::ShapeDescriptor;
use crate::types::{ElementType, ModelFormat, OpsSet};

/// Options controlling how a model is converted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionOptions {
    /// Element type of activations, excluding the input layer.
    pub inference_type: ElementType,
    /// Element type of the input layer. Defaults to `inference_type`.
    pub inference_input_type: Option<ElementType>,
    pub input_format: ModelFormat,
    pub output_format: ModelFormat,
    /// Per-input shape overrides; must have one entry per input when set.
    pub input_shapes: Option<Vec<ShapeDescriptor>>,
    /// `(mean, std_dev)` per input, in input order.
    pub quantized_input_stats: Option<Vec<(f32, f32)>>,
    /// `(min, max)` applied to arrays without a recorded range ("dummy quantization").
    pub default_ranges_stats: Option<(f32, f32)>,
    pub drop_control_dependency: bool,
    pub reorder_across_fake_quant: bool,
    pub change_concat_input_ranges: bool,
    pub allow_custom_ops: bool,
    /// OpDef text of custom ops present in the graph.
    pub custom_opdefs: Vec<String>,
    /// User-defined TensorFlow ops to run through the select-ops runtime.
    pub select_user_tf_ops: Vec<String>,
    pub target_ops: Option<BTreeSet<OpsSet>>,
    pub post_training_quantize: bool,
    pub quantize_to_float16: bool,
    pub dump_graphviz_dir: Option<String>,
    pub dump_graphviz_video: bool,
    pub conversion_summary_dir: Option<String>,
    pub allow_nonexistent_arrays: bool,
    pub saved_model_dir: Option<String>,
    pub saved_model_version: i32,
    pub saved_model_tags: Vec<String>,
    pub saved_model_exported_names: Vec<String>,
    /// Operator id to pinned operator version.
    pub operators_versions: BTreeMap<i32, i32>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            inference_type: ElementType::Float32,
            inference_input_type: None,
            input_format: ModelFormat::TensorflowGraphdef,
            output_format: ModelFormat::Tflite,
            input_shapes: None,
            quantized_input_stats: None,
            default_ranges_stats: None,
            drop_control_dependency: true,
            reorder_across_fake_quant: false,
            change_concat_input_ranges: false,
            allow_custom_ops: false,
            custom_opdefs: Vec::new(),
            select_user_tf_ops: Vec::new(),
            target_ops: None,
            post_training_quantize: false,
            quantize_to_float16: false,
            dump_graphviz_dir: None,
            dump_graphviz_video: false,
            conversion_summary_dir: None,
            allow_nonexistent_arrays: false,
            saved_model_dir: None,
            saved_model_version: 0,
            saved_model_tags: Vec::new(),
            saved_model_exported_names: Vec::new(),
            operators_versions: BTreeMap::new(),
        }
    }
}

impl ConversionOptions {
    /// Parse options from JSON. Unknown keys or values are configuration errors.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LiteconvError::config(format!("Invalid conversion options: {e}")))
    }

    /// Load options from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).with_path(path)?;
        Self::from_json_str(&content)
    }

    /// The input-layer element type after applying its default.
    pub fn effective_inference_input_type(&self) -> ElementType {
        self.inference_input_type.unwrap_or(self.inference_type)
    }

    /// Whether the SavedModel locator is in use.
    pub fn uses_saved_model(&self) -> bool {
        self.saved_model_dir.as_deref().is_some_and(|d| !d.is_empty())
    }

    /// `(mean, std_dev)` for input `idx` when the stats are required.
    ///
    /// Fails when the stats are missing, empty, or shorter than the inputs.
    pub(crate) fn required_input_stats(&self, idx: usize) -> Result<(f32, f32)> {
        let stats = match self.quantized_input_stats.as_deref() {
            Some(stats) if !stats.is_empty() => stats,
            _ => {
                return Err(LiteconvError::validation(
                    "quantized_input_stats",
                    "must be defined when either inference_type or inference_input_type \
                     is a quantized type (int8, uint8) and post_training_quantize is off",
                ))
            }
        };
        stats.get(idx).copied().ok_or_else(|| {
            LiteconvError::validation(
                "quantized_input_stats",
                format!("no entry for input {idx} ({} entries given)", stats.len()),
            )
        })
    }
}

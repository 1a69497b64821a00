//! Wire messages understood by the converter backend.
//!
//! These mirror the converter's `model_flags.proto`, `toco_flags.proto` and
//! `types.proto` (proto2). Field tags must match the backend's schema; all
//! scalar fields are `optional` so that unset values stay off the wire and the
//! backend applies its own defaults.

/// Element type of an input/output array as the backend names it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum IoDataType {
    IoDataTypeUnknown = 0,
    Float = 1,
    QuantizedUint8 = 2,
    Int32 = 3,
    Int64 = 4,
    String = 5,
    QuantizedInt16 = 6,
    Bool = 7,
    Complex64 = 8,
    Int8 = 9,
    Float16 = 10,
    Float64 = 11,
    Complex128 = 12,
}

impl IoDataType {
    /// Types that require quantization stats on the input layer.
    pub fn is_quantized(self) -> bool {
        matches!(self, IoDataType::QuantizedUint8 | IoDataType::Int8)
    }
}

/// Container format of the converter input or output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FileFormat {
    FileFormatUnknown = 0,
    TensorflowGraphdef = 1,
    Tflite = 2,
    GraphvizDot = 3,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InputArrayShape {
    /// Dimension sizes; `-1` marks an unknown dimension.
    #[prost(int32, repeated, packed = "false", tag = "2")]
    pub dims: Vec<i32>,
    #[prost(bool, optional, tag = "3")]
    pub unknown_rank: Option<bool>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InputArray {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(float, optional, tag = "3")]
    pub mean_value: Option<f32>,
    #[prost(float, optional, tag = "4")]
    pub std_value: Option<f32>,
    #[prost(enumeration = "IoDataType", optional, tag = "5")]
    pub data_type: Option<i32>,
    #[prost(message, optional, tag = "6")]
    pub shape: Option<InputArrayShape>,
}

/// Model description: which arrays are inputs/outputs and where the model lives.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ModelFlags {
    #[prost(message, repeated, tag = "1")]
    pub input_arrays: Vec<InputArray>,
    #[prost(string, repeated, tag = "2")]
    pub output_arrays: Vec<String>,
    #[prost(bool, optional, tag = "16")]
    pub allow_nonexistent_arrays: Option<bool>,
    #[prost(bool, optional, tag = "19")]
    pub change_concat_input_ranges: Option<bool>,
    #[prost(string, optional, tag = "20")]
    pub saved_model_dir: Option<String>,
    #[prost(int32, optional, tag = "21")]
    pub saved_model_version: Option<i32>,
    #[prost(string, repeated, tag = "22")]
    pub saved_model_tags: Vec<String>,
    #[prost(string, repeated, tag = "23")]
    pub saved_model_exported_names: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OperatorVersion {
    #[prost(int32, optional, tag = "1")]
    pub op_id: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub op_version: Option<i32>,
}

/// Conversion flags: target types, quantization and op-set toggles.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ConverterFlags {
    #[prost(enumeration = "FileFormat", optional, tag = "1")]
    pub input_format: Option<i32>,
    #[prost(enumeration = "FileFormat", optional, tag = "2")]
    pub output_format: Option<i32>,
    #[prost(enumeration = "IoDataType", optional, tag = "4")]
    pub inference_type: Option<i32>,
    #[prost(float, optional, tag = "5")]
    pub default_ranges_min: Option<f32>,
    #[prost(float, optional, tag = "6")]
    pub default_ranges_max: Option<f32>,
    #[prost(bool, optional, tag = "8")]
    pub reorder_across_fake_quant: Option<bool>,
    #[prost(bool, optional, tag = "10")]
    pub allow_custom_ops: Option<bool>,
    #[prost(enumeration = "IoDataType", optional, tag = "11")]
    pub inference_input_type: Option<i32>,
    #[prost(bool, optional, tag = "12")]
    pub drop_control_dependency: Option<bool>,
    #[prost(string, optional, tag = "24")]
    pub dump_graphviz_dir: Option<String>,
    #[prost(bool, optional, tag = "25")]
    pub dump_graphviz_include_video: Option<bool>,
    #[prost(bool, optional, tag = "26")]
    pub post_training_quantize: Option<bool>,
    #[prost(bool, optional, tag = "27")]
    pub enable_select_tf_ops: Option<bool>,
    #[prost(bool, optional, tag = "28")]
    pub force_select_tf_ops: Option<bool>,
    #[prost(bool, optional, tag = "29")]
    pub quantize_to_float16: Option<bool>,
    #[prost(string, optional, tag = "31")]
    pub conversion_summary_dir: Option<String>,
    #[prost(string, repeated, tag = "32")]
    pub custom_opdefs: Vec<String>,
    #[prost(string, repeated, tag = "33")]
    pub select_user_tf_ops: Vec<String>,
    // Operator version pinning is an extension of the local converter build.
    #[prost(message, repeated, tag = "100")]
    pub operators_versions: Vec<OperatorVersion>,
}

impl ConverterFlags {
    /// Whether the input layer needs per-input quantization stats.
    ///
    /// True when either inference type is quantized and weights are not being
    /// quantized after training.
    pub fn requires_input_stats(&self) -> bool {
        let quantized = |raw: Option<i32>| {
            raw.and_then(|v| IoDataType::try_from(v).ok())
                .is_some_and(IoDataType::is_quantized)
        };
        (quantized(self.inference_type) || quantized(self.inference_input_type))
            && !self.post_training_quantize.unwrap_or(false)
    }
}

//! User-facing enums: element types, container formats and op sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LiteconvError, Result};
use crate::proto::{FileFormat, IoDataType};

/// Element type of a tensor as callers spell it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Float32,
    Float16,
    Float64,
    #[serde(rename = "bfloat16")]
    BFloat16,
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    Bool,
    String,
    Complex64,
    Complex128,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Float32 => "float32",
            ElementType::Float16 => "float16",
            ElementType::Float64 => "float64",
            ElementType::BFloat16 => "bfloat16",
            ElementType::Int8 => "int8",
            ElementType::Int16 => "int16",
            ElementType::Int32 => "int32",
            ElementType::Int64 => "int64",
            ElementType::UInt8 => "uint8",
            ElementType::UInt16 => "uint16",
            ElementType::Bool => "bool",
            ElementType::String => "string",
            ElementType::Complex64 => "complex64",
            ElementType::Complex128 => "complex128",
        }
    }

    /// Map to the backend's array type.
    ///
    /// `uint8` and `int16` map to the backend's quantized types. Types the
    /// backend has no array representation for are a configuration error.
    pub fn to_io_data_type(self) -> Result<IoDataType> {
        let io = match self {
            ElementType::Float32 => IoDataType::Float,
            ElementType::Float16 => IoDataType::Float16,
            ElementType::Float64 => IoDataType::Float64,
            ElementType::Int8 => IoDataType::Int8,
            ElementType::Int16 => IoDataType::QuantizedInt16,
            ElementType::Int32 => IoDataType::Int32,
            ElementType::Int64 => IoDataType::Int64,
            ElementType::UInt8 => IoDataType::QuantizedUint8,
            ElementType::Bool => IoDataType::Bool,
            ElementType::String => IoDataType::String,
            ElementType::Complex64 => IoDataType::Complex64,
            ElementType::Complex128 => IoDataType::Complex128,
            ElementType::BFloat16 | ElementType::UInt16 => {
                return Err(LiteconvError::config(format!(
                    "Unsupported element type for conversion: {self}"
                )))
            }
        };
        Ok(io)
    }

    pub fn is_quantized(self) -> bool {
        self.to_io_data_type()
            .map(IoDataType::is_quantized)
            .unwrap_or(false)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = LiteconvError;

    fn from_str(s: &str) -> Result<Self> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "float32" | "float" => ElementType::Float32,
            "float16" | "half" => ElementType::Float16,
            "float64" | "double" => ElementType::Float64,
            "bfloat16" => ElementType::BFloat16,
            "int8" => ElementType::Int8,
            "int16" => ElementType::Int16,
            "int32" => ElementType::Int32,
            "int64" => ElementType::Int64,
            "uint8" => ElementType::UInt8,
            "uint16" => ElementType::UInt16,
            "bool" => ElementType::Bool,
            "string" => ElementType::String,
            "complex64" => ElementType::Complex64,
            "complex128" => ElementType::Complex128,
            other => {
                return Err(LiteconvError::config(format!(
                    "Unknown element type: {other}"
                )))
            }
        };
        Ok(ty)
    }
}

/// Container format selector for converter input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelFormat {
    TensorflowGraphdef,
    Tflite,
    GraphvizDot,
}

impl ModelFormat {
    pub fn to_proto(self) -> FileFormat {
        match self {
            ModelFormat::TensorflowGraphdef => FileFormat::TensorflowGraphdef,
            ModelFormat::Tflite => FileFormat::Tflite,
            ModelFormat::GraphvizDot => FileFormat::GraphvizDot,
        }
    }
}

/// Sets of operators the converted model may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpsSet {
    /// Builtin TFLite operators.
    #[serde(rename = "TFLITE_BUILTINS")]
    TfliteBuiltins,
    /// TensorFlow operators executed through the select-ops runtime.
    #[serde(rename = "SELECT_TF_OPS")]
    SelectTfOps,
    /// Only int8-quantized builtin operators.
    #[serde(rename = "TFLITE_BUILTINS_INT8")]
    TfliteBuiltinsInt8,
    /// int8 weights with int16 activations. Experimental, CPU only.
    #[serde(rename = "EXPERIMENTAL_TFLITE_BUILTINS_ACTIVATIONS_INT16_WEIGHTS_INT8")]
    ExperimentalTfliteBuiltinsActivationsInt16WeightsInt8,
}

impl OpsSet {
    pub const ALL: [OpsSet; 4] = [
        OpsSet::TfliteBuiltins,
        OpsSet::SelectTfOps,
        OpsSet::TfliteBuiltinsInt8,
        OpsSet::ExperimentalTfliteBuiltinsActivationsInt16WeightsInt8,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpsSet::TfliteBuiltins => "TFLITE_BUILTINS",
            OpsSet::SelectTfOps => "SELECT_TF_OPS",
            OpsSet::TfliteBuiltinsInt8 => "TFLITE_BUILTINS_INT8",
            OpsSet::ExperimentalTfliteBuiltinsActivationsInt16WeightsInt8 => {
                "EXPERIMENTAL_TFLITE_BUILTINS_ACTIVATIONS_INT16_WEIGHTS_INT8"
            }
        }
    }

    /// All op-set spellings accepted in `target_ops`.
    pub fn options() -> Vec<&'static str> {
        Self::ALL.iter().map(OpsSet::as_str).collect()
    }
}

impl fmt::Display for OpsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpsSet {
    type Err = LiteconvError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|set| set.as_str() == s)
            .ok_or_else(|| {
                LiteconvError::validation(
                    "target_ops",
                    format!("unknown op set {s}, expected one of {:?}", Self::options()),
                )
            })
    }
}

//! Tensor descriptors supplied by callers.

use serde::{Deserialize, Serialize};

use crate::error::{LiteconvError, Result};
use crate::shape::ShapeDescriptor;
use crate::types::ElementType;

/// Name, element type and shape of a graph tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    /// Graph tensor name, usually `op_name:output_index`.
    pub name: String,
    /// `None` when the element type could not be determined.
    pub dtype: Option<ElementType>,
    pub shape: ShapeDescriptor,
}

impl TensorDescriptor {
    pub fn new(name: impl Into<String>, dtype: ElementType, shape: ShapeDescriptor) -> Self {
        Self {
            name: name.into(),
            dtype: Some(dtype),
            shape,
        }
    }

    /// Descriptor for an output, where only the name is used.
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: None,
            shape: ShapeDescriptor::UnknownRank,
        }
    }

    pub fn element_type(&self) -> Result<ElementType> {
        self.dtype.ok_or_else(|| {
            LiteconvError::config(format!("Unknown element type for tensor {}", self.name))
        })
    }

    /// Array name as the backend expects it.
    ///
    /// A SavedModel conversion uses names as given. Otherwise the default
    /// output `:0` suffix is dropped so `conv/BiasAdd:0` becomes `conv/BiasAdd`.
    pub fn array_name(&self, from_saved_model: bool) -> Result<String> {
        if from_saved_model {
            return Ok(self.name.clone());
        }
        tensor_array_name(&self.name)
    }
}

/// Strip the default `:0` output index from a graph tensor name.
pub fn tensor_array_name(name: &str) -> Result<String> {
    let parts: Vec<&str> = name.split(':').collect();
    match parts.as_slice() {
        [op] => Ok((*op).to_string()),
        [op, "0"] => Ok((*op).to_string()),
        [_, _] => Ok(name.to_string()),
        _ => Err(LiteconvError::config(format!(
            "Tensor name {name} has more than one ':' separator"
        ))),
    }
}

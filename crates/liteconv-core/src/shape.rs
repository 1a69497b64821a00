//! Tensor shape descriptors.

use serde::{Deserialize, Serialize};

use crate::error::{LiteconvError, Result};
use crate::proto::InputArrayShape;

/// Sentinel for a dimension whose size is not known until runtime.
pub const UNKNOWN_DIM: i64 = -1;

/// Shape of an input tensor.
///
/// Serialized as `null` for an unknown rank or as a list of dimensions where
/// `null` or `-1` marks an unknown dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "Option<Vec<Option<i64>>>",
    into = "Option<Vec<Option<i64>>>"
)]
pub enum ShapeDescriptor {
    UnknownRank,
    /// Known rank; unknown dimensions hold `UNKNOWN_DIM`.
    Dims(Vec<i64>),
}

impl ShapeDescriptor {
    /// Build a known-rank shape, mapping `None` dimensions to the sentinel.
    ///
    /// Sizes above `i64::MAX` saturate and are rejected when encoded.
    pub fn from_dims<I>(dims: I) -> Self
    where
        I: IntoIterator<Item = Option<u64>>,
    {
        ShapeDescriptor::Dims(
            dims.into_iter()
                .map(|d| match d {
                    Some(v) => i64::try_from(v).unwrap_or(i64::MAX),
                    None => UNKNOWN_DIM,
                })
                .collect(),
        )
    }

    /// Build a known-rank shape from signed sizes where `-1` is unknown.
    pub fn from_signed(dims: &[i64]) -> Result<Self> {
        check_dims(dims)?;
        Ok(ShapeDescriptor::Dims(dims.to_vec()))
    }

    pub fn rank(&self) -> Option<usize> {
        match self {
            ShapeDescriptor::UnknownRank => None,
            ShapeDescriptor::Dims(dims) => Some(dims.len()),
        }
    }

    pub fn dims(&self) -> Option<&[i64]> {
        match self {
            ShapeDescriptor::UnknownRank => None,
            ShapeDescriptor::Dims(dims) => Some(dims),
        }
    }

    /// Encode for the backend. Dimensions must be `-1` or non-negative and
    /// fit the wire's `int32`.
    pub(crate) fn to_proto(&self) -> Result<InputArrayShape> {
        match self {
            ShapeDescriptor::UnknownRank => Ok(InputArrayShape {
                dims: Vec::new(),
                unknown_rank: Some(true),
            }),
            ShapeDescriptor::Dims(dims) => {
                check_dims(dims)?;
                let dims = dims
                    .iter()
                    .map(|d| {
                        i32::try_from(*d).map_err(|_| {
                            LiteconvError::config(format!("Dimension {d} does not fit in int32"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(InputArrayShape {
                    dims,
                    unknown_rank: Some(false),
                })
            }
        }
    }
}

fn check_dims(dims: &[i64]) -> Result<()> {
    match dims.iter().find(|d| **d < UNKNOWN_DIM) {
        Some(bad) => Err(LiteconvError::config(format!(
            "Invalid dimension {bad} in shape {dims:?}"
        ))),
        None => Ok(()),
    }
}

impl TryFrom<Option<Vec<Option<i64>>>> for ShapeDescriptor {
    type Error = LiteconvError;

    fn try_from(value: Option<Vec<Option<i64>>>) -> Result<Self> {
        match value {
            None => Ok(ShapeDescriptor::UnknownRank),
            Some(dims) => {
                let dims: Vec<i64> = dims.into_iter().map(|d| d.unwrap_or(UNKNOWN_DIM)).collect();
                ShapeDescriptor::from_signed(&dims)
            }
        }
    }
}

impl From<ShapeDescriptor> for Option<Vec<Option<i64>>> {
    fn from(value: ShapeDescriptor) -> Self {
        match value {
            ShapeDescriptor::UnknownRank => None,
            ShapeDescriptor::Dims(dims) => Some(
                dims.into_iter()
                    .map(|d| (d != UNKNOWN_DIM).then_some(d))
                    .collect(),
            ),
        }
    }
}

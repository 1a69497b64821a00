//! Conversion request construction.
//!
//! Callers describe a conversion with tensors (or raw name/shape pairs, or a
//! SavedModel locator) plus `ConversionOptions`. The builder validates them
//! and produces an immutable `ConversionRequest` ready for dispatch.

mod builder;
mod options;
mod tensor;

pub use builder::{build_converter_flags, ConversionRequest, EncodedRequest};
pub use options::ConversionOptions;
pub use tensor::{tensor_array_name, TensorDescriptor};

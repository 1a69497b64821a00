//! Liteconv Core - Request marshaling and dispatch for a TFLite model converter.
//!
//! This crate turns a description of a conversion (input/output tensors and
//! `ConversionOptions`) into the pair of protocol-buffer messages the converter
//! consumes, and hands them to a converter backend: either a library running
//! in this process, or the `toco_from_protos` executable run on scratch files.
//! The conversion itself happens in the backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use liteconv_core::{
//!     ConversionDispatcher, ConversionOptions, ElementType, ShapeDescriptor, TensorDescriptor,
//! };
//!
//! #[tokio::main]
//! async fn main() -> liteconv_core::Result<()> {
//!     let graph_def = std::fs::read("frozen_graph.pb")?;
//!     let dispatcher = ConversionDispatcher::builder().build()?;
//!
//!     let input = TensorDescriptor::new(
//!         "input:0",
//!         ElementType::Float32,
//!         ShapeDescriptor::from_dims([Some(1), Some(224), Some(224), Some(3)]),
//!     );
//!     let output = TensorDescriptor::output("MobilenetV1/Predictions/Reshape_1:0");
//!
//!     let tflite = dispatcher
//!         .convert_tensors(&graph_def, &[input], &[output], &ConversionOptions::default(), None, false)
//!         .await?;
//!     std::fs::write("model.tflite", tflite)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod proto;
pub mod request;
pub mod shape;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::{BackendConfig, ScratchConfig};
pub use dispatcher::{ConversionDispatcher, ConversionDispatcherBuilder};
pub use error::{LiteconvError, Result};
pub use request::{
    build_converter_flags, tensor_array_name, ConversionOptions, ConversionRequest,
    EncodedRequest, TensorDescriptor,
};
pub use shape::ShapeDescriptor;
pub use transport::{
    BinaryLocator, BinaryResolution, ConversionBackend, QuantizeOptions, TransportStrategy,
};
pub use types::{ElementType, ModelFormat, OpsSet};

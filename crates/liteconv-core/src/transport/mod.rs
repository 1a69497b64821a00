//! How a conversion request reaches the converter backend.
//!
//! Two transports exist: calling a `ConversionBackend` inside this process,
//! or running the converter executable on scratch files. The strategy is
//! chosen once when the dispatcher is built and passed in explicitly.

pub mod in_process;
pub mod locator;
pub(crate) mod out_of_process;

pub use in_process::{ConversionBackend, QuantizeOptions};
pub use locator::{BinaryLocator, BinaryResolution};

/// Configured transport policy of a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStrategy {
    /// Always call the registered in-process backend.
    InProcess,
    /// Run the converter executable, unless a call asks for the MLIR
    /// converter and an in-process backend is registered.
    OutOfProcess(BinaryLocator),
}

impl Default for TransportStrategy {
    fn default() -> Self {
        TransportStrategy::OutOfProcess(BinaryLocator::default())
    }
}

impl TransportStrategy {
    pub fn locator(&self) -> Option<&BinaryLocator> {
        match self {
            TransportStrategy::InProcess => None,
            TransportStrategy::OutOfProcess(locator) => Some(locator),
        }
    }
}

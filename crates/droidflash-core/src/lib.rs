//! # droidflash-core - Core Domain Types
//!
//! Foundation crate for droidflash. Provides the device definition model and
//! loader, the step vocabulary, the install progress parser, error handling
//! and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, serde_yaml, thiserror, regex, tracing).
//!
//! ## Public API
//!
//! ### Steps (`step`)
//! - [`StepDefinition`] - One instruction shown to the user, possibly backed by a tool command
//! - [`StepKind`] - How a step is presented (text, confirm, call, ...)
//! - [`StepCommand`] - The fixed whitelist of tool operations a step may invoke
//!
//! ### Device definitions (`device`, `loader`)
//! - [`DeviceConfig`] - The full declarative definition for one supported device
//! - [`DeviceMetadata`], [`Requirements`], [`ExtraPartition`]
//! - [`load_config()`] - Resolve a device code to its definition document
//!
//! ### Install progress (`progress`)
//! - [`ProgressTracker`] - Turns streamed tool output lines into progress signals
//! - [`ProgressSignal`] - Determinate percentage or indeterminate "still working"
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use droidflash_core::prelude::*;
//! ```

pub mod device;
pub mod error;
pub mod loader;
pub mod logging;
pub mod progress;
pub mod step;

/// Prelude for common imports used throughout all droidflash crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use device::{DeviceConfig, DeviceMetadata, ExtraPartition, Requirements};
pub use error::{Error, Result, ResultExt};
pub use loader::{load_config, load_config_with_override, scan_documents};
pub use progress::{ProgressSignal, ProgressTracker};
pub use step::{StepCommand, StepDefinition, StepKind};

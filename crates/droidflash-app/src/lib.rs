//! # droidflash-app - Session State and Orchestration
//!
//! Owns the mutable state of one flashing session and the controller that
//! executes steps against the tooling layer. The GUI sits on top of this
//! crate and only ever observes state; it never derives state from its own
//! widgets.
//!
//! ## Public API
//!
//! - [`FlashSession`] - Device config, pending step queue, skip toggles, selected files
//! - [`Wizard`], [`WizardPhase`], [`Advance`] - The coarse screen-flow state machine
//! - [`StepController`], [`ExecutionEvent`] - Dispatches step commands to the tooling layer
//! - [`Settings`] - User settings loaded from `config.toml`

pub mod controller;
pub mod session;
pub mod settings;
pub mod wizard;

pub use controller::{ExecutionEvent, StepController};
pub use session::FlashSession;
pub use settings::Settings;
pub use wizard::{Advance, Wizard, WizardPhase};

//! # droidflash-tooling - External Tool Invocation
//!
//! Drives `adb`, `fastboot` and `heimdall` as child processes. A single
//! invocation streams its merged stdout/stderr line by line over a channel
//! and resolves to a terminal boolean (`exit code == 0`); composite
//! operations chain invocations with inter-stage delays and short-circuit on
//! the first failing stage, so they present exactly the same observable shape
//! as a single invocation.
//!
//! Subprocess failures are never surfaced as `Err`: they travel as the
//! operation's `false` terminal signal and the user retries the step. The
//! only hard failures at this layer are programming errors (a tool name
//! outside the whitelist), and those are unrepresentable because [`Tool`] is
//! a closed enum.

mod adb;
mod detect;
mod fastboot;
mod heimdall;
mod runner;
mod tool;

pub use runner::ToolRunner;
pub use tool::Tool;

//! Step vocabulary for the installer wizard
//!
//! A device definition document expands into an ordered list of
//! [`StepDefinition`]s. Each step either just shows instructions or runs one
//! of a fixed whitelist of tool operations ([`StepCommand`]). The whitelist is
//! deliberately a closed enum: adding an operation means adding both the
//! variant here and the matching dispatch arm in the execution controller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How a step is presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Instructional text only
    Text,

    /// Text plus a confirm-and-continue action
    ConfirmButton,

    /// Runs a tool operation, confirm unlocks after success
    CallButton,

    /// Like `CallButton`, with a free-text input (e.g. an unlock code)
    CallButtonWithInput,

    /// Opens an external link, then confirm-and-continue
    LinkButtonWithConfirm,
}

impl StepKind {
    /// Whether this kind of step executes a tool operation
    ///
    /// A step definition must carry a `command` exactly when this is true.
    pub fn requires_command(&self) -> bool {
        matches!(self, StepKind::CallButton | StepKind::CallButtonWithInput)
    }

    /// Whether this kind of step collects free-text input from the user
    pub fn takes_input(&self) -> bool {
        matches!(self, StepKind::CallButtonWithInput)
    }
}

/// Symbolic names of the tool operations a step may invoke
///
/// This is the full whitelist; a document naming anything else fails schema
/// validation and the definition is rejected as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCommand {
    AdbReboot,
    AdbRebootBootloader,
    AdbRebootDownload,
    AdbSideload,
    AdbTwrpWipeAndInstall,
    AdbTwrpCopyPartitions,
    FastbootBootRecovery,
    FastbootFlashBoot,
    FastbootFlashRecovery,
    FastbootUnlock,
    FastbootUnlockWithCode,
    FastbootOemUnlock,
    FastbootGetUnlockData,
    FastbootReboot,
    HeimdallFlashRecovery,
}

impl StepCommand {
    /// All whitelisted commands, in document order
    pub const ALL: [StepCommand; 15] = [
        StepCommand::AdbReboot,
        StepCommand::AdbRebootBootloader,
        StepCommand::AdbRebootDownload,
        StepCommand::AdbSideload,
        StepCommand::AdbTwrpWipeAndInstall,
        StepCommand::AdbTwrpCopyPartitions,
        StepCommand::FastbootBootRecovery,
        StepCommand::FastbootFlashBoot,
        StepCommand::FastbootFlashRecovery,
        StepCommand::FastbootUnlock,
        StepCommand::FastbootUnlockWithCode,
        StepCommand::FastbootOemUnlock,
        StepCommand::FastbootGetUnlockData,
        StepCommand::FastbootReboot,
        StepCommand::HeimdallFlashRecovery,
    ];

    /// The wire name as it appears in device definition documents
    pub fn name(&self) -> &'static str {
        match self {
            StepCommand::AdbReboot => "adb_reboot",
            StepCommand::AdbRebootBootloader => "adb_reboot_bootloader",
            StepCommand::AdbRebootDownload => "adb_reboot_download",
            StepCommand::AdbSideload => "adb_sideload",
            StepCommand::AdbTwrpWipeAndInstall => "adb_twrp_wipe_and_install",
            StepCommand::AdbTwrpCopyPartitions => "adb_twrp_copy_partitions",
            StepCommand::FastbootBootRecovery => "fastboot_boot_recovery",
            StepCommand::FastbootFlashBoot => "fastboot_flash_boot",
            StepCommand::FastbootFlashRecovery => "fastboot_flash_recovery",
            StepCommand::FastbootUnlock => "fastboot_unlock",
            StepCommand::FastbootUnlockWithCode => "fastboot_unlock_with_code",
            StepCommand::FastbootOemUnlock => "fastboot_oem_unlock",
            StepCommand::FastbootGetUnlockData => "fastboot_get_unlock_data",
            StepCommand::FastbootReboot => "fastboot_reboot",
            StepCommand::HeimdallFlashRecovery => "heimdall_flash_recovery",
        }
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| Error::unknown_command(s))
    }
}

/// One instruction to show the user or execute
///
/// Constructed once when a device definition is loaded and immutable
/// thereafter; the session dequeues *copies* of these as the user progresses,
/// so the canonical definition never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    /// Section title, also used to select a contextual illustration
    pub title: String,

    /// Presentation kind
    pub kind: StepKind,

    /// Instructional text shown to the user
    pub content: String,

    /// Tool operation to invoke; set iff `kind.requires_command()`
    pub command: Option<StepCommand>,

    /// Whether the step offers a skip action
    pub allow_skip: bool,

    /// Illustration asset name, if any
    pub image: Option<String>,

    /// External link for `LinkButtonWithConfirm` steps
    pub link: Option<String>,
}

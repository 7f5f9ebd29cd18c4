//! Mutable state for one flashing session

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use droidflash_core::loader::BOOT_RECOVERY_TITLE;
use droidflash_core::prelude::*;
use droidflash_core::{DeviceConfig, ExtraPartition, StepDefinition, StepKind};

/// The orchestration state for one run of the wizard
///
/// `pending_steps` is always a deterministic function of the loaded config
/// and the two skip toggles: every toggle flip recomputes the queue wholesale
/// from fresh copies of the canonical step sequences. The queue is never
/// patched incrementally, so partial consumption can never desync it, and
/// popping a step can never corrupt the config it was copied from.
///
/// Created when a device is detected and confirmed; destroyed and recreated
/// on an explicit restart.
#[derive(Debug, Default)]
pub struct FlashSession {
    /// The loaded device definition, if any
    pub config: Option<DeviceConfig>,

    /// Steps still ahead of the user, consumed from the front
    pending_steps: VecDeque<StepDefinition>,

    /// Steps already completed, most recent on top, for backward navigation
    back_stack: Vec<StepDefinition>,

    /// Whether the bootloader-unlock sequence is part of the run.
    /// Off means the user declared the bootloader already unlocked.
    unlock_bootloader_enabled: bool,

    /// Whether the user declared a custom recovery already flashed
    recovery_already_flashed: bool,

    /// Selected OS image (zip)
    pub image_path: Option<PathBuf>,

    /// Selected recovery image (img)
    pub recovery_path: Option<PathBuf>,

    /// Selected addon packages, sideloaded after the OS install
    pub addon_paths: Vec<PathBuf>,

    /// Images for the additional partitions the device definition calls for
    pub extra_images: BTreeMap<ExtraPartition, PathBuf>,

    /// Unlock code typed by the user, for `fastboot_unlock_with_code`
    pub unlock_code: Option<String>,

    /// Whether the user asked to install addons after the OS
    pub install_addons_requested: bool,

    /// Whether raw tool output is surfaced in the UI
    pub advanced_output_enabled: bool,

    /// Whether a tool operation is currently running. Explicit state for the
    /// UI to query; never inferred from widget properties.
    pub operation_in_flight: bool,
}

impl FlashSession {
    pub fn new() -> Self {
        Self {
            unlock_bootloader_enabled: true,
            ..Self::default()
        }
    }

    /// Resolve and store the device definition, then rebuild the step queue
    pub fn load_config(&mut self, device_code: &str, assets_dir: &Path) -> bool {
        self.set_config(droidflash_core::load_config(device_code, assets_dir));
        self.config.is_some()
    }

    /// Store an already-resolved definition (or clear it) and rebuild
    pub fn set_config(&mut self, config: Option<DeviceConfig>) {
        self.config = config;
        self.back_stack.clear();
        self.rebuild_pending_steps();
    }

    pub fn unlock_bootloader_enabled(&self) -> bool {
        self.unlock_bootloader_enabled
    }

    pub fn recovery_already_flashed(&self) -> bool {
        self.recovery_already_flashed
    }

    /// Flip the "bootloader already unlocked" toggle and rebuild the queue
    pub fn toggle_unlock_bootloader(&mut self) {
        self.unlock_bootloader_enabled = !self.unlock_bootloader_enabled;
        info!(
            "Unlock bootloader enabled: {}",
            self.unlock_bootloader_enabled
        );
        self.rebuild_pending_steps();
    }

    /// Flip the "recovery already flashed" toggle and rebuild the queue
    pub fn toggle_recovery_already_flashed(&mut self) {
        self.recovery_already_flashed = !self.recovery_already_flashed;
        info!("Recovery already flashed: {}", self.recovery_already_flashed);
        self.rebuild_pending_steps();
    }

    /// Recompute `pending_steps` from the config and the two toggles
    ///
    /// Always copies the step definitions out of the config: steps are
    /// destructively popped during execution, and sharing instances across a
    /// toggle would corrupt the canonical sequences.
    fn rebuild_pending_steps(&mut self) {
        self.pending_steps.clear();
        let Some(config) = &self.config else {
            return;
        };
        if self.unlock_bootloader_enabled {
            self.pending_steps.extend(config.unlock_bootloader.iter().cloned());
        }
        if self.recovery_already_flashed {
            self.pending_steps.push_back(manual_recovery_boot_step());
        } else {
            self.pending_steps.extend(config.boot_recovery.iter().cloned());
        }
    }

    pub fn pending_steps(&self) -> &VecDeque<StepDefinition> {
        &self.pending_steps
    }

    pub fn back_stack(&self) -> &[StepDefinition] {
        &self.back_stack
    }

    /// Pop the next step, recording it for backward navigation
    ///
    /// `None` means the sequence is exhausted and the run is complete.
    pub fn advance(&mut self) -> Option<StepDefinition> {
        let step = self.pending_steps.pop_front()?;
        self.back_stack.push(step.clone());
        Some(step)
    }

    /// Reinstate the most recently completed step at the front of the queue
    pub fn go_back(&mut self) -> Option<&StepDefinition> {
        let step = self.back_stack.pop()?;
        self.pending_steps.push_front(step);
        self.pending_steps.front()
    }
}

/// Replaces the recovery-boot sequence when the user already flashed one
fn manual_recovery_boot_step() -> StepDefinition {
    StepDefinition {
        title: BOOT_RECOVERY_TITLE.to_string(),
        kind: StepKind::ConfirmButton,
        content: "You told us a custom recovery is already flashed. \
                  Boot the device into recovery now, then confirm to continue."
            .to_string(),
        command: None,
        allow_skip: false,
        image: None,
        link: None,
    }
}

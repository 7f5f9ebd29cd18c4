//! Coarse screen-flow state machine for the wizard

use droidflash_core::prelude::*;
use droidflash_core::StepDefinition;

use crate::session::FlashSession;

/// Where the user currently is in the wizard
///
/// There is deliberately no `Failed` phase: a failing step keeps the user on
/// that step with a retry action and never advances anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WizardPhase {
    /// Waiting for a device to be detected and its definition confirmed
    #[default]
    DeviceSelection,

    /// Waiting for the OS image and recovery files to be picked
    FileSelection,

    /// Waiting for the user to acknowledge the display-only requirements
    RequirementsAck,

    /// Working through the pending step queue
    Steps,

    /// Sideloading addon packages after the OS install
    AddonInstall,

    /// Terminal phase; the installation is done
    Success,
}

/// Result of asking the wizard for the next step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Show and execute this step next
    Step(StepDefinition),

    /// The step queue is exhausted; the wizard is in `Success`
    Finished,
}

/// Drives a [`FlashSession`] through the wizard phases
#[derive(Debug)]
pub struct Wizard {
    pub session: FlashSession,
    phase: WizardPhase,
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            session: FlashSession::new(),
            phase: WizardPhase::DeviceSelection,
        }
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    /// Leave device selection once a definition is loaded
    pub fn confirm_device(&mut self) -> bool {
        if self.phase != WizardPhase::DeviceSelection || self.session.config.is_none() {
            return false;
        }
        self.phase = WizardPhase::FileSelection;
        true
    }

    /// Leave file selection once both the OS image and recovery are picked
    pub fn confirm_files(&mut self) -> bool {
        if self.phase != WizardPhase::FileSelection
            || self.session.image_path.is_none()
            || self.session.recovery_path.is_none()
        {
            return false;
        }
        self.phase = WizardPhase::RequirementsAck;
        true
    }

    /// The user confirmed the device meets the listed requirements
    pub fn acknowledge_requirements(&mut self) -> bool {
        if self.phase != WizardPhase::RequirementsAck {
            return false;
        }
        self.phase = WizardPhase::Steps;
        true
    }

    /// Pop the next step, or transition to `Success` when the queue is empty
    pub fn advance(&mut self) -> Advance {
        match self.session.advance() {
            Some(step) => Advance::Step(step),
            None => {
                info!("Step sequence exhausted, installation finished");
                self.phase = WizardPhase::Success;
                Advance::Finished
            }
        }
    }

    /// Navigate backward to the previously completed step
    pub fn go_back(&mut self) -> Option<&StepDefinition> {
        self.session.go_back()
    }

    /// Enter the optional addon phase (user choice after the OS install)
    pub fn start_addon_install(&mut self) {
        self.session.install_addons_requested = true;
        self.phase = WizardPhase::AddonInstall;
    }

    /// Leave the addon phase into the terminal success phase
    pub fn finish_addon_install(&mut self) {
        self.phase = WizardPhase::Success;
    }

    /// Throw the whole session away and start over
    pub fn restart(&mut self) {
        info!("Restarting the wizard");
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::test_config;
    use droidflash_core::{StepCommand, StepKind};
    use std::path::PathBuf;

    /// 2 unlock steps + 1 recovery step + 1 install step
    fn scripted_config() -> droidflash_core::DeviceConfig {
        let mut config = test_config();
        config.boot_recovery.push(StepDefinition {
            title: "Install the OS".to_string(),
            kind: StepKind::CallButton,
            content: "Install the OS image.".to_string(),
            command: Some(StepCommand::AdbTwrpWipeAndInstall),
            allow_skip: false,
            image: None,
            link: None,
        });
        config
    }

    fn ready_wizard() -> Wizard {
        let mut wizard = Wizard::new();
        wizard.session.set_config(Some(scripted_config()));
        assert!(wizard.confirm_device());
        wizard.session.image_path = Some(PathBuf::from("/tmp/os.zip"));
        wizard.session.recovery_path = Some(PathBuf::from("/tmp/twrp.img"));
        assert!(wizard.confirm_files());
        assert!(wizard.acknowledge_requirements());
        wizard
    }

    #[test]
    fn test_cannot_leave_device_selection_without_config() {
        let mut wizard = Wizard::new();
        assert!(!wizard.confirm_device());
        assert_eq!(wizard.phase(), WizardPhase::DeviceSelection);
    }

    #[test]
    fn test_cannot_confirm_files_until_both_picked() {
        let mut wizard = Wizard::new();
        wizard.session.set_config(Some(scripted_config()));
        wizard.confirm_device();

        wizard.session.image_path = Some(PathBuf::from("/tmp/os.zip"));
        assert!(!wizard.confirm_files());
        wizard.session.recovery_path = Some(PathBuf::from("/tmp/twrp.img"));
        assert!(wizard.confirm_files());
    }

    #[test]
    fn test_scripted_session_reaches_success() {
        let mut wizard = ready_wizard();
        assert_eq!(wizard.phase(), WizardPhase::Steps);

        let mut completed = Vec::new();
        loop {
            match wizard.advance() {
                Advance::Step(step) => completed.push(step),
                Advance::Finished => break,
            }
        }

        assert_eq!(completed.len(), 4);
        assert_eq!(wizard.phase(), WizardPhase::Success);
        assert!(wizard.session.pending_steps().is_empty());

        // Back stack holds the completed steps in reverse completion order
        let back: Vec<&str> = wizard
            .session
            .back_stack()
            .iter()
            .rev()
            .map(|s| s.content.as_str())
            .collect();
        assert_eq!(
            back,
            vec![
                "Install the OS image.",
                "Boot the custom recovery.",
                "Unlock the bootloader.",
                "Reboot into the bootloader.",
            ]
        );
    }

    #[test]
    fn test_addon_phase_is_optional() {
        let mut wizard = ready_wizard();
        while !matches!(wizard.advance(), Advance::Finished) {}
        assert_eq!(wizard.phase(), WizardPhase::Success);

        wizard.start_addon_install();
        assert_eq!(wizard.phase(), WizardPhase::AddonInstall);
        assert!(wizard.session.install_addons_requested);

        wizard.finish_addon_install();
        assert_eq!(wizard.phase(), WizardPhase::Success);
    }

    #[test]
    fn test_restart_recreates_the_session() {
        let mut wizard = ready_wizard();
        wizard.advance();
        wizard.restart();

        assert_eq!(wizard.phase(), WizardPhase::DeviceSelection);
        assert!(wizard.session.config.is_none());
        assert!(wizard.session.pending_steps().is_empty());
        assert!(wizard.session.unlock_bootloader_enabled());
    }
}

//! Step execution: dispatching commands to the tooling layer

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use droidflash_core::prelude::*;
use droidflash_core::{DeviceConfig, ProgressSignal, ProgressTracker, StepCommand, StepDefinition};
use droidflash_tooling::ToolRunner;

use crate::session::FlashSession;

/// What the UI observes while a step runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// One raw output line, in emission order, for the advanced-output view
    Output(String),

    /// The progress signal derived from that line
    Progress(ProgressSignal),

    /// Terminal signal; always the last event of an execution
    Finished(bool),
}

/// Executes steps against the tooling layer
///
/// One controller serves the whole session; it never runs two operations at
/// once because the caller only invokes it for the step currently on screen,
/// and each call is drained to its terminal signal before returning. On
/// failure nothing advances: the caller re-enables the run action and the
/// identical step may be retried any number of times.
#[derive(Debug, Clone)]
pub struct StepController {
    bin_dir: PathBuf,
    assets_dir: PathBuf,
    /// How long to wait after a successful operation before the user may
    /// continue; covers the device finishing a reboot or mode switch.
    settle_delay: Duration,
    delay_unit: Duration,
    poll_interval: Duration,
    max_polls: usize,
}

impl StepController {
    pub fn new(bin_dir: PathBuf, assets_dir: PathBuf) -> Self {
        Self {
            bin_dir,
            assets_dir,
            settle_delay: Duration::from_secs(5),
            delay_unit: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            max_polls: 300,
        }
    }

    /// Override the post-success settle delay (tests pass zero)
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Override the tooling-layer timing (tests compress everything)
    pub fn with_runner_timing(
        mut self,
        delay_unit: Duration,
        poll_interval: Duration,
        max_polls: usize,
    ) -> Self {
        self.delay_unit = delay_unit;
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    fn make_runner(&self, lines: mpsc::Sender<String>) -> ToolRunner {
        ToolRunner::new(self.bin_dir.clone(), self.assets_dir.clone(), lines)
            .with_delay_unit(self.delay_unit)
            .with_wait_policy(self.poll_interval, self.max_polls)
    }

    /// Run the step's command and report the terminal outcome
    ///
    /// Fails fast with a fatal error, before any subprocess is spawned, when
    /// the step carries no command or a required session input (image,
    /// recovery, unlock code) is missing: both indicate a corrupt or
    /// unsupported device definition, not a transient failure.
    pub async fn execute(
        &self,
        step: &StepDefinition,
        session: &FlashSession,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> Result<bool> {
        let command = step
            .command
            .ok_or_else(|| Error::missing_command(&step.title))?;
        info!("Execute step command '{command}'");

        let (line_tx, line_rx) = mpsc::channel(64);
        let operation = dispatch(command, self.make_runner(line_tx), session)?;
        Ok(self.drain(operation, line_rx, events).await)
    }

    /// Sideload every selected addon, then reboot into the OS
    pub async fn install_addons(
        &self,
        session: &FlashSession,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> Result<bool> {
        let config = require_config(session)?;
        let is_ab = config.is_ab();
        if session.addon_paths.is_empty() {
            return Err(Error::missing_input("addon packages"));
        }
        let addons = session.addon_paths.clone();

        let (line_tx, line_rx) = mpsc::channel(64);
        let runner = self.make_runner(line_tx);
        let operation = tokio::spawn(async move {
            for addon in &addons {
                if !runner.adb_twrp_install_addon(addon).await {
                    return false;
                }
            }
            runner.adb_twrp_finish_install_addons(is_ab).await
        });
        Ok(self.drain(operation, line_rx, events).await)
    }

    /// Forward lines and progress until the operation resolves
    async fn drain(
        &self,
        operation: JoinHandle<bool>,
        mut lines: mpsc::Receiver<String>,
        events: &mpsc::Sender<ExecutionEvent>,
    ) -> bool {
        let mut progress = ProgressTracker::new();
        while let Some(line) = lines.recv().await {
            let signal = progress.feed(&line);
            let _ = events.send(ExecutionEvent::Output(line)).await;
            let _ = events.send(ExecutionEvent::Progress(signal)).await;
        }

        let success = operation.await.unwrap_or(false);
        if success {
            tokio::time::sleep(self.settle_delay).await;
            progress.finish();
            let _ = events
                .send(ExecutionEvent::Progress(ProgressSignal::Determinate(100)))
                .await;
        }
        let _ = events.send(ExecutionEvent::Finished(success)).await;
        success
    }
}

/// The fixed dispatch table from command names to tooling operations
///
/// Every [`StepCommand`] variant has exactly one arm here; session-held paths
/// and the user-entered unlock code are substituted as arguments. The
/// returned task owns the runner and resolves to the operation's terminal
/// boolean.
fn dispatch(
    command: StepCommand,
    runner: ToolRunner,
    session: &FlashSession,
) -> Result<JoinHandle<bool>> {
    use StepCommand::*;

    let handle = match command {
        AdbReboot => tokio::spawn(async move { runner.adb_reboot().await }),
        AdbRebootBootloader => tokio::spawn(async move { runner.adb_reboot_bootloader().await }),
        AdbRebootDownload => tokio::spawn(async move { runner.adb_reboot_download().await }),
        AdbSideload => {
            let target = require_path(&session.image_path, "OS image")?;
            tokio::spawn(async move { runner.adb_sideload(&target).await })
        }
        AdbTwrpWipeAndInstall => {
            let target = require_path(&session.image_path, "OS image")?;
            let is_ab = require_config(session)?.is_ab();
            let install_addons = session.install_addons_requested;
            let recovery = session.recovery_path.clone();
            tokio::spawn(async move {
                runner
                    .adb_twrp_wipe_and_install(&target, is_ab, install_addons, recovery.as_deref())
                    .await
            })
        }
        AdbTwrpCopyPartitions => {
            tokio::spawn(async move { runner.adb_twrp_copy_partitions().await })
        }
        FastbootBootRecovery => {
            let recovery = require_path(&session.recovery_path, "recovery image")?;
            let is_ab = require_config(session)?.is_ab();
            tokio::spawn(async move { runner.fastboot_boot_recovery(&recovery, is_ab).await })
        }
        FastbootFlashBoot => {
            let recovery = require_path(&session.recovery_path, "recovery image")?;
            tokio::spawn(async move { runner.fastboot_flash_boot(&recovery).await })
        }
        FastbootFlashRecovery => {
            let recovery = require_path(&session.recovery_path, "recovery image")?;
            tokio::spawn(async move { runner.fastboot_flash_recovery(&recovery).await })
        }
        FastbootUnlock => tokio::spawn(async move { runner.fastboot_unlock().await }),
        FastbootUnlockWithCode => {
            let code = session
                .unlock_code
                .clone()
                .ok_or_else(|| Error::missing_input("unlock code"))?;
            tokio::spawn(async move { runner.fastboot_unlock_with_code(&code).await })
        }
        FastbootOemUnlock => tokio::spawn(async move { runner.fastboot_oem_unlock().await }),
        FastbootGetUnlockData => {
            tokio::spawn(async move { runner.fastboot_get_unlock_data().await })
        }
        FastbootReboot => tokio::spawn(async move { runner.fastboot_reboot().await }),
        HeimdallFlashRecovery => {
            let recovery = require_path(&session.recovery_path, "recovery image")?;
            tokio::spawn(async move { runner.heimdall_flash_recovery(&recovery).await })
        }
    };
    Ok(handle)
}

fn require_path(path: &Option<PathBuf>, what: &str) -> Result<PathBuf> {
    path.clone().ok_or_else(|| Error::missing_input(what))
}

fn require_config(session: &FlashSession) -> Result<&DeviceConfig> {
    session
        .config
        .as_ref()
        .ok_or_else(|| Error::missing_input("device configuration"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::test_config;
    use droidflash_core::StepKind;

    fn call_step(command: StepCommand) -> StepDefinition {
        StepDefinition {
            title: "Test step".to_string(),
            kind: StepKind::CallButton,
            content: "Run it.".to_string(),
            command: Some(command),
            allow_skip: false,
            image: None,
            link: None,
        }
    }

    fn quick_controller(bin_dir: PathBuf) -> StepController {
        StepController::new(bin_dir.clone(), bin_dir)
            .with_settle_delay(Duration::ZERO)
            .with_runner_timing(Duration::ZERO, Duration::from_millis(1), 3)
    }

    #[tokio::test]
    async fn test_step_without_command_fails_fast() {
        let controller = quick_controller(PathBuf::from("/nonexistent"));
        let session = FlashSession::new();
        let (events, mut rx) = mpsc::channel(16);

        let step = StepDefinition {
            command: None,
            ..call_step(StepCommand::AdbReboot)
        };
        let err = controller.execute(&step, &session, &events).await.unwrap_err();
        assert!(matches!(err, Error::MissingCommand { .. }));
        assert!(err.is_fatal());
        // Nothing was spawned, so no events were emitted
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_session_input_fails_fast() {
        let controller = quick_controller(PathBuf::from("/nonexistent"));
        let session = FlashSession::new();
        let (events, mut rx) = mpsc::channel(16);

        let err = controller
            .execute(&call_step(StepCommand::AdbSideload), &session, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_config_fails_fast_for_boot_recovery() {
        let controller = quick_controller(PathBuf::from("/nonexistent"));
        let mut session = FlashSession::new();
        session.recovery_path = Some(PathBuf::from("/tmp/twrp.img"));
        let (events, _rx) = mpsc::channel(16);

        let err = controller
            .execute(&call_step(StepCommand::FastbootBootRecovery), &session, &events)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput { .. }));
    }

    #[cfg(unix)]
    mod with_stub_tools {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn write_stub(dir: &std::path::Path, name: &str, body: &str) {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        async fn collect(rx: &mut mpsc::Receiver<ExecutionEvent>) -> Vec<ExecutionEvent> {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                let done = matches!(event, ExecutionEvent::Finished(_));
                events.push(event);
                if done {
                    break;
                }
            }
            events
        }

        #[tokio::test]
        async fn test_execute_streams_output_then_finishes() {
            let bin = TempDir::new().unwrap();
            write_stub(bin.path(), "adb", "echo rebooting\nexit 0");
            let controller = quick_controller(bin.path().to_path_buf());
            let session = FlashSession::new();
            let (events, mut rx) = mpsc::channel(64);

            let ok = controller
                .execute(&call_step(StepCommand::AdbReboot), &session, &events)
                .await
                .unwrap();
            assert!(ok);

            let events = collect(&mut rx).await;
            assert_eq!(events.last(), Some(&ExecutionEvent::Finished(true)));
            assert!(events
                .iter()
                .any(|e| *e == ExecutionEvent::Output("rebooting".to_string())));
            // The explicit 100% comes only after terminal success
            assert!(events
                .iter()
                .any(|e| *e == ExecutionEvent::Progress(ProgressSignal::Determinate(100))));
        }

        #[tokio::test]
        async fn test_execute_reports_failure_and_allows_retry() {
            let bin = TempDir::new().unwrap();
            write_stub(bin.path(), "adb", "echo 'error: device not found' >&2\nexit 1");
            let controller = quick_controller(bin.path().to_path_buf());
            let session = FlashSession::new();

            for _ in 0..2 {
                let (events, mut rx) = mpsc::channel(64);
                let ok = controller
                    .execute(&call_step(StepCommand::AdbReboot), &session, &events)
                    .await
                    .unwrap();
                assert!(!ok);

                let events = collect(&mut rx).await;
                assert_eq!(events.last(), Some(&ExecutionEvent::Finished(false)));
                // No 100% on failure
                assert!(!events
                    .iter()
                    .any(|e| *e == ExecutionEvent::Progress(ProgressSignal::Determinate(100))));
            }
        }

        #[tokio::test]
        async fn test_sideload_substitutes_session_path_and_tracks_progress() {
            let bin = TempDir::new().unwrap();
            write_stub(
                bin.path(),
                "adb",
                "echo \"serving: '$2'  (~42%)\"\necho 'Total xfer: 1.00x'\nexit 0",
            );
            let controller = quick_controller(bin.path().to_path_buf());
            let mut session = FlashSession::new();
            session.image_path = Some(PathBuf::from("/tmp/os.zip"));
            let (events, mut rx) = mpsc::channel(64);

            let ok = controller
                .execute(&call_step(StepCommand::AdbSideload), &session, &events)
                .await
                .unwrap();
            assert!(ok);

            let events = collect(&mut rx).await;
            assert!(events
                .iter()
                .any(|e| *e == ExecutionEvent::Progress(ProgressSignal::Determinate(42))));
            assert!(events
                .iter()
                .any(|e| *e == ExecutionEvent::Progress(ProgressSignal::Determinate(99))));
            assert!(events
                .iter()
                .any(|e| matches!(e, ExecutionEvent::Output(line) if line.contains("/tmp/os.zip"))));
        }

        #[tokio::test]
        async fn test_install_addons_runs_each_addon_then_finishes() {
            let bin = TempDir::new().unwrap();
            let log = bin.path().join("calls.log");
            write_stub(
                bin.path(),
                "adb",
                &format!("echo \"adb $@\" >> {}\nexit 0", log.display()),
            );
            write_stub(
                bin.path(),
                "fastboot",
                &format!(
                    "echo \"fastboot $@\" >> {}\ncase \"$1\" in devices) printf 'SERIAL\\tfastboot\\n' ;; esac\nexit 0",
                    log.display()
                ),
            );
            let controller = quick_controller(bin.path().to_path_buf());
            let mut session = FlashSession::new();
            session.set_config(Some(test_config()));
            session.addon_paths = vec![PathBuf::from("/tmp/a.zip"), PathBuf::from("/tmp/b.zip")];
            let (events, _rx) = mpsc::channel(256);

            let ok = controller.install_addons(&session, &events).await.unwrap();
            assert!(ok);

            let calls = std::fs::read_to_string(&log).unwrap();
            assert!(calls.contains("adb sideload /tmp/a.zip"));
            assert!(calls.contains("adb sideload /tmp/b.zip"));
            // The a/b fixture device flips the active slot twice at the end
            assert_eq!(calls.matches("fastboot set_active other").count(), 2);
        }

        #[tokio::test]
        async fn test_install_addons_without_selection_is_an_error() {
            let bin = TempDir::new().unwrap();
            let controller = quick_controller(bin.path().to_path_buf());
            let mut session = FlashSession::new();
            session.set_config(Some(test_config()));
            let (events, _rx) = mpsc::channel(16);

            let err = controller.install_addons(&session, &events).await.unwrap_err();
            assert!(matches!(err, Error::MissingInput { .. }));
        }
    }
}

//! heimdall operations for Samsung devices in download mode

use std::path::Path;

use droidflash_core::prelude::*;

use crate::runner::{logged, path_arg, ToolRunner};
use crate::tool::Tool;

impl ToolRunner {
    /// Poll `heimdall detect` until the device shows up in download mode
    pub async fn heimdall_wait_for_download_mode(&self) -> bool {
        info!("Wait for the device to reach download mode");
        self.emit("Waiting for download mode...").await;
        for _ in 0..self.max_polls {
            let (_, ok) = self.capture(Tool::Heimdall, &["detect"]).await;
            if ok {
                info!("Download mode is available");
                return true;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        error!("Device did not reach download mode in time");
        false
    }

    /// Flash the custom recovery with heimdall
    ///
    /// `--no-reboot` keeps the device in download mode afterwards; rebooting
    /// straight into the stock OS would overwrite the freshly flashed
    /// recovery.
    pub async fn heimdall_flash_recovery(&self, recovery: &Path) -> bool {
        if !self.heimdall_wait_for_download_mode().await {
            return false;
        }
        let recovery = path_arg(recovery);
        logged(
            "Flash custom recovery with heimdall",
            self.stream(
                Tool::Heimdall,
                &["flash", "--no-reboot", "--RECOVERY", &recovery],
            ),
        )
        .await
    }
}

//! fastboot operations

use std::path::Path;

use droidflash_core::prelude::*;

use crate::runner::{logged, path_arg, ToolRunner};
use crate::tool::Tool;

impl ToolRunner {
    /// Unlock the bootloader (`fastboot flashing unlock`)
    pub async fn fastboot_unlock(&self) -> bool {
        logged(
            "Unlock the device with fastboot",
            self.stream(Tool::Fastboot, &["flashing", "unlock"]),
        )
        .await
    }

    /// Unlock the bootloader with a vendor-issued code
    pub async fn fastboot_unlock_with_code(&self, unlock_code: &str) -> bool {
        logged(
            "Unlock the device with fastboot and the vendor code",
            self.stream(Tool::Fastboot, &["oem", "unlock", unlock_code]),
        )
        .await
    }

    /// OEM unlock without a code
    pub async fn fastboot_oem_unlock(&self) -> bool {
        logged(
            "OEM unlock the device with fastboot",
            self.stream(Tool::Fastboot, &["oem", "unlock"]),
        )
        .await
    }

    /// Print the data needed to request an unlock code from the vendor
    pub async fn fastboot_get_unlock_data(&self) -> bool {
        logged(
            "Get the unlock data with fastboot",
            self.stream(Tool::Fastboot, &["oem", "get_unlock_data"]),
        )
        .await
    }

    /// Reboot the device with fastboot
    pub async fn fastboot_reboot(&self) -> bool {
        logged(
            "Reboot the device with fastboot",
            self.stream(Tool::Fastboot, &["reboot"]),
        )
        .await
    }

    /// Switch the active boot slot (`fastboot set_active other`)
    pub async fn fastboot_switch_partition(&self) -> bool {
        logged(
            "Switch the active boot slot with fastboot",
            self.stream(Tool::Fastboot, &["set_active", "other"]),
        )
        .await
    }

    /// Boot into the custom recovery and wait until adb can see it
    ///
    /// a/b devices boot the image transiently with `fastboot boot`;
    /// everything else gets it flashed to the recovery partition and is
    /// rebooted into it.
    pub async fn fastboot_boot_recovery(&self, recovery: &Path, is_ab: bool) -> bool {
        if is_ab {
            let recovery = path_arg(recovery);
            let ok = logged(
                "Boot custom recovery with fastboot",
                self.stream(Tool::Fastboot, &["boot", &recovery]),
            )
            .await;
            if !ok {
                return false;
            }
        } else if !self.fastboot_flash_recovery(recovery).await {
            return false;
        }
        self.adb_wait_for_recovery().await
    }

    /// Flash the recovery partition and reboot into it (non-a/b devices)
    pub async fn fastboot_flash_recovery(&self, recovery: &Path) -> bool {
        let recovery = path_arg(recovery);
        let ok = logged(
            "Flash custom recovery with fastboot",
            self.stream(Tool::Fastboot, &["flash", "recovery", &recovery]),
        )
        .await;
        if !ok {
            return false;
        }
        logged(
            "Boot into the custom recovery with fastboot",
            self.stream(Tool::Fastboot, &["reboot", "recovery"]),
        )
        .await
    }

    /// Flash the recovery image to the boot partition and reboot
    ///
    /// For devices without a dedicated recovery partition.
    pub async fn fastboot_flash_boot(&self, recovery: &Path) -> bool {
        let recovery = path_arg(recovery);
        let ok = logged(
            "Flash custom recovery to the boot partition with fastboot",
            self.stream(Tool::Fastboot, &["flash", "boot", &recovery]),
        )
        .await;
        if !ok {
            return false;
        }
        logged(
            "Boot into the custom recovery with fastboot",
            self.stream(Tool::Fastboot, &["reboot"]),
        )
        .await
    }

    /// Poll `fastboot devices` until the device shows up in the bootloader
    ///
    /// Bounded so a device that never comes back produces a retryable
    /// failure instead of hanging the session forever.
    pub async fn fastboot_wait_for_bootloader(&self) -> bool {
        info!("Wait for the device to reach the bootloader");
        self.emit("Waiting for the bootloader...").await;
        for _ in 0..self.max_polls {
            let (output, ok) = self.capture(Tool::Fastboot, &["devices"]).await;
            if ok && output.lines().any(|l| l.contains("fastboot")) {
                info!("Bootloader is available");
                return true;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        error!("Device did not reach the bootloader in time");
        false
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::test_support::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_wait_for_bootloader_sees_device() {
        let bin = TempDir::new().unwrap();
        write_stub(
            bin.path(),
            "fastboot",
            "case \"$1\" in devices) printf 'SERIAL\\tfastboot\\n' ;; esac\nexit 0",
        );
        let (runner, _rx) = test_runner(&bin);

        assert!(runner.fastboot_wait_for_bootloader().await);
    }

    #[tokio::test]
    async fn test_wait_for_bootloader_gives_up_when_absent() {
        let bin = TempDir::new().unwrap();
        // No device ever shows up; output stays empty
        write_stub(bin.path(), "fastboot", "exit 0");
        let (runner, _rx) = test_runner(&bin);

        // test_runner bounds the wait to three quick polls
        assert!(!runner.fastboot_wait_for_bootloader().await);
    }

    #[tokio::test]
    async fn test_boot_recovery_transient_on_ab() {
        let bin = TempDir::new().unwrap();
        let log = bin.path().join("calls.log");
        write_stub(
            bin.path(),
            "fastboot",
            &format!("echo \"fastboot $@\" >> {}\nexit 0", log.display()),
        );
        write_stub(
            bin.path(),
            "adb",
            &format!("echo \"adb $@\" >> {}\nexit 0", log.display()),
        );
        let (runner, _rx) = test_runner(&bin);

        assert!(
            runner
                .fastboot_boot_recovery(std::path::Path::new("/tmp/twrp.img"), true)
                .await
        );

        let calls: Vec<String> = std::fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(
            calls,
            vec!["fastboot boot /tmp/twrp.img", "adb wait-for-recovery"]
        );
    }

    #[tokio::test]
    async fn test_boot_recovery_flashes_on_non_ab() {
        let bin = TempDir::new().unwrap();
        let log = bin.path().join("calls.log");
        write_stub(
            bin.path(),
            "fastboot",
            &format!("echo \"fastboot $@\" >> {}\nexit 0", log.display()),
        );
        write_stub(
            bin.path(),
            "adb",
            &format!("echo \"adb $@\" >> {}\nexit 0", log.display()),
        );
        let (runner, _rx) = test_runner(&bin);

        assert!(
            runner
                .fastboot_boot_recovery(std::path::Path::new("/tmp/twrp.img"), false)
                .await
        );

        let calls: Vec<String> = std::fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(
            calls,
            vec![
                "fastboot flash recovery /tmp/twrp.img",
                "fastboot reboot recovery",
                "adb wait-for-recovery",
            ]
        );
    }

    #[tokio::test]
    async fn test_flash_boot_short_circuits_on_flash_failure() {
        let bin = TempDir::new().unwrap();
        let log = bin.path().join("calls.log");
        write_stub(
            bin.path(),
            "fastboot",
            &format!(
                "echo \"fastboot $@\" >> {}\ncase \"$*\" in \"flash boot\"*) exit 1 ;; esac\nexit 0",
                log.display()
            ),
        );
        let (runner, _rx) = test_runner(&bin);

        assert!(
            !runner
                .fastboot_flash_boot(std::path::Path::new("/tmp/twrp.img"))
                .await
        );

        let calls: Vec<String> = std::fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        // The reboot stage never runs after the flash fails
        assert_eq!(calls, vec!["fastboot flash boot /tmp/twrp.img"]);
    }
}

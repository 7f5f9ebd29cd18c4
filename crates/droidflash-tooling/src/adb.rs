//! adb operations, including the TWRP multi-stage pipelines

use std::path::Path;

use droidflash_core::prelude::*;

use crate::runner::{logged, path_arg, ToolRunner};
use crate::tool::Tool;

/// Sideloaded on some devices before flashing to keep both slots consistent
const COPY_PARTITIONS_SCRIPT: &str = "copy-partitions-20220613-signed.zip";

/// Small filler payload for the post-install wipe fallback
const SIDELOAD_FALLBACK_FILE: &str = "helper.txt";

impl ToolRunner {
    /// Reboot the device into the running OS
    pub async fn adb_reboot(&self) -> bool {
        logged(
            "Reboot the device with adb",
            self.stream(Tool::Adb, &["reboot"]),
        )
        .await
    }

    /// Reboot into the bootloader and wait until fastboot can see the device
    pub async fn adb_reboot_bootloader(&self) -> bool {
        let ok = logged(
            "Reboot the device into bootloader with adb",
            self.stream(Tool::Adb, &["reboot", "bootloader"]),
        )
        .await;
        if !ok {
            return false;
        }
        self.pause(1).await;
        self.fastboot_wait_for_bootloader().await
    }

    /// Reboot into the download mode of Samsung devices
    pub async fn adb_reboot_download(&self) -> bool {
        logged(
            "Reboot the device into download mode with adb",
            self.stream(Tool::Adb, &["reboot", "download"]),
        )
        .await
    }

    /// Sideload a package to the device
    pub async fn adb_sideload(&self, target: &Path) -> bool {
        let target = path_arg(target);
        logged(
            "Sideload the package with adb",
            self.stream(Tool::Adb, &["sideload", &target]),
        )
        .await
    }

    /// Block until the device is visible in recovery
    pub async fn adb_wait_for_recovery(&self) -> bool {
        logged(
            "Wait for the device to reach recovery",
            self.stream(Tool::Adb, &["wait-for-recovery"]),
        )
        .await
    }

    /// Block until the device accepts a sideload connection
    pub async fn adb_wait_for_sideload(&self) -> bool {
        logged(
            "Wait for the device to accept sideload",
            self.stream(Tool::Adb, &["wait-for-sideload"]),
        )
        .await
    }

    /// Put TWRP into sideload mode and wait until it is ready
    pub async fn activate_sideload(&self) -> bool {
        let ok = logged(
            "Activate sideload mode in TWRP",
            self.stream(Tool::Adb, &["shell", "twrp", "sideload"]),
        )
        .await;
        if !ok {
            return false;
        }
        self.adb_wait_for_sideload().await
    }

    async fn adb_twrp_format_data(&self) -> bool {
        logged(
            "Perform a factory reset with TWRP",
            self.stream(Tool::Adb, &["shell", "twrp", "format", "data"]),
        )
        .await
    }

    async fn adb_twrp_wipe_partition(&self, partition: &str) -> bool {
        logged(
            &format!("Wipe the {partition} partition with TWRP"),
            self.stream(Tool::Adb, &["shell", "twrp", "wipe", partition]),
        )
        .await
    }

    /// Wipe and format data with TWRP, then sideload the OS image
    ///
    /// Stages: wait for recovery, factory reset, wipe cache and system,
    /// sideload the image, wipe dalvik and cache again, then reboot either to
    /// the bootloader (a/b devices that install addons next) or into the new
    /// OS. Only works with a TWRP recovery.
    pub async fn adb_twrp_wipe_and_install(
        &self,
        target: &Path,
        is_ab: bool,
        install_addons: bool,
        recovery: Option<&Path>,
    ) -> bool {
        info!("Wipe and format data with TWRP, then install the OS image");
        if !self.adb_wait_for_recovery().await {
            return false;
        }
        self.pause(7).await;

        if !self.adb_twrp_format_data().await {
            return false;
        }
        self.pause(1).await;

        for partition in ["cache", "system"] {
            if !self.adb_twrp_wipe_partition(partition).await {
                return false;
            }
            self.pause(1).await;
        }

        info!("Wiping is done, now activate sideload");
        if !self.activate_sideload().await {
            return false;
        }

        self.pause(5).await;
        info!("Sideload and install the OS image");
        if !self.adb_sideload(target).await {
            return false;
        }
        self.pause(7).await;

        for partition in ["dalvik", "cache"] {
            if !self.adb_twrp_wipe_partition(partition).await {
                // This wipe is known to report failure without having failed;
                // sideloading a small filler payload gets TWRP unstuck.
                warn!("Wiping {partition} reported failure, trying the sideload fallback");
                if !self.adb_sideload(&self.asset(SIDELOAD_FALLBACK_FILE)).await {
                    return false;
                }
                break;
            }
            self.pause(2).await;
        }

        self.pause(7).await;
        if install_addons {
            if is_ab {
                // Addons are sideloaded from recovery; a/b devices have to be
                // routed back through the bootloader into TWRP first.
                if !self.adb_reboot_bootloader().await {
                    return false;
                }
                self.pause(3).await;
                let Some(recovery) = recovery else {
                    error!("No recovery image available to re-boot for the addon install");
                    return false;
                };
                if !self.fastboot_boot_recovery(recovery, true).await {
                    return false;
                }
                self.pause(7).await;
            }
            // Non-a/b devices just stay in TWRP for the addon install
            true
        } else {
            self.adb_reboot().await
        }
    }

    /// Sideload the copy-partitions script and return to the bootloader
    ///
    /// Some devices hard-brick when the inactive slot holds stale firmware;
    /// the script copies the active slot over before anything is flashed.
    pub async fn adb_twrp_copy_partitions(&self) -> bool {
        info!("Sideload the copy-partitions script with adb");
        if !self.activate_sideload().await {
            return false;
        }
        self.pause(5).await;
        if !self.adb_sideload(&self.asset(COPY_PARTITIONS_SCRIPT)).await {
            return false;
        }
        self.pause(10).await;
        let ok = self.adb_reboot_bootloader().await;
        self.pause(7).await;
        ok
    }

    /// Sideload one addon package through TWRP
    pub async fn adb_twrp_install_addon(&self, addon: &Path) -> bool {
        info!("Sideload and install an addon package");
        if !self.activate_sideload().await {
            return false;
        }
        self.pause(5).await;
        if !self.adb_sideload(addon).await {
            return false;
        }
        self.pause(7).await;
        true
    }

    /// Reboot into the OS once every addon is installed
    pub async fn adb_twrp_finish_install_addons(&self, is_ab: bool) -> bool {
        if !is_ab {
            return self.adb_reboot().await;
        }
        if !self.adb_reboot_bootloader().await {
            return false;
        }
        self.pause(3).await;
        // Switch the active slot twice: the OS install already switched slots
        // once, so a single flip here would leave the wrong slot active.
        if !self.fastboot_switch_partition().await {
            return false;
        }
        self.pause(1).await;
        if !self.fastboot_switch_partition().await {
            return false;
        }
        self.pause(1).await;
        info!("Reboot into the new OS");
        self.fastboot_reboot().await
    }
}

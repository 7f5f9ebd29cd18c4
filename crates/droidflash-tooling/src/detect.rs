//! Device detection probes over USB

use droidflash_core::prelude::*;

use crate::runner::ToolRunner;
use crate::tool::Tool;

impl ToolRunner {
    /// Read the vendor device code of the connected device
    ///
    /// Returns `None` when no device responds; that is a user-facing
    /// "reconnect and try again" condition, not an error.
    pub async fn search_device(&self) -> Option<String> {
        info!("Search for a connected device");
        let (output, ok) = self
            .capture(Tool::Adb, &["shell", "getprop", "ro.product.device"])
            .await;
        if !ok {
            error!("Failed to detect a device");
            return None;
        }
        let device_code = output.trim().to_string();
        if device_code.is_empty() {
            error!("Failed to detect a device");
            None
        } else {
            info!("Detected device code '{device_code}'");
            Some(device_code)
        }
    }

    /// Probe whether the connected device uses a/b partitioning
    pub async fn is_ab_device(&self) -> bool {
        let (output, ok) = self
            .capture(Tool::Adb, &["shell", "getprop", "ro.boot.slot_suffix"])
            .await;
        let is_ab = ok && !output.trim().is_empty();
        if is_ab {
            info!("This is an a/b-partitioned device");
        } else {
            info!("This is not an a/b-partitioned device");
        }
        is_ab
    }
}

#[cfg(all(test, unix))]
mod tests {
    use crate::runner::test_support::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_search_device_reads_device_code() {
        let bin = TempDir::new().unwrap();
        write_stub(bin.path(), "adb", "echo sargo");
        let (runner, _rx) = test_runner(&bin);

        assert_eq!(runner.search_device().await.as_deref(), Some("sargo"));
    }

    #[tokio::test]
    async fn test_search_device_none_when_probe_fails() {
        let bin = TempDir::new().unwrap();
        write_stub(bin.path(), "adb", "echo 'error: no devices found' >&2\nexit 1");
        let (runner, _rx) = test_runner(&bin);

        assert!(runner.search_device().await.is_none());
    }

    #[tokio::test]
    async fn test_search_device_none_when_output_empty() {
        let bin = TempDir::new().unwrap();
        write_stub(bin.path(), "adb", "exit 0");
        let (runner, _rx) = test_runner(&bin);

        assert!(runner.search_device().await.is_none());
    }

    #[tokio::test]
    async fn test_is_ab_device_on_slot_suffix() {
        let bin = TempDir::new().unwrap();
        write_stub(bin.path(), "adb", "echo _a");
        let (runner, _rx) = test_runner(&bin);
        assert!(runner.is_ab_device().await);
    }

    #[tokio::test]
    async fn test_is_ab_device_false_without_slot_suffix() {
        let bin = TempDir::new().unwrap();
        write_stub(bin.path(), "adb", "exit 0");
        let (runner, _rx) = test_runner(&bin);
        assert!(!runner.is_ab_device().await);
    }
}

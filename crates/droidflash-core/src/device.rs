//! Device definition model
//!
//! One [`DeviceConfig`] describes everything the installer needs to know about
//! a supported device: its metadata, the display-only requirements, and the
//! two step sequences (unlock the bootloader, boot a custom recovery).

use serde::{Deserialize, Serialize};

use crate::step::StepDefinition;

/// Additional partition images some devices need flashed alongside recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraPartition {
    Dtbo,
    Vbmeta,
    VendorBoot,
    SuperEmpty,
}

/// Required Android version, either numeric (`12`) or free text (`"11 or 12"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AndroidVersion {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for AndroidVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AndroidVersion::Number(n) => write!(f, "{n}"),
            AndroidVersion::Text(s) => f.write_str(s),
        }
    }
}

/// Display-only prerequisites; shown for confirmation, never enforced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirements {
    #[serde(default)]
    pub android: Option<AndroidVersion>,

    #[serde(default)]
    pub firmware: Option<String>,
}

/// The `metadata` section of a device definition document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceMetadata {
    /// Who maintains this definition
    pub maintainer: String,

    /// Human-readable device name (e.g. "Google Pixel 3a")
    pub device_name: String,

    /// Canonical vendor device code (e.g. "sargo")
    pub device_code: String,

    /// Every device code this definition applies to
    pub supported_device_codes: Vec<String>,

    /// Whether the device uses seamless (a/b) partitioning
    pub is_ab_device: bool,

    /// TWRP download slug for this device, if one exists
    #[serde(rename = "twrp-link", default, skip_serializing_if = "Option::is_none")]
    pub twrp_link: Option<String>,

    /// Additional partition images the user must provide
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_steps: Vec<ExtraPartition>,

    /// Free-text notes from the maintainer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// The full declarative definition for one supported device
///
/// Loaded once per detected device, held for the lifetime of a flashing
/// session. The step sequences here are canonical: the session always works
/// on copies.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub metadata: DeviceMetadata,
    pub requirements: Option<Requirements>,

    /// Steps to unlock the bootloader; empty when the document sets the
    /// section to null (devices that ship unlocked)
    pub unlock_bootloader: Vec<StepDefinition>,

    /// Steps to boot a custom recovery
    pub boot_recovery: Vec<StepDefinition>,
}

impl DeviceConfig {
    pub fn device_code(&self) -> &str {
        &self.metadata.device_code
    }

    pub fn is_ab(&self) -> bool {
        self.metadata.is_ab_device
    }

    /// Whether `device_code` is one of the codes this definition supports
    pub fn supports(&self, device_code: &str) -> bool {
        self.metadata
            .supported_device_codes
            .iter()
            .any(|c| c == device_code)
    }
}

//! Device definition discovery and loading
//!
//! Definition documents are YAML files, one per device family. Resolution
//! scans a directory tree for the document whose
//! `metadata.supported_device_codes` contains the detected device code; a
//! same-shaped document in the process's working directory acts as a
//! developer override and takes priority over the bundled assets.
//!
//! Parsing fails closed: any schema violation (unknown step kind, a command
//! outside the whitelist, missing metadata keys, a command on a step kind
//! that takes none) is logged and the definition is treated as not found. A
//! malformed document must never take the wizard into undefined territory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::device::{DeviceConfig, DeviceMetadata, Requirements};
use crate::error::{Error, Result};
use crate::prelude::*;
use crate::step::{StepCommand, StepDefinition, StepKind};

/// Section title given to steps under `steps.unlock_bootloader`
pub const UNLOCK_BOOTLOADER_TITLE: &str = "Unlock the bootloader";

/// Section title given to steps under `steps.boot_recovery`
pub const BOOT_RECOVERY_TITLE: &str = "Boot custom recovery";

// ─────────────────────────────────────────────────────────────────────────────
// Raw document shape
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    metadata: DeviceMetadata,

    #[serde(default)]
    requirements: Option<Requirements>,

    steps: RawSteps,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSteps {
    /// May be null for devices that ship with an unlocked bootloader
    #[serde(default)]
    unlock_bootloader: Option<Vec<RawStep>>,

    boot_recovery: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    #[serde(rename = "type")]
    kind: StepKind,

    content: String,

    #[serde(default)]
    command: Option<StepCommand>,

    #[serde(default)]
    allow_skip: bool,

    #[serde(default)]
    img: Option<String>,

    #[serde(default)]
    link: Option<String>,

    /// Explicit title override; steps normally inherit their section title
    #[serde(default)]
    title: Option<String>,
}

impl RawStep {
    fn into_step(self, section_title: &str, path: &Path) -> Result<StepDefinition> {
        if self.kind.requires_command() && self.command.is_none() {
            return Err(Error::config_invalid(
                path,
                format!("a '{:?}' step must name a command", self.kind),
            ));
        }
        if !self.kind.requires_command() {
            if let Some(command) = self.command {
                return Err(Error::config_invalid(
                    path,
                    format!(
                        "step kind '{:?}' takes no command, but '{command}' is set",
                        self.kind
                    ),
                ));
            }
        }
        Ok(StepDefinition {
            title: self.title.unwrap_or_else(|| section_title.to_string()),
            kind: self.kind,
            content: self.content,
            command: self.command,
            allow_skip: self.allow_skip,
            image: self.img,
            link: self.link,
        })
    }
}

/// Minimal shape used during discovery; tolerates otherwise-invalid documents
/// so a broken file cannot abort the directory scan.
#[derive(Debug, Default, Deserialize)]
struct PeekDocument {
    #[serde(default)]
    metadata: PeekMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct PeekMetadata {
    #[serde(default)]
    supported_device_codes: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────────────────

impl DeviceConfig {
    /// Parse and validate a definition document from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, path)
    }

    /// Parse and validate a definition document from its text
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(text)
            .map_err(|e| Error::config_invalid(path, e.to_string()))?;

        let unlock_bootloader = raw
            .steps
            .unlock_bootloader
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.into_step(UNLOCK_BOOTLOADER_TITLE, path))
            .collect::<Result<Vec<_>>>()?;

        let boot_recovery = raw
            .steps
            .boot_recovery
            .into_iter()
            .map(|s| s.into_step(BOOT_RECOVERY_TITLE, path))
            .collect::<Result<Vec<_>>>()?;

        Ok(DeviceConfig {
            metadata: raw.metadata,
            requirements: raw.requirements,
            unlock_bootloader,
            boot_recovery,
        })
    }
}

/// Collect every `*.yaml` document under `dir`, recursively, in a stable order
pub fn scan_documents(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    collect_yaml_files(dir, &mut found);
    found.sort();
    found
}

fn collect_yaml_files(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        debug!("Cannot read directory {}", dir.display());
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_yaml_files(&path, found);
        } else if path.extension().is_some_and(|ext| ext == "yaml") {
            found.push(path);
        }
    }
}

/// Find the document in `dir` whose supported device codes contain
/// `device_code`. First match (in scan order) wins.
fn find_document(device_code: &str, dir: &Path) -> Option<PathBuf> {
    for path in scan_documents(dir) {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(peek) = serde_yaml::from_str::<PeekDocument>(&text) else {
            debug!("Skipping unreadable document {}", path.display());
            continue;
        };
        if peek
            .metadata
            .supported_device_codes
            .iter()
            .any(|c| c == device_code)
        {
            info!(
                "Device code '{}' is supported by document '{}'",
                device_code,
                path.display()
            );
            return Some(path);
        }
    }
    None
}

/// Resolve a device code to its definition
///
/// Search order: a document in the process's current working directory
/// (developer override) first, then the bundled assets directory. Returns
/// `None` when no document matches or the matching document fails validation;
/// validation errors are logged, never propagated.
pub fn load_config(device_code: &str, assets_dir: &Path) -> Option<DeviceConfig> {
    let override_dir = std::env::current_dir().ok();
    load_config_with_override(device_code, assets_dir, override_dir.as_deref())
}

/// Like [`load_config`], with an explicit override directory
pub fn load_config_with_override(
    device_code: &str,
    assets_dir: &Path,
    override_dir: Option<&Path>,
) -> Option<DeviceConfig> {
    if let Some(path) = override_dir.and_then(|dir| find_override_document(device_code, dir)) {
        info!("Loading custom device definition from {}", path.display());
        return load_checked(&path);
    }

    match find_document(device_code, assets_dir) {
        Some(path) => {
            info!("Loading device definition from {}", path.display());
            load_checked(&path)
        }
        None => {
            info!("No device definition found for device code '{device_code}'");
            None
        }
    }
}

/// Override documents live flat in the override directory, not in subtrees
fn find_override_document(device_code: &str, dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    candidates.sort();

    candidates.into_iter().find(|path| {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_yaml::from_str::<PeekDocument>(&text).ok())
            .is_some_and(|peek| {
                peek.metadata
                    .supported_device_codes
                    .iter()
                    .any(|c| c == device_code)
            })
    })
}

fn load_checked(path: &Path) -> Option<DeviceConfig> {
    match DeviceConfig::from_file(path) {
        Ok(config) => {
            info!(
                "Loaded definition for '{}' ({})",
                config.metadata.device_code, config.metadata.device_name
            );
            Some(config)
        }
        Err(e) => {
            error!("Validation of definition at {} failed: {e}", path.display());
            None
        }
    }
}

//! CurseForge modpack manifest
//!
//! This module handles the `manifest.json` format found at the root of a
//! CurseForge modpack export and the archive it is read from.

pub mod loader;

pub use loader::{LoadedModpack, ManifestLoader, ModpackArchive, MANIFEST_ENTRY};

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// Override subtree used when the manifest does not name one
pub const DEFAULT_OVERRIDES: &str = "overrides";

/// Decoded `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub minecraft: Minecraft,
    #[serde(rename = "manifestType")]
    pub manifest_type: String,
    #[serde(rename = "manifestVersion")]
    pub manifest_version: u32,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    pub files: Vec<ModReference>,
    #[serde(default = "default_overrides")]
    pub overrides: String,
}

/// Target platform block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minecraft {
    pub version: String,
    #[serde(rename = "modLoaders", default)]
    pub mod_loaders: Vec<ModLoader>,
    #[serde(rename = "recommendedRam", default, skip_serializing_if = "Option::is_none")]
    pub recommended_ram: Option<u32>,
}

/// Mod loader entry, e.g. `forge-47.2.0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModLoader {
    pub id: String,
    #[serde(default)]
    pub primary: bool,
}

/// A single remote mod file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModReference {
    #[serde(rename = "projectID")]
    pub project_id: u32,
    #[serde(rename = "fileID")]
    pub file_id: u32,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_overrides() -> String {
    DEFAULT_OVERRIDES.to_string()
}

fn default_required() -> bool {
    true
}

impl ModReference {
    pub fn new(project_id: u32, file_id: u32) -> Self {
        Self {
            project_id,
            file_id,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

impl std::fmt::Display for ModReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "project {} file {}", self.project_id, self.file_id)
    }
}

impl Manifest {
    /// Check the invariants serde cannot express
    ///
    /// Returns the reason for the first violation found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("modpack name is empty".to_string());
        }

        if self.minecraft.version.trim().is_empty() {
            return Err("minecraft.version is empty".to_string());
        }

        for (index, file) in self.files.iter().enumerate() {
            if file.project_id == 0 {
                return Err(format!("files[{index}].projectID must be greater than zero"));
            }
            if file.file_id == 0 {
                return Err(format!("files[{index}].fileID must be greater than zero"));
            }
        }

        let overrides = Path::new(&self.overrides);
        let escapes = overrides
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(format!("overrides path '{}' must stay inside the archive", self.overrides));
        }

        Ok(())
    }

    /// Loader flagged primary, falling back to the first listed
    pub fn primary_loader(&self) -> Option<&ModLoader> {
        self.minecraft
            .mod_loaders
            .iter()
            .find(|l| l.primary)
            .or_else(|| self.minecraft.mod_loaders.first())
    }

    /// Root segment of the override subtree inside the archive
    pub fn overrides_root(&self) -> &str {
        let trimmed = self.overrides.trim_matches('/');
        if trimmed.is_empty() { DEFAULT_OVERRIDES } else { trimmed }
    }

    pub fn required_count(&self) -> usize {
        self.files.iter().filter(|f| f.required).count()
    }

    /// One-line summary used by verify
    pub fn summary_line(&self) -> String {
        format!("Info: {} - {}", self.name, self.version)
    }

    /// Multi-line description of the pack
    pub fn describe(&self) -> String {
        let loader = self
            .primary_loader()
            .map(|l| l.id.as_str())
            .unwrap_or("none");
        let mut out = String::new();
        out.push_str(&format!("Name: {}\n", self.name));
        out.push_str(&format!("Version: {}\n", self.version));
        out.push_str(&format!("Author: {}\n", self.author));
        out.push_str(&format!("Minecraft: {}\n", self.minecraft.version));
        out.push_str(&format!("Mod loader: {}\n", loader));
        if let Some(ram) = self.minecraft.recommended_ram {
            out.push_str(&format!("Recommended RAM: {} MB\n", ram));
        }
        out.push_str(&format!(
            "Mods: {} ({} required)\n",
            self.files.len(),
            self.required_count()
        ));
        out.push_str(&format!("Overrides: {}", self.overrides_root()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "minecraft": {
                "version": "1.20.1",
                "modLoaders": [
                    { "id": "forge-47.2.0", "primary": true }
                ]
            },
            "manifestType": "minecraftModpack",
            "manifestVersion": 1,
            "name": "Test Pack",
            "version": "1.0.0",
            "author": "someone",
            "files": [
                { "projectID": 10, "fileID": 100, "required": true },
                { "projectID": 20, "fileID": 200, "required": false }
            ],
            "overrides": "overrides"
        }"#
    }

    #[test]
    fn test_decode_manifest() {
        let manifest: Manifest = serde_json::from_str(sample_json()).unwrap();

        assert_eq!(manifest.name, "Test Pack");
        assert_eq!(manifest.minecraft.version, "1.20.1");
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0], ModReference::new(10, 100));
        assert!(!manifest.files[1].required);
        assert_eq!(manifest.primary_loader().unwrap().id, "forge-47.2.0");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let json = r#"{
            "minecraft": { "version": "1.19.2" },
            "manifestType": "minecraftModpack",
            "manifestVersion": 1,
            "name": "Bare",
            "files": [ { "projectID": 1, "fileID": 2 } ]
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();

        assert_eq!(manifest.overrides_root(), DEFAULT_OVERRIDES);
        assert!(manifest.files[0].required);
        assert_eq!(manifest.author, "");
        assert!(manifest.primary_loader().is_none());
    }

    #[test]
    fn test_missing_required_field_fails_decode() {
        let json = r#"{ "minecraft": { "version": "1.20.1" }, "name": "x" }"#;
        assert!(serde_json::from_str::<Manifest>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ids() {
        let mut manifest: Manifest = serde_json::from_str(sample_json()).unwrap();
        manifest.files.push(ModReference::new(0, 5));

        let reason = manifest.validate().unwrap_err();
        assert!(reason.contains("projectID"));
    }

    #[test]
    fn test_validate_rejects_escaping_overrides() {
        let mut manifest: Manifest = serde_json::from_str(sample_json()).unwrap();
        manifest.overrides = "../outside".to_string();

        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_summary_and_describe() {
        let manifest: Manifest = serde_json::from_str(sample_json()).unwrap();

        assert_eq!(manifest.summary_line(), "Info: Test Pack - 1.0.0");
        let description = manifest.describe();
        assert!(description.contains("Mods: 2 (1 required)"));
        assert!(description.contains("Mod loader: forge-47.2.0"));
    }
}

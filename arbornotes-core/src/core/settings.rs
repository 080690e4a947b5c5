//! Tree settings persistence.
//!
//! Stores the numbering policy and new-node defaults in a JSON file at an
//! OS-appropriate location.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{ContentKind, Result, SequencePolicy};

/// Persisted tree settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TreeSettings {
    /// First sequence number assigned at every tree level.
    pub sequence_base: u32,
    /// Gap between consecutive sibling sequence numbers.
    pub sequence_step: u32,
    /// Name given to nodes created without one.
    pub default_node_name: String,
    /// Content kind of new nodes; follows the last kind the user picked.
    pub default_content_kind: ContentKind,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            sequence_base: 1,
            sequence_step: 1,
            default_node_name: "New Node".to_string(),
            default_content_kind: ContentKind::RichText,
        }
    }
}

impl TreeSettings {
    /// The renumbering policy these settings describe. A zero step is
    /// treated as one so that siblings never share a number.
    pub fn sequence_policy(&self) -> SequencePolicy {
        SequencePolicy {
            base: self.sequence_base,
            step: self.sequence_step.max(1),
        }
    }
}

/// Location of `settings.json` under the platform config directory
/// (`~/.config/arbornotes` on Linux, `~/Library/Application Support/arbornotes`
/// on macOS, `%APPDATA%\arbornotes` on Windows). Falls back to the working
/// directory when the platform has none.
pub fn settings_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arbornotes")
        .join("settings.json")
}

/// Loads settings from `path`.
///
/// A missing file yields the defaults, and so does a file that is not valid
/// settings JSON (with a warning).
///
/// # Errors
///
/// Returns [`crate::ArbornotesError::Io`] for any other read failure.
pub fn load_settings(path: &Path) -> Result<TreeSettings> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring corrupt settings file {}: {e}", path.display());
            TreeSettings::default()
        })),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(TreeSettings::default()),
        Err(e) => Err(e.into()),
    }
}

/// Saves settings to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`crate::ArbornotesError::Io`] if the directory or file cannot be
/// written.
pub fn save_settings(path: &Path, settings: &TreeSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

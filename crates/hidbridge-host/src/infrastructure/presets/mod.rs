//! Preset existence resolution.
//!
//! Preset enumeration, selection, and content fingerprinting all happen on
//! the device side; the host only has to answer one question during
//! handshake validation: does the named preset exist here? A preset is a
//! plain file in the configured directory, `<name>.ini` or `<name>.json`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::session::PresetRegistry;

/// Extensions a preset file may carry, checked in order.
const PRESET_EXTENSIONS: &[&str] = &["ini", "json"];

/// Resolves presets against a single directory.
pub struct DirectoryPresetRegistry {
    root: PathBuf,
}

impl DirectoryPresetRegistry {
    /// Creates a registry over `root`. The directory does not need to exist
    /// yet; resolution simply fails until it does.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory this registry resolves against.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PresetRegistry for DirectoryPresetRegistry {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        // Preset names are bare identifiers; anything that could escape the
        // preset directory never resolves.
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            debug!("rejecting preset name {name:?}");
            return None;
        }
        for ext in PRESET_EXTENSIONS {
            let candidate = self.root.join(format!("{name}.{ext}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        debug!("preset {name:?} not found under {}", self.root.display());
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_preset_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hidbridge-presets-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_resolves_ini_preset() {
        let dir = temp_preset_dir();
        std::fs::write(dir.join("p1.ini"), "[aim]\n").unwrap();
        let registry = DirectoryPresetRegistry::new(&dir);

        let resolved = registry.resolve("p1");

        assert_eq!(resolved, Some(dir.join("p1.ini")));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_resolves_json_preset_when_no_ini() {
        let dir = temp_preset_dir();
        std::fs::write(dir.join("p2.json"), "{}\n").unwrap();
        let registry = DirectoryPresetRegistry::new(&dir);

        let resolved = registry.resolve("p2");

        assert_eq!(resolved, Some(dir.join("p2.json")));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_ini_wins_over_json() {
        let dir = temp_preset_dir();
        std::fs::write(dir.join("p3.ini"), "").unwrap();
        std::fs::write(dir.join("p3.json"), "{}").unwrap();
        let registry = DirectoryPresetRegistry::new(&dir);

        assert_eq!(registry.resolve("p3"), Some(dir.join("p3.ini")));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_preset_does_not_resolve() {
        let dir = temp_preset_dir();
        let registry = DirectoryPresetRegistry::new(&dir);

        assert_eq!(registry.resolve("nope"), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_directory_does_not_resolve() {
        let registry = DirectoryPresetRegistry::new("/nonexistent/hidbridge-presets");
        assert_eq!(registry.resolve("p1"), None);
    }

    #[test]
    fn test_traversal_names_never_resolve() {
        let dir = temp_preset_dir();
        std::fs::write(dir.join("real.ini"), "").unwrap();
        let registry = DirectoryPresetRegistry::new(&dir);

        assert_eq!(registry.resolve("../real"), None);
        assert_eq!(registry.resolve("sub/real"), None);
        assert_eq!(registry.resolve(""), None);
        std::fs::remove_dir_all(&dir).ok();
    }
}

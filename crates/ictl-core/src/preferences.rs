//! Last-selected organization and project, stored in `config.yaml`.

use crate::error::Result;
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_project: Option<String>,
}

impl Preferences {
    /// Load from `<dir>/config.yaml`. A missing or empty file yields defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = paths::preferences_path(dir);
        match io::read_optional(&path)? {
            Some(content) if !content.trim().is_empty() => Ok(serde_yaml::from_str(&content)?),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::preferences_path(dir), content.as_bytes())
    }

    /// Select an organization. The project belongs to the old organization,
    /// so it is cleared.
    pub fn select_organization(&mut self, name: impl Into<String>) {
        self.selected_organization = Some(name.into());
        self.selected_project = None;
    }

    pub fn select_project(&mut self, name: impl Into<String>) {
        self.selected_project = Some(name.into());
    }

    pub fn organization(&self) -> Option<&str> {
        non_blank(self.selected_organization.as_deref())
    }

    pub fn project(&self) -> Option<&str> {
        non_blank(self.selected_project.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Preferences::load(dir.path()).unwrap(), Preferences::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut prefs = Preferences::default();
        prefs.select_organization("acme");
        prefs.select_project("web");
        prefs.save(dir.path()).unwrap();

        let loaded = Preferences::load(dir.path()).unwrap();
        assert_eq!(loaded.organization(), Some("acme"));
        assert_eq!(loaded.project(), Some("web"));
    }

    #[test]
    fn selecting_organization_clears_project() {
        let mut prefs = Preferences::default();
        prefs.select_organization("acme");
        prefs.select_project("web");
        prefs.select_organization("globex");
        assert_eq!(prefs.organization(), Some("globex"));
        assert_eq!(prefs.project(), None);
    }

    #[test]
    fn unset_fields_are_not_serialized() {
        let mut prefs = Preferences::default();
        prefs.select_organization("acme");
        let yaml = serde_yaml::to_string(&prefs).unwrap();
        assert!(yaml.contains("selected_organization: acme"));
        assert!(!yaml.contains("selected_project"));
    }

    #[test]
    fn blank_selection_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            paths::preferences_path(dir.path()),
            "selected_organization: '  '\n",
        )
        .unwrap();
        let prefs = Preferences::load(dir.path()).unwrap();
        assert_eq!(prefs.organization(), None);
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ConfigError;

pub const SETTINGS_FILE_NAME: &str = ".searchsync.toml";

/// Contents of `.searchsync.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Search configuration document (XML)
    #[serde(default)]
    pub document: Option<PathBuf>,
    /// JSON snapshot of the search service state
    #[serde(default)]
    pub state: Option<PathBuf>,
    /// Site collection URL substituted for `{sitecollection}`
    #[serde(default)]
    pub site_url: Option<String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings.resolve_relative_to(path.parent().unwrap_or(Path::new("."))))
    }

    /// Loads `.searchsync.toml` from `dir`, or defaults if there is none.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(SETTINGS_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    fn resolve_relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.document = self.document.map(resolve);
        self.state = self.state.map(resolve);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
document = "search.xml"
state = "state.json"
site_url = "http://portal/"
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.document, Some(PathBuf::from("search.xml")));
        assert_eq!(settings.state, Some(PathBuf::from("state.json")));
        assert_eq!(settings.site_url.as_deref(), Some("http://portal/"));
    }

    #[test]
    fn test_all_settings_are_optional() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_resolves_paths_against_settings_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            "document = \"search.xml\"\nstate = \"/abs/state.json\"\n",
        )
        .unwrap();

        let settings = Settings::load_from_dir(dir.path()).unwrap();
        assert_eq!(settings.document, Some(dir.path().join("search.xml")));
        assert_eq!(settings.state, Some(PathBuf::from("/abs/state.json")));
    }

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from_dir(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }
}

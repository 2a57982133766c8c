use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

pub const TRIGGER_PERMISSION: &str = "task.trigger";

fn default_base_url() -> String {
    "http://localhost:7007".to_string()
}

/// Tool configuration, read once at startup. The plugin list is static: the
/// view never discovers plugins from the scheduler itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub base_url: String,
    pub plugins: Vec<String>,
    pub permissions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: default_base_url(),
            plugins: Vec::new(),
            permissions: Vec::new(),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("SCHEDVIEW_CONFIG") {
            return PathBuf::from(path);
        }
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home_dir).join(".schedview.json")
    }

    /// Load from the given path (or the default location). A missing file is
    /// not an error: it yields the default config, whose empty plugin list
    /// routes the UI to the configuration-guidance notice.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(Config::default_path);

        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Config::default()
        };

        if let Ok(base_url) = std::env::var("SCHEDVIEW_BASE_URL") {
            config.base_url = base_url;
        }

        Ok(config)
    }

    pub fn can_trigger(&self) -> bool {
        self.has_permission(TRIGGER_PERMISSION)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Shown when no plugins are configured, instead of the selector/table.
    pub fn guidance_message() -> String {
        format!(
            "No plugins configured. Add plugin names to the \"plugins\" array in {} \
             (e.g. {{\"plugins\": [\"catalog\"]}}) and restart.",
            Config::default_path().display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let raw = r#"{
            "baseUrl": "http://scheduler.internal:7007",
            "plugins": ["catalog", "search"],
            "permissions": ["task.trigger"]
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.base_url, "http://scheduler.internal:7007");
        assert_eq!(config.plugins, vec!["catalog", "search"]);
        assert!(config.can_trigger());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base_url, "http://localhost:7007");
        assert!(config.plugins.is_empty());
        assert!(!config.can_trigger());
    }

    #[test]
    fn permission_check_is_exact() {
        let config: Config = serde_json::from_str(r#"{"permissions": ["task.read"]}"#).unwrap();
        assert!(config.has_permission("task.read"));
        assert!(!config.has_permission("task.trigger"));
    }
}

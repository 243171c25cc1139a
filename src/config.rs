use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Configuration file structure for buildwatch.
///
/// Loaded from an explicit path, the current directory, or the user's
/// config directory. Command-line flags override individual values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// CI server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat destination settings
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// CI server base URL; the feed is read from `<base-url>/cc.xml`
    pub base_url: Option<String>,

    /// Seconds between polls
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Project names that never produce notifications
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChatConfig {
    /// Slack bot token
    pub token: Option<String>,

    /// Slack Web API base URL
    #[serde(default = "default_chat_api_url")]
    pub api_url: String,

    /// Channel display name to post into
    pub channel: Option<String>,

    /// Text prepended to every message
    #[serde(default)]
    pub message_prefix: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            interval_secs: default_interval_secs(),
            exclude: Vec::new(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_chat_api_url(),
            channel: None,
            message_prefix: None,
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_chat_api_url() -> String {
    "https://slack.com".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./buildwatch.toml, ./buildwatch.json, ./buildwatch.yaml, ./buildwatch.yml
    /// 3. `<config dir>/buildwatch/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "buildwatch.toml",
            "buildwatch.json",
            "buildwatch.yaml",
            "buildwatch.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = Self::user_config_path().filter(|path| path.exists()) {
            return Self::load_from_path(&path);
        }

        Ok(Self::default())
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("buildwatch").join("config.toml"))
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// The CI server base URL, validated.
    pub fn base_url(&self) -> Result<&str> {
        let Some(base_url) = self.server.base_url.as_deref() else {
            bail!("No CI server URL configured (use --url or server.base-url)");
        };
        Url::parse(base_url).with_context(|| format!("Invalid CI server URL: {base_url}"))?;
        Ok(base_url)
    }

    pub fn interval(&self) -> Result<Duration> {
        if self.server.interval_secs == 0 {
            bail!("Polling interval must be at least one second");
        }
        Ok(Duration::from_secs(self.server.interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.interval_secs, 60);
        assert!(config.server.exclude.is_empty());
        assert_eq!(config.chat.api_url, "https://slack.com");
        assert!(config.base_url().is_err());
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[server]
base-url = "https://ci.example.com/jenkins"
interval-secs = 30
exclude = ["nightly", "sandbox"]

[chat]
token = "xoxb-test"
channel = "builds"
message-prefix = "[ci] "
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.base_url().unwrap(), "https://ci.example.com/jenkins");
        assert_eq!(config.interval().unwrap(), Duration::from_secs(30));
        assert_eq!(config.server.exclude, vec!["nightly", "sandbox"]);
        assert_eq!(config.chat.token, Some("xoxb-test".to_string()));
        assert_eq!(config.chat.channel, Some("builds".to_string()));
        assert_eq!(config.chat.message_prefix, Some("[ci] ".to_string()));
        assert_eq!(config.chat.api_url, "https://slack.com");
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "server": {
    "base-url": "https://ci.json.example.com"
  },
  "chat": {
    "api-url": "https://chat.example.com"
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.base_url().unwrap(), "https://ci.json.example.com");
        assert_eq!(config.server.interval_secs, 60);
        assert_eq!(config.chat.api_url, "https://chat.example.com");
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = "server:\n  base-url: https://ci.yaml.example.com\n  exclude:\n    - docs\n";
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.server.exclude, vec!["docs"]);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("does-not-exist.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        config.server.base_url = Some("not a url".to_string());
        config.server.interval_secs = 0;

        assert!(config.base_url().is_err());
        assert!(config.interval().is_err());
    }
}

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub account: AccountConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            directory: None,
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taskpad").join("config.toml"))
}

impl Config {
    /// Reads the config file if there is one, then applies environment
    /// overrides (`.env` included) and checks required values.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        dotenv::dotenv().ok();
        let mut config = match path {
            Some(p) if p.exists() => Config::from_file(p)?,
            _ => Config::default(),
        };
        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        // credentials from the environment are not written back
        let mut on_disk = match Config::from_file(path) {
            Ok(config) => config,
            Err(ConfigError::Io(err)) if err.kind() == io::ErrorKind::NotFound => Config::default(),
            Err(err) => return Err(err),
        };
        on_disk.ui = self.ui.clone();
        fs::write(path, toml::to_string(&on_disk)?)?;
        Ok(())
    }

    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(url) = var("TASKPAD_URL") {
            self.backend.url = url;
        }
        if let Some(key) = var("TASKPAD_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(email) = var("TASKPAD_EMAIL") {
            self.account.email = Some(email);
        }
        if let Some(password) = var("TASKPAD_PASSWORD") {
            self.account.password = Some(password);
        }
        if let Some(level) = var("TASKPAD_LOG") {
            self.logging.level = level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Missing("backend.url"));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing("backend.anon_key"));
        }
        Ok(())
    }

    pub fn log_directory(&self) -> PathBuf {
        self.logging.directory.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(env::temp_dir)
                .join("taskpad")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_file_values_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[backend]
url = "https://demo.example.test"
anon_key = "anon"

[ui]
theme = "dark"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.backend.url, "https://demo.example.test");
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.ui.theme, Theme::Dark);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config.backend.url = "https://file.test".to_string();
        let vars: HashMap<&str, &str> = [
            ("TASKPAD_URL", "https://env.test"),
            ("TASKPAD_EMAIL", "me@example.test"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.backend.url, "https://env.test");
        assert_eq!(config.account.email.as_deref(), Some("me@example.test"));
        assert_eq!(config.account.password, None);
    }

    #[test]
    fn test_missing_url_is_reported() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("backend.url"))
        ));
    }

    #[test]
    fn test_save_keeps_file_credentials_and_writes_theme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.backend.url = "https://x.test".to_string();
        config.ui.theme = Theme::Dark;
        config.save(&path).unwrap();

        let reread = Config::from_file(&path).unwrap();
        assert_eq!(reread.ui.theme, Theme::Dark);
        // nothing from the environment leaks into the file
        assert_eq!(reread.backend.url, "");
    }

    #[test]
    fn test_save_refuses_to_overwrite_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let broken = "[backend\nurl = \"https://x.test\"\n";
        fs::write(&path, broken).unwrap();

        let mut config = Config::default();
        config.ui.theme = Theme::Dark;
        assert!(matches!(config.save(&path), Err(ConfigError::Parse(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }
}

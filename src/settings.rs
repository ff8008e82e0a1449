use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::{
    ConfigError, Configuration, DEFAULT_AUTH_API_URL, DEFAULT_CALLBACK_PATH,
    DEFAULT_MANAGEMENT_API_URL, DEFAULT_SIGN_IN_SCHEME,
};
use crate::utils::cookie_utils::AUTH_TOKEN_COOKIE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassageSettings {
    pub application: ApplicationSettings,
    pub passage: PassageAppSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Interval for re-reading settings; 0 disables hot reload
    pub settings_reload_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassageAppSettings {
    pub app_id: String,
    pub api_key: Option<String>,
    pub sign_in_scheme: String,
    pub save_tokens: bool,
    pub callback_path: String,
    pub cookie_name: String,
    pub auth_api_url: String,
    pub management_api_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            settings_reload_seconds: 0,
        }
    }
}

impl Default for PassageAppSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: None,
            sign_in_scheme: DEFAULT_SIGN_IN_SCHEME.to_string(),
            save_tokens: false,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            cookie_name: AUTH_TOKEN_COOKIE.to_string(),
            auth_api_url: DEFAULT_AUTH_API_URL.to_string(),
            management_api_url: DEFAULT_MANAGEMENT_API_URL.to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true, // Default to secure cookies
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PassageSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - A settings file cannot be read or parsed
    pub fn load() -> Result<Self, ConfigError> {
        Self::initialize_environment()?;
        Self::reload()
    }

    /// Re-read files and environment without touching the logger
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file cannot be read or parsed
    pub fn reload() -> Result<Self, ConfigError> {
        let secrets_dir = std::env::var("PASSAGE_SECRETS_DIR").ok();
        let mut settings =
            Self::load_from_sources(Path::new("."), secrets_dir.as_deref().map(Path::new))?;
        Self::apply_env_overrides(&mut settings);
        Ok(settings)
    }

    /// Initialize environment and logging
    ///
    /// # Errors
    ///
    /// Returns an error if logger initialization fails
    fn initialize_environment() -> Result<(), ConfigError> {
        Self::load_env_file();
        env_logger::try_init().map_err(|e| ConfigError::Load(e.to_string()))?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in the secrets directory (if given and it exists)
    /// 3. Settings.toml in `base_dir` (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    pub fn load_from_sources(
        base_dir: &Path,
        secrets_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        let default_config_path = base_dir.join("Settings.toml");
        if default_config_path.exists() {
            settings = Self::read_file(&default_config_path)?;
            log::debug!("Loaded base settings from {}", default_config_path.display());
        }

        if let Some(secrets_dir) = secrets_dir {
            let secrets_path = secrets_dir.join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::read_file(&secrets_path)?;
                log::debug!("Overriding settings from {}", secrets_path.display());
            } else {
                log::debug!(
                    "PASSAGE_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
        basic_toml::from_str(&content)
            .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_passage_env_overrides(&mut settings.passage);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        Self::apply_numeric_env_override(
            "SETTINGS_RELOAD_SECONDS",
            &mut app_settings.settings_reload_seconds,
        );
    }

    fn apply_passage_env_overrides(passage: &mut PassageAppSettings) {
        Self::apply_string_env_override("PASSAGE_APP_ID", &mut passage.app_id);
        if let Ok(api_key) = std::env::var("PASSAGE_API_KEY") {
            passage.api_key = Some(api_key).filter(|key| !key.is_empty());
        }
        Self::apply_string_env_override("PASSAGE_SIGN_IN_SCHEME", &mut passage.sign_in_scheme);
        if let Ok(save_tokens) = std::env::var("PASSAGE_SAVE_TOKENS") {
            if let Ok(save_tokens) = save_tokens.parse::<bool>() {
                passage.save_tokens = save_tokens;
            }
        }
        Self::apply_string_env_override("PASSAGE_CALLBACK_PATH", &mut passage.callback_path);
        Self::apply_string_env_override("PASSAGE_COOKIE_NAME", &mut passage.cookie_name);
        Self::apply_string_env_override("PASSAGE_AUTH_API_URL", &mut passage.auth_api_url);
        Self::apply_string_env_override(
            "PASSAGE_MANAGEMENT_API_URL",
            &mut passage.management_api_url,
        );
    }

    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                *target = value;
            }
        }
    }

    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = cookie_secure;
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// The immutable handshake configuration these settings describe
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration fails validation
    pub fn to_configuration(&self) -> Result<Configuration, ConfigError> {
        let passage = &self.passage;
        let config = Configuration {
            app_id: passage.app_id.trim().to_string(),
            api_key: passage.api_key.clone().filter(|key| !key.trim().is_empty()),
            sign_in_scheme: passage.sign_in_scheme.clone(),
            save_tokens: passage.save_tokens,
            callback_path: passage.callback_path.clone(),
            cookie_name: passage.cookie_name.clone(),
            auth_api_url: passage.auth_api_url.trim_end_matches('/').to_string(),
            management_api_url: passage.management_api_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(passage.request_timeout_seconds.max(1)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    #[must_use]
    pub fn reload_interval(&self) -> Option<Duration> {
        match self.application.settings_reload_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }
}

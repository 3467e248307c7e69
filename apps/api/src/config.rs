use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    Missing(&'static str),

    #[error("Environment variable '{0}' looks like an unresolved placeholder")]
    Placeholder(&'static str),

    #[error("Environment variable '{var}' is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Credential and model settings for one provider.
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub model_id: Option<String>,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if a provider credential or the secret code is missing.
#[derive(Clone)]
pub struct Config {
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub gemini: ProviderSettings,
    pub secret_code: String,
    pub provider_timeout: Duration,
    /// Apply response validation to every provider, not just Gemini.
    pub validate_all_providers: bool,
    /// Extra company names the response validator should catch.
    pub validator_watchlist: Vec<String>,
    pub cv_path: Option<PathBuf>,
    pub site_dir: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai", &self.openai)
            .field("anthropic", &self.anthropic)
            .field("gemini", &self.gemini)
            .field("secret_code", &"<redacted>")
            .field("provider_timeout", &self.provider_timeout)
            .field("validate_all_providers", &self.validate_all_providers)
            .field("validator_watchlist", &self.validator_watchlist)
            .field("cv_path", &self.cv_path)
            .field("site_dir", &self.site_dir)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = |key_var: &'static str, model_var: &str, url_var: &str| {
            Ok::<_, ConfigError>(ProviderSettings {
                api_key: require_credential(key_var, lookup(key_var))?,
                model_id: optional(model_var),
                base_url: optional(url_var),
            })
        };

        let port = match optional("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = match optional("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::Invalid {
                        var: "PROVIDER_TIMEOUT_SECS",
                        reason: format!("expected a positive number of seconds, got '{raw}'"),
                    })
                }
                Ok(secs) => secs,
            },
            None => DEFAULT_PROVIDER_TIMEOUT_SECS,
        };

        let validate_all_providers = match optional("VALIDATE_ALL_PROVIDERS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "VALIDATE_ALL_PROVIDERS",
                reason: format!("expected true or false, got '{raw}'"),
            })?,
            None => false,
        };

        Ok(Config {
            openai: provider("OPENAI_API_KEY", "OPENAI_MODEL", "OPENAI_BASE_URL")?,
            anthropic: provider("ANTHROPIC_API_KEY", "ANTHROPIC_MODEL", "ANTHROPIC_BASE_URL")?,
            gemini: provider("GOOGLE_GEMINI_API_KEY", "GEMINI_MODEL", "GEMINI_BASE_URL")?,
            secret_code: require_credential("SECRET_CODE", lookup("SECRET_CODE"))?,
            provider_timeout: Duration::from_secs(timeout_secs),
            validate_all_providers,
            validator_watchlist: optional("VALIDATOR_WATCHLIST")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            cv_path: optional("CV_PATH").map(PathBuf::from),
            site_dir: optional("SITE_DIR").map(PathBuf::from),
            port,
            rust_log: optional("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// Rejects empty values and values that look like an unexpanded template,
/// e.g. `${OPENAI_API_KEY}`, `<your-key>` or `your_api_key_here`.
pub fn validate_credential(var: &'static str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(var));
    }
    let lower = value.to_ascii_lowercase();
    let placeholder = value.starts_with("${")
        || (value.starts_with('<') && value.ends_with('>'))
        || lower.starts_with("your_")
        || lower.starts_with("your-")
        || lower == "changeme";
    if placeholder {
        return Err(ConfigError::Placeholder(var));
    }
    Ok(())
}

fn require_credential(var: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let value = value.ok_or(ConfigError::Missing(var))?;
    validate_credential(var, &value)?;
    Ok(value.trim().to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| {
        let value = match key {
            "OPENAI_API_KEY" => Some("sk-test-openai"),
            "ANTHROPIC_API_KEY" => Some("sk-ant-test"),
            "GOOGLE_GEMINI_API_KEY" => Some("gm-test"),
            "SECRET_CODE" => Some("open-sesame"),
            _ => None,
        };
        value.map(String::from)
    })
    .expect("test config is valid")
}

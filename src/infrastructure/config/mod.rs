use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

/// Application configuration: defaults, then `config.toml`, then
/// `CASEFORGE_`-prefixed environment variables (double underscore for
/// nesting, e.g. `CASEFORGE_LLM__MODEL`). The provider credential is never
/// hardcoded; it arrives via the environment or the config file.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LLMConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("CASEFORGE_").split("__"));

        let mut config = Self::from_figment(figment)?;

        // Streamlit-secrets analog: the plain provider key variable works
        // without any CASEFORGE_ prefixing.
        if config.llm.api_key.is_none() {
            config.llm.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Failed to load configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;

    #[test]
    fn test_defaults_point_at_openai() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(
            Toml::string(
                r#"
                [server]
                port = 8090

                [llm]
                provider = "Gemini"
                base_url = "https://generativelanguage.googleapis.com/v1beta/models"
                model = "gemini-2.0-flash"
                "#,
            ),
        );

        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.provider, LLMProvider::Gemini);
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        // Untouched fields keep their defaults.
        assert_eq!(config.llm.temperature, Some(0.15));
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("[llm]\nprovider = \"Nonsense\""));
        let err = AppConfig::from_figment(figment).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}

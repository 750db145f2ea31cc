use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::FusionError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub image_model: String,
    pub text_model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `GEMINI_API_KEY` (or `API_KEY`) and the optional overrides
    /// `GEMINI_BASE_URL`, `GEMINI_IMAGE_MODEL`, `GEMINI_TEXT_MODEL`,
    /// `GEMINI_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, FusionError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FusionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("API_KEY"))
            .ok_or_else(|| FusionError::config("GEMINI_API_KEY environment variable not set"))?;

        let mut config = Self::new(api_key);

        if let Some(raw) = non_empty("GEMINI_BASE_URL") {
            config.base_url = Url::parse(raw.trim())
                .map_err(|e| FusionError::config(format!("invalid GEMINI_BASE_URL: {e}")))?;
        }
        if let Some(model) = non_empty("GEMINI_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Some(model) = non_empty("GEMINI_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Some(raw) = non_empty("GEMINI_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| FusionError::config(format!("invalid GEMINI_TIMEOUT_SECS: {raw}")))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// `generateContent` endpoint for `model`, without the key.
    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{model}:generateContent",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("image_model", &self.image_model)
            .field("text_model", &self.text_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn api_key_is_required() {
        let err = GeminiConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, FusionError::Config(_)));

        let err = GeminiConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, FusionError::Config(_)));
    }

    #[test]
    fn falls_back_to_api_key_and_defaults() {
        let config = GeminiConfig::from_lookup(lookup(&[("API_KEY", "k-123")])).unwrap();
        assert_eq!(config.api_key, "k-123");
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(
            config.endpoint("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn overrides_are_applied() {
        let config = GeminiConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_BASE_URL", "http://localhost:8080/models/"),
            ("GEMINI_TEXT_MODEL", "text-x"),
            ("GEMINI_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint("m"), "http://localhost:8080/models/m:generateContent");
        assert_eq!(config.text_model, "text-x");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_overrides_are_config_errors() {
        let err = GeminiConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, FusionError::Config(_)));
    }

    #[test]
    fn debug_redacts_the_key() {
        let config = GeminiConfig::new("super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}

use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, data::TokenId};

/// Sampling and stopping parameters. Stored and forwarded by [`crate::Request`], never inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: usize,
    pub repetition_penalty: f64,
    pub max_new_tokens: usize,
    #[serde(default)]
    pub stop_strings: Vec<String>,
    #[serde(default)]
    pub stop_token_ids: Vec<TokenId>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::from_defaults(&AppConfig::default())
    }
}

impl GenerationConfig {
    pub fn from_defaults(config: &AppConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            repetition_penalty: config.repetition_penalty,
            max_new_tokens: config.max_new_tokens,
            stop_strings: Vec::new(),
            stop_token_ids: Vec::new(),
        }
    }
}

/// Caller-supplied parameters; anything left out falls back to the service defaults.
#[derive(Debug, Default, Deserialize)]
pub struct GenerationOverrides {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<usize>,
    pub repetition_penalty: Option<f64>,
    pub max_new_tokens: Option<usize>,
    pub stop_strings: Option<Vec<String>>,
    pub stop_token_ids: Option<Vec<TokenId>>,
}

impl GenerationOverrides {
    pub fn resolve(self, config: &AppConfig) -> GenerationConfig {
        let defaults = GenerationConfig::from_defaults(config);
        GenerationConfig {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            repetition_penalty: self
                .repetition_penalty
                .unwrap_or(defaults.repetition_penalty),
            max_new_tokens: self.max_new_tokens.unwrap_or(defaults.max_new_tokens),
            stop_strings: self.stop_strings.unwrap_or(defaults.stop_strings),
            stop_token_ids: self.stop_token_ids.unwrap_or(defaults.stop_token_ids),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fill_in_from_defaults() {
        let config = AppConfig {
            max_new_tokens: 16,
            ..AppConfig::default()
        };
        let overrides: GenerationOverrides =
            serde_json::from_str(r#"{"temperature":0.1,"stop_strings":["\n"]}"#).unwrap();

        let resolved = overrides.resolve(&config);
        assert_eq!(resolved.temperature, 0.1);
        assert_eq!(resolved.max_new_tokens, 16);
        assert_eq!(resolved.top_k, config.top_k);
        assert_eq!(resolved.stop_strings, vec!["\n".to_string()]);
        assert!(resolved.stop_token_ids.is_empty());
    }
}

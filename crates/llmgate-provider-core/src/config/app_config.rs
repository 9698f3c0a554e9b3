use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::EndpointTokenConfig;

/// The `ollama` provider name; custom endpoints named like it in any case resolve to it.
pub const OLLAMA: &str = "ollama";

/// Application configuration as loaded by the operator (JSON on disk).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<EndpointConfig>,
    /// Catch-all settings applied across endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all: Option<AllEndpointsConfig>,
    #[serde(rename = "openAI", skip_serializing_if = "Option::is_none")]
    pub openai: Option<FirstPartyEndpointConfig>,
    #[serde(rename = "azureOpenAI", skip_serializing_if = "Option::is_none")]
    pub azure_openai: Option<FirstPartyEndpointConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<FirstPartyEndpointConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google: Option<FirstPartyEndpointConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrock: Option<FirstPartyEndpointConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllEndpointsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default: Vec<String>,
    #[serde(default)]
    pub fetch: bool,
}

/// Operator-declared OpenAI-compatible endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_params: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_params: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_params: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_convo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_message_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_prompt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_display_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_endpoint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_config: Option<EndpointTokenConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inject_session_info: Option<bool>,
}

impl EndpointConfig {
    pub fn fetch_models(&self) -> bool {
        self.models.as_ref().is_some_and(|models| models.fetch)
    }
}

/// Operator settings for a first-party provider section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstPartyEndpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_convo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

pub fn normalize_endpoint_name(name: &str) -> &str {
    if name.eq_ignore_ascii_case(OLLAMA) {
        OLLAMA
    } else {
        name
    }
}

/// Finds the custom endpoint whose normalized name equals `endpoint`.
pub fn get_custom_endpoint_config<'a>(
    endpoint: &str,
    app_config: &'a AppConfig,
) -> Option<&'a EndpointConfig> {
    app_config
        .endpoints
        .custom
        .iter()
        .find(|config| normalize_endpoint_name(&config.name) == endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_config() -> AppConfig {
        serde_json::from_value(serde_json::json!({
            "endpoints": {
                "custom": [
                    {
                        "name": "OpenRouter",
                        "apiKey": "${OPENROUTER_KEY}",
                        "baseURL": "https://openrouter.ai/api/v1",
                        "models": { "default": ["openrouter/auto"], "fetch": true },
                        "titleConvo": true,
                        "dropParams": ["stop"]
                    },
                    { "name": "Ollama", "apiKey": "ollama", "baseURL": "http://localhost:11434/v1" }
                ],
                "all": { "streamRate": 25 }
            }
        }))
        .unwrap()
    }

    #[test]
    fn parses_operator_json() {
        let config = app_config();
        let openrouter = &config.endpoints.custom[0];
        assert_eq!(openrouter.base_url.as_deref(), Some("https://openrouter.ai/api/v1"));
        assert!(openrouter.fetch_models());
        assert_eq!(openrouter.drop_params.as_deref(), Some(&["stop".to_string()][..]));
        assert_eq!(config.endpoints.all.and_then(|all| all.stream_rate), Some(25));
    }

    #[test]
    fn lookup_is_exact_except_for_ollama() {
        let config = app_config();
        assert!(get_custom_endpoint_config("OpenRouter", &config).is_some());
        assert!(get_custom_endpoint_config("openrouter", &config).is_none());
        assert_eq!(
            get_custom_endpoint_config("ollama", &config).map(|c| c.name.as_str()),
            Some("Ollama")
        );
    }
}

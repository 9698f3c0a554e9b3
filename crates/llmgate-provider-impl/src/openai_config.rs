use std::collections::BTreeMap;

use llmgate_provider_core::headers::{header_set_default, headers_from_map};
use llmgate_provider_core::{
    BehaviorOptions, ClientOptions, ConfigOptions, CustomClientOptions, FetchOptions, LlmConfig,
    OptionsBuilder, ProviderResult, resolve_placeholder,
};
use serde_json::{Map, Value};

/// Request parameters accepted by the chat-completions API. Anything else goes to
/// `modelKwargs`.
const KNOWN_OPENAI_PARAMS: &[&str] = &[
    "audio",
    "frequency_penalty",
    "logit_bias",
    "logprobs",
    "max_completion_tokens",
    "max_tokens",
    "metadata",
    "modalities",
    "n",
    "parallel_tool_calls",
    "prediction",
    "presence_penalty",
    "reasoning_effort",
    "response_format",
    "seed",
    "service_tier",
    "stop",
    "store",
    "stream_options",
    "temperature",
    "tool_choice",
    "tools",
    "top_logprobs",
    "top_p",
];

const OPENROUTER_HOST: &str = "openrouter.ai";

fn is_known_param(key: &str) -> bool {
    KNOWN_OPENAI_PARAMS.contains(&key)
}

/// Maps custom client options onto an OpenAI-compatible client configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiOptionsBuilder;

impl OpenAiOptionsBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl OptionsBuilder for OpenAiOptionsBuilder {
    fn build(
        &self,
        api_key: &str,
        options: CustomClientOptions,
        provider: &str,
    ) -> ProviderResult<ClientOptions> {
        let mut model_options = options.model_options;
        let model = take_string(&mut model_options, "model");
        let user = take_string(&mut model_options, "user");

        let mut params = Map::new();
        let mut model_kwargs = Map::new();
        for (key, value) in model_options {
            params.insert(key, value);
        }
        for (key, value) in options.add_params.unwrap_or_default() {
            if is_known_param(&key) {
                params.insert(key, value);
            } else {
                model_kwargs.insert(key, value);
            }
        }
        for key in options.drop_params.unwrap_or_default() {
            params.remove(&key);
            model_kwargs.remove(&key);
        }

        let mut default_headers = options
            .headers
            .as_ref()
            .map(|headers| {
                let resolved: BTreeMap<String, String> = headers
                    .iter()
                    .map(|(name, value)| (name.clone(), resolve_placeholder(value)))
                    .collect();
                headers_from_map(&resolved)
            })
            .unwrap_or_default();

        let base_url = options.reverse_proxy_url.filter(|url| !url.is_empty());
        if base_url
            .as_deref()
            .is_some_and(|url| url.contains(OPENROUTER_HOST))
        {
            header_set_default(&mut default_headers, "X-Title", "llmgate");
        }

        let fetch = base_url.as_ref().map(|url| FetchOptions {
            direct_endpoint: options.direct_endpoint,
            reverse_proxy_url: url.clone(),
            endpoint: provider.to_string(),
            session_id: options.session_id.clone(),
            user_id: options.user_id.clone(),
        });

        Ok(ClientOptions {
            provider: provider.to_string(),
            llm_config: LlmConfig {
                model,
                api_key: api_key.to_string(),
                streaming: true,
                user,
                stream_delay_ms: None,
                params,
                model_kwargs,
            },
            config_options: ConfigOptions {
                base_url,
                default_headers,
                proxy: options.proxy.filter(|proxy| !proxy.is_empty()),
                fetch,
            },
            behavior: BehaviorOptions {
                title_convo: options.title_convo,
                title_model: options.title_model,
                title_method: options.title_method,
                title_message_role: options.title_message_role,
                context_strategy: options.context_strategy,
                summary_model: options.summary_model,
                force_prompt: options.force_prompt,
                model_display_label: options.model_display_label,
                stream_rate: options.stream_rate,
                custom_params: options.custom_params,
            },
            use_legacy_content: false,
            endpoint_token_config: options.endpoint_token_config,
        })
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(value)) => Some(value),
        Some(other) if !other.is_null() => Some(other.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use llmgate_provider_core::header_get;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn add_params_split_between_params_and_kwargs() {
        let options = CustomClientOptions {
            reverse_proxy_url: Some("https://api.mistral.ai/v1".to_string()),
            add_params: Some(object(json!({ "temperature": 0.2, "safe_prompt": true }))),
            drop_params: Some(vec!["stop".to_string()]),
            model_options: object(json!({
                "model": "mistral-large",
                "user": "u1",
                "stop": ["\n"],
                "top_p": 0.9
            })),
            ..Default::default()
        };
        let built = OpenAiOptionsBuilder::new()
            .build("sk-1", options, "Mistral")
            .unwrap();

        assert_eq!(built.llm_config.model.as_deref(), Some("mistral-large"));
        assert_eq!(built.llm_config.user.as_deref(), Some("u1"));
        assert_eq!(built.llm_config.params.get("temperature"), Some(&json!(0.2)));
        assert_eq!(built.llm_config.params.get("top_p"), Some(&json!(0.9)));
        assert!(!built.llm_config.params.contains_key("stop"));
        assert_eq!(built.llm_config.model_kwargs.get("safe_prompt"), Some(&json!(true)));
        assert_eq!(built.config_options.base_url.as_deref(), Some("https://api.mistral.ai/v1"));
    }

    #[test]
    fn binds_transport_and_openrouter_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("x-custom".to_string(), "static".to_string());
        let options = CustomClientOptions {
            reverse_proxy_url: Some("https://openrouter.ai/api/v1".to_string()),
            headers: Some(headers),
            direct_endpoint: true,
            session_id: Some("s1".to_string()),
            ..Default::default()
        };
        let built = OpenAiOptionsBuilder::new()
            .build("sk-1", options, "OpenRouter")
            .unwrap();

        let headers = &built.config_options.default_headers;
        assert_eq!(header_get(headers, "X-Custom"), Some("static"));
        assert_eq!(header_get(headers, "x-title"), Some("llmgate"));
        let fetch = built.config_options.fetch.unwrap();
        assert!(fetch.direct_endpoint);
        assert_eq!(fetch.endpoint, "OpenRouter");
        assert_eq!(fetch.session_id.as_deref(), Some("s1"));
        assert_eq!(fetch.user_id, None);
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use llmgate_provider_core::registry::{ANTHROPIC, AZURE_OPENAI, BEDROCK, GOOGLE, OPENAI};
use llmgate_provider_core::{
    AppConfig, FetchError, FetchModelsRequest, MemoryCache, MemoryCredentialStore, ModelFetcher,
    ProviderConfigMap, TokenConfigStore,
};
use llmgate_provider_impl::{InitializerDeps, OpenAiOptionsBuilder, build_provider_map};

struct NoFetch;

#[async_trait]
impl ModelFetcher for NoFetch {
    async fn fetch_models(&self, _request: FetchModelsRequest) -> Result<Vec<String>, FetchError> {
        Err(FetchError::Other("offline".to_string()))
    }
}

fn provider_map() -> ProviderConfigMap {
    build_provider_map(InitializerDeps {
        credential_store: Arc::new(MemoryCredentialStore::new()),
        token_configs: TokenConfigStore::new(Arc::new(MemoryCache::new()), Duration::from_secs(60)),
        fetcher: Arc::new(NoFetch),
        options_builder: Arc::new(OpenAiOptionsBuilder::new()),
        proxy: None,
    })
}

fn app_config() -> AppConfig {
    serde_json::from_value(serde_json::json!({
        "endpoints": {
            "custom": [
                { "name": "OpenRouter", "apiKey": "sk", "baseURL": "https://openrouter.ai/api/v1" },
                { "name": "Mistral", "apiKey": "sk", "baseURL": "https://api.mistral.ai/v1" }
            ]
        }
    }))
    .unwrap()
}

#[test]
fn first_party_identifiers_resolve_unchanged() {
    let map = provider_map();
    let config = app_config();
    for provider in [OPENAI, AZURE_OPENAI, GOOGLE, BEDROCK, ANTHROPIC] {
        let result = map.get_provider_config(provider, &config).unwrap();
        assert_eq!(result.override_provider, provider);
        assert_eq!(result.get_options.name(), provider);
        assert!(result.custom_endpoint_config.is_none());
    }
}

#[test]
fn lowercase_match_rewrites_the_name() {
    let map = provider_map();
    let config = app_config();
    let result = map.get_provider_config("Anthropic", &config).unwrap();
    assert_eq!(result.override_provider, "anthropic");
    assert_eq!(result.get_options.name(), ANTHROPIC);
}

#[test]
fn unknown_provider_is_unsupported() {
    let err = provider_map()
        .get_provider_config("Cohere", &app_config())
        .unwrap_err();
    assert_eq!(err.to_string(), "Provider Cohere not supported");
}

#[test]
fn custom_endpoint_falls_back_to_generic_openai() {
    let config = app_config();
    let result = provider_map().get_provider_config("Mistral", &config).unwrap();
    assert_eq!(result.override_provider, OPENAI);
    assert_eq!(result.get_options.name(), "custom");
    assert_eq!(
        result.custom_endpoint_config.map(|c| c.name.as_str()),
        Some("Mistral")
    );
}

#[test]
fn known_custom_provider_needs_config() {
    let map = provider_map();
    let config = app_config();

    let result = map.get_provider_config("OpenRouter", &config).unwrap();
    assert_eq!(result.override_provider, "openrouter");
    assert!(result.custom_endpoint_config.is_some());

    let err = map.get_provider_config("xai", &config).unwrap_err();
    assert_eq!(err.to_string(), "Provider xai not supported");
    let err = map.get_provider_config("DeepSeek", &config).unwrap_err();
    assert_eq!(err.to_string(), "Provider DeepSeek not supported");
}

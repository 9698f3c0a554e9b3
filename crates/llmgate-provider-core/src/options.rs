use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProviderResult;
use crate::config::EndpointTokenConfig;
use crate::headers::Headers;

/// Routing and metadata bound into an instrumented transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    #[serde(default)]
    pub direct_endpoint: bool,
    #[serde(default)]
    pub reverse_proxy_url: String,
    /// Endpoint label used in diagnostics; empty disables response summaries.
    #[serde(default)]
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub session_id: Option<String>,
    #[serde(skip_serializing)]
    pub user_id: Option<String>,
}

/// Options handed from an initializer to an [`OptionsBuilder`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomClientOptions {
    pub reverse_proxy_url: Option<String>,
    pub proxy: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub add_params: Option<Map<String, Value>>,
    pub drop_params: Option<Vec<String>>,
    pub custom_params: Option<Value>,
    pub title_convo: Option<bool>,
    pub title_model: Option<String>,
    pub title_method: Option<String>,
    pub title_message_role: Option<String>,
    pub force_prompt: Option<bool>,
    pub summary_model: Option<String>,
    pub model_display_label: Option<String>,
    pub context_strategy: Option<String>,
    pub direct_endpoint: bool,
    pub stream_rate: Option<u64>,
    pub endpoint_token_config: Option<EndpointTokenConfig>,
    /// Caller model parameters plus `user`.
    pub model_options: Map<String, Value>,
    /// Values injected into chat-completion bodies by the transport.
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub streaming: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Per-token delay consumed by the streaming layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_delay_ms: Option<u64>,
    /// Request parameters understood by the OpenAI-compatible API.
    #[serde(default, flatten)]
    pub params: Map<String, Value>,
    /// Provider-specific extras sent verbatim.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub model_kwargs: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOptions {
    #[serde(rename = "baseURL", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchOptions>,
}

/// Non-request settings the chat layer reads from the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_convo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_message_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_prompt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_display_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_rate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_params: Option<Value>,
}

/// Final per-request client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    pub provider: String,
    pub llm_config: LlmConfig,
    pub config_options: ConfigOptions,
    pub behavior: BehaviorOptions,
    #[serde(default)]
    pub use_legacy_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_token_config: Option<EndpointTokenConfig>,
}

impl ClientOptions {
    /// Transport options to hand to the instrumented fetch factory.
    pub fn fetch_options(&self) -> FetchOptions {
        self.config_options.fetch.clone().unwrap_or_else(|| FetchOptions {
            direct_endpoint: false,
            reverse_proxy_url: self.config_options.base_url.clone().unwrap_or_default(),
            endpoint: self.provider.clone(),
            session_id: None,
            user_id: None,
        })
    }
}

/// Generic provider-option builder (the OpenAI-compatible one in practice).
pub trait OptionsBuilder: Send + Sync {
    fn build(
        &self,
        api_key: &str,
        options: CustomClientOptions,
        provider: &str,
    ) -> ProviderResult<ClientOptions>;
}

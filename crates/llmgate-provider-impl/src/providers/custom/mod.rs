use async_trait::async_trait;
use llmgate_provider_core::{
    AppConfig, ClientOptions, CustomClientOptions, EndpointConfig, EndpointInitializer,
    EndpointTokenConfig, FetchModelsRequest, InitializeParams, ProviderError, ProviderResult,
    ResolvedCredential, get_custom_endpoint_config,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::credential::{CredentialSource, resolve_credentials};
use crate::models::fetches_token_config;
use crate::registry::InitializerDeps;

const DEFAULT_TITLE_METHOD: &str = "completion";
const SUMMARIZE_STRATEGY: &str = "summarize";

/// Initializer for operator-declared OpenAI-compatible endpoints.
pub struct CustomInitializer {
    deps: InitializerDeps,
}

impl CustomInitializer {
    pub fn new(deps: InitializerDeps) -> Self {
        Self { deps }
    }

    /// Cache key for the endpoint's token metadata.
    pub fn token_key(
        endpoint: &str,
        config: &EndpointConfig,
        credential: &ResolvedCredential,
        user_id: &str,
    ) -> String {
        if config.token_config.is_none() && credential.is_user_scoped() {
            format!("{endpoint}:{user_id}")
        } else {
            endpoint.to_string()
        }
    }

    async fn endpoint_token_config(
        &self,
        endpoint: &str,
        config: &EndpointConfig,
        credential: &ResolvedCredential,
        user_id: &str,
    ) -> Option<EndpointTokenConfig> {
        if let Some(declared) = &config.token_config {
            return Some(declared.clone());
        }
        if !fetches_token_config(endpoint) {
            return None;
        }

        let token_key = Self::token_key(endpoint, config, credential, user_id);
        if let Some(cached) = self.deps.token_configs.get(&token_key).await {
            return Some(cached);
        }
        if !config.fetch_models() {
            return None;
        }

        let request = FetchModelsRequest {
            api_key: credential.api_key.clone(),
            base_url: credential.base_url.clone(),
            name: endpoint.to_string(),
            user_id: Some(user_id.to_string()).filter(|id| !id.is_empty()),
            token_key: token_key.clone(),
        };
        match self.deps.fetcher.fetch_models(request).await {
            Ok(models) => {
                debug!(
                    event = "token_config_fetched",
                    endpoint = %endpoint,
                    models = models.len()
                );
                self.deps.token_configs.get(&token_key).await
            }
            Err(err) => {
                warn!(
                    event = "token_config_fetch_failed",
                    endpoint = %endpoint,
                    error = %err
                );
                None
            }
        }
    }
}

fn build_custom_options(
    config: &EndpointConfig,
    app_config: &AppConfig,
    endpoint_token_config: Option<EndpointTokenConfig>,
) -> CustomClientOptions {
    let stream_rate = app_config
        .endpoints
        .all
        .as_ref()
        .and_then(|all| all.stream_rate)
        .or(config.stream_rate);

    CustomClientOptions {
        headers: config.headers.clone(),
        add_params: config.add_params.clone(),
        drop_params: config.drop_params.clone(),
        custom_params: config.custom_params.clone(),
        title_convo: config.title_convo,
        title_model: config.title_model.clone(),
        title_method: Some(
            config
                .title_method
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE_METHOD.to_string()),
        ),
        title_message_role: config.title_message_role.clone(),
        force_prompt: config.force_prompt,
        summary_model: config.summary_model.clone(),
        model_display_label: config.model_display_label.clone(),
        context_strategy: config
            .summarize
            .unwrap_or(false)
            .then(|| SUMMARIZE_STRATEGY.to_string()),
        direct_endpoint: config.direct_endpoint.unwrap_or(false),
        stream_rate,
        endpoint_token_config,
        ..Default::default()
    }
}

#[async_trait]
impl EndpointInitializer for CustomInitializer {
    fn name(&self) -> &'static str {
        "custom"
    }

    async fn initialize(&self, params: &InitializeParams) -> ProviderResult<ClientOptions> {
        let endpoint = params.endpoint.as_str();
        let user_id = params.request.user_id.as_str();
        info!(event = "custom_endpoint_initialize", endpoint = %endpoint);

        let Some(config) = get_custom_endpoint_config(endpoint, &params.app_config) else {
            error!(event = "custom_endpoint_config_missing", endpoint = %endpoint);
            return Err(ProviderError::ConfigNotFound(endpoint.to_string()));
        };

        let credential = resolve_credentials(
            self.deps.credential_store.as_ref(),
            &params.request,
            CredentialSource {
                endpoint,
                api_key: config.api_key.as_deref(),
                base_url: config.base_url.as_deref(),
                require_base_url: true,
            },
        )
        .await?;

        let endpoint_token_config = self
            .endpoint_token_config(endpoint, config, &credential, user_id)
            .await;

        let mut options = build_custom_options(config, &params.app_config, endpoint_token_config);
        let stream_rate = options.stream_rate;
        options.reverse_proxy_url = Some(credential.base_url.clone());
        options.proxy = self.deps.proxy.clone();
        options.model_options = params.model_parameters.clone();
        options
            .model_options
            .insert("user".to_string(), Value::String(user_id.to_string()));
        if config.inject_session_info.unwrap_or(false) {
            options.session_id = params.request.session_id.clone();
            options.user_id = Some(user_id.to_string()).filter(|id| !id.is_empty());
        }

        let mut client_options =
            self.deps
                .options_builder
                .build(&credential.api_key, options, endpoint)?;
        client_options.use_legacy_content = true;
        if let Some(rate) = stream_rate.filter(|rate| *rate > 0) {
            client_options.llm_config.stream_delay_ms = Some(rate);
        }

        info!(
            event = "custom_endpoint_ready",
            endpoint = %endpoint,
            base_url = %credential.base_url,
            model = %client_options.llm_config.model.as_deref().unwrap_or("-"),
            user_scoped = credential.is_user_scoped(),
            has_token_config = client_options.endpoint_token_config.is_some()
        );
        Ok(client_options)
    }
}

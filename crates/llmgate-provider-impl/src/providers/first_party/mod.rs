//! Initializers for the first-party providers in the static map.

use async_trait::async_trait;
use llmgate_provider_core::config::{EndpointsConfig, FirstPartyEndpointConfig};
use llmgate_provider_core::registry::{ANTHROPIC, AZURE_OPENAI, BEDROCK, GOOGLE, OPENAI};
use llmgate_provider_core::{
    ClientOptions, CustomClientOptions, EndpointInitializer, InitializeParams, ProviderResult,
};
use serde_json::Value;
use tracing::info;

use crate::credential::{CredentialSource, resolve_credentials};
use crate::registry::InitializerDeps;

/// Static description of one first-party provider.
#[derive(Debug, Clone, Copy)]
pub struct FirstPartySpec {
    pub provider: &'static str,
    /// Environment variable read when the config section declares no key.
    pub env_key: &'static str,
    pub default_base_url: Option<&'static str>,
    pub section: fn(&EndpointsConfig) -> Option<&FirstPartyEndpointConfig>,
}

pub const OPENAI_SPEC: FirstPartySpec = FirstPartySpec {
    provider: OPENAI,
    env_key: "OPENAI_API_KEY",
    default_base_url: Some("https://api.openai.com/v1"),
    section: |endpoints| endpoints.openai.as_ref(),
};

pub const AZURE_OPENAI_SPEC: FirstPartySpec = FirstPartySpec {
    provider: AZURE_OPENAI,
    env_key: "AZURE_API_KEY",
    default_base_url: None,
    section: |endpoints| endpoints.azure_openai.as_ref(),
};

pub const ANTHROPIC_SPEC: FirstPartySpec = FirstPartySpec {
    provider: ANTHROPIC,
    env_key: "ANTHROPIC_API_KEY",
    default_base_url: Some("https://api.anthropic.com/v1"),
    section: |endpoints| endpoints.anthropic.as_ref(),
};

pub const GOOGLE_SPEC: FirstPartySpec = FirstPartySpec {
    provider: GOOGLE,
    env_key: "GOOGLE_KEY",
    default_base_url: Some("https://generativelanguage.googleapis.com/v1beta"),
    section: |endpoints| endpoints.google.as_ref(),
};

pub const BEDROCK_SPEC: FirstPartySpec = FirstPartySpec {
    provider: BEDROCK,
    env_key: "BEDROCK_AWS_SECRET_ACCESS_KEY",
    default_base_url: None,
    section: |endpoints| endpoints.bedrock.as_ref(),
};

pub struct FirstPartyInitializer {
    spec: FirstPartySpec,
    deps: InitializerDeps,
}

impl FirstPartyInitializer {
    pub fn new(spec: FirstPartySpec, deps: InitializerDeps) -> Self {
        Self { spec, deps }
    }
}

#[async_trait]
impl EndpointInitializer for FirstPartyInitializer {
    fn name(&self) -> &'static str {
        self.spec.provider
    }

    async fn initialize(&self, params: &InitializeParams) -> ProviderResult<ClientOptions> {
        let provider = self.spec.provider;
        let endpoints = &params.app_config.endpoints;
        let section = (self.spec.section)(endpoints).cloned().unwrap_or_default();

        let env_placeholder = format!("${{{}}}", self.spec.env_key);
        let api_key = section.api_key.as_deref().unwrap_or(&env_placeholder);
        let base_url = section.base_url.as_deref().or(self.spec.default_base_url);

        let credential = resolve_credentials(
            self.deps.credential_store.as_ref(),
            &params.request,
            CredentialSource {
                endpoint: provider,
                api_key: Some(api_key),
                base_url,
                require_base_url: false,
            },
        )
        .await?;

        let stream_rate = endpoints
            .all
            .as_ref()
            .and_then(|all| all.stream_rate)
            .or(section.stream_rate);

        let mut model_options = params.model_parameters.clone();
        model_options.insert(
            "user".to_string(),
            Value::String(params.request.user_id.clone()),
        );
        let options = CustomClientOptions {
            reverse_proxy_url: Some(credential.base_url.clone()).filter(|url| !url.is_empty()),
            proxy: self.deps.proxy.clone(),
            title_convo: section.title_convo,
            title_model: section.title_model.clone(),
            stream_rate,
            model_options,
            ..Default::default()
        };

        let mut client_options = self
            .deps
            .options_builder
            .build(&credential.api_key, options, provider)?;
        if let Some(rate) = stream_rate.filter(|rate| *rate > 0) {
            client_options.llm_config.stream_delay_ms = Some(rate);
        }
        if let Some(region) = section.region {
            client_options
                .llm_config
                .model_kwargs
                .insert("region".to_string(), Value::String(region));
        }

        info!(
            event = "first_party_ready",
            provider = %provider,
            user_scoped = credential.is_user_scoped()
        );
        Ok(client_options)
    }
}

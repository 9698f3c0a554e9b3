use std::sync::Arc;

use llmgate_provider_core::registry::{DEEPSEEK, OPENROUTER, XAI};
use llmgate_provider_core::{
    CredentialStore, EndpointInitializer, ModelFetcher, OptionsBuilder, ProviderConfigMap,
    TokenConfigStore,
};

use crate::providers::first_party::{
    ANTHROPIC_SPEC, AZURE_OPENAI_SPEC, BEDROCK_SPEC, GOOGLE_SPEC, OPENAI_SPEC,
};
use crate::providers::{CustomInitializer, FirstPartyInitializer};

/// Collaborators shared by every initializer.
#[derive(Clone)]
pub struct InitializerDeps {
    pub credential_store: Arc<dyn CredentialStore>,
    pub token_configs: TokenConfigStore,
    pub fetcher: Arc<dyn ModelFetcher>,
    pub options_builder: Arc<dyn OptionsBuilder>,
    /// Process-wide outbound proxy.
    pub proxy: Option<String>,
}

pub fn build_provider_map(deps: InitializerDeps) -> ProviderConfigMap {
    let custom: Arc<dyn EndpointInitializer> = Arc::new(CustomInitializer::new(deps.clone()));
    let mut map = ProviderConfigMap::new(custom.clone())
        .with(XAI, custom.clone())
        .with(DEEPSEEK, custom.clone())
        .with(OPENROUTER, custom);

    for spec in [
        OPENAI_SPEC,
        AZURE_OPENAI_SPEC,
        ANTHROPIC_SPEC,
        GOOGLE_SPEC,
        BEDROCK_SPEC,
    ] {
        map = map.with(
            spec.provider,
            Arc::new(FirstPartyInitializer::new(spec, deps.clone())),
        );
    }
    map
}

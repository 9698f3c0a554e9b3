use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::{AppConfig, EndpointConfig, get_custom_endpoint_config};
use crate::initializer::EndpointInitializer;
use crate::{ProviderError, ProviderResult};

pub const OPENAI: &str = "openAI";
pub const AZURE_OPENAI: &str = "azureOpenAI";
pub const ANTHROPIC: &str = "anthropic";
pub const GOOGLE: &str = "google";
pub const BEDROCK: &str = "bedrock";
pub const XAI: &str = "xai";
pub const DEEPSEEK: &str = "deepseek";
pub const OPENROUTER: &str = "openrouter";

/// Aggregators in the static map that still need an operator endpoint declaration.
pub const KNOWN_CUSTOM_PROVIDERS: [&str; 3] = [XAI, DEEPSEEK, OPENROUTER];

pub fn is_known_custom_provider(provider: &str) -> bool {
    let lower = provider.to_lowercase();
    KNOWN_CUSTOM_PROVIDERS.contains(&lower.as_str())
}

/// Outcome of [`ProviderConfigMap::get_provider_config`].
pub struct ProviderConfigResult<'a> {
    pub get_options: Arc<dyn EndpointInitializer>,
    /// Canonical provider name downstream builders should use.
    pub override_provider: String,
    pub custom_endpoint_config: Option<&'a EndpointConfig>,
}

impl fmt::Debug for ProviderConfigResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfigResult")
            .field("get_options", &self.get_options.name())
            .field("override_provider", &self.override_provider)
            .field(
                "custom_endpoint_config",
                &self.custom_endpoint_config.map(|config| config.name.as_str()),
            )
            .finish()
    }
}

/// Static provider to initializer table, built once at start-up.
pub struct ProviderConfigMap {
    initializers: HashMap<String, Arc<dyn EndpointInitializer>>,
    custom: Arc<dyn EndpointInitializer>,
}

impl ProviderConfigMap {
    /// `custom` handles identifiers that only match an operator endpoint declaration.
    pub fn new(custom: Arc<dyn EndpointInitializer>) -> Self {
        Self {
            initializers: HashMap::new(),
            custom,
        }
    }

    pub fn with(
        mut self,
        provider: impl Into<String>,
        initializer: Arc<dyn EndpointInitializer>,
    ) -> Self {
        self.initializers.insert(provider.into(), initializer);
        self
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn EndpointInitializer>> {
        self.initializers.get(provider).cloned()
    }

    pub fn custom_initializer(&self) -> Arc<dyn EndpointInitializer> {
        self.custom.clone()
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.initializers.keys().map(String::as_str)
    }

    /// Exact match, then lowercase match, then a custom endpoint named `provider`.
    pub fn get_provider_config<'a>(
        &self,
        provider: &str,
        app_config: &'a AppConfig,
    ) -> ProviderResult<ProviderConfigResult<'a>> {
        let mut override_provider = provider.to_string();
        let mut custom_endpoint_config = None;

        let mut get_options = self.initializers.get(provider).cloned();
        if get_options.is_some() {
            debug!(event = "provider_resolved_exact", provider = %provider);
        } else {
            let lower = provider.to_lowercase();
            if let Some(initializer) = self.initializers.get(&lower) {
                debug!(
                    event = "provider_resolved_lowercase",
                    provider = %provider,
                    override_provider = %lower
                );
                get_options = Some(initializer.clone());
                override_provider = lower;
            }
        }

        let get_options = match get_options {
            Some(initializer) => initializer,
            None => {
                let Some(config) = get_custom_endpoint_config(provider, app_config) else {
                    error!(event = "provider_unsupported", provider = %provider);
                    return Err(ProviderError::Unsupported(provider.to_string()));
                };
                info!(
                    event = "provider_resolved_custom",
                    provider = %provider,
                    base_url = %config.base_url.as_deref().unwrap_or_default()
                );
                custom_endpoint_config = Some(config);
                override_provider = OPENAI.to_string();
                self.custom.clone()
            }
        };

        if custom_endpoint_config.is_none() && is_known_custom_provider(&override_provider) {
            let Some(config) = get_custom_endpoint_config(provider, app_config) else {
                error!(
                    event = "known_custom_provider_unconfigured",
                    provider = %provider,
                    override_provider = %override_provider
                );
                return Err(ProviderError::Unsupported(provider.to_string()));
            };
            debug!(event = "known_custom_provider_config", provider = %provider);
            custom_endpoint_config = Some(config);
        }

        Ok(ProviderConfigResult {
            get_options,
            override_provider,
            custom_endpoint_config,
        })
    }
}

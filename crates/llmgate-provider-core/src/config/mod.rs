mod app_config;
mod token_config;

pub use app_config::{
    AllEndpointsConfig, AppConfig, EndpointConfig, EndpointsConfig, FirstPartyEndpointConfig,
    ModelsConfig, OLLAMA, get_custom_endpoint_config, normalize_endpoint_name,
};
pub use token_config::{EndpointTokenConfig, TokenLimits};

//! Built-in endpoint initializers, credential policy and model fetching.
//!
//! Network access goes through `UpstreamClient`; this crate never builds an HTTP
//! client itself.

mod credential;
mod models;
mod openai_config;
mod providers;
mod registry;

pub use credential::{CredentialSource, resolve_credentials};
pub use models::{
    DedupModelFetcher, FETCH_TOKEN_CONFIG, HttpModelFetcher, ModelData, ModelPricing,
    fetches_token_config, process_model_data,
};
pub use openai_config::OpenAiOptionsBuilder;
pub use providers::{CustomInitializer, FirstPartyInitializer, FirstPartySpec};
pub use registry::{InitializerDeps, build_provider_map};

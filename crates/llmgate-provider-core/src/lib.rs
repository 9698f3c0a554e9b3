//! Core provider abstractions for llmgate.
//!
//! This crate does not depend on a concrete HTTP client or database. Initializers,
//! fetchers and stores plug in through the traits defined here.

pub mod cache;
pub mod config;
pub mod credential;
pub mod errors;
pub mod events;
pub mod fetch;
pub mod headers;
pub mod http;
pub mod initializer;
pub mod options;
pub mod placeholder;
pub mod registry;

pub use cache::{Cache, MemoryCache, TOKEN_CONFIG_NAMESPACE, TokenConfigStore};
pub use config::{
    AppConfig, EndpointConfig, EndpointTokenConfig, TokenLimits, get_custom_endpoint_config,
};
pub use credential::{
    CredentialStore, MemoryCredentialStore, ResolvedCredential, StoreError, UserCredential,
    check_user_key_expiry, check_user_key_expiry_at,
};
pub use errors::{CredentialField, ProviderError, ProviderResult, UserKeyError};
pub use events::{Event, EventHub, EventSink, ModelFetchEvent, TerminalEventSink, UpstreamEvent};
pub use fetch::{FetchError, FetchModelsRequest, ModelFetcher};
pub use headers::{Headers, header_get, header_set};
pub use http::{
    ByteStream, HttpMethod, RequestInit, TransportError, TransportErrorKind, UpstreamBody,
    UpstreamClient, UpstreamHttpRequest, UpstreamHttpResponse,
};
pub use initializer::{EndpointInitializer, InitializeParams, RequestContext};
pub use options::{
    BehaviorOptions, ClientOptions, ConfigOptions, CustomClientOptions, FetchOptions, LlmConfig,
    OptionsBuilder,
};
pub use placeholder::{
    USER_PROVIDED, is_unresolved_placeholder, is_user_provided, resolve_placeholder,
    resolve_placeholder_with,
};
pub use registry::{ProviderConfigMap, ProviderConfigResult, is_known_custom_provider};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::ProviderResult;
use crate::config::AppConfig;
use crate::options::ClientOptions;

/// Caller facts an initializer may need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: String,
    /// Expiry the caller's session claims for its user-provided key.
    pub key_expires_at: Option<OffsetDateTime>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InitializeParams {
    pub request: RequestContext,
    /// Provider identifier as given by the caller.
    pub endpoint: String,
    pub model_parameters: Map<String, Value>,
    pub app_config: Arc<AppConfig>,
}

impl InitializeParams {
    pub fn new(
        request: RequestContext,
        endpoint: impl Into<String>,
        app_config: Arc<AppConfig>,
    ) -> Self {
        Self {
            request,
            endpoint: endpoint.into(),
            model_parameters: Map::new(),
            app_config,
        }
    }

    pub fn with_model_parameters(mut self, model_parameters: Map<String, Value>) -> Self {
        self.model_parameters = model_parameters;
        self
    }
}

/// Produces [`ClientOptions`] for one provider family.
#[async_trait]
pub trait EndpointInitializer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn initialize(&self, params: &InitializeParams) -> ProviderResult<ClientOptions>;
}

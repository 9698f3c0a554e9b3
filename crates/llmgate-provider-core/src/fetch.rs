use std::error::Error;
use std::fmt;

use async_trait::async_trait;

use crate::http::TransportError;

/// Inputs of one remote model/token lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchModelsRequest {
    pub api_key: String,
    pub base_url: String,
    /// Endpoint name as configured by the operator.
    pub name: String,
    pub user_id: Option<String>,
    /// Cache key the fetched [`crate::config::EndpointTokenConfig`] is written under.
    pub token_key: String,
}

/// Model-fetch failure. Never fatal to initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Transport(TransportError),
    Status { status: u16, body: String },
    Decode(String),
    Other(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(err) => write!(f, "model fetch transport failure: {err}"),
            FetchError::Status { status, body } => {
                write!(f, "model fetch returned status {status}: {body}")
            }
            FetchError::Decode(msg) => write!(f, "model list decode failed: {msg}"),
            FetchError::Other(msg) => f.write_str(msg),
        }
    }
}

impl Error for FetchError {}

impl From<TransportError> for FetchError {
    fn from(value: TransportError) -> Self {
        FetchError::Transport(value)
    }
}

/// Looks up a provider's models and writes the resulting token config to the cache.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    /// Returns the model ids the provider reported.
    async fn fetch_models(&self, request: FetchModelsRequest) -> Result<Vec<String>, FetchError>;
}

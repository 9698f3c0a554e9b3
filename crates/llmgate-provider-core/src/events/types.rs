use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::http::TransportErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Upstream(UpstreamEvent),
    Fetch(ModelFetchEvent),
}

/// One outbound provider call made through the instrumented transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamEvent {
    pub at: SystemTime,
    pub endpoint: String,
    pub request_method: String,
    pub request_url: String,
    pub has_body: bool,
    pub session_id_injected: bool,
    pub user_id_injected: bool,
    pub response_status: Option<u16>,
    pub content_type: Option<String>,
    pub duration_ms: u64,
    pub error_kind: Option<TransportErrorKind>,
    pub error_message: Option<String>,
}

/// Outcome of a remote model/token lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFetchEvent {
    pub at: SystemTime,
    pub endpoint: String,
    pub token_key: String,
    pub model_count: Option<usize>,
    pub error_message: Option<String>,
}

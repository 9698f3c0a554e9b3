//! Remote model listing and token metadata.

mod dedup;

pub use dedup::DedupModelFetcher;

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use async_trait::async_trait;
use llmgate_provider_core::registry::OPENROUTER;
use llmgate_provider_core::{
    EndpointTokenConfig, Event, EventHub, FetchError, FetchModelsRequest, HttpMethod,
    ModelFetchEvent, ModelFetcher, RequestInit, TokenConfigStore, TokenLimits, UpstreamBody,
    UpstreamClient,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

/// Providers whose model list carries token pricing worth caching.
pub const FETCH_TOKEN_CONFIG: &[&str] = &[OPENROUTER];

pub fn fetches_token_config(endpoint: &str) -> bool {
    let lower = endpoint.to_lowercase();
    FETCH_TOKEN_CONFIG.contains(&lower.as_str())
}

const OPENROUTER_AUTO: &str = "openrouter/auto";
const OPENROUTER_AUTO_PROMPT: f64 = 0.00001;
const OPENROUTER_AUTO_COMPLETION: f64 = 0.00003;
const PER_MILLION: f64 = 1_000_000.0;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelPricing {
    #[serde(default, deserialize_with = "price")]
    pub prompt: Option<f64>,
    #[serde(default, deserialize_with = "price")]
    pub completion: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelData {
    pub id: String,
    #[serde(default)]
    pub pricing: Option<ModelPricing>,
    #[serde(default)]
    pub context_length: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelData>,
}

/// OpenRouter reports prices as decimal strings.
fn price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Builds per-million-token pricing and context windows from a model list.
pub fn process_model_data(models: &[ModelData]) -> EndpointTokenConfig {
    let mut config = EndpointTokenConfig::new();
    for model in models {
        let (prompt, completion) = if model.id == OPENROUTER_AUTO {
            (Some(OPENROUTER_AUTO_PROMPT), Some(OPENROUTER_AUTO_COMPLETION))
        } else {
            let pricing = model.pricing.clone().unwrap_or_default();
            (pricing.prompt, pricing.completion)
        };
        config.insert(
            model.id.clone(),
            TokenLimits {
                prompt: prompt.map(|value| value * PER_MILLION),
                completion: completion.map(|value| value * PER_MILLION),
                context: model.context_length,
            },
        );
    }
    config
}

fn context_only(models: &[ModelData]) -> EndpointTokenConfig {
    models
        .iter()
        .map(|model| {
            (
                model.id.clone(),
                TokenLimits {
                    context: model.context_length,
                    ..Default::default()
                },
            )
        })
        .collect()
}

/// `GET {baseURL}/models` with bearer auth; writes the token config under `token_key`.
pub struct HttpModelFetcher {
    client: Arc<dyn UpstreamClient>,
    token_configs: TokenConfigStore,
    events: Option<EventHub>,
}

impl HttpModelFetcher {
    pub fn new(client: Arc<dyn UpstreamClient>, token_configs: TokenConfigStore) -> Self {
        Self {
            client,
            token_configs,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventHub) -> Self {
        self.events = Some(events);
        self
    }

    async fn fetch_list(&self, request: &FetchModelsRequest) -> Result<Vec<ModelData>, FetchError> {
        let url = format!("{}/models", request.base_url.trim_end_matches('/'));
        let mut init = RequestInit {
            method: HttpMethod::Get,
            ..Default::default()
        };
        init.headers.push((
            "authorization".to_string(),
            format!("Bearer {}", request.api_key),
        ));
        init.headers
            .push(("accept".to_string(), "application/json".to_string()));

        let response = self.client.send(init.into_request(url)).await?;
        let body = match response.body {
            UpstreamBody::Bytes(bytes) => bytes,
            UpstreamBody::Stream(_) => {
                return Err(FetchError::Other(
                    "model list returned a streamed body".to_string(),
                ));
            }
        };
        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status {
                status: response.status,
                body: String::from_utf8_lossy(&body).chars().take(200).collect(),
            });
        }
        let list: ModelList =
            serde_json::from_slice(&body).map_err(|err| FetchError::Decode(err.to_string()))?;
        Ok(list.data)
    }

    async fn emit(&self, request: &FetchModelsRequest, result: &Result<Vec<String>, FetchError>) {
        let Some(events) = &self.events else {
            return;
        };
        events
            .emit(Event::Fetch(ModelFetchEvent {
                at: SystemTime::now(),
                endpoint: request.name.clone(),
                token_key: request.token_key.clone(),
                model_count: result.as_ref().ok().map(Vec::len),
                error_message: result.as_ref().err().map(ToString::to_string),
            }))
            .await;
    }
}

#[async_trait]
impl ModelFetcher for HttpModelFetcher {
    async fn fetch_models(&self, request: FetchModelsRequest) -> Result<Vec<String>, FetchError> {
        let started = Instant::now();
        let result = match self.fetch_list(&request).await {
            Ok(models) => {
                let config = if request.name.eq_ignore_ascii_case(OPENROUTER) {
                    process_model_data(&models)
                } else {
                    context_only(&models)
                };
                self.token_configs.set(&request.token_key, &config).await;
                info!(
                    event = "model_fetch",
                    endpoint = %request.name,
                    models = models.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64
                );
                Ok(models.into_iter().map(|model| model.id).collect())
            }
            Err(err) => {
                warn!(
                    event = "model_fetch_failed",
                    endpoint = %request.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err
                );
                Err(err)
            }
        };
        self.emit(&request, &result).await;
        result
    }
}

//! Instrumented fetch for provider SDK calls.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, warn};

use llmgate_provider_core::{
    Event, EventHub, FetchOptions, RequestInit, TransportError, UpstreamBody, UpstreamClient,
    UpstreamEvent, UpstreamHttpRequest, UpstreamHttpResponse,
};

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

const PREVIEW_CHARS: usize = 100;

/// Wraps an [`UpstreamClient`] with URL override, chat body injection and call logging.
pub fn create_fetch(options: FetchOptions, client: Arc<dyn UpstreamClient>) -> InstrumentedFetch {
    InstrumentedFetch {
        options,
        client,
        events: None,
    }
}

#[derive(Clone)]
pub struct InstrumentedFetch {
    options: FetchOptions,
    client: Arc<dyn UpstreamClient>,
    events: Option<EventHub>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Injected {
    session_id: bool,
    user_id: bool,
}

impl InstrumentedFetch {
    pub fn with_events(mut self, events: EventHub) -> Self {
        self.events = Some(events);
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    pub async fn fetch(
        &self,
        url: &str,
        init: RequestInit,
    ) -> Result<UpstreamHttpResponse, TransportError> {
        let url = if self.options.direct_endpoint {
            self.options.reverse_proxy_url.clone()
        } else {
            url.to_string()
        };

        let mut request = init.into_request(url);
        let injected = self.inject_session_info(&mut request);
        let endpoint = self.options.endpoint.as_str();

        info!(
            event = "upstream_request",
            endpoint = %endpoint,
            method = %request.method.as_str(),
            has_body = request.body.is_some(),
            session_id_injected = injected.session_id,
            user_id_injected = injected.user_id
        );

        let started = Instant::now();
        let method = request.method;
        let request_url = request.url.clone();
        let has_body = request.body.is_some();
        let result = self.client.send(request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let mut event = UpstreamEvent {
            at: SystemTime::now(),
            endpoint: endpoint.to_string(),
            request_method: method.as_str().to_string(),
            request_url,
            has_body,
            session_id_injected: injected.session_id,
            user_id_injected: injected.user_id,
            response_status: None,
            content_type: None,
            duration_ms,
            error_kind: None,
            error_message: None,
        };

        match &result {
            Ok(response) => {
                info!(
                    event = "upstream_response",
                    endpoint = %endpoint,
                    status = response.status,
                    duration_ms,
                    content_type = %response.content_type().unwrap_or("-")
                );
                event.response_status = Some(response.status);
                event.content_type = response.content_type().map(ToString::to_string);
                if response.is_success()
                    && !endpoint.is_empty()
                    && event.request_url.contains(CHAT_COMPLETIONS_PATH)
                    && let UpstreamBody::Bytes(body) = &response.body
                {
                    log_chat_summary(endpoint, body.clone());
                }
            }
            Err(err) => {
                warn!(
                    event = "upstream_failed",
                    endpoint = %endpoint,
                    duration_ms,
                    kind = %err.kind.as_str(),
                    error = %err
                );
                event.error_kind = Some(err.kind);
                event.error_message = Some(err.message.clone());
            }
        }

        if let Some(events) = &self.events {
            events.emit(Event::Upstream(event)).await;
        }
        result
    }

    fn inject_session_info(&self, request: &mut UpstreamHttpRequest) -> Injected {
        let session_id = self.options.session_id.as_deref();
        let user_id = self.options.user_id.as_deref();
        if (session_id.is_none() && user_id.is_none())
            || !request.url.contains(CHAT_COMPLETIONS_PATH)
        {
            return Injected::default();
        }
        let Some(body) = request.body.as_ref() else {
            return Injected::default();
        };

        let mut payload = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(
                    event = "session_injection_skipped",
                    endpoint = %self.options.endpoint,
                    reason = "body is not a JSON object"
                );
                return Injected::default();
            }
            Err(err) => {
                warn!(
                    event = "session_injection_skipped",
                    endpoint = %self.options.endpoint,
                    error = %err
                );
                return Injected::default();
            }
        };

        let mut injected = Injected::default();
        if let Some(session_id) = session_id {
            payload.insert(
                "session_id".to_string(),
                Value::String(session_id.to_string()),
            );
            injected.session_id = true;
        }
        if let Some(user_id) = user_id {
            payload.insert("user_id".to_string(), Value::String(user_id.to_string()));
            injected.user_id = true;
        }
        match serde_json::to_vec(&Value::Object(payload)) {
            Ok(encoded) => {
                request.body = Some(Bytes::from(encoded));
                injected
            }
            Err(err) => {
                warn!(
                    event = "session_injection_skipped",
                    endpoint = %self.options.endpoint,
                    error = %err
                );
                Injected::default()
            }
        }
    }
}

/// Shape of a buffered chat completion, for logs only.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChatSummary {
    pub has_choices: bool,
    pub choice_count: usize,
    pub has_message: bool,
    pub preview: Option<String>,
    pub usage: Option<Value>,
}

pub fn summarize_chat_response(body: &[u8]) -> Option<ChatSummary> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let choices = value.get("choices").and_then(Value::as_array);
    let message = choices
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"));
    Some(ChatSummary {
        has_choices: choices.is_some(),
        choice_count: choices.map(Vec::len).unwrap_or(0),
        has_message: message.is_some(),
        preview: message
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(|content| content.chars().take(PREVIEW_CHARS).collect()),
        usage: value.get("usage").cloned(),
    })
}

fn log_chat_summary(endpoint: &str, body: Bytes) {
    let Some(summary) = summarize_chat_response(&body) else {
        warn!(event = "chat_summary_unparsed", endpoint = %endpoint, bytes = body.len());
        return;
    };
    debug!(
        event = "chat_summary",
        endpoint = %endpoint,
        has_choices = summary.has_choices,
        choices = summary.choice_count,
        has_message = summary.has_message,
        preview = %summary.preview.as_deref().unwrap_or("-"),
        usage = %summary.usage.map(|usage| usage.to_string()).unwrap_or_default()
    );
}

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use llmgate_core::create_fetch;
use llmgate_provider_core::{
    Event, EventHub, FetchOptions, RequestInit, TransportError, TransportErrorKind, UpstreamBody,
    UpstreamClient, UpstreamHttpRequest, UpstreamHttpResponse,
};
use serde_json::{Value, json};
use tracing::Level;

#[derive(Default)]
struct RecordingClient {
    fail: Option<TransportError>,
    seen: Mutex<Vec<UpstreamHttpRequest>>,
}

impl RecordingClient {
    fn failing(kind: TransportErrorKind, message: &str) -> Self {
        Self {
            fail: Some(TransportError::new(kind, message)),
            ..Default::default()
        }
    }

    fn last(&self) -> UpstreamHttpRequest {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }
}

impl UpstreamClient for RecordingClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, TransportError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.seen.lock().unwrap().push(req);
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            let body = json!({
                "choices": [{ "message": { "role": "assistant", "content": "hello" } }],
                "usage": { "total_tokens": 7 }
            });
            Ok(UpstreamHttpResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: UpstreamBody::Bytes(Bytes::from(serde_json::to_vec(&body).unwrap())),
            })
        })
    }
}

fn options() -> FetchOptions {
    FetchOptions {
        reverse_proxy_url: "https://api.example/v1".to_string(),
        endpoint: "Mistral".to_string(),
        ..Default::default()
    }
}

fn body_json(req: &UpstreamHttpRequest) -> Value {
    serde_json::from_slice(req.body.as_ref().unwrap()).unwrap()
}

#[tokio::test]
async fn direct_endpoint_overrides_every_url() {
    let client = Arc::new(RecordingClient::default());
    let fetch = create_fetch(
        FetchOptions {
            direct_endpoint: true,
            reverse_proxy_url: "https://proxy.example/v1".to_string(),
            ..options()
        },
        client.clone(),
    );

    for url in [
        "https://api.example/v1/chat/completions",
        "https://api.example/v1/models",
    ] {
        fetch.fetch(url, RequestInit::default()).await.unwrap();
        assert_eq!(client.last().url, "https://proxy.example/v1");
    }
}

#[tokio::test]
async fn session_id_is_injected_into_chat_bodies() {
    let client = Arc::new(RecordingClient::default());
    let fetch = create_fetch(
        FetchOptions {
            session_id: Some("s1".to_string()),
            ..options()
        },
        client.clone(),
    );

    let response = fetch
        .fetch(
            "https://api.example/v1/chat/completions",
            RequestInit::post_json(r#"{"model":"x"}"#),
        )
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(
        body_json(&client.last()),
        json!({ "model": "x", "session_id": "s1" })
    );
}

#[tokio::test]
async fn user_id_is_injected_alongside_session_id() {
    let client = Arc::new(RecordingClient::default());
    let fetch = create_fetch(
        FetchOptions {
            session_id: Some("s1".to_string()),
            user_id: Some("u1".to_string()),
            ..options()
        },
        client.clone(),
    );

    fetch
        .fetch(
            "https://api.example/v1/chat/completions",
            RequestInit::post_json(r#"{"model":"x"}"#),
        )
        .await
        .unwrap();
    assert_eq!(
        body_json(&client.last()),
        json!({ "model": "x", "session_id": "s1", "user_id": "u1" })
    );
}

#[tokio::test]
async fn other_urls_and_bad_bodies_are_untouched() {
    let client = Arc::new(RecordingClient::default());
    let fetch = create_fetch(
        FetchOptions {
            session_id: Some("s1".to_string()),
            ..options()
        },
        client.clone(),
    );

    fetch
        .fetch(
            "https://api.example/v1/embeddings",
            RequestInit::post_json(r#"{"model":"x"}"#),
        )
        .await
        .unwrap();
    assert_eq!(body_json(&client.last()), json!({ "model": "x" }));

    fetch
        .fetch(
            "https://api.example/v1/chat/completions",
            RequestInit::post_json("not json"),
        )
        .await
        .unwrap();
    assert_eq!(
        client.last().body.unwrap(),
        Bytes::from_static(b"not json")
    );

    fetch
        .fetch(
            "https://api.example/v1/chat/completions",
            RequestInit::post_json("[1,2]"),
        )
        .await
        .unwrap();
    assert_eq!(client.last().body.unwrap(), Bytes::from_static(b"[1,2]"));
}

#[tokio::test]
async fn transport_failures_propagate_and_emit_events() {
    let client = Arc::new(RecordingClient::failing(
        TransportErrorKind::Connect,
        "connection refused",
    ));
    let events = EventHub::new(16);
    let mut rx = events.subscribe();
    let fetch = create_fetch(options(), client.clone()).with_events(events);

    let err = fetch
        .fetch(
            "https://api.example/v1/chat/completions?key=secret",
            RequestInit::post_json(r#"{"model":"x"}"#),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportErrorKind::Connect);
    assert_eq!(client.seen.lock().unwrap().len(), 1);

    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let Event::Upstream(upstream) = event else {
        panic!("expected upstream event");
    };
    assert_eq!(upstream.endpoint, "Mistral");
    assert_eq!(upstream.request_method, "POST");
    assert_eq!(
        upstream.request_url,
        "https://api.example/v1/chat/completions"
    );
    assert_eq!(upstream.response_status, None);
    assert_eq!(upstream.error_kind, Some(TransportErrorKind::Connect));
}

#[tokio::test]
async fn successful_calls_record_status_and_content_type() {
    let client = Arc::new(RecordingClient::default());
    let events = EventHub::new(16);
    let mut rx = events.subscribe();
    let fetch = create_fetch(
        FetchOptions {
            user_id: Some("u1".to_string()),
            ..options()
        },
        client.clone(),
    )
    .with_events(events);

    let response = fetch
        .fetch(
            "https://api.example/v1/chat/completions",
            RequestInit::post_json(r#"{"model":"x"}"#),
        )
        .await
        .unwrap();
    let UpstreamBody::Bytes(body) = response.body else {
        panic!("expected buffered body");
    };
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["choices"][0]["message"]["content"], "hello");

    let Event::Upstream(upstream) = rx.recv().await.unwrap() else {
        panic!("expected upstream event");
    };
    assert_eq!(upstream.response_status, Some(200));
    assert_eq!(upstream.content_type.as_deref(), Some("application/json"));
    assert!(!upstream.session_id_injected);
    assert!(upstream.user_id_injected);
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn chat_call_logs(level: Level) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let fetch = create_fetch(options(), Arc::new(RecordingClient::default()));
    fetch
        .fetch(
            "https://api.example/v1/chat/completions",
            RequestInit::post_json(r#"{"model":"x"}"#),
        )
        .await
        .unwrap();
    logs.text()
}

#[tokio::test]
async fn chat_summary_is_debug_only() {
    let info = chat_call_logs(Level::INFO).await;
    assert!(info.contains("upstream_response"));
    assert!(!info.contains("chat_summary"));

    let debug = chat_call_logs(Level::DEBUG).await;
    assert!(debug.contains("chat_summary"));
}

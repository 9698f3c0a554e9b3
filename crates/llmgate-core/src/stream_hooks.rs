//! Per-token pacing and stream-event forwarding for streamed completions.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

pub const ON_RUN_STEP: &str = "on_run_step";
pub const ON_MESSAGE_DELTA: &str = "on_message_delta";
pub const ON_REASONING_DELTA: &str = "on_reasoning_delta";

pub type NewTokenHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;
pub type StreamEventHandler = Arc<dyn Fn(GraphEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Sleeps `stream_rate_ms` before each emitted token. Zero disables the delay.
pub fn create_handle_llm_new_token(stream_rate_ms: u64) -> NewTokenHook {
    let delay = Duration::from_millis(stream_rate_ms);
    Arc::new(move || {
        if delay.is_zero() {
            async {}.boxed()
        } else {
            tokio::time::sleep(delay).boxed()
        }
    })
}

/// One event from the agent graph, forwarded verbatim to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEvent {
    pub event: String,
    pub data: Value,
}

impl GraphEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkClosed;

/// Where server-sent frames go. The HTTP layer owns the other end.
pub trait ResponseSink: Send + Sync {
    fn write_frame<'a>(
        &'a self,
        frame: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkClosed>> + Send + 'a>>;
}

/// Channel-backed sink; the receiver side feeds the response body.
#[derive(Clone)]
pub struct SseResponseSink {
    tx: mpsc::Sender<Bytes>,
}

impl SseResponseSink {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl ResponseSink for SseResponseSink {
    fn write_frame<'a>(
        &'a self,
        frame: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkClosed>> + Send + 'a>> {
        Box::pin(async move { self.tx.send(frame).await.map_err(|_| SinkClosed) })
    }
}

pub fn encode_message_frame(event: &GraphEvent) -> Result<Bytes, serde_json::Error> {
    let data = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("event: message\ndata: {data}\n\n")))
}

/// Writes `event` as a `message` frame. A closed sink is not an error for the caller.
pub async fn forward_stream_event(sink: &dyn ResponseSink, event: &GraphEvent) {
    let frame = match encode_message_frame(event) {
        Ok(frame) => frame,
        Err(err) => {
            debug!(event = "stream_event_encode_failed", kind = %event.event, error = %err);
            return;
        }
    };
    if sink.write_frame(frame).await.is_err() {
        debug!(event = "stream_sink_closed", kind = %event.event);
    }
}

/// Handlers for the graph events clients render live.
pub fn create_stream_event_handlers(
    sink: Option<Arc<dyn ResponseSink>>,
) -> HashMap<&'static str, StreamEventHandler> {
    [ON_RUN_STEP, ON_MESSAGE_DELTA, ON_REASONING_DELTA]
        .into_iter()
        .map(|name| {
            let sink = sink.clone();
            let handler: StreamEventHandler = Arc::new(move |event: GraphEvent| {
                let sink = sink.clone();
                async move {
                    if let Some(sink) = sink {
                        forward_stream_event(sink.as_ref(), &event).await;
                    }
                }
                .boxed()
            });
            (name, handler)
        })
        .collect()
}

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use super::types::Event;

pub trait EventSink: Send + Sync {
    fn write<'a>(&'a self, event: &'a Event) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Broadcast channel plus fire-and-forget sink fan-out.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<Inner>,
}

struct Inner {
    tx: broadcast::Sender<Event>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    redact_sensitive: bool,
}

impl EventHub {
    pub fn new(buffer: usize) -> Self {
        Self::with_redaction(buffer, true)
    }

    /// With `redact_sensitive`, URL queries and user-scoped token keys are redacted.
    pub fn with_redaction(buffer: usize, redact_sensitive: bool) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                tx,
                sinks: RwLock::new(Vec::new()),
                redact_sensitive,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.tx.subscribe()
    }

    pub async fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.inner.sinks.write().await.push(sink);
    }

    pub async fn emit(&self, event: Event) {
        let event = if self.inner.redact_sensitive {
            redact(event)
        } else {
            event
        };
        let _ = self.inner.tx.send(event.clone());
        let sinks = self.inner.sinks.read().await.clone();
        for sink in sinks {
            let event = event.clone();
            tokio::spawn(async move {
                sink.write(&event).await;
            });
        }
    }
}

const REDACTED: &str = "<redacted>";

fn redact(event: Event) -> Event {
    match event {
        Event::Upstream(mut upstream) => {
            if let Some(idx) = upstream.request_url.find('?') {
                upstream.request_url.truncate(idx);
            }
            upstream.error_message = upstream.error_message.map(|msg| strip_url_queries(&msg));
            Event::Upstream(upstream)
        }
        Event::Fetch(mut fetch) => {
            if let Some((endpoint, _user)) = fetch.token_key.split_once(':') {
                fetch.token_key = format!("{endpoint}:{REDACTED}");
            }
            fetch.error_message = fetch.error_message.map(|msg| strip_url_queries(&msg));
            Event::Fetch(fetch)
        }
    }
}

/// Drops the query part of every URL embedded in free text, e.g. transport error messages.
fn strip_url_queries(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, word) in text.split(char::is_whitespace).enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        let query_start = word
            .find("://")
            .and_then(|scheme| word[scheme..].find('?').map(|q| scheme + q));
        let Some(start) = query_start else {
            out.push_str(word);
            continue;
        };
        let end = word[start..]
            .find(['"', '\'', ')', '>', ']'])
            .map_or(word.len(), |off| start + off);
        out.push_str(&word[..start]);
        out.push_str(&word[end..]);
    }
    out
}

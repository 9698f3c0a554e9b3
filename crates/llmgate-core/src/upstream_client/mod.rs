use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use tracing::warn;
use wreq::{Client, Method, Proxy};

use llmgate_common::GlobalConfig;
use llmgate_provider_core::{
    Headers, HttpMethod, TransportError, TransportErrorKind, UpstreamBody, UpstreamClient,
    UpstreamHttpRequest, UpstreamHttpResponse,
};

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub stream_idle_timeout: Duration,
}

impl UpstreamClientConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            proxy: global.proxy.clone(),
            ..Default::default()
        }
    }
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(86400),
            stream_idle_timeout: Duration::from_secs(30),
        }
    }
}

/// `wreq` transport. Clients are cached per outbound proxy and shared between clones.
#[derive(Clone)]
pub struct WreqUpstreamClient {
    config: UpstreamClientConfig,
    proxy: Option<String>,
    clients: Arc<Mutex<HashMap<Option<String>, Client>>>,
}

impl WreqUpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, TransportError> {
        let proxy = normalize_proxy(config.proxy.clone());
        let client = build_client(&config, proxy.as_deref()).map_err(map_wreq_error)?;
        let mut clients = HashMap::new();
        clients.insert(proxy.clone(), client);
        Ok(Self {
            config,
            proxy,
            clients: Arc::new(Mutex::new(clients)),
        })
    }

    /// Same client pool, routed through `proxy` (or the configured default when `None`).
    pub fn with_proxy(&self, proxy: Option<String>) -> Result<Self, TransportError> {
        let proxy = normalize_proxy(proxy).or_else(|| normalize_proxy(self.config.proxy.clone()));
        let scoped = Self {
            config: self.config.clone(),
            proxy,
            clients: self.clients.clone(),
        };
        scoped.client()?;
        Ok(scoped)
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    fn client(&self) -> Result<Client, TransportError> {
        let mut guard = self.clients.lock().map_err(|_| {
            TransportError::new(
                TransportErrorKind::Other,
                "upstream client cache lock failed",
            )
        })?;
        if let Some(client) = guard.get(&self.proxy) {
            return Ok(client.clone());
        }
        let client = build_client(&self.config, self.proxy.as_deref()).map_err(map_wreq_error)?;
        guard.insert(self.proxy.clone(), client.clone());
        Ok(client)
    }
}

fn normalize_proxy(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

fn build_client(config: &UpstreamClientConfig, proxy: Option<&str>) -> Result<Client, wreq::Error> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .read_timeout(config.stream_idle_timeout);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, TransportError>> + Send + 'a>>
    {
        Box::pin(async move {
            let client = self.client()?;
            let mut builder = client.request(http_method_to_wreq(req.method), &req.url);

            for (k, v) in &req.headers {
                builder = builder.header(k, v);
            }

            if let Some(body) = req.body {
                builder = builder.body(body);
            }

            let resp = builder.send().await.map_err(map_wreq_error)?;
            convert_response(resp, req.is_stream, self.config.stream_idle_timeout).await
        })
    }
}

fn http_method_to_wreq(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

async fn convert_response(
    resp: wreq::Response,
    want_stream: bool,
    stream_idle_timeout: Duration,
) -> Result<UpstreamHttpResponse, TransportError> {
    let status = resp.status().as_u16();
    let headers = headers_from_wreq(resp.headers());

    let is_success = (200..300).contains(&status);
    if !is_success || !want_stream {
        let body = resp.bytes().await.map_err(map_wreq_error)?;
        return Ok(UpstreamHttpResponse {
            status,
            headers,
            body: UpstreamBody::Bytes(body),
        });
    }

    let (tx, rx) = tokio::sync::mpsc::channel::<Bytes>(16);
    tokio::spawn(async move {
        let mut stream = resp.bytes_stream();
        loop {
            let item = match tokio::time::timeout(stream_idle_timeout, stream.next()).await {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(err))) => {
                    warn!(event = "upstream_stream_error", error = %err);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        event = "upstream_stream_idle",
                        idle_secs = stream_idle_timeout.as_secs()
                    );
                    break;
                }
            };
            if tx.send(item).await.is_err() {
                break;
            }
        }
    });

    Ok(UpstreamHttpResponse {
        status,
        headers,
        body: UpstreamBody::Stream(rx),
    })
}

fn headers_from_wreq(map: &wreq::header::HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|value| (k.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn map_wreq_error(err: wreq::Error) -> TransportError {
    TransportError::new(classify_wreq_error(&err), err.to_string())
}

fn classify_wreq_error(err: &wreq::Error) -> TransportErrorKind {
    let message = err.to_string().to_ascii_lowercase();
    if err.is_timeout() {
        if message.contains("read") || message.contains("idle") {
            return TransportErrorKind::ReadTimeout;
        }
        return TransportErrorKind::Timeout;
    }
    if err.is_connect() {
        if message.contains("dns") || message.contains("resolve") {
            return TransportErrorKind::Dns;
        }
        if message.contains("tls") || message.contains("ssl") {
            return TransportErrorKind::Tls;
        }
        return TransportErrorKind::Connect;
    }
    if err.is_connection_reset() {
        return TransportErrorKind::Connect;
    }
    if message.contains("tls") || message.contains("ssl") {
        return TransportErrorKind::Tls;
    }
    TransportErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_proxy_is_ignored() {
        assert_eq!(normalize_proxy(Some("  ".to_string())), None);
        assert_eq!(
            normalize_proxy(Some(" http://127.0.0.1:8080 ".to_string())).as_deref(),
            Some("http://127.0.0.1:8080")
        );
    }

    #[test]
    fn scoped_proxy_falls_back_to_default() {
        let client = WreqUpstreamClient::new(UpstreamClientConfig {
            proxy: Some("http://127.0.0.1:3128".to_string()),
            ..Default::default()
        })
        .unwrap();
        let scoped = client.with_proxy(None).unwrap();
        assert_eq!(scoped.proxy(), Some("http://127.0.0.1:3128"));
        let scoped = client
            .with_proxy(Some("http://127.0.0.1:8080".to_string()))
            .unwrap();
        assert_eq!(scoped.proxy(), Some("http://127.0.0.1:8080"));
        assert_eq!(client.clients.lock().unwrap().len(), 2);
    }
}

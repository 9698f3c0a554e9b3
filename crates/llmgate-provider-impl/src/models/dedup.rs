use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use llmgate_provider_core::{FetchError, FetchModelsRequest, ModelFetcher};
use tracing::debug;

type PendingFetch = Shared<BoxFuture<'static, Result<Vec<String>, FetchError>>>;

/// Joins concurrent fetches for the same token key onto one upstream call.
pub struct DedupModelFetcher {
    inner: Arc<dyn ModelFetcher>,
    in_flight: Mutex<HashMap<String, (u64, PendingFetch)>>,
    next_id: AtomicU64,
}

impl DedupModelFetcher {
    pub fn new(inner: Arc<dyn ModelFetcher>) -> Self {
        Self {
            inner,
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelFetcher for DedupModelFetcher {
    async fn fetch_models(&self, request: FetchModelsRequest) -> Result<Vec<String>, FetchError> {
        let key = request.token_key.clone();
        let (id, pending) = {
            let mut guard = self
                .in_flight
                .lock()
                .map_err(|_| FetchError::Other("model fetch registry lock failed".to_string()))?;
            match guard.get(&key) {
                Some((id, pending)) => {
                    debug!(event = "model_fetch_joined", token_key = %key);
                    (*id, pending.clone())
                }
                None => {
                    let inner = self.inner.clone();
                    let pending = async move { inner.fetch_models(request).await }
                        .boxed()
                        .shared();
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    guard.insert(key.clone(), (id, pending.clone()));
                    (id, pending)
                }
            }
        };

        let result = pending.await;

        if let Ok(mut guard) = self.in_flight.lock()
            && guard.get(&key).is_some_and(|(current, _)| *current == id)
        {
            guard.remove(&key);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;

    struct SlowFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelFetcher for SlowFetcher {
        async fn fetch_models(
            &self,
            request: FetchModelsRequest,
        ) -> Result<Vec<String>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec![request.token_key])
        }
    }

    fn request(token_key: &str) -> FetchModelsRequest {
        FetchModelsRequest {
            api_key: "sk".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            name: "OpenRouter".to_string(),
            user_id: None,
            token_key: token_key.to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_fetches_share_one_call() {
        let inner = Arc::new(SlowFetcher {
            calls: AtomicUsize::new(0),
        });
        let fetcher = Arc::new(DedupModelFetcher::new(inner.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let fetcher = fetcher.clone();
            handles.push(tokio::spawn(async move {
                fetcher.fetch_models(request("OpenRouter")).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec!["OpenRouter".to_string()]);
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.in_flight(), 0);

        fetcher.fetch_models(request("OpenRouter")).await.unwrap();
        fetcher.fetch_models(request("OpenRouter:u1")).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}

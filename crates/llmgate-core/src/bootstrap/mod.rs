use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use llmgate_common::{GlobalConfig, GlobalConfigPatch};
use llmgate_provider_core::{
    AppConfig, ClientOptions, CredentialStore, EventHub, InitializeParams, MemoryCache,
    MemoryCredentialStore, ProviderConfigMap, ProviderResult, RequestContext, TerminalEventSink,
    TokenConfigStore, UpstreamClient,
};
use llmgate_provider_impl::{
    DedupModelFetcher, HttpModelFetcher, InitializerDeps, OpenAiOptionsBuilder, build_provider_map,
};
use llmgate_storage::SeaOrmCredentialStore;

use crate::transport::{InstrumentedFetch, create_fetch};
use crate::upstream_client::{UpstreamClientConfig, WreqUpstreamClient};

const EVENT_BUFFER: usize = 1024;

/// Process-wide settings. Each flag falls back to its `LLMGATE_*` variable.
#[derive(Debug, Clone, Default, Args)]
pub struct CliArgs {
    /// Application config (JSON) declaring custom and first-party endpoints.
    #[arg(long, env = "LLMGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credential store DSN. Without one, user credentials live in memory.
    #[arg(long, env = "LLMGATE_DSN")]
    pub dsn: Option<String>,

    /// Optional outbound proxy for upstream requests. `PROXY` is honored too.
    #[arg(long, env = "LLMGATE_PROXY")]
    pub proxy: Option<String>,

    /// Seconds fetched token metadata stays cached.
    #[arg(long, env = "LLMGATE_TOKEN_CONFIG_TTL_SECS")]
    pub token_config_ttl_secs: Option<String>,

    /// Redact URL queries and user ids from emitted events.
    #[arg(long, env = "LLMGATE_EVENT_REDACT_SENSITIVE")]
    pub event_redact_sensitive: Option<String>,

    /// Print structured events to stderr.
    #[arg(long, env = "LLMGATE_EVENTS")]
    pub events: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializedClient {
    /// Provider family downstream builders should use.
    pub override_provider: String,
    pub options: ClientOptions,
}

/// Everything an initializer run needs, built once at start-up.
pub struct Bootstrap {
    pub global: GlobalConfig,
    pub app_config: Arc<AppConfig>,
    pub events: EventHub,
    pub client: WreqUpstreamClient,
    pub token_configs: TokenConfigStore,
    pub credential_store: Arc<dyn CredentialStore>,
    pub credential_db: Option<Arc<SeaOrmCredentialStore>>,
    pub provider_map: Arc<ProviderConfigMap>,
}

pub async fn bootstrap(args: CliArgs) -> anyhow::Result<Bootstrap> {
    let cli_patch = GlobalConfigPatch {
        proxy: sanitize_optional_env_value(args.proxy.clone()),
        dsn: sanitize_optional_env_value(args.dsn.clone()),
        token_config_ttl_secs: parse_u64_env_value(
            args.token_config_ttl_secs.clone(),
            "LLMGATE_TOKEN_CONFIG_TTL_SECS",
        )?,
        event_redact_sensitive: parse_bool_env_value(
            args.event_redact_sensitive.clone(),
            "LLMGATE_EVENT_REDACT_SENSITIVE",
        )?,
    };

    // clap already applies CLI > ENV per field; `PROXY` sits below both.
    let mut merged = GlobalConfigPatch {
        proxy: sanitize_optional_env_value(std::env::var("PROXY").ok()),
        ..Default::default()
    };
    merged.overlay(cli_patch);
    let global = merged
        .into_config()
        .context("finalize merged global config")?;

    let app_config = match args.config.as_ref() {
        Some(path) => load_app_config(path)?,
        None => AppConfig::default(),
    };

    let credential_db = match &global.dsn {
        Some(dsn) => {
            ensure_sqlite_parent_dir(dsn)?;
            let store = SeaOrmCredentialStore::connect(dsn)
                .await
                .context("connect credential store")?;
            store.sync().await.context("schema sync")?;
            Some(Arc::new(store))
        }
        None => None,
    };
    let credential_store: Arc<dyn CredentialStore> = match &credential_db {
        Some(store) => store.clone(),
        None => Arc::new(MemoryCredentialStore::new()),
    };

    let events = EventHub::with_redaction(EVENT_BUFFER, global.event_redact_sensitive);
    if args.events {
        events.add_sink(Arc::new(TerminalEventSink::new())).await;
    }

    let client = WreqUpstreamClient::new(UpstreamClientConfig::from_global(&global))
        .context("build upstream client")?;
    let token_configs =
        TokenConfigStore::new(Arc::new(MemoryCache::new()), global.token_config_ttl());
    let fetcher = HttpModelFetcher::new(Arc::new(client.clone()), token_configs.clone())
        .with_events(events.clone());

    let provider_map = build_provider_map(InitializerDeps {
        credential_store: credential_store.clone(),
        token_configs: token_configs.clone(),
        fetcher: Arc::new(DedupModelFetcher::new(Arc::new(fetcher))),
        options_builder: Arc::new(OpenAiOptionsBuilder::new()),
        proxy: global.proxy.clone(),
    });

    info!(
        event = "bootstrap_ready",
        custom_endpoints = app_config.endpoints.custom.len(),
        persistent_credentials = credential_db.is_some(),
        token_config_ttl_secs = global.token_config_ttl_secs,
        has_proxy = global.proxy.is_some()
    );

    Ok(Bootstrap {
        global,
        app_config: Arc::new(app_config),
        events,
        client,
        token_configs,
        credential_store,
        credential_db,
        provider_map: Arc::new(provider_map),
    })
}

impl Bootstrap {
    /// Resolves `provider` and runs its initializer for one request.
    pub async fn initialize(
        &self,
        provider: &str,
        request: RequestContext,
        model_parameters: Map<String, Value>,
    ) -> ProviderResult<InitializedClient> {
        let resolved = self
            .provider_map
            .get_provider_config(provider, &self.app_config)?;
        let params = InitializeParams::new(request, provider, self.app_config.clone())
            .with_model_parameters(model_parameters);
        let options = resolved.get_options.initialize(&params).await?;
        Ok(InitializedClient {
            override_provider: resolved.override_provider,
            options,
        })
    }

    /// Instrumented transport for calls made with `options`.
    pub fn fetch_for(&self, options: &ClientOptions) -> anyhow::Result<InstrumentedFetch> {
        let client: Arc<dyn UpstreamClient> = Arc::new(
            self.client
                .with_proxy(options.config_options.proxy.clone())
                .context("build proxied upstream client")?,
        );
        Ok(create_fetch(options.fetch_options(), client).with_events(self.events.clone()))
    }
}

pub fn load_app_config(path: &Path) -> anyhow::Result<AppConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read app config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse app config {}", path.display()))
}

fn sanitize_optional_env_value(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    // Some PaaS systems may inject unresolved placeholders like `${VAR}`.
    if trimmed.starts_with("${") && trimmed.ends_with('}') {
        return None;
    }
    Some(trimmed)
}

fn ensure_sqlite_parent_dir(dsn: &str) -> anyhow::Result<()> {
    let Some(db_path) = sqlite_file_path_from_dsn(dsn) else {
        return Ok(());
    };
    let Some(parent) = db_path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    std::fs::create_dir_all(parent)
        .with_context(|| format!("create sqlite parent dir {}", parent.display()))?;
    Ok(())
}

fn sqlite_file_path_from_dsn(dsn: &str) -> Option<PathBuf> {
    let rest = dsn.strip_prefix("sqlite:")?;
    let path_part = rest.split(['?', '#']).next()?.trim();
    if path_part.is_empty() {
        return None;
    }

    let mut normalized = path_part;
    if let Some(stripped) = normalized.strip_prefix("//") {
        normalized = stripped;
    }

    if normalized.eq_ignore_ascii_case(":memory:") {
        return None;
    }

    Some(PathBuf::from(normalized))
}

fn parse_u64_env_value(value: Option<String>, env_name: &str) -> anyhow::Result<Option<u64>> {
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = raw
        .parse::<u64>()
        .with_context(|| format!("invalid {env_name} value: {raw}"))?;
    Ok(Some(parsed))
}

fn parse_bool_env_value(value: Option<String>, env_name: &str) -> anyhow::Result<Option<bool>> {
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => return Err(anyhow::anyhow!("invalid {env_name} value: {raw}")),
    };
    Ok(Some(parsed))
}

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use llmgate_core::{Bootstrap, bootstrap};
use llmgate_provider_core::{ProviderError, RequestContext, UserCredential};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{Cli, Command, InitArgs, StoreKeyArgs};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("llmgate failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("llmgate=info,sqlx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let boot = bootstrap(cli.global).await?;
    match cli.command {
        Command::Init(args) => init(&boot, args).await,
        Command::StoreKey(args) => store_key(&boot, args).await,
        Command::Providers => {
            list_providers(&boot);
            Ok(())
        }
    }
}

async fn init(boot: &Bootstrap, args: InitArgs) -> anyhow::Result<()> {
    let request = RequestContext {
        user_id: args.user_id.clone(),
        key_expires_at: args.expires_at,
        session_id: args.session_id.clone(),
    };
    let initialized = match boot
        .initialize(&args.provider, request, args.model_parameters())
        .await
    {
        Ok(initialized) => initialized,
        Err(ProviderError::UserKey(user_key)) => {
            // Clients parse this payload to prompt for a fresh key.
            println!("{}", serde_json::to_string(&user_key)?);
            anyhow::bail!("user key required for {}", args.provider);
        }
        Err(err) => return Err(err.into()),
    };

    let fetch = boot.fetch_for(&initialized.options)?;
    info!(
        event = "client_options_ready",
        provider = %args.provider,
        override_provider = %initialized.override_provider,
        endpoint = %fetch.options().endpoint,
        direct_endpoint = fetch.options().direct_endpoint
    );
    println!("{}", serde_json::to_string_pretty(&initialized)?);
    Ok(())
}

async fn store_key(boot: &Bootstrap, args: StoreKeyArgs) -> anyhow::Result<()> {
    let store = boot
        .credential_db
        .as_ref()
        .context("store-key needs --dsn (or LLMGATE_DSN)")?;
    let credential = UserCredential {
        api_key: args.api_key,
        base_url: args.base_url,
    };
    store
        .upsert_user_key(&args.user_id, &args.name, &credential, args.expires_at)
        .await
        .context("upsert user key")?;
    info!(event = "user_key_stored", name = %args.name, has_expiry = args.expires_at.is_some());
    Ok(())
}

fn list_providers(boot: &Bootstrap) {
    let mut providers: Vec<&str> = boot.provider_map.providers().collect();
    providers.sort_unstable();
    for provider in providers {
        println!("{provider}");
    }
    for endpoint in &boot.app_config.endpoints.custom {
        println!(
            "{} (custom, {})",
            endpoint.name,
            endpoint.base_url.as_deref().unwrap_or("-")
        );
    }
}

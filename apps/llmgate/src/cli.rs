use clap::{Parser, Subcommand};
use llmgate_core::CliArgs;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Parser)]
#[command(
    name = "llmgate",
    version,
    about = "Resolve LLM providers and build client options per request"
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: CliArgs,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve a provider, run its initializer and print the client options.
    Init(InitArgs),
    /// Save a user's own key for an endpoint (requires a DSN).
    StoreKey(StoreKeyArgs),
    /// List registered providers and declared custom endpoints.
    Providers,
}

#[derive(clap::Args)]
pub(crate) struct InitArgs {
    #[arg(long)]
    pub(crate) provider: String,
    #[arg(long, default_value = "")]
    pub(crate) user_id: String,
    #[arg(long)]
    pub(crate) model: Option<String>,
    /// RFC 3339 expiry of the user's key, when the request carries one.
    #[arg(long, value_parser = parse_rfc3339)]
    pub(crate) expires_at: Option<OffsetDateTime>,
    #[arg(long)]
    pub(crate) session_id: Option<String>,
    /// Extra model parameter, `key=value`. Values parse as JSON when they can.
    #[arg(long = "param", value_parser = parse_param)]
    pub(crate) params: Vec<(String, Value)>,
}

impl InitArgs {
    pub(crate) fn model_parameters(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self.params.iter().cloned().collect();
        if let Some(model) = &self.model {
            map.insert("model".to_string(), Value::String(model.clone()));
        }
        map
    }
}

#[derive(clap::Args)]
pub(crate) struct StoreKeyArgs {
    #[arg(long)]
    pub(crate) user_id: String,
    /// Endpoint name, as declared in the config.
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) api_key: Option<String>,
    #[arg(long)]
    pub(crate) base_url: Option<String>,
    #[arg(long, value_parser = parse_rfc3339)]
    pub(crate) expires_at: Option<OffsetDateTime>,
}

fn parse_rfc3339(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|err| format!("invalid RFC 3339 time: {err}"))
}

fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

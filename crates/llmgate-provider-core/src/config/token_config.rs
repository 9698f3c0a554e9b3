use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pricing (per million tokens) and context window for one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<u64>,
}

/// Model name to token metadata for one provider.
pub type EndpointTokenConfig = BTreeMap<String, TokenLimits>;

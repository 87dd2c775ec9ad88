// --- File: crates/connect_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

// --- Stripe Config ---
// Secret values are usually "secret_from_env" markers in the config files and
// are filled from STRIPE_KEY / STRIPE_WEBHOOK_SECRET at load time.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StripeConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_files_base")]
    pub files_base: String,
    /// Secret API key (sk_...). Loaded via STRIPE_KEY.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Publishable key handed to Stripe.js when tokenized forms are enabled.
    #[serde(default)]
    pub publishable_key: Option<String>,
    /// Stripe.js major version used by the forms. `None` posts raw fields.
    #[serde(default)]
    pub stripe_js: Option<u8>,
    /// Webhook signing secret (whsec_...). Loaded via STRIPE_WEBHOOK_SECRET.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: i64,
    /// Pinned `Stripe-Version` header, the account default when unset.
    #[serde(default)]
    pub api_version: Option<String>,
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_files_base() -> String {
    "https://files.stripe.com".to_string()
}

fn default_webhook_tolerance_secs() -> i64 {
    300
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            files_base: default_files_base(),
            secret_key: None,
            publishable_key: None,
            stripe_js: None,
            webhook_secret: None,
            webhook_tolerance_secs: default_webhook_tolerance_secs(),
            api_version: None,
        }
    }
}

impl StripeConfig {
    /// True when forms are submitted as Stripe.js tokens instead of raw fields.
    pub fn uses_stripe_js(&self) -> bool {
        self.stripe_js.is_some_and(|version| version > 0)
    }
}

// --- Dashboard Config ---
// How the host dashboard hands us the authenticated account, and list sizing.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DashboardConfig {
    /// Items per page on list endpoints. Loaded via PAGE_SIZE.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_account_header")]
    pub account_header: String,
    #[serde(default = "default_administrator_header")]
    pub administrator_header: String,
}

fn default_page_size() -> usize {
    10
}

fn default_account_header() -> String {
    "x-account-id".to_string()
}

fn default_administrator_header() -> String {
    "x-account-administrator".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            account_header: default_account_header(),
            administrator_header: default_administrator_header(),
        }
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_stripe: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub stripe: Option<StripeConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

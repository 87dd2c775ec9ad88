//! Environment variable handling for the Connect service.
//!
//! Configuration values follow `CONNECT__SECTION__KEY`, secrets follow
//! `CONNECT_SECRET_SECTION_KEY`, and the short legacy names the dashboard has
//! always used (`STRIPE_KEY`, `STRIPE_JS`, `PAGE_SIZE`, ...) still win over
//! both so existing deployments keep working.

use std::env;

use crate::models::{AppConfig, StripeConfig};

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "CONNECT";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "CONNECT_SECRET";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a configuration path to an environment variable name
///
/// `"dashboard.page_size"` becomes `"CONNECT__DASHBOARD__PAGE_SIZE"`.
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = get_config_prefix();
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, CONFIG_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to an environment variable name
///
/// `"stripe.secret_key"` becomes `"CONNECT_SECRET_STRIPE_SECRET_KEY"`.
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// Legacy variable names for the handful of settings the dashboard documented
/// before the prefixed scheme existed.
pub fn legacy_env_var(path: &str) -> Option<&'static str> {
    match path {
        "stripe.secret_key" => Some("STRIPE_KEY"),
        "stripe.publishable_key" => Some("STRIPE_PUBLISHABLE_KEY"),
        "stripe.webhook_secret" => Some("STRIPE_WEBHOOK_SECRET"),
        "stripe.stripe_js" => Some("STRIPE_JS"),
        "dashboard.page_size" => Some("PAGE_SIZE"),
        _ => None,
    }
}

/// Check if a path is a secret path
///
/// Paths containing "secret" or "key" are considered secret.
pub fn is_secret_path(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    path_lower.contains("secret") || path_lower.contains("key")
}

/// Get an environment variable for a path, trying the legacy name first and
/// then the prefixed secret or config name.
pub fn get_env_var(path: &str) -> Option<String> {
    lookup_with(path, |name| env::var(name).ok())
}

fn lookup_with<F>(path: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = legacy_env_var(path).and_then(&lookup) {
        return Some(value);
    }
    if is_secret_path(path) {
        lookup(&secret_path_to_env_var(path))
    } else {
        lookup(&config_path_to_env_var(path))
    }
}

/// Inject environment variables into a JSON value
///
/// Recursively replaces "secret_from_env" strings with values resolved through
/// [`get_env_var`]. Returns `true` if any value was replaced.
pub fn inject_env_vars(value: &mut serde_json::Value) -> bool {
    use serde_json::Value;

    fn walk(path: Vec<String>, obj: &mut Value) -> bool {
        let mut replaced = false;

        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::String(s) if s == "secret_from_env" => {
                let path_str = path.join(".");
                if let Some(env_val) = get_env_var(&path_str) {
                    *s = env_val;
                    replaced = true;
                } else {
                    tracing::warn!("env var for {} not found", path_str);
                }
            }
            _ => {}
        }

        replaced
    }

    walk(vec![], value)
}

/// Applies the legacy variables on top of a loaded configuration.
///
/// `lookup` resolves a variable name; production passes `std::env::var`.
pub fn apply_legacy_env<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let stripe_key = lookup_with("stripe.secret_key", &lookup);
    let publishable_key = lookup_with("stripe.publishable_key", &lookup);
    let webhook_secret = lookup_with("stripe.webhook_secret", &lookup);
    let stripe_js = lookup_with("stripe.stripe_js", &lookup);

    if stripe_key.is_some() && config.stripe.is_none() {
        config.stripe = Some(StripeConfig::default());
    }
    if let Some(stripe) = config.stripe.as_mut() {
        if let Some(key) = stripe_key {
            stripe.secret_key = Some(key);
        }
        if let Some(key) = publishable_key {
            stripe.publishable_key = Some(key);
        }
        if let Some(secret) = webhook_secret {
            stripe.webhook_secret = Some(secret);
        }
        match stripe_js.as_deref() {
            // the dashboard used STRIPE_JS=false to disable tokenized forms
            Some("false") | Some("") | Some("0") => stripe.stripe_js = None,
            Some(version) => match version.parse::<u8>() {
                Ok(version) => stripe.stripe_js = Some(version),
                Err(_) => tracing::warn!("ignoring unparsable STRIPE_JS value {:?}", version),
            },
            None => {}
        }
    }

    if let Some(page_size) = lookup_with("dashboard.page_size", &lookup) {
        match page_size.parse::<usize>() {
            Ok(size) if size > 0 => config.dashboard.page_size = size,
            _ => tracing::warn!("ignoring invalid PAGE_SIZE value {:?}", page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_path_to_env_var() {
        assert_eq!(
            config_path_to_env_var("server.host"),
            "CONNECT__SERVER__HOST"
        );
        assert_eq!(
            config_path_to_env_var("dashboard.page_size"),
            "CONNECT__DASHBOARD__PAGE_SIZE"
        );
    }

    #[test]
    fn test_secret_path_to_env_var() {
        assert_eq!(
            secret_path_to_env_var("stripe.secret_key"),
            "CONNECT_SECRET_STRIPE_SECRET_KEY"
        );
        assert_eq!(
            secret_path_to_env_var("stripe.webhook_secret"),
            "CONNECT_SECRET_STRIPE_WEBHOOK_SECRET"
        );
    }

    #[test]
    fn test_is_secret_path() {
        assert!(is_secret_path("stripe.secret_key"));
        assert!(is_secret_path("stripe.webhook_secret"));
        assert!(is_secret_path("stripe.publishable_key"));
        assert!(!is_secret_path("server.host"));
        assert!(!is_secret_path("dashboard.page_size"));
    }

    #[test]
    fn test_legacy_names_take_precedence() {
        let lookup = lookup_from(&[
            ("STRIPE_KEY", "sk_test_legacy"),
            ("CONNECT_SECRET_STRIPE_SECRET_KEY", "sk_test_prefixed"),
        ]);
        assert_eq!(
            lookup_with("stripe.secret_key", &lookup).as_deref(),
            Some("sk_test_legacy")
        );
    }

    #[test]
    fn test_apply_legacy_env_creates_stripe_section() {
        let mut config = AppConfig::default();
        let lookup = lookup_from(&[
            ("STRIPE_KEY", "sk_test_123"),
            ("STRIPE_JS", "3"),
            ("PAGE_SIZE", "25"),
        ]);
        apply_legacy_env(&mut config, lookup);

        let stripe = config.stripe.expect("stripe section");
        assert_eq!(stripe.secret_key.as_deref(), Some("sk_test_123"));
        assert_eq!(stripe.stripe_js, Some(3));
        assert!(stripe.uses_stripe_js());
        assert_eq!(config.dashboard.page_size, 25);
    }

    #[test]
    fn test_apply_legacy_env_disables_stripe_js_and_ignores_bad_page_size() {
        let mut config = AppConfig {
            stripe: Some(StripeConfig {
                stripe_js: Some(3),
                ..StripeConfig::default()
            }),
            ..AppConfig::default()
        };
        let lookup = lookup_from(&[("STRIPE_JS", "false"), ("PAGE_SIZE", "zero")]);
        apply_legacy_env(&mut config, lookup);

        assert_eq!(config.stripe.as_ref().and_then(|s| s.stripe_js), None);
        assert_eq!(config.dashboard.page_size, 10);
    }
}

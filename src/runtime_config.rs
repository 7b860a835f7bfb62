//! # Runtime Configuration
//!
//! Dispatcher behavior that varies by deployment, loaded from environment
//! variables.
//!
//! ## Environment Variables
//!
//! ### `FAAS_ROUTER_STRIP_STAGE`
//!
//! HTTP API (v2) events carry the stage name in `rawPath` (`/prod/users`).
//! When enabled, `/{stage}` is removed before routing unless the stage is
//! `$default`. REST API (v1) `path` values never include the stage.
//!
//! Default: `true`
//!
//! ### `FAAS_ROUTER_CORS`
//!
//! Add `Access-Control-Allow-Origin: *` and
//! `Access-Control-Allow-Credentials: true` to every response envelope.
//! Handler headers still override them.
//!
//! Default: `true`
//!
//! ### `FAAS_ROUTER_CATCH_ALL`
//!
//! Template of the fallback route used when a path matches but its method
//! is not registered.
//!
//! Default: `/{proxy+}`
//!
//! ## Usage
//!
//! ```rust
//! use faas_router::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("catch-all: {}", config.catch_all);
//! ```

use std::env;

/// Default catch-all template.
pub const DEFAULT_CATCH_ALL: &str = "/{proxy+}";

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Strip `/{stage}` from v2 `rawPath` values (default: true)
    pub strip_stage: bool,
    /// Add permissive CORS headers to envelopes (default: true)
    pub cors: bool,
    /// Fallback route template (default: `/{proxy+}`)
    pub catch_all: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            strip_stage: true,
            cors: true,
            catch_all: DEFAULT_CATCH_ALL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        RuntimeConfig {
            strip_stage: env_bool("FAAS_ROUTER_STRIP_STAGE").unwrap_or(defaults.strip_stage),
            cors: env_bool("FAAS_ROUTER_CORS").unwrap_or(defaults.cors),
            catch_all: env::var("FAAS_ROUTER_CATCH_ALL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.catch_all),
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| parse_bool(&v))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

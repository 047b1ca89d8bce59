use std::env;

use thiserror::Error;

use crate::{gate::GatePolicy, session::SessionCookies};

/// Fallback token secret for local development. Matches the default secret of a
/// locally running Supabase stack.
pub const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

/// ConfigError
///
/// Raised while loading configuration. Startup aborts on any of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

/// AppConfig
///
/// Holds the application's configuration. Built once at startup by
/// [`AppConfig::load`] and shared read-only through `AppState` / `FromRef`;
/// nothing below the entry point reads the process environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which secrets are mandatory.
    pub env: Env,
    // Hosted backend project. `None` locally switches to in-memory polls and local token checks.
    pub supabase: Option<SupabaseConfig>,
    // Secret used to verify access tokens locally when no Supabase project is configured.
    pub jwt_secret: Option<String>,
    // Names of the session cookies.
    pub session_cookies: SessionCookies,
    // Redirect rules of the access gate.
    pub gate: GatePolicy,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

/// Connection details of the hosted backend (identity + data API).
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    // Server-side key; sent as both `apikey` and bearer token. Never exposed to browsers.
    pub service_role_key: String,
}

/// Env
///
/// Runtime context: local development or production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking local configuration used to scaffold test state.
    fn default() -> Self {
        Self {
            env: Env::Local,
            supabase: None,
            jwt_secret: Some(LOCAL_JWT_SECRET.to_string()),
            session_cookies: SessionCookies::default(),
            gate: GatePolicy::default(),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables and fails fast.
    ///
    /// In production `SUPABASE_URL` and `SUPABASE_SERVICE_ROLE_KEY` are
    /// mandatory. Locally both may be left out together (setting only one of
    /// them is an error); without them the service runs
    /// against an in-memory store and verifies tokens with `SUPABASE_JWT_SECRET`
    /// (or the local fallback secret).
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let supabase = match (
            non_empty("SUPABASE_URL"),
            non_empty("SUPABASE_SERVICE_ROLE_KEY"),
        ) {
            (Some(url), Some(service_role_key)) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::InvalidUrl {
                        name: "SUPABASE_URL",
                        value: url,
                    });
                }
                Some(SupabaseConfig {
                    url: url.trim_end_matches('/').to_string(),
                    service_role_key,
                })
            }
            (None, None) if env == Env::Local => None,
            // A half-configured project is an error in every environment.
            (None, _) => return Err(ConfigError::Missing("SUPABASE_URL")),
            (_, None) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
        };

        let jwt_secret = match env {
            Env::Production => non_empty("SUPABASE_JWT_SECRET"),
            Env::Local => Some(
                non_empty("SUPABASE_JWT_SECRET").unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let defaults = SessionCookies::default();
        let session_cookies = SessionCookies {
            access: non_empty("SESSION_ACCESS_COOKIE").unwrap_or(defaults.access),
            refresh: non_empty("SESSION_REFRESH_COOKIE").unwrap_or(defaults.refresh),
        };

        Ok(Self {
            env,
            supabase,
            jwt_secret,
            session_cookies,
            gate: GatePolicy::default(),
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        })
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

use std::{collections::HashSet, env, time::Duration};

use crate::error::ConfigError;

/// Signing secret used when none is configured. Only tolerated outside production.
pub const INSECURE_DEFAULT_SECRET: &str = "your-secret-key-change-in-production";

const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;
const DEFAULT_COOKIE_NAME: &str = "token";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Origins every local build accepts for the browser frontends.
const LOCAL_DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
    "http://localhost:4200",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
    "http://127.0.0.1:5173",
];

/// AppConfig
///
/// Process configuration, read from the environment once at startup and never mutated
/// afterwards. Shared by reference with the gateway and the handlers.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls cookie hardening and secret strictness.
    pub env: Env,
    // Secret used to sign and verify identity tokens.
    pub jwt_secret: String,
    // Postgres connection string. Unset locally means the seeded in-memory store.
    pub db_url: Option<String>,
    // Lifetime of tokens issued by the login endpoint.
    pub token_ttl: Duration,
    // Name of the cookie carrying the token.
    pub cookie_name: String,
    // Allow-list for the CORS layer.
    pub allowed_origins: Vec<String>,
    pub bind_addr: String,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Local settings with a fixed test secret, for test scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            db_url: None,
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            allowed_origins: LOCAL_DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. In production a missing or
    /// default-valued `JWT_SECRET`, or a missing `DATABASE_URL`, is an error: the process must not
    /// serve with an insecure setup.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match (env, env::var("JWT_SECRET")) {
            (Env::Production, Ok(secret)) if secret == INSECURE_DEFAULT_SECRET => {
                return Err(ConfigError::InsecureSecret);
            }
            (Env::Production, Ok(secret)) if !secret.is_empty() => secret,
            (Env::Production, _) => return Err(ConfigError::Missing("JWT_SECRET")),
            (Env::Local, Ok(secret)) if !secret.is_empty() => secret,
            (Env::Local, _) => INSECURE_DEFAULT_SECRET.to_string(),
        };

        let db_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        if env == Env::Production && db_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let token_ttl = match env::var("TOKEN_TTL_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: "TOKEN_TTL_SECS",
                    reason: e.to_string(),
                })?;
                if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
                    return Err(ConfigError::Invalid {
                        name: "TOKEN_TTL_SECS",
                        reason: format!("must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"),
                    });
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TOKEN_TTL_SECS),
        };

        let cookie_name = env::var("AUTH_COOKIE_NAME")
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        let mut allowed_origins: Vec<String> = match env {
            Env::Local => LOCAL_DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
            Env::Production => Vec::new(),
        };
        if let Ok(list) = env::var("CORS_ALLOWED_ORIGINS") {
            allowed_origins.extend(
                list.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_owned),
            );
        }
        if let Ok(frontend) = env::var("FRONTEND_URL") {
            if !frontend.is_empty() {
                allowed_origins.push(frontend);
            }
        }
        let mut seen = HashSet::new();
        allowed_origins.retain(|origin| seen.insert(origin.clone()));

        Ok(Self {
            env,
            jwt_secret,
            db_url,
            token_ttl,
            cookie_name,
            allowed_origins,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
        })
    }

    /// True when tokens are signed with the publicly known fallback secret.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == INSECURE_DEFAULT_SECRET
    }
}

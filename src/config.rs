// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the typed configuration values
//! loaded from them at startup. Configuration is read once; everything
//! downstream receives immutable values.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | gateway `3000`, authority `8000` |
//! | `LICENSE_SERVER_URL` | Base address of the license authority (gateway) | `http://localhost:8000` |
//! | `UPSTREAM_TIMEOUT_SECS` | Per-request timeout for relayed calls | `30` |
//! | `ADMIN_EMAILS` | Comma-separated administrator emails | empty |
//! | `SIGN_IN_PATH` | Re-authentication entry point returned on deny | `/login` |
//! | `AUTH_JWKS_URL` | Identity provider JWKS endpoint | Optional |
//! | `AUTH_JWT_SECRET` | Identity provider HS256 secret | Optional |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Optional |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `DEVICE_HASH_SALT` | Salt mixed into device fingerprint hashes | empty |
//! | `GRACE_DAYS` | Offline grace period reported on activation | `7` |
//! | `RATE_LIMIT_ACTIVATE_PER_MINUTE` | `/activate` calls allowed per client IP per minute | `5` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::auth::AdminAllowList;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Base address of the backend license authority the gateway relays to.
pub const LICENSE_SERVER_URL_ENV: &str = "LICENSE_SERVER_URL";

/// Timeout in seconds applied to every relayed upstream call.
///
/// A timeout is reported exactly like any other transport failure.
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";

/// Comma-separated administrator emails, compared case-insensitively.
pub const ADMIN_EMAILS_ENV: &str = "ADMIN_EMAILS";

pub const SIGN_IN_PATH_ENV: &str = "SIGN_IN_PATH";

pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const AUTH_JWT_SECRET_ENV: &str = "AUTH_JWT_SECRET";
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";
pub const AUTH_AUDIENCE_ENV: &str = "AUTH_AUDIENCE";

/// Optional salt for device fingerprint hashing.
///
/// Changing the salt invalidates every stored `device_id_hash`; devices
/// would count as new activations.
pub const DEVICE_HASH_SALT_ENV: &str = "DEVICE_HASH_SALT";

pub const GRACE_DAYS_ENV: &str = "GRACE_DAYS";

/// Activation attempts allowed per client address and minute.
pub const RATE_LIMIT_ACTIVATE_PER_MINUTE_ENV: &str = "RATE_LIMIT_ACTIVATE_PER_MINUTE";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_GATEWAY_PORT: u16 = 3000;
pub const DEFAULT_AUTHORITY_PORT: u16 = 8000;
pub const DEFAULT_LICENSE_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SIGN_IN_PATH: &str = "/login";
pub const DEFAULT_GRACE_DAYS: u32 = 7;
pub const DEFAULT_ACTIVATE_PER_MINUTE: u32 = 5;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),
}

/// A snapshot of the variables this crate reads.
///
/// Loaders take an `Env` instead of reading the process environment
/// directly so tests can exercise them without touching global state.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a variable, with blank values treated as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                value: raw.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(default),
        }
    }
}

/// Settings for verifying identity provider tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSettings {
    pub jwks_url: Option<String>,
    pub jwt_secret: Option<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Where denied callers are sent to re-authenticate.
    pub sign_in_path: String,
}

impl AuthSettings {
    pub fn from_env(env: &Env) -> Self {
        Self {
            jwks_url: env.get(AUTH_JWKS_URL_ENV).map(String::from),
            jwt_secret: env.get(AUTH_JWT_SECRET_ENV).map(String::from),
            issuer: env.get(AUTH_ISSUER_ENV).map(String::from),
            audience: env.get(AUTH_AUDIENCE_ENV).map(String::from),
            sign_in_path: env
                .get(SIGN_IN_PATH_ENV)
                .unwrap_or(DEFAULT_SIGN_IN_PATH)
                .to_string(),
        }
    }
}

/// Certificate and key for serving HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Bind address and optional TLS material shared by both binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenConfig {
    pub addr: SocketAddr,
    pub tls: Option<TlsPaths>,
}

impl ListenConfig {
    pub fn from_env(env: &Env, default_port: u16) -> Result<Self, ConfigError> {
        let host = env.get(HOST_ENV).unwrap_or(DEFAULT_HOST);
        let port: u16 = env.parse_or(PORT_ENV, default_port)?;

        let raw = format!("{host}:{port}");
        let addr = raw.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidValue {
                name: HOST_ENV,
                value: host.to_string(),
                reason: e.to_string(),
            }
        })?;

        let tls = match (env.get(TLS_CERT_PATH_ENV), env.get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        Ok(Self { addr, tls })
    }
}

/// Configuration for the gateway binary.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen: ListenConfig,
    /// Base address of the license authority, without a trailing slash.
    pub upstream_base: String,
    pub upstream_timeout: Duration,
    pub admins: AdminAllowList,
    pub auth: AuthSettings,
}

impl GatewayConfig {
    pub fn from_env(env: &Env) -> Result<Self, ConfigError> {
        let raw_base = env
            .get(LICENSE_SERVER_URL_ENV)
            .unwrap_or(DEFAULT_LICENSE_SERVER_URL);
        let upstream_base = validate_base_url(raw_base)?;

        let timeout_secs: u64 =
            env.parse_or(UPSTREAM_TIMEOUT_ENV, DEFAULT_UPSTREAM_TIMEOUT.as_secs())?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: UPSTREAM_TIMEOUT_ENV,
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        Ok(Self {
            listen: ListenConfig::from_env(env, DEFAULT_GATEWAY_PORT)?,
            upstream_base,
            upstream_timeout: Duration::from_secs(timeout_secs),
            admins: AdminAllowList::parse(env.get(ADMIN_EMAILS_ENV).unwrap_or_default()),
            auth: AuthSettings::from_env(env),
        })
    }
}

/// Configuration for the license authority binary.
#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    pub listen: ListenConfig,
    pub admins: AdminAllowList,
    pub auth: AuthSettings,
    pub device_hash_salt: Option<String>,
    pub grace_days: u32,
    pub activate_per_minute: NonZeroU32,
}

impl AuthorityConfig {
    pub fn from_env(env: &Env) -> Result<Self, ConfigError> {
        let per_minute: u32 =
            env.parse_or(RATE_LIMIT_ACTIVATE_PER_MINUTE_ENV, DEFAULT_ACTIVATE_PER_MINUTE)?;
        let activate_per_minute =
            NonZeroU32::new(per_minute).ok_or_else(|| ConfigError::InvalidValue {
                name: RATE_LIMIT_ACTIVATE_PER_MINUTE_ENV,
                value: per_minute.to_string(),
                reason: "limit must be at least one request".to_string(),
            })?;

        Ok(Self {
            listen: ListenConfig::from_env(env, DEFAULT_AUTHORITY_PORT)?,
            admins: AdminAllowList::parse(env.get(ADMIN_EMAILS_ENV).unwrap_or_default()),
            auth: AuthSettings::from_env(env),
            device_hash_salt: env.get(DEVICE_HASH_SALT_ENV).map(String::from),
            grace_days: env.parse_or(GRACE_DAYS_ENV, DEFAULT_GRACE_DAYS)?,
            activate_per_minute,
        })
    }
}

/// Check that `raw` is an absolute http(s) URL and strip trailing slashes.
fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        name: LICENSE_SERVER_URL_ENV,
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }

    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_defaults() {
        let config = GatewayConfig::from_env(&Env::default()).unwrap();
        assert_eq!(config.listen.addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.upstream_base, "http://localhost:8000");
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert!(config.admins.is_empty());
        assert_eq!(config.auth.sign_in_path, "/login");
        assert!(config.listen.tls.is_none());
    }

    #[test]
    fn gateway_reads_overrides() {
        let env = Env::from_pairs([
            (LICENSE_SERVER_URL_ENV, "https://licenses.example.com/"),
            (UPSTREAM_TIMEOUT_ENV, "5"),
            (ADMIN_EMAILS_ENV, "Ops@Example.com, dev@example.com"),
            (PORT_ENV, "9090"),
        ]);
        let config = GatewayConfig::from_env(&env).unwrap();
        assert_eq!(config.upstream_base, "https://licenses.example.com");
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.listen.addr.port(), 9090);
        assert!(config.admins.contains("ops@example.com"));
        assert!(config.admins.contains("DEV@example.com"));
    }

    #[test]
    fn rejects_malformed_base_url() {
        let env = Env::from_pairs([(LICENSE_SERVER_URL_ENV, "not a url")]);
        let err = GatewayConfig::from_env(&env).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: LICENSE_SERVER_URL_ENV, .. }
        ));

        let env = Env::from_pairs([(LICENSE_SERVER_URL_ENV, "ftp://example.com")]);
        assert!(GatewayConfig::from_env(&env).is_err());
    }

    #[test]
    fn rejects_bad_port_and_zero_timeout() {
        let env = Env::from_pairs([(PORT_ENV, "http")]);
        assert!(GatewayConfig::from_env(&env).is_err());

        let env = Env::from_pairs([(UPSTREAM_TIMEOUT_ENV, "0")]);
        assert!(GatewayConfig::from_env(&env).is_err());
    }

    #[test]
    fn tls_paths_must_come_in_pairs() {
        let env = Env::from_pairs([(TLS_CERT_PATH_ENV, "/etc/tls/cert.pem")]);
        let err = ListenConfig::from_env(&env, 8000).unwrap_err();
        assert!(matches!(err, ConfigError::Incomplete(..)));

        let env = Env::from_pairs([
            (TLS_CERT_PATH_ENV, "/etc/tls/cert.pem"),
            (TLS_KEY_PATH_ENV, "/etc/tls/key.pem"),
        ]);
        let listen = ListenConfig::from_env(&env, 8000).unwrap();
        assert_eq!(listen.tls.unwrap().key, PathBuf::from("/etc/tls/key.pem"));
    }

    #[test]
    fn authority_defaults_and_salt() {
        let config = AuthorityConfig::from_env(&Env::default()).unwrap();
        assert_eq!(config.listen.addr.port(), 8000);
        assert_eq!(config.grace_days, 7);
        assert_eq!(config.activate_per_minute.get(), 5);
        assert!(config.device_hash_salt.is_none());

        let env = Env::from_pairs([(DEVICE_HASH_SALT_ENV, "pepper"), (GRACE_DAYS_ENV, "14")]);
        let config = AuthorityConfig::from_env(&env).unwrap();
        assert_eq!(config.device_hash_salt.as_deref(), Some("pepper"));
        assert_eq!(config.grace_days, 14);
    }

    #[test]
    fn activation_rate_limit_must_be_positive() {
        let env = Env::from_pairs([(RATE_LIMIT_ACTIVATE_PER_MINUTE_ENV, "20")]);
        let config = AuthorityConfig::from_env(&env).unwrap();
        assert_eq!(config.activate_per_minute.get(), 20);

        for raw in ["0", "-1", "lots"] {
            let env = Env::from_pairs([(RATE_LIMIT_ACTIVATE_PER_MINUTE_ENV, raw)]);
            assert!(matches!(
                AuthorityConfig::from_env(&env),
                Err(ConfigError::InvalidValue {
                    name: RATE_LIMIT_ACTIVATE_PER_MINUTE_ENV,
                    ..
                })
            ));
        }
    }

    #[test]
    fn blank_values_count_as_unset() {
        let env = Env::from_pairs([(AUTH_JWKS_URL_ENV, "   "), (HOST_ENV, "")]);
        let auth = AuthSettings::from_env(&env);
        assert!(auth.jwks_url.is_none());
        let listen = ListenConfig::from_env(&env, 1234).unwrap();
        assert_eq!(listen.addr, "0.0.0.0:1234".parse().unwrap());
    }
}

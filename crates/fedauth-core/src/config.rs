//! Federation configuration.
//!
//! Configuration is loaded from environment variables (optionally seeded
//! from a `.env` file) with defaults matching the WS-Federation reader
//! quotas of the original deployment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default token size quota (2 MiB).
pub const DEFAULT_TOKEN_QUOTA: usize = 0x20_0000;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "FedAuth";

/// Default maximum length of a single cookie value before it is chunked.
pub const DEFAULT_COOKIE_CHUNK_SIZE: usize = 2000;

/// Default session lifetime in seconds (10 hours).
pub const DEFAULT_SESSION_LIFETIME_SECS: u64 = 36_000;

/// Top-level configuration for the federated sign-in endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to bind to.
    pub port: u16,

    /// Reject sign-in posts that did not arrive over TLS.
    pub require_secure_transport: bool,

    /// Honor `X-Forwarded-Proto` from a TLS-terminating proxy.
    pub trust_forwarded_proto: bool,

    /// The realm / audience URI tokens must be addressed to.
    pub expected_audience_uri: String,

    /// Trusted signer fingerprints, in priority order.
    pub trusted_issuers: Vec<TrustedIssuerConfig>,

    /// Application virtual path; redirects are relative to it.
    pub app_root: String,

    /// Token size quotas.
    pub quotas: QuotaConfig,

    /// Session cookie settings.
    pub cookie: CookieConfig,

    /// Log filter directive.
    pub log_level: String,
}

/// One trusted signer as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedIssuerConfig {
    /// Hex fingerprint of the signing certificate.
    pub fingerprint: String,
    /// Optional display name for the issuer.
    pub name: Option<String>,
}

impl FromStr for TrustedIssuerConfig {
    type Err = ConfigError;

    /// Parses `fingerprint` or `fingerprint=Issuer Name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (fingerprint, name) = match s.split_once('=') {
            Some((fp, name)) => (fp.trim(), Some(name.trim())),
            None => (s.trim(), None),
        };

        if fingerprint.is_empty() {
            return Err(ConfigError::invalid(
                "FEDAUTH_TRUSTED_ISSUERS",
                "empty fingerprint",
            ));
        }
        if !fingerprint
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == ':')
        {
            return Err(ConfigError::invalid(
                "FEDAUTH_TRUSTED_ISSUERS",
                format!("fingerprint '{fingerprint}' is not hex"),
            ));
        }

        Ok(Self {
            fingerprint: fingerprint.to_string(),
            name: name.filter(|n| !n.is_empty()).map(String::from),
        })
    }
}

/// Token size quotas handed to the token reader and validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum size of the posted token, in bytes.
    pub max_token_bytes: usize,
    /// Maximum length of any single XML text node.
    pub max_string_content_length: usize,
    /// Maximum length of any decoded binary array (e.g. certificates).
    pub max_array_length: usize,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_token_bytes: DEFAULT_TOKEN_QUOTA,
            max_string_content_length: DEFAULT_TOKEN_QUOTA,
            max_array_length: DEFAULT_TOKEN_QUOTA,
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Base cookie name; chunks append `1`, `2`, ...
    pub name: String,
    /// Protection keys. The first key is used for new cookies.
    pub keys: Vec<CookieKeyConfig>,
    /// How long an issued session stays valid.
    pub session_lifetime_secs: u64,
    /// Maximum characters per cookie before chunking.
    pub chunk_size: usize,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            keys: Vec::new(),
            session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
            chunk_size: DEFAULT_COOKIE_CHUNK_SIZE,
        }
    }
}

/// A cookie protection key and its epoch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieKeyConfig {
    /// Key epoch written into every protected cookie.
    pub epoch: u32,
    /// Base64 (standard alphabet) encoded 256-bit key.
    pub key_base64: String,
}

impl fmt::Debug for CookieKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieKeyConfig")
            .field("epoch", &self.epoch)
            .field("key_base64", &"<redacted>")
            .finish()
    }
}

impl FromStr for CookieKeyConfig {
    type Err = ConfigError;

    /// Parses `epoch:base64key`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (epoch, key) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ConfigError::invalid("FEDAUTH_COOKIE_KEYS", "expected epoch:key"))?;

        let epoch = epoch
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid("FEDAUTH_COOKIE_KEYS", "epoch is not a u32"))?;

        let key_base64 = key.trim();
        if key_base64.is_empty() {
            return Err(ConfigError::invalid("FEDAUTH_COOKIE_KEYS", "empty key"));
        }

        Ok(Self {
            epoch,
            key_base64: key_base64.to_string(),
        })
    }
}

impl FederationConfig {
    /// Loads configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a required setting is missing or any value is
    /// malformed.
    pub fn from_env() -> ConfigResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration using the given variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required setting is missing or any value is
    /// malformed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("FEDAUTH_HOST").unwrap_or(defaults.host);
        let port = parse_or(&lookup, "FEDAUTH_PORT", defaults.port)?;
        let require_secure_transport =
            parse_flag(&lookup, "FEDAUTH_REQUIRE_SSL", defaults.require_secure_transport)?;
        let trust_forwarded_proto = parse_flag(
            &lookup,
            "FEDAUTH_TRUST_FORWARDED_PROTO",
            defaults.trust_forwarded_proto,
        )?;

        let expected_audience_uri =
            lookup("FEDAUTH_REALM").ok_or(ConfigError::Missing("FEDAUTH_REALM"))?;

        let trusted_issuers = lookup("FEDAUTH_TRUSTED_ISSUERS")
            .ok_or(ConfigError::Missing("FEDAUTH_TRUSTED_ISSUERS"))
            .and_then(|raw| parse_list(&raw))?;

        let app_root = lookup("FEDAUTH_APP_ROOT").unwrap_or(defaults.app_root);

        let quotas = QuotaConfig {
            max_token_bytes: parse_or(
                &lookup,
                "FEDAUTH_MAX_TOKEN_BYTES",
                defaults.quotas.max_token_bytes,
            )?,
            max_string_content_length: parse_or(
                &lookup,
                "FEDAUTH_MAX_STRING_CONTENT",
                defaults.quotas.max_string_content_length,
            )?,
            max_array_length: parse_or(
                &lookup,
                "FEDAUTH_MAX_ARRAY_LENGTH",
                defaults.quotas.max_array_length,
            )?,
        };

        let cookie = CookieConfig {
            name: lookup("FEDAUTH_COOKIE_NAME").unwrap_or(defaults.cookie.name),
            keys: lookup("FEDAUTH_COOKIE_KEYS")
                .ok_or(ConfigError::Missing("FEDAUTH_COOKIE_KEYS"))
                .and_then(|raw| parse_list(&raw))?,
            session_lifetime_secs: parse_or(
                &lookup,
                "FEDAUTH_SESSION_LIFETIME_SECS",
                defaults.cookie.session_lifetime_secs,
            )?,
            chunk_size: parse_or(
                &lookup,
                "FEDAUTH_COOKIE_CHUNK_SIZE",
                defaults.cookie.chunk_size,
            )?,
        };

        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);

        let config = Self {
            host,
            port,
            require_secure_transport,
            trust_forwarded_proto,
            expected_audience_uri,
            trusted_issuers,
            app_root,
            quotas,
            cookie,
            log_level,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.expected_audience_uri.trim().is_empty() {
            return Err(ConfigError::EmptyAudience);
        }
        if self.trusted_issuers.is_empty() {
            return Err(ConfigError::EmptyTrustList);
        }
        if self.cookie.keys.is_empty() {
            return Err(ConfigError::NoCookieKeys);
        }
        if self.quotas.max_token_bytes == 0 {
            return Err(ConfigError::ZeroQuota("max_token_bytes"));
        }
        if self.quotas.max_string_content_length == 0 {
            return Err(ConfigError::ZeroQuota("max_string_content_length"));
        }
        if self.quotas.max_array_length == 0 {
            return Err(ConfigError::ZeroQuota("max_array_length"));
        }
        if self.cookie.chunk_size == 0 {
            return Err(ConfigError::invalid(
                "FEDAUTH_COOKIE_CHUNK_SIZE",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Whether every sign-in would be refused as insecure when served over
    /// plain HTTP.
    ///
    /// The server itself does not terminate TLS, so a deployment that
    /// requires a secure channel must sit behind a proxy whose
    /// `X-Forwarded-Proto` is trusted.
    #[must_use]
    pub const fn secure_channel_unobservable(&self) -> bool {
        self.require_secure_transport && !self.trust_forwarded_proto
    }

    /// Returns the application root, always starting and ending with `/`.
    #[must_use]
    pub fn normalized_app_root(&self) -> String {
        let trimmed = self.app_root.trim().trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        }
    }

    /// Creates a configuration for testing.
    ///
    /// The cookie key is fixed and must never be used outside tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            require_secure_transport: true,
            trust_forwarded_proto: false,
            expected_audience_uri: "https://chat.example.com/".to_string(),
            trusted_issuers: vec![TrustedIssuerConfig {
                fingerprint: "3F:2A:9C:71:0B".to_string(),
                name: Some("CN=Test STS".to_string()),
            }],
            app_root: "/".to_string(),
            quotas: QuotaConfig::default(),
            cookie: CookieConfig {
                keys: vec![CookieKeyConfig {
                    epoch: 1,
                    key_base64: "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=".to_string(),
                }],
                ..CookieConfig::default()
            },
            log_level: "debug".to_string(),
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            require_secure_transport: true,
            trust_forwarded_proto: false,
            expected_audience_uri: String::new(),
            trusted_issuers: Vec::new(),
            app_root: "/".to_string(),
            quotas: QuotaConfig::default(),
            cookie: CookieConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, setting: &'static str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(setting) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(setting, e.to_string())),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, setting: &'static str, default: bool) -> ConfigResult<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(setting).as_deref().map(str::trim) {
        None => Ok(default),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(false),
        Some(v) => Err(ConfigError::invalid(setting, format!("'{v}' is not a boolean"))),
    }
}

fn parse_list<T>(raw: &str) -> ConfigResult<Vec<T>>
where
    T: FromStr<Err = ConfigError>,
{
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

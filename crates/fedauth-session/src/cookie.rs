//! Chunked session cookies.
//!
//! The ticket is serialized to JSON, run through the transform pipeline and
//! base64url encoded. Values longer than the chunk size are split across
//! `FedAuth`, `FedAuth1`, `FedAuth2`, ... and joined again on read.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use fedauth_core::{config, FederationConfig};

use crate::error::{SessionError, SessionResult, TransformError};
use crate::pipeline::TransformPipeline;
use crate::protection::key_ring_from_config;
use crate::ticket::SessionTicket;

/// Browsers cap cookie lifetimes at 400 days.
const MAX_LIFETIME_SECS: u64 = 400 * 24 * 3600;

/// Reads and writes session tickets as (possibly chunked) cookies.
#[derive(Debug, Clone)]
pub struct SessionCookieCodec {
    name: String,
    path: String,
    chunk_size: usize,
    lifetime: Duration,
    secure: bool,
    pipeline: Arc<TransformPipeline>,
}

impl SessionCookieCodec {
    /// Creates a codec with default attributes over `pipeline`.
    pub fn new(name: impl Into<String>, pipeline: Arc<TransformPipeline>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            chunk_size: config::DEFAULT_COOKIE_CHUNK_SIZE,
            lifetime: lifetime_from_secs(config::DEFAULT_SESSION_LIFETIME_SECS),
            secure: true,
            pipeline,
        }
    }

    /// Builds the key ring, the standard pipeline and the codec from
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cookie keys are invalid.
    pub fn from_config(config: &FederationConfig) -> SessionResult<Self> {
        let keys = Arc::new(key_ring_from_config(&config.cookie)?);
        let pipeline = Arc::new(TransformPipeline::standard(keys));

        Ok(Self::new(config.cookie.name.clone(), pipeline)
            .with_path(config.normalized_app_root())
            .with_chunk_size(config.cookie.chunk_size)
            .with_lifetime(lifetime_from_secs(config.cookie.session_lifetime_secs))
            .with_secure(config.require_secure_transport))
    }

    /// Sets the cookie path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the maximum length of a single cookie value.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Sets the session lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Sets whether cookies carry the `Secure` attribute.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Base cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lifetime given to new sessions.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// The transform pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Name of the chunk at `index`; chunk zero carries the base name.
    #[must_use]
    pub fn chunk_name(&self, index: usize) -> String {
        if index == 0 {
            self.name.clone()
        } else {
            format!("{}{index}", self.name)
        }
    }

    /// Encodes a ticket into a single cookie value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or a transform stage fails.
    pub fn encode_value(&self, ticket: &SessionTicket) -> SessionResult<String> {
        let json = ticket.to_bytes()?;
        let protected = self.pipeline.encode(&json)?;
        Ok(URL_SAFE_NO_PAD.encode(protected))
    }

    /// Decodes a joined cookie value into a ticket.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a ticket produced by this
    /// pipeline, or the ticket has expired.
    pub fn decode_value(&self, value: &str) -> SessionResult<SessionTicket> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value.trim())
            .map_err(TransformError::from)?;
        let json = self.pipeline.decode(&bytes)?;
        SessionTicket::from_bytes(&json)
    }

    /// Builds `Set-Cookie` values for `ticket`.
    ///
    /// `previous_chunks` is the number of chunks the request carried; any
    /// beyond what the new value needs are expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the ticket cannot be encoded.
    pub fn write(&self, ticket: &SessionTicket, previous_chunks: usize) -> SessionResult<Vec<String>> {
        let value = self.encode_value(ticket)?;
        let max_age = ticket.remaining_secs(Utc::now());

        let mut headers: Vec<String> = value
            .as_bytes()
            .chunks(self.chunk_size)
            .enumerate()
            .map(|(i, chunk)| {
                // base64url output is ASCII, so byte chunks are valid UTF-8.
                let chunk = String::from_utf8_lossy(chunk);
                self.set_cookie(&self.chunk_name(i), &chunk, max_age)
            })
            .collect();

        let written = headers.len();
        headers.extend((written..previous_chunks).map(|i| self.expire(i)));

        tracing::debug!(
            chunks = written,
            expired = previous_chunks.saturating_sub(written),
            "Session cookie written"
        );
        Ok(headers)
    }

    /// Builds `Set-Cookie` values that remove a session of `chunks` chunks.
    #[must_use]
    pub fn clear(&self, chunks: usize) -> Vec<String> {
        (0..chunks.max(1)).map(|i| self.expire(i)).collect()
    }

    /// Number of consecutive session chunks present in `Cookie` headers.
    pub fn chunk_count<'a>(&self, cookie_headers: impl IntoIterator<Item = &'a str>) -> usize {
        let cookies = parse_cookies(cookie_headers);
        (0..)
            .take_while(|i| cookies.contains_key(self.chunk_name(*i).as_str()))
            .count()
    }

    /// Reads the session from `Cookie` header values.
    ///
    /// Returns `None` when no session cookie is present or it does not hold
    /// a valid, unexpired ticket.
    pub fn read<'a>(&self, cookie_headers: impl IntoIterator<Item = &'a str>) -> Option<SessionTicket> {
        let cookies = parse_cookies(cookie_headers);

        let mut value = String::new();
        for i in 0..=cookies.len() {
            match cookies.get(self.chunk_name(i).as_str()) {
                Some(chunk) => value.push_str(chunk),
                None => break,
            }
        }
        if value.is_empty() {
            return None;
        }

        match self.decode_value(&value) {
            Ok(ticket) => Some(ticket),
            Err(SessionError::Expired) => {
                tracing::debug!(cookie = %self.name, "Session ticket expired");
                None
            }
            Err(e) => {
                tracing::warn!(cookie = %self.name, error = %e, "Discarding invalid session cookie");
                None
            }
        }
    }

    fn set_cookie(&self, name: &str, value: &str, max_age: i64) -> String {
        let secure_flag = if self.secure { "; Secure" } else { "" };
        format!(
            "{name}={value}; Path={}; Max-Age={max_age}; HttpOnly; SameSite=Lax{secure_flag}",
            self.path
        )
    }

    fn expire(&self, index: usize) -> String {
        self.set_cookie(&self.chunk_name(index), "", 0)
    }
}

fn lifetime_from_secs(secs: u64) -> Duration {
    let secs = i64::try_from(secs.min(MAX_LIFETIME_SECS)).unwrap_or(0);
    Duration::seconds(secs)
}

/// Parses `name=value; name2=value2` pairs. The first occurrence of a name
/// wins.
fn parse_cookies<'a>(cookie_headers: impl IntoIterator<Item = &'a str>) -> HashMap<&'a str, &'a str> {
    let mut cookies = HashMap::new();
    for header in cookie_headers {
        for part in header.split(';') {
            if let Some((name, value)) = part.trim().split_once('=') {
                cookies.entry(name.trim()).or_insert_with(|| value.trim());
            }
        }
    }
    cookies
}

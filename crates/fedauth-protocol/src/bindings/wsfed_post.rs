//! WS-Federation passive requestor POST binding.
//!
//! The identity provider posts a form with `wa=wsignin1.0`, the
//! `RequestSecurityTokenResponse` in `wresult` and the continuation hint
//! the relying party sent out in `wctx`.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{LoginError, LoginResult};
use crate::token::{RawToken, SignInRequest, TokenExtractor, TokenQuotas};

/// The `wa` value for a sign-in response.
pub const WSIGNIN: &str = "wsignin1.0";

const REQUESTED_SECURITY_TOKEN: &[u8] = b"RequestedSecurityToken";

/// Decoded WS-Federation form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WsFedForm {
    /// Action.
    pub wa: Option<String>,
    /// The token response XML.
    pub wresult: Option<String>,
    /// Continuation hint.
    pub wctx: Option<String>,
}

impl WsFedForm {
    /// Parses an `application/x-www-form-urlencoded` body. The first
    /// occurrence of a field wins and unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::MalformedRequest`] if the body is not UTF-8 or
    /// not form encoded.
    pub fn parse(body: &[u8]) -> LoginResult<Self> {
        if std::str::from_utf8(body).is_err() {
            return Err(LoginError::MalformedRequest("form body is not UTF-8".to_string()));
        }
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| LoginError::MalformedRequest(format!("invalid form encoding: {e}")))?;

        let mut form = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "wa" => &mut form.wa,
                "wresult" => &mut form.wresult,
                "wctx" => &mut form.wctx,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        Ok(form)
    }
}

/// Extracts the signed token from a WS-Federation sign-in POST.
#[derive(Debug, Clone, Default)]
pub struct WsFedPostExtractor {
    quotas: TokenQuotas,
}

impl WsFedPostExtractor {
    /// Creates an extractor enforcing `quotas`.
    #[must_use]
    pub fn new(quotas: TokenQuotas) -> Self {
        Self { quotas }
    }

    /// Finds the token inside a `RequestSecurityTokenResponse`.
    ///
    /// The first element child of `RequestedSecurityToken` is returned
    /// verbatim, whatever its namespace prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::MalformedRequest`] if the response is oversized,
    /// not well formed, declares a DTD, holds an over-long text node, or
    /// carries no token.
    pub fn locate_token(&self, wresult: &str) -> LoginResult<RawToken> {
        if wresult.len() > self.quotas.max_token_bytes {
            return Err(LoginError::MalformedRequest(format!(
                "token response exceeds {} bytes",
                self.quotas.max_token_bytes
            )));
        }

        let mut reader = Reader::from_str(wresult);
        reader.config_mut().trim_text(true);

        let mut depth = 0usize;
        let mut container: Option<usize> = None;
        let mut token_start: Option<usize> = None;

        loop {
            let before = position(&reader);
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    depth += 1;
                    match (container, token_start) {
                        (Some(d), None) if depth == d + 1 => token_start = Some(before),
                        (None, _) if e.local_name().as_ref() == REQUESTED_SECURITY_TOKEN => {
                            container = Some(depth);
                        }
                        _ => {}
                    }
                }
                Ok(Event::Empty(e)) => match (container, token_start) {
                    (Some(d), None) if depth == d => {
                        return slice(wresult, before, position(&reader));
                    }
                    (None, _) if e.local_name().as_ref() == REQUESTED_SECURITY_TOKEN => {
                        return Err(empty_container());
                    }
                    _ => {}
                },
                Ok(Event::End(_)) => {
                    if let (Some(d), Some(start)) = (container, token_start) {
                        if depth == d + 1 {
                            return slice(wresult, start, position(&reader));
                        }
                    }
                    if container == Some(depth) {
                        return Err(empty_container());
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Text(text)) => self.check_text_len(text.len())?,
                Ok(Event::CData(text)) => self.check_text_len(text.len())?,
                Ok(Event::DocType(_)) => {
                    return Err(LoginError::MalformedRequest(
                        "DTDs are not allowed in token responses".to_string(),
                    ));
                }
                Ok(Event::Eof) => {
                    return Err(LoginError::MalformedRequest(
                        "no RequestedSecurityToken in token response".to_string(),
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(LoginError::MalformedRequest(format!(
                        "token response is not well formed: {e}"
                    )));
                }
            }
        }
    }

    fn check_text_len(&self, len: usize) -> LoginResult<()> {
        if len > self.quotas.max_string_content_length {
            return Err(LoginError::MalformedRequest(format!(
                "text content exceeds {} bytes",
                self.quotas.max_string_content_length
            )));
        }
        Ok(())
    }
}

impl TokenExtractor for WsFedPostExtractor {
    fn extract_signed_token(&self, body: &[u8]) -> LoginResult<SignInRequest> {
        let form = WsFedForm::parse(body)?;

        if let Some(wa) = form.wa.as_deref() {
            if wa != WSIGNIN {
                return Err(LoginError::MalformedRequest(format!(
                    "unsupported action {wa:?}"
                )));
            }
        }

        let wresult = form
            .wresult
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .ok_or_else(|| LoginError::MalformedRequest("wresult parameter required".to_string()))?;

        let token = self.locate_token(wresult)?;
        tracing::debug!(token_bytes = token.size(), "Signed token located");

        Ok(SignInRequest {
            token,
            context: form.wctx.filter(|c| !c.is_empty()),
        })
    }
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn slice(xml: &str, start: usize, end: usize) -> LoginResult<RawToken> {
    xml.get(start..end)
        .map(|s| RawToken::new(s.trim()))
        .ok_or_else(|| LoginError::MalformedRequest("token boundaries are invalid".to_string()))
}

fn empty_container() -> LoginError {
    LoginError::MalformedRequest("RequestedSecurityToken is empty".to_string())
}

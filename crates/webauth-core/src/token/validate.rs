//! Per-variant token validation.
//!
//! Validation is a pure function of the variant payload, run before
//! encoding and after decoding. The two modes differ in exactly one
//! check: expiration is enforced only while decoding, so producing an
//! already-expired token (for tests, or pre-dated tokens) stays legal.
//!
//! Error messages follow fixed shapes so callers can diagnose bad
//! tokens: "missing X in Y token", "empty X in Y token", "X not valid
//! with Z in Y token", and "unknown ... in Y token".

use crate::error::{Result, WebauthError};
use crate::keyring::now_secs;
use crate::secret::SecretBytes;
use crate::token::types::*;
use crate::token::Token;

/// Whether the token is being produced or consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mode {
    /// Producing a token; expiration is not enforced.
    Encode,
    /// Consuming a token; an expiration in the past is an error.
    Decode,
}

/// Validates a token's cross-field rules for the given mode.
pub(super) fn check(token: &Token, mode: Mode) -> Result<()> {
    match token {
        Token::App(t) => check_app(t, mode),
        Token::Cred(t) => check_cred(t, mode),
        Token::Error(t) => check_error(t),
        Token::Id(t) => check_id(t, mode),
        Token::Login(t) => check_login(t),
        Token::Proxy(t) => check_proxy(t, mode),
        Token::Request(t) => check_request(t),
        Token::WebkdcFactor(t) => check_webkdc_factor(t, mode),
        Token::WebkdcProxy(t) => check_webkdc_proxy(t, mode),
        Token::WebkdcService(t) => check_webkdc_service(t, mode),
    }
}

fn missing(field: &str, token: &str) -> WebauthError {
    WebauthError::corrupt(format!("missing {field} in {token} token"))
}

fn forbidden(field: &str, reason: &str, token: &str) -> WebauthError {
    WebauthError::corrupt(format!("{field} not valid with {reason} in {token} token"))
}

/// A required string field: absent or empty is "missing".
fn require_str(value: &str, field: &str, token: &str) -> Result<()> {
    if value.is_empty() {
        return Err(missing(field, token));
    }
    Ok(())
}

fn require_opt_str(value: Option<&String>, field: &str, token: &str) -> Result<()> {
    match value {
        Some(value) => require_str(value, field, token),
        None => Err(missing(field, token)),
    }
}

/// A required data field: present but zero-length is "empty".
fn require_data(value: &SecretBytes, field: &str, token: &str) -> Result<()> {
    if value.is_empty() {
        return Err(WebauthError::corrupt(format!(
            "empty {field} in {token} token"
        )));
    }
    Ok(())
}

/// A required expiration: nonzero always, in the future when decoding.
fn check_expiration(expiration: u64, token: &str, mode: Mode) -> Result<()> {
    if expiration == 0 {
        return Err(missing("expiration", token));
    }
    if mode == Mode::Decode && expiration < now_secs() {
        return Err(WebauthError::TokenExpired { expiration });
    }
    Ok(())
}

fn check_subject_auth(auth: &str, token: &str) -> Result<()> {
    if auth != "krb5" && auth != "webkdc" {
        return Err(WebauthError::corrupt(format!(
            "unknown auth type {auth} in {token} token"
        )));
    }
    Ok(())
}

fn check_proxy_type(proxy_type: &str, token: &str) -> Result<()> {
    if proxy_type != "krb5" {
        return Err(WebauthError::corrupt(format!(
            "unknown proxy type {proxy_type} in {token} token"
        )));
    }
    Ok(())
}

fn check_app(t: &AppToken, mode: Mode) -> Result<()> {
    check_expiration(t.expiration, "app", mode)?;
    if t.session_key.is_some() {
        // The session-key shape carries no user identity at all.
        if t.subject.is_some() {
            return Err(forbidden("subject", "session key", "app"));
        }
        if t.authz_subject.is_some() {
            return Err(forbidden("authz_subject", "session key", "app"));
        }
        if t.last_used.is_some() {
            return Err(forbidden("last_used", "session key", "app"));
        }
        if t.initial_factors.is_some() {
            return Err(forbidden("initial_factors", "session key", "app"));
        }
        if t.session_factors.is_some() {
            return Err(forbidden("session_factors", "session key", "app"));
        }
        if t.loa.is_some() {
            return Err(forbidden("loa", "session key", "app"));
        }
    } else {
        require_opt_str(t.subject.as_ref(), "subject", "app")?;
    }
    Ok(())
}

fn check_cred(t: &CredToken, mode: Mode) -> Result<()> {
    require_str(&t.subject, "subject", "cred")?;
    require_str(&t.cred_type, "type", "cred")?;
    require_str(&t.service, "service", "cred")?;
    require_data(&t.data, "data", "cred")?;
    check_expiration(t.expiration, "cred", mode)?;
    if t.cred_type != "krb5" {
        return Err(WebauthError::corrupt(format!(
            "unknown credential type {} in cred token",
            t.cred_type
        )));
    }
    Ok(())
}

fn check_error(t: &ErrorToken) -> Result<()> {
    if t.code == 0 {
        return Err(missing("code", "error"));
    }
    require_str(&t.message, "message", "error")
}

fn check_id(t: &IdToken, mode: Mode) -> Result<()> {
    require_str(&t.auth, "auth", "id")?;
    check_expiration(t.expiration, "id", mode)?;
    if t.auth == "webkdc" {
        require_opt_str(t.subject.as_ref(), "subject", "id")?;
    }
    if t.auth == "krb5" {
        match &t.auth_data {
            None => return Err(missing("auth_data", "id")),
            Some(data) => require_data(data, "auth_data", "id")?,
        }
    }
    check_subject_auth(&t.auth, "id")
}

fn check_login(t: &LoginToken) -> Result<()> {
    require_str(&t.username, "username", "login")?;
    match (&t.password, &t.otp) {
        (None, None) => {
            return Err(WebauthError::corrupt(
                "either password or otp required in login token",
            ));
        },
        (Some(_), Some(_)) => {
            return Err(WebauthError::corrupt(
                "both password and otp set in login token",
            ));
        },
        (Some(_), None) => {
            if t.otp_type.is_some() {
                return Err(forbidden("otp_type", "password", "login"));
            }
        },
        (None, Some(_)) => {},
    }
    Ok(())
}

fn check_proxy(t: &ProxyToken, mode: Mode) -> Result<()> {
    require_str(&t.subject, "subject", "proxy")?;
    require_str(&t.proxy_type, "type", "proxy")?;
    require_data(&t.webkdc_proxy, "webkdc_proxy", "proxy")?;
    check_expiration(t.expiration, "proxy", mode)?;
    check_proxy_type(&t.proxy_type, "proxy")
}

fn check_request(t: &RequestToken) -> Result<()> {
    // Two entirely different shapes share this token type: a bare
    // WebKDC command, or a request for an id or proxy token.
    if t.command.is_some() {
        if t.requested_type.is_some() {
            return Err(forbidden("type", "command", "request"));
        }
        if t.auth.is_some() {
            return Err(forbidden("auth", "command", "request"));
        }
        if t.proxy_type.is_some() {
            return Err(forbidden("proxy_type", "command", "request"));
        }
        if t.state.is_some() {
            return Err(forbidden("state", "command", "request"));
        }
        if t.return_url.is_some() {
            return Err(forbidden("return_url", "command", "request"));
        }
        if t.options.is_some() {
            return Err(forbidden("options", "command", "request"));
        }
        if t.initial_factors.is_some() {
            return Err(forbidden("initial_factors", "command", "request"));
        }
        if t.session_factors.is_some() {
            return Err(forbidden("session_factors", "command", "request"));
        }
        return Ok(());
    }
    require_opt_str(t.requested_type.as_ref(), "type", "request")?;
    require_opt_str(t.return_url.as_ref(), "return_url", "request")?;
    match t.requested_type.as_deref() {
        Some("id") => {
            require_opt_str(t.auth.as_ref(), "auth", "request")?;
            check_subject_auth(t.auth.as_deref().unwrap_or_default(), "request")
        },
        Some("proxy") => {
            require_opt_str(t.proxy_type.as_ref(), "proxy_type", "request")?;
            check_proxy_type(t.proxy_type.as_deref().unwrap_or_default(), "request")
        },
        other => Err(WebauthError::corrupt(format!(
            "unknown requested token type {} in request token",
            other.unwrap_or_default()
        ))),
    }
}

fn check_webkdc_factor(t: &WebkdcFactorToken, mode: Mode) -> Result<()> {
    require_str(&t.subject, "subject", "webkdc-factor")?;
    check_expiration(t.expiration, "webkdc-factor", mode)?;
    if t.initial_factors.is_none() && t.session_factors.is_none() {
        return Err(WebauthError::corrupt(
            "no factors present in webkdc-factor token",
        ));
    }
    Ok(())
}

fn check_webkdc_proxy(t: &WebkdcProxyToken, mode: Mode) -> Result<()> {
    require_str(&t.subject, "subject", "webkdc-proxy")?;
    require_str(&t.proxy_type, "proxy_type", "webkdc-proxy")?;
    require_str(&t.proxy_subject, "proxy_subject", "webkdc-proxy")?;
    require_data(&t.data, "data", "webkdc-proxy")?;
    check_expiration(t.expiration, "webkdc-proxy", mode)?;
    if t.proxy_type != "krb5" && t.proxy_type != "remuser" && t.proxy_type != "otp" {
        return Err(WebauthError::corrupt(format!(
            "unknown proxy type {} in webkdc-proxy token",
            t.proxy_type
        )));
    }
    Ok(())
}

fn check_webkdc_service(t: &WebkdcServiceToken, mode: Mode) -> Result<()> {
    require_str(&t.subject, "subject", "webkdc-service")?;
    require_data(&t.session_key, "session_key", "webkdc-service")?;
    check_expiration(t.expiration, "webkdc-service", mode)?;
    Ok(())
}

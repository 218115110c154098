//! Typed authentication tokens and their wire codec.
//!
//! A [`Token`] is a tagged union over the ten variant payloads in
//! [`types`]. Encoding validates the variant's cross-field rules,
//! serializes it through the attribute codec, seals the result under the
//! keyring's newest valid key, and wraps the envelope in base64 for
//! transport. Decoding runs the same pipeline in reverse and additionally
//! enforces expiration, so an expired token can still be produced (useful
//! for tests and pre-dated tokens) but never accepted.

mod types;
mod validate;
mod wire;


use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::attrs::AttrList;
use crate::envelope;
use crate::error::{Result, WebauthError};
use crate::keyring::Keyring;

pub use types::{
    AppToken, CredToken, ErrorToken, IdToken, LoginToken, ProxyToken, RequestToken,
    WebkdcFactorToken, WebkdcProxyToken, WebkdcServiceToken,
};

/// The ten wire token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Application session token (`app`).
    App,
    /// Delegated credential token (`cred`).
    Cred,
    /// WebKDC error report (`error`).
    Error,
    /// Identity token (`id`).
    Id,
    /// Login credential token (`login`).
    Login,
    /// WAS proxy token (`proxy`).
    Proxy,
    /// WAS request token (`req`).
    Request,
    /// WebKDC factor token (`webkdc-factor`).
    WebkdcFactor,
    /// WebKDC proxy token (`webkdc-proxy`).
    WebkdcProxy,
    /// WebKDC service token (`webkdc-service`).
    WebkdcService,
}

impl TokenType {
    /// Returns the literal string used in the wire `t` attribute.
    #[must_use]
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Cred => "cred",
            Self::Error => "error",
            Self::Id => "id",
            Self::Login => "login",
            Self::Proxy => "proxy",
            Self::Request => "req",
            Self::WebkdcFactor => "webkdc-factor",
            Self::WebkdcProxy => "webkdc-proxy",
            Self::WebkdcService => "webkdc-service",
        }
    }

    /// Maps a wire `t` attribute value back to a token type.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "app" => Some(Self::App),
            "cred" => Some(Self::Cred),
            "error" => Some(Self::Error),
            "id" => Some(Self::Id),
            "login" => Some(Self::Login),
            "proxy" => Some(Self::Proxy),
            "req" => Some(Self::Request),
            "webkdc-factor" => Some(Self::WebkdcFactor),
            "webkdc-proxy" => Some(Self::WebkdcProxy),
            "webkdc-service" => Some(Self::WebkdcService),
            _ => None,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A WebAuth token: one of the ten typed variants.
///
/// Tokens are value objects: the producer fills a variant, encodes it
/// once, and the result is immutable thereafter. Decoded tokens are
/// freshly built from wire bytes and validated before being returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Application session token.
    App(AppToken),
    /// Delegated credential token.
    Cred(CredToken),
    /// WebKDC error report.
    Error(ErrorToken),
    /// Identity token.
    Id(IdToken),
    /// Login credential token.
    Login(LoginToken),
    /// WAS proxy token.
    Proxy(ProxyToken),
    /// WAS request token.
    Request(RequestToken),
    /// WebKDC factor token.
    WebkdcFactor(WebkdcFactorToken),
    /// WebKDC proxy token.
    WebkdcProxy(WebkdcProxyToken),
    /// WebKDC service token.
    WebkdcService(WebkdcServiceToken),
}

impl Token {
    /// Returns the variant's token type.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        match self {
            Self::App(_) => TokenType::App,
            Self::Cred(_) => TokenType::Cred,
            Self::Error(_) => TokenType::Error,
            Self::Id(_) => TokenType::Id,
            Self::Login(_) => TokenType::Login,
            Self::Proxy(_) => TokenType::Proxy,
            Self::Request(_) => TokenType::Request,
            Self::WebkdcFactor(_) => TokenType::WebkdcFactor,
            Self::WebkdcProxy(_) => TokenType::WebkdcProxy,
            Self::WebkdcService(_) => TokenType::WebkdcService,
        }
    }

    /// Validates, serializes, encrypts, and base64-wraps the token.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] when the variant violates its
    /// field rules, [`WebauthError::NotFound`] when the keyring has no
    /// currently valid encryption key, and the envelope errors otherwise.
    pub fn encode(&self, ring: &Keyring) -> Result<String> {
        Ok(BASE64.encode(self.encode_raw(ring)?))
    }

    /// Like [`Self::encode`] but returns the binary envelope without the
    /// base64 wrapping.
    ///
    /// # Errors
    ///
    /// See [`Self::encode`].
    pub fn encode_raw(&self, ring: &Keyring) -> Result<Vec<u8>> {
        validate::check(self, validate::Mode::Encode)?;
        let attrs = wire::to_attrs(self)?;
        envelope::seal(&attrs.encode(), ring)
    }

    /// Decodes and validates a base64-wrapped token.
    ///
    /// `expected` restricts the token type; `None` accepts any type.
    ///
    /// # Errors
    ///
    /// Returns [`WebauthError::Corrupt`] for malformed base64, a
    /// malformed attribute stream, a field-rule violation, or a type
    /// mismatch against `expected`; [`WebauthError::BadHmac`] or
    /// [`WebauthError::BadKey`] from the envelope; and
    /// [`WebauthError::TokenExpired`] when the token's expiration has
    /// passed.
    pub fn decode(token: &str, expected: Option<TokenType>, ring: &Keyring) -> Result<Self> {
        let raw = BASE64
            .decode(token)
            .map_err(|e| WebauthError::corrupt(format!("token is not valid base64: {e}")))?;
        Self::decode_raw(&raw, expected, ring)
    }

    /// Like [`Self::decode`] but takes the binary envelope directly.
    ///
    /// # Errors
    ///
    /// See [`Self::decode`].
    pub fn decode_raw(raw: &[u8], expected: Option<TokenType>, ring: &Keyring) -> Result<Self> {
        let payload = envelope::open(raw, ring)?;
        let attrs = AttrList::decode(&payload)?;
        let token = wire::from_attrs(&attrs)?;
        if let Some(want) = expected {
            let got = token.token_type();
            if got != want {
                return Err(WebauthError::corrupt(format!(
                    "wrong token type {got}, expected {want}"
                )));
            }
        }
        validate::check(&token, validate::Mode::Decode)?;
        Ok(token)
    }
}

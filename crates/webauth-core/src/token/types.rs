//! The ten token variant payloads.
//!
//! Each struct mirrors one wire token type. Fields are plain data;
//! cross-field rules live in the validation layer and are enforced on
//! both encode and decode. Timestamps are seconds since the epoch, with
//! zero meaning "unset" (`creation` is stamped with the current time
//! during encode when left at zero). Binary credential material uses
//! [`SecretBytes`] so it is wiped on drop and redacted from debug output.

use crate::secret::SecretBytes;

/// Application session token, held by a WAS in a browser cookie.
///
/// Comes in two shapes: a user session (`subject` required) or a bare
/// session-key container (`session_key` present and everything that
/// describes a user absent).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppToken {
    /// Authenticated user, absent in the session-key shape.
    pub subject: Option<String>,
    /// Authorization identity asserted on behalf of the subject.
    pub authz_subject: Option<String>,
    /// Session key material carried instead of a user identity.
    pub session_key: Option<SecretBytes>,
    /// When the session was last active.
    pub last_used: Option<u64>,
    /// Factors used during initial authentication, comma-separated.
    pub initial_factors: Option<String>,
    /// Factors used for the current session, comma-separated.
    pub session_factors: Option<String>,
    /// Level of assurance of the authentication.
    pub loa: Option<u32>,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
    /// When the token expires.
    pub expiration: u64,
}

/// Delegated credential token carrying an opaque credential blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredToken {
    /// Authenticated user the credential belongs to.
    pub subject: String,
    /// Credential type; only `krb5` is defined.
    pub cred_type: String,
    /// Service principal the credential is for.
    pub service: String,
    /// Opaque exported credential.
    pub data: SecretBytes,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
    /// When the token expires.
    pub expiration: u64,
}

/// Error report returned by the WebKDC in place of a requested token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorToken {
    /// Nonzero protocol error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
}

/// Identity token proving a user's authentication to a WAS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdToken {
    /// Authenticated user; required when `auth` is `webkdc`.
    pub subject: Option<String>,
    /// Subject authentication mechanism, `webkdc` or `krb5`.
    pub auth: String,
    /// Mechanism-specific proof; required when `auth` is `krb5`.
    pub auth_data: Option<SecretBytes>,
    /// Factors used during initial authentication, comma-separated.
    pub initial_factors: Option<String>,
    /// Factors used for the current session, comma-separated.
    pub session_factors: Option<String>,
    /// Level of assurance of the authentication.
    pub loa: Option<u32>,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
    /// When the token expires.
    pub expiration: u64,
}

/// Login token carrying a user's credentials to the WebKDC.
///
/// Exactly one of `password` and `otp` must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginToken {
    /// Username being authenticated.
    pub username: String,
    /// Plaintext password.
    pub password: Option<String>,
    /// One-time password code.
    pub otp: Option<String>,
    /// Type of the one-time password; only valid alongside `otp`.
    pub otp_type: Option<String>,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
}

/// Proxy token held by a WAS to request further tokens on a user's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyToken {
    /// Authenticated user.
    pub subject: String,
    /// Proxy type; only `krb5` is defined.
    pub proxy_type: String,
    /// The embedded webkdc-proxy token, opaque to the WAS.
    pub webkdc_proxy: SecretBytes,
    /// Factors used during initial authentication, comma-separated.
    pub initial_factors: Option<String>,
    /// Factors used for the current session, comma-separated.
    pub session_factors: Option<String>,
    /// Level of assurance of the authentication.
    pub loa: Option<u32>,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
    /// When the token expires.
    pub expiration: u64,
}

/// Request token sent by a WAS to the WebKDC.
///
/// Either a bare `command` or a token request (`requested_type` plus
/// `return_url` and the matching auth or proxy type); the two shapes are
/// mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestToken {
    /// WebKDC command, exclusive with every other field.
    pub command: Option<String>,
    /// Requested token type, `id` or `proxy`.
    pub requested_type: Option<String>,
    /// Where to send the user after login.
    pub return_url: Option<String>,
    /// Subject auth type for an `id` request, `webkdc` or `krb5`.
    pub auth: Option<String>,
    /// Proxy type for a `proxy` request, `krb5`.
    pub proxy_type: Option<String>,
    /// Opaque WAS state returned unchanged by the WebKDC.
    pub state: Option<Vec<u8>>,
    /// Comma-separated request options.
    pub options: Option<String>,
    /// Required initial authentication factors, comma-separated.
    pub initial_factors: Option<String>,
    /// Required session factors, comma-separated.
    pub session_factors: Option<String>,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
}

/// Factor token recording additional authentication factors for a user.
///
/// At least one of the two factor lists must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebkdcFactorToken {
    /// User the factors belong to.
    pub subject: String,
    /// Factors satisfied for initial authentication, comma-separated.
    pub initial_factors: Option<String>,
    /// Factors satisfied for the session, comma-separated.
    pub session_factors: Option<String>,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
    /// When the token expires.
    pub expiration: u64,
}

/// Proxy token the WebKDC issues to itself to carry a user's
/// authentication state across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebkdcProxyToken {
    /// Authenticated user.
    pub subject: String,
    /// Proxy type: `krb5`, `remuser`, or `otp`.
    pub proxy_type: String,
    /// Identity of the entity the authentication was proxied through.
    pub proxy_subject: String,
    /// Proxy-type-specific data, such as an exported ticket cache.
    pub data: SecretBytes,
    /// Factors used during initial authentication, comma-separated.
    pub initial_factors: Option<String>,
    /// Level of assurance of the authentication.
    pub loa: Option<u32>,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
    /// When the token expires.
    pub expiration: u64,
}

/// Service token binding a WAS to a session key shared with the WebKDC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebkdcServiceToken {
    /// Identity of the WAS.
    pub subject: String,
    /// Session key shared between the WAS and the WebKDC.
    pub session_key: SecretBytes,
    /// When the token was created (0 = stamp at encode).
    pub creation: u64,
    /// When the token expires.
    pub expiration: u64,
}

//! # webauth-core
//!
//! Token codec and keyring core for a WebAuth-style web single sign-on
//! system.
//!
//! This crate implements the pieces shared by a WebKDC (the central
//! login server), the application servers that consume its tokens, and
//! the tools that manage their keys:
//!
//! - **Typed tokens**: a tagged union of ten token variants, each with
//!   its own field set and cross-field validation rules
//! - **Wire codec**: self-delimiting attribute-list serialization with
//!   typed fields, wrapped in an authenticated AES-CBC + HMAC-SHA1
//!   envelope and base64 for transport
//! - **Keyrings**: versioned, on-disk collections of dated AES keys with
//!   atomic persistence, automatic rotation, and hint-driven key
//!   selection for decryption
//!
//! The core is synchronous and holds no global state; errors are values
//! carrying a failure kind plus detail, never panics. Key material is
//! zeroized on drop and all secret comparisons are constant time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use webauth_core::{AppToken, Keyring, Token, TokenType};
//!
//! # fn example() -> webauth_core::Result<()> {
//! let (ring, _status) = Keyring::auto_update("keyring", true, 30 * 86400)?;
//!
//! let token = Token::App(AppToken {
//!     subject: Some("someuser".to_string()),
//!     expiration: 1_893_456_000,
//!     ..AppToken::default()
//! });
//! let encoded = token.encode(&ring)?;
//! let decoded = Token::decode(&encoded, Some(TokenType::App), &ring)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod attrs;
pub mod envelope;
pub mod error;
pub mod key;
pub mod keyring;
pub mod secret;
pub mod token;

pub use error::{Result, WebauthError};
pub use key::{Key, KeySize, KeyType};
pub use keyring::{KeyUsage, Keyring, KeyringEntry, KeyringUpdate};
pub use secret::SecretBytes;
pub use token::{
    AppToken, CredToken, ErrorToken, IdToken, LoginToken, ProxyToken, RequestToken, Token,
    TokenType, WebkdcFactorToken, WebkdcProxyToken, WebkdcServiceToken,
};

//! Per-variant attribute schema.
//!
//! Every token field maps to a short, stable attribute code; the full
//! table lives in the constants below. Encoding writes only the fields a
//! variant carries, omitting absent optionals; a zero `creation` is
//! stamped with the current time on the way out. Decoding is tolerant:
//! it maps whatever attributes are present into the variant struct and
//! leaves the cross-field rules to the validation layer, which produces
//! the canonical error messages.

use crate::attrs::AttrList;
use crate::error::{Result, WebauthError};
use crate::keyring::now_secs;
use crate::secret::SecretBytes;
use crate::token::types::*;
use crate::token::{Token, TokenType};

/// Token type (`t`), present in every token.
const A_TYPE: &str = "t";
/// Subject (`s`).
const A_SUBJECT: &str = "s";
/// Authorization subject (`sz`), app tokens.
const A_AUTHZ_SUBJECT: &str = "sz";
/// Creation time (`ct`).
const A_CREATION: &str = "ct";
/// Expiration time (`et`).
const A_EXPIRATION: &str = "et";
/// Initial authentication factors (`ia`).
const A_INITIAL_FACTORS: &str = "ia";
/// Session factors (`sf`).
const A_SESSION_FACTORS: &str = "sf";
/// Level of assurance (`loa`).
const A_LOA: &str = "loa";
/// Session key (`k`), app and webkdc-service tokens.
const A_SESSION_KEY: &str = "k";
/// Last-used time (`lt`), app tokens.
const A_LAST_USED: &str = "lt";
/// Credential type (`crt`), cred tokens.
const A_CRED_TYPE: &str = "crt";
/// Credential service (`crs`), cred tokens.
const A_CRED_SERVICE: &str = "crs";
/// Credential data (`crd`), cred tokens.
const A_CRED_DATA: &str = "crd";
/// Error code (`ec`), error tokens.
const A_ERROR_CODE: &str = "ec";
/// Error message (`em`), error tokens.
const A_ERROR_MESSAGE: &str = "em";
/// Subject auth type (`sa`), id and request tokens.
const A_SUBJECT_AUTH: &str = "sa";
/// Subject auth data (`sad`), id tokens.
const A_SUBJECT_AUTH_DATA: &str = "sad";
/// Username (`u`), login tokens.
const A_USERNAME: &str = "u";
/// Password (`p`), login tokens.
const A_PASSWORD: &str = "p";
/// One-time password (`otp`), login tokens.
const A_OTP: &str = "otp";
/// One-time password type (`ott`), login tokens.
const A_OTP_TYPE: &str = "ott";
/// Proxy type (`pt`), proxy, request, and webkdc-proxy tokens.
const A_PROXY_TYPE: &str = "pt";
/// Proxy subject (`ps`), webkdc-proxy tokens.
const A_PROXY_SUBJECT: &str = "ps";
/// Proxy data (`pd`), webkdc-proxy tokens.
const A_PROXY_DATA: &str = "pd";
/// Embedded webkdc-proxy token (`wt`), proxy tokens.
const A_WEBKDC_TOKEN: &str = "wt";
/// Command (`cmd`), request tokens.
const A_COMMAND: &str = "cmd";
/// Requested token type (`rtt`), request tokens.
const A_REQUESTED_TYPE: &str = "rtt";
/// Return URL (`ru`), request tokens.
const A_RETURN_URL: &str = "ru";
/// Opaque WAS state (`as`), request tokens.
const A_APP_STATE: &str = "as";
/// Request options (`ro`), request tokens.
const A_OPTIONS: &str = "ro";

/// Serializes a token into its attribute list, stamping `creation`.
pub(super) fn to_attrs(token: &Token) -> Result<AttrList> {
    let mut attrs = AttrList::with_capacity(8);
    attrs.add_str(A_TYPE, token.token_type().as_wire());
    match token {
        Token::App(t) => encode_app(t, &mut attrs)?,
        Token::Cred(t) => encode_cred(t, &mut attrs)?,
        Token::Error(t) => encode_error(t, &mut attrs)?,
        Token::Id(t) => encode_id(t, &mut attrs)?,
        Token::Login(t) => encode_login(t, &mut attrs)?,
        Token::Proxy(t) => encode_proxy(t, &mut attrs)?,
        Token::Request(t) => encode_request(t, &mut attrs)?,
        Token::WebkdcFactor(t) => encode_webkdc_factor(t, &mut attrs)?,
        Token::WebkdcProxy(t) => encode_webkdc_proxy(t, &mut attrs)?,
        Token::WebkdcService(t) => encode_webkdc_service(t, &mut attrs)?,
    }
    Ok(attrs)
}

/// Builds a token from a decoded attribute list, dispatching on `t`.
pub(super) fn from_attrs(attrs: &AttrList) -> Result<Token> {
    let name = attrs
        .get_str(A_TYPE)?
        .ok_or_else(|| WebauthError::corrupt("token has no type attribute"))?;
    let token_type = TokenType::from_wire(name)
        .ok_or_else(|| WebauthError::corrupt(format!("unknown token type {name}")))?;
    Ok(match token_type {
        TokenType::App => Token::App(decode_app(attrs)?),
        TokenType::Cred => Token::Cred(decode_cred(attrs)?),
        TokenType::Error => Token::Error(decode_error(attrs)?),
        TokenType::Id => Token::Id(decode_id(attrs)?),
        TokenType::Login => Token::Login(decode_login(attrs)?),
        TokenType::Proxy => Token::Proxy(decode_proxy(attrs)?),
        TokenType::Request => Token::Request(decode_request(attrs)?),
        TokenType::WebkdcFactor => Token::WebkdcFactor(decode_webkdc_factor(attrs)?),
        TokenType::WebkdcProxy => Token::WebkdcProxy(decode_webkdc_proxy(attrs)?),
        TokenType::WebkdcService => Token::WebkdcService(decode_webkdc_service(attrs)?),
    })
}

/// The token's creation time, stamping zero as "now".
fn creation_or_now(creation: u64) -> u64 {
    if creation == 0 {
        now_secs()
    } else {
        creation
    }
}

fn add_opt_str(attrs: &mut AttrList, name: &str, value: Option<&String>) {
    if let Some(value) = value {
        attrs.add_str(name, value);
    }
}

fn add_opt_u32(attrs: &mut AttrList, name: &str, value: Option<u32>) {
    if let Some(value) = value {
        attrs.add_u32(name, value);
    }
}

fn get_opt_string(attrs: &AttrList, name: &str) -> Result<Option<String>> {
    Ok(attrs.get_str(name)?.map(str::to_string))
}

fn get_string(attrs: &AttrList, name: &str) -> Result<String> {
    Ok(attrs.get_str(name)?.unwrap_or_default().to_string())
}

fn get_opt_secret(attrs: &AttrList, name: &str) -> Option<SecretBytes> {
    attrs.get_bytes(name).map(SecretBytes::from)
}

fn get_secret(attrs: &AttrList, name: &str) -> SecretBytes {
    get_opt_secret(attrs, name).unwrap_or_default()
}

fn get_time_or_zero(attrs: &AttrList, name: &str) -> Result<u64> {
    Ok(attrs.get_time(name)?.unwrap_or(0))
}

fn encode_app(t: &AppToken, attrs: &mut AttrList) -> Result<()> {
    add_opt_str(attrs, A_SUBJECT, t.subject.as_ref());
    add_opt_str(attrs, A_AUTHZ_SUBJECT, t.authz_subject.as_ref());
    if let Some(key) = &t.session_key {
        attrs.add_bytes(A_SESSION_KEY, key.as_bytes());
    }
    if let Some(last_used) = t.last_used {
        attrs.add_time(A_LAST_USED, last_used)?;
    }
    add_opt_str(attrs, A_INITIAL_FACTORS, t.initial_factors.as_ref());
    add_opt_str(attrs, A_SESSION_FACTORS, t.session_factors.as_ref());
    add_opt_u32(attrs, A_LOA, t.loa);
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    attrs.add_time(A_EXPIRATION, t.expiration)?;
    Ok(())
}

fn decode_app(attrs: &AttrList) -> Result<AppToken> {
    Ok(AppToken {
        subject: get_opt_string(attrs, A_SUBJECT)?,
        authz_subject: get_opt_string(attrs, A_AUTHZ_SUBJECT)?,
        session_key: get_opt_secret(attrs, A_SESSION_KEY),
        last_used: attrs.get_time(A_LAST_USED)?,
        initial_factors: get_opt_string(attrs, A_INITIAL_FACTORS)?,
        session_factors: get_opt_string(attrs, A_SESSION_FACTORS)?,
        loa: attrs.get_u32(A_LOA)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
        expiration: get_time_or_zero(attrs, A_EXPIRATION)?,
    })
}

fn encode_cred(t: &CredToken, attrs: &mut AttrList) -> Result<()> {
    attrs.add_str(A_SUBJECT, &t.subject);
    attrs.add_str(A_CRED_TYPE, &t.cred_type);
    attrs.add_str(A_CRED_SERVICE, &t.service);
    attrs.add_bytes(A_CRED_DATA, t.data.as_bytes());
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    attrs.add_time(A_EXPIRATION, t.expiration)?;
    Ok(())
}

fn decode_cred(attrs: &AttrList) -> Result<CredToken> {
    Ok(CredToken {
        subject: get_string(attrs, A_SUBJECT)?,
        cred_type: get_string(attrs, A_CRED_TYPE)?,
        service: get_string(attrs, A_CRED_SERVICE)?,
        data: get_secret(attrs, A_CRED_DATA),
        creation: get_time_or_zero(attrs, A_CREATION)?,
        expiration: get_time_or_zero(attrs, A_EXPIRATION)?,
    })
}

fn encode_error(t: &ErrorToken, attrs: &mut AttrList) -> Result<()> {
    attrs.add_u32(A_ERROR_CODE, t.code);
    attrs.add_str(A_ERROR_MESSAGE, &t.message);
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    Ok(())
}

fn decode_error(attrs: &AttrList) -> Result<ErrorToken> {
    Ok(ErrorToken {
        code: attrs.get_u32(A_ERROR_CODE)?.unwrap_or(0),
        message: get_string(attrs, A_ERROR_MESSAGE)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
    })
}

fn encode_id(t: &IdToken, attrs: &mut AttrList) -> Result<()> {
    add_opt_str(attrs, A_SUBJECT, t.subject.as_ref());
    attrs.add_str(A_SUBJECT_AUTH, &t.auth);
    if let Some(data) = &t.auth_data {
        attrs.add_bytes(A_SUBJECT_AUTH_DATA, data.as_bytes());
    }
    add_opt_str(attrs, A_INITIAL_FACTORS, t.initial_factors.as_ref());
    add_opt_str(attrs, A_SESSION_FACTORS, t.session_factors.as_ref());
    add_opt_u32(attrs, A_LOA, t.loa);
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    attrs.add_time(A_EXPIRATION, t.expiration)?;
    Ok(())
}

fn decode_id(attrs: &AttrList) -> Result<IdToken> {
    Ok(IdToken {
        subject: get_opt_string(attrs, A_SUBJECT)?,
        auth: get_string(attrs, A_SUBJECT_AUTH)?,
        auth_data: get_opt_secret(attrs, A_SUBJECT_AUTH_DATA),
        initial_factors: get_opt_string(attrs, A_INITIAL_FACTORS)?,
        session_factors: get_opt_string(attrs, A_SESSION_FACTORS)?,
        loa: attrs.get_u32(A_LOA)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
        expiration: get_time_or_zero(attrs, A_EXPIRATION)?,
    })
}

fn encode_login(t: &LoginToken, attrs: &mut AttrList) -> Result<()> {
    attrs.add_str(A_USERNAME, &t.username);
    add_opt_str(attrs, A_PASSWORD, t.password.as_ref());
    add_opt_str(attrs, A_OTP, t.otp.as_ref());
    add_opt_str(attrs, A_OTP_TYPE, t.otp_type.as_ref());
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    Ok(())
}

fn decode_login(attrs: &AttrList) -> Result<LoginToken> {
    Ok(LoginToken {
        username: get_string(attrs, A_USERNAME)?,
        password: get_opt_string(attrs, A_PASSWORD)?,
        otp: get_opt_string(attrs, A_OTP)?,
        otp_type: get_opt_string(attrs, A_OTP_TYPE)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
    })
}

fn encode_proxy(t: &ProxyToken, attrs: &mut AttrList) -> Result<()> {
    attrs.add_str(A_SUBJECT, &t.subject);
    attrs.add_str(A_PROXY_TYPE, &t.proxy_type);
    attrs.add_bytes(A_WEBKDC_TOKEN, t.webkdc_proxy.as_bytes());
    add_opt_str(attrs, A_INITIAL_FACTORS, t.initial_factors.as_ref());
    add_opt_str(attrs, A_SESSION_FACTORS, t.session_factors.as_ref());
    add_opt_u32(attrs, A_LOA, t.loa);
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    attrs.add_time(A_EXPIRATION, t.expiration)?;
    Ok(())
}

fn decode_proxy(attrs: &AttrList) -> Result<ProxyToken> {
    Ok(ProxyToken {
        subject: get_string(attrs, A_SUBJECT)?,
        proxy_type: get_string(attrs, A_PROXY_TYPE)?,
        webkdc_proxy: get_secret(attrs, A_WEBKDC_TOKEN),
        initial_factors: get_opt_string(attrs, A_INITIAL_FACTORS)?,
        session_factors: get_opt_string(attrs, A_SESSION_FACTORS)?,
        loa: attrs.get_u32(A_LOA)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
        expiration: get_time_or_zero(attrs, A_EXPIRATION)?,
    })
}

fn encode_request(t: &RequestToken, attrs: &mut AttrList) -> Result<()> {
    add_opt_str(attrs, A_COMMAND, t.command.as_ref());
    add_opt_str(attrs, A_REQUESTED_TYPE, t.requested_type.as_ref());
    add_opt_str(attrs, A_RETURN_URL, t.return_url.as_ref());
    add_opt_str(attrs, A_SUBJECT_AUTH, t.auth.as_ref());
    add_opt_str(attrs, A_PROXY_TYPE, t.proxy_type.as_ref());
    if let Some(state) = &t.state {
        attrs.add_bytes(A_APP_STATE, state.clone());
    }
    add_opt_str(attrs, A_OPTIONS, t.options.as_ref());
    add_opt_str(attrs, A_INITIAL_FACTORS, t.initial_factors.as_ref());
    add_opt_str(attrs, A_SESSION_FACTORS, t.session_factors.as_ref());
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    Ok(())
}

fn decode_request(attrs: &AttrList) -> Result<RequestToken> {
    Ok(RequestToken {
        command: get_opt_string(attrs, A_COMMAND)?,
        requested_type: get_opt_string(attrs, A_REQUESTED_TYPE)?,
        return_url: get_opt_string(attrs, A_RETURN_URL)?,
        auth: get_opt_string(attrs, A_SUBJECT_AUTH)?,
        proxy_type: get_opt_string(attrs, A_PROXY_TYPE)?,
        state: attrs.get_bytes(A_APP_STATE).map(<[u8]>::to_vec),
        options: get_opt_string(attrs, A_OPTIONS)?,
        initial_factors: get_opt_string(attrs, A_INITIAL_FACTORS)?,
        session_factors: get_opt_string(attrs, A_SESSION_FACTORS)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
    })
}

fn encode_webkdc_factor(t: &WebkdcFactorToken, attrs: &mut AttrList) -> Result<()> {
    attrs.add_str(A_SUBJECT, &t.subject);
    add_opt_str(attrs, A_INITIAL_FACTORS, t.initial_factors.as_ref());
    add_opt_str(attrs, A_SESSION_FACTORS, t.session_factors.as_ref());
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    attrs.add_time(A_EXPIRATION, t.expiration)?;
    Ok(())
}

fn decode_webkdc_factor(attrs: &AttrList) -> Result<WebkdcFactorToken> {
    Ok(WebkdcFactorToken {
        subject: get_string(attrs, A_SUBJECT)?,
        initial_factors: get_opt_string(attrs, A_INITIAL_FACTORS)?,
        session_factors: get_opt_string(attrs, A_SESSION_FACTORS)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
        expiration: get_time_or_zero(attrs, A_EXPIRATION)?,
    })
}

fn encode_webkdc_proxy(t: &WebkdcProxyToken, attrs: &mut AttrList) -> Result<()> {
    attrs.add_str(A_SUBJECT, &t.subject);
    attrs.add_str(A_PROXY_TYPE, &t.proxy_type);
    attrs.add_str(A_PROXY_SUBJECT, &t.proxy_subject);
    attrs.add_bytes(A_PROXY_DATA, t.data.as_bytes());
    add_opt_str(attrs, A_INITIAL_FACTORS, t.initial_factors.as_ref());
    add_opt_u32(attrs, A_LOA, t.loa);
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    attrs.add_time(A_EXPIRATION, t.expiration)?;
    Ok(())
}

fn decode_webkdc_proxy(attrs: &AttrList) -> Result<WebkdcProxyToken> {
    Ok(WebkdcProxyToken {
        subject: get_string(attrs, A_SUBJECT)?,
        proxy_type: get_string(attrs, A_PROXY_TYPE)?,
        proxy_subject: get_string(attrs, A_PROXY_SUBJECT)?,
        data: get_secret(attrs, A_PROXY_DATA),
        initial_factors: get_opt_string(attrs, A_INITIAL_FACTORS)?,
        loa: attrs.get_u32(A_LOA)?,
        creation: get_time_or_zero(attrs, A_CREATION)?,
        expiration: get_time_or_zero(attrs, A_EXPIRATION)?,
    })
}

fn encode_webkdc_service(t: &WebkdcServiceToken, attrs: &mut AttrList) -> Result<()> {
    attrs.add_str(A_SUBJECT, &t.subject);
    attrs.add_bytes(A_SESSION_KEY, t.session_key.as_bytes());
    attrs.add_time(A_CREATION, creation_or_now(t.creation))?;
    attrs.add_time(A_EXPIRATION, t.expiration)?;
    Ok(())
}

fn decode_webkdc_service(attrs: &AttrList) -> Result<WebkdcServiceToken> {
    Ok(WebkdcServiceToken {
        subject: get_string(attrs, A_SUBJECT)?,
        session_key: get_secret(attrs, A_SESSION_KEY),
        creation: get_time_or_zero(attrs, A_CREATION)?,
        expiration: get_time_or_zero(attrs, A_EXPIRATION)?,
    })
}

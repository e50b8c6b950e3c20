//! Shimmie2 login cookies: reading them from requests and issuing them.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use super::codec::{session_cookie_value, CodecError};
use crate::store::User;

pub const USER_COOKIE: &str = "shm_user";
pub const SESSION_COOKIE: &str = "shm_session";

/// Lifetime of issued login cookies, same as Shimmie2's `login_memory`.
pub const LOGIN_MEMORY_DAYS: i64 = 365;

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("invalid value for cookie {0}")]
    InvalidValue(&'static str),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Header(#[from] InvalidHeaderValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("no shm_user cookie")]
    MissingUser,
    #[error("no shm_session cookie")]
    MissingSession,
}

/// The username and session token a request claims.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionAssertion {
    pub username: String,
    pub token: String,
}

impl SessionAssertion {
    /// Read `shm_user` and `shm_session` from the request cookies.
    ///
    /// An empty `shm_user` counts as missing. An empty `shm_session` is
    /// returned as is and will simply fail verification.
    ///
    /// # Errors
    /// Returns which cookie is missing.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AssertionError> {
        let username = cookie_value(headers, USER_COOKIE)
            .filter(|value| !value.is_empty())
            .ok_or(AssertionError::MissingUser)?;
        let token = cookie_value(headers, SESSION_COOKIE).ok_or(AssertionError::MissingSession)?;
        Ok(Self { username, token })
    }
}

impl std::fmt::Debug for SessionAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAssertion")
            .field("username", &self.username)
            .field("token", &"***")
            .finish()
    }
}

/// First value of cookie `name` across all `Cookie` headers.
///
/// Pairs that are not valid UTF-8 are skipped without hiding the rest of
/// the header.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .flat_map(|header| header.as_bytes().split(|&byte| byte == b';'))
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| unquote(value.trim()).to_string())
        })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

/// Build a `Set-Cookie` value the way Shimmie2 does: path `/`, one year
/// expiry, neither `HttpOnly` nor `Secure`.
///
/// # Errors
/// Returns an error if `value` contains bytes that are not allowed in a
/// cookie value.
pub fn issue_cookie(name: &'static str, value: &str) -> Result<HeaderValue, CookieError> {
    issue_cookie_at(name, value, Utc::now())
}

fn issue_cookie_at(
    name: &'static str,
    value: &str,
    now: DateTime<Utc>,
) -> Result<HeaderValue, CookieError> {
    if !value.bytes().all(valid_cookie_byte) {
        return Err(CookieError::InvalidValue(name));
    }
    let expires = now + TimeDelta::days(LOGIN_MEMORY_DAYS);
    let cookie = format!(
        "{name}={value}; Path=/; Expires={}",
        expires.format(COOKIE_DATE_FORMAT)
    );
    Ok(HeaderValue::from_str(&cookie)?)
}

// RFC 6265 cookie-octet
const fn valid_cookie_byte(byte: u8) -> bool {
    matches!(byte, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// Both login cookies for `user` logging in from `client_ip`.
///
/// # Errors
/// Fails if the client IP cannot be masked or the username is not a valid
/// cookie value.
pub fn session_cookies(user: &User, client_ip: &str) -> Result<[HeaderValue; 2], CookieError> {
    let session = session_cookie_value(&user.pass, client_ip)?;
    Ok([
        issue_cookie(USER_COOKIE, &user.name)?,
        issue_cookie(SESSION_COOKIE, &session)?,
    ])
}

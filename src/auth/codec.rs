//! Shimmie2 password hash and session cookie derivation.
//!
//! Shimmie2 stores `md5(lower(username) . password)` in `users.pass` and sets
//! the `shm_session` cookie to `md5(pass . masked_ip)`, where the client IP is
//! masked with `255.255.0.0`. Both values are compared byte for byte by the
//! PHP side, so the digest must stay MD5.

use md5::{Digest, Md5};
use std::net::Ipv4Addr;
use subtle::ConstantTimeEq;
use thiserror::Error;

const SESSION_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 0, 0);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid IPv4 address: {0:?}")]
    InvalidAddress(String),
}

/// MD5 of `input` as lowercase hex.
#[must_use]
pub fn digest(input: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Password hash in the format Shimmie2 keeps in `users.pass`.
///
/// Only the username is case-folded.
#[must_use]
pub fn password_hash(username: &str, password: &str) -> String {
    let mut input = username.to_lowercase();
    input.push_str(password);
    digest(input.as_bytes())
}

/// Parse `ip` (optionally suffixed with `:port`) and zero its last two octets.
///
/// # Errors
/// Returns `CodecError::InvalidAddress` when the address is not dotted-decimal
/// IPv4. IPv6 clients cannot hold a Shimmie2 session.
pub fn mask_ip(ip: &str) -> Result<Ipv4Addr, CodecError> {
    let host = ip.split(':').next().unwrap_or_default().trim();
    let addr: Ipv4Addr = host
        .parse()
        .map_err(|_| CodecError::InvalidAddress(ip.to_string()))?;
    Ok(Ipv4Addr::from(u32::from(addr) & u32::from(SESSION_MASK)))
}

/// Recreate the `shm_session` cookie value for a stored password hash.
///
/// # Errors
/// Fails when `client_ip` cannot be masked, see [`mask_ip`].
pub fn session_cookie_value(stored_hash: &str, client_ip: &str) -> Result<String, CodecError> {
    let masked = mask_ip(client_ip)?;
    Ok(digest(format!("{stored_hash}{masked}").as_bytes()))
}

/// Constant-time comparison of two cookie values.
#[must_use]
pub fn sessions_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

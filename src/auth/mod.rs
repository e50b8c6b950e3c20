//! Shimmie2 session authentication.
//!
//! [`codec`] recreates the hashes Shimmie2 puts in the database and in the
//! `shm_session` cookie. [`gate`] uses them to guard `axum` routes without
//! any server-side session state: every request is verified from scratch.

pub mod client_ip;
pub mod codec;
pub mod cookie;
pub mod gate;
pub mod verify;

pub use client_ip::client_ip;
pub use codec::{digest, mask_ip, password_hash, session_cookie_value, CodecError};
pub use cookie::{
    issue_cookie, session_cookies, CookieError, SessionAssertion, SESSION_COOKIE, USER_COOKIE,
};
pub use gate::{require_session, CurrentUser, Gate, GateConfig, Rejection, DEFAULT_LOGIN_URL};
pub use verify::{verify_credentials, VerifyError};

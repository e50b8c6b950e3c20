//! # Shimmie
//!
//! `shimmie` lets a Rust service sit next to a [Shimmie2] imageboard and
//! recognise users who already logged in there.
//!
//! ## Session cookies
//!
//! Shimmie2 keeps no server-side session table. After login it sets two
//! cookies:
//!
//! - `shm_user`: the username.
//! - `shm_session`: `md5(stored_hash + masked_ip)`, where `stored_hash` is the
//!   `users.pass` column and `masked_ip` is the client IPv4 address with the
//!   last two octets zeroed.
//!
//! Every request is checked by looking the user up and recomputing the
//! session value. A client moving within its /16 keeps the session; any
//! other move invalidates it.
//!
//! ## Layout
//!
//! - [`auth`]: hashing, cookie handling and the `axum` request gate.
//! - [`store`]: user lookups against the Shimmie2 `MySQL` database.
//! - [`api`]: the HTTP surface (`/health`, `/v1/me`).
//! - [`cli`]: command line parsing, telemetry and server start.
//!
//! [Shimmie2]: https://github.com/shish/shimmie2

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

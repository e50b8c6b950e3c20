//! Request gate that admits only requests carrying a valid Shimmie2 session.
//!
//! Flow: read `shm_user`/`shm_session`, resolve the user through
//! [`UserGetter`], recompute the session value from the stored hash and the
//! client IP, and compare in constant time. Anonymous, unknown, mismatched and
//! unverifiable requests all get the same 302 to the login page so the
//! response never reveals which check failed. Only a storage failure is
//! surfaced, as a 500.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{
        header::{InvalidHeaderValue, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, error, info, warn};

use super::{
    client_ip::client_ip,
    codec::{session_cookie_value, sessions_match},
    cookie::{AssertionError, SessionAssertion},
};
use crate::store::{User, UserGetter};

pub const DEFAULT_LOGIN_URL: &str = "/user_admin/login";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateConfig {
    login_url: String,
}

impl GateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }

    /// Redirect target for rejected requests. An empty URL keeps the default.
    #[must_use]
    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        let login_url = login_url.into();
        if !login_url.is_empty() {
            self.login_url = login_url;
        }
        self
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of the user a request was admitted for.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Why a request was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Send the client to the login page.
    Login,
    /// The user store failed; carries the diagnostic for the response body.
    StoreFailure(String),
}

pub struct Gate<U> {
    users: Arc<U>,
    login_location: HeaderValue,
}

impl<U> Clone for Gate<U> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            login_location: self.login_location.clone(),
        }
    }
}

impl<U: UserGetter> Gate<U> {
    /// # Errors
    /// Returns an error if the login URL is not a valid `Location` value.
    pub fn new(users: Arc<U>, config: GateConfig) -> Result<Self, InvalidHeaderValue> {
        let login_location = HeaderValue::from_str(config.login_url())?;
        Ok(Self {
            users,
            login_location,
        })
    }

    /// Verify the session cookies of a request coming from `peer`.
    ///
    /// # Errors
    /// Returns the [`Rejection`] to answer with.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Result<User, Rejection> {
        let assertion = match SessionAssertion::from_headers(headers) {
            Ok(assertion) => assertion,
            Err(AssertionError::MissingUser) => {
                debug!("no user cookie, anonymous request");
                return Err(Rejection::Login);
            }
            Err(AssertionError::MissingSession) => {
                info!("no session cookie");
                return Err(Rejection::Login);
            }
        };
        let username = assertion.username.as_str();

        let user = match self.users.get_user_by_name(username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                info!("user {username:?} does not exist");
                return Err(Rejection::Login);
            }
            Err(err) => {
                let message = format!("could not authenticate: get user {username:?} failed: {err}");
                error!("{message}");
                return Err(Rejection::StoreFailure(message));
            }
        };

        let Some(peer) = peer else {
            warn!("peer address unavailable, cannot verify session of {username:?}");
            return Err(Rejection::Login);
        };
        let ip = client_ip(headers, peer);

        let expected = match session_cookie_value(&user.pass, &ip) {
            Ok(expected) => expected,
            Err(err) => {
                warn!("cannot verify session of {username:?}: {err}");
                return Err(Rejection::Login);
            }
        };

        if !sessions_match(&expected, &assertion.token) {
            info!("session mismatch for {username:?}");
            return Err(Rejection::Login);
        }

        debug!("session verified for {username:?}");
        Ok(user)
    }

    fn reject(&self, rejection: Rejection) -> Response {
        match rejection {
            Rejection::Login => {
                (StatusCode::FOUND, [(LOCATION, self.login_location.clone())]).into_response()
            }
            Rejection::StoreFailure(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

/// `axum` middleware enforcing the gate, for `middleware::from_fn_with_state`.
///
/// Admitted requests carry a [`CurrentUser`] extension. The server must be
/// started with `into_make_service_with_connect_info::<SocketAddr>()`, a
/// request without a peer address is rejected.
pub async fn require_session<U: UserGetter>(
    State(gate): State<Gate<U>>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let outcome = gate.authenticate(request.headers(), peer).await;
    match outcome {
        Ok(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Err(rejection) => gate.reject(rejection),
    }
}

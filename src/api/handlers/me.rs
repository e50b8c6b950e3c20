//! Current user endpoint, mounted behind the session gate.

use axum::{extract::Extension, response::Json};

use crate::{auth::CurrentUser, store::User};

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "User the session belongs to", body = User),
        (status = 302, description = "No valid Shimmie2 session, redirect to login"),
        (status = 500, description = "User lookup failed", body = String, content_type = "text/plain")
    ),
    tag = "shimmie"
)]
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

use crate::{
    api::handlers::{health, me, root},
    auth::{require_session, Gate, GateConfig},
    store::Datastore,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Extension, Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub(crate) mod handlers;
mod openapi;

pub use openapi::openapi;

/// Build the application router.
///
/// Routes under `/v1` sit behind the Shimmie2 session gate; `/` and
/// `/health` are public.
#[must_use]
pub fn router(store: Datastore, gate: Gate<Datastore>) -> Router {
    let protected = Router::new()
        .route("/v1/me", get(me::me))
        .route_layer(middleware::from_fn_with_state(
            gate,
            require_session::<Datastore>,
        ));

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(health::health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if the login URL is invalid or the server fails to start
pub async fn new(port: u16, store: Datastore, gate_config: GateConfig) -> Result<()> {
    let gate = Gate::new(Arc::new(store.clone()), gate_config).context("Invalid login URL")?;

    let app = router(store, gate);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    // The gate needs the peer address to recompute session cookies.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {err}");
        }
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::to_bytes,
        extract::ConnectInfo,
        http::{header::LOCATION, StatusCode},
    };
    use sqlx::mysql::MySqlPoolOptions;
    use std::time::Duration;
    use tower::ServiceExt;

    fn unreachable_store() -> Result<Datastore> {
        // nothing listens on port 1
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("mysql://shimmie@127.0.0.1:1/shimmie")?;
        Ok(Datastore::from_pool(pool))
    }

    fn test_router() -> Result<Router> {
        let store = unreachable_store()?;
        let gate = Gate::new(Arc::new(store.clone()), GateConfig::new())?;
        Ok(router(store, gate))
    }

    fn get_request(uri: &str) -> Result<Request<Body>> {
        let mut request = Request::builder().uri(uri).body(Body::empty())?;
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([11, 11, 11, 11], 4000))));
        Ok(request)
    }

    #[tokio::test]
    async fn root_is_public() -> Result<()> {
        let response = test_router()?.oneshot(get_request("/")?).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert!(body.starts_with(env!("CARGO_PKG_NAME").as_bytes()));
        Ok(())
    }

    #[tokio::test]
    async fn me_requires_session() -> Result<()> {
        let response = test_router()?.oneshot(get_request("/v1/me")?).await?;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some("/user_admin/login")
        );
        Ok(())
    }

    #[tokio::test]
    async fn me_reports_store_failure() -> Result<()> {
        let mut request = get_request("/v1/me")?;
        request.headers_mut().insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("shm_user=alice; shm_session=abc"),
        );
        let response = test_router()?.oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_unreachable_database() -> Result<()> {
        let response = test_router()?.oneshot(get_request("/health")?).await?;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response
            .headers()
            .get("X-App")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(env!("CARGO_PKG_NAME"))));
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let health: serde_json::Value = serde_json::from_slice(&body)?;
        assert_eq!(
            health.get("database").and_then(|v| v.as_str()),
            Some("error")
        );
        Ok(())
    }

    #[test]
    fn make_span_without_request_id() -> Result<()> {
        let request = Request::builder().uri("/health").body(Body::empty())?;
        let _span = make_span(&request);
        Ok(())
    }
}

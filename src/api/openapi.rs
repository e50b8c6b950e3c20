use super::handlers::{health, me};
use crate::store::User;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(health::health, me::me),
    components(schemas(health::Health, User)),
    tags(
        (name = "health", description = "Service and database status"),
        (name = "shimmie", description = "Endpoints behind the Shimmie2 session gate")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    // Use Cargo.toml metadata instead of the utoipa crate info defaults.
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = Some(env!("CARGO_PKG_DESCRIPTION").to_string());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_routes() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/v1/me"));
    }

    #[test]
    fn user_schema_has_no_password_hash() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(openapi())?;
        let user = json
            .pointer("/components/schemas/User/properties")
            .and_then(|value| value.as_object());
        assert!(user.is_some_and(|props| props.contains_key("name")));
        assert!(user.is_some_and(|props| !props.contains_key("pass")));
        Ok(())
    }
}

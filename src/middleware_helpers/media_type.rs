//! JSON:API media type negotiation.
//!
//! A client that lists the JSON:API media type in `Accept` only with media
//! type parameters cannot be served and gets 406. Request bodies are checked
//! by the [`JsonApiBody`](crate::jsonapi::JsonApiBody) extractor.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::{errors::ServiceError, jsonapi::MEDIA_TYPE};

/// Whether a response in the JSON:API media type satisfies `accept`
pub fn accepts_jsonapi(accept: Option<&str>) -> bool {
    let Some(accept) = accept else {
        return true;
    };

    let mut saw_jsonapi = false;
    for range in accept.split(',') {
        let mut parts = range.split(';');
        let media_type = parts.next().unwrap_or_default().trim();
        if !media_type.eq_ignore_ascii_case(MEDIA_TYPE) {
            continue;
        }
        saw_jsonapi = true;
        if parts.all(|param| param.trim().is_empty()) {
            return true;
        }
    }

    !saw_jsonapi
}

/// Rejects requests whose `Accept` header rules out the plain JSON:API media type
pub async fn jsonapi_negotiation(request: Request, next: Next) -> Response {
    let accept = request
        .headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());

    if !accepts_jsonapi(accept) {
        debug!(accept = ?accept, "rejecting request with unsupported Accept header");
        return ServiceError::NotAcceptable(format!(
            "Accept must allow {} without media type parameters",
            MEDIA_TYPE
        ))
        .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[test]
    fn missing_or_generic_accept_is_fine() {
        assert!(accepts_jsonapi(None));
        assert!(accepts_jsonapi(Some("*/*")));
        assert!(accepts_jsonapi(Some("application/json")));
    }

    #[test]
    fn plain_media_type_is_accepted() {
        assert!(accepts_jsonapi(Some(MEDIA_TYPE)));
        assert!(accepts_jsonapi(Some(
            "application/vnd.api+json; ext=bulk, application/vnd.api+json"
        )));
    }

    #[test]
    fn parameterised_media_type_only_is_not_acceptable() {
        assert!(!accepts_jsonapi(Some("application/vnd.api+json; charset=utf-8")));
        assert!(!accepts_jsonapi(Some(
            "application/vnd.api+json;ext=a, text/html, application/vnd.api+json;q=0.5"
        )));
    }

    #[tokio::test]
    async fn middleware_returns_406() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(jsonapi_negotiation));

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(header::ACCEPT, "application/vnd.api+json; version=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], MEDIA_TYPE);
    }
}

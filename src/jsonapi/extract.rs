use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use super::{
    document::{Document, RequestDocument, RequestResource},
    MEDIA_TYPE,
};
use crate::errors::ServiceError;

/// Request body carrying a single JSON:API resource object.
///
/// The `Content-Type` must be exactly the JSON:API media type, without
/// parameters.
#[derive(Debug)]
pub struct JsonApiBody(pub RequestResource);

fn has_jsonapi_content_type(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case(MEDIA_TYPE))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for JsonApiBody
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_jsonapi_content_type(&req) {
            return Err(ServiceError::UnsupportedMediaType(format!(
                "Request bodies must use Content-Type {}",
                MEDIA_TYPE
            )));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => {
                    ServiceError::PayloadTooLarge(rejection.body_text())
                }
                _ => ServiceError::BadRequest(rejection.body_text()),
            })?;

        let document: RequestDocument = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::BadRequest(format!("Malformed JSON:API document: {}", e)))?;

        Ok(JsonApiBody(document.data))
    }
}

/// JSON:API response with the proper media type
#[derive(Debug)]
pub struct JsonApi {
    status: StatusCode,
    location: Option<String>,
    document: Document,
}

impl JsonApi {
    pub fn ok(document: Document) -> Self {
        Self {
            status: StatusCode::OK,
            location: None,
            document,
        }
    }

    pub fn created(document: Document, location: String) -> Self {
        Self {
            status: StatusCode::CREATED,
            location: Some(location),
            document,
        }
    }
}

impl IntoResponse for JsonApi {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.document)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        if let Some(location) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            headers.insert(header::LOCATION, location);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::body::Body;

    fn request(content_type: Option<&str>, body: &str) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/items");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn accepts_jsonapi_body() {
        let req = request(
            Some(MEDIA_TYPE),
            r#"{"data":{"type":"items","attributes":{"name":"Widget"}}}"#,
        );
        let JsonApiBody(resource) = JsonApiBody::from_request(req, &()).await.unwrap();
        assert_eq!(resource.kind, "items");
        assert_eq!(resource.attributes["name"], "Widget");
    }

    #[tokio::test]
    async fn rejects_other_content_types() {
        for content_type in [
            Some("application/json"),
            Some("application/vnd.api+json; charset=utf-8"),
            None,
        ] {
            let req = request(content_type, r#"{"data":{"type":"items"}}"#);
            assert_matches!(
                JsonApiBody::from_request(req, &()).await,
                Err(ServiceError::UnsupportedMediaType(_))
            );
        }
    }

    #[tokio::test]
    async fn rejects_documents_without_data() {
        let req = request(Some(MEDIA_TYPE), r#"{"name":"Widget"}"#);
        assert_matches!(
            JsonApiBody::from_request(req, &()).await,
            Err(ServiceError::BadRequest(_))
        );
    }

    #[test]
    fn created_response_sets_location_and_media_type() {
        let response =
            JsonApi::created(Document::collection(Vec::new()), "/items/1".into()).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/items/1");
        assert_eq!(response.headers()[header::CONTENT_TYPE], MEDIA_TYPE);
    }
}

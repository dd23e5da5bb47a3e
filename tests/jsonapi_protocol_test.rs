mod common;

use axum::http::{header, Method, StatusCode};
use common::{body_json, first_error, TestApp};
use item_events_api::jsonapi::MEDIA_TYPE;
use serde_json::{json, Value};

const WIDGET: &str = r#"{"data":{"type":"items","attributes":{"name":"Widget"}}}"#;

#[tokio::test]
async fn plain_json_content_type_is_unsupported() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::POST,
            "/items",
            Some(WIDGET.to_string()),
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(response.headers()[header::CONTENT_TYPE], MEDIA_TYPE);

    let response = app
        .request_with_headers(
            Method::POST,
            "/items",
            Some(WIDGET.to_string()),
            &[("content-type", "application/vnd.api+json; charset=utf-8")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn parameterised_accept_is_not_acceptable() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::GET,
            "/items",
            None,
            &[("accept", "application/vnd.api+json; ext=bulk")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);

    let response = app
        .request_with_headers(Method::GET, "/items", None, &[("accept", "*/*")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_documents_are_bad_requests() {
    let app = TestApp::new().await;

    for body in ["{not json", r#"{"name":"Widget"}"#, r#"{"data":{"attributes":{}}}"#] {
        let response = app
            .request_with_headers(
                Method::POST,
                "/items",
                Some(body.to_string()),
                &[("content-type", MEDIA_TYPE)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let app = TestApp::with_config(|cfg| cfg.max_body_size = 64).await;

    let name = "x".repeat(256);
    let body = json!({"data": {"type": "items", "attributes": {"name": name}}}).to_string();
    let response = app
        .request_with_headers(
            Method::POST,
            "/items",
            Some(body),
            &[("content-type", MEDIA_TYPE)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unknown_routes_use_error_documents() {
    let app = TestApp::new().await;

    let response = app.get("/widgets").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::CONTENT_TYPE], MEDIA_TYPE);
    let error = first_error(response).await;
    assert_eq!(error["status"], "404");
}

#[tokio::test]
async fn error_documents_echo_request_id() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::GET,
            "/items/0",
            None,
            &[("x-request-id", "trace-me-42")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "trace-me-42");

    let error = first_error(response).await;
    assert_eq!(error["meta"]["request_id"], "trace-me-42");
}

#[tokio::test]
async fn include_events_builds_compound_document() {
    let app = TestApp::new().await;
    let item = app.create_item("Widget").await;
    let empty = app.create_item("Empty").await;
    let item_id = item["id"].as_str().unwrap();
    let event = app.create_event(item_id).await;

    let body = body_json(app.get("/items?include=events").await).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(
        data[0]["relationships"]["events"]["data"],
        json!([{"type": "events", "id": event["id"]}])
    );
    assert_eq!(data[1]["id"], empty["id"]);
    assert_eq!(data[1]["relationships"]["events"]["data"], json!([]));

    let included = body["included"].as_array().unwrap();
    assert_eq!(included.len(), 1);
    assert_eq!(included[0]["type"], "events");
    assert_eq!(included[0]["id"], event["id"]);

    let body = body_json(app.get(&format!("/items/{}?include=events", item_id)).await).await;
    assert_eq!(body["included"][0]["id"], event["id"]);
}

#[tokio::test]
async fn include_item_on_events() {
    let app = TestApp::new().await;
    let item = app.create_item("Widget").await;
    let item_id = item["id"].as_str().unwrap();
    app.create_event(item_id).await;
    app.create_event(item_id).await;

    let body = body_json(app.get("/events?include=item").await).await;
    let included = body["included"].as_array().unwrap();
    assert_eq!(included.len(), 1);
    assert_eq!(included[0]["id"], item_id);
    assert_eq!(included[0]["attributes"]["name"], "Widget");
}

#[tokio::test]
async fn unknown_include_and_sort_fields_are_bad_requests() {
    let app = TestApp::new().await;

    for uri in [
        "/items?include=owner",
        "/events?include=events",
        "/items?sort=colour",
        "/events?sort=name",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn sort_by_name_in_both_directions() {
    let app = TestApp::new().await;
    for name in ["Bravo", "Alpha", "Charlie"] {
        app.create_item(name).await;
    }

    let names = |body: Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["attributes"]["name"].as_str().unwrap().to_string())
            .collect()
    };

    let body = body_json(app.get("/items?sort=name").await).await;
    assert_eq!(names(body), vec!["Alpha", "Bravo", "Charlie"]);

    let body = body_json(app.get("/items?sort=-name").await).await;
    assert_eq!(names(body), vec!["Charlie", "Bravo", "Alpha"]);
}

#[tokio::test]
async fn page_number_pagination_with_links() {
    let app = TestApp::new().await;
    for name in ["One", "Two", "Three"] {
        app.create_item(name).await;
    }

    let body = body_json(app.get("/items?page%5Bnumber%5D=1&page%5Bsize%5D=2").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["record_count"], 3);
    assert!(body["links"]["next"]
        .as_str()
        .unwrap()
        .contains("page%5Bnumber%5D=2"));
    assert!(body["links"].get("prev").is_none());

    let body = body_json(app.get("/items?page%5Bnumber%5D=2&page%5Bsize%5D=2").await).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["attributes"]["name"], "Three");
    assert!(body["links"].get("next").is_none());

    let response = app.get("/items?page%5Bsize%5D=zero").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_page_numbers_are_bad_requests() {
    let app = TestApp::new().await;
    let item = app.create_item("Widget").await;
    let item_id = item["id"].as_str().unwrap();
    app.create_event(item_id).await;

    for uri in [
        "/items?page%5Bnumber%5D=18446744073709551615".to_string(),
        "/items?page%5Bnumber%5D=1000000000000000000".to_string(),
        "/events?page%5Bnumber%5D=18446744073709551615".to_string(),
        format!("/items/{}/events?page%5Bnumber%5D=18446744073709551615", item_id),
    ] {
        let response = app.get(&uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let error = first_error(response).await;
        assert_eq!(error["code"], "invalid_query_parameter");
        assert_eq!(error["source"]["parameter"], "page[number]");
    }

    let response = app.get("/items?page%5Bnumber%5D=1").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn query_errors_name_the_offending_parameter() {
    let app = TestApp::new().await;

    for (uri, parameter) in [
        ("/items?include=owner", "include"),
        ("/items?sort=colour", "sort"),
        ("/items?page%5Bsize%5D=zero", "page[size]"),
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let error = first_error(response).await;
        assert_eq!(error["source"]["parameter"], parameter);
        assert!(error["source"].get("pointer").is_none());
    }
}

#[tokio::test]
async fn filter_by_id() {
    let app = TestApp::new().await;
    let first = app.create_item("One").await;
    app.create_item("Two").await;
    let third = app.create_item("Three").await;

    let uri = format!(
        "/items?filter%5Bid%5D={},{}",
        first["id"].as_str().unwrap(),
        third["id"].as_str().unwrap()
    );
    let body = body_json(app.get(&uri).await).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], first["id"]);
    assert_eq!(data[1]["id"], third["id"]);
}

#[tokio::test]
async fn health_and_status_routes() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(Method::GET, "/health", None, &[])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "up");

    let response = app
        .request_with_headers(Method::GET, "/status", None, &[])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "item-events-api");
}

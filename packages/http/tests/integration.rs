use serde::{Deserialize, Serialize};
use serde_json::json;
use wiremock::matchers::{
    body_json, body_string, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use declarest_http::{
    ContentType, HttpTransport, Method, ReqwestTransport, RequestDescriptor, ResponseType,
    TransportError,
};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
struct User {
    id: u64,
    name: String,
}

fn transport_for(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::default()
        .with_base_url(&server.uri())
        .unwrap()
}

#[tokio::test]
async fn test_get_relative_url() {
    let server = MockServer::start().await;

    let user = User {
        id: 123,
        name: "Alice".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/users/123"))
        .and(query_param("expand", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&user))
        .mount(&server)
        .await;

    let response = transport_for(&server)
        .send(RequestDescriptor::get("/users/123?expand=1"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json::<User>().unwrap(), user);
}

#[tokio::test]
async fn test_post_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "Bob"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "name": "Bob"})))
        .mount(&server)
        .await;

    let request = RequestDescriptor::post("/users").with_data(json!({"name": "Bob"}));
    let response = transport_for(&server).send(request).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.body["id"], 7);
}

#[tokio::test]
async fn test_post_form_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("user=ada"))
        .and(body_string_contains("password=hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let request = RequestDescriptor::post("/login")
        .with_content_type(ContentType::FormUrlEncoded)
        .with_data(json!({"user": "ada", "password": "hunter2", "remember": null}));
    let response = transport_for(&server).send(request).await.unwrap();

    assert_eq!(response.body, json!({"ok": true}));
}

#[tokio::test]
async fn test_text_plain_body_and_text_response() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/notes/1"))
        .and(header("content-type", "text/plain"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .mount(&server)
        .await;

    let request = RequestDescriptor::new(Method::PUT, "/notes/1")
        .with_content_type(ContentType::TextPlain)
        .with_response_type(ResponseType::Text)
        .with_data(json!("hello"));
    let response = transport_for(&server).send(request).await.unwrap();

    assert_eq!(response.body, json!("stored"));
}

#[tokio::test]
async fn test_headers_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"me": true})))
        .mount(&server)
        .await;

    let request = RequestDescriptor::get("/me").with_header("Authorization", "Bearer token");
    let response = transport_for(&server).send(request).await.unwrap();

    assert_eq!(response.body, json!({"me": true}));
}

#[tokio::test]
async fn test_error_status_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not found"})))
        .mount(&server)
        .await;

    let err = transport_for(&server)
        .send(RequestDescriptor::get("/missing"))
        .await
        .unwrap_err();

    match err {
        TransportError::Status { status, response } => {
            assert_eq!(status, 404);
            assert_eq!(response.body, json!({"error": "Not found"}));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_error_status_resolves_without_validation() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let request = RequestDescriptor::new(Method::DELETE, "/gone")
        .with_option("validate_status", json!(false));
    let response = transport_for(&server).send(request).await.unwrap();

    assert_eq!(response.status, 410);
    assert!(response.body.is_null());
}

#[tokio::test]
async fn test_absolute_url_ignores_base() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::default()
        .with_base_url("http://127.0.0.1:9")
        .unwrap();
    let request = RequestDescriptor::get(format!("{}/ping", server.uri()))
        .with_response_type(ResponseType::Text);
    let response = transport.send(request).await.unwrap();

    assert_eq!(response.body_text.as_deref(), Some("pong"));
}

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use base64ct::{Base64, Encoding};
use serde_json::Value;

fn builder(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    builder(Method::GET, uri, token)
        .body(Body::empty())
        .expect("Failed to build request")
}

pub fn put_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    builder(Method::PUT, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(body).expect("Failed to serialize body"),
        ))
        .expect("Failed to build request")
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    builder(Method::DELETE, uri, token)
        .body(Body::empty())
        .expect("Failed to build request")
}

pub fn post(uri: &str, token: Option<&str>) -> Request<Body> {
    builder(Method::POST, uri, token)
        .body(Body::empty())
        .expect("Failed to build request")
}

/// POST with HTTP Basic credentials instead of a bearer token
pub fn post_basic(uri: &str, username: &str, password: &str) -> Request<Body> {
    let credentials = Base64::encode_string(format!("{}:{}", username, password).as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Basic {}", credentials))
        .body(Body::empty())
        .expect("Failed to build request")
}

/// Read the full response body as raw bytes
pub async fn read_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body")
        .to_vec()
}

/// Read and parse the response body as JSON
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = read_bytes(response).await;
    serde_json::from_slice(&bytes).expect("Response body is not valid JSON")
}

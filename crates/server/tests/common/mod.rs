#![allow(dead_code)]

use std::str::FromStr;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::{AppState, Server, config::ServerConfig, db};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tower::ServiceExt;

/// Fresh app over an in-memory database with migrations applied.
pub async fn app() -> (Router, SqlitePool) {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory database options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect to memory database");
    db::MIGRATOR.run(&pool).await.expect("run migrations");

    let config = ServerConfig {
        database_url: "sqlite::memory:".to_string(),
        listen_addr: "127.0.0.1:0".to_string(),
        session_ttl_hours: 24,
    };
    (Server::router(AppState::new(pool.clone(), config)), pool)
}

pub fn json_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn bare_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

/// Hand-rolled multipart body for the workspace/project form endpoints.
pub fn multipart_request(
    method: &str,
    uri: &str,
    cookie: &str,
    fields: &[(&str, &str)],
) -> Request<Body> {
    let boundary = "test-boundary";
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .expect("request")
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("infallible")
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

/// First `Set-Cookie` of the response, trimmed to `name=value`.
pub fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("set-cookie header")
        .to_str()
        .expect("cookie text")
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

pub async fn register(app: &Router, name: &str, email: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "name": name, "email": email, "password": "correct horse battery" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

pub async fn create_workspace(app: &Router, cookie: &str, name: &str) -> Value {
    let response = send(
        app,
        multipart_request("POST", "/api/workspaces", cookie, &[("name", name)]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["data"].clone()
}

pub async fn create_project(app: &Router, cookie: &str, workspace_id: &str, name: &str) -> Value {
    let response = send(
        app,
        multipart_request(
            "POST",
            "/api/projects",
            cookie,
            &[("name", name), ("workspace_id", workspace_id)],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["data"].clone()
}

pub async fn create_task(app: &Router, cookie: &str, body: Value) -> Value {
    let response = send(app, json_request("POST", "/api/tasks", Some(cookie), body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["data"].clone()
}

/// The caller's member row in a workspace, via the members listing.
pub async fn own_member_id(app: &Router, cookie: &str, workspace_id: &str, email: &str) -> String {
    let response = send(
        app,
        bare_request(
            "GET",
            &format!("/api/members?workspace_id={workspace_id}"),
            Some(cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    body["data"]
        .as_array()
        .expect("members array")
        .iter()
        .find(|member| member["email"] == email)
        .expect("own membership")["id"]
        .as_str()
        .expect("member id")
        .to_string()
}

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use client::{
    DEFAULT_API_ERROR_MESSAGE, DomainError, Repository,
    transport::{HttpTransport, StaticToken, TokenProvider},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const TOKEN: &str = "test-token";

async fn unread(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"));
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Missing or invalid token"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "notifications": [
                {"id": 7, "message": "Ann paid you", "created_at": "2024-05-01T10:00:00Z", "is_read": false}
            ]
        })),
    )
}

fn router() -> Router {
    Router::new()
        .route("/api/notifications/unread", get(unread))
        .route(
            "/api/notifications",
            get(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
        )
        .route(
            "/api/groups",
            get(|| async { (StatusCode::OK, "{\"groups\": 3}") }),
        )
        .route(
            "/api/notifications/{id}/read",
            post(|| async { StatusCode::NO_CONTENT }),
        )
        .route(
            "/api/groups/{id}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        )
}

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn repository(base_url: &str, token: Option<&str>) -> Repository {
    let credentials =
        token.map(|token| Arc::new(StaticToken::new(token)) as Arc<dyn TokenProvider>);
    let transport = HttpTransport::new(base_url, Duration::from_millis(500), credentials).unwrap();
    Repository::new(Arc::new(transport))
}

#[tokio::test]
async fn bearer_token_is_attached() {
    let base_url = spawn_server().await;

    let notifications = repository(&base_url, Some(TOKEN))
        .fetch_unread_notifications()
        .await
        .unwrap();

    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].id, 7);
}

#[tokio::test]
async fn rejection_carries_server_message() {
    let base_url = spawn_server().await;

    let err = repository(&base_url, None)
        .fetch_unread_notifications()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::Api {
            status: 401,
            message: "Missing or invalid token".to_string(),
        }
    );
}

#[tokio::test]
async fn unreadable_rejection_uses_default_message() {
    let base_url = spawn_server().await;

    let err = repository(&base_url, Some(TOKEN))
        .fetch_notifications()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        DomainError::Api {
            status: 502,
            message: DEFAULT_API_ERROR_MESSAGE.to_string(),
        }
    );
}

#[tokio::test]
async fn wrong_success_shape_is_unexpected_shape() {
    let base_url = spawn_server().await;

    let err = repository(&base_url, Some(TOKEN))
        .fetch_groups()
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::UnexpectedShape(_)));
}

#[tokio::test]
async fn empty_success_body_is_accepted_for_unit_calls() {
    let base_url = spawn_server().await;

    repository(&base_url, Some(TOKEN))
        .mark_notification_read(7)
        .await
        .unwrap();
}

#[tokio::test]
async fn slow_server_is_a_connection_error() {
    let base_url = spawn_server().await;

    let err = repository(&base_url, Some(TOKEN))
        .fetch_group(1)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err, DomainError::Connection("request timed out".to_string()));
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    // Reserve a port, then close it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = repository(&format!("http://{addr}/api"), Some(TOKEN))
        .fetch_groups()
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Connection(_)));
    assert_eq!(err.user_message(), "Could not reach server");
}

//! HTTP endpoints for marksync-server.
//!
//! The router is a plain dispatch table: each (method, path) pair maps to one
//! sync service operation. Nothing here decides whether a write may happen.

mod bookmarks;
pub mod health;
mod metrics;

use crate::error::{ServiceError, StoreError};
use crate::server::SyncServer;
use axum::extract::rejection::JsonRejection;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::sync::Arc;
use sync_types::api::ErrorBody;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use health::HealthStatus;

/// Request bodies may exceed the payload ceiling by this much to leave room
/// for the JSON envelope; the service enforces the exact limit.
const BODY_ENVELOPE_ALLOWANCE: usize = 64 * 1024;

/// Build the HTTP router with all endpoints.
pub fn build_router(server: Arc<SyncServer>) -> Router {
    let http = server.config().http.clone();
    let body_limit = server
        .config()
        .service
        .max_payload_bytes
        .saturating_add(BODY_ENVELOPE_ALLOWANCE);

    let mut router = Router::new()
        .route("/bookmarks", post(bookmarks::create_handler))
        .route(
            "/bookmarks/:id",
            get(bookmarks::payload_handler).put(bookmarks::update_handler),
        )
        .route("/bookmarks/:id/version", get(bookmarks::version_handler))
        .route(
            "/bookmarks/:id/lastUpdated",
            get(bookmarks::last_updated_handler),
        )
        .route("/info", get(bookmarks::info_handler))
        .route("/health", get(health::health_handler));

    if http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    let router = router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(server))
        .layer(TraceLayer::new_for_http());

    if http.cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Error returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The service rejected or failed the operation.
    Service(ServiceError),
    /// The path did not contain a well-formed collection id.
    MalformedId,
    /// The request body was missing, malformed, of the wrong content type
    /// or over the body limit.
    Body(JsonRejection),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedId => StatusCode::NOT_FOUND,
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Service(err) => match err {
                ServiceError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
                ServiceError::Store(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
                ServiceError::Store(StoreError::DeadlineExceeded)
                | ServiceError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                ServiceError::CreationDisabled => StatusCode::FORBIDDEN,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            // Same answer as an unknown id: malformed ids are not a separate
            // class clients can probe for.
            ApiError::MalformedId => ErrorBody {
                code: "NotFound".to_string(),
                message: "collection not found".to_string(),
                current_version: None,
            },
            ApiError::Body(rejection) => ErrorBody {
                code: match rejection.status() {
                    StatusCode::PAYLOAD_TOO_LARGE => "PayloadTooLarge",
                    _ => "BadRequest",
                }
                .to_string(),
                message: rejection.body_text(),
                current_version: None,
            },
            ApiError::Service(ServiceError::Store(StoreError::NotFound { .. })) => ErrorBody {
                code: "NotFound".to_string(),
                message: "collection not found".to_string(),
                current_version: None,
            },
            ApiError::Service(err) if self.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                ErrorBody {
                    code: err.code().to_string(),
                    message: "internal storage error".to_string(),
                    current_version: None,
                }
            }
            ApiError::Service(err) => ErrorBody {
                code: err.code().to_string(),
                message: err.to_string(),
                current_version: err.current_version(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            if let ApiError::Service(err) = &self {
                tracing::error!("Request failed: {}", err);
            }
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageBackendKind};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use sync_types::api::{
        CreateResponse, LastUpdatedResponse, PayloadResponse, ServiceInfo, UpdateResponse,
        VersionResponse,
    };
    use sync_types::Version;
    use tower::util::ServiceExt;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.storage.backend = StorageBackendKind::Memory;
        config
    }

    async fn test_server(config: Config) -> Arc<SyncServer> {
        Arc::new(SyncServer::open(config).await.unwrap())
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<String>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router) -> CreateResponse {
        let response = send(app, Method::POST, "/bookmarks", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        json(response).await
    }

    fn update_body(bookmarks: &str, expected: Option<u64>) -> String {
        match expected {
            Some(v) => format!(r#"{{"bookmarks":"{bookmarks}","expectedVersion":{v}}}"#),
            None => format!(r#"{{"bookmarks":"{bookmarks}"}}"#),
        }
    }

    #[tokio::test]
    async fn create_then_read_everything() {
        let app = build_router(test_server(memory_config()).await);
        let created = create(&app).await;
        assert_eq!(created.version, Version::INITIAL);

        let path = format!("/bookmarks/{}", created.id);
        let payload: PayloadResponse = json(send(&app, Method::GET, &path, None).await).await;
        assert_eq!(payload.bookmarks, "");
        assert_eq!(payload.version, Version::INITIAL);

        let version: VersionResponse =
            json(send(&app, Method::GET, &format!("{path}/version"), None).await).await;
        assert_eq!(version.version, Version::INITIAL);

        let last: LastUpdatedResponse =
            json(send(&app, Method::GET, &format!("{path}/lastUpdated"), None).await).await;
        assert_eq!(last.last_updated, created.last_updated);
    }

    #[tokio::test]
    async fn update_round_trip() {
        let app = build_router(test_server(memory_config()).await);
        let created = create(&app).await;
        let path = format!("/bookmarks/{}", created.id);

        let response = send(&app, Method::PUT, &path, Some(update_body("ciphertext", Some(1)))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: UpdateResponse = json(response).await;
        assert_eq!(updated.version, Version::new(2));
        assert!(updated.last_updated >= created.last_updated);

        let payload: PayloadResponse = json(send(&app, Method::GET, &path, None).await).await;
        assert_eq!(payload.bookmarks, "ciphertext");
        assert_eq!(payload.version, Version::new(2));
    }

    #[tokio::test]
    async fn stale_update_is_409_with_current_version() {
        let app = build_router(test_server(memory_config()).await);
        let created = create(&app).await;
        let path = format!("/bookmarks/{}", created.id);

        send(&app, Method::PUT, &path, Some(update_body("first", Some(1)))).await;
        let response = send(&app, Method::PUT, &path, Some(update_body("second", Some(1)))).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body: ErrorBody = json(response).await;
        assert_eq!(body.code, "VersionConflict");
        assert_eq!(body.current_version, Some(Version::new(2)));

        let payload: PayloadResponse = json(send(&app, Method::GET, &path, None).await).await;
        assert_eq!(payload.bookmarks, "first");
    }

    #[tokio::test]
    async fn update_without_expected_version_overwrites() {
        let app = build_router(test_server(memory_config()).await);
        let created = create(&app).await;
        let path = format!("/bookmarks/{}", created.id);

        send(&app, Method::PUT, &path, Some(update_body("a", None))).await;
        let response = send(&app, Method::PUT, &path, Some(update_body("b", None))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: UpdateResponse = json(response).await;
        assert_eq!(updated.version, Version::new(3));
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_404() {
        let app = build_router(test_server(memory_config()).await);
        let unknown = format!("/bookmarks/{}", "ab".repeat(16));

        for uri in [
            unknown.clone(),
            format!("{unknown}/version"),
            format!("{unknown}/lastUpdated"),
            "/bookmarks/not-an-id".to_string(),
            "/bookmarks/not-an-id/version".to_string(),
        ] {
            let response = send(&app, Method::GET, &uri, None).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            let body: ErrorBody = json(response).await;
            assert_eq!(body.code, "NotFound");
        }

        let response = send(&app, Method::PUT, &unknown, Some(update_body("x", None))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_payload_is_413() {
        let mut config = memory_config();
        config.service.max_payload_bytes = 4;
        let app = build_router(test_server(config).await);
        let created = create(&app).await;

        let response = send(
            &app,
            Method::PUT,
            &format!("/bookmarks/{}", created.id),
            Some(update_body("too long", None)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: ErrorBody = json(response).await;
        assert_eq!(body.code, "PayloadTooLarge");
    }

    #[tokio::test]
    async fn malformed_update_body_gets_error_body() {
        let server = test_server(memory_config()).await;
        let app = build_router(server.clone());
        let created = create(&app).await;
        let path = format!("/bookmarks/{}", created.id);

        let wrong_type = r#"{"bookmarks": 5}"#.to_string();
        let response = send(&app, Method::PUT, &path, Some(wrong_type)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorBody = json(response).await;
        assert_eq!(body.code, "BadRequest");
        assert!(!body.message.is_empty());

        let response = send(&app, Method::PUT, &path, Some("{not json".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = json(response).await;
        assert_eq!(body.code, "BadRequest");

        let request = Request::builder()
            .method(Method::PUT)
            .uri(&path)
            .body(Body::from(update_body("x", None)))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body: ErrorBody = json(response).await;
        assert_eq!(body.code, "BadRequest");

        let snapshot: PayloadResponse = json(send(&app, Method::GET, &path, None).await).await;
        assert_eq!(snapshot.version, Version::INITIAL);
        assert_eq!(
            server
                .metrics()
                .errors_total
                .load(std::sync::atomic::Ordering::Relaxed),
            3
        );
    }

    #[tokio::test]
    async fn body_over_http_limit_gets_error_body() {
        let mut config = memory_config();
        config.service.max_payload_bytes = 4;
        let app = build_router(test_server(config).await);
        let created = create(&app).await;

        let huge = "a".repeat(BODY_ENVELOPE_ALLOWANCE + 1024);
        let response = send(
            &app,
            Method::PUT,
            &format!("/bookmarks/{}", created.id),
            Some(update_body(&huge, None)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: ErrorBody = json(response).await;
        assert_eq!(body.code, "PayloadTooLarge");
    }

    #[test]
    fn status_follows_error_variant() {
        let id = sync_types::CollectionId::from_bytes(&[3u8; 16]).unwrap();
        let cases = [
            (ServiceError::from(StoreError::NotFound { id }), StatusCode::NOT_FOUND),
            (
                ServiceError::from(StoreError::VersionConflict {
                    id,
                    expected: Version::new(1),
                    current: Version::new(2),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::from(StoreError::DeadlineExceeded),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::Timeout { operation: "update" },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::from(StoreError::Closed),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::PayloadTooLarge { size: 2, limit: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (ServiceError::CreationDisabled, StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn disabled_creation_is_403_and_reported_by_info() {
        let mut config = memory_config();
        config.service.accept_new_collections = false;
        let app = build_router(test_server(config).await);

        let response = send(&app, Method::POST, "/bookmarks", None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let info: ServiceInfo = json(send(&app, Method::GET, "/info", None).await).await;
        assert_eq!(info.status, sync_types::api::ServiceStatus::NoNewCollections);
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = build_router(test_server(memory_config()).await);
        let response = send(&app, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_is_degraded_after_shutdown() {
        let server = test_server(memory_config()).await;
        let app = build_router(server.clone());
        server.shutdown().await;

        let response = send(&app, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let health: serde_json::Value = json(response).await;
        assert_eq!(health["status"], "degraded");
    }

    #[tokio::test]
    async fn metrics_endpoint_counts_requests() {
        let server = test_server(memory_config()).await;
        let app = build_router(server.clone());
        let created = create(&app).await;
        let path = format!("/bookmarks/{}", created.id);
        send(&app, Method::PUT, &path, Some(update_body("abc", Some(1)))).await;
        send(&app, Method::PUT, &path, Some(update_body("abc", Some(1)))).await;

        let response = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("marksync_creates_total 1"));
        assert!(text.contains("marksync_updates_total 1"));
        assert!(text.contains("marksync_conflicts_total 1"));
        assert!(text.contains("marksync_storage_collections 1"));
    }

    #[tokio::test]
    async fn metrics_endpoint_can_be_disabled() {
        let mut config = memory_config();
        config.http.metrics_enabled = false;
        let app = build_router(test_server(config).await);

        let response = send(&app, Method::GET, "/metrics", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn storage_failure_is_500_without_details() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database = dir.path().join("closed.db");
        let server = test_server(config).await;
        let app = build_router(server.clone());
        server.shutdown().await;

        let response = send(&app, Method::POST, "/bookmarks", None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = json(response).await;
        assert_eq!(body.code, "StorageError");
        assert_eq!(body.message, "internal storage error");
    }
}

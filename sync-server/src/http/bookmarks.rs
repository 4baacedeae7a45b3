//! Bookmark collection endpoints.

use super::ApiError;
use crate::error::ServiceResult;
use crate::server::SyncServer;
use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::{Extension, Json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use sync_types::api::{
    CreateResponse, LastUpdatedResponse, PayloadResponse, ServiceInfo, UpdateRequest,
    UpdateResponse, VersionResponse,
};
use sync_types::CollectionId;

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_id(raw: &str) -> Result<CollectionId, ApiError> {
    raw.parse().map_err(|_| ApiError::MalformedId)
}

/// Count the outcome of a service call and convert its error.
fn tally<T>(server: &SyncServer, counter: &AtomicU64, result: ServiceResult<T>) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(value)
        }
        Err(e) => {
            server.metrics().record_error(&e);
            Err(e.into())
        }
    }
}

/// `POST /bookmarks`
pub async fn create_handler(
    Extension(server): Extension<Arc<SyncServer>>,
) -> ApiResult<CreateResponse> {
    let created = tally(
        &server,
        &server.metrics().creates_total,
        server.service().create().await,
    )?;

    Ok(Json(CreateResponse {
        id: created.id,
        version: created.version,
        last_updated: created.last_updated,
    }))
}

/// `GET /bookmarks/:id`
pub async fn payload_handler(
    Extension(server): Extension<Arc<SyncServer>>,
    Path(raw): Path<String>,
) -> ApiResult<PayloadResponse> {
    let id = parse_id(&raw)?;
    let snapshot = tally(
        &server,
        &server.metrics().payload_reads_total,
        server.service().get_payload(&id).await,
    )?;
    server
        .metrics()
        .bytes_sent
        .fetch_add(snapshot.payload.len() as u64, Ordering::Relaxed);

    Ok(Json(PayloadResponse {
        bookmarks: snapshot.payload,
        version: snapshot.version,
    }))
}

/// `GET /bookmarks/:id/version`
pub async fn version_handler(
    Extension(server): Extension<Arc<SyncServer>>,
    Path(raw): Path<String>,
) -> ApiResult<VersionResponse> {
    let id = parse_id(&raw)?;
    let version = tally(
        &server,
        &server.metrics().metadata_reads_total,
        server.service().get_version(&id).await,
    )?;

    Ok(Json(VersionResponse { version }))
}

/// `GET /bookmarks/:id/lastUpdated`
pub async fn last_updated_handler(
    Extension(server): Extension<Arc<SyncServer>>,
    Path(raw): Path<String>,
) -> ApiResult<LastUpdatedResponse> {
    let id = parse_id(&raw)?;
    let last_updated = tally(
        &server,
        &server.metrics().metadata_reads_total,
        server.service().get_last_updated(&id).await,
    )?;

    Ok(Json(LastUpdatedResponse { last_updated }))
}

/// `PUT /bookmarks/:id`
pub async fn update_handler(
    Extension(server): Extension<Arc<SyncServer>>,
    Path(raw): Path<String>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<UpdateResponse> {
    let id = parse_id(&raw)?;
    let Json(request) = body.map_err(|rejection| {
        server
            .metrics()
            .errors_total
            .fetch_add(1, Ordering::Relaxed);
        ApiError::from(rejection)
    })?;
    let size = request.bookmarks.len() as u64;
    let outcome = tally(
        &server,
        &server.metrics().updates_total,
        server
            .service()
            .update(&id, &request.bookmarks, request.expected_version)
            .await,
    )?;
    server
        .metrics()
        .bytes_received
        .fetch_add(size, Ordering::Relaxed);

    Ok(Json(UpdateResponse {
        version: outcome.version,
        last_updated: outcome.last_updated,
    }))
}

/// `GET /info`
pub async fn info_handler(Extension(server): Extension<Arc<SyncServer>>) -> Json<ServiceInfo> {
    Json(server.service().info())
}

//! Request and response bodies of the HTTP sync API.
//!
//! Field names are camelCase on the wire to match what xBrowserSync-style
//! clients send and expect.

use serde::{Deserialize, Serialize};

use crate::{CollectionId, Timestamp, Version};

/// Response to `POST /bookmarks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    /// Identifier of the new collection
    pub id: CollectionId,
    /// Initial version
    pub version: Version,
    /// Creation time
    pub last_updated: Timestamp,
}

/// Response to `GET /bookmarks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadResponse {
    /// Encrypted bookmark data (opaque to the server)
    pub bookmarks: String,
    /// Version the payload belongs to
    pub version: Version,
}

/// Response to `GET /bookmarks/{id}/version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    /// Current version
    pub version: Version,
}

/// Response to `GET /bookmarks/{id}/lastUpdated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdatedResponse {
    /// Time of the last successful write
    pub last_updated: Timestamp,
}

/// Body of `PUT /bookmarks/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Replacement payload
    pub bookmarks: String,
    /// Version the client last saw. When absent the write is unconditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<Version>,
}

/// Response to `PUT /bookmarks/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    /// Version produced by the write
    pub version: Version,
    /// Time of the write
    pub last_updated: Timestamp,
}

/// Whether the service takes new collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Fully operational
    Online,
    /// Existing collections work, creating new ones is refused
    NoNewCollections,
}

/// Response to `GET /info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    /// Server software version
    pub version: String,
    /// Current status
    pub status: ServiceStatus,
    /// Free-form operator message
    pub message: String,
    /// Largest accepted payload in bytes
    pub max_sync_size: usize,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable error code, e.g. `VersionConflict`
    pub code: String,
    /// Human-readable description
    pub message: String,
    /// Current version of the collection, present on conflicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<Version>,
}

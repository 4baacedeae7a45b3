//! HTTP client for the marksync API.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use sync_types::api::{
    CreateResponse, ErrorBody, LastUpdatedResponse, PayloadResponse, ServiceInfo, UpdateRequest,
    UpdateResponse, VersionResponse,
};
use sync_types::{CollectionId, Timestamp, Version};

/// Errors returned by [`SyncClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The collection does not exist.
    #[error("collection not found")]
    NotFound,

    /// The collection moved past the expected version.
    #[error("version conflict: collection is now at version {current}")]
    Conflict {
        /// Version currently stored on the server.
        current: Version,
    },

    /// Any other non-success response.
    #[error("server returned {status}: {message}")]
    Server {
        /// HTTP status.
        status: StatusCode,
        /// Message from the error body, or the raw body.
        message: String,
    },

    /// Transport or decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client for one marksync server.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    base: String,
}

impl SyncClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// `GET /info`
    pub async fn info(&self) -> Result<ServiceInfo, ClientError> {
        decode(self.http.get(self.url("/info")).send().await?).await
    }

    /// `POST /bookmarks`
    pub async fn create(&self) -> Result<CreateResponse, ClientError> {
        decode(self.http.post(self.url("/bookmarks")).send().await?).await
    }

    /// `GET /bookmarks/:id`
    pub async fn get_payload(&self, id: &CollectionId) -> Result<PayloadResponse, ClientError> {
        let url = self.url(&format!("/bookmarks/{id}"));
        decode(self.http.get(url).send().await?).await
    }

    /// `GET /bookmarks/:id/version`
    pub async fn get_version(&self, id: &CollectionId) -> Result<Version, ClientError> {
        let url = self.url(&format!("/bookmarks/{id}/version"));
        let body: VersionResponse = decode(self.http.get(url).send().await?).await?;
        Ok(body.version)
    }

    /// `GET /bookmarks/:id/lastUpdated`
    pub async fn get_last_updated(&self, id: &CollectionId) -> Result<Timestamp, ClientError> {
        let url = self.url(&format!("/bookmarks/{id}/lastUpdated"));
        let body: LastUpdatedResponse = decode(self.http.get(url).send().await?).await?;
        Ok(body.last_updated)
    }

    /// `PUT /bookmarks/:id`
    pub async fn update(
        &self,
        id: &CollectionId,
        bookmarks: String,
        expected_version: Option<Version>,
    ) -> Result<UpdateResponse, ClientError> {
        let url = self.url(&format!("/bookmarks/{id}"));
        let request = UpdateRequest {
            bookmarks,
            expected_version,
        };
        decode(self.http.put(url).json(&request).send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await?;
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
    match (status, body) {
        (StatusCode::NOT_FOUND, _) => Err(ClientError::NotFound),
        (
            StatusCode::CONFLICT,
            Some(ErrorBody {
                current_version: Some(current),
                ..
            }),
        ) => Err(ClientError::Conflict { current }),
        (status, Some(body)) => Err(ClientError::Server {
            status,
            message: body.message,
        }),
        (status, None) => Err(ClientError::Server {
            status,
            message: text,
        }),
    }
}

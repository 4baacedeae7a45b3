//! Replace a collection's payload.

use anyhow::Result;
use sync_types::{CollectionId, Version};

use crate::client::{ClientError, SyncClient};

/// Run the update command.
pub async fn run(
    client: &SyncClient,
    id: &CollectionId,
    data: String,
    expected: Option<Version>,
) -> Result<()> {
    let size = data.len();
    match client.update(id, data, expected).await {
        Ok(outcome) => {
            println!("Updated ({} bytes).", size);
            println!("  Version:      {}", outcome.version);
            println!("  Last updated: {}", outcome.last_updated);
            Ok(())
        }
        Err(ClientError::Conflict { current }) => {
            anyhow::bail!(
                "collection changed since version {}; it is now at version {}. \
                 Fetch it, merge, and retry with --expected-version {}",
                expected.map(|v| v.to_string()).unwrap_or_default(),
                current,
                current
            )
        }
        Err(e) => Err(e.into()),
    }
}

//! Read a collection's payload or metadata.

use anyhow::Result;
use sync_types::CollectionId;

use crate::client::SyncClient;

/// Print the payload to stdout and its version to stderr.
pub async fn payload(client: &SyncClient, id: &CollectionId) -> Result<()> {
    let snapshot = client.get_payload(id).await?;
    eprintln!("version {}", snapshot.version);
    println!("{}", snapshot.bookmarks);
    Ok(())
}

/// Print the current version.
pub async fn version(client: &SyncClient, id: &CollectionId) -> Result<()> {
    println!("{}", client.get_version(id).await?);
    Ok(())
}

/// Print the time of the last write.
pub async fn last_updated(client: &SyncClient, id: &CollectionId) -> Result<()> {
    println!("{}", client.get_last_updated(id).await?);
    Ok(())
}

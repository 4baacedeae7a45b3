//! Show server information.

use anyhow::Result;
use sync_types::api::ServiceStatus;

use crate::client::SyncClient;

/// Run the info command.
pub async fn run(client: &SyncClient) -> Result<()> {
    let info = client.info().await?;

    let status = match info.status {
        ServiceStatus::Online => "online",
        ServiceStatus::NoNewCollections => "online (not accepting new collections)",
    };

    println!("=== marksync server ===");
    println!("  Version:  {}", info.version);
    println!("  Status:   {}", status);
    println!("  Max size: {} bytes", info.max_sync_size);
    if !info.message.is_empty() {
        println!("  Message:  {}", info.message);
    }
    Ok(())
}

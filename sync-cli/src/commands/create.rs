//! Create a new collection.

use anyhow::Result;

use crate::client::SyncClient;

/// Run the create command.
pub async fn run(client: &SyncClient) -> Result<()> {
    let created = client.create().await?;

    println!("Collection created.");
    println!("  ID:      {}", created.id);
    println!("  Version: {}", created.version);
    println!("  Created: {}", created.last_updated);
    println!();
    println!("Keep the ID secret: anyone holding it can read and overwrite the collection.");
    Ok(())
}

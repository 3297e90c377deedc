//! Per-conversation ledger of hosted-content blobs that hold a failure description.

use std::collections::BTreeMap;
use std::path::Path;

use crate::Result;

pub(super) const LEDGER_FILE_NAME: &str = ".hosted_content_failures.json";

pub(super) async fn load(conversation_dir: &Path) -> Result<BTreeMap<String, String>> {
    match tokio::fs::read(conversation_dir.join(LEDGER_FILE_NAME)).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(error) => Err(error.into()),
    }
}

pub(super) async fn save(conversation_dir: &Path, ledger: &BTreeMap<String, String>) -> Result<()> {
    let path = conversation_dir.join(LEDGER_FILE_NAME);
    if ledger.is_empty() {
        return match tokio::fs::remove_file(&path).await {
            Err(error) if error.kind() != std::io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        };
    }
    super::write_atomic(&path, &serde_json::to_vec_pretty(ledger)?).await
}

//! Environment/runtime helpers
//!
//! Sanity checks to ensure the data directory exists before a file-backed
//! store is opened.

use tracing::{debug, warn};

/// Ensure `data_dir` exists, creating it (and parents) when missing.
pub async fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    match tokio::fs::metadata(data_dir).await {
        Ok(meta) if meta.is_dir() => {
            debug!(%data_dir, "data directory present");
            return Ok(());
        }
        Ok(_) => return Err(anyhow::anyhow!("{data_dir} exists but is not a directory")),
        Err(_) => warn!(%data_dir, "data directory not found; creating it"),
    }
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_directory() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("leads_data_{}", uuid::Uuid::new_v4()));
        let dir_str = dir.to_string_lossy().to_string();

        ensure_data_dir(&dir_str).await?;
        assert!(tokio::fs::metadata(&dir).await?.is_dir());

        // second call is a no-op
        ensure_data_dir(&dir_str).await?;

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn rejects_plain_file() -> Result<(), anyhow::Error> {
        let file = std::env::temp_dir().join(format!("leads_not_dir_{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&file, b"x").await?;

        let err = ensure_data_dir(&file.to_string_lossy()).await;
        assert!(err.is_err());

        let _ = tokio::fs::remove_file(&file).await;
        Ok(())
    }
}

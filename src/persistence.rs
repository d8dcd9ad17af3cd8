use std::path::Path;

use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Save the data to a file, creating missing parent directories.
pub async fn save_to_file(
    data: impl AsRef<[u8]>,
    path: impl AsRef<Path>,
) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(path, data).await.map_err(|e| e.into())
}

/// Load the data from a file
pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<u8>, PersistenceError> {
    fs::read(path).await.map_err(|e| e.into())
}

/// Serialize `value` as pretty JSON and save it.
pub async fn save_json<T: serde::Serialize>(
    value: &T,
    path: impl AsRef<Path>,
) -> Result<(), PersistenceError> {
    let data = serde_json::to_string_pretty(value)?;
    save_to_file(data, path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("data.bin");

        save_to_file(b"hello", &path).await.unwrap();
        assert_eq!(load_from_file(&path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_save_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");

        save_json(&serde_json::json!({"flow": "A -> B"}), &path)
            .await
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&load_from_file(&path).await.unwrap()).unwrap();
        assert_eq!(value["flow"], "A -> B");
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from_file(dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(PersistenceError::IoError(_))));
    }
}

//! Client for the external service that turns a compiled schema into a map
//! server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use schemaport_core::{Error, Result, is_identifier};

#[derive(Debug, Clone)]
pub struct RenderConfigClient {
    url: String,
    client: reqwest::Client,
}

impl RenderConfigClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| Error::Io(format!("render client: {err}")))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the compiled schema and return the configuration text.
    pub async fn render(&self, compiled: &Value) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(compiled)
            .send()
            .await
            .map_err(|err| self.failure(err))?;
        let response = response.error_for_status().map_err(|err| self.failure(err))?;
        let text = response.text().await.map_err(|err| self.failure(err))?;
        tracing::info!(event = "render_config_received", url = %self.url, bytes = text.len());
        Ok(text)
    }

    fn failure(&self, err: reqwest::Error) -> Error {
        Error::Io(format!("render service {}: {err}", self.url))
    }
}

/// Path of the configuration file for a dataset.
pub fn render_config_path(dir: &Path, dataset: &str) -> PathBuf {
    dir.join(format!("{dataset}.map"))
}

/// Write `<dir>/<dataset>.map` through a temp file and rename so readers
/// never observe a partial file.
pub async fn write_render_config(dir: &Path, dataset: &str, text: &str) -> Result<PathBuf> {
    if !is_identifier(dataset) {
        return Err(Error::InvalidSchema(format!(
            "dataset id is not a plain identifier: {dataset:?}"
        )));
    }

    fs::create_dir_all(dir).await?;
    let path = render_config_path(dir, dataset);
    let tmp_path = dir.join(format!("{dataset}.map.tmp"));

    let mut file = fs::File::create(&tmp_path).await?;
    file.write_all(text.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&tmp_path, &path).await?;

    tracing::info!(event = "render_config_written", path = %path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("schemaport_render_{}", uuid::Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn writes_config_named_after_dataset() {
        let dir = temp_dir();
        let path = write_render_config(&dir, "parks", "MAP\nEND\n").await.unwrap();
        assert_eq!(path, dir.join("parks.map"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "MAP\nEND\n");
        assert!(!dir.join("parks.map.tmp").exists());

        write_render_config(&dir, "parks", "MAP\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "MAP\n");
    }

    #[tokio::test]
    async fn rejects_path_like_dataset_ids() {
        let err = write_render_config(&temp_dir(), "../etc", "x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }
}

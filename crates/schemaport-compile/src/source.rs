//! Reference resolution against a filesystem root or a remote base URL.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;

use schemaport_core::{Error, Result, strip_version_tag};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can turn a `$ref` string into a parsed schema document.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Human-readable base (directory or URL) used in logs.
    fn base(&self) -> String;

    /// Fetch and parse the document a reference points at.
    async fn resolve(&self, reference: &str) -> Result<Value>;
}

/// Resolves references as files below a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Normalize a reference for file lookups: no version tag, `.json` extension.
pub fn file_reference(reference: &str) -> String {
    let reference = strip_version_tag(reference);
    if reference.ends_with(".json") {
        reference
    } else {
        format!("{reference}.json")
    }
}

/// Normalize a reference for remote lookups: no version tag, no `.json`.
pub fn remote_reference(reference: &str) -> String {
    let reference = strip_version_tag(reference);
    match reference.strip_suffix(".json") {
        Some(stem) => stem.to_string(),
        None => reference,
    }
}

#[async_trait]
impl SchemaSource for FileSource {
    fn base(&self) -> String {
        self.root.display().to_string()
    }

    async fn resolve(&self, reference: &str) -> Result<Value> {
        let path = self.root.join(file_reference(reference));
        let target = path.display().to_string();
        tracing::debug!(event = "schema_reference_resolving", target = %target);

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|err| Error::SchemaResolution {
                target: target.clone(),
                reason: err.to_string(),
            })?;

        serde_json::from_str(&content).map_err(|err| Error::SchemaResolution {
            target,
            reason: format!("invalid json: {err}"),
        })
    }
}

/// Resolves references by appending them to a base URL and issuing a GET.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| Error::Io(format!("cannot build http client: {err}")))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Full URL a reference resolves to.
    pub fn url_for(&self, reference: &str) -> String {
        format!("{}{}", self.base_url, remote_reference(reference))
    }
}

#[async_trait]
impl SchemaSource for HttpSource {
    fn base(&self) -> String {
        self.base_url.clone()
    }

    async fn resolve(&self, reference: &str) -> Result<Value> {
        let url = self.url_for(reference);
        tracing::debug!(event = "schema_reference_resolving", target = %url);
        fetch_json(&self.client, &url).await
    }
}

/// GET a URL and parse the body as JSON; any failure names the URL.
pub async fn fetch_json(client: &Client, url: &str) -> Result<Value> {
    let failure = |reason: String| Error::SchemaResolution {
        target: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| failure(err.to_string()))?
        .error_for_status()
        .map_err(|err| failure(err.to_string()))?;

    response
        .json::<Value>()
        .await
        .map_err(|err| failure(format!("invalid json: {err}")))
}

/// Returns true when `base` is an `http`/`https` URL.
pub fn is_remote(base: &str) -> bool {
    Url::parse(base)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Pick the source implementation for a base path or URL.
pub fn source_for(base: &str) -> Result<Box<dyn SchemaSource>> {
    if is_remote(base) {
        Ok(Box::new(HttpSource::new(base)?))
    } else {
        Ok(Box::new(FileSource::new(base)))
    }
}

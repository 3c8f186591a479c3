//! REST client for the orchestrator directory and reference data endpoints

use async_trait::async_trait;
use governance_sync::{DirectorySource, IndexerConfig, Result, SyncError};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub struct HttpDirectory {
    client: Client,
    directory_url: String,
    regions_url: Option<String>,
    pipelines_url: Option<String>,
}

impl HttpDirectory {
    pub fn new(
        directory_url: impl Into<String>,
        regions_url: Option<String>,
        pipelines_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SyncError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            directory_url: directory_url.into(),
            regions_url,
            pipelines_url,
        })
    }

    pub fn from_config(config: &IndexerConfig) -> Result<Self> {
        Self::new(
            config.directory_url.clone(),
            config.regions_url.clone(),
            config.pipelines_url.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::Directory(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(text) => text,
                Err(_) => "<unreadable body>".to_string(),
            };
            return Err(SyncError::Directory(format!(
                "{} returned status {}: {}",
                url, status, body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SyncError::Directory(format!("Invalid JSON from {}: {}", url, e)))
    }
}

/// Accept a bare array, or an object holding the array under `key`
fn unwrap_array(value: Value, key: &str, url: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => match object.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(SyncError::Directory(format!(
                "{} returned an object without a '{}' array",
                url, key
            ))),
        },
        other => Err(SyncError::Directory(format!(
            "{} returned {} instead of an array",
            url,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl DirectorySource for HttpDirectory {
    async fn orchestrators(&self) -> Result<Vec<Value>> {
        let body = self.get_json(&self.directory_url).await?;
        unwrap_array(body, "orchestrators", &self.directory_url)
    }

    async fn regions(&self) -> Result<Vec<Value>> {
        let Some(url) = &self.regions_url else {
            return Ok(Vec::new());
        };
        unwrap_array(self.get_json(url).await?, "regions", url)
    }

    async fn pipelines(&self) -> Result<Vec<Value>> {
        let Some(url) = &self.pipelines_url else {
            return Ok(Vec::new());
        };
        unwrap_array(self.get_json(url).await?, "pipelines", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_array() {
        let items = unwrap_array(json!([1, 2]), "pipelines", "u").unwrap();
        assert_eq!(items.len(), 2);

        let items =
            unwrap_array(json!({ "pipelines": [{ "id": "a" }] }), "pipelines", "u").unwrap();
        assert_eq!(items[0]["id"], "a");

        assert!(unwrap_array(json!({ "other": [] }), "pipelines", "u").is_err());
        assert!(unwrap_array(json!("nope"), "pipelines", "u").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_reference_endpoints_are_empty() {
        let directory = HttpDirectory::new(
            "http://127.0.0.1:1/orchestrators",
            None,
            None,
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(directory.regions().await.unwrap().is_empty());
        assert!(directory.pipelines().await.unwrap().is_empty());
    }
}

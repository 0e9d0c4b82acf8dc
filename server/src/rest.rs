//! REST clients for the remote document store and blob service.
//!
//! [`RestStore`] speaks the Firebase-style realtime database API, where the
//! subtree at `a/b` lives at `{base}/a/b.json`. [`RestBlobStore`] speaks the
//! Firebase-storage-style upload API.

use async_trait::async_trait;
use folio_engine::store::{segments, StoreResult};
use folio_engine::{BlobError, BlobStore, DocumentStore, StoreError};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

fn build_client(timeout: Option<Duration>) -> reqwest::Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Document store backed by a Firebase-style REST API.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    auth: Option<String>,
}

/// Body returned by `POST` on a collection.
#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl RestStore {
    pub fn new(
        base_url: impl Into<String>,
        auth: Option<String>,
        timeout: Option<Duration>,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// `{base}/{path}.json`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, segments(path).join("/"))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.auth {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> StoreResult<Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(path = %path, error = %e, "Store request failed");
            StoreError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let reason = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        tracing::warn!(path = %path, status = %status, "Store rejected request");
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Err(StoreError::Unavailable(format!("{}: {}", status, reason)))
        } else {
            Err(StoreError::Rejected {
                path: path.to_string(),
                reason,
            })
        }
    }

    async fn json(&self, path: &str, response: Response) -> StoreResult<Value> {
        response.json().await.map_err(|e| StoreError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>> {
        let response = self.send(path, self.request(Method::GET, path)).await?;
        match self.json(path, response).await? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }

    async fn write(&self, path: &str, value: Value) -> StoreResult<()> {
        if value.is_null() {
            return self.delete(path).await;
        }
        self.send(path, self.request(Method::PUT, path).json(&value))
            .await?;
        Ok(())
    }

    async fn merge(&self, path: &str, partial: Map<String, Value>) -> StoreResult<()> {
        self.send(path, self.request(Method::PATCH, path).json(&partial))
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.send(path, self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> StoreResult<String> {
        let response = self
            .send(path, self.request(Method::POST, path).json(&value))
            .await?;
        let body: PushResponse = response.json().await.map_err(|e| StoreError::Malformed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path, key = %body.name, "Pushed document");
        Ok(body.name)
    }

    async fn query_equal(
        &self,
        path: &str,
        field: &str,
        value: &Value,
    ) -> StoreResult<Option<Value>> {
        let order_by = Value::String(field.to_string()).to_string();
        let equal_to = value.to_string();
        let request = self
            .request(Method::GET, path)
            .query(&[("orderBy", order_by), ("equalTo", equal_to)]);

        let response = self.send(path, request).await?;
        match self.json(path, response).await? {
            Value::Null => Ok(None),
            Value::Object(children) if children.is_empty() => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

/// Blob store backed by a Firebase-storage-style upload API.
#[derive(Debug, Clone)]
pub struct RestBlobStore {
    client: Client,
    base_url: String,
}

/// Object metadata returned by an upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl RestBlobStore {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Public download URL of an uploaded object.
    pub fn download_url(&self, name: &str, token: Option<&str>) -> String {
        let mut url = format!(
            "{}/o/{}?alt=media",
            self.base_url,
            urlencoding::encode(name)
        );
        // Several comma-separated tokens may come back; any one works.
        if let Some(token) = token.and_then(|t| t.split(',').next()) {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}

#[async_trait]
impl BlobStore for RestBlobStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BlobError> {
        let name = path.trim_matches('/');
        if name.is_empty() {
            return Err(BlobError::Rejected {
                path: path.to_string(),
                reason: "empty path".into(),
            });
        }

        let response = self
            .client
            .post(format!("{}/o", self.base_url))
            .query(&[("name", name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!(path = %name, status = %status, "Upload rejected");
            return Err(BlobError::Rejected {
                path: name.to_string(),
                reason,
            });
        }

        let body: UploadResponse = response.json().await.map_err(|e| BlobError::Rejected {
            path: name.to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = %body.name, "Uploaded blob");
        Ok(self.download_url(&body.name, body.download_tokens.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_urls() {
        let store = RestStore::new("https://demo.firebaseio.com/", None, None).unwrap();
        assert_eq!(
            store.url("poems/-Nabc/likes"),
            "https://demo.firebaseio.com/poems/-Nabc/likes.json"
        );
        assert_eq!(store.url("/poems/"), "https://demo.firebaseio.com/poems.json");
        assert_eq!(store.url(""), "https://demo.firebaseio.com/.json");
    }

    #[test]
    fn download_urls_escape_the_object_name() {
        let blobs = RestBlobStore::new("https://storage.example.com/v0/b/demo", None).unwrap();
        assert_eq!(
            blobs.download_url("covers/1-my cover.png", Some("tok1,tok2")),
            "https://storage.example.com/v0/b/demo/o/covers%2F1-my%20cover.png?alt=media&token=tok1"
        );
        assert_eq!(
            blobs.download_url("a.png", None),
            "https://storage.example.com/v0/b/demo/o/a.png?alt=media"
        );
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let store = RestStore::new(
            "http://127.0.0.1:9",
            Some("token".into()),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        let err = store.read("poems").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}

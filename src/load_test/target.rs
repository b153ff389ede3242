use crate::core::{Delta, InventoryError, Result, UpdateRequest};
use crate::service::InventoryService;
use crate::web::RANDOM_UPDATE_SEGMENT;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Something the load generator can send updates to.
#[async_trait]
pub trait UpdateTarget: Send + Sync {
    /// `Ok(true)` applied, `Ok(false)` rejected, `Err` failed.
    async fn update(&self, key: &str, delta: Delta) -> Result<bool>;

    fn describe(&self) -> String;
}

#[async_trait]
impl UpdateTarget for InventoryService {
    async fn update(&self, key: &str, delta: Delta) -> Result<bool> {
        InventoryService::update(self, key, delta).await
    }

    fn describe(&self) -> String {
        format!("in-process ({} locks)", self.granularity())
    }
}

/// Drives a running server through `POST /inventory/{key}`.
///
/// Keys are sent as a single percent-encoded path segment, so `/`, `?` and
/// `#` reach the server as part of the key.
pub struct HttpTarget {
    client: reqwest::Client,
    base_url: String,
    base: Url,
}

impl HttpTarget {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(InventoryError::Config("base URL cannot be empty".to_string()));
        }
        let base = Url::parse(&base_url).map_err(|err| {
            InventoryError::Config(format!("invalid base URL '{}': {}", base_url, err))
        })?;
        if base.cannot_be_a_base() {
            return Err(InventoryError::Config(format!(
                "'{}' cannot be used as a base URL",
                base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of `POST /inventory/{key}` for `key`.
    ///
    /// The random-update route shadows the key of the same name, so that key
    /// is refused rather than silently updating a pool key.
    pub fn endpoint(&self, key: &str) -> Result<Url> {
        if key == RANDOM_UPDATE_SEGMENT {
            return Err(InventoryError::Config(format!(
                "key '{}' is reserved by the HTTP API",
                key
            )));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                InventoryError::Config(format!("'{}' cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(["inventory", key]);
        Ok(url)
    }
}

#[async_trait]
impl UpdateTarget for HttpTarget {
    async fn update(&self, key: &str, delta: Delta) -> Result<bool> {
        let response = self
            .client
            .post(self.endpoint(key)?)
            .json(&UpdateRequest::new(delta))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::BAD_REQUEST => Ok(false),
            status => Err(InventoryError::Transport(format!(
                "unexpected status {} from {}",
                status, self.base_url
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("http ({})", self.base_url)
    }
}

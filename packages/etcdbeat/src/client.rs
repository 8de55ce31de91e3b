use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::{
    config::ResolvedConfig,
    errors::StatsClientError,
    model::{Stats, StatsCategory},
};

/// Fetches and decodes one stats category from etcd.
#[async_trait]
pub trait StatsClient: Send + Sync {
    async fn fetch(&self, category: StatsCategory) -> Result<Stats, StatsClientError>;
}

/// `StatsClient` over plain (unauthenticated) HTTP GET requests.
pub struct HttpStatsClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpStatsClient {
    pub fn new(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(config.base_url(), builder.build()?))
    }

    pub fn url(&self, category: StatsCategory) -> String {
        format!("{}{}", self.base_url, category.path())
    }

    async fn get_json<T: DeserializeOwned>(&self, category: StatsCategory) -> Result<T, StatsClientError> {
        let response = self
            .http
            .get(self.url(category))
            .send()
            .await
            .map_err(|e| StatsClientError::connection(category, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StatsClientError::unexpected_status(category, status));
        }

        // `bytes` takes the response by value, so the body is drained and released on every path.
        let body = response.bytes().await.map_err(|e| StatsClientError::decode(category, e))?;
        serde_json::from_slice(&body).map_err(|e| StatsClientError::decode(category, e))
    }
}

#[async_trait]
impl StatsClient for HttpStatsClient {
    async fn fetch(&self, category: StatsCategory) -> Result<Stats, StatsClientError> {
        let stats = match category {
            StatsCategory::Leader => Stats::Leader(self.get_json(category).await?),
            StatsCategory::SelfNode => Stats::SelfNode(self.get_json(category).await?),
            StatsCategory::Store => Stats::Store(self.get_json(category).await?),
        };
        Ok(stats)
    }
}

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::StatusCode;

use crate::config::Authentication;

pub const KEYS_PATH: &str = "/v2/keys";

/// Sends a single Basic-Auth request and reports the HTTP status received.
#[async_trait]
pub trait AuthProbe: Send + Sync {
    async fn probe(&self, url: &str, username: &str, password: &str) -> Result<StatusCode, String>;
}

pub struct HttpAuthProbe {
    http: reqwest::Client,
}

impl HttpAuthProbe {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AuthProbe for HttpAuthProbe {
    async fn probe(&self, url: &str, username: &str, password: &str) -> Result<StatusCode, String> {
        let response = self
            .http
            .get(url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(response.status())
    }
}

/// Decides once, at startup, whether the configured credentials can be used.
///
/// Only an explicit `401 Unauthorized` marks the credentials as unusable. Any other status,
/// and any failure to reach etcd at all, leaves authentication usable.
pub struct AuthGate {
    probe: Box<dyn AuthProbe>,
}

impl AuthGate {
    pub fn new(probe: Box<dyn AuthProbe>) -> Self {
        Self { probe }
    }

    pub async fn validate(&self, host: &str, port: &str, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            error!("Username or password is not set.");
            return false;
        }
        debug!("Username {}", username);

        let url = format!("http://{}:{}{}", host, port, KEYS_PATH);
        match self.probe.probe(&url, username, password).await {
            Ok(status) if status == StatusCode::UNAUTHORIZED => {
                error!("Username or password is wrong.");
                false
            }
            Ok(status) => {
                debug!("Auth probe on {} returned {}", url, status);
                true
            }
            Err(reason) => {
                warn!("Error connecting to {} for auth probe: {}", url, reason);
                true
            }
        }
    }

    /// Applies the gate to the configured credentials. Absent credentials count as empty.
    pub async fn validate_configured(&self, host: &str, port: &str, authentication: &Authentication) -> bool {
        let username = authentication.username.as_deref().unwrap_or_default();
        let password = authentication.password.as_deref().unwrap_or_default();
        self.validate(host, port, username, password).await
    }
}

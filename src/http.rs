use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::SourceError;

/// Build the HTTP client shared by all sources
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mesos-stats/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Prefix `http://` unless the address already names a scheme
pub fn base_url(address: &str) -> String {
    let trimmed = address.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// GET `url` and decode the JSON body
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, SourceError> {
    debug!("GET {}", url);
    let transport = |source| SourceError::Transport {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&body).map_err(|e| SourceError::Malformed {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

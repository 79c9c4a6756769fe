//! Shared HTTP clients, rebuilt whenever `DynamicConfig` changes.
//!
//! Two `reqwest::Client`s share one connection budget:
//!
//! - `api` carries Dropbox RPC calls and asset fetches, bounded by the
//!   configured whole-request `timeout`.
//! - `transfer` carries uploads and downloads. A large video can take far
//!   longer than `timeout` to move, so it has no whole-request deadline;
//!   `timeout` instead bounds each idle read.
//!
//! `HttpClient` is cheap to clone; clones observe every rebuild.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::dynamic::DynamicConfig;
use crate::errors::{FolioError, Result};

const USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

struct Clients {
    api: reqwest::Client,
    transfer: reqwest::Client,
    rebuilds: u64,
}

#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<RwLock<Clients>>,
}

impl HttpClient {
    pub fn new(config: &DynamicConfig) -> Result<Self> {
        let clients = Clients {
            api: api_client(config)?,
            transfer: transfer_client(config)?,
            rebuilds: 0,
        };
        Ok(Self {
            inner: Arc::new(RwLock::new(clients)),
        })
    }

    pub fn from_defaults() -> Result<Self> {
        Self::new(&DynamicConfig::default())
    }

    /// Client for short request/response calls.
    pub async fn api(&self) -> reqwest::Client {
        self.inner.read().await.api.clone()
    }

    /// Client for streaming file bodies.
    pub async fn transfer(&self) -> reqwest::Client {
        self.inner.read().await.transfer.clone()
    }

    /// How many times the clients have been rebuilt from a new config.
    pub async fn rebuilds(&self) -> u64 {
        self.inner.read().await.rebuilds
    }

    /// Rebuild both clients. On error the previous clients stay in place.
    pub async fn update_from_config(&self, config: &DynamicConfig) -> Result<()> {
        let api = api_client(config)?;
        let transfer = transfer_client(config)?;
        let mut slot = self.inner.write().await;
        slot.api = api;
        slot.transfer = transfer;
        slot.rebuilds += 1;
        tracing::debug!(
            timeout = config.timeout,
            pool = config.max_idle_conns_per_host,
            "Rebuilt HTTP clients"
        );
        Ok(())
    }
}

fn base_builder(config: &DynamicConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(config.tls_handshake_timeout as u64))
        .pool_max_idle_per_host(config.max_idle_conns_per_host as usize)
        .pool_idle_timeout(Duration::from_secs(config.idle_conn_timeout as u64))
}

fn api_client(config: &DynamicConfig) -> Result<reqwest::Client> {
    base_builder(config)
        .timeout(Duration::from_secs(config.timeout as u64))
        .build()
        .map_err(FolioError::Http)
}

fn transfer_client(config: &DynamicConfig) -> Result<reqwest::Client> {
    base_builder(config)
        .read_timeout(Duration::from_secs(config.timeout as u64))
        .build()
        .map_err(FolioError::Http)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_both_clients_send_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let http = HttpClient::from_defaults().unwrap();
        let api = http.api().await.get(server.uri()).send().await.unwrap();
        let transfer = http.transfer().await.get(server.uri()).send().await.unwrap();
        assert_eq!(api.status(), 204);
        assert_eq!(transfer.status(), 204);
    }

    #[tokio::test]
    async fn test_update_is_seen_by_clones() {
        let http = HttpClient::from_defaults().unwrap();
        let cloned = http.clone();

        let mut config = DynamicConfig::default();
        config.timeout = 120;
        config.max_idle_conns_per_host = 50;
        http.update_from_config(&config).await.unwrap();
        http.update_from_config(&config).await.unwrap();

        assert_eq!(cloned.rebuilds().await, 2);
        assert!(Arc::ptr_eq(&http.inner, &cloned.inner));
    }

    #[tokio::test]
    async fn test_api_client_enforces_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(2500)))
            .mount(&server)
            .await;

        let config = DynamicConfig {
            timeout: 1,
            ..DynamicConfig::default()
        };
        let http = HttpClient::new(&config).unwrap();
        let err = http.api().await.get(server.uri()).send().await.unwrap_err();
        assert!(err.is_timeout());
    }
}

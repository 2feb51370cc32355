use crate::config::RingConfig;
use crate::device_manager::auth::{self, CachedToken};
use crate::device_manager::models::{Device, DeviceKind, DoorbellEvent};
use crate::error::Error;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;

/// The session surface the poller and archiver consume. Splitting this
/// out keeps the Ring HTTP plumbing swappable in tests.
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Enumerate the account's devices. Each call is a full refresh.
    async fn devices(&self) -> Result<Vec<Device>, Error>;

    /// Most recent history entries for a device, newest first
    async fn history(&self, device: &Device, limit: usize) -> Result<Vec<DoorbellEvent>, Error>;

    /// Short-lived download URL for an event's recording, if one exists
    async fn recording_url(&self, ding_id: i64) -> Result<Option<String>, Error>;

    /// Latest snapshot JPEG for a device, best effort
    async fn snapshot(&self, device: &Device) -> Result<Option<Vec<u8>>, Error>;
}

/// HTTP client for the Ring cloud API
pub struct RingClient {
    http: reqwest::Client,
    config: RingConfig,
    token: RwLock<CachedToken>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    doorbots: Vec<Device>,
    #[serde(default)]
    stickup_cams: Vec<Device>,
    #[serde(default)]
    chimes: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct RecordingUrlResponse {
    url: Option<String>,
}

impl RingClient {
    /// Authenticate against the Ring cloud. The cached token is used when
    /// present; otherwise a password grant runs, with a single interactive
    /// two-factor retry before giving up.
    pub async fn connect(config: RingConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Api(format!("Failed to build HTTP client: {}", e)))?;

        let token = match CachedToken::load(&config.token_cache_path) {
            Some(token) => token,
            None => {
                let token = match auth::password_grant(&http, &config, None).await {
                    Ok(token) => token,
                    Err(Error::TwoFactorRequired(hint)) => {
                        info!("Ring requires 2-factor authentication ({})", hint);
                        let code = auth::prompt_two_factor()?;
                        auth::password_grant(&http, &config, Some(&code)).await?
                    }
                    Err(e) => return Err(e),
                };
                token.store(&config.token_cache_path)?;
                token
            }
        };

        Ok(Self {
            http,
            config,
            token: RwLock::new(token),
        })
    }

    /// Refresh the access token and rewrite the cache file
    async fn refresh_token(&self) -> Result<(), Error> {
        let refresh_token = self.token.read().await.refresh_token.clone();
        let fresh = auth::refresh_grant(&self.http, &self.config, &refresh_token).await?;
        fresh.store(&self.config.token_cache_path)?;
        *self.token.write().await = fresh;
        Ok(())
    }

    async fn bearer(&self) -> Result<String, Error> {
        if self.token.read().await.is_expired() {
            debug!("Access token expired, refreshing");
            self.refresh_token().await?;
        }
        Ok(self.token.read().await.access_token.clone())
    }

    /// GET with bearer auth; a 401 triggers one refresh-and-retry
    async fn authorized_get(&self, url: &str) -> Result<reqwest::Response, Error> {
        let token = self.bearer().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Error::Api(format!("Request to {} failed: {}", url, e)))?;

        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("Ring API returned 401, refreshing token and retrying");
        self.refresh_token().await?;
        let token = self.token.read().await.access_token.clone();
        self.http
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Error::Api(format!("Retry of {} failed: {}", url, e)))
    }
}

#[async_trait]
impl DeviceSession for RingClient {
    async fn devices(&self) -> Result<Vec<Device>, Error> {
        let url = format!("{}/clients_api/ring_devices", self.config.api_url);
        let response = self.authorized_get(&url).await?;
        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "Device listing returned {}",
                response.status()
            )));
        }

        let listing: DevicesResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("Invalid device listing: {}", e)))?;

        let mut devices = Vec::new();
        for mut device in listing.doorbots {
            device.kind = DeviceKind::Doorbell;
            devices.push(device);
        }
        for mut device in listing.stickup_cams {
            device.kind = DeviceKind::Camera;
            devices.push(device);
        }
        for mut device in listing.chimes {
            device.kind = DeviceKind::Chime;
            devices.push(device);
        }
        Ok(devices)
    }

    async fn history(&self, device: &Device, limit: usize) -> Result<Vec<DoorbellEvent>, Error> {
        let url = format!(
            "{}/clients_api/doorbots/{}/history?limit={}",
            self.config.api_url, device.id, limit
        );
        let response = self.authorized_get(&url).await?;
        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "History for {} returned {}",
                device.name,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Api(format!("Invalid history for {}: {}", device.name, e)))
    }

    async fn recording_url(&self, ding_id: i64) -> Result<Option<String>, Error> {
        let url = format!(
            "{}/clients_api/dings/{}/share/play?disable_redirect=true",
            self.config.api_url, ding_id
        );
        let response = self.authorized_get(&url).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Api(format!(
                "Recording lookup for {} returned {}",
                ding_id,
                response.status()
            )));
        }

        let body: RecordingUrlResponse = response
            .json()
            .await
            .map_err(|e| Error::Api(format!("Invalid recording response: {}", e)))?;
        Ok(body.url)
    }

    async fn snapshot(&self, device: &Device) -> Result<Option<Vec<u8>>, Error> {
        let url = format!(
            "{}/clients_api/snapshots/image/{}",
            self.config.api_url, device.id
        );
        let response = match self.authorized_get(&url).await {
            Ok(response) => response,
            Err(e) => {
                debug!("Snapshot request for {} failed: {}", device.name, e);
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            debug!(
                "No snapshot available for {} ({})",
                device.name,
                response.status()
            );
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Api(format!("Snapshot download failed: {}", e)))?;
        Ok(Some(bytes.to_vec()))
    }
}

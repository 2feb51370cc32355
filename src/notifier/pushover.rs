use crate::config::PushoverConfig;
use crate::error::Error;
use crate::notifier::message::Notification;
use crate::notifier::NotificationChannel;
use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;

const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Push notifications via the Pushover HTTP API
pub struct PushoverChannel {
    http: reqwest::Client,
    config: PushoverConfig,
}

impl PushoverChannel {
    pub fn new(config: PushoverConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Notification(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl NotificationChannel for PushoverChannel {
    async fn send(&self, notification: &Notification) -> Result<(), Error> {
        let mut form = reqwest::multipart::Form::new()
            .text("token", self.config.api_token.clone())
            .text("user", self.config.user_key.clone())
            .text("title", notification.title.clone())
            .text("message", notification.body.clone())
            .text("priority", notification.priority.pushover_value().to_string())
            .text("sound", self.config.sound.clone());

        if let Some(path) = &notification.attachment {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let part = reqwest::multipart::Part::bytes(bytes)
                        .file_name("image.jpg")
                        .mime_str("image/jpeg")
                        .map_err(|e| Error::Notification(e.to_string()))?;
                    form = form.part("attachment", part);
                }
                Err(e) => debug!("Skipping unreadable attachment {:?}: {}", path, e),
            }
        }

        let response = self
            .http
            .post(PUSHOVER_API_URL)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("Pushover request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Notification(format!(
                "Pushover returned {}: {}",
                status, body
            )));
        }

        info!("Pushover sent: {}", notification.title);
        Ok(())
    }

    fn supports_attachments(&self) -> bool {
        true
    }
}

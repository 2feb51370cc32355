use crate::config::SmsConfig;
use crate::error::Error;
use crate::notifier::message::Notification;
use crate::notifier::NotificationChannel;
use async_trait::async_trait;
use log::info;
use std::time::Duration;

/// SMS delivery via the Twilio REST API
pub struct SmsChannel {
    http: reqwest::Client,
    config: SmsConfig,
}

impl SmsChannel {
    pub fn new(config: SmsConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Notification(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.config.account_sid
        )
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    async fn send(&self, notification: &Notification) -> Result<(), Error> {
        // SMS has no title field; flatten title and body into the text
        let body = format!("{}\n{}", notification.title, notification.body);
        let form = [
            ("From", self.config.from_number.as_str()),
            ("To", self.config.to_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("Twilio request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Notification(format!(
                "Twilio returned {}: {}",
                status, body
            )));
        }

        info!("SMS sent to {}", self.config.to_number);
        Ok(())
    }
}

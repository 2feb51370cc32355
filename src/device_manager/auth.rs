use crate::config::RingConfig;
use crate::error::Error;
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

const OAUTH_CLIENT_ID: &str = "ring_official_android";

/// Persisted OAuth credential blob. Rewritten on every refresh so a
/// restart can skip password authentication entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Treat tokens within a minute of expiry as already expired
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::seconds(60) >= self.expires_at
    }

    pub fn load(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(token) => {
                info!("Found cached token, skipping authentication");
                Some(token)
            }
            Err(e) => {
                warn!("Could not load cached token: {}", e);
                None
            }
        }
    }

    pub fn store(&self, path: &Path) -> Result<(), Error> {
        let contents = serde_json::to_string(self)
            .map_err(|e| Error::Io(format!("Failed to serialize token: {}", e)))?;
        std::fs::write(path, contents)
            .map_err(|e| Error::Io(format!("Failed to write token cache {:?}: {}", path, e)))?;
        info!("Token updated and saved to {:?}", path);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

impl From<TokenResponse> for CachedToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in),
        }
    }
}

/// Exchange account credentials for a token. A 412 from the OAuth endpoint
/// means the account wants a two-factor code.
pub async fn password_grant(
    http: &reqwest::Client,
    config: &RingConfig,
    two_factor_code: Option<&str>,
) -> Result<CachedToken, Error> {
    let url = format!("{}/oauth/token", config.oauth_url);
    let form = [
        ("grant_type", "password"),
        ("client_id", OAUTH_CLIENT_ID),
        ("scope", "client"),
        ("username", config.username.as_str()),
        ("password", config.password.as_str()),
    ];

    let mut request = http
        .post(&url)
        .header("2fa-support", "true")
        .form(&form);
    if let Some(code) = two_factor_code {
        request = request.header("2fa-code", code);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Authentication(format!("OAuth request failed: {}", e)))?;

    match response.status() {
        status if status.is_success() => {
            let token: TokenResponse = response
                .json()
                .await
                .map_err(|e| Error::Authentication(format!("Invalid token response: {}", e)))?;
            Ok(token.into())
        }
        reqwest::StatusCode::PRECONDITION_FAILED => Err(Error::TwoFactorRequired(
            "check your Ring app or email for a code".to_string(),
        )),
        status => Err(Error::Authentication(format!(
            "OAuth endpoint returned {}",
            status
        ))),
    }
}

/// Trade a refresh token for a fresh access token
pub async fn refresh_grant(
    http: &reqwest::Client,
    config: &RingConfig,
    refresh_token: &str,
) -> Result<CachedToken, Error> {
    let url = format!("{}/oauth/token", config.oauth_url);
    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", OAUTH_CLIENT_ID),
        ("refresh_token", refresh_token),
    ];

    let response = http
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Authentication(format!("Token refresh failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::Authentication(format!(
            "Token refresh returned {}",
            response.status()
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::Authentication(format!("Invalid refresh response: {}", e)))?;
    Ok(token.into())
}

/// Read a two-factor code from the terminal
pub fn prompt_two_factor() -> Result<String, Error> {
    print!("Enter 2FA code: ");
    std::io::stdout()
        .flush()
        .map_err(|e| Error::Io(e.to_string()))?;

    let mut code = String::new();
    std::io::stdin()
        .read_line(&mut code)
        .map_err(|e| Error::Io(e.to_string()))?;
    Ok(code.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_expired() {
        let token = CachedToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(!token.is_expired());
    }

    #[test]
    fn token_near_expiry_counts_as_expired() {
        let token = CachedToken {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: Utc::now() + Duration::seconds(30),
        };
        assert!(token.is_expired());
    }

    #[test]
    fn token_cache_round_trips_through_file() {
        let dir = std::env::temp_dir().join(format!("ring-watch-token-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("token.cache");

        let token = CachedToken {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        token.store(&path).unwrap();

        let loaded = CachedToken::load(&path).unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token, "refresh");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_cache_file_loads_as_none() {
        assert!(CachedToken::load(Path::new("/nonexistent/ring_token.cache")).is_none());
    }
}

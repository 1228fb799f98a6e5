//! Client for the hosted identity provider.
//!
//! Sign-in exchanges the device's stored refresh credentials for an access
//! token, then fetches the account profile. The current-user value is fanned
//! out through a watch channel so views can gate themselves on every change.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use tokio::sync::watch;

use crate::BoxFuture;
use crate::ids::UserId;
use crate::types::UserProfile;

pub const CREDENTIALS_DIRECTORY_NAME: &str = "sehat";
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum IdentityError {
    #[snafu(display("no stored sign-in credentials at {path}"))]
    CredentialsMissing { stage: &'static str, path: String },
    #[snafu(display("stored credentials at {path} could not be read"))]
    CredentialsUnreadable {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("stored credentials at {path} could not be parsed"))]
    CredentialsInvalid {
        stage: &'static str,
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("another sign-in request is already pending"))]
    AlreadyPending { stage: &'static str },
    #[snafu(display("identity provider request failed on `{stage}`: {source}"))]
    Network {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("identity provider rejected the request with status {status}: {body}"))]
    Rejected {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("identity provider response could not be decoded on `{stage}`: {source}"))]
    MalformedResponse {
        stage: &'static str,
        source: serde_json::Error,
    },
}

impl IdentityError {
    /// Distinct user-facing message per failure category. The login screen
    /// shows these verbatim.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::CredentialsMissing { .. }
            | Self::CredentialsUnreadable { .. }
            | Self::CredentialsInvalid { .. } => {
                "Sign-in is not set up on this device. Link your account and try again."
            }
            Self::AlreadyPending { .. } => {
                "Another sign-in request is pending. Please try again."
            }
            Self::Network { .. } => {
                "Network error. Please check your internet connection and try again."
            }
            Self::Rejected { .. } => {
                "Sign-in was declined by the identity provider. Please try again."
            }
            Self::MalformedResponse { .. } => "Failed to sign in. Please try again later.",
        }
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;

pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self) -> BoxFuture<'_, IdentityResult<UserProfile>>;
    fn sign_out(&self) -> BoxFuture<'_, ()>;
    /// Delivers the current-user-or-none value on every change.
    fn subscribe(&self) -> watch::Receiver<Option<UserProfile>>;
    fn current_user(&self) -> Option<UserProfile>;
}

/// Refresh credentials linked to this device out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub base_url: String,
    pub client_id: String,
}

impl IdentityConfig {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
            client_id: client_id.into().trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    name: String,
    email: String,
    #[serde(default)]
    picture: Option<String>,
}

pub struct RestIdentityProvider {
    config: IdentityConfig,
    credentials_path: PathBuf,
    client: reqwest::Client,
    state: watch::Sender<Option<UserProfile>>,
    pending: tokio::sync::Mutex<()>,
}

impl RestIdentityProvider {
    pub fn default_credentials_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CREDENTIALS_DIRECTORY_NAME)
            .join(CREDENTIALS_FILE_NAME)
    }

    pub fn new(config: IdentityConfig) -> Self {
        Self::with_credentials_path(config, Self::default_credentials_path())
    }

    pub fn with_credentials_path(config: IdentityConfig, credentials_path: PathBuf) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let (state, _) = watch::channel(None);

        Self {
            config,
            credentials_path,
            client,
            state,
            pending: tokio::sync::Mutex::new(()),
        }
    }

    fn load_credentials(&self) -> IdentityResult<StoredCredentials> {
        let path = self.credentials_path.display().to_string();

        if !self.credentials_path.exists() {
            return CredentialsMissingSnafu {
                stage: "load-credentials",
                path,
            }
            .fail();
        }

        let raw = std::fs::read_to_string(&self.credentials_path).context(
            CredentialsUnreadableSnafu {
                stage: "read-credentials",
                path: path.clone(),
            },
        )?;

        serde_json::from_str(&raw).context(CredentialsInvalidSnafu {
            stage: "parse-credentials",
            path,
        })
    }

    async fn exchange_token(&self, credentials: &StoredCredentials) -> IdentityResult<String> {
        let request = TokenRequest {
            grant_type: "refresh_token",
            refresh_token: &credentials.refresh_token,
            client_id: &self.config.client_id,
        };

        let response = self
            .client
            .post(format!("{}/v1/token", self.config.base_url))
            .json(&request)
            .send()
            .await
            .context(NetworkSnafu {
                stage: "exchange-token",
            })?;

        let token: TokenResponse = Self::decode_body(response, "exchange-token").await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> IdentityResult<UserProfile> {
        let response = self
            .client
            .get(format!("{}/v1/userinfo", self.config.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .context(NetworkSnafu {
                stage: "fetch-profile",
            })?;

        let info: UserInfoResponse = Self::decode_body(response, "fetch-profile").await?;
        Ok(UserProfile {
            id: UserId::new(info.sub),
            display_name: info.name,
            email: info.email,
            photo_url: info.picture,
        })
    }

    async fn decode_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        stage: &'static str,
    ) -> IdentityResult<T> {
        let status = response.status();
        let body = response.text().await.context(NetworkSnafu { stage })?;

        if !status.is_success() {
            return RejectedSnafu {
                stage,
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        serde_json::from_str(&body).context(MalformedResponseSnafu { stage })
    }
}

impl IdentityProvider for RestIdentityProvider {
    fn sign_in(&self) -> BoxFuture<'_, IdentityResult<UserProfile>> {
        Box::pin(async move {
            // One interactive sign-in at a time; a second request while the
            // first is in flight gets its own failure category.
            let Ok(_guard) = self.pending.try_lock() else {
                return AlreadyPendingSnafu { stage: "sign-in" }.fail();
            };

            let credentials = self.load_credentials()?;
            let access_token = self.exchange_token(&credentials).await?;
            let profile = self.fetch_profile(&access_token).await?;

            tracing::info!(user_id = %profile.id, "signed in");
            self.state.send_replace(Some(profile.clone()));
            Ok(profile)
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            tracing::info!("signed out");
            self.state.send_replace(None);
        })
    }

    fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.state.subscribe()
    }

    fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_missing_credentials() -> RestIdentityProvider {
        RestIdentityProvider::with_credentials_path(
            IdentityConfig::new("https://id.example.com", "client-1"),
            PathBuf::from("/nonexistent/sehat-test/credentials.json"),
        )
    }

    #[tokio::test]
    async fn sign_in_without_linked_credentials_is_categorized() {
        let provider = provider_with_missing_credentials();

        let error = provider.sign_in().await.expect_err("sign-in must fail");
        assert!(matches!(error, IdentityError::CredentialsMissing { .. }));
        assert_eq!(
            error.user_message(),
            "Sign-in is not set up on this device. Link your account and try again."
        );
    }

    #[tokio::test]
    async fn sign_out_notifies_subscribers_with_none() {
        let provider = provider_with_missing_credentials();
        let mut subscriber = provider.subscribe();

        provider.state.send_replace(Some(UserProfile {
            id: UserId::new("u-1"),
            display_name: "Udin".to_string(),
            email: "udin@example.com".to_string(),
            photo_url: None,
        }));
        subscriber.changed().await.expect("signed-in notification");
        assert!(provider.current_user().is_some());

        provider.sign_out().await;
        subscriber.changed().await.expect("signed-out notification");
        assert!(subscriber.borrow_and_update().is_none());
        assert!(provider.current_user().is_none());
    }

    #[test]
    fn every_failure_category_has_a_distinct_user_message() {
        let messages = [
            IdentityError::CredentialsMissing {
                stage: "t",
                path: "p".to_string(),
            }
            .user_message(),
            IdentityError::AlreadyPending { stage: "t" }.user_message(),
            IdentityError::Rejected {
                stage: "t",
                status: 401,
                body: String::new(),
            }
            .user_message(),
            IdentityError::MalformedResponse {
                stage: "t",
                source: serde_json::from_str::<()>("x").unwrap_err(),
            }
            .user_message(),
        ];

        for (index, left) in messages.iter().enumerate() {
            for right in &messages[index + 1..] {
                assert_ne!(left, right);
            }
        }
    }

    #[test]
    fn stored_credentials_round_trip() {
        let credentials = StoredCredentials {
            refresh_token: "rt-1".to_string(),
            token_type: Some("Bearer".to_string()),
        };

        let raw = serde_json::to_string(&credentials).expect("serialize credentials");
        let parsed: StoredCredentials = serde_json::from_str(&raw).expect("parse credentials");
        assert_eq!(parsed, credentials);
    }
}

//! OAuth2 tokens for the marketplace API.
//!
//! Tokens live in the env file so they survive restarts. A refresh or a
//! code exchange rewrites the `UPWORK_ACCESS_TOKEN` / `UPWORK_REFRESH_TOKEN`
//! lines in place (appending them when absent).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use jobwatch_core::config::MarketplaceConfig;

use crate::error::AuthError;

const ACCESS_TOKEN_KEY: &str = "UPWORK_ACCESS_TOKEN";
const REFRESH_TOKEN_KEY: &str = "UPWORK_REFRESH_TOKEN";

/// Supplies bearer tokens to API clients.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current access token.
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Replace `rejected` with a new access token and return it.
    ///
    /// When another caller already swapped the token out, the current one is
    /// returned without a new grant.
    async fn refresh(&self, rejected: &str) -> Result<String, AuthError>;
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// OAuth2 client for the marketplace token endpoint.
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_url: String,
    authorize_url: String,
    redirect_uri: String,
    env_file: PathBuf,
    tokens: RwLock<Tokens>,
    /// Held for the whole refresh grant; refresh tokens are single-use.
    refreshing: Mutex<()>,
}

impl OAuthClient {
    pub fn from_config(config: &MarketplaceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            authorize_url: config.authorize_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            env_file: config.env_file.clone(),
            tokens: RwLock::new(Tokens {
                access: config.access_token.clone(),
                refresh: config.refresh_token.clone(),
            }),
            refreshing: Mutex::new(()),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AuthError> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(AuthError::MissingCredentials),
        }
    }

    /// Browser URL that starts the authorization-code flow.
    pub fn authorize_url(&self) -> Result<String, AuthError> {
        let (client_id, _) = self.credentials()?;
        let url = url::Url::parse_with_params(
            &self.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", client_id),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
        )?;
        Ok(url.into())
    }

    /// Trade an authorization code for tokens and persist them.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        let (client_id, client_secret) = self.credentials()?;
        info!("exchanging authorization code for tokens");
        let response = self
            .request_tokens(&[
                ("grant_type", "authorization_code"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;
        self.store(&response).await?;
        Ok(response)
    }

    async fn request_tokens(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "token endpoint rejected request");
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Keep the new tokens in memory and write them to the env file.
    async fn store(&self, response: &TokenResponse) -> Result<(), AuthError> {
        {
            let mut tokens = self.tokens.write().await;
            tokens.access = Some(response.access_token.clone());
            tokens.refresh = Some(response.refresh_token.clone());
        }
        update_env_file(
            &self.env_file,
            &[
                (ACCESS_TOKEN_KEY, response.access_token.as_str()),
                (REFRESH_TOKEN_KEY, response.refresh_token.as_str()),
            ],
        )?;
        info!(env_file = %self.env_file.display(), "tokens saved");
        Ok(())
    }
}

#[async_trait]
impl TokenProvider for OAuthClient {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.tokens
            .read()
            .await
            .access
            .clone()
            .ok_or(AuthError::MissingToken("access"))
    }

    async fn refresh(&self, rejected: &str) -> Result<String, AuthError> {
        let _guard = self.refreshing.lock().await;
        let refresh_token = {
            let tokens = self.tokens.read().await;
            if let Some(current) = tokens.access.as_deref().filter(|t| *t != rejected) {
                debug!("access token already refreshed by another request");
                return Ok(current.to_string());
            }
            tokens.refresh.clone().ok_or(AuthError::MissingToken("refresh"))?
        };
        let (client_id, client_secret) = self.credentials()?;

        info!("refreshing access token");
        let response = self
            .request_tokens(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await?;
        self.store(&response).await?;
        Ok(response.access_token)
    }
}

/// Set `KEY=value` lines in an env file, creating the file if needed.
///
/// The new content goes to a `.tmp` sibling first and is renamed over the
/// original, so a crash never leaves a half-written file.
pub fn update_env_file(path: &Path, entries: &[(&str, &str)]) -> Result<(), AuthError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    let updated = entries
        .iter()
        .fold(content, |acc, (key, value)| upsert_env_line(&acc, key, value));
    let tmp_path = tmp_sibling(path);
    std::fs::write(&tmp_path, updated)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "env".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Replace the first `KEY=` line in `content`, or append one.
fn upsert_env_line(content: &str, key: &str, value: &str) -> String {
    let prefix = format!("{key}=");
    let mut replaced = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            if !replaced && line.starts_with(&prefix) {
                replaced = true;
                format!("{prefix}{value}")
            } else {
                line.to_string()
            }
        })
        .collect();
    if !replaced {
        lines.push(format!("{prefix}{value}"));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(env_file: PathBuf) -> MarketplaceConfig {
        MarketplaceConfig {
            client_id: Some("client-123".into()),
            client_secret: Some("secret".into()),
            access_token: Some("access-1".into()),
            refresh_token: None,
            redirect_uri: "http://localhost:3000/callback".into(),
            graphql_url: "https://api.upwork.com/graphql".into(),
            token_url: "https://www.upwork.com/api/v3/oauth2/token".into(),
            authorize_url: "https://www.upwork.com/ab/account-security/oauth2/authorize".into(),
            env_file,
        }
    }

    #[test]
    fn upsert_replaces_existing_line() {
        let content = "UPWORK_API_KEY=abc\nUPWORK_ACCESS_TOKEN=old\nOTHER=1\n";
        let updated = upsert_env_line(content, "UPWORK_ACCESS_TOKEN", "new");
        assert_eq!(updated, "UPWORK_API_KEY=abc\nUPWORK_ACCESS_TOKEN=new\nOTHER=1\n");
    }

    #[test]
    fn upsert_appends_missing_line() {
        let updated = upsert_env_line("UPWORK_API_KEY=abc", "UPWORK_REFRESH_TOKEN", "r1");
        assert_eq!(updated, "UPWORK_API_KEY=abc\nUPWORK_REFRESH_TOKEN=r1\n");
    }

    #[test]
    fn update_env_file_creates_and_updates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");

        update_env_file(&path, &[("UPWORK_ACCESS_TOKEN", "a1"), ("UPWORK_REFRESH_TOKEN", "r1")]).unwrap();
        update_env_file(&path, &[("UPWORK_ACCESS_TOKEN", "a2")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "UPWORK_ACCESS_TOKEN=a2\nUPWORK_REFRESH_TOKEN=r1\n");

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from(".env")]);
    }

    #[test]
    fn authorize_url_carries_client_and_redirect() {
        let client = OAuthClient::from_config(&config(PathBuf::from(".env")));
        let url = client.authorize_url().unwrap();
        assert!(url.starts_with("https://www.upwork.com/ab/account-security/oauth2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback"));
    }

    #[test]
    fn authorize_url_needs_credentials() {
        let mut cfg = config(PathBuf::from(".env"));
        cfg.client_secret = None;
        let client = OAuthClient::from_config(&cfg);
        assert!(matches!(client.authorize_url(), Err(AuthError::MissingCredentials)));
    }

    #[tokio::test]
    async fn tokens_come_from_config() {
        let client = OAuthClient::from_config(&config(PathBuf::from(".env")));
        assert_eq!(client.access_token().await.unwrap(), "access-1");

        let err = client.refresh("access-1").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingToken("refresh")));
        assert!(err.needs_reauth());
    }

    #[tokio::test]
    async fn refresh_skips_grant_when_token_already_rotated() {
        let mut cfg = config(PathBuf::from(".env"));
        cfg.access_token = Some("access-2".into());
        cfg.refresh_token = Some("refresh-2".into());
        // Nothing listens here; a token request would fail.
        cfg.token_url = "http://127.0.0.1:9/token".into();
        let client = OAuthClient::from_config(&cfg);

        assert_eq!(client.refresh("access-1").await.unwrap(), "access-2");
        assert!(matches!(
            client.refresh("access-2").await,
            Err(AuthError::Http(_))
        ));
    }
}

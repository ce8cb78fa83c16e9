//! Drive access tokens.
//!
//! Tokens come from `NAAC_DRIVE_TOKEN` or from a token file in Google's
//! authorized-user format. When the file carries a refresh token and client
//! credentials a fresh access token is requested and written back to it.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::export::write_json_atomic;

/// Environment variable holding a ready-to-use bearer token.
pub const TOKEN_ENV_VAR: &str = "NAAC_DRIVE_TOKEN";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Default, Deserialize)]
struct AuthorizedUser {
    token: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: Option<String>,
}

/// Credentials needed to refresh an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RefreshGrant {
    token_uri: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl AuthorizedUser {
    fn refresh_grant(&self) -> Option<RefreshGrant> {
        Some(RefreshGrant {
            token_uri: self
                .token_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            client_id: self.client_id.clone()?,
            client_secret: self.client_secret.clone()?,
            refresh_token: self.refresh_token.clone()?,
        })
    }

    fn stored_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| self.access_token.clone())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Obtain a bearer token for the Drive API.
pub async fn resolve_access_token(client: &reqwest::Client, token_file: &Path) -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.trim().is_empty() {
            debug!("Using Drive token from {}", TOKEN_ENV_VAR);
            return Ok(token.trim().to_string());
        }
    }

    let contents = tokio::fs::read_to_string(token_file).await.map_err(|e| {
        Error::Drive(format!(
            "cannot read token file {}: {}",
            token_file.display(),
            e
        ))
    })?;
    let user: AuthorizedUser = serde_json::from_str(&contents)?;

    if let Some(grant) = user.refresh_grant() {
        let token = refresh(client, &grant).await?;
        store_token(token_file, &contents, &token)?;
        info!("Refreshed Drive access token");
        return Ok(token);
    }

    user.stored_token().ok_or_else(|| {
        Error::Drive(format!(
            "token file {} has neither a token nor refresh credentials",
            token_file.display()
        ))
    })
}

async fn refresh(client: &reqwest::Client, grant: &RefreshGrant) -> Result<String> {
    let response = client
        .post(&grant.token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", grant.client_id.as_str()),
            ("client_secret", grant.client_secret.as_str()),
            ("refresh_token", grant.refresh_token.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Drive(format!(
            "token refresh failed with {}: {}",
            status,
            body.trim()
        )));
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

/// Write the new access token back, keeping every other field.
fn store_token(token_file: &Path, contents: &str, token: &str) -> Result<()> {
    let mut value: serde_json::Value = serde_json::from_str(contents)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("token".to_string(), serde_json::Value::String(token.to_string()));
    }
    write_json_atomic(token_file, &value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_grant_requires_all_fields() {
        let user: AuthorizedUser = serde_json::from_str(
            r#"{"token": "abc", "refresh_token": "r", "client_id": "id"}"#,
        )
        .unwrap();
        assert!(user.refresh_grant().is_none());
        assert_eq!(user.stored_token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_refresh_grant_defaults_token_uri() {
        let user: AuthorizedUser = serde_json::from_str(
            r#"{"refresh_token": "r", "client_id": "id", "client_secret": "s"}"#,
        )
        .unwrap();
        let grant = user.refresh_grant().unwrap();
        assert_eq!(grant.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(grant.refresh_token, "r");
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let user: AuthorizedUser = serde_json::from_str(r#"{"token": ""}"#).unwrap();
        assert!(user.stored_token().is_none());
    }

    #[test]
    fn test_store_token_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let contents = r#"{"token": "old", "refresh_token": "r", "scopes": ["drive"]}"#;
        std::fs::write(&path, contents).unwrap();

        store_token(&path, contents, "new").unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["token"], "new");
        assert_eq!(value["refresh_token"], "r");
        assert_eq!(value["scopes"][0], "drive");
    }
}

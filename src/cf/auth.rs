// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! UAA authentication.
//!
//! The token endpoint is discovered from the CF root document
//! (`GET /` → `links.login.href`) and a bearer token is obtained with the OAuth
//! password grant, authenticating as the public `cf` client. A `passcode` (one-time
//! code) replaces the password when present, and `origin` is forwarded as a
//! `login_hint` to select a federated identity provider.

use super::client::CfClient;
use super::errors::CfError;
use crate::constants::CF_OAUTH_CLIENT_ID;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Credentials stored as JSON in the provider secret.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub passcode: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("origin", &self.origin)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("passcode", &self.passcode.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    /// The login name: `username`, falling back to `email`.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.email.as_deref().filter(|e| !e.is_empty()))
    }

    fn form(&self) -> Result<Vec<(&'static str, String)>, CfError> {
        let mut form = vec![("grant_type", "password".to_string())];

        if let Some(passcode) = self.passcode.as_deref().filter(|p| !p.is_empty()) {
            form.push(("passcode", passcode.to_string()));
        } else {
            let user = self.user().ok_or_else(|| CfError::Unauthorized {
                status: 0,
                detail: "credentials contain neither username nor email".to_string(),
            })?;
            let password = self.password.clone().unwrap_or_default();
            form.push(("username", user.to_string()));
            form.push(("password", password));
        }

        if let Some(origin) = self.origin.as_deref().filter(|o| !o.is_empty()) {
            form.push(("login_hint", json!({ "origin": origin }).to_string()));
        }
        Ok(form)
    }
}

#[derive(Debug, Deserialize)]
struct RootLinks {
    #[serde(default)]
    login: Option<super::types::Link>,
    #[serde(default)]
    uaa: Option<super::types::Link>,
}

#[derive(Debug, Deserialize)]
struct RootInfo {
    links: RootLinks,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Looks up the UAA login endpoint advertised by the CF root document.
///
/// # Errors
///
/// Returns an error when the root document cannot be fetched or names no
/// login endpoint.
pub async fn discover_login_url(http: &reqwest::Client, api_url: &str) -> Result<String, CfError> {
    let anonymous = CfClient::new(http.clone(), api_url, None, Duration::ZERO);
    let root: RootInfo = anonymous.get("/", "CF root document").await?;
    root.links
        .login
        .or(root.links.uaa)
        .map(|l| l.href.trim_end_matches('/').to_string())
        .ok_or_else(|| CfError::not_found("login link in CF root document"))
}

/// Obtains a bearer token with the password grant.
///
/// # Errors
///
/// Returns [`CfError::Unauthorized`] when UAA rejects the credentials.
pub async fn request_token(
    http: &reqwest::Client,
    login_url: &str,
    credentials: &Credentials,
) -> Result<String, CfError> {
    let url = format!("{login_url}/oauth/token");
    debug!(url = %url, user = ?credentials.user(), "requesting UAA token");

    let response = http
        .post(&url)
        .basic_auth(CF_OAUTH_CLIENT_ID, Some(""))
        .header("Accept", "application/json")
        .form(&credentials.form()?)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(match CfError::from_response(status.as_u16(), &body, "UAA token") {
            // UAA answers bad credentials with 400/401 and an OAuth error body
            CfError::Unknown { status, detail } if status == 400 => {
                CfError::Unauthorized { status, detail }
            }
            err => err,
        });
    }

    let token: TokenResponse = serde_json::from_str(&body).map_err(|source| CfError::Decode {
        what: "UAA token response".to_string(),
        source,
    })?;
    Ok(token.access_token)
}

/// Authenticates against `api_url` and returns a client carrying the token.
///
/// # Errors
///
/// Returns an error when discovery or the token request fails.
pub async fn login(
    http: &reqwest::Client,
    api_url: &str,
    credentials: &Credentials,
    poll_interval: Duration,
) -> Result<CfClient, CfError> {
    let login_url = discover_login_url(http, api_url).await?;
    let token = request_token(http, &login_url, credentials).await?;
    debug!(api = %api_url, user = ?credentials.user(), "authenticated against CF");
    Ok(CfClient::new(http.clone(), api_url, Some(token), poll_interval))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod auth_tests;

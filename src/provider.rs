// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Connecting a managed resource to CF.
//!
//! `providerConfigRef` → `ProviderConfig` → API endpoint and credentials
//! secret → authenticated [`CfClient`]. Every reconcile connects afresh.

use crate::cf::{login, CfClient, Credentials};
use crate::context::Context;
use crate::crd::{CredentialsSource, ProviderConfig, ProviderConfigSpec, SecretKeySelector};
use crate::secrets::read_secret_key;
use anyhow::{anyhow, bail, Context as _, Result};
use kube::Api;
use tracing::debug;
use url::Url;

fn secret_namespace<'a>(selector: &'a SecretKeySelector, default: &'a str) -> &'a str {
    selector.namespace.as_deref().unwrap_or(default)
}

/// Validates a CF API URL and strips any trailing slash.
///
/// # Errors
///
/// Returns an error unless `raw` is an absolute `http` or `https` URL with a host.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid CF API endpoint {raw:?}"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        bail!("CF API endpoint {raw:?} must be an http(s) URL");
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// The CF API URL named by a `ProviderConfig`.
///
/// # Errors
///
/// Returns an error if neither `apiEndpoint` nor a readable endpoint secret is set.
pub async fn api_endpoint(ctx: &Context, spec: &ProviderConfigSpec, namespace: &str) -> Result<String> {
    if let Some(url) = spec.api_endpoint.as_deref().filter(|u| !u.is_empty()) {
        return normalize_endpoint(url);
    }
    let source = spec
        .endpoint
        .as_ref()
        .ok_or_else(|| anyhow!("ProviderConfig has neither apiEndpoint nor endpoint"))?;
    let selector = &source.secret_ref;
    let raw = read_secret_key(
        &ctx.client,
        secret_namespace(selector, namespace),
        &selector.name,
        &selector.key,
    )
    .await?;
    let url = String::from_utf8(raw).context("API endpoint secret is not UTF-8")?;
    normalize_endpoint(&url)
}

/// Parses the JSON credentials document held in the credentials secret.
///
/// # Errors
///
/// Returns an error if the document is not JSON or names no user.
pub fn parse_credentials(raw: &[u8]) -> Result<Credentials> {
    let creds: Credentials =
        serde_json::from_slice(raw).context("credentials secret is not a JSON document")?;
    if creds.user().is_none() && creds.passcode.is_none() {
        bail!("credentials secret has neither username, email nor passcode");
    }
    Ok(creds)
}

/// Authenticates against the CF deployment named by `provider_config`.
///
/// `namespace` is the namespace of the managed resource; secret references
/// without a namespace resolve there.
///
/// # Errors
///
/// Returns an error if the `ProviderConfig` or its secrets cannot be read, or
/// if UAA rejects the credentials.
pub async fn connect(ctx: &Context, provider_config: &str, namespace: &str) -> Result<CfClient> {
    let api: Api<ProviderConfig> = Api::all(ctx.client.clone());
    let pc = api
        .get(provider_config)
        .await
        .with_context(|| format!("cannot get ProviderConfig {provider_config}"))?;

    let endpoint = api_endpoint(ctx, &pc.spec, namespace).await?;

    if pc.spec.credentials.source != CredentialsSource::Secret {
        bail!("ProviderConfig {provider_config}: credentials source must be Secret");
    }
    let selector = pc
        .spec
        .credentials
        .secret_ref
        .as_ref()
        .ok_or_else(|| anyhow!("ProviderConfig {provider_config} has no credentials secretRef"))?;
    let raw = read_secret_key(
        &ctx.client,
        secret_namespace(selector, namespace),
        &selector.name,
        &selector.key,
    )
    .await?;
    let creds = parse_credentials(&raw)?;

    debug!(provider_config = %provider_config, api = %endpoint, "connecting to CF");
    let cf = login(&ctx.http_client, &endpoint, &creds, ctx.settings.poll_interval)
        .await
        .with_context(|| format!("cannot authenticate against {endpoint}"))?;
    Ok(cf)
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod provider_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes secrets: reading credentials and publishing connection details.
//!
//! # Connection details
//!
//! Credentials of a service credential binding are published in one of two
//! formats:
//!
//! - flat: one key per top-level field, nested objects flattened with `_`
//!   (`{"db": {"host": "h"}}` becomes `db_host = h`)
//! - JSON: a single `credentials` key holding the whole JSON document
//!
//! Strings are written verbatim. Other scalars and arrays are JSON-encoded.

use crate::cf::push::DockerCredentials;
use crate::crd::SecretKeySelector;
use crate::labels::{FIELD_MANAGER, K8S_MANAGED_BY, MANAGED_BY_CF_OPERATOR};
use anyhow::{anyhow, bail, Context as _, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Key used for the JSON connection-details format.
pub const CREDENTIALS_KEY: &str = "credentials";

/// Key of a `kubernetes.io/dockerconfigjson` secret.
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

/// Registry name Docker Hub images resolve to.
const DOCKER_HUB_REGISTRY: &str = "docker.io";

/// Connection details ready to be written to a secret.
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// Reads one key of a secret.
///
/// # Errors
///
/// Returns an error if the secret cannot be read or does not hold `key`.
pub async fn read_secret_key(client: &Client, namespace: &str, name: &str, key: &str) -> Result<Vec<u8>> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api
        .get(name)
        .await
        .with_context(|| format!("failed to read secret {namespace}/{name}"))?;
    secret_value(&secret, key)
        .ok_or_else(|| anyhow!("secret {namespace}/{name} has no key {key}"))
}

/// A JSON document from whichever of an inline value, a JSON string or a
/// secret key is set, checked in that order. A secret without a namespace is
/// read from `namespace`.
///
/// # Errors
///
/// Returns an error if the secret cannot be read or the document is not JSON.
pub async fn json_source(
    client: &Client,
    namespace: &str,
    inline: Option<&Value>,
    json: Option<&str>,
    secret: Option<&SecretKeySelector>,
) -> Result<Option<Value>> {
    if let Some(value) = inline {
        return Ok(Some(value.clone()));
    }
    if let Some(json) = json {
        return Ok(Some(serde_json::from_str(json).context("invalid JSON document")?));
    }
    let Some(selector) = secret else {
        return Ok(None);
    };
    let namespace = selector.namespace.as_deref().unwrap_or(namespace);
    let raw = read_secret_key(client, namespace, &selector.name, &selector.key).await?;
    let value = serde_json::from_slice(&raw).with_context(|| {
        format!(
            "key {} of secret {namespace}/{} is not valid JSON",
            selector.key, selector.name
        )
    })?;
    Ok(Some(value))
}

/// Value of `key` in `data`, falling back to `stringData`.
#[must_use]
pub fn secret_value(secret: &Secret, key: &str) -> Option<Vec<u8>> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(key))
        .map(|b| b.0.clone())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|d| d.get(key))
                .map(|s| s.as_bytes().to_vec())
        })
}

fn scalar_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Null => Vec::new(),
        other => other.to_string().into_bytes(),
    }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut ConnectionDetails) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}_{k}")
                };
                flatten_into(&key, v, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), scalar_bytes(other));
        }
    }
}

/// Turns a credentials document into connection details.
#[must_use]
pub fn connection_details(credentials: &Map<String, Value>, as_json: bool) -> ConnectionDetails {
    let mut out = ConnectionDetails::new();
    if as_json {
        out.insert(
            CREDENTIALS_KEY.to_string(),
            Value::Object(credentials.clone()).to_string().into_bytes(),
        );
    } else {
        for (k, v) in credentials {
            flatten_into(k, v, &mut out);
        }
    }
    out
}

/// Writes connection details to a secret with server-side apply. The secret
/// is owned by `owner` when both live in the same namespace.
///
/// # Errors
///
/// Returns an error if the apply fails.
pub async fn publish_connection_secret(
    client: &Client,
    namespace: &str,
    name: &str,
    owner: Option<OwnerReference>,
    details: &ConnectionDetails,
) -> Result<()> {
    let data: BTreeMap<String, ByteString> = details
        .iter()
        .map(|(k, v)| (k.clone(), ByteString(v.clone())))
        .collect();

    let mut metadata = json!({
        "name": name,
        "namespace": namespace,
        "labels": BTreeMap::from([(K8S_MANAGED_BY, MANAGED_BY_CF_OPERATOR)]),
    });
    if let Some(owner) = owner {
        metadata["ownerReferences"] = json!([owner]);
    }
    let patch = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": metadata,
        "type": "connection.crossplane.io/v1alpha1",
        "data": data,
    });

    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    api.patch(
        name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&patch),
    )
    .await
    .with_context(|| format!("failed to publish connection secret {namespace}/{name}"))?;

    debug!(
        "Published {} connection detail(s) to secret {}/{}",
        details.len(),
        namespace,
        name
    );
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, DockerAuth>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuth {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    auth: Option<String>,
}

impl DockerAuth {
    fn credentials(&self) -> Result<DockerCredentials> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Ok(DockerCredentials {
                username: username.clone(),
                password: password.clone(),
            });
        }
        let auth = self
            .auth
            .as_deref()
            .ok_or_else(|| anyhow!("docker auth entry has neither username/password nor auth"))?;
        let decoded = String::from_utf8(STANDARD.decode(auth).context("invalid base64 in docker auth")?)
            .context("docker auth is not UTF-8")?;
        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| anyhow!("docker auth is not of the form user:password"))?;
        Ok(DockerCredentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Registry host of an image reference; `docker.io` when the first path
/// component is not a host.
#[must_use]
pub fn image_registry(image: &str) -> &str {
    match image.split_once('/') {
        Some((first, _)) if first.contains('.') || first.contains(':') || first == "localhost" => first,
        _ => DOCKER_HUB_REGISTRY,
    }
}

fn registry_host(key: &str) -> &str {
    let key = key
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = key.split('/').next().unwrap_or(key);
    match host {
        "index.docker.io" | "registry-1.docker.io" => DOCKER_HUB_REGISTRY,
        other => other,
    }
}

/// Picks the credentials for `image` from a `.dockerconfigjson` document.
/// A config with a single registry is used for any image.
///
/// # Errors
///
/// Returns an error if the document is malformed or holds no entry for the
/// image's registry.
pub fn docker_credentials(config_json: &[u8], image: &str) -> Result<DockerCredentials> {
    let config: DockerConfig =
        serde_json::from_slice(config_json).context("invalid .dockerconfigjson")?;
    let registry = image_registry(image);

    if let Some(auth) = config
        .auths
        .iter()
        .find(|(key, _)| registry_host(key) == registry)
        .map(|(_, auth)| auth)
    {
        return auth.credentials();
    }
    if config.auths.len() == 1 {
        if let Some(auth) = config.auths.values().next() {
            return auth.credentials();
        }
    }
    bail!("no docker credentials for registry {registry}")
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod secrets_tests;

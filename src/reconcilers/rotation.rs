// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service credential binding rotation.
//!
//! A rotating key binding keeps one active CF binding (the external-name) and
//! a list of retired bindings in `status.atProvider.retiredKeys`:
//!
//! 1. the active binding is retired when the force-rotation annotation is set
//!    or it is older than `rotation.frequency`; the observe then reports the
//!    resource absent and the managed loop creates a new binding
//! 2. retired bindings older than `rotation.ttl` are deleted from CF on the
//!    next update, and dropped from status only once CF confirmed the delete
//! 3. every retired binding is deleted, best effort, when the resource goes
//!
//! The clock is injected so the schedule can be tested.

use crate::cf::{CfClient, CfError};
use crate::crd::{external_name, BindingType, RetiredKey, ServiceCredentialBinding};
use crate::duration::parse_chrono_duration;
use crate::labels::FORCE_ROTATION_ANNOTATION;
use crate::metrics;
use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use tracing::{info, warn};

pub const TRIGGER_FORCE: &str = "force";
pub const TRIGGER_FREQUENCY: &str = "frequency";

pub const OUTCOME_DELETED: &str = "deleted";
pub const OUTCOME_NOT_FOUND: &str = "not_found";
pub const OUTCOME_FAILED: &str = "failed";

/// Deletes one CF binding.
#[async_trait]
pub trait KeyDeleter: Send + Sync {
    async fn delete_key(&self, guid: &str) -> Result<(), CfError>;
}

#[async_trait]
impl KeyDeleter for CfClient {
    async fn delete_key(&self, guid: &str) -> Result<(), CfError> {
        self.service_credential_bindings().delete(guid).await.map(|_| ())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid timestamp {value:?}"))?
        .with_timezone(&Utc))
}

/// Rotation decisions at a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct Rotator {
    now: DateTime<Utc>,
}

impl Default for Rotator {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Rotator {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Whether the active binding (`guid`, created at `created_at`) must be
    /// replaced now. When it must, it is recorded as retired, once.
    ///
    /// App bindings and bindings without a `rotation` block never rotate,
    /// whatever their annotations say.
    ///
    /// # Errors
    ///
    /// Returns an error when `rotation.frequency` or `created_at` does not
    /// parse.
    pub fn retire_binding(
        &self,
        cr: &mut ServiceCredentialBinding,
        guid: &str,
        created_at: &str,
    ) -> Result<bool> {
        if cr.spec.for_provider.r#type == BindingType::App || cr.spec.rotation.is_none() {
            return Ok(false);
        }

        let trigger = if cr.annotations().contains_key(FORCE_ROTATION_ANNOTATION) {
            TRIGGER_FORCE
        } else {
            let Some(frequency) = cr.spec.rotation.as_ref().and_then(|r| r.frequency.as_deref())
            else {
                return Ok(false);
            };
            let frequency = parse_chrono_duration(frequency)?;
            if self.now <= parse_timestamp(created_at)? + frequency {
                return Ok(false);
            }
            TRIGGER_FREQUENCY
        };

        let retired = &mut cr.at_provider_mut().retired_keys;
        if !retired.iter().any(|key| key.guid == guid) {
            retired.push(RetiredKey {
                guid: guid.to_string(),
                created_at: created_at.to_string(),
            });
        }
        info!(
            name = %cr.name_any(),
            guid = %guid,
            trigger = trigger,
            "Retiring service credential binding"
        );
        metrics::record_scb_rotation(trigger);
        Ok(true)
    }

    fn is_expired(&self, key: &RetiredKey, ttl: chrono::Duration) -> Result<bool> {
        Ok(self.now > parse_timestamp(&key.created_at)? + ttl)
    }

    fn ttl(cr: &ServiceCredentialBinding) -> Result<Option<chrono::Duration>> {
        cr.spec
            .rotation
            .as_ref()
            .and_then(|r| r.ttl.as_deref())
            .map(parse_chrono_duration)
            .transpose()
    }

    /// Whether a retired key has outlived `rotation.ttl`. Without a TTL keys
    /// never expire.
    ///
    /// # Errors
    ///
    /// Returns an error when the TTL or a retired key timestamp does not parse.
    pub fn has_expired_keys(&self, cr: &ServiceCredentialBinding) -> Result<bool> {
        let Some(ttl) = Self::ttl(cr)? else {
            return Ok(false);
        };
        for key in cr.retired_keys() {
            if self.is_expired(key, ttl)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Deletes expired retired keys from CF and drops them from status.
    ///
    /// A key is kept when it has not expired, when it is the active binding,
    /// or when its delete failed. Status is updated before any error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns every failed delete, joined.
    pub async fn delete_expired_keys(
        &self,
        cr: &mut ServiceCredentialBinding,
        deleter: &dyn KeyDeleter,
    ) -> Result<()> {
        let Some(ttl) = Self::ttl(cr)? else {
            return Ok(());
        };
        let active = external_name(cr).map(str::to_string);

        let mut retained = Vec::new();
        let mut errors = Vec::new();
        for key in cr.retired_keys().to_vec() {
            if !self.is_expired(&key, ttl)? || active.as_deref() == Some(key.guid.as_str()) {
                retained.push(key);
                continue;
            }
            if let Err(err) = delete_key(deleter, &key.guid).await {
                errors.push(err);
                retained.push(key);
            }
        }

        cr.at_provider_mut().retired_keys = retained;
        join(errors)
    }
}

/// Deletes every retired key, keeping in status those whose delete failed.
///
/// # Errors
///
/// Returns every failed delete, joined.
pub async fn delete_retired_keys(
    cr: &mut ServiceCredentialBinding,
    deleter: &dyn KeyDeleter,
) -> Result<()> {
    let mut retained = Vec::new();
    let mut errors = Vec::new();
    for key in cr.retired_keys().to_vec() {
        if let Err(err) = delete_key(deleter, &key.guid).await {
            errors.push(err);
            retained.push(key);
        }
    }
    cr.at_provider_mut().retired_keys = retained;
    join(errors)
}

async fn delete_key(deleter: &dyn KeyDeleter, guid: &str) -> Result<(), CfError> {
    match deleter.delete_key(guid).await {
        Ok(()) => {
            info!(guid = %guid, "Deleted retired service credential binding");
            metrics::record_retired_key_deletion(OUTCOME_DELETED);
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            metrics::record_retired_key_deletion(OUTCOME_NOT_FOUND);
            Ok(())
        }
        Err(err) => {
            warn!(guid = %guid, error = %err, "Cannot delete retired service credential binding");
            metrics::record_retired_key_deletion(OUTCOME_FAILED);
            Err(err)
        }
    }
}

fn join(errors: Vec<CfError>) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    Err(anyhow!("cannot delete retired keys: {}", messages.join("; ")))
}

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod rotation_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Observation of resources that report a CF `last_operation`.
//!
//! Service instances and bindings are provisioned by brokers. Their progress
//! is durable state on the CF side, so an interrupted reconcile picks it up
//! again on the next observe instead of re-issuing the mutating call.
//!
//! | type \ state            | initial / in progress | succeeded      | failed             |
//! |-------------------------|-----------------------|----------------|--------------------|
//! | create                  | exists, Unavailable   | diff, Available| absent (recreate)  |
//! | update                  | exists, Unavailable   | diff, Available| stale (retry)      |
//! | delete                  | exists, Deleting      | absent         | exists, Unavailable|

use super::managed::ExternalObservation;
use super::status;
use crate::crd::{LastOperation, Managed};
use anyhow::{bail, Result};

pub const OPERATION_CREATE: &str = "create";
pub const OPERATION_UPDATE: &str = "update";
pub const OPERATION_DELETE: &str = "delete";

pub const STATE_INITIAL: &str = "initial";
pub const STATE_IN_PROGRESS: &str = "in progress";
pub const STATE_SUCCEEDED: &str = "succeeded";
pub const STATE_FAILED: &str = "failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Succeeded,
    Failed,
}

fn parse(op: &LastOperation) -> Result<(Operation, State)> {
    let operation = match op.r#type.as_str() {
        OPERATION_CREATE => Operation::Create,
        OPERATION_UPDATE => Operation::Update,
        OPERATION_DELETE => Operation::Delete,
        other => bail!("unknown last operation type {other:?}"),
    };
    let state = match op.state.as_str() {
        STATE_INITIAL | STATE_IN_PROGRESS | "in_progress" => State::Pending,
        STATE_SUCCEEDED => State::Succeeded,
        STATE_FAILED => State::Failed,
        other => bail!("unknown last operation state {other:?}"),
    };
    Ok((operation, state))
}

/// Whether `op` is a create that failed at the broker.
#[must_use]
pub fn is_failed_create(op: Option<&LastOperation>) -> bool {
    op.is_some_and(|op| op.r#type == OPERATION_CREATE && op.state == STATE_FAILED)
}

/// Whether `op` is a delete still running at the broker.
#[must_use]
pub fn is_delete_in_progress(op: Option<&LastOperation>) -> bool {
    op.is_some_and(|op| {
        op.r#type == OPERATION_DELETE
            && matches!(op.state.as_str(), STATE_INITIAL | STATE_IN_PROGRESS | "in_progress")
    })
}

/// Classifies an observed resource by its last operation and sets `Ready`.
///
/// `up_to_date` is the result of comparing the spec with the observed
/// resource; it is only used once a create or update has succeeded. A
/// resource without a last operation is treated as settled.
///
/// # Errors
///
/// Returns an error for a type or state outside the table above.
pub fn observe<K: Managed>(
    cr: &mut K,
    op: Option<&LastOperation>,
    up_to_date: bool,
) -> Result<ExternalObservation> {
    let Some(op) = op else {
        status::available(cr);
        return Ok(ExternalObservation::present(up_to_date));
    };

    let (operation, state) = parse(op)?;
    let description = op.description.as_deref().unwrap_or_default();

    let observation = match (operation, state) {
        (Operation::Create | Operation::Update, State::Pending) => {
            status::unavailable(cr, description);
            ExternalObservation::present(true)
        }
        (Operation::Create | Operation::Update, State::Succeeded) => {
            status::available(cr);
            ExternalObservation::present(up_to_date)
        }
        (Operation::Create, State::Failed) => {
            status::unavailable(cr, description);
            ExternalObservation::absent()
        }
        (Operation::Update, State::Failed) => {
            status::unavailable(cr, description);
            ExternalObservation::present(false)
        }
        (Operation::Delete, State::Pending) => {
            status::deleting(cr, description);
            ExternalObservation::present(true)
        }
        (Operation::Delete, State::Succeeded) => ExternalObservation::absent(),
        (Operation::Delete, State::Failed) => {
            status::unavailable(cr, description);
            ExternalObservation::present(true)
        }
    };
    Ok(observation)
}

#[cfg(test)]
#[path = "last_operation_tests.rs"]
mod last_operation_tests;

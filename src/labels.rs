// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants used across all reconcilers.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value for `app.kubernetes.io/managed-by` on objects written by this operator
pub const MANAGED_BY_CF_OPERATOR: &str = "cf-operator";

// ============================================================================
// Managed Resource Annotations
// ============================================================================

/// Annotation holding the CF GUID of the external resource
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Presence of this annotation on a `ServiceCredentialBinding` forces a rotation
/// on the next observe. It is removed once the replacement binding exists.
pub const FORCE_ROTATION_ANNOTATION: &str =
    "servicecredentialbinding.cloudfoundry.crossplane.io/force-rotation";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer guarding deletion of the external CF resource
pub const MANAGED_FINALIZER: &str = "finalizer.managedresource.crossplane.io";

// ============================================================================
// Field managers
// ============================================================================

/// Field manager used for server-side apply of connection secrets
pub const FIELD_MANAGER: &str = "cf-operator";

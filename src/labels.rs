// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and extdns-specific annotations
//! to ensure consistency across all resources created by the operator.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application (e.g., "external-dns")
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the instance of an application
pub const K8S_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` indicating this resource is part of extdns
pub const PART_OF_EXTDNS: &str = "extdns";

/// Application name for operand resources; with `app.kubernetes.io/instance`
/// this forms the deployment pod selector
pub const APP_NAME_EXTERNAL_DNS: &str = "external-dns";

/// Value for `app.kubernetes.io/managed-by` on every derived resource
pub const MANAGED_BY_EXTERNAL_DNS: &str = "ExternalDNS";

// ============================================================================
// Extdns-Specific Annotations
// ============================================================================

/// Pod-template annotation carrying the SHA-256 hash of the credentials secret
/// data; a rotation changes the hash, which recreates the pods
pub const CREDENTIALS_SECRET_HASH_ANNOTATION: &str =
    "extdns.firestoned.io/credentials-secret-hash";

/// Pod-template annotation carrying the SHA-256 hash of the trusted-CA bundle
pub const TRUSTED_CA_CONFIGMAP_HASH_ANNOTATION: &str =
    "extdns.firestoned.io/trusted-ca-configmap-hash";

/// `ServiceAccount` annotation binding an IAM role through IRSA
pub const EKS_ROLE_ARN_ANNOTATION: &str = "eks.amazonaws.com/role-arn";

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation controllers for ExternalDNS lifecycle management.
//!
//! This module contains the reconciliation logic for the `ExternalDNS` custom
//! resource and every derived resource the operator manages.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor resource changes via Kubernetes API
//! 2. **Reconcile** - Compare desired state (CR spec) with actual state
//! 3. **Update** - Drive the cluster toward the desired state
//! 4. **Status** - Report observations back into the CR status
//!
//! Within one reconcile pass the step order is strict: RBAC and namespace
//! first, then the cloud-credentials request (OpenShift), then the
//! credentials secret copy, then the operand deployment, then status. The
//! credentials copy must precede the deployment because the pod spec mounts
//! the destination secret and carries its content hash.
//!
//! # Available Reconcilers
//!
//! - [`reconcile_externaldns`] - Drives one `ExternalDNS` to its desired state
//! - [`credentials::reconcile_credentials_secret`] - Cross-namespace secret copy
//! - [`credentials_request::ensure_credentials_request`] - Platform credentials minting
//! - [`trusted_ca::reconcile_trusted_ca`] - CA bundle replication
//! - [`rbac`] - Shared cluster role, per-CR binding, service account, namespace

pub mod credentials;
pub mod credentials_request;
pub mod externaldns;
pub mod rbac;
pub mod resources;
pub mod status;
pub mod trusted_ca;

pub use credentials::reconcile_credentials_secret;
pub use credentials_request::ensure_credentials_request;
pub use externaldns::reconcile_externaldns;
pub use trusted_ca::reconcile_trusted_ca;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the controllers, with a reflector store over the
//! `ExternalDNS` collection.
//!
//! The store backs the two reverse lookups the credentials watch wiring needs:
//! given a secret name observed in the operator namespace (a declared source
//! secret) or in the operand namespace (a derived destination secret), find
//! every `ExternalDNS` that references it. Watch mappers query the in-memory
//! store only and never touch the API server.

use crate::config::OperatorConfig;
use crate::crd::{ExternalDNS, ProviderType};
use crate::externaldns_resources::credentials_secret_name;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::{Client, ResourceExt};

/// Shared context passed to all controllers and the webhook.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Operator configuration threaded from the bootstrap
    pub config: OperatorConfig,

    /// Reflector store over all `ExternalDNS` resources
    pub externaldnses: Store<ExternalDNS>,
}

impl Context {
    /// Find every `ExternalDNS` whose provider options declare `secret_name`
    /// as its source credentials secret.
    ///
    /// Used by the watch on secrets in the operator namespace: a change to a
    /// source secret re-enqueues every CR that copies from it.
    #[must_use]
    pub fn externaldnses_with_source_secret(
        &self,
        secret_name: &str,
    ) -> Vec<ObjectRef<ExternalDNS>> {
        externaldnses_with_source_secret(&self.externaldnses, secret_name)
    }

    /// Find every `ExternalDNS` whose derived destination secret is named
    /// `secret_name`.
    ///
    /// Used by the watch on secrets in the operand namespace: tampering with a
    /// destination secret re-enqueues the owning CR so drift is repaired.
    #[must_use]
    pub fn externaldnses_with_destination_secret(
        &self,
        secret_name: &str,
    ) -> Vec<ObjectRef<ExternalDNS>> {
        externaldnses_with_destination_secret(&self.externaldnses, secret_name)
    }
}

/// Find every `ExternalDNS` in `store` declaring `secret_name` as its source
/// credentials secret.
#[must_use]
pub fn externaldnses_with_source_secret(
    store: &Store<ExternalDNS>,
    secret_name: &str,
) -> Vec<ObjectRef<ExternalDNS>> {
    store
        .state()
        .iter()
        .filter(|edns| edns.spec.provider.declared_secret_name() == Some(secret_name))
        .map(|edns| ObjectRef::from_obj(&**edns))
        .collect()
}

/// Find every `ExternalDNS` in `store` whose derived destination secret is
/// named `secret_name`.
#[must_use]
pub fn externaldnses_with_destination_secret(
    store: &Store<ExternalDNS>,
    secret_name: &str,
) -> Vec<ObjectRef<ExternalDNS>> {
    store
        .state()
        .iter()
        .filter(|edns| credentials_secret_name(&edns.name_any()) == secret_name)
        .map(|edns| ObjectRef::from_obj(&**edns))
        .collect()
}

/// Find every `ExternalDNS` in `store` referencing the platform-issued
/// credentials secret, i.e. cloud-provider CRs with no explicit credentials.
///
/// On OpenShift a change to the platform secret must re-enqueue these CRs even
/// though their spec never names it.
#[must_use]
pub fn externaldnses_with_platform_credentials(
    store: &Store<ExternalDNS>,
) -> Vec<ObjectRef<ExternalDNS>> {
    store
        .state()
        .iter()
        .filter(|edns| {
            matches!(
                edns.spec.provider.r#type,
                ProviderType::AWS | ProviderType::Azure | ProviderType::GCP
            ) && edns.spec.provider.declared_secret_name().is_none()
        })
        .map(|edns| ObjectRef::from_obj(&**edns))
        .collect()
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;

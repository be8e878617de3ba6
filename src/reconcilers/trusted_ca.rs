// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Trusted-CA bundle replication.
//!
//! When the operator is configured with a trusted-CA configmap, the PEM bundle
//! is copied from the operator namespace into the operand namespace under a
//! fixed name, so the deployment builder can project it into every operand
//! container and point `SSL_CERT_DIR` at it.

use crate::config::OperatorConfig;
use crate::constants::{TRUSTED_CA_BUNDLE_KEY, TRUSTED_CA_CONFIGMAP_NAME};
use crate::reconcilers::resources::create_or_replace;
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// Replicate the configured CA bundle into the operand namespace.
///
/// Returns the destination configmap when injection is enabled, `None`
/// otherwise. The destination carries only the canonical `ca-bundle.crt` key.
///
/// # Errors
///
/// Returns an error when the configured source configmap does not exist or is
/// missing the bundle key, or when an API operation fails.
pub async fn reconcile_trusted_ca(
    client: &Client,
    config: &OperatorConfig,
) -> Result<Option<ConfigMap>> {
    let Some(source_name) = &config.trusted_ca_configmap else {
        return Ok(None);
    };

    let source_api: Api<ConfigMap> = Api::namespaced(client.clone(), &config.operator_namespace);
    let source = source_api.get_opt(source_name).await?.with_context(|| {
        format!(
            "trusted CA configmap {}/{} not found",
            config.operator_namespace, source_name
        )
    })?;

    let bundle = source
        .data
        .as_ref()
        .and_then(|data| data.get(TRUSTED_CA_BUNDLE_KEY))
        .with_context(|| {
            format!("trusted CA configmap {source_name:?} has no {TRUSTED_CA_BUNDLE_KEY:?} entry")
        })?;

    let mut data = BTreeMap::new();
    data.insert(TRUSTED_CA_BUNDLE_KEY.to_string(), bundle.clone());

    let destination = ConfigMap {
        metadata: ObjectMeta {
            name: Some(TRUSTED_CA_CONFIGMAP_NAME.to_string()),
            namespace: Some(config.operand_namespace.clone()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    };

    let destination_api: Api<ConfigMap> = Api::namespaced(client.clone(), &config.operand_namespace);
    match destination_api.get_opt(TRUSTED_CA_CONFIGMAP_NAME).await? {
        Some(existing) if existing.data == destination.data => {
            debug!(
                name = TRUSTED_CA_CONFIGMAP_NAME,
                namespace = %config.operand_namespace,
                "Trusted CA configmap up to date"
            );
        }
        _ => {
            create_or_replace(client, &config.operand_namespace, &destination).await?;
        }
    }

    Ok(Some(destination))
}

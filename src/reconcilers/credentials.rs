// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Credentials secret replication.
//!
//! Providers read their credentials from a secret in the operand namespace
//! under the deterministic name `external-dns-credentials-<CR name>`. The user
//! stores the original in the operator namespace; on OpenShift the
//! cloud-credentials subsystem drops a platform-issued secret there instead.
//! This reconciler copies the source into the operand namespace, reshaping
//! platform-issued content into what the operand expects, validates the
//! provider-specific keys, and repairs any drift by replacing the destination
//! data wholesale.

use crate::config::OperatorConfig;
use crate::constants::{
    AZURE_CONFIG_KEY, BLUECAT_CONFIG_KEY, GCP_CREDENTIALS_KEY, GCP_PLATFORM_CREDENTIALS_KEY,
    INFOBLOX_WAPI_PASSWORD_KEY, INFOBLOX_WAPI_USERNAME_KEY, PLATFORM_CREDENTIALS_SECRET,
};
use crate::crd::{ExternalDNS, ProviderType};
use crate::externaldns_resources::{build_labels, build_owner_reference, credentials_secret_name};
use crate::reconcilers::resources::create_or_replace;
use anyhow::{bail, Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Where a CR's credentials come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecretSource {
    /// The platform-issued secret minted by the cloud-credentials subsystem.
    Platform,
    /// A secret the user declared on the CR.
    Declared(String),
}

impl SecretSource {
    /// Name of the source secret in the operator namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            SecretSource::Platform => PLATFORM_CREDENTIALS_SECRET,
            SecretSource::Declared(name) => name,
        }
    }
}

/// Resolve which secret a CR's credentials are copied from.
///
/// On OpenShift, cloud providers with no explicit credentials fall back to the
/// platform-issued secret. A CR that names no secret and has no platform
/// fallback copies nothing.
#[must_use]
pub fn resolve_secret_source(edns: &ExternalDNS, config: &OperatorConfig) -> Option<SecretSource> {
    let declared = edns
        .spec
        .provider
        .declared_secret_name()
        .filter(|name| !name.is_empty());

    match declared {
        Some(name) => Some(SecretSource::Declared(name.to_string())),
        None if config.is_openshift
            && matches!(
                edns.spec.provider.r#type,
                ProviderType::AWS | ProviderType::Azure | ProviderType::GCP
            ) =>
        {
            Some(SecretSource::Platform)
        }
        None => None,
    }
}

/// Shape of the `azure.json` document the operand consumes.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AzureCloudConfig {
    aad_client_id: String,
    aad_client_secret: String,
    resource_group: String,
    subscription_id: String,
    tenant_id: String,
}

fn utf8_value(data: &BTreeMap<String, ByteString>, key: &str) -> Result<String> {
    let value = data
        .get(key)
        .with_context(|| format!("platform credentials secret is missing key {key:?}"))?;
    String::from_utf8(value.0.clone())
        .with_context(|| format!("platform credentials key {key:?} is not UTF-8"))
}

/// Reshape platform-issued secret data into the form the operand expects.
///
/// AWS content is copied verbatim; GCP renames the service-account entry;
/// Azure synthesizes `azure.json` from the flat fields the platform mints.
///
/// # Errors
///
/// Returns an error when the platform secret is missing an expected key.
pub fn transform_platform_data(
    provider: ProviderType,
    data: &BTreeMap<String, ByteString>,
) -> Result<BTreeMap<String, ByteString>> {
    match provider {
        ProviderType::AWS => Ok(data.clone()),
        ProviderType::GCP => {
            let mut transformed = BTreeMap::new();
            let value = data.get(GCP_PLATFORM_CREDENTIALS_KEY).with_context(|| {
                format!("platform credentials secret is missing key {GCP_PLATFORM_CREDENTIALS_KEY:?}")
            })?;
            transformed.insert(GCP_CREDENTIALS_KEY.to_string(), value.clone());
            Ok(transformed)
        }
        ProviderType::Azure => {
            let config = AzureCloudConfig {
                aad_client_id: utf8_value(data, "azure_client_id")?,
                aad_client_secret: utf8_value(data, "azure_client_secret")?,
                resource_group: utf8_value(data, "azure_resourcegroup")?,
                subscription_id: utf8_value(data, "azure_subscription_id")?,
                tenant_id: utf8_value(data, "azure_tenant_id")?,
            };
            let mut transformed = BTreeMap::new();
            transformed.insert(
                AZURE_CONFIG_KEY.to_string(),
                ByteString(serde_json::to_vec(&config)?),
            );
            Ok(transformed)
        }
        ProviderType::BlueCat | ProviderType::Infoblox => {
            bail!("provider {:?} has no platform-issued credentials", provider.name())
        }
    }
}

/// Keys the provider expects in the destination secret; empty when the
/// provider can run without keyed content (AWS may use IRSA).
fn required_keys(provider: ProviderType) -> &'static [&'static str] {
    match provider {
        ProviderType::AWS => &[],
        ProviderType::Azure => &[AZURE_CONFIG_KEY],
        ProviderType::GCP => &[GCP_CREDENTIALS_KEY],
        ProviderType::BlueCat => &[BLUECAT_CONFIG_KEY],
        ProviderType::Infoblox => &[INFOBLOX_WAPI_USERNAME_KEY, INFOBLOX_WAPI_PASSWORD_KEY],
    }
}

/// Confirm the destination data carries the keys the provider reads.
///
/// # Errors
///
/// Returns an error naming every missing key.
pub fn validate_secret_shape(
    provider: ProviderType,
    data: &BTreeMap<String, ByteString>,
) -> Result<()> {
    let missing: Vec<&str> = required_keys(provider)
        .iter()
        .copied()
        .filter(|key| !data.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        bail!(
            "credentials secret for provider {:?} is missing required keys: {}",
            provider.name(),
            missing.join(", ")
        );
    }
    Ok(())
}

/// Copy the source credentials secret into the operand namespace.
///
/// Returns the destination secret when the provider has credentials to copy,
/// `None` when the CR names no secret and has no platform fallback. Drift in
/// the destination is repaired by replacing its data wholesale.
///
/// # Errors
///
/// Returns an error when the source secret does not exist (a misconfigured
/// cluster, not an operator bug), its shape fails validation, or an API
/// operation fails.
pub async fn reconcile_credentials_secret(
    client: &Client,
    config: &OperatorConfig,
    edns: &ExternalDNS,
) -> Result<Option<Secret>> {
    let Some(source) = resolve_secret_source(edns, config) else {
        debug!(
            name = %edns.name_any(),
            "No credentials secret declared and no platform fallback, skipping copy"
        );
        return Ok(None);
    };

    let source_api: Api<Secret> = Api::namespaced(client.clone(), &config.operator_namespace);
    let source_secret = source_api
        .get_opt(source.name())
        .await?
        .with_context(|| {
            format!(
                "source credentials secret {}/{} for ExternalDNS {:?} not found",
                config.operator_namespace,
                source.name(),
                edns.name_any()
            )
        })?;

    let source_data = source_secret.data.clone().unwrap_or_default();
    let data = match source {
        SecretSource::Platform => transform_platform_data(edns.spec.provider.r#type, &source_data)?,
        SecretSource::Declared(_) => source_data,
    };

    validate_secret_shape(edns.spec.provider.r#type, &data)?;

    let cr_name = edns.name_any();
    let destination = Secret {
        metadata: ObjectMeta {
            name: Some(credentials_secret_name(&cr_name)),
            namespace: Some(config.operand_namespace.clone()),
            labels: Some(build_labels(&cr_name)),
            owner_references: Some(build_owner_reference(edns)),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    };

    let destination_api: Api<Secret> = Api::namespaced(client.clone(), &config.operand_namespace);
    let current = destination_api
        .get_opt(&credentials_secret_name(&cr_name))
        .await?;
    match current {
        Some(existing) if existing.data == destination.data => {
            debug!(
                name = %credentials_secret_name(&cr_name),
                namespace = %config.operand_namespace,
                "Destination credentials secret up to date"
            );
        }
        _ => {
            info!(
                name = %credentials_secret_name(&cr_name),
                namespace = %config.operand_namespace,
                "Writing destination credentials secret"
            );
            create_or_replace(client, &config.operand_namespace, &destination).await?;
        }
    }

    Ok(Some(destination))
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;

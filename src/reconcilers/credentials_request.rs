// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud-credentials request reconciliation (OpenShift only).
//!
//! On OpenShift the operator does not require the user to mint provider
//! credentials by hand: it emits a `CredentialsRequest` understood by the
//! cloud-credentials component, which materializes a native secret under the
//! platform-issued name in the operator namespace and keeps it refreshed.
//! One request exists per provider tag, with the minimal DNS-management policy
//! for that provider encoded in the platform's envelope.
//!
//! Drift detection decodes the live and desired payloads back into typed
//! structs and compares those; diffing the serialized envelope would flag
//! every cosmetic reordering the platform performs.

use crate::config::OperatorConfig;
use crate::constants::{
    AWS_ARN_PREFIX, AWS_GOV_ARN_PREFIX, AZURE_CONTRIBUTOR_ROLE, CREDENTIALS_REQUEST_API_VERSION,
    GCP_DNS_ADMIN_ROLE, PLATFORM_CREDENTIALS_SECRET,
};
use crate::crd::{ExternalDNS, ProviderType};
use crate::externaldns_resources::{build_owner_reference, credentials_request_name};
use anyhow::{bail, Result};
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::PostParams;
use kube::{Api, Client, CustomResource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// CredentialsRequest resource (owned by the cloud-credentials component)
// ============================================================================

/// Spec of the OpenShift `CredentialsRequest` resource.
///
/// Defined here rather than imported: the operator only ever writes the three
/// fields below and treats the provider payload as an opaque envelope.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudcredential.openshift.io",
    version = "v1",
    kind = "CredentialsRequest",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequestSpec {
    /// Where the minted secret is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<ObjectReference>,

    /// Service accounts granted read access to the minted secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_names: Option<Vec<String>>,

    /// Provider-specific policy payload in the platform envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_spec: Option<RawExtension>,
}

// ============================================================================
// Provider policy payloads
// ============================================================================

/// One allow/deny statement of an AWS policy payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementEntry {
    pub effect: String,
    pub action: Vec<String>,
    pub resource: String,
}

/// AWS policy payload: Route53 record management plus zone/record listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AWSProviderSpec {
    pub api_version: String,
    pub kind: String,
    pub statement_entries: Vec<StatementEntry>,
}

/// GCP policy payload: a predefined role grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GCPProviderSpec {
    pub api_version: String,
    pub kind: String,
    pub predefined_roles: Vec<String>,
}

/// One role binding of the Azure policy payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureRoleBinding {
    pub role: String,
}

/// Azure policy payload: role bindings on the subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureProviderSpec {
    pub api_version: String,
    pub kind: String,
    pub role_bindings: Vec<AzureRoleBinding>,
}

/// Build the policy payload for a provider, encoded through the platform codec.
///
/// # Errors
///
/// Returns an error for providers with no platform-issued credentials.
pub fn desired_provider_spec(
    provider: ProviderType,
    config: &OperatorConfig,
) -> Result<RawExtension> {
    let value = match provider {
        ProviderType::AWS => {
            let arn_prefix = if config.is_gov_cloud() {
                AWS_GOV_ARN_PREFIX
            } else {
                AWS_ARN_PREFIX
            };
            serde_json::to_value(AWSProviderSpec {
                api_version: CREDENTIALS_REQUEST_API_VERSION.to_string(),
                kind: "AWSProviderSpec".to_string(),
                statement_entries: vec![
                    StatementEntry {
                        effect: "Allow".to_string(),
                        action: vec!["route53:ChangeResourceRecordSets".to_string()],
                        resource: format!("{arn_prefix}:route53:::hostedzone/*"),
                    },
                    StatementEntry {
                        effect: "Allow".to_string(),
                        action: vec![
                            "route53:ListHostedZones".to_string(),
                            "route53:ListResourceRecordSets".to_string(),
                            "tag:GetResources".to_string(),
                        ],
                        resource: "*".to_string(),
                    },
                ],
            })?
        }
        ProviderType::GCP => serde_json::to_value(GCPProviderSpec {
            api_version: CREDENTIALS_REQUEST_API_VERSION.to_string(),
            kind: "GCPProviderSpec".to_string(),
            predefined_roles: vec![GCP_DNS_ADMIN_ROLE.to_string()],
        })?,
        ProviderType::Azure => serde_json::to_value(AzureProviderSpec {
            api_version: CREDENTIALS_REQUEST_API_VERSION.to_string(),
            kind: "AzureProviderSpec".to_string(),
            role_bindings: vec![AzureRoleBinding {
                role: AZURE_CONTRIBUTOR_ROLE.to_string(),
            }],
        })?,
        ProviderType::BlueCat | ProviderType::Infoblox => {
            bail!(
                "provider {:?} has no cloud-credentials integration",
                provider.name()
            )
        }
    };
    Ok(RawExtension(value))
}

/// Compare the live and desired payloads through the typed structs.
///
/// Undecodable live payloads count as drift and get rewritten.
#[must_use]
pub fn provider_specs_equal(
    provider: ProviderType,
    current: Option<&RawExtension>,
    desired: &RawExtension,
) -> bool {
    let Some(current) = current else {
        return false;
    };

    fn decode_eq<T: for<'de> Deserialize<'de> + PartialEq>(
        current: &RawExtension,
        desired: &RawExtension,
    ) -> bool {
        let current: Option<T> = serde_json::from_value(current.0.clone()).ok();
        let desired: Option<T> = serde_json::from_value(desired.0.clone()).ok();
        matches!((current, desired), (Some(a), Some(b)) if a == b)
    }

    match provider {
        ProviderType::AWS => decode_eq::<AWSProviderSpec>(current, desired),
        ProviderType::GCP => decode_eq::<GCPProviderSpec>(current, desired),
        ProviderType::Azure => decode_eq::<AzureProviderSpec>(current, desired),
        ProviderType::BlueCat | ProviderType::Infoblox => false,
    }
}

fn multiset_equal(a: Option<&Vec<String>>, b: Option<&Vec<String>>) -> bool {
    let mut a = a.cloned().unwrap_or_default();
    let mut b = b.cloned().unwrap_or_default();
    a.sort();
    b.sort();
    a == b
}

fn secret_ref_equal(a: Option<&ObjectReference>, b: Option<&ObjectReference>) -> bool {
    let tuple = |r: Option<&ObjectReference>| {
        r.map(|r| (r.name.clone(), r.namespace.clone()))
            .unwrap_or_default()
    };
    tuple(a) == tuple(b)
}

/// Ensure the per-provider `CredentialsRequest` exists and matches the desired
/// policy, secret-ref and service-account list.
///
/// # Errors
///
/// Returns an error when the provider has no cloud-credentials integration or
/// an API operation fails.
pub async fn ensure_credentials_request(
    client: &Client,
    config: &OperatorConfig,
    edns: &ExternalDNS,
) -> Result<()> {
    let provider = edns.spec.provider.r#type;
    let name = credentials_request_name(provider);
    let provider_spec = desired_provider_spec(provider, config)?;

    let desired_secret_ref = ObjectReference {
        name: Some(PLATFORM_CREDENTIALS_SECRET.to_string()),
        namespace: Some(config.operator_namespace.clone()),
        ..Default::default()
    };
    let desired_service_accounts = vec![config.operator_service_account.clone()];

    let api: Api<CredentialsRequest> = Api::namespaced(client.clone(), &config.operator_namespace);
    match api.get_opt(&name).await? {
        None => {
            info!(name = %name, namespace = %config.operator_namespace, "Creating credentials request");
            let request = CredentialsRequest {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: Some(config.operator_namespace.clone()),
                    owner_references: Some(build_owner_reference(edns)),
                    ..Default::default()
                },
                spec: CredentialsRequestSpec {
                    secret_ref: Some(desired_secret_ref),
                    service_account_names: Some(desired_service_accounts),
                    provider_spec: Some(provider_spec),
                },
            };
            api.create(&PostParams::default(), &request).await?;
        }
        Some(mut current) => {
            let up_to_date = provider_specs_equal(
                provider,
                current.spec.provider_spec.as_ref(),
                &provider_spec,
            ) && multiset_equal(
                current.spec.service_account_names.as_ref(),
                Some(&desired_service_accounts),
            ) && secret_ref_equal(
                current.spec.secret_ref.as_ref(),
                Some(&desired_secret_ref),
            );

            if up_to_date {
                debug!(name = %name, "Credentials request up to date");
            } else {
                info!(name = %name, "Updating credentials request");
                current.spec.secret_ref = Some(desired_secret_ref);
                current.spec.service_account_names = Some(desired_service_accounts);
                current.spec.provider_spec = Some(provider_spec);
                api.replace(&name, &PostParams::default(), &current).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "credentials_request_tests.rs"]
mod credentials_request_tests;

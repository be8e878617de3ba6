// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RBAC, service-account and namespace reconciliation for the operand.
//!
//! One cluster role (`external-dns`) is shared by every `ExternalDNS` and is
//! never deleted; its content is a compile-time constant, so concurrent writers
//! converge. Each CR gets its own service account and cluster role binding,
//! both owner-referenced to the CR for garbage collection.
//!
//! Rule drift is judged by set-equality over `(apiGroup, resource, verb)`
//! tuples: reordering verbs or resources in the live object is not drift.

use crate::config::OperatorConfig;
use crate::constants::CLUSTER_ROLE_NAME;
use crate::crd::{AWSAssumeRoleStrategy, ExternalDNS, ProviderType};
use crate::externaldns_resources::{build_labels, build_owner_reference, operand_name};
use crate::labels::EKS_ROLE_ARN_ANNOTATION;
use crate::reconcilers::resources::{create_cluster_if_absent, create_if_absent};
use anyhow::Result;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::PostParams;
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Access the operand needs to discover publishable hostnames.
pub(crate) fn desired_policy_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule {
            api_groups: Some(vec!["networking.k8s.io".to_string()]),
            resources: Some(vec!["ingresses".to_string()]),
            verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
            ..Default::default()
        },
        PolicyRule {
            api_groups: Some(vec![String::new()]),
            resources: Some(vec![
                "endpoints".to_string(),
                "services".to_string(),
                "pods".to_string(),
                "nodes".to_string(),
            ]),
            verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
            ..Default::default()
        },
    ]
}

/// Flatten policy rules into a set of `(apiGroup, resource, verb)` tuples.
pub(crate) fn rule_tuples(rules: &[PolicyRule]) -> BTreeSet<(String, String, String)> {
    let mut tuples = BTreeSet::new();
    for rule in rules {
        for group in rule.api_groups.as_deref().unwrap_or_default() {
            for resource in rule.resources.as_deref().unwrap_or_default() {
                for verb in &rule.verbs {
                    tuples.insert((group.clone(), resource.clone(), verb.clone()));
                }
            }
        }
    }
    tuples
}

/// Ensure the shared `external-dns` cluster role exists with the expected
/// access, updating it only when the granted tuples actually differ.
///
/// # Errors
///
/// Returns an error when an API operation fails.
pub async fn ensure_cluster_role(client: &Client) -> Result<()> {
    let api: Api<ClusterRole> = Api::all(client.clone());
    let desired_rules = desired_policy_rules();

    match api.get_opt(CLUSTER_ROLE_NAME).await? {
        None => {
            info!(name = CLUSTER_ROLE_NAME, "Creating cluster role");
            let role = ClusterRole {
                metadata: ObjectMeta {
                    name: Some(CLUSTER_ROLE_NAME.to_string()),
                    ..Default::default()
                },
                rules: Some(desired_rules),
                ..Default::default()
            };
            api.create(&PostParams::default(), &role).await?;
        }
        Some(mut current) => {
            let current_tuples = rule_tuples(current.rules.as_deref().unwrap_or_default());
            if current_tuples != rule_tuples(&desired_rules) {
                info!(name = CLUSTER_ROLE_NAME, "Updating cluster role rules");
                current.rules = Some(desired_rules);
                api.replace(CLUSTER_ROLE_NAME, &PostParams::default(), &current)
                    .await?;
            } else {
                debug!(name = CLUSTER_ROLE_NAME, "Cluster role rules up to date");
            }
        }
    }

    Ok(())
}

/// Ensure the operand namespace exists.
///
/// # Errors
///
/// Returns an error when an API operation fails.
pub async fn ensure_operand_namespace(client: &Client, config: &OperatorConfig) -> Result<()> {
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(config.operand_namespace.clone()),
            ..Default::default()
        },
        ..Default::default()
    };
    create_cluster_if_absent(client, &namespace).await
}

/// Ensure the per-CR service account, annotating the IAM role ARN when the
/// AWS provider assumes a role through IRSA.
///
/// # Errors
///
/// Returns an error when an API operation fails.
pub async fn ensure_service_account(
    client: &Client,
    config: &OperatorConfig,
    edns: &ExternalDNS,
) -> Result<()> {
    let cr_name = edns.name_any();
    let name = operand_name(&cr_name);

    let irsa_role_arn = match edns.spec.provider.r#type {
        ProviderType::AWS => edns
            .spec
            .provider
            .aws
            .as_ref()
            .and_then(|o| o.assume_role.as_ref())
            .filter(|r| r.strategy == AWSAssumeRoleStrategy::IRSA)
            .map(|r| r.id.clone()),
        _ => None,
    };

    let mut annotations = std::collections::BTreeMap::new();
    if let Some(arn) = &irsa_role_arn {
        annotations.insert(EKS_ROLE_ARN_ANNOTATION.to_string(), arn.clone());
    }

    let service_account = ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(config.operand_namespace.clone()),
            labels: Some(build_labels(&cr_name)),
            annotations: if annotations.is_empty() {
                None
            } else {
                Some(annotations)
            },
            owner_references: Some(build_owner_reference(edns)),
            ..Default::default()
        },
        ..Default::default()
    };

    let api: Api<ServiceAccount> = Api::namespaced(client.clone(), &config.operand_namespace);
    match api.get_opt(&name).await? {
        None => create_if_absent(client, &config.operand_namespace, &service_account).await,
        Some(mut current) => {
            if let Some(arn) = &irsa_role_arn {
                let annotations = current
                    .metadata
                    .annotations
                    .get_or_insert_with(Default::default);
                if annotations.get(EKS_ROLE_ARN_ANNOTATION) != Some(arn) {
                    info!(
                        name = %name,
                        namespace = %config.operand_namespace,
                        "Updating service account role annotation"
                    );
                    annotations.insert(EKS_ROLE_ARN_ANNOTATION.to_string(), arn.clone());
                    api.replace(&name, &PostParams::default(), &current).await?;
                }
            }
            Ok(())
        }
    }
}

/// Ensure the per-CR cluster role binding, reconciling the role-ref name and
/// the subject name and namespace independently.
///
/// # Errors
///
/// Returns an error when an API operation fails.
pub async fn ensure_cluster_role_binding(
    client: &Client,
    config: &OperatorConfig,
    edns: &ExternalDNS,
) -> Result<()> {
    let cr_name = edns.name_any();
    let name = operand_name(&cr_name);
    let api: Api<ClusterRoleBinding> = Api::all(client.clone());

    let desired_subject = Subject {
        kind: "ServiceAccount".to_string(),
        name: name.clone(),
        namespace: Some(config.operand_namespace.clone()),
        ..Default::default()
    };

    match api.get_opt(&name).await? {
        None => {
            info!(name = %name, "Creating cluster role binding");
            let binding = ClusterRoleBinding {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    labels: Some(build_labels(&cr_name)),
                    owner_references: Some(build_owner_reference(edns)),
                    ..Default::default()
                },
                role_ref: RoleRef {
                    api_group: "rbac.authorization.k8s.io".to_string(),
                    kind: "ClusterRole".to_string(),
                    name: CLUSTER_ROLE_NAME.to_string(),
                },
                subjects: Some(vec![desired_subject]),
            };
            api.create(&PostParams::default(), &binding).await?;
            Ok(())
        }
        Some(mut current) => {
            let mut changed = false;

            if current.role_ref.name != CLUSTER_ROLE_NAME {
                current.role_ref.name = CLUSTER_ROLE_NAME.to_string();
                changed = true;
            }

            let subjects = current.subjects.get_or_insert_with(Default::default);
            match subjects.first_mut() {
                Some(subject) => {
                    if subject.name != desired_subject.name {
                        subject.name = desired_subject.name.clone();
                        changed = true;
                    }
                    if subject.namespace != desired_subject.namespace {
                        subject.namespace = desired_subject.namespace.clone();
                        changed = true;
                    }
                }
                None => {
                    subjects.push(desired_subject);
                    changed = true;
                }
            }

            if changed {
                info!(name = %name, "Updating cluster role binding");
                api.replace(&name, &PostParams::default(), &current).await?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "rbac_tests.rs"]
mod rbac_tests;

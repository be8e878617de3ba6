// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of the `ExternalDNS` root resource.
//!
//! One pass drives a CR to its desired state in a fixed order, short-circuiting
//! on the first error: shared cluster role, operand namespace, per-CR service
//! account and cluster role binding, the cloud-credentials request (OpenShift),
//! the credentials secret copy, the operand deployment, and finally the status.
//! A deleted CR is a no-op here; owner references garbage-collect everything
//! derived from it.

use crate::context::Context;
use crate::crd::{Condition, ExternalDNS, ExternalDNSStatus, ProviderType};
use crate::externaldns_resources::{build_deployment, deployment_update, operand_name};
use crate::reconcilers::credentials::reconcile_credentials_secret;
use crate::reconcilers::credentials_request::ensure_credentials_request;
use crate::reconcilers::rbac::{
    ensure_cluster_role, ensure_cluster_role_binding, ensure_operand_namespace,
    ensure_service_account,
};
use crate::reconcilers::status::{
    compute_all_replicas_condition, compute_deployment_available_condition,
    compute_min_replicas_condition, compute_pods_scheduled_condition, create_condition,
    merge_conditions, status_equal, CONDITION_PODS_SCHEDULED,
};
use crate::reconcilers::trusted_ca::reconcile_trusted_ca;
use crate::selector::{format_selector, is_empty};
use anyhow::{Context as _, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ListParams, Patch, PatchParams, PostParams};
use kube::{Api, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Reconcile one `ExternalDNS` resource.
///
/// # Errors
///
/// Returns an error on the first failed step; the controller requeues with
/// backoff. Validation and structural errors (missing source secret, invalid
/// regex) repeat until the user corrects the CR or the cluster.
pub async fn reconcile_externaldns(ctx: Arc<Context>, edns: &ExternalDNS) -> Result<()> {
    let name = edns.name_any();
    debug!(name = %name, "Reconciling ExternalDNS");

    ensure_cluster_role(&ctx.client).await?;
    ensure_operand_namespace(&ctx.client, &ctx.config).await?;
    ensure_service_account(&ctx.client, &ctx.config, edns).await?;
    ensure_cluster_role_binding(&ctx.client, &ctx.config, edns).await?;

    if ctx.config.is_openshift
        && matches!(
            edns.spec.provider.r#type,
            ProviderType::AWS | ProviderType::Azure | ProviderType::GCP
        )
    {
        ensure_credentials_request(&ctx.client, &ctx.config, edns).await?;
    }

    let credentials_secret = reconcile_credentials_secret(&ctx.client, &ctx.config, edns)
        .await
        .with_context(|| format!("credentials for ExternalDNS {name:?}"))?;
    let trusted_ca = reconcile_trusted_ca(&ctx.client, &ctx.config).await?;

    let deployment = ensure_deployment(
        &ctx,
        edns,
        credentials_secret.as_ref(),
        trusted_ca.as_ref(),
    )
    .await?;

    update_status(&ctx, edns, &deployment).await?;

    info!(name = %name, "Reconciled ExternalDNS");
    Ok(())
}

/// Create or semantically update the operand deployment; returns the observed
/// deployment the status computation runs against.
async fn ensure_deployment(
    ctx: &Context,
    edns: &ExternalDNS,
    credentials_secret: Option<&k8s_openapi::api::core::v1::Secret>,
    trusted_ca: Option<&k8s_openapi::api::core::v1::ConfigMap>,
) -> Result<Deployment> {
    let desired = build_deployment(edns, &ctx.config, credentials_secret, trusted_ca)?;
    let name = operand_name(&edns.name_any());
    let api: Api<Deployment> = Api::namespaced(ctx.client.clone(), &ctx.config.operand_namespace);

    match api.get_opt(&name).await? {
        None => {
            info!(
                name = %name,
                namespace = %ctx.config.operand_namespace,
                "Creating operand deployment"
            );
            Ok(api.create(&PostParams::default(), &desired).await?)
        }
        Some(current) => match deployment_update(&current, &desired) {
            Some(updated) => {
                info!(
                    name = %name,
                    namespace = %ctx.config.operand_namespace,
                    "Updating operand deployment"
                );
                Ok(api.replace(&name, &PostParams::default(), &updated).await?)
            }
            None => {
                debug!(name = %name, "Operand deployment up to date");
                Ok(current)
            }
        },
    }
}

/// Compute the four conditions from the observed deployment and merge them
/// into the CR status, skipping the write when nothing changed.
async fn update_status(ctx: &Context, edns: &ExternalDNS, deployment: &Deployment) -> Result<()> {
    let mut conditions = vec![
        compute_deployment_available_condition(deployment),
        compute_min_replicas_condition(deployment),
        compute_all_replicas_condition(deployment),
        pods_scheduled_condition(ctx, deployment).await,
    ];

    let existing = edns.status.clone().unwrap_or_default();
    conditions = merge_conditions(&existing.conditions, conditions);

    let new_status = ExternalDNSStatus {
        conditions,
        observed_generation: edns.metadata.generation,
        zones: Some(edns.spec.zones.clone()),
    };

    if status_equal(&existing, &new_status) {
        debug!(name = %edns.name_any(), "Status unchanged, skipping update");
        return Ok(());
    }

    let api: Api<ExternalDNS> = Api::all(ctx.client.clone());
    api.patch_status(
        &edns.name_any(),
        &PatchParams::default(),
        &Patch::Merge(serde_json::json!({ "status": new_status })),
    )
    .await?;

    Ok(())
}

/// Judge the scheduling state of the pods behind the deployment selector.
///
/// An empty or unexpressible selector, or a failed pod list, yields `Unknown`;
/// everything else is judged from the listed pods.
async fn pods_scheduled_condition(ctx: &Context, deployment: &Deployment) -> Condition {
    let Some(selector) = deployment.spec.as_ref().map(|s| &s.selector) else {
        return create_condition(
            CONDITION_PODS_SCHEDULED,
            "Unknown",
            "NoLabelSelector",
            "The deployment has no label selector",
        );
    };

    if is_empty(selector) {
        return create_condition(
            CONDITION_PODS_SCHEDULED,
            "Unknown",
            "NoLabelSelector",
            "The deployment has an empty label selector",
        );
    }

    let selector_string = match format_selector(selector) {
        Ok(s) => s,
        Err(err) => {
            return create_condition(
                CONDITION_PODS_SCHEDULED,
                "Unknown",
                "InvalidLabelSelector",
                &format!("The deployment label selector is invalid: {err}"),
            );
        }
    };

    let pods: Api<Pod> = Api::namespaced(ctx.client.clone(), &ctx.config.operand_namespace);
    match pods
        .list(&ListParams::default().labels(&selector_string))
        .await
    {
        Ok(list) => compute_pods_scheduled_condition(&list.items),
        Err(err) => create_condition(
            CONDITION_PODS_SCHEDULED,
            "Unknown",
            "PodListFailed",
            &format!("Failed to list pods for the deployment selector: {err}"),
        ),
    }
}

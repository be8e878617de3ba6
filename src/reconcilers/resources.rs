// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic resource creation and update helpers for Kubernetes resources.
//!
//! This module provides reusable functions for creating and updating Kubernetes
//! resources, in namespaced and cluster-scoped flavors. It eliminates duplicate
//! create/update code across reconcilers; reconcilers with bespoke drift rules
//! (RBAC set-equality, secret byte comparison, credentials-request payload
//! decoding) fetch and patch through their own logic instead.

use anyhow::Result;
use kube::api::PostParams;
use kube::core::{ClusterResourceScope, NamespaceResourceScope};
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, info};

/// Create or replace a namespaced resource.
///
/// This function checks if the resource exists. If it does, it replaces the
/// entire resource (carrying over the live `resourceVersion`); otherwise it
/// creates it. The replace strategy suits resources whose content the operator
/// owns wholesale, like the destination credentials secret.
///
/// # Errors
///
/// Returns an error if the resource has no name or an API operation fails.
pub async fn create_or_replace<T>(client: &Client, namespace: &str, resource: &T) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource
        .meta()
        .name
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Resource must have a name"))?;

    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    debug!(
        namespace = %namespace,
        name = %name,
        kind = %T::kind(&()),
        "Creating or replacing resource"
    );

    match api.get(name).await {
        Ok(existing) => {
            let mut replacement = resource.clone();
            replacement.meta_mut().resource_version = existing.resource_version();
            info!("Replacing {} {}/{}", T::kind(&()), namespace, name);
            api.replace(name, &PostParams::default(), &replacement)
                .await?;
        }
        Err(_) => {
            info!("Creating {} {}/{}", T::kind(&()), namespace, name);
            api.create(&PostParams::default(), resource).await?;
        }
    }

    Ok(())
}

/// Create a namespaced resource if it does not already exist.
///
/// # Errors
///
/// Returns an error if the resource has no name or the create fails for a
/// reason other than the resource already existing.
pub async fn create_if_absent<T>(client: &Client, namespace: &str, resource: &T) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource
        .meta()
        .name
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Resource must have a name"))?;

    let api: Api<T> = Api::namespaced(client.clone(), namespace);

    if api.get_opt(name).await?.is_none() {
        info!("Creating {} {}/{}", T::kind(&()), namespace, name);
        api.create(&PostParams::default(), resource).await?;
    }

    Ok(())
}

/// Create a cluster-scoped resource if it does not already exist.
///
/// # Errors
///
/// Returns an error if the resource has no name or the create fails for a
/// reason other than the resource already existing.
pub async fn create_cluster_if_absent<T>(client: &Client, resource: &T) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource
        .meta()
        .name
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Resource must have a name"))?;

    let api: Api<T> = Api::all(client.clone());

    if api.get_opt(name).await?.is_none() {
        info!("Creating {} {}", T::kind(&()), name);
        api.create(&PostParams::default(), resource).await?;
    }

    Ok(())
}

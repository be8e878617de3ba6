// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition computation for `ExternalDNS` resources.
//!
//! After every successful deployment reconcile, four conditions are derived
//! from the observed deployment and its pods and merged into the CR status:
//!
//! - `DeploymentAvailable` - mirror of the deployment's `Available` condition
//! - `DeploymentReplicasMinAvailable` - enough replicas given the rollout strategy
//! - `DeploymentReplicasAllAvailable` - every requested replica is available
//! - `PodsScheduled` - the scheduling state of the pods behind the selector
//!
//! `lastTransitionTime` is preserved for conditions that did not change, and
//! the whole status write is skipped when nothing is structurally different,
//! which keeps the controller out of the status-update hot loop.

use crate::crd::{Condition, ExternalDNSStatus};
use anyhow::{anyhow, Result};
use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

// ============================================================================
// Condition Types
// ============================================================================

/// Mirror of the deployment's `Available` condition
pub const CONDITION_DEPLOYMENT_AVAILABLE: &str = "DeploymentAvailable";

/// Enough replicas are available given the rollout strategy
pub const CONDITION_REPLICAS_MIN_AVAILABLE: &str = "DeploymentReplicasMinAvailable";

/// Every requested replica is available
pub const CONDITION_REPLICAS_ALL_AVAILABLE: &str = "DeploymentReplicasAllAvailable";

/// Scheduling state of the pods behind the deployment selector
pub const CONDITION_PODS_SCHEDULED: &str = "PodsScheduled";

// ============================================================================
// Condition helpers
// ============================================================================

/// Create a new condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Check whether a condition differs from the existing one of the same type.
///
/// The `lastTransitionTime` is not compared; it changes with the condition.
#[must_use]
pub fn condition_changed(existing: Option<&Condition>, new_condition: &Condition) -> bool {
    existing.is_none_or(|current| {
        current.status != new_condition.status
            || current.reason != new_condition.reason
            || current.message != new_condition.message
    })
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Merge freshly computed conditions into an existing set.
///
/// Unchanged conditions keep their original `lastTransitionTime`; changed or
/// new conditions carry the fresh one. Conditions are unique by type and the
/// computed set wins on membership.
#[must_use]
pub fn merge_conditions(existing: &[Condition], computed: Vec<Condition>) -> Vec<Condition> {
    computed
        .into_iter()
        .map(|mut condition| {
            if let Some(current) = find_condition(existing, &condition.r#type) {
                if !condition_changed(Some(current), &condition) {
                    condition.last_transition_time = current.last_transition_time.clone();
                }
            }
            condition
        })
        .collect()
}

/// Structural status equality, used to skip no-op status writes.
///
/// Conditions are compared as a set keyed by type, ignoring transition times;
/// zones are compared as multisets.
#[must_use]
pub fn status_equal(a: &ExternalDNSStatus, b: &ExternalDNSStatus) -> bool {
    if a.observed_generation != b.observed_generation {
        return false;
    }

    let key = |conditions: &[Condition]| {
        conditions
            .iter()
            .map(|c| {
                (
                    c.r#type.clone(),
                    (c.status.clone(), c.reason.clone(), c.message.clone()),
                )
            })
            .collect::<BTreeMap<_, _>>()
    };
    if key(&a.conditions) != key(&b.conditions) {
        return false;
    }

    let sorted = |zones: Option<&Vec<String>>| {
        let mut v = zones.cloned().unwrap_or_default();
        v.sort();
        v
    };
    sorted(a.zones.as_ref()) == sorted(b.zones.as_ref())
}

// ============================================================================
// Condition computation
// ============================================================================

/// Mirror the deployment's `Available` condition; `Unknown` when absent.
#[must_use]
pub fn compute_deployment_available_condition(deployment: &Deployment) -> Condition {
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Available"));

    match available {
        Some(condition) if condition.status == "True" => create_condition(
            CONDITION_DEPLOYMENT_AVAILABLE,
            "True",
            "DeploymentAvailable",
            "The deployment has Available status condition set to True",
        ),
        Some(condition) => create_condition(
            CONDITION_DEPLOYMENT_AVAILABLE,
            &condition.status,
            "DeploymentUnavailable",
            &format!(
                "The deployment has Available status condition set to {}: {}",
                condition.status,
                condition.message.as_deref().unwrap_or("")
            ),
        ),
        None => create_condition(
            CONDITION_DEPLOYMENT_AVAILABLE,
            "Unknown",
            "DeploymentAvailabilityUnknown",
            "The deployment has no Available status condition set",
        ),
    }
}

/// `True` when enough replicas are available given the rolling-update budget.
///
/// `maxUnavailable` and `maxSurge` default to 25% and resolve against
/// `spec.replicas`; when both resolve to zero, one replica may be unavailable.
/// An unparsable value yields `Unknown` naming the offending field.
#[must_use]
pub fn compute_min_replicas_condition(deployment: &Deployment) -> Condition {
    let replicas = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(0);
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);

    let default_budget = IntOrString::String("25%".to_string());
    let rolling_update = deployment
        .spec
        .as_ref()
        .and_then(|s| s.strategy.as_ref())
        .and_then(|s| s.rolling_update.as_ref());
    let max_unavailable_value = rolling_update
        .and_then(|r| r.max_unavailable.as_ref())
        .unwrap_or(&default_budget);
    let max_surge_value = rolling_update
        .and_then(|r| r.max_surge.as_ref())
        .unwrap_or(&default_budget);

    let mut max_unavailable = match resolve_int_or_percent(max_unavailable_value, replicas, false) {
        Ok(value) => value,
        Err(err) => {
            return create_condition(
                CONDITION_REPLICAS_MIN_AVAILABLE,
                "Unknown",
                "InvalidMaxUnavailableValue",
                &format!("invalid value for max unavailable: {err}"),
            );
        }
    };
    let max_surge = match resolve_int_or_percent(max_surge_value, replicas, true) {
        Ok(value) => value,
        Err(err) => {
            return create_condition(
                CONDITION_REPLICAS_MIN_AVAILABLE,
                "Unknown",
                "InvalidMaxSurgeValue",
                &format!("invalid value for max surge: {err}"),
            );
        }
    };

    // Both zero would deadlock a rollout; the apps controller treats it as one.
    if max_unavailable == 0 && max_surge == 0 {
        max_unavailable = 1;
    }

    let threshold = replicas - max_unavailable;
    if available >= threshold {
        create_condition(
            CONDITION_REPLICAS_MIN_AVAILABLE,
            "True",
            "DeploymentMinimumReplicasMet",
            "Minimum replicas requirement is met",
        )
    } else {
        create_condition(
            CONDITION_REPLICAS_MIN_AVAILABLE,
            "False",
            "DeploymentMinimumReplicasNotMet",
            &format!("{available}/{replicas} of replicas are available, need at least {threshold}"),
        )
    }
}

/// `True` when every requested replica is available.
#[must_use]
pub fn compute_all_replicas_condition(deployment: &Deployment) -> Condition {
    let replicas = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(0);
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);

    if available >= replicas {
        create_condition(
            CONDITION_REPLICAS_ALL_AVAILABLE,
            "True",
            "DeploymentReplicasAvailable",
            "All replicas are available",
        )
    } else {
        create_condition(
            CONDITION_REPLICAS_ALL_AVAILABLE,
            "False",
            "DeploymentReplicasNotAvailable",
            &format!("{available}/{replicas} of replicas are available"),
        )
    }
}

/// Derive the `PodsScheduled` condition from the listed pods.
///
/// The caller handles selector and listing failures (`Unknown`); this function
/// judges the scheduling state of the pods it was handed. The message lists
/// unscheduled pods deterministically, ordered by creation timestamp then UID,
/// with a note about worker capacity when the scheduler reported
/// `Unschedulable`.
#[must_use]
pub fn compute_pods_scheduled_condition(pods: &[Pod]) -> Condition {
    if pods.is_empty() {
        return create_condition(
            CONDITION_PODS_SCHEDULED,
            "False",
            "NoLabelMatchingPods",
            "No matching pods found for the deployment label selector",
        );
    }

    let mut sorted: Vec<&Pod> = pods.iter().collect();
    sorted.sort_by_key(|pod| {
        (
            pod.metadata.creation_timestamp.clone().map(|t| t.0),
            pod.metadata.uid.clone(),
        )
    });

    let mut failures = Vec::new();
    let mut unschedulable = false;
    for pod in sorted {
        let scheduled = pod
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conditions| conditions.iter().find(|c| c.type_ == "PodScheduled"));
        if let Some(condition) = scheduled {
            if condition.status != "True" {
                if condition.reason.as_deref() == Some("Unschedulable") {
                    unschedulable = true;
                }
                failures.push(format!(
                    "pod {:?} cannot be scheduled: {}",
                    pod.metadata.name.as_deref().unwrap_or(""),
                    condition.message.as_deref().unwrap_or("")
                ));
            }
        }
    }

    if failures.is_empty() {
        create_condition(
            CONDITION_PODS_SCHEDULED,
            "True",
            "AllPodsScheduled",
            "All pods are scheduled",
        )
    } else {
        let mut message = failures.join(" ");
        if unschedulable {
            message.push_str(" Make sure you have sufficient worker nodes.");
        }
        create_condition(
            CONDITION_PODS_SCHEDULED,
            "False",
            "PodsNotScheduled",
            &message,
        )
    }
}

/// Resolve an integer-or-percentage value against a replica count.
///
/// Percentages round down for unavailability budgets and up for surge budgets,
/// matching the apps controller.
///
/// # Errors
///
/// Returns an error when the string form is not a percentage or its numeric
/// part does not parse.
pub fn resolve_int_or_percent(value: &IntOrString, total: i32, round_up: bool) -> Result<i32> {
    match value {
        IntOrString::Int(i) => Ok(*i),
        IntOrString::String(s) => {
            let digits = s
                .strip_suffix('%')
                .ok_or_else(|| anyhow!("{s:?} is neither an integer nor a percentage"))?;
            let percent: i64 = digits
                .parse()
                .map_err(|_| anyhow!("{s:?} is not a valid percentage"))?;
            let scaled = percent * i64::from(total);
            let resolved = if round_up {
                (scaled + 99) / 100
            } else {
                scaled / 100
            };
            i32::try_from(resolved).map_err(|_| anyhow!("{s:?} of {total} overflows"))
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;

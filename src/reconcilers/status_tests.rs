// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for status condition computation

#[cfg(test)]
mod tests {
    use crate::crd::{Condition, ExternalDNSStatus};
    use crate::reconcilers::status::{
        compute_all_replicas_condition, compute_deployment_available_condition,
        compute_min_replicas_condition, compute_pods_scheduled_condition, create_condition,
        merge_conditions, resolve_int_or_percent, status_equal, CONDITION_DEPLOYMENT_AVAILABLE,
        CONDITION_PODS_SCHEDULED, CONDITION_REPLICAS_ALL_AVAILABLE,
        CONDITION_REPLICAS_MIN_AVAILABLE,
    };
    use k8s_openapi::api::apps::v1::{
        Deployment, DeploymentCondition, DeploymentSpec, DeploymentStatus, DeploymentStrategy,
        RollingUpdateDeployment,
    };
    use k8s_openapi::api::core::v1::{Pod, PodCondition, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
    use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
    use k8s_openapi::jiff::Timestamp;

    fn deployment(replicas: i32, available: i32, max_unavailable: Option<IntOrString>) -> Deployment {
        Deployment {
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                strategy: max_unavailable.map(|value| DeploymentStrategy {
                    rolling_update: Some(RollingUpdateDeployment {
                        max_unavailable: Some(value),
                        max_surge: None,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                available_replicas: Some(available),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn pod(name: &str, scheduled: &str, reason: Option<&str>, timestamp: i64) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                uid: Some(format!("uid-{name}")),
                creation_timestamp: Some(Time(Timestamp::from_second(timestamp).unwrap())),
                ..Default::default()
            },
            status: Some(PodStatus {
                conditions: Some(vec![PodCondition {
                    type_: "PodScheduled".to_string(),
                    status: scheduled.to_string(),
                    reason: reason.map(String::from),
                    message: Some(format!("{name} placement")),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    // ========================================================================
    // DeploymentAvailable
    // ========================================================================

    #[test]
    fn test_available_unknown_when_no_conditions() {
        let condition = compute_deployment_available_condition(&deployment(1, 0, None));
        assert_eq!(condition.r#type, CONDITION_DEPLOYMENT_AVAILABLE);
        assert_eq!(condition.status, "Unknown");
        assert_eq!(
            condition.reason.as_deref(),
            Some("DeploymentAvailabilityUnknown")
        );
    }

    #[test]
    fn test_available_mirrors_deployment_condition() {
        let mut dep = deployment(1, 1, None);
        dep.status.as_mut().unwrap().conditions = Some(vec![DeploymentCondition {
            type_: "Available".to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]);
        let condition = compute_deployment_available_condition(&dep);
        assert_eq!(condition.status, "True");
        assert_eq!(condition.reason.as_deref(), Some("DeploymentAvailable"));

        dep.status.as_mut().unwrap().conditions = Some(vec![DeploymentCondition {
            type_: "Available".to_string(),
            status: "False".to_string(),
            message: Some("MinimumReplicasUnavailable".to_string()),
            ..Default::default()
        }]);
        let condition = compute_deployment_available_condition(&dep);
        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason.as_deref(), Some("DeploymentUnavailable"));
    }

    // ========================================================================
    // DeploymentReplicasMinAvailable
    // ========================================================================

    #[test]
    fn test_min_replicas_boundary() {
        // 8 replicas, 25% unavailable budget => threshold 6
        let met = compute_min_replicas_condition(&deployment(8, 6, None));
        assert_eq!(met.r#type, CONDITION_REPLICAS_MIN_AVAILABLE);
        assert_eq!(met.status, "True");

        let not_met = compute_min_replicas_condition(&deployment(8, 2, None));
        assert_eq!(not_met.status, "False");
        assert!(not_met.message.as_deref().unwrap().contains("2/8"));
    }

    #[test]
    fn test_min_replicas_unparsable_budget() {
        let condition = compute_min_replicas_condition(&deployment(
            8,
            8,
            Some(IntOrString::String("banana".to_string())),
        ));
        assert_eq!(condition.status, "Unknown");
        assert_eq!(
            condition.reason.as_deref(),
            Some("InvalidMaxUnavailableValue")
        );
    }

    #[test]
    fn test_min_replicas_zero_budget_counts_as_one() {
        // maxUnavailable 0 with maxSurge defaulting to 25% of 1 => surge 1,
        // so the explicit zero stands and the threshold is replicas
        let explicit_zero = compute_min_replicas_condition(&deployment(
            1,
            0,
            Some(IntOrString::Int(0)),
        ));
        assert_eq!(explicit_zero.status, "False");

        // both resolving to zero is treated as one unavailable allowed
        let mut dep = deployment(1, 0, Some(IntOrString::Int(0)));
        dep.spec
            .as_mut()
            .unwrap()
            .strategy
            .as_mut()
            .unwrap()
            .rolling_update
            .as_mut()
            .unwrap()
            .max_surge = Some(IntOrString::Int(0));
        let both_zero = compute_min_replicas_condition(&dep);
        assert_eq!(both_zero.status, "True");
    }

    // ========================================================================
    // DeploymentReplicasAllAvailable
    // ========================================================================

    #[test]
    fn test_all_replicas_condition() {
        let all = compute_all_replicas_condition(&deployment(3, 3, None));
        assert_eq!(all.r#type, CONDITION_REPLICAS_ALL_AVAILABLE);
        assert_eq!(all.status, "True");

        let missing = compute_all_replicas_condition(&deployment(3, 2, None));
        assert_eq!(missing.status, "False");
        assert!(missing.message.as_deref().unwrap().contains("2/3"));
    }

    // ========================================================================
    // PodsScheduled
    // ========================================================================

    #[test]
    fn test_pods_scheduled_no_pods() {
        let condition = compute_pods_scheduled_condition(&[]);
        assert_eq!(condition.r#type, CONDITION_PODS_SCHEDULED);
        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason.as_deref(), Some("NoLabelMatchingPods"));
    }

    #[test]
    fn test_pods_scheduled_all_placed() {
        let pods = vec![pod("a", "True", None, 1), pod("b", "True", None, 2)];
        let condition = compute_pods_scheduled_condition(&pods);
        assert_eq!(condition.status, "True");
        assert_eq!(condition.reason.as_deref(), Some("AllPodsScheduled"));
    }

    #[test]
    fn test_pods_scheduled_deterministic_message_order() {
        // listed out of creation order; message must sort by timestamp
        let pods = vec![
            pod("younger", "False", None, 20),
            pod("older", "False", None, 10),
        ];
        let condition = compute_pods_scheduled_condition(&pods);
        assert_eq!(condition.status, "False");
        let message = condition.message.unwrap();
        let older_at = message.find("older").unwrap();
        let younger_at = message.find("younger").unwrap();
        assert!(older_at < younger_at, "unexpected order: {message}");
        assert!(!message.contains("sufficient worker nodes"));
    }

    #[test]
    fn test_pods_scheduled_unschedulable_note() {
        let pods = vec![pod("a", "False", Some("Unschedulable"), 1)];
        let condition = compute_pods_scheduled_condition(&pods);
        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason.as_deref(), Some("PodsNotScheduled"));
        assert!(condition
            .message
            .unwrap()
            .contains("sufficient worker nodes"));
    }

    // ========================================================================
    // IntOrString resolution
    // ========================================================================

    #[test]
    fn test_int_or_percent_rounding() {
        let quarter = IntOrString::String("25%".to_string());
        // unavailability budgets round down, surge budgets round up
        assert_eq!(resolve_int_or_percent(&quarter, 8, false).unwrap(), 2);
        assert_eq!(resolve_int_or_percent(&quarter, 10, false).unwrap(), 2);
        assert_eq!(resolve_int_or_percent(&quarter, 10, true).unwrap(), 3);
        assert_eq!(
            resolve_int_or_percent(&IntOrString::Int(4), 8, false).unwrap(),
            4
        );
    }

    #[test]
    fn test_int_or_percent_rejects_garbage() {
        assert!(resolve_int_or_percent(&IntOrString::String("25".to_string()), 8, false).is_err());
        assert!(
            resolve_int_or_percent(&IntOrString::String("x%".to_string()), 8, false).is_err()
        );
    }

    // ========================================================================
    // Merging & equality
    // ========================================================================

    #[test]
    fn test_merge_preserves_transition_time_when_unchanged() {
        let mut original = create_condition(CONDITION_DEPLOYMENT_AVAILABLE, "True", "R", "M");
        original.last_transition_time = Some("2024-01-01T00:00:00+00:00".to_string());

        let recomputed = create_condition(CONDITION_DEPLOYMENT_AVAILABLE, "True", "R", "M");
        let merged = merge_conditions(std::slice::from_ref(&original), vec![recomputed]);
        assert_eq!(
            merged[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );

        let flipped = create_condition(CONDITION_DEPLOYMENT_AVAILABLE, "False", "R", "M");
        let merged = merge_conditions(std::slice::from_ref(&original), vec![flipped]);
        assert_ne!(
            merged[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_status_equality_ignores_transition_time_and_zone_order() {
        let condition = |time: &str| Condition {
            r#type: CONDITION_DEPLOYMENT_AVAILABLE.to_string(),
            status: "True".to_string(),
            reason: Some("R".to_string()),
            message: Some("M".to_string()),
            last_transition_time: Some(time.to_string()),
        };

        let a = ExternalDNSStatus {
            conditions: vec![condition("2024-01-01T00:00:00+00:00")],
            observed_generation: Some(2),
            zones: Some(vec!["Z1".to_string(), "Z2".to_string()]),
        };
        let b = ExternalDNSStatus {
            conditions: vec![condition("2025-06-30T00:00:00+00:00")],
            observed_generation: Some(2),
            zones: Some(vec!["Z2".to_string(), "Z1".to_string()]),
        };
        assert!(status_equal(&a, &b));

        let different_generation = ExternalDNSStatus {
            observed_generation: Some(3),
            ..b.clone()
        };
        assert!(!status_equal(&a, &different_generation));

        let different_status = ExternalDNSStatus {
            conditions: vec![Condition {
                status: "False".to_string(),
                ..condition("2024-01-01T00:00:00+00:00")
            }],
            ..a.clone()
        };
        assert!(!status_equal(&a, &different_status));
    }
}

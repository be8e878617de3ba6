// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for RBAC rule comparison

#[cfg(test)]
mod tests {
    use crate::reconcilers::rbac::{desired_policy_rules, rule_tuples};
    use k8s_openapi::api::rbac::v1::PolicyRule;

    #[test]
    fn test_desired_rules_cover_sources() {
        let tuples = rule_tuples(&desired_policy_rules());
        for resource in ["endpoints", "services", "pods", "nodes"] {
            for verb in ["get", "list", "watch"] {
                assert!(
                    tuples.contains(&(String::new(), resource.to_string(), verb.to_string())),
                    "missing core/{resource} {verb}"
                );
            }
        }
        assert!(tuples.contains(&(
            "networking.k8s.io".to_string(),
            "ingresses".to_string(),
            "watch".to_string()
        )));
    }

    #[test]
    fn test_rule_equality_ignores_ordering() {
        // the same grants, verbs and resources shuffled and split differently
        let reordered = vec![
            PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["nodes".to_string(), "pods".to_string()]),
                verbs: vec!["watch".to_string(), "get".to_string(), "list".to_string()],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["services".to_string(), "endpoints".to_string()]),
                verbs: vec!["list".to_string(), "watch".to_string(), "get".to_string()],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["networking.k8s.io".to_string()]),
                resources: Some(vec!["ingresses".to_string()]),
                verbs: vec!["list".to_string(), "get".to_string(), "watch".to_string()],
                ..Default::default()
            },
        ];

        assert_eq!(rule_tuples(&reordered), rule_tuples(&desired_policy_rules()));
    }

    #[test]
    fn test_rule_equality_detects_missing_verb() {
        let narrowed = vec![PolicyRule {
            api_groups: Some(vec![String::new()]),
            resources: Some(vec![
                "endpoints".to_string(),
                "services".to_string(),
                "pods".to_string(),
                "nodes".to_string(),
            ]),
            verbs: vec!["get".to_string(), "list".to_string()],
            ..Default::default()
        }];

        assert_ne!(rule_tuples(&narrowed), rule_tuples(&desired_policy_rules()));
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `selector`

#[cfg(test)]
mod tests {
    use crate::selector::{format_selector, is_empty};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
        LabelSelector, LabelSelectorRequirement,
    };
    use std::collections::BTreeMap;

    fn labels(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_match_labels_render_in_key_order() {
        let selector = LabelSelector {
            match_labels: Some(labels(&[("b", "2"), ("a", "1")])),
            match_expressions: None,
        };
        assert_eq!(format_selector(&selector).unwrap(), "a=1,b=2");
    }

    #[test]
    fn test_expressions_render_with_sorted_values() {
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![
                LabelSelectorRequirement {
                    key: "env".to_string(),
                    operator: "In".to_string(),
                    values: Some(vec!["prod".to_string(), "dev".to_string()]),
                },
                LabelSelectorRequirement {
                    key: "tier".to_string(),
                    operator: "NotIn".to_string(),
                    values: Some(vec!["cache".to_string()]),
                },
                LabelSelectorRequirement {
                    key: "owner".to_string(),
                    operator: "Exists".to_string(),
                    values: None,
                },
                LabelSelectorRequirement {
                    key: "legacy".to_string(),
                    operator: "DoesNotExist".to_string(),
                    values: None,
                },
            ]),
        };
        assert_eq!(
            format_selector(&selector).unwrap(),
            "env in (dev,prod),tier notin (cache),owner,!legacy"
        );
    }

    #[test]
    fn test_in_requires_values() {
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "env".to_string(),
                operator: "In".to_string(),
                values: None,
            }]),
        };
        assert!(format_selector(&selector).is_err());
    }

    #[test]
    fn test_exists_forbids_values() {
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "env".to_string(),
                operator: "Exists".to_string(),
                values: Some(vec!["prod".to_string()]),
            }]),
        };
        assert!(format_selector(&selector).is_err());
    }

    #[test]
    fn test_unknown_operator_is_rejected() {
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "env".to_string(),
                operator: "Matches".to_string(),
                values: None,
            }]),
        };
        assert!(format_selector(&selector).is_err());
    }

    #[test]
    fn test_empty_selector() {
        let selector = LabelSelector::default();
        assert!(is_empty(&selector));
        assert_eq!(format_selector(&selector).unwrap(), "");

        let non_empty = LabelSelector {
            match_labels: Some(labels(&[("a", "1")])),
            match_expressions: None,
        };
        assert!(!is_empty(&non_empty));
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label selector serialization.
//!
//! The operand takes label and annotation filters as a single selector string
//! (`--label-filter=...`), and the status reconciler lists pods with the same
//! string form of the deployment selector. This module renders a
//! `LabelSelector` into the canonical `key=value,key in (a,b)` syntax and
//! rejects selectors that are not expressible.

use anyhow::{bail, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

/// Render a `LabelSelector` in canonical string form.
///
/// `matchLabels` entries render as `key=value` in key order; `matchExpressions`
/// follow in declared order with their values sorted, so the output is
/// deterministic for a given selector. An empty selector renders as the empty
/// string (which matches everything when used as a list filter).
///
/// # Errors
///
/// Returns an error when an expression carries an unknown operator, or when
/// its values are inconsistent with the operator (`In`/`NotIn` require values,
/// `Exists`/`DoesNotExist` forbid them).
pub fn format_selector(selector: &LabelSelector) -> Result<String> {
    let mut terms = Vec::new();

    if let Some(labels) = &selector.match_labels {
        for (key, value) in labels {
            terms.push(format!("{key}={value}"));
        }
    }

    if let Some(expressions) = &selector.match_expressions {
        for expr in expressions {
            let mut values = expr.values.clone().unwrap_or_default();
            values.sort();
            match expr.operator.as_str() {
                "In" | "NotIn" => {
                    if values.is_empty() {
                        bail!(
                            "selector expression on {:?} with operator {} requires values",
                            expr.key,
                            expr.operator
                        );
                    }
                    let op = if expr.operator == "In" { "in" } else { "notin" };
                    terms.push(format!("{} {} ({})", expr.key, op, values.join(",")));
                }
                "Exists" | "DoesNotExist" => {
                    if !values.is_empty() {
                        bail!(
                            "selector expression on {:?} with operator {} must not carry values",
                            expr.key,
                            expr.operator
                        );
                    }
                    if expr.operator == "Exists" {
                        terms.push(expr.key.clone());
                    } else {
                        terms.push(format!("!{}", expr.key));
                    }
                }
                other => bail!("unknown selector operator {other:?} on key {:?}", expr.key),
            }
        }
    }

    Ok(terms.join(","))
}

/// Whether a selector selects nothing in particular (no terms at all).
#[must_use]
pub fn is_empty(selector: &LabelSelector) -> bool {
    selector
        .match_labels
        .as_ref()
        .is_none_or(std::collections::BTreeMap::is_empty)
        && selector
            .match_expressions
            .as_ref()
            .is_none_or(Vec::is_empty)
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;

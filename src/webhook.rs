// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Synchronous admission validation for `ExternalDNS` resources.
//!
//! Create and update requests are validated against the invariants the
//! reconcilers rely on; delete requests are always admitted. Violations are
//! aggregated so one rejection lists everything wrong with the CR instead of
//! surfacing one error per apply.
//!
//! The webhook receives the operator configuration through the shared
//! [`Context`]; in particular `is-openshift` relaxes the credentials-presence
//! rules for the cloud providers, whose secrets the cloud-credentials
//! subsystem supplies.

use crate::context::Context;
use crate::crd::{
    DomainMatchType, ExternalDNS, ExternalDNSSpec, HostnameAnnotationPolicy, ProviderType,
    SourceType,
};
use axum::extract::State;
use axum::Json;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use std::sync::Arc;
use tracing::{debug, warn};

/// Validate an `ExternalDNS` spec against the operator configuration.
///
/// # Errors
///
/// Returns the aggregated list of violations.
pub fn validate_external_dns(
    spec: &ExternalDNSSpec,
    is_openshift: bool,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    errors.extend(validate_domains(spec));
    errors.extend(validate_hostname_policy(spec));
    errors.extend(validate_provider(spec, is_openshift));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Every domain filter must carry a usable name or a compilable pattern.
fn validate_domains(spec: &ExternalDNSSpec) -> Vec<String> {
    let mut errors = Vec::new();
    for (index, filter) in spec.domains.as_deref().unwrap_or_default().iter().enumerate() {
        match filter.match_type {
            DomainMatchType::Exact => {
                if filter.name.as_deref().unwrap_or_default().is_empty() {
                    errors.push(format!("domains[{index}]: exact filter requires a non-empty name"));
                }
            }
            DomainMatchType::Regex => match filter.pattern.as_deref() {
                None | Some("") => {
                    errors.push(format!("domains[{index}]: regex filter requires a pattern"));
                }
                Some(pattern) => {
                    if let Err(err) = regex::Regex::new(pattern) {
                        errors.push(format!(
                            "domains[{index}]: pattern {pattern:?} does not compile: {err}"
                        ));
                    }
                }
            },
        }
    }
    errors
}

/// Ignoring the hostname annotation leaves templates as the only hostname
/// source, so they must exist. Routes are exempt: they synthesize hostnames.
fn validate_hostname_policy(spec: &ExternalDNSSpec) -> Vec<String> {
    let source = &spec.source;
    let templates_empty = source
        .fqdn_templates
        .as_deref()
        .unwrap_or_default()
        .is_empty();

    if source.hostname_policy == HostnameAnnotationPolicy::Ignore
        && templates_empty
        && source.r#type != SourceType::OpenShiftRoute
    {
        vec![
            "source: fqdnTemplates must not be empty when the hostname annotation is ignored"
                .to_string(),
        ]
    } else {
        Vec::new()
    }
}

/// Provider options must match the provider tag, and credentials must be
/// present where nothing else can supply them.
fn validate_provider(spec: &ExternalDNSSpec, is_openshift: bool) -> Vec<String> {
    let mut errors = Vec::new();
    let provider = &spec.provider;

    match provider.r#type {
        ProviderType::AWS => {
            let has_credentials = provider
                .aws
                .as_ref()
                .and_then(|o| o.credentials.as_ref())
                .is_some_and(|c| !c.name.is_empty());
            if !has_credentials && !is_openshift {
                errors.push("provider.aws: credentials secret is required".to_string());
            }
        }
        ProviderType::Azure => {
            let has_config = provider
                .azure
                .as_ref()
                .is_some_and(|o| !o.config_file.name.is_empty());
            if !has_config && !is_openshift {
                errors.push("provider.azure: configFile secret is required".to_string());
            }
        }
        ProviderType::GCP => {
            let has_credentials = provider
                .gcp
                .as_ref()
                .and_then(|o| o.credentials.as_ref())
                .is_some_and(|c| !c.name.is_empty());
            if !has_credentials && !is_openshift {
                errors.push("provider.gcp: credentials secret is required".to_string());
            }
        }
        ProviderType::BlueCat => {
            let has_config = provider
                .bluecat
                .as_ref()
                .is_some_and(|o| !o.config_file.name.is_empty());
            if !has_config {
                errors.push("provider.bluecat: configFile secret is required".to_string());
            }
        }
        ProviderType::Infoblox => match provider.infoblox.as_ref() {
            None => errors.push("provider.infoblox: options are required".to_string()),
            Some(options) => {
                if options.credentials.name.is_empty() {
                    errors.push("provider.infoblox: credentials secret is required".to_string());
                }
                if options.wapi_port <= 0 {
                    errors.push("provider.infoblox: wapiPort must be non-zero".to_string());
                }
                if options.grid_host.is_empty() {
                    errors.push("provider.infoblox: gridHost must not be empty".to_string());
                }
            }
        },
    }

    errors
}

/// Axum handler for the `ExternalDNS` validating webhook.
///
/// Always answers with an `AdmissionReview`; malformed reviews are rejected as
/// invalid rather than dropped, so the API server gets a verdict either way.
pub async fn validate_handler(
    State(ctx): State<Arc<Context>>,
    Json(review): Json<AdmissionReview<ExternalDNS>>,
) -> Json<AdmissionReview<DynamicObject>> {
    let request: AdmissionRequest<ExternalDNS> = match review.try_into() {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "Malformed admission review");
            return Json(AdmissionResponse::invalid(err.to_string()).into_review());
        }
    };

    let mut response = AdmissionResponse::from(&request);

    if request.operation != Operation::Delete {
        if let Some(edns) = &request.object {
            debug!(name = %edns.metadata.name.as_deref().unwrap_or(""), "Validating ExternalDNS");
            if let Err(errors) = validate_external_dns(&edns.spec, ctx.config.is_openshift) {
                response = response.deny(errors.join("; "));
            }
        }
    }

    crate::metrics::record_admission(response.allowed);
    Json(response.into_review())
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod webhook_tests;

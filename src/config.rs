// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration supplied by the embedding process.
//!
//! Everything the reconcilers and the webhook need to know about the cluster
//! they run in is parsed here and threaded explicitly through the shared
//! [`crate::context::Context`]. Nothing in this crate reads process-wide
//! mutable state after startup, and the operator never probes the API server
//! to detect the platform: `--is-openshift` is authoritative.

use clap::Parser;

use crate::constants::{METRICS_SERVER_PORT, WEBHOOK_SERVER_PORT};

/// Command-line and environment configuration for the operator process.
#[derive(Parser, Clone, Debug)]
#[command(name = "extdns", about = "ExternalDNS lifecycle operator for Kubernetes")]
pub struct OperatorConfig {
    /// Namespace the operand deployments are created in.
    #[arg(long, env = "EXTDNS_OPERAND_NAMESPACE", default_value = "external-dns")]
    pub operand_namespace: String,

    /// Namespace the operator runs in; source credentials secrets and
    /// credentials requests live here.
    #[arg(
        long,
        env = "EXTDNS_OPERATOR_NAMESPACE",
        default_value = "external-dns-operator"
    )]
    pub operator_namespace: String,

    /// Container image for the ExternalDNS operand.
    #[arg(
        long,
        env = "EXTDNS_OPERAND_IMAGE",
        default_value = "registry.k8s.io/external-dns/external-dns:v0.14.2"
    )]
    pub operand_image: String,

    /// Service account under which the operator itself runs; listed on every
    /// credentials request so the platform grants it read access to the
    /// minted secret.
    #[arg(
        long,
        env = "EXTDNS_OPERATOR_SERVICE_ACCOUNT",
        default_value = "extdns-operator"
    )]
    pub operator_service_account: String,

    /// Whether the cluster is OpenShift. Enables the credentials-request
    /// reconciler and platform-issued secret sourcing.
    #[arg(long, env = "EXTDNS_IS_OPENSHIFT", default_value_t = false)]
    pub is_openshift: bool,

    /// GCP project reported by the platform, used when the CR does not set one.
    #[arg(long, env = "EXTDNS_PLATFORM_GCP_PROJECT")]
    pub gcp_project: Option<String>,

    /// AWS region reported by the platform; GovCloud regions switch the
    /// Route53 ARN prefix in the credentials request.
    #[arg(long, env = "EXTDNS_PLATFORM_AWS_REGION")]
    pub aws_region: Option<String>,

    /// Name of a configmap in the operator namespace holding a trusted CA
    /// bundle; when set, the bundle is replicated into the operand namespace
    /// and mounted into every operand container.
    #[arg(long, env = "EXTDNS_TRUSTED_CA_CONFIGMAP")]
    pub trusted_ca_configmap: Option<String>,

    /// Listen port for the Prometheus metrics server.
    #[arg(long, env = "EXTDNS_METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Listen port for the admission webhook server.
    #[arg(long, env = "EXTDNS_WEBHOOK_PORT", default_value_t = WEBHOOK_SERVER_PORT)]
    pub webhook_port: u16,
}

impl OperatorConfig {
    /// Whether trusted-CA injection is enabled.
    #[must_use]
    pub fn inject_trusted_ca(&self) -> bool {
        self.trusted_ca_configmap.is_some()
    }

    /// Whether the platform reported a GovCloud AWS region.
    #[must_use]
    pub fn is_gov_cloud(&self) -> bool {
        self.aws_region
            .as_deref()
            .is_some_and(|region| region.starts_with("us-gov"))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;

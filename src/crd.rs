// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for ExternalDNS lifecycle management.
//!
//! This module defines the cluster-scoped `ExternalDNS` resource through which a
//! user declares which DNS provider to publish to, which Kubernetes objects to
//! source hostnames from, and which zones and domains are in play. The operator
//! reconciles every `ExternalDNS` into a running deployment of the ExternalDNS
//! binary plus the RBAC, service account and credentials it needs.
//!
//! # Resource Types
//!
//! - [`ExternalDNS`] - Desired state of one ExternalDNS operand
//!
//! # Example: Publishing LoadBalancer Services to Route53
//!
//! ```yaml
//! apiVersion: extdns.firestoned.io/v1beta1
//! kind: ExternalDNS
//! metadata:
//!   name: aws-public
//! spec:
//!   provider:
//!     type: AWS
//!     aws:
//!       credentials:
//!         name: route53-credentials
//!   source:
//!     type: Service
//!     service:
//!       serviceTypes:
//!         - LoadBalancer
//!   zones:
//!     - Z05387772BD5723IZFRX3
//! ```

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `ExternalDNS` describes one managed deployment of the ExternalDNS binary.
///
/// The resource is cluster-scoped: the operand always runs in the configured
/// operand namespace, and every derived resource name is a deterministic
/// function of `metadata.name`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "extdns.firestoned.io",
    version = "v1beta1",
    kind = "ExternalDNS",
    plural = "externaldnses",
    shortname = "edns",
    doc = "ExternalDNS declares a managed ExternalDNS workload: a DNS provider to publish to, a Kubernetes source to watch, and the zones and domain filters that scope publication.",
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".spec.provider.type"}"#,
    printcolumn = r#"{"name":"Source","type":"string","jsonPath":".spec.source.type"}"#,
    printcolumn = r#"{"name":"Available","type":"string","jsonPath":".status.conditions[?(@.type=='DeploymentAvailable')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "ExternalDNSStatus")]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSSpec {
    /// DNS provider to publish records to, with provider-specific options.
    pub provider: ProviderConfig,

    /// Kubernetes objects to derive DNS records from.
    pub source: SourceConfig,

    /// Provider-specific zone identifiers to publish into, one operand
    /// container per zone. Empty means "publish everywhere the provider
    /// credentials can reach".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,

    /// Domain filters restricting which hostnames are published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<DomainFilter>>,
}

// ============================================================================
// Provider
// ============================================================================

/// Discriminator for the supported DNS providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ProviderType {
    /// AWS Route53
    AWS,
    /// Azure DNS and Azure Private DNS
    Azure,
    /// Google Cloud DNS
    GCP,
    /// BlueCat DNS Integrity
    BlueCat,
    /// Infoblox NIOS (WAPI)
    Infoblox,
}

impl ProviderType {
    /// Lowercase provider tag used in derived resource names.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ProviderType::AWS => "aws",
            ProviderType::Azure => "azure",
            ProviderType::GCP => "gcp",
            ProviderType::BlueCat => "bluecat",
            ProviderType::Infoblox => "infoblox",
        }
    }

    /// Value of the operand's `--provider` flag.
    ///
    /// The operand names the Google provider `google`, not `gcp`; for Azure the
    /// flag may further be rewritten per-zone to `azure-private-dns`.
    #[must_use]
    pub fn operand_arg(&self) -> &'static str {
        match self {
            ProviderType::AWS => "aws",
            ProviderType::Azure => "azure",
            ProviderType::GCP => "google",
            ProviderType::BlueCat => "bluecat",
            ProviderType::Infoblox => "infoblox",
        }
    }

    /// Whether the provider API client honors the cluster-wide HTTP(S) proxy.
    ///
    /// Cloud provider endpoints are reached through the proxy; BlueCat and
    /// Infoblox gateways sit on the local network and are dialed directly.
    #[must_use]
    pub fn supports_proxy(&self) -> bool {
        matches!(
            self,
            ProviderType::AWS | ProviderType::Azure | ProviderType::GCP
        )
    }
}

/// Provider selection plus the options payload for the selected provider.
///
/// This is a Kubernetes-style discriminated union: `type` names the variant
/// and exactly the matching options field is expected to be set.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Which DNS provider to publish to.
    pub r#type: ProviderType,

    /// AWS Route53 options. Only consulted when `type` is `AWS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AWSProviderOptions>,

    /// Azure DNS options. Only consulted when `type` is `Azure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureProviderOptions>,

    /// Google Cloud DNS options. Only consulted when `type` is `GCP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GCPProviderOptions>,

    /// BlueCat options. Only consulted when `type` is `BlueCat`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bluecat: Option<BlueCatProviderOptions>,

    /// Infoblox options. Only consulted when `type` is `Infoblox`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infoblox: Option<InfobloxProviderOptions>,
}

impl ProviderConfig {
    /// Name of the user-declared credentials secret for this provider, if any.
    ///
    /// AWS/GCP/Infoblox call the reference `credentials`; Azure/BlueCat carry a
    /// whole provider config file and call it `configFile`.
    #[must_use]
    pub fn declared_secret_name(&self) -> Option<&str> {
        match self.r#type {
            ProviderType::AWS => self
                .aws
                .as_ref()
                .and_then(|o| o.credentials.as_ref())
                .map(|c| c.name.as_str()),
            ProviderType::Azure => self.azure.as_ref().map(|o| o.config_file.name.as_str()),
            ProviderType::GCP => self
                .gcp
                .as_ref()
                .and_then(|o| o.credentials.as_ref())
                .map(|c| c.name.as_str()),
            ProviderType::BlueCat => self.bluecat.as_ref().map(|o| o.config_file.name.as_str()),
            ProviderType::Infoblox => self
                .infoblox
                .as_ref()
                .map(|o| o.credentials.name.as_str()),
        }
    }
}

/// Reference to a secret by name, resolved in the operator namespace.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Name of the secret.
    pub name: String,
}

/// Strategy used to let the operand assume an IAM role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AWSAssumeRoleStrategy {
    /// IAM Roles for Service Accounts: the role ARN is annotated onto the
    /// operand service account and the token is projected by the platform.
    IRSA,
}

/// Role assumption options for the AWS provider.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AWSAssumeRoleOptions {
    /// How the role is assumed.
    pub strategy: AWSAssumeRoleStrategy,

    /// ARN of the role to assume.
    pub id: String,
}

/// Options for publishing to AWS Route53.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AWSProviderOptions {
    /// Static credentials secret holding `aws_access_key_id` and
    /// `aws_secret_access_key`. Optional on OpenShift, where the
    /// cloud-credentials subsystem mints a secret instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SecretReference>,

    /// Optional role assumption configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assume_role: Option<AWSAssumeRoleOptions>,
}

/// Options for publishing to Azure DNS.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureProviderOptions {
    /// Secret holding the serialized `azure.json` provider configuration.
    pub config_file: SecretReference,
}

/// Options for publishing to Google Cloud DNS.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GCPProviderOptions {
    /// Service-account credentials secret holding `gcp-credentials.json`.
    /// Optional on OpenShift, where the cloud-credentials subsystem mints a
    /// secret instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SecretReference>,

    /// Project to publish into. Defaults to the platform project on OpenShift.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// Options for publishing through a BlueCat DNS Integrity gateway.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlueCatProviderOptions {
    /// Secret holding the serialized `bluecat.json` gateway configuration.
    pub config_file: SecretReference,
}

/// Options for publishing through an Infoblox NIOS grid.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfobloxProviderOptions {
    /// Secret holding `EXTERNAL_DNS_INFOBLOX_WAPI_USERNAME` and
    /// `EXTERNAL_DNS_INFOBLOX_WAPI_PASSWORD`.
    pub credentials: SecretReference,

    /// WAPI version to speak, e.g. "2.3.1".
    pub wapi_version: String,

    /// WAPI port on the grid host. Must be non-zero.
    pub wapi_port: i64,

    /// DNS name or IP of the grid master.
    pub grid_host: String,
}

// ============================================================================
// Source
// ============================================================================

/// Discriminator for the supported hostname sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SourceType {
    /// Kubernetes `Service` objects.
    Service,
    /// OpenShift `Route` objects.
    OpenShiftRoute,
}

impl SourceType {
    /// Value of the operand's `--source` flag.
    #[must_use]
    pub fn operand_arg(&self) -> &'static str {
        match self {
            SourceType::Service => "service",
            SourceType::OpenShiftRoute => "openshift-route",
        }
    }
}

/// Whether the operand honors the `external-dns.alpha.kubernetes.io/hostname`
/// annotation on source objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum HostnameAnnotationPolicy {
    /// Hostnames from the annotation are published.
    #[default]
    Allow,
    /// The annotation is ignored; hostnames come from FQDN templates.
    Ignore,
}

/// Source selection plus the options payload for the selected source.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Which Kubernetes objects to derive hostnames from.
    pub r#type: SourceType,

    /// Hostname annotation handling. Defaults to `Allow`.
    #[serde(default)]
    pub hostname_policy: HostnameAnnotationPolicy,

    /// Ordered Go templates expanding a source object into FQDNs,
    /// e.g. `{{.Name}}.example.com`. Required when the hostname annotation is
    /// ignored on a non-Route source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn_templates: Option<Vec<String>>,

    /// Only source objects matching this label selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_filter: Option<LabelSelector>,

    /// Only source objects matching this annotation selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_filter: Option<LabelSelector>,

    /// Only source objects in this namespace. Empty means all namespaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Service source options. Only consulted when `type` is `Service`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSourceOptions>,

    /// Route source options. Only consulted when `type` is `OpenShiftRoute`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openshift_route: Option<RouteSourceOptions>,
}

/// Kubernetes service types the operand may publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ServiceType {
    /// Services exposed through a cloud load balancer.
    LoadBalancer,
    /// Cluster-internal services; implies `--publish-internal-services`.
    ClusterIP,
    /// Services exposed on node ports.
    NodePort,
    /// DNS-aliased services.
    ExternalName,
}

impl ServiceType {
    /// Value of the operand's `--service-type-filter` flag.
    #[must_use]
    pub fn operand_arg(&self) -> &'static str {
        match self {
            ServiceType::LoadBalancer => "LoadBalancer",
            ServiceType::ClusterIP => "ClusterIP",
            ServiceType::NodePort => "NodePort",
            ServiceType::ExternalName => "ExternalName",
        }
    }
}

/// Options for the `Service` source.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSourceOptions {
    /// Service types to include. Must be non-empty.
    pub service_types: Vec<ServiceType>,
}

/// Options for the `OpenShiftRoute` source.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteSourceOptions {
    /// Router whose canonical hostname is used for published records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_name: Option<String>,
}

// ============================================================================
// Domain Filters
// ============================================================================

/// Whether a domain filter includes or excludes matching names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DomainFilterType {
    /// Matching names are published.
    Include,
    /// Matching names are withheld.
    Exclude,
}

/// How a domain filter matches names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DomainMatchType {
    /// Match the exact domain in `name`.
    Exact,
    /// Match names against the regular expression in `pattern`.
    Regex,
}

/// One entry of the domain filter list.
///
/// Exact filters carry `name`; regex filters carry `pattern`. All include
/// patterns are combined into one alternation for the operand, as are all
/// exclude patterns.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainFilter {
    /// Include or exclude matching names.
    pub filter_type: DomainFilterType,

    /// Exact or regex matching.
    pub match_type: DomainMatchType,

    /// Domain name for `Exact` matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Regular expression for `Regex` matching. Must compile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

// ============================================================================
// Status
// ============================================================================

/// Condition represents an observation of the operand's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition: `DeploymentAvailable`, `DeploymentReplicasMinAvailable`,
    /// `DeploymentReplicasAllAvailable` or `PodsScheduled`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Observed state of an `ExternalDNS` resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDNSStatus {
    /// Conditions derived from the operand deployment, unique by type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Generation of the spec most recently reconciled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Zones observed at the last reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the extdns operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the ExternalDNS CRD
pub const API_GROUP: &str = "extdns.firestoned.io";

/// API version for the ExternalDNS CRD
pub const API_VERSION: &str = "v1beta1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "extdns.firestoned.io/v1beta1";

/// Kind name for the `ExternalDNS` resource
pub const KIND_EXTERNAL_DNS: &str = "ExternalDNS";

// ============================================================================
// Derived Resource Names
// ============================================================================

/// Name of the shared cluster role bound to every operand service account.
/// The role is written by all CRs and never deleted by the operator.
pub const CLUSTER_ROLE_NAME: &str = "external-dns";

/// Prefix for all per-CR derived resource names (service account, cluster
/// role binding, deployment, TXT owner id)
pub const OPERAND_NAME_PREFIX: &str = "external-dns-";

/// Prefix for the destination credentials secret in the operand namespace
pub const CREDENTIALS_SECRET_PREFIX: &str = "external-dns-credentials-";

/// Prefix for the per-provider `CredentialsRequest` name
pub const CREDENTIALS_REQUEST_PREFIX: &str = "externaldns-credentials-request-";

/// Name of the secret the cloud-credentials subsystem mints in the operator
/// namespace on OpenShift clusters
pub const PLATFORM_CREDENTIALS_SECRET: &str = "externaldns-cloud-credentials";

/// Name of the trusted-CA bundle configmap replicated into the operand namespace
pub const TRUSTED_CA_CONFIGMAP_NAME: &str = "external-dns-trusted-ca";

// ============================================================================
// Operand Container Constants
// ============================================================================

/// First metrics port handed to an operand container; the i-th container
/// listens on `METRICS_BASE_PORT + i` so every endpoint is unique in the pod
pub const METRICS_BASE_PORT: u16 = 7979;

/// TXT registry record prefix emitted for every provider
pub const TXT_RECORD_PREFIX: &str = "external-dns-";

/// Mount directory for provider credential files
pub const CREDENTIALS_DIR: &str = "/etc/kubernetes";

/// Azure configuration file path inside the operand container
pub const AZURE_CONFIG_FILE: &str = "/etc/kubernetes/azure.json";

/// BlueCat configuration file path inside the operand container
pub const BLUECAT_CONFIG_FILE: &str = "/etc/kubernetes/bluecat.json";

/// GCP credentials file path inside the operand container
pub const GCP_CREDENTIALS_FILE: &str = "/etc/kubernetes/gcp-credentials.json";

/// Trusted CA extraction directory; `SSL_CERT_DIR` points here when a
/// trusted-CA bundle is injected
pub const TRUSTED_CA_MOUNT_PATH: &str = "/etc/pki/ca-trust/extracted/pem";

// ============================================================================
// Secret / ConfigMap Data Keys
// ============================================================================

/// AWS access key id entry in the credentials secret
pub const AWS_ACCESS_KEY_ID_KEY: &str = "aws_access_key_id";

/// AWS secret access key entry in the credentials secret
pub const AWS_SECRET_ACCESS_KEY_KEY: &str = "aws_secret_access_key";

/// Azure configuration entry in the credentials secret
pub const AZURE_CONFIG_KEY: &str = "azure.json";

/// BlueCat configuration entry in the credentials secret
pub const BLUECAT_CONFIG_KEY: &str = "bluecat.json";

/// GCP service-account entry in the destination credentials secret
pub const GCP_CREDENTIALS_KEY: &str = "gcp-credentials.json";

/// GCP service-account entry as minted by the cloud-credentials subsystem
pub const GCP_PLATFORM_CREDENTIALS_KEY: &str = "service_account.json";

/// Infoblox WAPI username entry in the credentials secret
pub const INFOBLOX_WAPI_USERNAME_KEY: &str = "EXTERNAL_DNS_INFOBLOX_WAPI_USERNAME";

/// Infoblox WAPI password entry in the credentials secret
pub const INFOBLOX_WAPI_PASSWORD_KEY: &str = "EXTERNAL_DNS_INFOBLOX_WAPI_PASSWORD";

/// PEM bundle entry in the trusted-CA configmap
pub const TRUSTED_CA_BUNDLE_KEY: &str = "ca-bundle.crt";

// ============================================================================
// Cloud Credentials Constants
// ============================================================================

/// API group/version for the OpenShift `CredentialsRequest` resource
pub const CREDENTIALS_REQUEST_API_VERSION: &str = "cloudcredential.openshift.io/v1";

/// Standard Route53 ARN prefix for the AWS policy payload
pub const AWS_ARN_PREFIX: &str = "arn:aws";

/// Route53 ARN prefix in GovCloud regions
pub const AWS_GOV_ARN_PREFIX: &str = "arn:aws-us-gov";

/// GCP predefined role granted to the operand
pub const GCP_DNS_ADMIN_ROLE: &str = "roles/dns.admin";

/// Azure role granted to the operand
pub const AZURE_CONTRIBUTOR_ROLE: &str = "Contributor";

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval after a successful reconcile (5 minutes); watch events
/// trigger immediate reconciliation, this is only a drift backstop
pub const RECONCILE_REQUEUE_SECS: u64 = 300;

// ============================================================================
// Leader Election Constants
// ============================================================================

/// Default leader election lease duration (15 seconds)
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 15;

/// Default leader election lease grace period (5 seconds)
pub const DEFAULT_LEASE_GRACE_SECS: u64 = 5;

/// Name of the leader election lease in the operator namespace
pub const LEASE_NAME: &str = "extdns-operator-lease";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default port for the Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics and webhook HTTP servers
pub const SERVER_BIND_ADDRESS: &str = "0.0.0.0";

/// Default port for the admission webhook HTTP server
pub const WEBHOOK_SERVER_PORT: u16 = 9443;

/// Path for the ExternalDNS validation webhook
pub const WEBHOOK_VALIDATE_PATH: &str = "/validate-externaldns";

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! ExternalDNS Kubernetes resource builders.
//!
//! This module provides functions to build the operand `Deployment` for an
//! `ExternalDNS` resource, and the semantic-diff predicate that decides when
//! an existing deployment needs an update. All functions are pure and easily
//! testable.
//!
//! The deployment is a deterministic function of the spec: one container per
//! declared zone (one unfiltered container when no zones are declared, two for
//! Azure so both the public and the private DNS surface are covered), with
//! command-line flags, environment and volumes derived from the provider and
//! source configuration. Two pod-template annotations carry content hashes of
//! the credentials secret and the trusted-CA bundle so a rotation rolls the
//! pods without any external signal.
//!
//! Admission controllers routinely default fields the operator never set, so
//! the diff predicate compares a fixed set of semantically significant fields
//! instead of deep structural equality.

use crate::config::OperatorConfig;
use crate::constants::{
    API_GROUP_VERSION, AWS_ACCESS_KEY_ID_KEY, AWS_SECRET_ACCESS_KEY_KEY, AZURE_CONFIG_FILE,
    AZURE_CONFIG_KEY, BLUECAT_CONFIG_FILE, BLUECAT_CONFIG_KEY, CREDENTIALS_DIR,
    CREDENTIALS_SECRET_PREFIX, CREDENTIALS_REQUEST_PREFIX, GCP_CREDENTIALS_FILE,
    GCP_CREDENTIALS_KEY, INFOBLOX_WAPI_PASSWORD_KEY, INFOBLOX_WAPI_USERNAME_KEY,
    KIND_EXTERNAL_DNS, METRICS_BASE_PORT, OPERAND_NAME_PREFIX, TRUSTED_CA_BUNDLE_KEY,
    TRUSTED_CA_MOUNT_PATH, TXT_RECORD_PREFIX,
};
use crate::crd::{
    DomainFilter, DomainFilterType, DomainMatchType, ExternalDNS, HostnameAnnotationPolicy,
    ProviderType, ServiceType, SourceType,
};
use crate::labels::{
    APP_NAME_EXTERNAL_DNS, CREDENTIALS_SECRET_HASH_ANNOTATION, K8S_INSTANCE, K8S_MANAGED_BY,
    K8S_NAME, K8S_PART_OF, MANAGED_BY_EXTERNAL_DNS, PART_OF_EXTDNS,
    TRUSTED_CA_CONFIGMAP_HASH_ANNOTATION,
};
use crate::selector::format_selector;
use anyhow::{bail, Context as _, Result};
use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{
        Capabilities, ConfigMap, ConfigMapVolumeSource, Container, EnvVar, EnvVarSource, KeyToPath,
        PodSpec, PodTemplateSpec, SeccompProfile, Secret, SecretKeySelector, SecretVolumeSource,
        SecurityContext, Toleration, Volume, VolumeMount,
    },
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

// Volume names inside the operand pod
const VOLUME_CREDENTIALS: &str = "credentials";
const VOLUME_TRUSTED_CA: &str = "trusted-ca";

// Zone strings naming an Azure private DNS zone resource
const AZURE_PRIVATE_ZONE_MARKER: &str = "privatednszones";

// ============================================================================
// Naming
// ============================================================================

/// Name of every per-CR derived resource (service account, cluster role
/// binding, deployment).
#[must_use]
pub fn operand_name(cr_name: &str) -> String {
    format!("{OPERAND_NAME_PREFIX}{cr_name}")
}

/// Name of the destination credentials secret in the operand namespace.
#[must_use]
pub fn credentials_secret_name(cr_name: &str) -> String {
    format!("{CREDENTIALS_SECRET_PREFIX}{cr_name}")
}

/// Name of the per-provider `CredentialsRequest`.
#[must_use]
pub fn credentials_request_name(provider: ProviderType) -> String {
    format!("{CREDENTIALS_REQUEST_PREFIX}{}", provider.name())
}

/// TXT registry owner id for a CR; distinguishes this operand's records from
/// every other writer in the zone.
#[must_use]
pub fn txt_owner_id(cr_name: &str) -> String {
    format!("{OPERAND_NAME_PREFIX}{cr_name}")
}

/// Deterministic, DNS-safe container name for a zone-bound operand container.
///
/// Zone identifiers may contain characters a container name cannot (Azure zone
/// ids are resource paths), so the name carries a short content hash instead.
#[must_use]
pub fn container_name(zone: Option<&str>) -> String {
    match zone {
        Some(zone) => {
            let digest = Sha256::digest(zone.as_bytes());
            format!("external-dns-{:.8}", hex_string(&digest))
        }
        None => "external-dns".to_string(),
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ============================================================================
// Labels & ownership
// ============================================================================

/// Pod selector labels for an operand deployment. These two labels are the
/// deployment's `matchLabels` and must stay stable across operator versions.
#[must_use]
pub fn build_selector_labels(cr_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(K8S_NAME.into(), APP_NAME_EXTERNAL_DNS.into());
    labels.insert(K8S_INSTANCE.into(), cr_name.into());
    labels
}

/// Full label set applied to every derived resource.
#[must_use]
pub fn build_labels(cr_name: &str) -> BTreeMap<String, String> {
    let mut labels = build_selector_labels(cr_name);
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_EXTERNAL_DNS.into());
    labels.insert(K8S_PART_OF.into(), PART_OF_EXTDNS.into());
    labels
}

/// Builds the controller owner reference for a resource owned by an
/// `ExternalDNS`, so garbage collection removes derived resources with the CR.
#[must_use]
pub fn build_owner_reference(edns: &ExternalDNS) -> Vec<OwnerReference> {
    vec![OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_EXTERNAL_DNS.to_string(),
        name: edns.name_any(),
        uid: edns.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }]
}

// ============================================================================
// Content hashing
// ============================================================================

/// SHA-256 over the sorted `key|value` concatenation of a secret's data map.
///
/// Any single-byte change to any value (or any key) changes the digest, and
/// identical data always yields the identical digest, so the digest is usable
/// as a pod-template annotation that rolls the pods on rotation.
#[must_use]
pub fn secret_data_hash(secret: &Secret) -> String {
    let mut hasher = Sha256::new();
    if let Some(data) = &secret.data {
        for (key, value) in data {
            hasher.update(key.as_bytes());
            hasher.update(b"|");
            hasher.update(&value.0);
        }
    }
    hex_string(&hasher.finalize())
}

/// SHA-256 over the sorted `key|value` concatenation of a configmap's data map.
#[must_use]
pub fn configmap_data_hash(configmap: &ConfigMap) -> String {
    let mut hasher = Sha256::new();
    if let Some(data) = &configmap.data {
        for (key, value) in data {
            hasher.update(key.as_bytes());
            hasher.update(b"|");
            hasher.update(value.as_bytes());
        }
    }
    hex_string(&hasher.finalize())
}

// ============================================================================
// Deployment builder
// ============================================================================

/// Builds the operand `Deployment` for an `ExternalDNS` resource.
///
/// # Arguments
///
/// * `edns` - The validated `ExternalDNS` resource
/// * `config` - Operator configuration (operand namespace, image, platform)
/// * `credentials_secret` - Resolved destination credentials secret, if the
///   provider needs one
/// * `trusted_ca` - Resolved trusted-CA bundle configmap, if injection is on
///
/// # Errors
///
/// Returns an error when a domain filter pattern does not compile, a label
/// selector is not expressible as a string, or a structural invariant is
/// violated (e.g. GCP on OpenShift with no resolvable project).
pub fn build_deployment(
    edns: &ExternalDNS,
    config: &OperatorConfig,
    credentials_secret: Option<&Secret>,
    trusted_ca: Option<&ConfigMap>,
) -> Result<Deployment> {
    let cr_name = edns.name_any();
    let name = operand_name(&cr_name);
    debug!(
        name = %name,
        namespace = %config.operand_namespace,
        provider = %edns.spec.provider.r#type.name(),
        "Building Deployment for ExternalDNS"
    );

    let labels = build_labels(&cr_name);
    let selector_labels = build_selector_labels(&cr_name);

    let mut pod_annotations = BTreeMap::new();
    if let Some(secret) = credentials_secret {
        pod_annotations.insert(
            CREDENTIALS_SECRET_HASH_ANNOTATION.to_string(),
            secret_data_hash(secret),
        );
    }
    if let Some(bundle) = trusted_ca {
        pod_annotations.insert(
            TRUSTED_CA_CONFIGMAP_HASH_ANNOTATION.to_string(),
            configmap_data_hash(bundle),
        );
    }

    let containers = build_containers(edns, config, credentials_secret, trusted_ca.is_some())?;
    let volumes = build_volumes(edns, credentials_secret, trusted_ca);

    let mut node_selector = BTreeMap::new();
    node_selector.insert("kubernetes.io/os".to_string(), "linux".to_string());
    node_selector.insert("node-role.kubernetes.io/master".to_string(), String::new());

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(config.operand_namespace.clone()),
            labels: Some(labels),
            owner_references: Some(build_owner_reference(edns)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector_labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels),
                    annotations: if pod_annotations.is_empty() {
                        None
                    } else {
                        Some(pod_annotations)
                    },
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers,
                    volumes: if volumes.is_empty() {
                        None
                    } else {
                        Some(volumes)
                    },
                    service_account_name: Some(operand_name(&cr_name)),
                    node_selector: Some(node_selector),
                    tolerations: Some(vec![Toleration {
                        key: Some("node-role.kubernetes.io/master".to_string()),
                        operator: Some("Exists".to_string()),
                        effect: Some("NoSchedule".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// One container per declared zone; a single unfiltered container when no
/// zones are declared, except Azure, which gets a public and a private
/// container so records land in both DNS surfaces.
fn build_containers(
    edns: &ExternalDNS,
    config: &OperatorConfig,
    credentials_secret: Option<&Secret>,
    has_trusted_ca: bool,
) -> Result<Vec<Container>> {
    let secret_name = credentials_secret.and_then(|s| s.metadata.name.clone());
    let mut containers = Vec::new();

    if edns.spec.zones.is_empty() {
        containers.push(build_container(
            edns,
            config,
            None,
            0,
            &container_name(None),
            secret_name.as_deref(),
            has_trusted_ca,
            false,
        )?);
        if edns.spec.provider.r#type == ProviderType::Azure {
            containers.push(build_container(
                edns,
                config,
                None,
                1,
                "external-dns-private",
                secret_name.as_deref(),
                has_trusted_ca,
                true,
            )?);
        }
    } else {
        for (index, zone) in edns.spec.zones.iter().enumerate() {
            containers.push(build_container(
                edns,
                config,
                Some(zone.as_str()),
                index,
                &container_name(Some(zone.as_str())),
                secret_name.as_deref(),
                has_trusted_ca,
                false,
            )?);
        }
    }

    Ok(containers)
}

/// Builds one operand container bound to an optional zone.
///
/// The `index` feeds the metrics address so every container in the pod gets a
/// unique endpoint. `force_private` switches the Azure provider flag to
/// `azure-private-dns` for the zero-zone private container.
#[allow(clippy::too_many_arguments)]
fn build_container(
    edns: &ExternalDNS,
    config: &OperatorConfig,
    zone: Option<&str>,
    index: usize,
    name: &str,
    secret_name: Option<&str>,
    has_trusted_ca: bool,
    force_private: bool,
) -> Result<Container> {
    let args = build_container_args(edns, config, zone, index, force_private)?;
    let env = build_container_env(edns, secret_name, has_trusted_ca);
    let volume_mounts = build_volume_mounts(edns, secret_name.is_some(), has_trusted_ca);

    Ok(Container {
        name: name.to_string(),
        image: Some(config.operand_image.clone()),
        args: Some(args),
        env: if env.is_empty() { None } else { Some(env) },
        volume_mounts: if volume_mounts.is_empty() {
            None
        } else {
            Some(volume_mounts)
        },
        security_context: Some(SecurityContext {
            run_as_non_root: Some(true),
            privileged: Some(false),
            allow_privilege_escalation: Some(false),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".to_string()]),
                ..Default::default()
            }),
            seccomp_profile: Some(SeccompProfile {
                type_: "RuntimeDefault".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Builds the full flag list for one operand container.
fn build_container_args(
    edns: &ExternalDNS,
    config: &OperatorConfig,
    zone: Option<&str>,
    index: usize,
    force_private: bool,
) -> Result<Vec<String>> {
    let spec = &edns.spec;
    let cr_name = edns.name_any();
    let metrics_port = METRICS_BASE_PORT + u16::try_from(index).context("container index")?;

    let mut args = vec![
        format!("--metrics-address=127.0.0.1:{metrics_port}"),
        format!("--txt-owner-id={}", txt_owner_id(&cr_name)),
    ];

    if let Some(zone) = zone {
        args.push(format!("--zone-id-filter={zone}"));
    }

    args.push(format!("--provider={}", provider_arg(spec, zone, force_private)));
    args.push(format!("--source={}", spec.source.r#type.operand_arg()));
    args.push("--policy=sync".to_string());
    args.push("--registry=txt".to_string());
    args.push("--log-level=debug".to_string());

    args.extend(build_source_args(edns)?);
    args.extend(build_domain_filter_args(spec.domains.as_deref().unwrap_or_default())?);

    args.push(format!("--txt-prefix={TXT_RECORD_PREFIX}"));
    args.extend(build_provider_args(edns, config)?);

    Ok(args)
}

/// Resolves the `--provider` flag value for a container.
///
/// A zone string naming an Azure private DNS zone switches the provider to
/// `azure-private-dns`; every other provider maps straight from the tag.
fn provider_arg(spec: &crate::crd::ExternalDNSSpec, zone: Option<&str>, force_private: bool) -> &'static str {
    if spec.provider.r#type == ProviderType::Azure {
        let private = force_private
            || zone.is_some_and(|z| z.to_lowercase().contains(AZURE_PRIVATE_ZONE_MARKER));
        if private {
            return "azure-private-dns";
        }
    }
    spec.provider.r#type.operand_arg()
}

/// Source-derived flags, identical for every container in the pod.
fn build_source_args(edns: &ExternalDNS) -> Result<Vec<String>> {
    let source = &edns.spec.source;
    let mut args = Vec::new();

    if source.r#type == SourceType::Service {
        let service_types = source
            .service
            .as_ref()
            .map(|o| o.service_types.as_slice())
            .unwrap_or_default();
        for service_type in service_types {
            args.push(format!(
                "--service-type-filter={}",
                service_type.operand_arg()
            ));
        }
        if service_types.contains(&ServiceType::ClusterIP) {
            args.push("--publish-internal-services".to_string());
        }
    }

    if source.hostname_policy == HostnameAnnotationPolicy::Ignore {
        args.push("--ignore-hostname-annotation".to_string());
    }

    let templates = source.fqdn_templates.as_deref().unwrap_or_default();
    if !templates.is_empty() {
        args.push(format!("--fqdn-template={}", templates.join(",")));
    } else if source.hostname_policy == HostnameAnnotationPolicy::Ignore
        && source.r#type == SourceType::OpenShiftRoute
    {
        // The operand refuses to start without a template when the hostname
        // annotation is ignored; routes synthesize their hostnames, so an
        // empty template satisfies it.
        args.push(r#"--fqdn-template={{""}}"#.to_string());
    }

    if let Some(router_name) = source
        .openshift_route
        .as_ref()
        .and_then(|o| o.router_name.as_ref())
    {
        args.push(format!("--openshift-router-name={router_name}"));
    }

    if let Some(label_filter) = &source.label_filter {
        let selector = format_selector(label_filter).context("label filter")?;
        if !selector.is_empty() {
            args.push(format!("--label-filter={selector}"));
        }
    }

    if let Some(annotation_filter) = &source.annotation_filter {
        let selector = format_selector(annotation_filter).context("annotation filter")?;
        if !selector.is_empty() {
            args.push(format!("--annotation-filter={selector}"));
        }
    }

    if let Some(namespace) = &source.namespace {
        args.push(format!("--namespace={namespace}"));
    }

    Ok(args)
}

/// Translates the domain filter list into operand flags.
///
/// Exact entries become one `--domain-filter` / `--exclude-domains` each, in
/// declared order. Regex entries are compile-validated and combined into a
/// single alternation per direction; a lone pattern is passed through raw.
pub fn build_domain_filter_args(domains: &[DomainFilter]) -> Result<Vec<String>> {
    let mut include_exact = Vec::new();
    let mut exclude_exact = Vec::new();
    let mut include_regex = Vec::new();
    let mut exclude_regex = Vec::new();

    for filter in domains {
        match filter.match_type {
            DomainMatchType::Exact => {
                let name = filter
                    .name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .context("exact domain filter without a name")?;
                match filter.filter_type {
                    DomainFilterType::Include => include_exact.push(name.to_string()),
                    DomainFilterType::Exclude => exclude_exact.push(name.to_string()),
                }
            }
            DomainMatchType::Regex => {
                let pattern = filter
                    .pattern
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .context("regex domain filter without a pattern")?;
                regex::Regex::new(pattern)
                    .with_context(|| format!("domain filter pattern {pattern:?}"))?;
                match filter.filter_type {
                    DomainFilterType::Include => include_regex.push(pattern.to_string()),
                    DomainFilterType::Exclude => exclude_regex.push(pattern.to_string()),
                }
            }
        }
    }

    let mut args = Vec::new();
    for name in include_exact {
        args.push(format!("--domain-filter={name}"));
    }
    for name in exclude_exact {
        args.push(format!("--exclude-domains={name}"));
    }
    if !include_regex.is_empty() {
        args.push(format!(
            "--regex-domain-filter={}",
            combine_patterns(&include_regex)
        ));
    }
    if !exclude_regex.is_empty() {
        args.push(format!(
            "--regex-domain-exclusion={}",
            combine_patterns(&exclude_regex)
        ));
    }

    Ok(args)
}

/// One pattern passes through raw; several are grouped into an alternation.
fn combine_patterns(patterns: &[String]) -> String {
    if patterns.len() == 1 {
        patterns[0].clone()
    } else {
        patterns
            .iter()
            .map(|p| format!("({p})"))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Provider-specific flags appended after `--txt-prefix`.
fn build_provider_args(edns: &ExternalDNS, config: &OperatorConfig) -> Result<Vec<String>> {
    let provider = &edns.spec.provider;
    let mut args = Vec::new();

    match provider.r#type {
        ProviderType::AWS => {}
        ProviderType::Azure => {
            args.push(format!("--azure-config-file={AZURE_CONFIG_FILE}"));
        }
        ProviderType::GCP => {
            let project = provider
                .gcp
                .as_ref()
                .and_then(|o| o.project.as_deref())
                .or(config.gcp_project.as_deref());
            match project {
                Some(project) => args.push(format!("--google-project={project}")),
                None if config.is_openshift => {
                    bail!(
                        "ExternalDNS {:?}: no GCP project in the spec and none in the platform status",
                        edns.name_any()
                    );
                }
                None => {}
            }
        }
        ProviderType::BlueCat => {
            args.push(format!("--bluecat-config-file={BLUECAT_CONFIG_FILE}"));
        }
        ProviderType::Infoblox => {
            let options = provider
                .infoblox
                .as_ref()
                .context("Infoblox provider without options")?;
            args.push(format!("--infoblox-wapi-port={}", options.wapi_port));
            args.push(format!("--infoblox-grid-host={}", options.grid_host));
            args.push(format!("--infoblox-wapi-version={}", options.wapi_version));
        }
    }

    Ok(args)
}

/// Environment for one operand container: secret-backed credentials, the
/// trusted-CA cert directory, and the inherited proxy settings.
fn build_container_env(
    edns: &ExternalDNS,
    secret_name: Option<&str>,
    has_trusted_ca: bool,
) -> Vec<EnvVar> {
    let mut env = Vec::new();

    match (edns.spec.provider.r#type, secret_name) {
        (ProviderType::AWS, Some(secret)) => {
            env.push(secret_env_var("AWS_ACCESS_KEY_ID", secret, AWS_ACCESS_KEY_ID_KEY));
            env.push(secret_env_var(
                "AWS_SECRET_ACCESS_KEY",
                secret,
                AWS_SECRET_ACCESS_KEY_KEY,
            ));
        }
        (ProviderType::GCP, Some(_)) => {
            env.push(EnvVar {
                name: "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
                value: Some(GCP_CREDENTIALS_FILE.to_string()),
                ..Default::default()
            });
        }
        (ProviderType::Infoblox, Some(secret)) => {
            env.push(secret_env_var(
                INFOBLOX_WAPI_USERNAME_KEY,
                secret,
                INFOBLOX_WAPI_USERNAME_KEY,
            ));
            env.push(secret_env_var(
                INFOBLOX_WAPI_PASSWORD_KEY,
                secret,
                INFOBLOX_WAPI_PASSWORD_KEY,
            ));
        }
        _ => {}
    }

    if has_trusted_ca {
        env.push(EnvVar {
            name: "SSL_CERT_DIR".to_string(),
            value: Some(TRUSTED_CA_MOUNT_PATH.to_string()),
            ..Default::default()
        });
    }

    if edns.spec.provider.r#type.supports_proxy() {
        for proxy_var in ["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY"] {
            if let Ok(value) = std::env::var(proxy_var) {
                if !value.is_empty() {
                    env.push(EnvVar {
                        name: proxy_var.to_string(),
                        value: Some(value),
                        ..Default::default()
                    });
                }
            }
        }
    }

    env
}

fn secret_env_var(name: &str, secret_name: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret_name.to_string(),
                key: key.to_string(),
                optional: Some(false),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Whether the provider consumes its credentials as a projected file
/// (Azure, GCP, BlueCat) rather than environment variables (AWS, Infoblox).
fn provider_mounts_credentials(provider: ProviderType) -> Option<&'static str> {
    match provider {
        ProviderType::Azure => Some(AZURE_CONFIG_KEY),
        ProviderType::GCP => Some(GCP_CREDENTIALS_KEY),
        ProviderType::BlueCat => Some(BLUECAT_CONFIG_KEY),
        ProviderType::AWS | ProviderType::Infoblox => None,
    }
}

fn build_volume_mounts(
    edns: &ExternalDNS,
    has_secret: bool,
    has_trusted_ca: bool,
) -> Vec<VolumeMount> {
    let mut mounts = Vec::new();

    if has_secret && provider_mounts_credentials(edns.spec.provider.r#type).is_some() {
        mounts.push(VolumeMount {
            name: VOLUME_CREDENTIALS.to_string(),
            mount_path: CREDENTIALS_DIR.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    if has_trusted_ca {
        mounts.push(VolumeMount {
            name: VOLUME_TRUSTED_CA.to_string(),
            mount_path: TRUSTED_CA_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    mounts
}

fn build_volumes(
    edns: &ExternalDNS,
    credentials_secret: Option<&Secret>,
    trusted_ca: Option<&ConfigMap>,
) -> Vec<Volume> {
    let mut volumes = Vec::new();

    if let (Some(secret), Some(key)) = (
        credentials_secret,
        provider_mounts_credentials(edns.spec.provider.r#type),
    ) {
        volumes.push(Volume {
            name: VOLUME_CREDENTIALS.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: secret.metadata.name.clone(),
                items: Some(vec![KeyToPath {
                    key: key.to_string(),
                    path: key.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    if let Some(bundle) = trusted_ca {
        volumes.push(Volume {
            name: VOLUME_TRUSTED_CA.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: bundle.name_any(),
                items: Some(vec![KeyToPath {
                    key: TRUSTED_CA_BUNDLE_KEY.to_string(),
                    path: TRUSTED_CA_BUNDLE_KEY.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    volumes
}

// ============================================================================
// Semantic diff
// ============================================================================

/// Computes the minimal update that brings `current` in line with `desired`.
///
/// Returns `None` when no semantically significant field differs, so the
/// reconciler can skip the write and avoid hot-looping against admission
/// defaults. The compared set is fixed:
///
/// 1. Expected pod-template annotations must be present with matching values;
///    foreign annotations are preserved.
/// 2. Containers are matched by name. Image, argument set, env set, volume
///    mount set and a selective security-context subset are compared
///    order-insensitively; containers outside the expected set are left
///    alone unless the expected names differ, in which case the whole
///    container set is replaced.
/// 3. Volumes are matched by name; expected volumes must be present with
///    matching sources, foreign volumes (e.g. projected tokens) are kept.
#[must_use]
pub fn deployment_update(current: &Deployment, desired: &Deployment) -> Option<Deployment> {
    let mut updated = current.clone();
    let mut changed = false;

    let desired_template = desired.spec.as_ref().map(|s| &s.template);
    let Some(desired_template) = desired_template else {
        return None;
    };

    let updated_spec = updated.spec.get_or_insert_with(Default::default);

    // 1. Pod-template annotations
    if let Some(desired_annotations) = desired_template
        .metadata
        .as_ref()
        .and_then(|m| m.annotations.as_ref())
    {
        let metadata = updated_spec
            .template
            .metadata
            .get_or_insert_with(Default::default);
        let annotations = metadata.annotations.get_or_insert_with(Default::default);
        for (key, value) in desired_annotations {
            if annotations.get(key) != Some(value) {
                annotations.insert(key.clone(), value.clone());
                changed = true;
            }
        }
    }

    // 2. Containers
    let desired_containers = desired_template
        .spec
        .as_ref()
        .map(|s| s.containers.as_slice())
        .unwrap_or_default();
    let pod_spec = updated_spec
        .template
        .spec
        .get_or_insert_with(Default::default);
    if reconcile_containers(&mut pod_spec.containers, desired_containers) {
        changed = true;
    }

    // 3. Volumes
    let desired_volumes = desired_template
        .spec
        .as_ref()
        .and_then(|s| s.volumes.as_deref())
        .unwrap_or_default();
    if !desired_volumes.is_empty() {
        let volumes = pod_spec.volumes.get_or_insert_with(Default::default);
        for desired_volume in desired_volumes {
            match volumes.iter_mut().find(|v| v.name == desired_volume.name) {
                Some(existing) if existing == desired_volume => {}
                Some(existing) => {
                    *existing = desired_volume.clone();
                    changed = true;
                }
                None => {
                    volumes.push(desired_volume.clone());
                    changed = true;
                }
            }
        }
    }

    changed.then_some(updated)
}

/// Brings the current container list in line with the desired one. Returns
/// whether anything was mutated.
fn reconcile_containers(current: &mut Vec<Container>, desired: &[Container]) -> bool {
    // A different expected count, or an expected name with no counterpart,
    // replaces the containers wholesale; anything else is reconciled in place
    // so sidecars injected by admission survive.
    let matchable = current.len() == desired.len()
        && desired
            .iter()
            .all(|d| current.iter().any(|c| c.name == d.name));
    if !matchable {
        *current = desired.to_vec();
        return true;
    }

    let mut changed = false;
    for desired_container in desired {
        let Some(existing) = current.iter_mut().find(|c| c.name == desired_container.name) else {
            continue;
        };
        if existing.image != desired_container.image {
            existing.image = desired_container.image.clone();
            changed = true;
        }
        if !same_elements(
            existing.args.as_deref().unwrap_or_default(),
            desired_container.args.as_deref().unwrap_or_default(),
        ) {
            existing.args = desired_container.args.clone();
            changed = true;
        }
        if !same_elements(
            existing.env.as_deref().unwrap_or_default(),
            desired_container.env.as_deref().unwrap_or_default(),
        ) {
            existing.env = desired_container.env.clone();
            changed = true;
        }
        if !same_elements(
            existing.volume_mounts.as_deref().unwrap_or_default(),
            desired_container.volume_mounts.as_deref().unwrap_or_default(),
        ) {
            existing.volume_mounts = desired_container.volume_mounts.clone();
            changed = true;
        }
        if !security_context_matches(
            existing.security_context.as_ref(),
            desired_container.security_context.as_ref(),
        ) {
            existing.security_context = desired_container.security_context.clone();
            changed = true;
        }
    }
    changed
}

/// Order-insensitive element comparison: equal lengths and every element of
/// one side present in the other.
fn same_elements<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len()
        && a.iter().all(|item| b.contains(item))
        && b.iter().all(|item| a.contains(item))
}

/// Compares the security-context fields the operator actually sets; admission
/// may default the rest.
fn security_context_matches(
    current: Option<&SecurityContext>,
    desired: Option<&SecurityContext>,
) -> bool {
    let Some(desired) = desired else {
        return true;
    };
    let Some(current) = current else {
        return false;
    };

    let caps_match = {
        let empty = Capabilities::default();
        let current_caps = current.capabilities.as_ref().unwrap_or(&empty);
        let desired_caps = desired.capabilities.as_ref().unwrap_or(&empty);
        let sorted = |caps: Option<&Vec<String>>| {
            let mut v = caps.cloned().unwrap_or_default();
            v.sort();
            v
        };
        sorted(current_caps.add.as_ref()) == sorted(desired_caps.add.as_ref())
            && sorted(current_caps.drop.as_ref()) == sorted(desired_caps.drop.as_ref())
    };

    caps_match
        && current.run_as_non_root == desired.run_as_non_root
        && current.privileged == desired.privileged
        && current.allow_privilege_escalation == desired.allow_privilege_escalation
        && current.seccomp_profile.as_ref().map(|p| &p.type_)
            == desired.seccomp_profile.as_ref().map(|p| &p.type_)
}

#[cfg(test)]
#[path = "externaldns_resources_tests.rs"]
mod externaldns_resources_tests;

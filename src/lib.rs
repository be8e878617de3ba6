// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # Extdns - ExternalDNS Lifecycle Operator for Kubernetes
//!
//! Extdns is a Kubernetes operator written in Rust that manages the lifecycle
//! of the ExternalDNS workload: the process that synchronizes Kubernetes
//! Services and OpenShift Routes to DNS records in cloud zones (AWS Route53,
//! Azure DNS, GCP Cloud DNS, BlueCat, Infoblox).
//!
//! ## Overview
//!
//! A user declares intent through the cluster-scoped [`crd::ExternalDNS`]
//! resource; the operator continuously reconciles that intent into:
//!
//! - a deployment running the ExternalDNS binary configured for the declared
//!   provider, source and zones,
//! - the RBAC, service account and namespace it needs,
//! - a copy of the provider credentials in the operand namespace,
//! - and, on OpenShift, a cloud-credentials request so the platform mints
//!   those credentials automatically.
//!
//! ## Modules
//!
//! - [`crd`] - The `ExternalDNS` custom resource definition
//! - [`reconcilers`] - Reconciliation logic for the CR and derived resources
//! - [`externaldns_resources`] - Operand deployment builder and semantic diff
//! - [`webhook`] - Synchronous admission validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use extdns::crd::{
//!     ExternalDNSSpec, ProviderConfig, ProviderType, ServiceSourceOptions, ServiceType,
//!     SourceConfig, SourceType,
//! };
//!
//! let spec = ExternalDNSSpec {
//!     provider: ProviderConfig {
//!         r#type: ProviderType::AWS,
//!         aws: None,
//!         azure: None,
//!         gcp: None,
//!         bluecat: None,
//!         infoblox: None,
//!     },
//!     source: SourceConfig {
//!         r#type: SourceType::Service,
//!         hostname_policy: Default::default(),
//!         fqdn_templates: None,
//!         label_filter: None,
//!         annotation_filter: None,
//!         namespace: None,
//!         service: Some(ServiceSourceOptions {
//!             service_types: vec![ServiceType::LoadBalancer],
//!         }),
//!         openshift_route: None,
//!     },
//!     zones: vec!["Z05387772BD5723IZFRX3".to_string()],
//!     domains: None,
//! };
//! ```
//!
//! ## Features
//!
//! - **Deterministic operand** - The pod spec is a pure function of the CR
//! - **Rotation-aware** - Secret content hashes roll pods on rotation
//! - **Admission-proof diffing** - Semantic comparison survives mutating webhooks
//! - **Status conditions** - Deployment and scheduling state in the CR status

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod externaldns_resources;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod selector;
pub mod webhook;

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crd`

#[cfg(test)]
mod tests {
    use crate::crd::{
        AWSProviderOptions, ExternalDNS, ExternalDNSSpec, HostnameAnnotationPolicy,
        InfobloxProviderOptions, ProviderConfig, ProviderType, SecretReference,
        ServiceSourceOptions, ServiceType, SourceConfig, SourceType,
    };
    use kube::{CustomResourceExt, Resource};

    fn sample_spec() -> ExternalDNSSpec {
        ExternalDNSSpec {
            provider: ProviderConfig {
                r#type: ProviderType::AWS,
                aws: Some(AWSProviderOptions {
                    credentials: Some(SecretReference {
                        name: "route53-credentials".to_string(),
                    }),
                    assume_role: None,
                }),
                azure: None,
                gcp: None,
                bluecat: None,
                infoblox: None,
            },
            source: SourceConfig {
                r#type: SourceType::Service,
                hostname_policy: HostnameAnnotationPolicy::Allow,
                fqdn_templates: None,
                label_filter: None,
                annotation_filter: None,
                namespace: None,
                service: Some(ServiceSourceOptions {
                    service_types: vec![ServiceType::LoadBalancer],
                }),
                openshift_route: None,
            },
            zones: vec!["Z1".to_string()],
            domains: None,
        }
    }

    #[test]
    fn test_crd_is_cluster_scoped() {
        let crd = ExternalDNS::crd();
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.group, "extdns.firestoned.io");
        assert_eq!(crd.spec.names.plural, "externaldnses");
    }

    #[test]
    fn test_api_version_matches_constants() {
        assert_eq!(
            ExternalDNS::api_version(&()),
            crate::constants::API_GROUP_VERSION
        );
        assert_eq!(ExternalDNS::kind(&()), crate::constants::KIND_EXTERNAL_DNS);
    }

    #[test]
    fn test_spec_serializes_camel_case() {
        let value = serde_json::to_value(sample_spec()).unwrap();
        assert_eq!(value["provider"]["type"], "AWS");
        assert_eq!(
            value["provider"]["aws"]["credentials"]["name"],
            "route53-credentials"
        );
        assert_eq!(value["source"]["type"], "Service");
        assert_eq!(value["source"]["hostnamePolicy"], "Allow");
        assert_eq!(value["source"]["service"]["serviceTypes"][0], "LoadBalancer");
        assert_eq!(value["zones"][0], "Z1");
    }

    #[test]
    fn test_spec_deserializes_with_defaults() {
        let spec: ExternalDNSSpec = serde_json::from_value(serde_json::json!({
            "provider": { "type": "Infoblox", "infoblox": {
                "credentials": { "name": "infoblox" },
                "wapiVersion": "2.3.1",
                "wapiPort": 443,
                "gridHost": "grid.example.com"
            }},
            "source": { "type": "OpenShiftRoute" }
        }))
        .unwrap();

        assert_eq!(spec.provider.r#type, ProviderType::Infoblox);
        assert_eq!(spec.source.hostname_policy, HostnameAnnotationPolicy::Allow);
        assert!(spec.zones.is_empty());
        assert!(spec.domains.is_none());

        let options: InfobloxProviderOptions = spec.provider.infoblox.unwrap();
        assert_eq!(options.wapi_port, 443);
        assert_eq!(options.grid_host, "grid.example.com");
    }

    #[test]
    fn test_provider_tags() {
        assert_eq!(ProviderType::AWS.name(), "aws");
        assert_eq!(ProviderType::GCP.name(), "gcp");
        // the operand names the Google provider differently from the tag
        assert_eq!(ProviderType::GCP.operand_arg(), "google");
        assert_eq!(ProviderType::BlueCat.operand_arg(), "bluecat");
        assert_eq!(SourceType::OpenShiftRoute.operand_arg(), "openshift-route");
    }

    #[test]
    fn test_proxy_capability_predicate() {
        assert!(ProviderType::AWS.supports_proxy());
        assert!(ProviderType::Azure.supports_proxy());
        assert!(ProviderType::GCP.supports_proxy());
        assert!(!ProviderType::BlueCat.supports_proxy());
        assert!(!ProviderType::Infoblox.supports_proxy());
    }

    #[test]
    fn test_declared_secret_name_per_provider() {
        let mut spec = sample_spec();
        assert_eq!(
            spec.provider.declared_secret_name(),
            Some("route53-credentials")
        );

        spec.provider = ProviderConfig {
            r#type: ProviderType::AWS,
            aws: None,
            azure: None,
            gcp: None,
            bluecat: None,
            infoblox: None,
        };
        assert_eq!(spec.provider.declared_secret_name(), None);

        spec.provider = ProviderConfig {
            r#type: ProviderType::BlueCat,
            aws: None,
            azure: None,
            gcp: None,
            bluecat: Some(crate::crd::BlueCatProviderOptions {
                config_file: SecretReference {
                    name: "bluecat-config".to_string(),
                },
            }),
            infoblox: None,
        };
        assert_eq!(spec.provider.declared_secret_name(), Some("bluecat-config"));
    }
}

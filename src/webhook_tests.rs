// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `webhook`

#[cfg(test)]
mod tests {
    use crate::crd::{
        AWSProviderOptions, AzureProviderOptions, DomainFilter, DomainFilterType, DomainMatchType,
        ExternalDNSSpec, HostnameAnnotationPolicy, InfobloxProviderOptions, ProviderConfig,
        ProviderType, SecretReference, ServiceSourceOptions, ServiceType, SourceConfig, SourceType,
    };
    use crate::webhook::validate_external_dns;

    fn infoblox_spec(wapi_port: i64) -> ExternalDNSSpec {
        ExternalDNSSpec {
            provider: ProviderConfig {
                r#type: ProviderType::Infoblox,
                aws: None,
                azure: None,
                gcp: None,
                bluecat: None,
                infoblox: Some(InfobloxProviderOptions {
                    credentials: SecretReference {
                        name: "infoblox-creds".to_string(),
                    },
                    wapi_version: "2.3.1".to_string(),
                    wapi_port,
                    grid_host: "grid.example.com".to_string(),
                }),
            },
            source: service_spec_source(),
            zones: Vec::new(),
            domains: None,
        }
    }

    fn service_spec_source() -> SourceConfig {
        SourceConfig {
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
        }
    }

    fn aws_spec(credentials: Option<&str>) -> ExternalDNSSpec {
        ExternalDNSSpec {
            provider: ProviderConfig {
                r#type: ProviderType::AWS,
                aws: Some(AWSProviderOptions {
                    credentials: credentials.map(|name| SecretReference {
                        name: name.to_string(),
                    }),
                    assume_role: None,
                }),
                azure: None,
                gcp: None,
                bluecat: None,
                infoblox: None,
            },
            source: service_spec_source(),
            zones: Vec::new(),
            domains: None,
        }
    }

    #[test]
    fn test_infoblox_zero_port_rejected() {
        let errors = validate_external_dns(&infoblox_spec(0), false).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("wapiPort")));
    }

    #[test]
    fn test_infoblox_valid_port_accepted() {
        assert!(validate_external_dns(&infoblox_spec(443), false).is_ok());
    }

    #[test]
    fn test_ignore_policy_requires_templates_for_service_source() {
        let mut spec = aws_spec(Some("creds"));
        spec.source.hostname_policy = HostnameAnnotationPolicy::Ignore;
        let errors = validate_external_dns(&spec, false).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("fqdnTemplates")));

        spec.source.fqdn_templates = Some(vec!["{{.Name}}.example.com".to_string()]);
        assert!(validate_external_dns(&spec, false).is_ok());
    }

    #[test]
    fn test_ignore_policy_allowed_for_route_source() {
        let mut spec = aws_spec(Some("creds"));
        spec.source.r#type = SourceType::OpenShiftRoute;
        spec.source.service = None;
        spec.source.hostname_policy = HostnameAnnotationPolicy::Ignore;
        assert!(validate_external_dns(&spec, false).is_ok());
    }

    #[test]
    fn test_aws_credentials_required_off_openshift() {
        let errors = validate_external_dns(&aws_spec(None), false).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("provider.aws")));

        // on OpenShift the cloud-credentials subsystem supplies them
        assert!(validate_external_dns(&aws_spec(None), true).is_ok());
    }

    #[test]
    fn test_azure_config_file_required_off_openshift() {
        let spec = ExternalDNSSpec {
            provider: ProviderConfig {
                r#type: ProviderType::Azure,
                aws: None,
                azure: None,
                gcp: None,
                bluecat: None,
                infoblox: None,
            },
            source: service_spec_source(),
            zones: Vec::new(),
            domains: None,
        };
        assert!(validate_external_dns(&spec, false).is_err());
        assert!(validate_external_dns(&spec, true).is_ok());

        let with_config = ExternalDNSSpec {
            provider: ProviderConfig {
                r#type: ProviderType::Azure,
                aws: None,
                azure: Some(AzureProviderOptions {
                    config_file: SecretReference {
                        name: "azure-config".to_string(),
                    },
                }),
                gcp: None,
                bluecat: None,
                infoblox: None,
            },
            ..spec
        };
        assert!(validate_external_dns(&with_config, false).is_ok());
    }

    #[test]
    fn test_domain_filter_validation() {
        let mut spec = aws_spec(Some("creds"));
        spec.domains = Some(vec![
            DomainFilter {
                filter_type: DomainFilterType::Include,
                match_type: DomainMatchType::Exact,
                name: None,
                pattern: None,
            },
            DomainFilter {
                filter_type: DomainFilterType::Include,
                match_type: DomainMatchType::Regex,
                name: None,
                pattern: Some("(unclosed".to_string()),
            },
        ]);
        let errors = validate_external_dns(&spec, false).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("domains[0]")));
        assert!(errors.iter().any(|e| e.contains("domains[1]")));
    }

    #[test]
    fn test_violations_are_aggregated() {
        let mut spec = infoblox_spec(0);
        spec.provider.infoblox.as_mut().unwrap().grid_host = String::new();
        spec.source.hostname_policy = HostnameAnnotationPolicy::Ignore;

        let errors = validate_external_dns(&spec, false).unwrap_err();
        assert!(errors.len() >= 3, "expected aggregated errors: {errors:?}");
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config`

#[cfg(test)]
mod tests {
    use crate::config::OperatorConfig;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::try_parse_from(["extdns"]).unwrap();
        assert_eq!(config.operand_namespace, "external-dns");
        assert_eq!(config.operator_namespace, "external-dns-operator");
        assert!(!config.is_openshift);
        assert!(!config.inject_trusted_ca());
        assert!(config.gcp_project.is_none());
        assert_eq!(config.metrics_port, 8080);
        assert_eq!(config.webhook_port, 9443);
    }

    #[test]
    fn test_flag_overrides() {
        let config = OperatorConfig::try_parse_from([
            "extdns",
            "--operand-namespace",
            "dns-workloads",
            "--is-openshift",
            "--gcp-project",
            "my-project",
            "--trusted-ca-configmap",
            "trusted-ca",
        ])
        .unwrap();
        assert_eq!(config.operand_namespace, "dns-workloads");
        assert!(config.is_openshift);
        assert_eq!(config.gcp_project.as_deref(), Some("my-project"));
        assert!(config.inject_trusted_ca());
        assert_eq!(config.trusted_ca_configmap.as_deref(), Some("trusted-ca"));
    }

    #[test]
    fn test_gov_cloud_detection() {
        let mut config = OperatorConfig::try_parse_from(["extdns"]).unwrap();
        assert!(!config.is_gov_cloud());

        config.aws_region = Some("us-east-1".to_string());
        assert!(!config.is_gov_cloud());

        config.aws_region = Some("us-gov-west-1".to_string());
        assert!(config.is_gov_cloud());
    }
}

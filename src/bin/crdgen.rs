// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the Kubernetes CRD YAML file from the Rust types defined in src/crd.rs.
//! This ensures the YAML file in deploy/crds/ is always in sync with the Rust code.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! The generated file will be written to deploy/crds/ with a proper header.

use extdns::crd::ExternalDNS;
use kube::CustomResourceExt;
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("deploy/crds");

    fs::create_dir_all(output_dir)?;

    println!("Generating CRD YAML from src/crd.rs...");

    let crd = ExternalDNS::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let output_path = output_dir.join("externaldnses.crd.yaml");
    fs::write(&output_path, content)?;

    println!("  ✓ Generated externaldnses.crd.yaml");
    println!("\nNext steps:");
    println!("  1. Review the generated file");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

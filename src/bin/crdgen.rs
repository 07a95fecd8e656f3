// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the Kubernetes CRD YAML file from the Rust type in src/crd.rs.
//! This ensures the YAML in deploy/crds/ is always in sync with the code.
//!
//! Usage:
//!   cargo run --bin crdgen

use kube::CustomResourceExt;
use privatedns::crd::PrivateDNS;
use std::fs;
use std::path::Path;

const HEADER: &str = "# Copyright (c) 2025 the privatedns authors
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

    let crd = PrivateDNS::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    let content = format!("{HEADER}{yaml}");

    let output_path = output_dir.join("privatednses.crd.yaml");
    fs::write(&output_path, content)?;

    println!("  ✓ Generated privatednses.crd.yaml");
    println!("\nDeploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

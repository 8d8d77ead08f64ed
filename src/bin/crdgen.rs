// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates Kubernetes CRD YAML files from the Rust types in src/crd.rs and
//! src/crd/legacy.rs, one file per kind and API group.
//!
//! Usage:
//!   cargo run --bin crdgen
//!
//! Generated files will be written to deploy/crds/ with proper headers.

use kube::{CustomResourceExt, Resource};
use opensearch_operator::constants::{API_GROUP_VERSION, LEGACY_API_GROUP};
use opensearch_operator::crd::{
    legacy, OpenSearchCluster, OpensearchActionGroup, OpensearchRole,
    OpensearchSnapshotPolicy, OpensearchTenant, OpensearchUser,
};
use serde_json::Value;
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

    println!("Generating CRD YAML files from src/crd.rs...");

    generate_crd::<OpenSearchCluster>(output_dir)?;
    generate_crd::<OpensearchUser>(output_dir)?;
    generate_crd::<OpensearchRole>(output_dir)?;
    generate_crd::<OpensearchTenant>(output_dir)?;
    generate_crd::<OpensearchActionGroup>(output_dir)?;
    generate_crd::<OpensearchSnapshotPolicy>(output_dir)?;

    generate_crd::<legacy::OpenSearchCluster>(output_dir)?;
    generate_crd::<legacy::OpensearchUser>(output_dir)?;
    generate_crd::<legacy::OpensearchRole>(output_dir)?;
    generate_crd::<legacy::OpensearchTenant>(output_dir)?;
    generate_crd::<legacy::OpensearchActionGroup>(output_dir)?;
    generate_crd::<legacy::OpensearchSnapshotPolicy>(output_dir)?;

    println!("✓ Successfully generated CRD YAML files in deploy/crds/");
    println!("\nNext steps:");
    println!("  1. Review the generated files");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}

fn generate_crd<T>(output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt + Resource<DynamicType = ()>,
{
    let crd = T::crd();
    let group = T::group(&()).to_string();
    let plural = crd.spec.names.plural.clone();

    let mut crd_json: Value = serde_json::to_value(&crd)?;

    // Legacy-group kinds stay served so existing objects keep working, with a warning
    if group == LEGACY_API_GROUP {
        if let Some(versions) = crd_json["spec"]["versions"].as_array_mut() {
            for version in versions.iter_mut() {
                version["deprecated"] = Value::Bool(true);
                version["deprecationWarning"] = Value::String(format!(
                    "{}/{} is deprecated. Use {API_GROUP_VERSION} instead.",
                    group,
                    T::version(&())
                ));
            }
        }
    }

    let yaml = serde_yaml::to_string(&crd_json)?;
    let content = format!("{COPYRIGHT_HEADER}{yaml}");

    let filename = format!("{group}_{plural}.yaml");
    let output_path = output_dir.join(&filename);
    fs::write(&output_path, content)?;

    println!("  ✓ Generated {filename}");

    Ok(())
}

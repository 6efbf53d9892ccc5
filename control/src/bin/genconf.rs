//! One-shot config generator
//!
//! Lists the Services in a namespace once and renders a config for each,
//! into a directory or to stdout. Useful for seeding an output volume or
//! inspecting what the synchronizer would write, without running it.

use anyhow::{ensure, Context, Result};
use clap::Parser;
use common::artifact;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, ListParams};
use kube::ResourceExt;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "genconf",
    about = "Render proxy configs for every Service in a namespace"
)]
struct Args {
    /// Kubernetes namespace to list Services from
    #[arg(long, default_value = "default")]
    namespace: String,

    /// Directory to write configs into; prints to stdout when omitted
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// Cluster DNS domain suffix for upstream addresses
    #[arg(long, default_value = common::DEFAULT_CLUSTER_DOMAIN)]
    cluster_domain: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();

    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if let Some(dir) = &args.output_path {
        ensure!(
            dir.is_dir(),
            "output path {} is not a directory",
            dir.display()
        );
    }

    // Uses the standard client resolution: kubeconfig outside a cluster,
    // the service account inside one.
    let client = kube::Client::try_default()
        .await
        .context("unable to create the Kubernetes client")?;
    let api: Api<Service> = Api::namespaced(client, &args.namespace);

    let services = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("unable to list services in namespace {}", args.namespace))?;

    let total = services.items.len();
    info!("Found {} services in namespace {}", total, args.namespace);

    for (i, service) in services.iter().enumerate() {
        let name = service.name_any();
        info!("Generating config {} of {} for service {}", i + 1, total, name);

        let body = common::render(&name, &args.namespace, &args.cluster_domain);
        match &args.output_path {
            Some(dir) => {
                let path = dir.join(artifact::active_file_name(&name));
                fs::write(&path, body)
                    .with_context(|| format!("unable to write {}", path.display()))?;
            }
            None => print!("{body}"),
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use control::config::Config;
use control::store::ConfStore;
use control::sync::EventTracker;
use control::{health, reconcile, sync};
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, ListParams};
use kube::ResourceExt;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

/// Service config synchronizer
///
/// Establishes a reconciled baseline from a point-in-time service list,
/// then keeps the output directory converged from the watch stream until
/// shutdown.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (needed for the Kubernetes TLS client)
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok(); // Ignore error if already installed

    tracing_subscriber::fmt::init();

    info!("Starting service config synchronizer");

    let config = Config::from_env();
    info!("   Namespace: {}", config.namespace);
    info!("   Output path: {}", config.out_path.display());
    info!("   Cluster domain: {}", config.cluster_domain);

    let client = kube::Client::try_default()
        .await
        .context("unable to create the Kubernetes client")?;
    let services: Api<Service> = Api::namespaced(client, &config.namespace);

    // Point-in-time listing: both the reconciliation input and the
    // baseline the watcher's first re-list is checked against.
    let snapshot = services
        .list(&ListParams::default())
        .await
        .with_context(|| format!("unable to list services in namespace {}", config.namespace))?;

    let store = ConfStore::new(&config.out_path);
    let names: Vec<String> = snapshot.iter().map(|service| service.name_any()).collect();
    reconcile::run(&store, &config, &names)
        .context("unable to establish the startup baseline")?;

    let tracker = EventTracker::with_baseline(snapshot.items);
    let sync_handle = tokio::spawn(sync::run(services, store, config.clone(), tracker));

    let addr: SocketAddr = config
        .health_listen_addr
        .parse()
        .with_context(|| format!("invalid health listen address {}", config.health_listen_addr))?;

    tokio::select! {
        result = health::serve(addr) => {
            if let Err(e) = result {
                error!("Health endpoint error: {}", e);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    sync_handle.abort();

    Ok(())
}

//! Startup reconciliation
//!
//! One-shot diff-and-correct pass aligning the on-disk config files with
//! a point-in-time service list: configs whose service no longer exists
//! are disabled, and every live service gets a freshly rendered config,
//! whether or not one was already there. Runs to completion before the
//! event synchronizer starts consuming the watch.

use crate::config::Config;
use crate::error::ControlError;
use crate::metrics::record_reconcile_action;
use crate::store::ConfStore;
use std::collections::HashSet;
use tracing::{error, info};

/// Reconcile the store against the authoritative service list.
///
/// Individual write/disable failures are logged and counted but never
/// abort the pass; the affected service heals on its next event or the
/// next restart. Only a failed directory listing is returned, since no
/// safe baseline exists without one.
pub fn run(store: &ConfStore, config: &Config, services: &[String]) -> Result<(), ControlError> {
    let active = store.list_active()?;
    let live: HashSet<&str> = services.iter().map(String::as_str).collect();

    info!(
        "Reconciling {} config files against {} services in namespace {}",
        active.len(),
        services.len(),
        config.namespace
    );

    // Configs with no matching service are renamed, not deleted, so the
    // history of what was served survives on disk.
    for name in &active {
        if live.contains(name.as_str()) {
            continue;
        }
        match store.disable(name) {
            Ok(Some(disabled)) => {
                info!("Disabled orphaned config for service {}: {}", name, disabled);
                record_reconcile_action("disable", "success");
            }
            Ok(None) => {}
            Err(e) => {
                error!("Unable to disable config for service {}: {}", name, e);
                record_reconcile_action("disable", "error");
            }
        }
    }

    // Unconditional regeneration: an existing config for a live service is
    // overwritten with current content rather than skipped.
    for service in services {
        if store.exists(service) {
            info!("Updating config for service {}", service);
        }
        let body = common::render(service, &config.namespace, &config.cluster_domain);
        match store.write(service, &body) {
            Ok(()) => {
                info!("Generated config for service {}", service);
                record_reconcile_action("write", "success");
            }
            Err(e) => {
                error!("Unable to generate config for service {}: {}", service, e);
                record_reconcile_action("write", "error");
            }
        }
    }

    Ok(())
}

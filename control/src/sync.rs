//! Service event synchronizer
//!
//! Long-lived watch loop keeping the config files converged after the
//! startup reconciliation. Raw watcher events are folded into typed
//! service events by an [`EventTracker`], then applied one at a time:
//! events for the same service are serialized by the single stream, and a
//! failed application is logged and dropped (at-most-once), never queued
//! or retried.

use crate::config::Config;
use crate::error::ControlError;
use crate::metrics::{record_service_event, record_watch_error};
use crate::store::ConfStore;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::api::Api;
use kube::runtime::watcher;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::ResourceExt;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Typed service notification, in cluster-observed order
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    Added(Service),
    Updated { old: Service, new: Service },
    Deleted(Service),
}

impl ServiceEvent {
    /// Metrics/log label for the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceEvent::Added(_) => "added",
            ServiceEvent::Updated { .. } => "updated",
            ServiceEvent::Deleted(_) => "deleted",
        }
    }
}

/// Folds raw watcher events into typed [`ServiceEvent`]s.
///
/// Keeps the set of known services so an `Apply` can be split into
/// added/updated, and so a re-list (`Init..InitDone`) can synthesize
/// deletions for known services that vanished while the watch was down.
/// Seeded with the startup snapshot, this makes the watcher's initial
/// re-list agree with the reconciliation baseline: services unchanged
/// since the snapshot surface as updates (log-only), services created in
/// the gap surface as adds, and deletions in the gap are emitted when the
/// re-list completes.
pub struct EventTracker {
    known: HashMap<String, Service>,
    relist: Option<HashSet<String>>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self::with_baseline([])
    }

    /// Tracker seeded with a point-in-time service snapshot
    pub fn with_baseline(services: impl IntoIterator<Item = Service>) -> Self {
        let known = services
            .into_iter()
            .map(|service| (service.name_any(), service))
            .collect();
        Self {
            known,
            relist: None,
        }
    }

    /// Fold one raw watcher event, returning the typed events it implies
    pub fn observe(&mut self, event: watcher::Event<Service>) -> Vec<ServiceEvent> {
        match event {
            watcher::Event::Init => {
                self.relist = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(service) => {
                if let Some(seen) = self.relist.as_mut() {
                    seen.insert(service.name_any());
                }
                self.upsert(service)
            }
            watcher::Event::InitDone => {
                let Some(seen) = self.relist.take() else {
                    return Vec::new();
                };
                let vanished: Vec<String> = self
                    .known
                    .keys()
                    .filter(|name| !seen.contains(*name))
                    .cloned()
                    .collect();
                vanished
                    .into_iter()
                    .filter_map(|name| self.known.remove(&name).map(ServiceEvent::Deleted))
                    .collect()
            }
            watcher::Event::Apply(service) => self.upsert(service),
            watcher::Event::Delete(service) => {
                self.known.remove(&service.name_any());
                vec![ServiceEvent::Deleted(service)]
            }
        }
    }

    fn upsert(&mut self, service: Service) -> Vec<ServiceEvent> {
        match self.known.insert(service.name_any(), service.clone()) {
            Some(old) => vec![ServiceEvent::Updated { old, new: service }],
            None => vec![ServiceEvent::Added(service)],
        }
    }
}

impl Default for EventTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply one typed event to the file store.
///
/// Failures are returned for the caller to log and drop; a failed write
/// heals on the service's next event or the next startup reconciliation.
pub fn apply(store: &ConfStore, config: &Config, event: &ServiceEvent) -> Result<(), ControlError> {
    match event {
        ServiceEvent::Added(service) => {
            let name = service.name_any();
            info!("Discovered a new service: {}", name);

            if store.exists(&name) {
                warn!(
                    "Config file for new service {} already exists and is going to be re-written",
                    name
                );
            }

            let namespace = service
                .namespace()
                .unwrap_or_else(|| config.namespace.clone());
            store.write(&name, &common::render(&name, &namespace, &config.cluster_domain))?;
            info!("Generated config for service {}", name);
            Ok(())
        }
        ServiceEvent::Deleted(service) => {
            let name = service.name_any();
            info!("Service has been deleted: {}", name);

            if !store.delete(&name)? {
                warn!("No config file exists for deleted service {}", name);
                return Ok(());
            }
            info!("Removed config file for deleted service {}", name);
            Ok(())
        }
        ServiceEvent::Updated { old, new } => {
            // Known limitation: updates are observed but never re-render
            // or rename the artifact. Only a service's name and existence
            // drive the files; a rename reaches us as delete+add of
            // distinct keys.
            info!(
                "Service {} has changed to {}",
                old.name_any(),
                new.name_any()
            );
            Ok(())
        }
    }
}

/// Consume the service watch until the task is cancelled.
///
/// Watch stream errors are logged and counted; the stream re-lists and
/// resumes on its own, and the tracker turns each re-list back into the
/// minimal set of typed events.
pub async fn run(api: Api<Service>, store: ConfStore, config: Config, mut tracker: EventTracker) {
    let stream = watcher(api, WatcherConfig::default());
    futures::pin_mut!(stream);

    info!(
        "Starting service watcher for namespace {}",
        config.namespace
    );

    while let Some(event) = stream.next().await {
        match event {
            Ok(event) => {
                if matches!(event, watcher::Event::InitDone) {
                    debug!("Service watcher sync complete");
                }
                for service_event in tracker.observe(event) {
                    let kind = service_event.kind();
                    match apply(&store, &config, &service_event) {
                        Ok(()) => record_service_event(kind, "success"),
                        Err(e) => {
                            warn!("Failed to apply {} event: {}", kind, e);
                            record_service_event(kind, "error");
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Service watcher error: {}", e);
                record_watch_error();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::fs;
    use tempfile::TempDir;

    fn service(name: &str, namespace: &str) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn fixture() -> (TempDir, ConfStore, Config) {
        let dir = TempDir::new().expect("should create temp dir");
        let store = ConfStore::new(dir.path());
        let config = Config {
            out_path: dir.path().to_path_buf(),
            ..Config::default()
        };
        (dir, store, config)
    }

    #[test]
    fn test_tracker_splits_apply_into_added_and_updated() {
        let mut tracker = EventTracker::new();

        let events = tracker.observe(watcher::Event::Apply(service("checkout", "default")));
        assert!(matches!(events.as_slice(), [ServiceEvent::Added(_)]));

        let events = tracker.observe(watcher::Event::Apply(service("checkout", "default")));
        assert!(matches!(events.as_slice(), [ServiceEvent::Updated { .. }]));
    }

    #[test]
    fn test_tracker_relist_agrees_with_baseline() {
        let mut tracker = EventTracker::with_baseline([
            service("a", "default"),
            service("b", "default"),
        ]);

        assert!(tracker.observe(watcher::Event::Init).is_empty());

        // a survived the gap: update, not a redundant add
        let events = tracker.observe(watcher::Event::InitApply(service("a", "default")));
        assert!(matches!(events.as_slice(), [ServiceEvent::Updated { .. }]));

        // c appeared during the gap: add
        let events = tracker.observe(watcher::Event::InitApply(service("c", "default")));
        assert!(matches!(events.as_slice(), [ServiceEvent::Added(_)]));

        // b vanished during the gap: deletion synthesized at re-list end
        let events = tracker.observe(watcher::Event::InitDone);
        match events.as_slice() {
            [ServiceEvent::Deleted(deleted)] => assert_eq!(deleted.name_any(), "b"),
            other => panic!("expected one synthesized deletion, got {:?}", other.len()),
        }
    }

    #[test]
    fn test_tracker_delete_forgets_service() {
        let mut tracker = EventTracker::with_baseline([service("a", "default")]);

        let events = tracker.observe(watcher::Event::Delete(service("a", "default")));
        assert!(matches!(events.as_slice(), [ServiceEvent::Deleted(_)]));

        // a later add for the same name starts fresh
        let events = tracker.observe(watcher::Event::Apply(service("a", "default")));
        assert!(matches!(events.as_slice(), [ServiceEvent::Added(_)]));
    }

    #[test]
    fn test_added_writes_rendered_config() {
        let (_dir, store, config) = fixture();

        apply(&store, &config, &ServiceEvent::Added(service("checkout", "default")))
            .expect("should apply");

        let content =
            fs::read_to_string(store.active_path("checkout")).expect("should read back");
        assert!(content.contains("location /checkout {"));
        assert!(content.contains("checkout.default.svc.cluster.local"));
    }

    #[test]
    fn test_added_prefers_service_namespace() {
        let (_dir, store, config) = fixture();

        apply(&store, &config, &ServiceEvent::Added(service("api", "staging")))
            .expect("should apply");

        let content = fs::read_to_string(store.active_path("api")).expect("should read back");
        assert!(content.contains("api.staging.svc.cluster.local"));
    }

    #[test]
    fn test_add_then_delete_converges() {
        let (dir, store, config) = fixture();

        apply(&store, &config, &ServiceEvent::Added(service("x", "default")))
            .expect("should add");
        assert!(store.exists("x"));

        apply(&store, &config, &ServiceEvent::Deleted(service("x", "default")))
            .expect("should delete");

        // removed outright: no active file, no disabled copy
        assert!(!store.exists("x"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unknown_delete_is_noop() {
        let (dir, store, config) = fixture();

        apply(&store, &config, &ServiceEvent::Deleted(service("ghost", "default")))
            .expect("should not error");

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_update_leaves_artifact_untouched() {
        let (dir, store, config) = fixture();

        apply(&store, &config, &ServiceEvent::Added(service("old-name", "default")))
            .expect("should add");
        let before = fs::read_to_string(store.active_path("old-name")).expect("should read");

        apply(
            &store,
            &config,
            &ServiceEvent::Updated {
                old: service("old-name", "default"),
                new: service("new-name", "default"),
            },
        )
        .expect("should apply");

        // log-only: the old artifact is unchanged and no new one appears
        let after = fs::read_to_string(store.active_path("old-name")).expect("should read");
        assert_eq!(before, after);
        assert!(!store.exists("new-name"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

//! Config file store
//!
//! Single source of truth for which configs currently exist. All
//! operations are blocking filesystem calls against one output directory;
//! failures surface to the caller and are never retried here.

use crate::error::ControlError;
use chrono::Local;
use common::artifact;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Store of per-service config files in the output directory
#[derive(Debug, Clone)]
pub struct ConfStore {
    root: PathBuf,
}

impl ConfStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the active artifact for a service
    pub fn active_path(&self, service: &str) -> PathBuf {
        self.root.join(artifact::active_file_name(service))
    }

    /// Whether an active artifact exists for a service
    pub fn exists(&self, service: &str) -> bool {
        self.active_path(service).is_file()
    }

    /// Names of all services currently backed by an active artifact.
    ///
    /// Sub-directories and disabled files are excluded; the final file
    /// extension is stripped to recover the service name.
    pub fn list_active(&self) -> Result<Vec<String>, ControlError> {
        let list_err = |source| ControlError::ListConfigs {
            path: self.root.clone(),
            source,
        };

        let mut services = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            if entry.file_type().map_err(list_err)?.is_dir() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                debug!("Skipping non-UTF-8 file name in {}", self.root.display());
                continue;
            };
            if artifact::is_disabled(name) {
                continue;
            }

            if let Some(service) = artifact::service_name(name) {
                services.push(service);
            }
        }

        Ok(services)
    }

    /// Create or truncate the active artifact for a service. Overwrites
    /// silently; the caller decides whether an overwrite is log-worthy.
    pub fn write(&self, service: &str, content: &str) -> Result<(), ControlError> {
        fs::write(self.active_path(service), content).map_err(|source| {
            ControlError::WriteConfig {
                service: service.to_string(),
                source,
            }
        })
    }

    /// Rename the active artifact to its timestamped disabled form.
    ///
    /// Returns the new file name, or `None` (logged) when no active
    /// artifact exists. Disabling is one-way; the renamed file is never
    /// touched again.
    pub fn disable(&self, service: &str) -> Result<Option<String>, ControlError> {
        if !self.exists(service) {
            warn!("No active config to disable for service {}", service);
            return Ok(None);
        }

        let disabled = artifact::disabled_file_name(service, Local::now());
        fs::rename(self.active_path(service), self.root.join(&disabled)).map_err(|source| {
            ControlError::DisableConfig {
                service: service.to_string(),
                source,
            }
        })?;

        Ok(Some(disabled))
    }

    /// Remove the active artifact outright. Returns `false` when there is
    /// nothing to remove.
    pub fn delete(&self, service: &str) -> Result<bool, ControlError> {
        if !self.exists(service) {
            return Ok(false);
        }

        fs::remove_file(self.active_path(service)).map_err(|source| {
            ControlError::RemoveConfig {
                service: service.to_string(),
                source,
            }
        })?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ConfStore) {
        let dir = TempDir::new().expect("should create temp dir");
        let store = ConfStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_write_then_list() {
        let (_dir, store) = store();

        store.write("checkout", "body").expect("should write");
        store.write("cart", "body").expect("should write");

        let mut active = store.list_active().expect("should list");
        active.sort();
        assert_eq!(active, vec!["cart".to_string(), "checkout".to_string()]);
    }

    #[test]
    fn test_list_excludes_dirs_and_disabled() {
        let (dir, store) = store();

        store.write("checkout", "body").expect("should write");
        fs::create_dir(dir.path().join("subdir")).expect("should create dir");
        fs::write(
            dir.path().join("old.conf.20240307164509.disabled"),
            "stale",
        )
        .expect("should write disabled file");

        let active = store.list_active().expect("should list");
        assert_eq!(active, vec!["checkout".to_string()]);
    }

    #[test]
    fn test_list_fails_on_missing_root() {
        let store = ConfStore::new("/nonexistent/confsout");

        assert!(store.list_active().is_err());
    }

    #[test]
    fn test_write_overwrites() {
        let (_dir, store) = store();

        store.write("checkout", "first").expect("should write");
        store.write("checkout", "second").expect("should overwrite");

        let content =
            fs::read_to_string(store.active_path("checkout")).expect("should read back");
        assert_eq!(content, "second");
    }

    #[test]
    fn test_disable_renames_with_timestamp() {
        let (dir, store) = store();

        store.write("checkout", "body").expect("should write");
        let disabled = store
            .disable("checkout")
            .expect("should disable")
            .expect("should rename something");

        assert!(disabled.starts_with("checkout.conf."));
        assert!(disabled.ends_with(".disabled"));
        let stamp = disabled
            .trim_start_matches("checkout.conf.")
            .trim_end_matches(".disabled");
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));

        assert!(!store.exists("checkout"));
        assert!(dir.path().join(&disabled).is_file());
        let content = fs::read_to_string(dir.path().join(&disabled)).expect("should read back");
        assert_eq!(content, "body");
    }

    #[test]
    fn test_disable_missing_is_noop() {
        let (dir, store) = store();

        let disabled = store.disable("ghost").expect("should not error");

        assert!(disabled.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_delete_removes_file() {
        let (dir, store) = store();

        store.write("checkout", "body").expect("should write");
        assert!(store.delete("checkout").expect("should delete"));

        assert!(!store.exists("checkout"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_delete_missing_reports_nothing_removed() {
        let (_dir, store) = store();

        assert!(!store.delete("ghost").expect("should not error"));
    }
}

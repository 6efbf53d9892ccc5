//! Artifact naming rules
//!
//! One config file per Service. An active artifact is `<service>.conf`;
//! when its Service disappears the file is renamed, not deleted, to
//! `<service>.conf.<timestamp>.disabled` so history survives. Disabled
//! artifacts are terminal: nothing re-enables or rewrites them.

use chrono::{DateTime, Local};
use std::path::Path;

/// Extension of an active config file
pub const CONF_FILE_EXT: &str = "conf";

/// Extension marking a disabled (retired) config file
pub const DISABLED_FILE_EXT: &str = "disabled";

/// Timestamp format embedded in disabled file names (yyyyMMddHHmmss).
/// Second precision keeps names unique and chronologically sortable even
/// when the same service is disabled repeatedly.
const DISABLED_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// File name of the active artifact for a service
pub fn active_file_name(service: &str) -> String {
    format!("{service}.{CONF_FILE_EXT}")
}

/// File name the active artifact is renamed to when disabled at `at`
pub fn disabled_file_name(service: &str, at: DateTime<Local>) -> String {
    format!(
        "{}.{}.{}",
        active_file_name(service),
        at.format(DISABLED_TIMESTAMP_FORMAT),
        DISABLED_FILE_EXT
    )
}

/// Whether a directory entry name carries the disabled extension
pub fn is_disabled(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext == DISABLED_FILE_EXT)
}

/// Recover the service name from an active artifact's file name by
/// stripping the final extension (`checkout.conf` -> `checkout`).
pub fn service_name(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name).file_stem()?;
    let stem = stem.to_str()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

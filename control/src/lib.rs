//! Service config synchronizer control plane
//!
//! Watches Kubernetes Services in one namespace and keeps a directory of
//! per-service reverse-proxy config files in sync with cluster state:
//! a full reconciliation at startup, then incremental application of
//! watch events.

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod reconcile;
pub mod store;
pub mod sync;

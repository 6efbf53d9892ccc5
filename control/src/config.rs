//! Configuration for the synchronizer
//!
//! Built once at startup from environment variables and passed by
//! reference into the reconciler and the event synchronizer, so call
//! sites never consult the environment themselves.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::warn;

const ENV_NAMESPACE: &str = "WORKING_NAMESPACE";
const ENV_CONF_OUT_PATH: &str = "CONFS_OUTPUT_PATH";
const ENV_CLUSTER_DOMAIN: &str = "CLUSTER_DOMAIN";
const ENV_HEALTH_LISTEN_ADDR: &str = "HEALTH_LISTEN_ADDR";

/// Synchronizer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Namespace whose Services are watched
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Directory the config files are materialized into
    #[serde(default = "default_out_path")]
    pub out_path: PathBuf,

    /// Cluster DNS domain suffix for upstream addresses
    #[serde(default = "default_cluster_domain")]
    pub cluster_domain: String,

    /// Listen address for the health/metrics endpoint
    #[serde(default = "default_health_listen_addr")]
    pub health_listen_addr: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_out_path() -> PathBuf {
    PathBuf::from("/confsout")
}

fn default_cluster_domain() -> String {
    common::DEFAULT_CLUSTER_DOMAIN.to_string()
}

fn default_health_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            out_path: default_out_path(),
            cluster_domain: default_cluster_domain(),
            health_listen_addr: default_health_listen_addr(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, warning on every
    /// fallback to a default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        match env::var(ENV_NAMESPACE) {
            Ok(val) if !val.is_empty() => config.namespace = val,
            _ => warn!(
                "The {} env var is not set, falling back to \"{}\" namespace",
                ENV_NAMESPACE, config.namespace
            ),
        }

        match env::var(ENV_CONF_OUT_PATH) {
            Ok(val) if !val.is_empty() => config.out_path = PathBuf::from(val),
            _ => warn!(
                "The {} env var is not set, falling back to \"{}\" path",
                ENV_CONF_OUT_PATH,
                config.out_path.display()
            ),
        }

        if let Ok(val) = env::var(ENV_CLUSTER_DOMAIN) {
            if !val.is_empty() {
                config.cluster_domain = val;
            }
        }

        if let Ok(val) = env::var(ENV_HEALTH_LISTEN_ADDR) {
            if !val.is_empty() {
                config.health_listen_addr = val;
            }
        }

        config
    }
}

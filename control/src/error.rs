use std::path::PathBuf;
use thiserror::Error;

/// Control plane errors
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),

    #[error("unable to list config files in {path}: {source}")]
    ListConfigs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write config for service {service}: {source}")]
    WriteConfig {
        service: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to disable config for service {service}: {source}")]
    DisableConfig {
        service: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to remove config for service {service}: {source}")]
    RemoveConfig {
        service: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

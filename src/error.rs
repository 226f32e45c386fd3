use std::path::PathBuf;

use thiserror::Error;

/// Errors from the one-shot Mage search call.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("mage returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("mage request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Everything that can abort a deploy run. Each variant carries enough
/// identity (manifest, namespace, status) to diagnose by hand; there is no
/// retry or rollback anywhere.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("template error in {path}: {detail}")]
    Templating { path: PathBuf, detail: String },

    #[error("failed to read manifest {path}: {source}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest {manifest} is not valid YAML: {source}")]
    ParseManifest {
        manifest: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to apply {manifest} in namespace {namespace}: {detail}")]
    Apply {
        manifest: String,
        namespace: String,
        detail: String,
    },

    #[error("apply of {manifest} in namespace {namespace} timed out after {seconds}s")]
    ApplyTimeout {
        manifest: String,
        namespace: String,
        seconds: u64,
    },

    #[error(transparent)]
    Http(#[from] HttpError),
}

impl DeployError {
    pub fn apply(manifest: &str, namespace: &str, err: kube::Error) -> Self {
        DeployError::Apply {
            manifest: manifest.to_owned(),
            namespace: namespace.to_owned(),
            detail: err.to_string(),
        }
    }
}

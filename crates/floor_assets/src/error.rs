use std::{fmt::Debug, path::PathBuf};

use floor_scene::SceneError;
use nom::Err;
use nom::error::VerboseError;
use thiserror::Error;

/// Failures of the `.plat` container format itself.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("unrecognized file")]
    UnrecognizedFile,
    #[error("unsupported version {0}.{1}")]
    UnsupportedVersion(u16, u16),
    #[error("corrupt file: {0}")]
    Corrupt(&'static str),
    #[error("parsing error: {0}")]
    Nom(String),
    #[error("inflating entry '{name}'")]
    Decompress {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding object '{name}'")]
    Deserialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("object graph is malformed")]
    Prefab(#[from] SceneError),
}

impl<T: Debug> From<Err<VerboseError<T>>> for BundleError {
    fn from(err: Err<VerboseError<T>>) -> Self {
        match err {
            Err::Incomplete(_) => BundleError::Corrupt("truncated"),
            Err::Error(err) | Err::Failure(err) => BundleError::Nom(format!("{:?}", err)),
        }
    }
}

/// Why a single bundle file did not become a platform.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("'{0}' does not exist")]
    NotFound(PathBuf),
    #[error("bundle could not be parsed")]
    ParseFailure(#[source] BundleError),
    #[error("bundle has no asset named '{0}'")]
    MissingAsset(String),
    #[error("no platform descriptor found, neither current nor legacy")]
    InvalidFormat,
    #[error("reading bundle bytes")]
    IoFailure(#[from] std::io::Error),
    #[error("bundle backend dropped the request without answering")]
    Abandoned,
}

/// Failures of explicit catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("same content as already loaded '{existing}' ({hash})")]
    Duplicate { existing: String, hash: String },
    #[error("platform directory I/O")]
    Io(#[from] std::io::Error),
    #[error("catalog build task did not finish")]
    Interrupted(#[source] tokio::task::JoinError),
}

/// Renders an error with its whole `source` chain on one line, for logs.
pub fn describe(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

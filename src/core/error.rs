//! Error types for plan construction.
//!
//! Every failure surfaces before a graph leaves the builder: configuration
//! problems, dangling references, duplicate logical ids, cycles and platform
//! limits are all reported here rather than at apply time.

use super::parser::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing, validating, building or persisting a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// One or more configuration checks failed.
    #[error("{} validation error(s): {}", .0.len(), join_messages(.0))]
    Config(Vec<ValidationError>),

    /// A resource refers to a logical id the graph does not contain.
    #[error("resource '{from}' references unknown resource '{to}'")]
    Reference { from: String, to: String },

    /// An operation named a logical id that was never registered.
    #[error("no resource registered under '{0}'")]
    UnknownResource(String),

    /// Two resources were registered under the same logical id.
    #[error("duplicate logical id '{0}'")]
    DuplicateResource(String),

    #[error("dependency cycle detected involving: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// An IAM role exceeds a platform size or count limit.
    #[error("policy limit exceeded for role '{role}': {detail}")]
    PolicyLimit { role: String, detail: String },

    /// A pool pairs an instance shape with an image for another CPU architecture.
    #[error("pool '{pool}': shape {shape} ({shape_arch}) cannot boot image {image} ({image_arch})")]
    ArchitectureMismatch {
        pool: String,
        shape: String,
        shape_arch: String,
        image: String,
        image_arch: String,
    },

    /// The requested subnet layout does not fit the VPC range.
    #[error("network layout: {0}")]
    Network(String),

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for plan construction.
pub type Result<T> = std::result::Result<T, PlanError>;

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PlanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the OpenSearch operator.
//!
//! Every failure a reconcile pass can hit is an [`Error`]. Callers rarely match on the
//! variants directly; they ask for [`Error::kind`], which folds everything onto the
//! closed set of [`ErrorKind`]s the controllers know how to react to:
//!
//! - [`ErrorKind::NotFound`] - the object is gone, usually benign
//! - [`ErrorKind::Conflict`] - optimistic-concurrency loss or a racing creator
//! - [`ErrorKind::Transient`] - retried with backoff
//! - [`ErrorKind::Unsupported`] - a configuration that cannot be honoured, not retried

use thiserror::Error;

/// Closed set of error classes the reconcilers react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Transient,
    Unsupported,
}

/// Errors raised while reconciling OpenSearch resources.
#[derive(Error, Debug)]
pub enum Error {
    /// The object does not exist (HTTP 404)
    #[error("{kind} '{namespace}/{name}' not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Namespace of the missing object
        namespace: String,
        /// Name of the missing object
        name: String,
    },

    /// Optimistic-concurrency loss or the object already exists (HTTP 409)
    #[error("conflict writing {kind} '{namespace}/{name}'")]
    Conflict {
        /// Kind of the conflicting object
        kind: String,
        /// Namespace of the conflicting object
        namespace: String,
        /// Name of the conflicting object
        name: String,
    },

    /// Any other Kubernetes API failure
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),

    /// The search engine rejected a request or was unreachable
    #[error("OpenSearch API error at {endpoint}: {reason}")]
    Engine {
        /// Base URL of the engine
        endpoint: String,
        /// What went wrong
        reason: String,
    },

    /// Certificate or key generation failed
    #[error("certificate generation failed: {0}")]
    Certificate(String),

    /// An object could not be converted to or from JSON/YAML
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The descriptor asks for something the operator cannot do
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// The controller is shutting down
    #[error("reconcile cancelled by shutdown")]
    Cancelled,
}

impl Error {
    /// Classify this error onto the closed [`ErrorKind`] set.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Kube(_)
            | Error::Engine { .. }
            | Error::Certificate(_)
            | Error::Serialization(_)
            | Error::Cancelled => ErrorKind::Transient,
        }
    }

    /// Build a not-found error.
    pub fn not_found(kind: &str, namespace: &str, name: &str) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Build a conflict error.
    pub fn conflict(kind: &str, namespace: &str, name: &str) -> Self {
        Error::Conflict {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Build an engine error.
    pub fn engine(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Engine {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Translate a raw Kubernetes API error for a specific object.
    ///
    /// 404 becomes [`Error::NotFound`], 409 becomes [`Error::Conflict`], anything else is
    /// kept as a transient [`Error::Kube`].
    pub fn from_kube(err: kube::Error, kind: &str, namespace: &str, name: &str) -> Self {
        match &err {
            kube::Error::Api(ae) if ae.code == 404 => Error::not_found(kind, namespace, name),
            kube::Error::Api(ae) if ae.code == 409 => Error::conflict(kind, namespace, name),
            _ => Error::Kube(err),
        }
    }

    /// Whether this is a not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether this is a conflict error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        Error::from_kube(err, "object", "", "")
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<rcgen::Error> for Error {
    fn from(err: rcgen::Error) -> Self {
        Error::Certificate(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;

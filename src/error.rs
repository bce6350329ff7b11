//! Errors.
//!
//! Structural and pool errors are always fatal: they point at a bug in a component or in the
//! lifecycle of pooled objects. Component errors are whatever a component callback returned and
//! are passed through untouched.

use crate::arena::GenIndex;
use std::error::Error as StdError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    /// A component callback failed.
    #[error("{component} failed in {callback}: {source}")]
    Component {
        component: String,
        callback: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("layout failed: {0}")]
    Layout(String),
}

impl Error {
    /// Wraps an error returned from a component callback.
    pub fn component<E>(component: impl Into<String>, callback: &'static str, source: E) -> Error
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error::Component {
            component: component.into(),
            callback,
            source: source.into(),
        }
    }
}

/// Errors in the shape or configuration of a component tree, detected while building it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("{component}: `{property}` cannot be combined with `{conflicts_with}`")]
    ConflictingProperty {
        component: String,
        property: &'static str,
        conflicts_with: &'static str,
    },

    #[error("{component}: `{property}` may only be set on the root node")]
    RootOnlyProperty {
        component: String,
        property: &'static str,
    },

    #[error("{component} does not implement `{callback}`")]
    MissingCallback {
        component: String,
        callback: &'static str,
    },

    #[error("{component}: tree level {level} exceeds the maximum of {max}")]
    LevelOverflow {
        component: String,
        level: usize,
        max: usize,
    },

    #[error("{component}: output sequence {sequence} exceeds the maximum of {max}")]
    SequenceOverflow {
        component: String,
        sequence: usize,
        max: usize,
    },

    #[error("{component}: lifecycle id {lifecycle} does not fit in an output id (max {max})")]
    TooManyLifecycles {
        component: String,
        lifecycle: u32,
        max: u32,
    },
}

/// Misuse of pooled objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("node {0:?} released while still attached to a parent")]
    ReleasedAttachedNode(GenIndex),

    #[error("node {0:?} released while it still has children")]
    ReleasedNodeWithChildren(GenIndex),

    #[error("node {0:?} is already attached to a parent")]
    AlreadyAttached(GenIndex),

    /// The handle refers to a node that was already released (double release or use after
    /// release).
    #[error("node handle {0:?} is stale")]
    StaleHandle(GenIndex),
}

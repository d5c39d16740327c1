//! Core error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::NodeId;

/// Errors raised by document operations.
///
/// The scanner swallows these per node; they only surface through the
/// annotator and direct document manipulation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Why a UUID could not be turned into an entity.
///
/// Carried on failure-shaped `ResolvedEntity` values instead of being raised.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ResolutionFailure {
    #[error("Authority unreachable: {0}")]
    Unreachable(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Authority returned HTTP {status}")]
    Http { status: u16 },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("No authority configured")]
    Unavailable,
}

impl ResolutionFailure {
    /// Short text shown in place of an entity name.
    pub fn display_name(&self) -> String {
        let reason = match self {
            Self::Unreachable(_) => "authority unreachable".to_string(),
            Self::Unauthenticated => "not authenticated".to_string(),
            Self::Unauthorized => "not authorized".to_string(),
            Self::NotFound => "not found".to_string(),
            Self::Http { status } => format!("HTTP {}", status),
            Self::Malformed(_) => "unexpected response".to_string(),
            Self::Unavailable => "no authority".to_string(),
        };
        format!("Unresolved ({})", reason)
    }
}

/// Entity type name that is not part of the closed set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown entity type: {0}")]
pub struct UnknownEntityType(pub String);

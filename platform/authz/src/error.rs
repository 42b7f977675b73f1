use thiserror::Error;

use crate::model::{Action, Resource};

/// Policy misconfiguration detected while building a catalog.
///
/// Decision functions never produce these; they only surface at startup.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unknown role `{role}` in {entry}")]
    UnknownRole { role: String, entry: String },
    #[error("unknown resource `{resource}` in grants")]
    UnknownResource { resource: String },
    #[error("unknown action `{action}` under resource `{resource}`")]
    UnknownAction { resource: String, action: String },
    #[error("grant {resource}.{action} is declared more than once")]
    DuplicateGrant { resource: Resource, action: Action },
    #[error("route `{route}` is declared more than once")]
    DuplicateRoute { route: String },
    #[error("invalid route `{route}`: {reason}")]
    InvalidRoute { route: String, reason: &'static str },
    #[error("malformed policy document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read policy file `{path}`")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("no instance variable block found in header")]
    MissingIvarBlock,
    #[error("malformed instance variable declaration '{0}'")]
    MalformedIvar(String),
    #[error("instance variable block is empty")]
    NoIvars,
    #[error("anchor '{anchor}' not found in {target}")]
    MissingAnchor {
        anchor: String,
        target: &'static str,
    },
}

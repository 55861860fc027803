//! Extracting instance variables from `@interface` headers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::errors::DomainError;
use crate::domain::model::{InterfaceDecl, Ivar, Ownership};

static IVAR_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^.*\{(.*)\}.*$").expect("valid ivar block regex"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Parse the ivar block of a header.
///
/// The block runs from the last `{` that still has a closing `}` after it up to the final `}` in
/// the file. Declarations are split on `;`; a `*` anywhere marks the ivar as retained.
pub fn parse_interface(header: &str) -> Result<InterfaceDecl, DomainError> {
    let block = IVAR_BLOCK
        .captures(header)
        .and_then(|caps| caps.get(1))
        .ok_or(DomainError::MissingIvarBlock)?
        .as_str();

    let ivars = block
        .split(';')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(parse_ivar)
        .collect::<Result<Vec<_>, _>>()?;

    if ivars.is_empty() {
        return Err(DomainError::NoIvars);
    }

    tracing::debug!(count = ivars.len(), "parsed ivar block");
    Ok(InterfaceDecl { ivars })
}

fn parse_ivar(declaration: &str) -> Result<Ivar, DomainError> {
    let ownership = if declaration.contains('*') {
        Ownership::Retain
    } else {
        Ownership::Assign
    };

    let stripped = declaration.replace('*', " ");
    let normalized = WHITESPACE.replace_all(stripped.trim(), " ");
    let (ctype, name) = normalized
        .rsplit_once(' ')
        .ok_or_else(|| DomainError::MalformedIvar(declaration.to_owned()))?;

    Ok(Ivar::new(ctype, name, ownership))
}

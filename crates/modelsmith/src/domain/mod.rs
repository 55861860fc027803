//! Core domain types for models and generated declarations.

pub mod errors;
pub mod model;

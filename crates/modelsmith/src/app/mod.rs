//! Application layer parsing headers and generating accessor boilerplate.

pub mod parse;
pub mod pimp;
pub mod render;

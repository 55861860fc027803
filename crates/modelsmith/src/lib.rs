pub mod app;
pub mod domain;
pub mod infra;

pub use domain::model::Model;

pub fn init(verbose: bool) {
    infra::logging::init(verbose);
}

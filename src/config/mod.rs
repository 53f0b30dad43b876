//! Configuration loading: TOML file plus environment secrets

pub mod settings;

pub use settings::*;

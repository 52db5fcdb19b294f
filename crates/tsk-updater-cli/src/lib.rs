//! CLI library components for the TechnicalSketcher updater.

pub mod logging;
pub mod settings;
pub mod summary;

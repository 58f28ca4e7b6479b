//! Command-line shell around the batch controller.
mod app;
mod cli;
mod config;
mod console;
mod logging;
mod prompt;

pub use app::run_app;

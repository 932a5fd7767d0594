pub mod cli;
pub mod load_config;
pub mod logging;
pub mod progress;

pub use cli::{render_error, render_summary, run, Cli};

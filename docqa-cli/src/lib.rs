//! # docqa-cli
//!
//! The `docqa` command: ingest documents into an index, then ask questions
//! answered from that index by a Gemini model.

pub mod cli;
pub mod commands;
pub mod telemetry;

pub use cli::{Cli, Commands, LogFormat};
pub use commands::{exit_code, run};

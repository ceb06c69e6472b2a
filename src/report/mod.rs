//! Report rendering modules.

pub mod generator;

pub use generator::{generate_json_report, generate_text_report};

//! The fetch-and-aggregate traversal.
//!
//! This module provides the traversal that turns a template list and
//! per-template answer fetches into a single aggregate report.

pub mod aggregator;

pub use aggregator::{Aggregator, NoProgress, Progress, TemplateSource};

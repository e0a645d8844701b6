//! Report output.
//!
//! [`generator`] renders document analyses; [`narrative`] produces
//! model-written financial reports from caller data.

pub mod generator;
pub mod narrative;

pub use generator::{generate_json_report, generate_markdown_report};
pub use narrative::ReportGenerator;

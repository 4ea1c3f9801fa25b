//! `jira-export` writes the issues of one Jira project to HTML and PDF files,
//! together with their comments and attachments.

/// Settings file loading, defaulting and validation.
pub mod config;
/// Markup-to-HTML conversion through pandoc.
pub mod convert;
/// Pagination over the project and the per-issue export sinks.
pub mod export;
/// Jira API client and issue data models.
pub mod jira;
/// Logging helpers used throughout the crate.
pub mod logging;
/// Image source rewriting for exported pages.
pub mod markup;
/// HTML-to-PDF rendering through wkhtmltopdf.
pub mod pdf;
/// Interactive confirmation before an export starts.
pub mod prompt;
/// HTML composition for a single issue.
pub mod render;
/// Subprocess helpers shared by the external tools.
pub mod tool;

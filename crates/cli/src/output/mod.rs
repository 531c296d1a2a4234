//! Terminal output for run summaries

mod formatter;

pub use formatter::Formatter;

/// Output settings shared by all terminal messages
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Disable colored output
    pub no_color: bool,
    /// Only print errors
    pub quiet: bool,
}

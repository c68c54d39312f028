//! Output sinks for synthesized ladder programs.
//!
//! - [`csv`] - GX Works2 "Read from CSV File" spreadsheet and device comments
//! - [`render`] - ASCII ladder diagram
//!
//! Both modules only consume finished IL or IR; nothing here feeds back into
//! synthesis.

pub mod csv;
pub mod render;

pub use crate::csv::{device_comments, to_csv, write_csv, CsvOptions};
pub use render::{render_device_table, render_text};

/// Errors raised while writing export files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Failed to write the output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to format a spreadsheet record.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

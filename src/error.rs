use std::path::PathBuf;

/// Errors raised while extracting chat history and writing HTML archives.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Target file already exists: {}", .path.display())]
    Conflict { path: PathBuf },

    #[error("Malformed message markup: {source}")]
    Markup {
        #[source]
        source: roxmltree::Error,
    },

    #[error("Query result has no `{column}` column")]
    MissingColumn { column: &'static str },

    #[error("No unambiguous local midnight on January 1st of {year}")]
    InvalidYear { year: i32 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<roxmltree::Error> for ExportError {
    fn from(source: roxmltree::Error) -> Self {
        ExportError::Markup { source }
    }
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;

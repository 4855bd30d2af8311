use thiserror::Error;

pub type Result<T> = std::result::Result<T, MigrationError>;

/// What kind of legacy id a dangling reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Actor,
    Writer,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Actor => write!(f, "actor"),
            ReferenceKind::Writer => write!(f, "writer"),
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Malformed source data in film {film_id} ({field}): {reason}")]
    MalformedSourceData {
        film_id: String,
        field: &'static str,
        reason: String,
    },

    #[error("Film {film_id} references {kind} id {id} with no name entry")]
    DanglingReference {
        kind: ReferenceKind,
        id: String,
        film_id: String,
    },

    #[error("Failed to write {rows} rows into {table}: {source}")]
    WriteFailure {
        table: &'static str,
        rows: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("Target transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("Source query failed: {0}")]
    Source(#[from] sqlx::Error),

    #[error("Failed to dump normalized dataset: {0}")]
    Dump(String),
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::Dump(err.to_string())
    }
}

impl From<std::io::Error> for MigrationError {
    fn from(err: std::io::Error) -> Self {
        MigrationError::Dump(err.to_string())
    }
}

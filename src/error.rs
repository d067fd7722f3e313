use thiserror::Error;

/// What was wrong with a record checked against its kind contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaProblem {
    /// A required field is absent (or explicitly null)
    MissingField,
    /// A field is present but has the wrong JSON type
    TypeMismatch,
    /// A numeric field is outside its declared range
    OutOfRange,
}

impl std::fmt::Display for SchemaProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaProblem::MissingField => write!(f, "missing field"),
            SchemaProblem::TypeMismatch => write!(f, "type mismatch"),
            SchemaProblem::OutOfRange => write!(f, "value out of range"),
        }
    }
}

/// A record that does not satisfy the contract of its node or edge kind.
///
/// Always recoverable: callers skip the record and keep going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {problem} `{field}`")]
pub struct SchemaError {
    /// Display name of the node or edge kind, e.g. `Page` or `CONTAINS`
    pub kind: String,
    pub problem: SchemaProblem,
    pub field: String,
}

impl SchemaError {
    pub fn new(kind: impl Into<String>, problem: SchemaProblem, field: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            problem,
            field: field.into(),
        }
    }
}

/// Main error type for SiteGraph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Record failed schema validation
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A background build task panicked or was cancelled
    #[error("Build task failed: {0}")]
    Task(String),
}

/// Convenient Result type using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

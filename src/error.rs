//! Error types for schema projection, emission and the reference runtime

use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Codegen errors
///
/// Everything except the IO/JSON/config variants is a contract violation of an
/// already-validated schema graph: the module being emitted is abandoned.
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Unresolved record reference: {key}")]
    UnresolvedRecord { key: String },

    #[error("Cannot project {type_kind} under the {flavor} flavor")]
    UnreachableProjection { type_kind: String, flavor: String },

    #[error("Invalid key chain [{chain}] on array of {record}: {reason}")]
    InvalidKeyChain {
        record: String,
        chain: String,
        reason: String,
    },

    #[error("Inconsistent recursion marker on {record}.{field}: no reference back into its cycle")]
    InconsistentRecursionMarker { record: String, field: String },

    #[error("Struct field {record}.{field} has no type")]
    UntypedStructField { record: String, field: String },

    #[error("Invalid generator configuration: {0}")]
    InvalidConfig(String),

    #[error("Record {record} has no field named {field}")]
    UnknownField { record: String, field: String },

    #[error("Record {record} is missing field {field}")]
    MissingField { record: String, field: String },

    #[error("Value does not match {expected}: {found}")]
    ValueMismatch { expected: String, found: String },

    #[error("Field {record}.{field} has no mutable accessor")]
    NoMutableAccessor { record: String, field: String },

    #[error("Record {0} has a cyclic default value")]
    CyclicDefault(String),

    #[error("Array has no key chain")]
    NotKeyed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl CodegenError {
    pub(crate) fn unreachable(type_kind: &str, flavor: impl std::fmt::Display) -> Self {
        Self::UnreachableProjection {
            type_kind: type_kind.to_string(),
            flavor: flavor.to_string(),
        }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl std::fmt::Debug) -> Self {
        Self::ValueMismatch {
            expected: expected.into(),
            found: format!("{:?}", found),
        }
    }
}

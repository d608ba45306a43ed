//! MeshError: Unified error type for soa-mesh public APIs
//!
//! Every fallible datastore, entity and mesh operation surfaces one of these
//! conditions synchronously. None of them is transient: a malformed schema,
//! partition or stream means the mesh state is already inconsistent, so the
//! caller is expected to abort the current phase rather than retry.

use crate::data::field::FieldType;
use thiserror::Error;

/// Unified error type for soa-mesh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A field with this name is already declared in the datastore.
    #[error("field `{name}` is already declared")]
    NameConflict { name: String },
    /// The requested field type tag is not part of the closed type set.
    #[error("unsupported field type `{tag}`")]
    UnsupportedType { tag: String },
    /// No field (or child store) with this name exists.
    #[error("field `{name}` not found")]
    NotFound { name: String },
    /// A field was accessed with a type other than the one it was declared with.
    #[error("field `{name}` has type {found}, requested {expected}")]
    TypeMismatch {
        name: String,
        expected: FieldType,
        found: FieldType,
    },
    /// Resize counts violate `total == local + ghost`.
    #[error("invalid partition: local={local} + ghost={ghost} != total={total}")]
    InvalidPartition {
        local: usize,
        total: usize,
        ghost: usize,
    },
    /// Serialized data does not match the declared schema, or is truncated/corrupt.
    #[error("format error in {context}: {reason}")]
    Format { context: String, reason: String },
    /// Underlying stream failure while writing.
    #[error("I/O error: {0}")]
    Io(String),
    /// Memory for an atomic resize could not be reserved; the store is unchanged.
    #[error("failed to reserve storage for {len} elements")]
    ResizeFailed { len: usize },
    /// Mesh rank identity is inconsistent.
    #[error("rank {rank} is not valid for {num_ranks} ranks")]
    InvalidRank { rank: usize, num_ranks: usize },
    /// Element index past the end of a field.
    #[error("index {index} out of range for field `{name}` of length {len}")]
    IndexOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },
    /// A structural invariant was found broken by the invariant checker.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl MeshError {
    /// Build a [`MeshError::Format`] with the given context and reason.
    pub fn format(context: impl Into<String>, reason: impl Into<String>) -> Self {
        MeshError::Format {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Prefix the context of a format error with an enclosing scope
    /// (e.g. the entity kind). Other variants pass through untouched.
    pub fn within(self, scope: &str) -> Self {
        match self {
            MeshError::Format { context, reason } => MeshError::Format {
                context: format!("{scope}/{context}"),
                reason,
            },
            other => other,
        }
    }
}

//! Structural invariant checking for stores, entities and meshes.
//!
//! Checks run after every structural mutation (resize, read) in debug builds,
//! and in release builds when `check-invariants` or `strict-invariants` is on.

use crate::mesh_error::MeshError;

/// Types whose structural invariants can be validated on demand.
pub trait DebugInvariants {
    /// Panic on a broken invariant when invariant checking is compiled in.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first violation found.
    fn validate_invariants(&self) -> Result<(), MeshError>;
}

/// Return an [`MeshError::InvariantViolation`] built from `msg` unless `cond` holds.
#[inline]
pub fn ensure(cond: bool, msg: impl FnOnce() -> String) -> Result<(), MeshError> {
    if cond {
        Ok(())
    } else {
        Err(MeshError::InvariantViolation(msg()))
    }
}

/// Run a fallible invariant check and panic with context when invariant
/// checking is compiled in; expands to nothing otherwise.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[soa-mesh invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

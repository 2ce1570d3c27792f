//! The error taxonomy shared by every femesh crate.
//!
//! All region operations report failure through [`MeshError`]. Failures
//! are local: a rejected merge or removal leaves the region as it was
//! before the call, and the caller decides whether to skip, retry or
//! abandon a larger batch.

use std::error::Error;
use std::fmt;

/// Errors from region, layout and merge operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshError {
    /// A handle or value was missing, out of range, or belongs to a
    /// different region.
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },
    /// The requested identifier or name is already in use.
    IdentifierCollision {
        /// The object that already holds the identifier, e.g. `node 5`.
        what: String,
    },
    /// Field or layout definitions disagree and cannot be merged.
    IncompatibleDefinition {
        /// Description of the mismatch.
        reason: String,
    },
    /// Attempted removal of an object that is still referenced.
    InUse {
        /// The object that could not be removed.
        what: String,
    },
    /// Storage for a new object could not be obtained.
    AllocationFailure {
        /// What was being allocated.
        reason: String,
    },
    /// Mesh topology cannot be resolved, e.g. a face slot with no shape.
    StructuralInconsistency {
        /// Description of the inconsistency.
        reason: String,
    },
}

impl MeshError {
    /// Build an [`MeshError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Build an [`MeshError::IdentifierCollision`].
    pub fn collision(what: impl Into<String>) -> Self {
        Self::IdentifierCollision { what: what.into() }
    }

    /// Build an [`MeshError::IncompatibleDefinition`].
    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self::IncompatibleDefinition {
            reason: reason.into(),
        }
    }

    /// Build an [`MeshError::InUse`].
    pub fn in_use(what: impl Into<String>) -> Self {
        Self::InUse { what: what.into() }
    }

    /// Build an [`MeshError::AllocationFailure`].
    pub fn allocation(reason: impl Into<String>) -> Self {
        Self::AllocationFailure {
            reason: reason.into(),
        }
    }

    /// Build an [`MeshError::StructuralInconsistency`].
    pub fn structural(reason: impl Into<String>) -> Self {
        Self::StructuralInconsistency {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::IdentifierCollision { what } => write!(f, "identifier already in use by {what}"),
            Self::IncompatibleDefinition { reason } => {
                write!(f, "incompatible definition: {reason}")
            }
            Self::InUse { what } => write!(f, "cannot remove {what}: still in use"),
            Self::AllocationFailure { reason } => write!(f, "allocation failed: {reason}"),
            Self::StructuralInconsistency { reason } => {
                write!(f, "structural inconsistency: {reason}")
            }
        }
    }
}

impl Error for MeshError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = MeshError::in_use("field 'coordinates'");
        assert_eq!(
            err.to_string(),
            "cannot remove field 'coordinates': still in use"
        );
        let err = MeshError::collision("node 5");
        assert_eq!(err.to_string(), "identifier already in use by node 5");
    }

    #[test]
    fn errors_compare_by_variant_and_context() {
        assert_eq!(
            MeshError::invalid_argument("x"),
            MeshError::InvalidArgument { reason: "x".into() }
        );
        assert_ne!(MeshError::invalid_argument("x"), MeshError::incompatible("x"));
    }
}

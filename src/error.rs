//! Error taxonomy shared by every dictionary entry point.

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by dictionary, enumerator and view operations.
///
/// A rejected operation never leaves the dictionary partially mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An argument was rejected; `param` names the conceptual parameter
    /// ("key", "value", "array", "index", "capacity", "collection").
    #[error("{fault} (parameter `{param}`)")]
    InvalidArgument {
        param: &'static str,
        fault: ArgumentFault,
    },

    /// A reject-on-duplicate insert found the key already present.
    #[error("an entry with the same key has already been added")]
    KeyConflict,

    /// Indexed access to a key that is not in the dictionary.
    #[error("the given key was not present in the dictionary")]
    KeyNotFound,

    /// An enumerator was used in a state where the operation is invalid.
    #[error("{0}")]
    InvalidState(StateFault),

    /// Mutation attempted through a read-only projection.
    #[error("{0}")]
    NotSupported(&'static str),
}

/// Why an argument was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentFault {
    #[error("value cannot be null")]
    Null,
    #[error("wrong key type, expected `{expected}`")]
    WrongKeyType { expected: &'static str },
    #[error("wrong value type, expected `{expected}`")]
    WrongValueType { expected: &'static str },
    #[error("null is not a valid value for non-nullable type `{expected}`")]
    NullValue { expected: &'static str },
    #[error("destination array is not long enough to copy all the items")]
    ArrayTooSmall,
    #[error("multi-dimensional arrays are not supported")]
    MultiDimensional,
    #[error("arrays with a non-zero lower bound are not supported")]
    NonZeroLowerBound,
    #[error("destination array element type `{found}` is incompatible")]
    InvalidArrayType { found: &'static str },
    #[error("index is out of range")]
    IndexOutOfRange,
    #[error("capacity is smaller than the current count")]
    CapacityBelowCount,
    #[error("capacity exceeds the largest supported table size")]
    CapacityTooLarge,
    #[error("an entry with the same key was supplied more than once")]
    DuplicateKey,
}

/// Why an enumerator operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateFault {
    #[error("collection was modified; enumeration operation may not execute")]
    VersionChanged,
    #[error("enumeration has either not started or has already finished")]
    NotPositioned,
    #[error("enumerator was created by a different dictionary")]
    ForeignDictionary,
}

impl Error {
    pub(crate) fn null(param: &'static str) -> Self {
        Error::InvalidArgument {
            param,
            fault: ArgumentFault::Null,
        }
    }

    pub(crate) fn argument(param: &'static str, fault: ArgumentFault) -> Self {
        Error::InvalidArgument { param, fault }
    }

    /// Returns the rejected parameter name for `InvalidArgument` errors.
    pub fn param(&self) -> Option<&'static str> {
        match self {
            Error::InvalidArgument { param, .. } => Some(param),
            _ => None,
        }
    }
}

/// Validates a copy of `count` items into a destination of `dest_len`
/// starting at `index`.
pub(crate) fn check_copy_bounds(dest_len: usize, index: usize, count: usize) -> Result<()> {
    if index > dest_len {
        return Err(Error::argument("index", ArgumentFault::IndexOutOfRange));
    }
    if dest_len - index < count {
        return Err(Error::argument("array", ArgumentFault::ArrayTooSmall));
    }
    Ok(())
}

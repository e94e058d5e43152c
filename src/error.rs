use std::collections::TryReserveError;

/// Errors raised by [`HashTable`](crate::HashTable) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A zero-length key was passed to a mutating operation
    EmptyKey,

    /// Requested initial tablesize exceeds [`MAX_TABLESIZE`](crate::MAX_TABLESIZE)
    InvalidTablesize(u32),

    /// The bucket array, a key copy or a value copy could not be allocated
    Alloc(TryReserveError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKey => write!(f, "HashTableError: key must not be empty"),
            Self::InvalidTablesize(n) => {
                write!(f, "HashTableError: invalid tablesize {n}")
            }
            Self::Alloc(e) => write!(f, "HashTableError: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(value: TryReserveError) -> Self {
        Self::Alloc(value)
    }
}

/// Hash table result
pub type Result<T> = std::result::Result<T, Error>;

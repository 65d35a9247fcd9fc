//! NBT error types.

use thiserror::Error;

/// Every decode failure carries the byte offset at which it was detected, since the
/// cursor tracks position throughout — there's no "ran out of bytes somewhere" case.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NbtError {
    #[error("malformed tag at offset {offset}: {reason}")]
    MalformedTag { offset: usize, reason: String },
}

impl NbtError {
    pub(crate) fn at(offset: usize, reason: impl Into<String>) -> Self {
        NbtError::MalformedTag {
            offset,
            reason: reason.into(),
        }
    }
}

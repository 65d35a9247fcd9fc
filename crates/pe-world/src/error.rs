//! World-level error taxonomy.

use thiserror::Error;

use crate::store::StoreError;
use pe_nbt::NbtError;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("chunk ({cx}, {cz}) not present")]
    ChunkNotPresent { cx: i32, cz: i32 },

    #[error("malformed chunk ({reason}, terrain length {len})")]
    MalformedChunk { len: usize, reason: String },

    #[error(transparent)]
    MalformedTag(#[from] NbtError),

    #[error("unsupported level version {0} (minimum supported is 3)")]
    UnsupportedLevelVersion(i32),

    #[error("malformed level.dat: {0}")]
    MalformedLevelDat(String),

    /// Raised in either direction of the entity id lookup: an on-disk integer with no
    /// registered name, or an in-memory name with no registered id.
    #[error("unknown entity id: {0}")]
    UnknownEntityId(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("session lock lost")]
    SessionLockLost,
}

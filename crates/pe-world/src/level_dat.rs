//! `level.dat` parsing: 4-byte LE version, 4-byte LE payload length, little-endian
//! NBT compound payload, with one `level.dat_old` retry on a length mismatch.
//!
//! Grounded on `PocketLeveldbWorld.loadLevelDat` (`leveldbpocket.py`): the magic/
//! length/payload header shape, the `< 3` version floor, and the fallback to
//! `level.dat_old` on a malformed read.

use std::fs;
use std::path::Path;

use pe_nbt::{decode, Endianness, NbtCompound};
use tracing::warn;

use crate::error::WorldError;

const MIN_SUPPORTED_VERSION: i32 = 3;

/// Load and parse `<dir>/level.dat`, retrying `<dir>/level.dat_old` once if the
/// primary file is malformed (but never on an unsupported version, which aborts the
/// open outright).
pub(crate) fn load(dir: &Path) -> Result<NbtCompound, WorldError> {
    let primary = dir.join("level.dat");
    match parse_file(&primary) {
        Ok(compound) => Ok(compound),
        Err(WorldError::MalformedLevelDat(reason)) => {
            let fallback = dir.join("level.dat_old");
            warn!(
                primary = %primary.display(),
                fallback = %fallback.display(),
                reason,
                "level.dat malformed, retrying level.dat_old"
            );
            parse_file(&fallback)
        }
        Err(other) => Err(other),
    }
}

fn parse_file(path: &Path) -> Result<NbtCompound, WorldError> {
    let bytes = fs::read(path)
        .map_err(|e| WorldError::MalformedLevelDat(format!("reading {}: {e}", path.display())))?;
    parse_bytes(&bytes)
}

fn parse_bytes(bytes: &[u8]) -> Result<NbtCompound, WorldError> {
    if bytes.len() < 8 {
        return Err(WorldError::MalformedLevelDat(
            "file shorter than the 8-byte header".to_string(),
        ));
    }
    let version = i32::from_le_bytes(bytes[0..4].try_into().expect("checked length"));
    if version < MIN_SUPPORTED_VERSION {
        return Err(WorldError::UnsupportedLevelVersion(version));
    }

    let declared_len = i32::from_le_bytes(bytes[4..8].try_into().expect("checked length"));
    if declared_len < 0 {
        return Err(WorldError::MalformedLevelDat(format!(
            "negative payload length {declared_len}"
        )));
    }

    let payload = &bytes[8..];
    if payload.len() != declared_len as usize {
        return Err(WorldError::MalformedLevelDat(format!(
            "declared length {declared_len} does not match actual payload length {}",
            payload.len()
        )));
    }

    let root = decode(payload, Endianness::Little)?;
    Ok(root.compound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pe_nbt::{encode, NbtRoot, NbtTag};
    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pe_world_leveldat_test_{}", rand::random::<u64>()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_level_dat(dir: &Path, name: &str, version: i32, compound: &NbtCompound) {
        let payload = encode(&NbtRoot::new("", compound.clone()), Endianness::Little);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&version.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn loads_valid_level_dat() {
        let dir = temp_dir();
        let mut compound = NbtCompound::new();
        compound.insert("LevelName".to_string(), NbtTag::String("Test".to_string()));
        write_level_dat(&dir, "level.dat", 8, &compound);

        let loaded = load(&dir).unwrap();
        assert_eq!(
            loaded.get("LevelName"),
            Some(&NbtTag::String("Test".to_string()))
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unsupported_version_fails_without_retry() {
        let dir = temp_dir();
        write_level_dat(&dir, "level.dat", 2, &NbtCompound::new());

        let err = load(&dir).unwrap_err();
        assert!(matches!(err, WorldError::UnsupportedLevelVersion(2)));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_primary_falls_back_to_old() {
        let dir = temp_dir();
        fs::write(dir.join("level.dat"), b"not a valid level.dat").unwrap();
        let mut compound = NbtCompound::new();
        compound.insert("LevelName".to_string(), NbtTag::String("Backup".to_string()));
        write_level_dat(&dir, "level.dat_old", 5, &compound);

        let loaded = load(&dir).unwrap();
        assert_eq!(
            loaded.get("LevelName"),
            Some(&NbtTag::String("Backup".to_string()))
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_primary_and_missing_fallback_fails() {
        let dir = temp_dir();
        fs::write(dir.join("level.dat"), b"short").unwrap();

        let err = load(&dir).unwrap_err();
        assert!(matches!(err, WorldError::MalformedLevelDat(_)));
        fs::remove_dir_all(&dir).ok();
    }
}

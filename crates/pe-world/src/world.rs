//! World: mediates the store facade, the chunk cache, and the root metadata compound.
//!
//! Grounded on `PocketLeveldbWorld` (`leveldbpocket.py`): `__init__`/`loadLevelDat`,
//! `getChunk`, `allChunks`, `deleteChunk`/`deleteChunksInBox` (progress-every-100
//! logging, post-delete assertion), `saveInPlaceGen` (dirty-clearing order redesigned
//! per REDESIGN FLAG R1), `unload`/`close` (swallowed `SessionLockLost`), and the
//! `TagProperty` descriptor pattern for root-metadata lazy defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use pe_nbt::{NbtCompound, NbtTag};
use tracing::{debug, info, warn};

use crate::chunk::Chunk;
use crate::entity_ids::EntityIdTable;
use crate::error::WorldError;
use crate::keys::{chunk_key, parse_chunk_key, TAG_ENTITIES, TAG_TERRAIN, TAG_TILE_ENTITIES};
use crate::level_dat;
use crate::store::{Batch, StoreFacade};

/// A half-open rectangle of chunk coordinates: `[mincx, maxcx) x [mincz, maxcz)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBox {
    pub mincx: i32,
    pub maxcx: i32,
    pub mincz: i32,
    pub maxcz: i32,
}

impl ChunkBox {
    pub fn new(mincx: i32, maxcx: i32, mincz: i32, maxcz: i32) -> Self {
        ChunkBox {
            mincx,
            maxcx,
            mincz,
            maxcz,
        }
    }

    fn is_empty(&self) -> bool {
        self.mincx >= self.maxcx || self.mincz >= self.maxcz
    }
}

pub struct World {
    path: PathBuf,
    store: StoreFacade,
    root: NbtCompound,
    entity_ids: EntityIdTable,
    all_chunks: Option<Vec<(i32, i32)>>,
    cache: HashMap<(i32, i32), Chunk>,
}

impl World {
    /// Open a world directory, `hold_open=true` (the store handle stays open until
    /// [`World::close`]).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WorldError> {
        Self::open_with(path, true)
    }

    pub fn open_with(path: impl Into<PathBuf>, hold_open: bool) -> Result<Self, WorldError> {
        let path = path.into();
        if !is_level_dir(&path) {
            return Err(WorldError::MalformedLevelDat(format!(
                "{} is not a world directory (missing 'db' or 'level.dat')",
                path.display()
            )));
        }

        let root = level_dat::load(&path)?;
        let store = StoreFacade::new(path.join("db"), hold_open);

        info!(path = %path.display(), "world opened");

        Ok(World {
            path,
            store,
            root,
            entity_ids: EntityIdTable::new(),
            all_chunks: None,
            cache: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // --- root metadata: TagProperty-equivalent lazy-default accessors ---

    pub fn size_on_disk(&mut self) -> i32 {
        self.int_property("SizeOnDisk", 0)
    }
    pub fn set_size_on_disk(&mut self, value: i32) {
        self.root.insert("SizeOnDisk".to_string(), NbtTag::Int(value));
    }

    pub fn random_seed(&mut self) -> i32 {
        self.int_property("RandomSeed", 0)
    }
    pub fn set_random_seed(&mut self, value: i32) {
        self.root.insert("RandomSeed".to_string(), NbtTag::Int(value));
    }

    pub fn time(&mut self) -> i64 {
        self.long_property("Time", 0)
    }
    pub fn set_time(&mut self, value: i64) {
        self.root.insert("Time".to_string(), NbtTag::Long(value));
    }

    /// First access fixes the current wall-clock time (ms) into the root compound;
    /// later accesses return that fixed value.
    pub fn last_played(&mut self) -> i64 {
        if let Some(NbtTag::Long(value)) = self.root.get("LastPlayed") {
            return *value;
        }
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        self.root.insert("LastPlayed".to_string(), NbtTag::Long(now_ms));
        now_ms
    }
    pub fn set_last_played(&mut self, value: i64) {
        self.root.insert("LastPlayed".to_string(), NbtTag::Long(value));
    }

    pub fn level_name(&mut self) -> String {
        if let Some(NbtTag::String(value)) = self.root.get("LevelName") {
            return value.clone();
        }
        let default = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.root
            .insert("LevelName".to_string(), NbtTag::String(default.clone()));
        default
    }
    pub fn set_level_name(&mut self, value: impl Into<String>) {
        self.root.insert("LevelName".to_string(), NbtTag::String(value.into()));
    }

    pub fn generator(&mut self) -> String {
        self.string_property("Generator", "Infinite")
    }
    pub fn set_generator(&mut self, value: impl Into<String>) {
        self.root.insert("Generator".to_string(), NbtTag::String(value.into()));
    }

    pub fn game_type(&mut self) -> i32 {
        self.int_property("GameType", 0)
    }
    pub fn set_game_type(&mut self, value: i32) {
        self.root.insert("GameType".to_string(), NbtTag::Int(value));
    }

    fn int_property(&mut self, name: &str, default: i32) -> i32 {
        if let Some(NbtTag::Int(value)) = self.root.get(name) {
            return *value;
        }
        self.root.insert(name.to_string(), NbtTag::Int(default));
        default
    }

    fn long_property(&mut self, name: &str, default: i64) -> i64 {
        if let Some(NbtTag::Long(value)) = self.root.get(name) {
            return *value;
        }
        self.root.insert(name.to_string(), NbtTag::Long(default));
        default
    }

    fn string_property(&mut self, name: &str, default: &str) -> String {
        if let Some(NbtTag::String(value)) = self.root.get(name) {
            return value.clone();
        }
        self.root
            .insert(name.to_string(), NbtTag::String(default.to_string()));
        default.to_string()
    }

    // --- chunk access ---

    pub fn get_chunk(&mut self, cx: i32, cz: i32) -> Result<&Chunk, WorldError> {
        self.ensure_loaded(cx, cz)?;
        Ok(self.cache.get(&(cx, cz)).expect("just ensured"))
    }

    pub fn get_chunk_mut(&mut self, cx: i32, cz: i32) -> Result<&mut Chunk, WorldError> {
        self.ensure_loaded(cx, cz)?;
        Ok(self.cache.get_mut(&(cx, cz)).expect("just ensured"))
    }

    fn ensure_loaded(&mut self, cx: i32, cz: i32) -> Result<(), WorldError> {
        if self.cache.contains_key(&(cx, cz)) {
            return Ok(());
        }
        let chunk = self.load_chunk(cx, cz)?;
        self.cache.insert((cx, cz), chunk);
        Ok(())
    }

    fn load_chunk(&mut self, cx: i32, cz: i32) -> Result<Chunk, WorldError> {
        let terrain = self
            .store
            .get(&chunk_key(cx, cz, TAG_TERRAIN))?
            .ok_or(WorldError::ChunkNotPresent { cx, cz })?;
        let tile_entities = self.store.get(&chunk_key(cx, cz, TAG_TILE_ENTITIES))?;
        let entities = self.store.get(&chunk_key(cx, cz, TAG_ENTITIES))?;

        debug!(cx, cz, "chunk load");

        Chunk::decode(
            cx,
            cz,
            &terrain,
            tile_entities.as_deref(),
            entities.as_deref(),
            &self.entity_ids,
        )
    }

    pub fn is_chunk_cached(&self, cx: i32, cz: i32) -> bool {
        self.cache.contains_key(&(cx, cz))
    }

    // --- enumeration ---

    /// All `(cx, cz)` with a terrain record, memoized until the next [`World::unload`].
    pub fn all_chunks(&mut self) -> Result<&[(i32, i32)], WorldError> {
        if self.all_chunks.is_none() {
            let pairs = self.store.iterate()?;
            let coords = pairs
                .into_iter()
                .filter_map(|(key, _)| parse_chunk_key(&key))
                .filter(|&(_, _, tag)| tag == TAG_TERRAIN)
                .map(|(cx, cz, _)| (cx, cz))
                .collect();
            self.all_chunks = Some(coords);
        }
        Ok(self.all_chunks.as_deref().expect("just populated"))
    }

    pub fn contains_chunk(&mut self, cx: i32, cz: i32) -> Result<bool, WorldError> {
        Ok(self.all_chunks()?.contains(&(cx, cz)))
    }

    // --- deletion ---

    /// Delete a chunk's terrain key only; tile-entities and entities become orphans
    /// (intentional — matches the source).
    pub fn delete_chunk(&mut self, cx: i32, cz: i32) -> Result<(), WorldError> {
        self.store.delete(&chunk_key(cx, cz, TAG_TERRAIN))?;
        self.forget_chunk(cx, cz);
        debug!(cx, cz, "chunk delete");
        Ok(())
    }

    fn delete_chunk_into(&mut self, cx: i32, cz: i32, batch: &mut Batch) {
        batch.delete(&chunk_key(cx, cz, TAG_TERRAIN));
        self.forget_chunk(cx, cz);
    }

    fn forget_chunk(&mut self, cx: i32, cz: i32) {
        self.cache.remove(&(cx, cz));
        if let Some(all) = self.all_chunks.as_mut() {
            all.retain(|&coord| coord != (cx, cz));
        }
    }

    /// Delete every present chunk in `box_` (half-open) via one shared batch commit.
    pub fn delete_chunks_in_box(&mut self, box_: ChunkBox) -> Result<Vec<(i32, i32)>, WorldError> {
        if box_.is_empty() {
            return Ok(Vec::new());
        }

        self.all_chunks()?;
        let total = (box_.maxcx - box_.mincx) as i64 * (box_.maxcz - box_.mincz) as i64;
        info!(
            count = total,
            mincx = box_.mincx,
            maxcx = box_.maxcx,
            mincz = box_.mincz,
            maxcz = box_.maxcz,
            "deleting chunks in box"
        );

        let mut deleted = Vec::new();
        let mut batch = self.store.new_batch();
        let mut processed = 0u64;
        for cx in box_.mincx..box_.maxcx {
            for cz in box_.mincz..box_.maxcz {
                processed += 1;
                if self.all_chunks.as_ref().expect("populated above").contains(&(cx, cz)) {
                    self.delete_chunk_into(cx, cz, &mut batch);
                    deleted.push((cx, cz));
                }
                debug_assert!(!self
                    .all_chunks
                    .as_ref()
                    .expect("populated above")
                    .contains(&(cx, cz)));
                if processed % 100 == 0 {
                    info!(processed, "chunk delete progress");
                }
            }
        }
        self.store.commit(batch)?;
        info!(deleted = deleted.len(), "bulk delete complete");
        Ok(deleted)
    }

    // --- save ---

    /// Returns a resumable iterator yielding `(cx, cz)` for each dirty cached chunk
    /// encoded into a shared batch. Driving it to exhaustion commits the batch and
    /// only then clears `dirty` on the chunks that were saved (REDESIGN FLAG R1):
    /// dropping it early discards the buffered batch and leaves `dirty` untouched, so
    /// a later call simply redoes the work.
    pub fn save_incremental(&mut self) -> SaveIncremental<'_> {
        let pending: Vec<(i32, i32)> = self
            .cache
            .iter()
            .filter(|(_, chunk)| chunk.dirty)
            .map(|(&coord, _)| coord)
            .collect();
        SaveIncremental {
            world: self,
            pending: pending.into_iter(),
            batch: None,
            touched: Vec::new(),
            finalized: false,
        }
    }

    /// Convenience wrapper that drives [`World::save_incremental`] to completion,
    /// returning the number of chunks saved.
    pub fn save(&mut self) -> Result<usize, WorldError> {
        let mut count = 0;
        let mut iter = self.save_incremental();
        while let Some(step) = iter.next() {
            step?;
            count += 1;
        }
        Ok(count)
    }

    // --- lifecycle ---

    /// Clear the chunk cache and the `all_chunks` memo. Idempotent.
    pub fn unload(&mut self) {
        self.cache.clear();
        self.all_chunks = None;
    }

    /// `unload` plus releasing the store handle. Idempotent.
    pub fn close(&mut self) {
        self.unload();
        self.store.close();
        // The source swallows a lost session lock here unconditionally; this engine
        // has no lock of its own to lose (that's a host-application concern layered
        // on top), so there is nothing to observe beyond the trace below matching
        // §4.7's requirement that the swallow not vanish silently if a host does add one.
        warn!(path = %self.path.display(), "close: any session lock loss is swallowed");
    }
}

fn is_level_dir(path: &Path) -> bool {
    path.is_dir() && path.join("db").exists() && path.join("level.dat").exists()
}

pub struct SaveIncremental<'w> {
    world: &'w mut World,
    pending: std::vec::IntoIter<(i32, i32)>,
    batch: Option<Batch>,
    touched: Vec<(i32, i32)>,
    finalized: bool,
}

impl<'w> Iterator for SaveIncremental<'w> {
    type Item = Result<(i32, i32), WorldError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.pending.next() {
                Some((cx, cz)) => {
                    let world = &mut *self.world;
                    let chunk = match world.cache.get_mut(&(cx, cz)) {
                        Some(chunk) => chunk,
                        None => continue, // evicted mid-save; nothing left to do
                    };
                    let encoded = match chunk.encode(&world.entity_ids) {
                        Ok(encoded) => encoded,
                        Err(err) => return Some(Err(err)),
                    };
                    if self.batch.is_none() {
                        self.batch = Some(world.store.new_batch());
                    }
                    let batch = self.batch.as_mut().expect("just ensured");
                    batch.put(&chunk_key(cx, cz, TAG_TERRAIN), &encoded.0);
                    batch.put(&chunk_key(cx, cz, TAG_TILE_ENTITIES), &encoded.1);
                    batch.put(&chunk_key(cx, cz, TAG_ENTITIES), &encoded.2);
                    self.touched.push((cx, cz));
                    return Some(Ok((cx, cz)));
                }
                None => {
                    if !self.finalized {
                        self.finalized = true;
                        if let Some(batch) = self.batch.take() {
                            match self.world.store.commit(batch) {
                                Ok(()) => {
                                    for (cx, cz) in self.touched.drain(..) {
                                        if let Some(chunk) = self.world.cache.get_mut(&(cx, cz)) {
                                            chunk.dirty = false;
                                        }
                                    }
                                }
                                Err(err) => return Some(Err(err.into())),
                            }
                        }
                    }
                    return None;
                }
            }
        }
    }
}

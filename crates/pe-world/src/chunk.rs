//! Terrain chunk codec: translates the 83,200-byte on-disk terrain record to/from
//! unpacked 16x16x128 arrays, plus the little-endian compound-list framing for
//! tile-entities and entities.
//!
//! Grounded on `pymclevel/leveldbpocket.py`'s `PocketLeveldbChunk`
//! (`unpackChunkData`/`shapeChunkData`/`savedData`: exact field order and widths,
//! the nibble packing formula, the `DirtyColumns` all-255-on-dirty behavior, and the
//! per-entity id swap) with the id swap redesigned into a validate-then-swap two-pass
//! encode (see DESIGN.md, REDESIGN FLAG R2) so a lookup failure can never leave the
//! chunk partially mutated.

use pe_nbt::{decode_compound_list, encode_compound_list, Endianness, NbtCompound, NbtTag};

use crate::entity_ids::EntityIdTable;
use crate::error::WorldError;

/// Horizontal chunk size, both axes.
pub const CHUNK_WIDTH: usize = 16;
/// Fixed world height this engine targets (pocket-edition era, not modern Bedrock).
pub const HEIGHT: usize = 128;
/// Element count of Blocks/Data/SkyLight/BlockLight once unpacked: 16*16*128.
pub const PLANE_LEN: usize = CHUNK_WIDTH * CHUNK_WIDTH * HEIGHT;
/// Byte count of a nibble-packed plane: half the unpacked element count.
pub const PACKED_LEN: usize = PLANE_LEN / 2;
/// One byte per column: 16*16.
pub const DIRTY_COLUMNS_LEN: usize = CHUNK_WIDTH * CHUNK_WIDTH;
pub const GRASS_COLORS_LEN: usize = 1024;
/// Total on-disk terrain record size.
pub const TERRAIN_LEN: usize =
    PLANE_LEN + PACKED_LEN * 3 + DIRTY_COLUMNS_LEN + GRASS_COLORS_LEN;

/// Flat index into a 16x16x128 plane: X-major, Z-middle, Y-inner.
pub fn index(x: usize, z: usize, y: usize) -> usize {
    debug_assert!(x < CHUNK_WIDTH && z < CHUNK_WIDTH && y < HEIGHT);
    (x * CHUNK_WIDTH + z) * HEIGHT + y
}

/// Unpack a nibble-packed byte slice into one value per nibble, low nibble first.
/// `u[2k] = packed[k] & 0xF`, `u[2k+1] = (packed[k] >> 4) & 0xF`.
pub fn unpack_nibbles(packed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packed.len() * 2);
    for &byte in packed {
        out.push(byte & 0x0F);
        out.push((byte >> 4) & 0x0F);
    }
    out
}

/// Pack two nibbles per byte, inverse of [`unpack_nibbles`]. `unpacked.len()` must be
/// even; the low nibble comes from the even index, the high nibble from the odd.
pub fn pack_nibbles(unpacked: &[u8]) -> Vec<u8> {
    debug_assert!(unpacked.len() % 2 == 0);
    unpacked
        .chunks_exact(2)
        .map(|pair| (pair[0] & 0x0F) | ((pair[1] & 0x0F) << 4))
        .collect()
}

/// A loaded 16x16x128 terrain chunk plus its tile-entities and entities.
pub struct Chunk {
    pub cx: i32,
    pub cz: i32,
    /// Block ids, one byte per cell, `PLANE_LEN` elements.
    pub blocks: Vec<u8>,
    /// Block data nibbles, unpacked to one value per cell in `[0,15]`.
    pub data: Vec<u8>,
    pub sky_light: Vec<u8>,
    pub block_light: Vec<u8>,
    /// One bitfield byte per column; each bit is a 16-block vertical segment.
    pub dirty_columns: [u8; DIRTY_COLUMNS_LEN],
    /// Opaque, preserved verbatim; semantics undefined by the source.
    pub grass_colors: [u8; GRASS_COLORS_LEN],
    pub tile_entities: Vec<NbtCompound>,
    pub entities: Vec<NbtCompound>,
    pub dirty: bool,
}

impl Chunk {
    /// An empty chunk at `(cx, cz)`: all-zero terrain, no entities, not dirty.
    pub fn new_empty(cx: i32, cz: i32) -> Self {
        Chunk {
            cx,
            cz,
            blocks: vec![0u8; PLANE_LEN],
            data: vec![0u8; PLANE_LEN],
            sky_light: vec![0u8; PLANE_LEN],
            block_light: vec![0u8; PLANE_LEN],
            dirty_columns: [0u8; DIRTY_COLUMNS_LEN],
            grass_colors: [0u8; GRASS_COLORS_LEN],
            tile_entities: Vec::new(),
            entities: Vec::new(),
            dirty: false,
        }
    }

    /// Decode a chunk from its three store values. `tile_entities`/`entities` are
    /// `None` when the corresponding store key is absent, decoding to an empty list.
    pub fn decode(
        cx: i32,
        cz: i32,
        terrain: &[u8],
        tile_entities: Option<&[u8]>,
        entities: Option<&[u8]>,
        entity_ids: &EntityIdTable,
    ) -> Result<Chunk, WorldError> {
        if terrain.len() != TERRAIN_LEN {
            return Err(WorldError::MalformedChunk {
                len: terrain.len(),
                reason: format!("expected {TERRAIN_LEN} bytes"),
            });
        }

        let blocks_end = PLANE_LEN;
        let data_end = blocks_end + PACKED_LEN;
        let sky_end = data_end + PACKED_LEN;
        let block_light_end = sky_end + PACKED_LEN;
        let dirty_end = block_light_end + DIRTY_COLUMNS_LEN;
        let grass_end = dirty_end + GRASS_COLORS_LEN;

        let blocks = terrain[0..blocks_end].to_vec();
        let data = unpack_nibbles(&terrain[blocks_end..data_end]);
        let sky_light = unpack_nibbles(&terrain[data_end..sky_end]);
        let block_light = unpack_nibbles(&terrain[sky_end..block_light_end]);
        let mut dirty_columns = [0u8; DIRTY_COLUMNS_LEN];
        dirty_columns.copy_from_slice(&terrain[block_light_end..dirty_end]);
        let mut grass_colors = [0u8; GRASS_COLORS_LEN];
        grass_colors.copy_from_slice(&terrain[dirty_end..grass_end]);

        let tile_entities = match tile_entities {
            Some(bytes) => decode_compound_list(bytes, Endianness::Little)?,
            None => Vec::new(),
        };

        let entities = match entities {
            Some(bytes) => {
                let raw = decode_compound_list(bytes, Endianness::Little)?;
                translate_ids_to_names(raw, entity_ids)?
            }
            None => Vec::new(),
        };

        Ok(Chunk {
            cx,
            cz,
            blocks,
            data,
            sky_light,
            block_light,
            dirty_columns,
            grass_colors,
            tile_entities,
            entities,
            dirty: false,
        })
    }

    /// Encode back to `(terrain, tile_entity_bytes, entity_bytes)`. If `dirty`, every
    /// `dirty_columns` byte is set to 255 as a side effect (the engine only tracks
    /// dirtiness at chunk granularity, so every column segment must be marked dirty
    /// for the host). Entity id resolution happens in a validating pass before any
    /// mutation, so a failed lookup leaves the chunk untouched (REDESIGN FLAG R2).
    pub fn encode(
        &mut self,
        entity_ids: &EntityIdTable,
    ) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), WorldError> {
        debug_assert_eq!(self.blocks.len(), PLANE_LEN);
        debug_assert_eq!(self.data.len(), PLANE_LEN);
        debug_assert_eq!(self.sky_light.len(), PLANE_LEN);
        debug_assert_eq!(self.block_light.len(), PLANE_LEN);

        let resolved_ids = resolve_entity_ids(&self.entities, entity_ids)?;
        let swapped_entities = swap_names_to_ids(&self.entities, &resolved_ids);
        let entity_bytes = encode_compound_list(&swapped_entities, Endianness::Little);
        let tile_entity_bytes = encode_compound_list(&self.tile_entities, Endianness::Little);

        if self.dirty {
            self.dirty_columns = [255u8; DIRTY_COLUMNS_LEN];
        }

        let mut terrain = Vec::with_capacity(TERRAIN_LEN);
        terrain.extend_from_slice(&self.blocks);
        terrain.extend_from_slice(&pack_nibbles(&self.data));
        terrain.extend_from_slice(&pack_nibbles(&self.sky_light));
        terrain.extend_from_slice(&pack_nibbles(&self.block_light));
        terrain.extend_from_slice(&self.dirty_columns);
        terrain.extend_from_slice(&self.grass_colors);

        Ok((terrain, tile_entity_bytes, entity_bytes))
    }

    pub fn get_block(&self, x: usize, z: usize, y: usize) -> u8 {
        self.blocks[index(x, z, y)]
    }

    pub fn set_block(&mut self, x: usize, z: usize, y: usize, id: u8) {
        self.blocks[index(x, z, y)] = id;
    }
}

/// Validating first pass: resolve every entity's on-disk integer id without mutating
/// anything, so the whole encode fails before any swap if one lookup fails.
fn resolve_entity_ids(
    entities: &[NbtCompound],
    table: &EntityIdTable,
) -> Result<Vec<i32>, WorldError> {
    entities
        .iter()
        .map(|entity| {
            let name = match entity.get("id") {
                Some(NbtTag::String(name)) => name.as_str(),
                _ => return Err(WorldError::UnknownEntityId("<missing id>".to_string())),
            };
            table
                .id_for_name(name)
                .ok_or_else(|| WorldError::UnknownEntityId(name.to_string()))
        })
        .collect()
}

/// Build clones of `entities` with `id` swapped to its resolved integer form. The
/// originals are untouched — the swap-and-restore the source does in place is
/// unnecessary once resolution has already happened on an owned copy.
fn swap_names_to_ids(entities: &[NbtCompound], resolved_ids: &[i32]) -> Vec<NbtCompound> {
    entities
        .iter()
        .zip(resolved_ids)
        .map(|(entity, &id)| {
            let mut entity = entity.clone();
            entity.insert("id".to_string(), NbtTag::Int(id));
            entity
        })
        .collect()
}

fn translate_ids_to_names(
    entities: Vec<NbtCompound>,
    table: &EntityIdTable,
) -> Result<Vec<NbtCompound>, WorldError> {
    entities
        .into_iter()
        .map(|mut entity| {
            let id = match entity.get("id") {
                Some(NbtTag::Int(id)) => *id,
                _ => return Err(WorldError::UnknownEntityId("<missing id>".to_string())),
            };
            let name = table
                .name_for_id(id)
                .ok_or_else(|| WorldError::UnknownEntityId(id.to_string()))?;
            entity.insert("id".to_string(), NbtTag::String(name.to_string()));
            Ok(entity)
        })
        .collect()
}

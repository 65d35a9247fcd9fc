//! Bidirectional mapping between external entity names and on-disk integer ids.
//!
//! Grounded methodologically on `ItemRegistry` (`include_str!` + `serde_json` +
//! dual-map construction); the concrete data has no source anywhere in the corpus this
//! was built from (`keys.py` is purely the out-of-scope key-binding UI) and is
//! therefore illustrative, not authoritative — see DESIGN.md.

use std::collections::HashMap;

use serde::Deserialize;

const ENTITY_IDS_JSON: &str = include_str!("../data/entity_ids.json");

#[derive(Deserialize)]
struct RawTable(HashMap<String, i32>);

pub struct EntityIdTable {
    by_name: HashMap<String, i32>,
    by_id: HashMap<i32, String>,
}

impl Default for EntityIdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityIdTable {
    pub fn new() -> Self {
        let raw: RawTable =
            serde_json::from_str(ENTITY_IDS_JSON).expect("invalid entity_ids.json");
        let mut by_id = HashMap::with_capacity(raw.0.len());
        for (name, id) in &raw.0 {
            by_id.insert(*id, name.clone());
        }
        Self {
            by_name: raw.0,
            by_id,
        }
    }

    pub fn id_for_name(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    pub fn name_for_id(&self, id: i32) -> Option<&str> {
        self.by_id.get(&id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

use super::CompiledUnit;
use crate::error::ArtifactError;
use crate::hash;
use ahash::AHashMap;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::sync::{Arc, LazyLock};

static DUMMY_UNIT: LazyLock<Arc<CompiledUnit>> = LazyLock::new(|| Arc::new(CompiledUnit::dummy()));

/// Maps graph asset UUIDs to compiled units. Units are kept sorted by UUID, so the
/// index of a unit and the rendered table are stable for a given set of assets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptTable {
    units: Vec<Arc<CompiledUnit>>,
}

impl ScriptTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a unit, replacing any unit with the same UUID.
    pub fn add(&mut self, unit: CompiledUnit) {
        let unit = Arc::new(unit);
        match self.units.binary_search_by_key(&unit.uuid, |u| u.uuid) {
            Ok(pos) => self.units[pos] = unit,
            Err(pos) => self.units.insert(pos, unit),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> impl Iterator<Item = &Arc<CompiledUnit>> {
        self.units.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<CompiledUnit>> {
        self.units.get(index)
    }

    pub fn get_by_uuid(&self, uuid: u64) -> Option<&Arc<CompiledUnit>> {
        self.index_of(uuid).and_then(|i| self.units.get(i))
    }

    /// The unit at `index`, or the dummy unit when out of range.
    pub fn unit_by_index(&self, index: usize) -> &Arc<CompiledUnit> {
        self.units.get(index).unwrap_or(&DUMMY_UNIT)
    }

    /// The unit compiled from asset `uuid`, or the dummy unit.
    pub fn unit_by_uuid(&self, uuid: u64) -> &Arc<CompiledUnit> {
        self.get_by_uuid(uuid).unwrap_or(&DUMMY_UNIT)
    }

    pub fn index_of(&self, uuid: u64) -> Option<usize> {
        self.units.binary_search_by_key(&uuid, |u| u.uuid).ok()
    }

    /// Asset UUID to index, as consumed by script component builds.
    pub fn asset_indices(&self) -> AHashMap<u64, u16> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(i, u)| u16::try_from(i).ok().map(|i| (u.uuid, i)))
            .collect()
    }

    /// Generated source of every unit followed by the lookup table.
    pub fn render_source(&self) -> String {
        let mut out = self.units.iter().map(|u| u.source.as_str()).join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.render_table_source());
        out
    }

    /// The lookup table alone: stack sizes by index and a UUID switch to entry points.
    pub fn render_table_source(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("#define SCRIPT_COUNT {}\n\n", self.units.len()));

        let sizes = self.units.iter().map(|u| u.stack_size.to_string()).join(", ");
        out.push_str(&format!(
            "const uint16_t SCRIPT_STACK_SIZE[{}] = {{ {} }};\n\n",
            self.units.len().max(1),
            if sizes.is_empty() { "0".to_string() } else { sizes }
        ));

        let states = self
            .units
            .iter()
            .map(|u| {
                if u.has_instance_state() {
                    format!("sizeof({}_state)", u.function)
                } else {
                    "0".to_string()
                }
            })
            .join(", ");
        out.push_str(&format!(
            "const uint16_t SCRIPT_STATE_SIZE[{}] = {{ {} }};\n\n",
            self.units.len().max(1),
            if states.is_empty() { "0".to_string() } else { states }
        ));

        out.push_str("ScriptFn script_by_uuid(uint64_t uuid) {\n");
        out.push_str("  switch (uuid) {\n");
        for unit in &self.units {
            out.push_str(&format!(
                "    case 0x{}ULL: return {};\n",
                hash::to_hex64(unit.uuid),
                unit.function
            ));
        }
        out.push_str("    default: return script_dummy;\n");
        out.push_str("  }\n");
        out.push_str("}\n");
        out
    }

    /// Saves the table to a file using the bincode format.
    pub fn save(&self, path: &str) -> Result<(), ArtifactError> {
        let bytes = self.to_bytes()?;
        let mut file = fs::File::create(path).map_err(|source| ArtifactError::Io {
            path: path.to_string(),
            source,
        })?;
        file.write_all(&bytes).map_err(|source| ArtifactError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(())
    }

    /// Loads a table from a file.
    pub fn from_file(path: &str) -> Result<Self, ArtifactError> {
        let mut file = fs::File::open(path).map_err(|source| ArtifactError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| ArtifactError::Io {
                path: path.to_string(),
                source,
            })?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        encode_to_vec(self, standard()).map_err(|e| ArtifactError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        decode_from_slice(bytes, standard())
            .map(|(table, _)| table)
            .map_err(|e| ArtifactError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(uuid: u64) -> CompiledUnit {
        CompiledUnit {
            uuid,
            name: format!("unit{}", uuid),
            function: format!("graph_{}", hash::to_hex64(uuid)),
            stack_size: 4,
            ..CompiledUnit::dummy()
        }
    }

    #[test]
    fn units_are_sorted_and_replaced_by_uuid() {
        let mut table = ScriptTable::new();
        table.add(unit(30));
        table.add(unit(10));
        table.add(unit(20));
        let mut again = unit(20);
        again.stack_size = 9;
        table.add(again);

        assert_eq!(table.len(), 3);
        assert_eq!(table.index_of(10), Some(0));
        assert_eq!(table.index_of(30), Some(2));
        assert_eq!(table.unit_by_uuid(20).stack_size, 9);
        assert_eq!(table.asset_indices().get(&30), Some(&2));
    }

    #[test]
    fn missing_lookups_return_the_dummy() {
        let mut table = ScriptTable::new();
        table.add(unit(1));
        assert!(table.unit_by_index(5).is_dummy());
        assert!(table.unit_by_uuid(2).is_dummy());
        assert!(!table.unit_by_index(0).is_dummy());
    }

    #[test]
    fn table_source_lists_every_unit() {
        let mut table = ScriptTable::new();
        table.add(unit(0xAB));
        let text = table.render_table_source();
        assert!(text.contains("#define SCRIPT_COUNT 1"));
        assert!(text.contains("{ 4 }"));
        assert!(text.contains("case 0x00000000000000ABULL: return graph_00000000000000AB;"));
    }

    #[test]
    fn bytes_round_trip() {
        let mut table = ScriptTable::new();
        table.add(unit(7));
        let restored = ScriptTable::from_bytes(&table.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.unit_by_index(0).as_ref(), table.unit_by_index(0).as_ref());
    }
}

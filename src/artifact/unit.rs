use crate::bytecode::{GlobalKind, Program};
use serde::{Deserialize, Serialize};

/// The build output for one graph asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledUnit {
    /// UUID of the graph asset.
    pub uuid: u64,
    pub name: String,
    /// Name of the generated function, `graph_<UUID>`.
    pub function: String,
    pub program: Program,
    /// Required execution stack in slots, before the runtime safety factor.
    pub stack_size: u16,
    /// Generated source for the unit.
    pub source: String,
}

impl CompiledUnit {
    /// The inert unit returned for lookups that match nothing. It has no entries, so
    /// an instance bound to it finishes on its first update.
    pub fn dummy() -> Self {
        Self {
            uuid: 0,
            name: "<dummy>".to_string(),
            function: "script_dummy".to_string(),
            program: Program::default(),
            stack_size: 0,
            source: String::new(),
        }
    }

    /// Whether the generated source declares a per-instance state struct.
    pub fn has_instance_state(&self) -> bool {
        self.program
            .globals
            .iter()
            .any(|g| matches!(g.kind, GlobalKind::Int | GlobalKind::Counter))
    }

    pub fn is_dummy(&self) -> bool {
        self.uuid == 0 && self.program.code.is_empty()
    }
}

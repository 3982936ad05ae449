//! Runs compiled units, one `Instance` per live object.
//!
//! Everything here is single-threaded and cooperative: a scheduler resumes each
//! instance once per tick, and an instance runs until it reaches a Wait or its
//! execution ends. Runtime problems never surface as errors; they are logged and the
//! affected instance degrades to doing nothing.

mod instance;
mod registry;
mod scheduler;
mod vm;

pub use instance::Instance;
pub use registry::{FunctionRegistry, UserFn};
pub use scheduler::Scheduler;

use crate::artifact::ScriptTable;
use serde::{Deserialize, Serialize};

/// Largest `stack_safety_factor` honored; larger configured values are clamped.
pub const MAX_STACK_SAFETY_FACTOR: u16 = 16;

/// Runtime tuning, loadable from JSON by hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Multiplier applied to a unit's declared stack size when allocating locals,
    /// within `1..=MAX_STACK_SAFETY_FACTOR`.
    pub stack_safety_factor: u16,
    /// Event and Collision triggers queued while an execution is still running.
    pub max_pending_triggers: usize,
    /// Instructions a single resume may execute before it is forced to yield.
    pub max_steps_per_resume: usize,
}

impl RuntimeConfig {
    /// The configured factor clamped to the supported range.
    pub fn effective_safety_factor(&self) -> u16 {
        self.stack_safety_factor.clamp(1, MAX_STACK_SAFETY_FACTOR)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_safety_factor: 2,
            max_pending_triggers: 4,
            max_steps_per_resume: 10_000,
        }
    }
}

/// A side effect requested by a script, applied by whoever drives the instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    DeleteObject {
        object: u16,
    },
    SendEvent {
        target: u16,
        sender: u16,
        event_type: u16,
        value: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    Unloaded,
    Running,
    Suspended,
    Finished,
}

/// The frozen inputs of a simulation: the script table, the native functions and the
/// runtime configuration. Built once, then shared by reference.
#[derive(Debug, Default)]
pub struct ScriptRuntime {
    table: ScriptTable,
    functions: FunctionRegistry,
    config: RuntimeConfig,
}

impl ScriptRuntime {
    pub fn new(table: ScriptTable, functions: FunctionRegistry, config: RuntimeConfig) -> Self {
        Self {
            table,
            functions,
            config,
        }
    }

    pub fn table(&self) -> &ScriptTable {
        &self.table
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// A new instance for `object_id`, loaded with the unit at `asset_index`.
    pub fn instantiate(&self, object_id: u16, asset_index: usize) -> Instance {
        let mut instance = Instance::new(object_id);
        instance.load(&self.table, &self.functions, asset_index, &self.config);
        instance
    }
}

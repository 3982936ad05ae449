use super::vm::{Machine, Resume};
use super::{Command, FunctionRegistry, InstanceState, RuntimeConfig};
use crate::artifact::{CompiledUnit, ScriptTable};
use crate::bytecode::{GlobalKind, Trigger};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// The execution of one compiled unit on behalf of one object.
///
/// `load` starts the Init entry, `update` resumes it once per tick. Event and
/// Collision triggers start their entries when the current execution is done.
/// Dropping an instance discards its execution wherever it stands.
pub struct Instance {
    object_id: u16,
    state: InstanceState,
    unit: Option<Arc<CompiledUnit>>,
    machine: Machine,
    pending: VecDeque<Trigger>,
    config: RuntimeConfig,
}

impl Instance {
    pub fn new(object_id: u16) -> Self {
        Self {
            object_id,
            state: InstanceState::Unloaded,
            unit: None,
            machine: Machine {
                object_id,
                ..Machine::default()
            },
            pending: VecDeque::new(),
            config: RuntimeConfig::default(),
        }
    }

    /// Binds the unit at `asset_index`. A missing unit is logged and replaced by the
    /// dummy, whose first update finishes.
    pub fn load(
        &mut self,
        table: &ScriptTable,
        functions: &FunctionRegistry,
        asset_index: usize,
        config: &RuntimeConfig,
    ) {
        let unit = match table.get(asset_index) {
            Some(unit) => unit.clone(),
            None => {
                error!(
                    "Object {}: no compiled unit at index {} (table has {})",
                    self.object_id,
                    asset_index,
                    table.len()
                );
                table.unit_by_index(asset_index).clone()
            }
        };
        self.bind(unit, functions, config);
    }

    /// Binds the unit compiled from graph asset `uuid`.
    pub fn load_uuid(
        &mut self,
        table: &ScriptTable,
        functions: &FunctionRegistry,
        uuid: u64,
        config: &RuntimeConfig,
    ) {
        let unit = match table.get_by_uuid(uuid) {
            Some(unit) => unit.clone(),
            None => {
                error!(
                    "Object {}: no compiled unit for asset {:016X}",
                    self.object_id, uuid
                );
                table.unit_by_uuid(uuid).clone()
            }
        };
        self.bind(unit, functions, config);
    }

    fn bind(&mut self, unit: Arc<CompiledUnit>, functions: &FunctionRegistry, config: &RuntimeConfig) {
        let program = &unit.program;
        let machine = &mut self.machine;

        machine.globals = program.globals.iter().map(|g| g.init).collect();
        machine.bound = program
            .globals
            .iter()
            .map(|g| match g.kind {
                GlobalKind::UserFunc(name_hash) => {
                    let f = functions.resolve(name_hash);
                    if f.is_none() {
                        warn!(
                            "Object {}: function #{:08X} used by '{}' is not registered",
                            self.object_id, name_hash, unit.name
                        );
                    }
                    f
                }
                GlobalKind::Int | GlobalKind::Counter => None,
            })
            .collect();

        let factor = config.effective_safety_factor();
        if factor != config.stack_safety_factor {
            warn!(
                "Object {}: stack safety factor {} clamped to {}",
                self.object_id, config.stack_safety_factor, factor
            );
        }
        let slots = unit.stack_size as usize * factor as usize;
        machine.locals = vec![0; slots.max(program.max_locals as usize)];
        machine.commands.clear();
        machine.slept_ms = None;
        machine.pc = program.entry(Trigger::Init);

        debug!(
            "Object {}: loaded '{}' with {} stack slots",
            self.object_id, unit.name, slots
        );
        self.unit = Some(unit);
        self.pending.clear();
        self.config = config.clone();
        self.state = InstanceState::Running;
    }

    /// Resumes the current execution once. Does nothing when unloaded or finished.
    pub fn update(&mut self, dt: f32) {
        if matches!(self.state, InstanceState::Unloaded | InstanceState::Finished) {
            return;
        }
        let Some(unit) = self.unit.clone() else {
            return;
        };

        let dt_ms = dt.max(0.0) as f64 * 1000.0;
        self.state = match self
            .machine
            .resume(&unit.program, dt_ms, self.config.max_steps_per_resume)
        {
            Resume::Suspended => InstanceState::Suspended,
            Resume::Finished if self.next_pending(&unit) => InstanceState::Running,
            Resume::Finished => InstanceState::Finished,
        };
    }

    /// Requests the entry for `trigger`. It starts right away when nothing is running,
    /// otherwise it waits in a bounded queue.
    pub fn trigger(&mut self, trigger: Trigger) {
        let Some(unit) = self.unit.clone() else {
            debug!("Object {}: {} ignored, nothing loaded", self.object_id, trigger);
            return;
        };
        let Some(entry) = unit.program.entry(trigger) else {
            debug!(
                "Object {}: {} ignored, '{}' has no such entry",
                self.object_id, trigger, unit.name
            );
            return;
        };

        if self.state == InstanceState::Finished {
            self.machine.pc = Some(entry);
            self.state = InstanceState::Running;
        } else if self.pending.len() < self.config.max_pending_triggers {
            self.pending.push_back(trigger);
        } else {
            warn!(
                "Object {}: trigger queue full, dropping {}",
                self.object_id, trigger
            );
        }
    }

    fn next_pending(&mut self, unit: &CompiledUnit) -> bool {
        while let Some(trigger) = self.pending.pop_front() {
            if let Some(entry) = unit.program.entry(trigger) {
                self.machine.pc = Some(entry);
                return true;
            }
        }
        false
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == InstanceState::Finished
    }

    /// Local slots allocated at load.
    pub fn stack_slots(&self) -> usize {
        self.machine.locals.len()
    }

    pub fn object_id(&self) -> u16 {
        self.object_id
    }

    pub fn unit(&self) -> Option<&Arc<CompiledUnit>> {
        self.unit.as_ref()
    }

    /// Current value of a global by its generated name, e.g. a Repeat counter.
    pub fn global(&self, name: &str) -> Option<i64> {
        let unit = self.unit.as_ref()?;
        let slot = unit.program.globals.iter().position(|g| g.name == name)?;
        self.machine.globals.get(slot).copied()
    }

    /// Drains the commands produced since the last call.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.machine.commands)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("object_id", &self.object_id)
            .field("state", &self.state)
            .field("unit", &self.unit.as_ref().map(|u| u.name.as_str()))
            .field("pc", &self.machine.pc)
            .field("pending", &self.pending)
            .finish()
    }
}

use super::{Command, Instance, InstanceState, ScriptRuntime};
use crate::bytecode::Trigger;
use crate::component::ComponentRecord;
use std::collections::BTreeMap;
use tracing::{debug, trace};

struct Scripted {
    record: ComponentRecord,
    instance: Instance,
}

/// Drives the script instances of a scene, one resume per instance per tick, in
/// ascending object id order.
pub struct Scheduler<'rt> {
    runtime: &'rt ScriptRuntime,
    objects: BTreeMap<u16, Scripted>,
}

impl<'rt> Scheduler<'rt> {
    pub fn new(runtime: &'rt ScriptRuntime) -> Self {
        Self {
            runtime,
            objects: BTreeMap::new(),
        }
    }

    /// Adds an object with a script component. Auto-run scripts load immediately.
    /// Spawning an id that already exists replaces its instance.
    pub fn spawn(&mut self, object_id: u16, record: ComponentRecord) {
        let mut instance = Instance::new(object_id);
        if record.auto_run {
            load(self.runtime, &mut instance, &record);
        }
        self.objects.insert(object_id, Scripted { record, instance });
    }

    /// Starts a script that is not running: the first activation of a non auto-run
    /// script, or a restart of a finished repeatable one. Returns whether it started.
    pub fn activate(&mut self, object_id: u16) -> bool {
        let runtime = self.runtime;
        let Some(Scripted { record, instance }) = self.objects.get_mut(&object_id) else {
            return false;
        };
        match instance.state() {
            InstanceState::Unloaded => {
                load(runtime, instance, record);
                true
            }
            InstanceState::Finished if record.repeatable => {
                load(runtime, instance, record);
                true
            }
            state => {
                debug!("Object {}: activation ignored in state {:?}", object_id, state);
                false
            }
        }
    }

    pub fn trigger(&mut self, object_id: u16, trigger: Trigger) {
        if let Some(scripted) = self.objects.get_mut(&object_id) {
            scripted.instance.trigger(trigger);
        }
    }

    /// Removes an object. Its execution is discarded where it stands.
    pub fn despawn(&mut self, object_id: u16) -> bool {
        self.objects.remove(&object_id).is_some()
    }

    /// Updates every instance once, then applies the commands they produced: deleted
    /// objects are despawned and events trigger the target's Event entry. All commands
    /// are returned in the order they were produced.
    pub fn tick(&mut self, dt: f32) -> Vec<Command> {
        let mut commands = Vec::new();
        for scripted in self.objects.values_mut() {
            scripted.instance.update(dt);
            commands.extend(scripted.instance.take_commands());
        }

        for command in &commands {
            match *command {
                Command::DeleteObject { object } => {
                    if self.despawn(object) {
                        trace!("Object {} deleted by script", object);
                    }
                }
                Command::SendEvent { target, .. } => self.trigger(target, Trigger::Event),
            }
        }
        commands
    }

    pub fn instance(&self, object_id: u16) -> Option<&Instance> {
        self.objects.get(&object_id).map(|s| &s.instance)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

fn load(runtime: &ScriptRuntime, instance: &mut Instance, record: &ComponentRecord) {
    instance.load(
        runtime.table(),
        runtime.functions(),
        record.asset_index as usize,
        runtime.config(),
    );
}

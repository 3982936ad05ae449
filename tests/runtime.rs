//! Tests for instances, triggers and the scheduler.
mod common;
use common::*;
use kairo::graph::CompareOp;
use kairo::prelude::*;
use kairo::runtime::MAX_STACK_SAFETY_FACTOR;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

fn loaded(graph: Graph, functions: &FunctionRegistry, config: &RuntimeConfig) -> Instance {
    let table = table_of(vec![graph], functions);
    let mut instance = Instance::new(7);
    instance.load(&table, functions, 0, config);
    instance
}

#[test]
fn test_wait_then_delete_scenario() {
    let functions = FunctionRegistry::new();
    let mut instance = loaded(wait_then_delete(0.5), &functions, &RuntimeConfig::default());
    assert_eq!(instance.state(), InstanceState::Running);

    instance.update(0.2);
    assert_eq!(instance.state(), InstanceState::Suspended);
    instance.update(0.2);
    assert_eq!(instance.state(), InstanceState::Suspended);
    assert!(instance.take_commands().is_empty());

    instance.update(0.2);
    assert_eq!(
        instance.take_commands(),
        vec![Command::DeleteObject { object: 7 }]
    );

    instance.update(0.2);
    assert_eq!(instance.state(), InstanceState::Finished);
    assert!(instance.take_commands().is_empty());
}

#[test]
fn test_wait_suspends_until_duration_elapsed() {
    let functions = FunctionRegistry::new();
    let mut instance = loaded(wait_then_delete(1.0), &functions, &RuntimeConfig::default());
    for _ in 0..9 {
        instance.update(0.1);
        assert_eq!(instance.state(), InstanceState::Suspended);
    }
    instance.update(0.15);
    assert_eq!(instance.state(), InstanceState::Finished);
}

#[test]
fn test_equal_values_take_the_true_branch() {
    let functions = FunctionRegistry::new();
    let config = RuntimeConfig::default();
    let mut instance = loaded(compare_values(5, CompareOp::GreaterEqual, 5), &functions, &config);
    instance.update(0.016);
    assert_eq!(instance.state(), InstanceState::Finished);
    assert_eq!(
        instance.take_commands(),
        vec![Command::SendEvent {
            target: 7,
            sender: 7,
            event_type: 1,
            value: 0
        }]
    );

    let mut instance = loaded(compare_values(4, CompareOp::GreaterEqual, 5), &functions, &config);
    instance.update(0.016);
    assert!(matches!(
        &instance.take_commands()[..],
        [Command::SendEvent { event_type: 2, .. }]
    ));
}

#[test]
fn test_repeat_takes_loop_n_times_then_exit() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut functions = FunctionRegistry::new();
    let counter = calls.clone();
    functions.register_named("tick", move |arg| {
        assert_eq!(arg, 7);
        counter.fetch_add(1, Ordering::SeqCst) as i32
    });

    let mut instance = loaded(repeat_calls(4), &functions, &RuntimeConfig::default());
    instance.update(0.016);

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(instance.state(), InstanceState::Finished);
    assert_eq!(
        instance.take_commands(),
        vec![Command::DeleteObject { object: 7 }]
    );
    // The counter resets once the exit branch is taken.
    assert_eq!(instance.global("cnt_0000000000000020"), Some(0));
    assert_eq!(instance.global("res_0000000000000021"), Some(3));
}

#[test]
fn test_repeat_counter_survives_waits_in_the_loop() {
    let functions = FunctionRegistry::new();
    let mut instance = loaded(repeat_with_wait(2, 0.1), &functions, &RuntimeConfig::default());
    let event = Command::SendEvent {
        target: 7,
        sender: 7,
        event_type: 3,
        value: 0,
    };

    instance.update(0.1);
    assert_eq!(instance.state(), InstanceState::Suspended);
    assert!(instance.take_commands().is_empty());
    assert_eq!(instance.global("cnt_0000000000000070"), Some(1));

    instance.update(0.1);
    assert_eq!(instance.state(), InstanceState::Suspended);
    assert_eq!(instance.take_commands(), vec![event]);
    assert_eq!(instance.global("cnt_0000000000000070"), Some(2));

    instance.update(0.1);
    assert_eq!(instance.state(), InstanceState::Finished);
    assert_eq!(
        instance.take_commands(),
        vec![event, Command::DeleteObject { object: 7 }]
    );
    assert_eq!(instance.global("cnt_0000000000000070"), Some(0));
}

#[test]
fn test_function_result_drives_comparison() {
    let mut functions = FunctionRegistry::new();
    functions.register_named("double", |x| x as i32 * 2);
    let mut instance = loaded(function_result_compare(), &functions, &RuntimeConfig::default());
    instance.update(0.016);
    assert!(matches!(
        &instance.take_commands()[..],
        [Command::SendEvent { event_type: 1, .. }]
    ));

    // Unregistered functions return 0, so the comparison fails.
    let empty = FunctionRegistry::new();
    let mut instance = loaded(function_result_compare(), &empty, &RuntimeConfig::default());
    instance.update(0.016);
    assert!(matches!(
        &instance.take_commands()[..],
        [Command::SendEvent { event_type: 2, .. }]
    ));
}

#[test]
fn test_missing_unit_is_inert() {
    let functions = FunctionRegistry::new();
    let table = table_of(vec![wait_then_delete(0.5)], &functions);
    let config = RuntimeConfig::default();

    let mut instance = Instance::new(3);
    instance.load(&table, &functions, 12, &config);
    assert_eq!(instance.state(), InstanceState::Running);
    assert!(instance.unit().is_some_and(|u| u.is_dummy()));
    instance.update(0.016);
    assert_eq!(instance.state(), InstanceState::Finished);
    assert!(instance.take_commands().is_empty());

    let mut instance = Instance::new(3);
    instance.load_uuid(&table, &functions, 0xBAD, &config);
    instance.update(0.016);
    assert_eq!(instance.state(), InstanceState::Finished);

    instance.trigger(Trigger::Event);
    assert_eq!(instance.state(), InstanceState::Finished);
}

#[test]
fn test_unloaded_instance_ignores_updates() {
    let mut instance = Instance::new(1);
    instance.update(1.0);
    instance.trigger(Trigger::Event);
    assert_eq!(instance.state(), InstanceState::Unloaded);
}

#[test]
fn test_event_waits_for_the_running_execution() {
    let functions = FunctionRegistry::new();
    let mut instance = loaded(wait_and_echo(1.0), &functions, &RuntimeConfig::default());

    instance.trigger(Trigger::Event);
    instance.update(0.5);
    assert_eq!(instance.state(), InstanceState::Suspended);
    instance.update(0.6);
    // Init finished; the queued Event starts on the next update.
    assert_eq!(instance.state(), InstanceState::Running);
    assert!(instance.take_commands().is_empty());

    instance.update(0.016);
    assert_eq!(instance.state(), InstanceState::Finished);
    assert_eq!(
        instance.take_commands(),
        vec![Command::SendEvent {
            target: 7,
            sender: 7,
            event_type: 5,
            value: 9
        }]
    );

    // No Collision entry: ignored.
    instance.trigger(Trigger::Collision);
    assert_eq!(instance.state(), InstanceState::Finished);

    // A finished instance starts the entry right away.
    instance.trigger(Trigger::Event);
    assert_eq!(instance.state(), InstanceState::Running);
}

#[test]
fn test_trigger_queue_is_bounded() {
    let functions = FunctionRegistry::new();
    let config = RuntimeConfig {
        max_pending_triggers: 2,
        ..RuntimeConfig::default()
    };
    let mut instance = loaded(wait_and_echo(0.0), &functions, &config);
    for _ in 0..5 {
        instance.trigger(Trigger::Event);
    }

    let mut events = 0;
    for _ in 0..10 {
        instance.update(0.016);
        events += instance.take_commands().len();
    }
    assert_eq!(events, 2);
    assert_eq!(instance.state(), InstanceState::Finished);
}

#[test]
fn test_config_loads_from_json_with_defaults() {
    let config: RuntimeConfig = serde_json::from_str(r#"{ "stack_safety_factor": 3 }"#).unwrap();
    assert_eq!(config.stack_safety_factor, 3);
    assert_eq!(config.max_pending_triggers, 4);
    assert_eq!(config.max_steps_per_resume, 10_000);
}

#[test]
fn test_stack_safety_factor_is_clamped() {
    let functions = FunctionRegistry::new();
    let graph = wait_then_delete(0.5);
    let stack = compile(graph.clone(), 1, &functions).stack_size as usize;

    let huge = RuntimeConfig {
        stack_safety_factor: u16::MAX,
        ..RuntimeConfig::default()
    };
    let instance = loaded(graph.clone(), &functions, &huge);
    assert_eq!(
        instance.stack_slots(),
        stack * MAX_STACK_SAFETY_FACTOR as usize
    );
    assert_eq!(instance.state(), InstanceState::Running);

    let zero = RuntimeConfig {
        stack_safety_factor: 0,
        ..RuntimeConfig::default()
    };
    assert_eq!(loaded(graph, &functions, &zero).stack_slots(), stack);
}

#[test]
fn test_scheduler_spawn_activate_and_delete() {
    let functions = FunctionRegistry::new();
    let table = table_of(vec![wait_then_delete(0.5), ping(2)], &functions);
    let runtime = ScriptRuntime::new(table, functions, RuntimeConfig::default());
    let mut scheduler = Scheduler::new(&runtime);

    scheduler.spawn(
        1,
        ComponentRecord {
            asset_index: 0,
            auto_run: true,
            repeatable: false,
        },
    );
    scheduler.spawn(
        5,
        ComponentRecord {
            asset_index: 1,
            auto_run: false,
            repeatable: true,
        },
    );
    assert_eq!(
        scheduler.instance(5).map(|i| i.state()),
        Some(InstanceState::Unloaded)
    );

    assert!(scheduler.tick(0.2).is_empty());
    assert!(scheduler.tick(0.2).is_empty());
    assert_eq!(
        scheduler.tick(0.2),
        vec![Command::DeleteObject { object: 1 }]
    );
    assert!(scheduler.instance(1).is_none());
    assert_eq!(scheduler.len(), 1);

    // Manual activation, then a repeat once finished.
    assert!(scheduler.activate(5));
    assert!(!scheduler.activate(5));
    assert_eq!(scheduler.tick(0.016).len(), 1);
    assert!(scheduler.instance(5).is_some_and(|i| i.is_finished()));
    assert!(scheduler.activate(5));
    assert_eq!(scheduler.tick(0.016).len(), 1);
}

#[test]
fn test_scheduler_routes_events() {
    let functions = FunctionRegistry::new();
    let table = table_of(vec![ping(2), delete_on_event()], &functions);
    let runtime = ScriptRuntime::new(table, functions, RuntimeConfig::default());
    let mut scheduler = Scheduler::new(&runtime);

    let record = |asset_index| ComponentRecord {
        asset_index,
        auto_run: true,
        repeatable: false,
    };
    scheduler.spawn(1, record(0));
    scheduler.spawn(2, record(1));

    let first = scheduler.tick(0.016);
    assert_eq!(
        first,
        vec![Command::SendEvent {
            target: 2,
            sender: 1,
            event_type: 1,
            value: 0
        }]
    );
    assert_eq!(
        scheduler.instance(2).map(|i| i.state()),
        Some(InstanceState::Running)
    );

    assert_eq!(
        scheduler.tick(0.016),
        vec![Command::DeleteObject { object: 2 }]
    );
    assert!(scheduler.instance(2).is_none());
    assert!(scheduler.despawn(1));
    assert!(scheduler.is_empty());
}

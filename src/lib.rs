//! # Kairo - Node-Graph Script Compiler and Runtime
//!
//! **Kairo** turns artist-authored node graphs into small per-object scripts and runs
//! them cooperatively, one resume per object per simulation tick.
//!
//! ## Core Workflow
//!
//! 1.  **Author**: A `Graph` holds typed nodes (Start, Wait, Compare, Repeat, ...)
//!     connected through Logic pins (control flow) and Value pins (data). Graphs are
//!     stored as JSON.
//! 2.  **Compile**: `Compiler::builder` walks the graph from its Start node and lowers
//!     it into a `CompiledUnit`: a flat instruction `Program`, the equivalent generated
//!     source, and the stack size the unit needs. Compiling an unchanged graph always
//!     produces identical output.
//! 3.  **Collect**: A `ScriptTable` maps every graph asset UUID to its unit and is
//!     saved with bincode.
//! 4.  **Run**: An `Instance` binds one unit to one object. Each `update` resumes it
//!     until it reaches a Wait or ends. A `Scheduler` drives all instances of a scene
//!     and applies the commands they emit.
//!
//! ## Quick Start
//!
//! ```rust
//! use kairo::prelude::*;
//! use kairo::graph::{ObjDelProps, WaitProps};
//!
//! fn main() -> Result<()> {
//!     // Start -> Wait(0.5s) -> delete self
//!     let mut graph = Graph::new();
//!     let start = graph.start().uuid;
//!     let wait = graph.add_kind(NodeKind::Wait(WaitProps { time: 0.5 }), [200.0, 0.0]);
//!     let del = graph.add_kind(NodeKind::ObjDel(ObjDelProps::default()), [400.0, 0.0]);
//!     graph.link(start, 0, wait, 0)?;
//!     graph.link(wait, 0, del, 0)?;
//!
//!     let unit = Compiler::builder(graph)
//!         .with_asset_uuid(0x1234)
//!         .with_asset_name("despawn")
//!         .build()
//!         .compile()?;
//!     println!("{}", unit.source);
//!
//!     let mut table = ScriptTable::new();
//!     table.add(unit);
//!
//!     let functions = FunctionRegistry::new();
//!     let mut instance = Instance::new(7);
//!     instance.load(&table, &functions, 0, &RuntimeConfig::default());
//!     for _ in 0..3 {
//!         instance.update(0.2);
//!     }
//!
//!     assert_eq!(instance.state(), InstanceState::Finished);
//!     assert_eq!(instance.take_commands(), vec![Command::DeleteObject { object: 7 }]);
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod bytecode;
pub mod catalog;
pub mod compiler;
pub mod component;
pub mod error;
pub mod graph;
pub mod hash;
pub mod legacy;
pub mod prelude;
pub mod project;
pub mod runtime;

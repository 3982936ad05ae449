//! Prelude module for convenient imports
//!
//! Re-exports the types needed to build graphs, compile them and run the result.
//!
//! # Example
//!
//! ```rust,no_run
//! use kairo::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/graph.json")?;
//! let graph = Graph::from_json(&json)?;
//!
//! let functions = FunctionRegistry::new();
//! let unit = Compiler::builder(graph)
//!     .with_asset_uuid(1)
//!     .with_functions(&functions)
//!     .build()
//!     .compile()?;
//!
//! let mut table = ScriptTable::new();
//! table.add(unit);
//!
//! let mut instance = Instance::new(1);
//! instance.load(&table, &functions, 0, &RuntimeConfig::default());
//! instance.update(1.0 / 60.0);
//! println!("{:?}", instance.state());
//! # Ok(())
//! # }
//! ```

// Graph model
pub use crate::catalog::NodeType;
pub use crate::graph::{Graph, Link, Node, NodeKind};

// Compilation
pub use crate::artifact::{CompiledUnit, ScriptTable};
pub use crate::bytecode::Trigger;
pub use crate::compiler::{Compiler, GraphAsset, build_project};

// Runtime
pub use crate::component::{ComponentRecord, ScriptComponent};
pub use crate::runtime::{
    Command, FunctionRegistry, Instance, InstanceState, RuntimeConfig, ScriptRuntime, Scheduler,
};

// Error types
pub use crate::error::{ArtifactError, CompileError, DecodeError, GraphError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

//! The aggregate output of a project build: every compiled unit, addressable by
//! asset UUID or by index, persisted with bincode.

mod table;
mod unit;

pub use table::ScriptTable;
pub use unit::CompiledUnit;

//! The executable form of a compiled graph.
//!
//! A `Program` is a flat instruction list with one optional entry address per
//! Start-node trigger. Suspension points are explicit `Sleep` instructions, so an
//! execution is fully described by a program counter plus its storage and can be
//! resumed without any stack switching.

pub mod opcode;
pub mod visualizer;

use opcode::{Addr, OpCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The Start node outputs, each an independent entry into the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// Runs when the script component activates.
    Init,
    /// Runs when the owning object receives an event.
    Event,
    /// Runs when the owning object collides.
    Collision,
}

impl Trigger {
    pub const ALL: [Trigger; 3] = [Trigger::Init, Trigger::Event, Trigger::Collision];

    /// Output pin on the Start node that feeds this trigger.
    pub fn pin(self) -> u16 {
        self as u16
    }

    pub fn label(self) -> &'static str {
        match self {
            Trigger::Init => "entry_init",
            Trigger::Event => "entry_event",
            Trigger::Collision => "entry_collision",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trigger::Init => "Init",
            Trigger::Event => "Event",
            Trigger::Collision => "Collision",
        };
        f.pad(name)
    }
}

/// What a global slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalKind {
    /// A number, such as a function call result.
    Int,
    /// A loop counter owned by a Repeat node.
    Counter,
    /// A reference to the user function registered under this name hash.
    UserFunc(u32),
}

/// A variable declared once per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalDecl {
    pub name: String,
    pub kind: GlobalKind,
    pub init: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<OpCode>,
    /// Entry address per trigger, indexed by `Trigger::pin`.
    pub entries: [Option<Addr>; 3],
    pub globals: Vec<GlobalDecl>,
    /// Largest number of local constants any single node block binds.
    pub max_locals: u16,
}

impl Program {
    pub fn entry(&self, trigger: Trigger) -> Option<Addr> {
        self.entries[trigger.pin() as usize]
    }
}

use crate::graph::CompareOp;
use serde::{Deserialize, Serialize};

/// Index into a unit's global table or into the current node's local frame.
pub type Slot = u16;

/// Code address inside a `Program`.
pub type Addr = u32;

/// Where an instruction reads a number from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Const(i64),
    Global(Slot),
    Local(Slot),
}

/// An instruction of the resumable script machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    /// Binds a node-local constant.
    SetLocal(Slot, i64),

    /// Suspension point: yield, then resume once the given milliseconds have elapsed.
    Sleep(Operand),

    /// Removes an object. `0` addresses the owning object.
    DeleteObject(Operand),
    /// Sends an event to an object. `0` addresses the owning object.
    SendEvent {
        object: Operand,
        event_type: Operand,
        value: Operand,
    },
    /// Calls a registered user function and stores its result in a global.
    Call {
        func: Slot,
        arg: Operand,
        result: Slot,
    },

    // Control flow
    /// Continues with the next instruction when the comparison holds, else jumps.
    JumpUnless {
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
        target: Addr,
    },
    /// Counted loop head: increments `counter` and falls through while below `bound`,
    /// otherwise resets it to zero and jumps to `exit`.
    Repeat {
        counter: Slot,
        bound: u32,
        exit: Addr,
    },
    Jump(Addr),

    /// End of the current execution.
    End,
}

use crate::bytecode::opcode::{Addr, OpCode, Operand, Slot};
use crate::bytecode::{GlobalDecl, GlobalKind};
use crate::hash;
use ahash::AHashMap;

/// Accumulates everything one graph compiles into: global declarations, per-node
/// local constants, generated source lines and the matching instructions.
///
/// Function references are file-scope in the generated source. Call results and
/// Repeat counters belong to one instance and live in the unit's state struct,
/// reached through `state->`.
///
/// Every name handed out is derived from node UUIDs or name hashes, never from
/// visitation counters, so an unmodified graph always produces identical output.
#[derive(Debug, Default)]
pub struct BuildContext {
    globals: Vec<GlobalDecl>,
    global_types: Vec<String>,
    global_inits: Vec<String>,
    global_texts: Vec<String>,
    global_slots: AHashMap<String, Slot>,

    code: Vec<OpCode>,
    lines: Vec<String>,
    indent: usize,

    block_locals: Vec<String>,
    max_locals: usize,
    labels: AHashMap<u64, Addr>,
}

/// The finished output of a `BuildContext`.
#[derive(Debug)]
pub struct EmittedUnit {
    pub code: Vec<OpCode>,
    pub globals: Vec<GlobalDecl>,
    /// File-scope declarations.
    pub global_lines: Vec<String>,
    /// Fields of the per-instance state struct.
    pub state_lines: Vec<String>,
    pub body_lines: Vec<String>,
    pub max_locals: usize,
}

impl BuildContext {
    pub fn new() -> Self {
        Self {
            indent: 1,
            ..Self::default()
        }
    }

    /// Declares a variable shared by the whole unit. Declaring an existing name again
    /// returns the existing slot and leaves the first declaration untouched.
    pub fn declare_global(
        &mut self,
        ty: &str,
        name: &str,
        kind: GlobalKind,
        init: i64,
        init_text: Option<String>,
    ) -> Slot {
        if let Some(slot) = self.global_slots.get(name) {
            return *slot;
        }
        let slot = self.globals.len() as Slot;
        self.globals.push(GlobalDecl {
            name: name.to_string(),
            kind,
            init,
        });
        self.global_types.push(ty.to_string());
        self.global_inits
            .push(init_text.unwrap_or_else(|| init.to_string()));
        self.global_texts.push(if Self::is_instance_scoped(kind) {
            format!("state->{}", name)
        } else {
            name.to_string()
        });
        self.global_slots.insert(name.to_string(), slot);
        slot
    }

    fn is_instance_scoped(kind: GlobalKind) -> bool {
        matches!(kind, GlobalKind::Int | GlobalKind::Counter)
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn global_name(&self, slot: Slot) -> &str {
        self.globals
            .get(slot as usize)
            .map(|g| g.name.as_str())
            .unwrap_or("<invalid>")
    }

    /// Source text that reads or writes a global, e.g. `state->cnt_<UUID>`.
    pub fn global_text(&self, slot: Slot) -> &str {
        self.global_texts
            .get(slot as usize)
            .map(String::as_str)
            .unwrap_or("<invalid>")
    }

    /// Binds an immutable value visible only inside the current node block.
    pub fn declare_local_const(&mut self, ty: &str, name: &str, value: i64) -> Operand {
        let slot = self.block_locals.len() as Slot;
        self.block_locals.push(name.to_string());
        self.max_locals = self.max_locals.max(self.block_locals.len());
        self.emit_line(format!("const {} {} = {};", ty, name, value));
        self.emit(OpCode::SetLocal(slot, value));
        Operand::Local(slot)
    }

    pub fn local_count(&self) -> usize {
        self.block_locals.len()
    }

    /// Source text for reading an operand inside the current block.
    pub fn operand_text(&self, operand: Operand) -> String {
        match operand {
            Operand::Const(v) => v.to_string(),
            Operand::Global(slot) => self.global_text(slot).to_string(),
            Operand::Local(slot) => self
                .block_locals
                .get(slot as usize)
                .cloned()
                .unwrap_or_else(|| "<invalid>".to_string()),
        }
    }

    /// Appends one statement in visitation order.
    pub fn emit_line(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.lines.push(format!("{}{}", "  ".repeat(self.indent), text));
    }

    /// Appends one instruction and returns its address.
    pub fn emit(&mut self, op: OpCode) -> Addr {
        let addr = self.here();
        self.code.push(op);
        addr
    }

    pub fn here(&self) -> Addr {
        self.code.len() as Addr
    }

    /// Points a previously emitted jump at `target`.
    pub fn patch_jump(&mut self, at: Addr, target: Addr) {
        match self.code.get_mut(at as usize) {
            Some(OpCode::JumpUnless { target: t, .. }) => *t = target,
            Some(OpCode::Repeat { exit, .. }) => *exit = target,
            Some(OpCode::Jump(t)) => *t = target,
            _ => {}
        }
    }

    /// Opens the block of one node. Local constants are scoped to it.
    pub fn begin_block(&mut self) {
        self.emit_line("{");
        self.indent += 1;
        self.block_locals.clear();
    }

    pub fn end_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.emit_line("}");
        self.block_locals.clear();
    }

    /// Opens a nested statement group (the arm of a branch) without touching locals.
    pub fn open(&mut self, header: impl Into<String>) {
        self.emit_line(header);
        self.indent += 1;
    }

    pub fn close(&mut self, footer: impl Into<String>) {
        self.indent = self.indent.saturating_sub(1);
        self.emit_line(footer);
    }

    /// Closes one group and opens the next at the same depth, as in `} else {`.
    pub fn close_open(&mut self, text: impl Into<String>) {
        self.close(text);
        self.indent += 1;
    }

    /// A free-standing label line, such as the start of an entry.
    pub fn emit_label(&mut self, name: &str) {
        self.lines.push(format!("{}:", name));
    }

    /// Records the address of a node's code. Nodes reachable along several paths also
    /// get a source label so later paths can jump to them.
    pub fn bind_label(&mut self, uuid: u64, visible: bool) {
        self.labels.insert(uuid, self.here());
        if visible {
            let label = Self::label_name(uuid);
            self.lines.push(format!("{}:", label));
        }
    }

    pub fn label_of(&self, uuid: u64) -> Option<Addr> {
        self.labels.get(&uuid).copied()
    }

    /// Continues execution at an already emitted node.
    pub fn emit_goto(&mut self, uuid: u64) {
        if let Some(addr) = self.label_of(uuid) {
            self.emit_line(format!("goto {};", Self::label_name(uuid)));
            self.emit(OpCode::Jump(addr));
        }
    }

    /// Ends the current execution path.
    pub fn emit_end(&mut self) {
        self.emit_line("return;");
        self.emit(OpCode::End);
    }

    pub fn label_name(uuid: u64) -> String {
        format!("n_{}", hash::to_hex64(uuid))
    }

    /// Name of a per-node variable, e.g. `res_00000000DEADBEEF`.
    pub fn node_var(prefix: &str, uuid: u64) -> String {
        format!("{}_{}", prefix, hash::to_hex64(uuid))
    }

    pub fn finish(self) -> EmittedUnit {
        let mut global_lines = Vec::new();
        let mut state_lines = Vec::new();
        for (g, (ty, init)) in self
            .globals
            .iter()
            .zip(self.global_types.iter().zip(self.global_inits.iter()))
        {
            if Self::is_instance_scoped(g.kind) {
                state_lines.push(format!("{} {};", ty, g.name));
            } else {
                global_lines.push(format!("{} {} = {};", ty, g.name, init));
            }
        }

        EmittedUnit {
            code: self.code,
            globals: self.globals,
            global_lines,
            state_lines,
            body_lines: self.lines,
            max_locals: self.max_locals,
        }
    }
}

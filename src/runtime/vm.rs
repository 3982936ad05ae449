use super::{Command, UserFn};
use crate::bytecode::Program;
use crate::bytecode::opcode::{Addr, OpCode, Operand, Slot};
use tracing::{error, warn};

/// Outcome of one resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Resume {
    Suspended,
    Finished,
}

/// The saved state of one instance between resumes: where the current execution
/// stands, its storage, and the commands it has produced so far.
#[derive(Default)]
pub(super) struct Machine {
    /// Next instruction of the current execution, `None` when nothing is running.
    pub pc: Option<Addr>,
    /// Milliseconds spent in the Sleep at `pc`, set while suspended there.
    pub slept_ms: Option<f64>,
    pub globals: Vec<i64>,
    /// Native function bound to each global slot that holds a function reference.
    pub bound: Vec<Option<UserFn>>,
    pub locals: Vec<i64>,
    pub commands: Vec<Command>,
    pub object_id: u16,
}

impl Machine {
    fn read(&self, operand: Operand) -> i64 {
        match operand {
            Operand::Const(v) => v,
            Operand::Global(slot) => self.globals.get(slot as usize).copied().unwrap_or(0),
            Operand::Local(slot) => self.locals.get(slot as usize).copied().unwrap_or(0),
        }
    }

    fn set_global(&mut self, slot: Slot, value: i64) -> bool {
        match self.globals.get_mut(slot as usize) {
            Some(g) => {
                *g = value;
                true
            }
            None => false,
        }
    }

    /// Object id operand, where `0` means the owning object.
    fn object(&self, operand: Operand) -> u16 {
        match self.read(operand) as u16 {
            0 => self.object_id,
            id => id,
        }
    }

    /// Runs the current execution until it sleeps or ends. `dt_ms` is the time of the
    /// frame that triggered this resume.
    pub fn resume(&mut self, program: &Program, dt_ms: f64, max_steps: usize) -> Resume {
        let Some(mut pc) = self.pc else {
            return Resume::Finished;
        };

        for _ in 0..max_steps {
            let Some(op) = program.code.get(pc as usize) else {
                error!("Instruction {} is outside the program, ending execution", pc);
                return self.finish();
            };

            match *op {
                OpCode::SetLocal(slot, value) => match self.locals.get_mut(slot as usize) {
                    Some(l) => *l = value,
                    None => {
                        error!("Local slot {} exceeds the allocated stack", slot);
                        return self.finish();
                    }
                },
                OpCode::Sleep(duration) => {
                    let elapsed = match self.slept_ms {
                        None => {
                            self.slept_ms = Some(dt_ms);
                            self.pc = Some(pc);
                            return Resume::Suspended;
                        }
                        Some(ms) => ms + dt_ms,
                    };
                    if elapsed < self.read(duration) as f64 {
                        self.slept_ms = Some(elapsed);
                        self.pc = Some(pc);
                        return Resume::Suspended;
                    }
                    self.slept_ms = None;
                }
                OpCode::DeleteObject(object) => {
                    let object = self.object(object);
                    self.commands.push(Command::DeleteObject { object });
                }
                OpCode::SendEvent {
                    object,
                    event_type,
                    value,
                } => {
                    let command = Command::SendEvent {
                        target: self.object(object),
                        sender: self.object_id,
                        event_type: self.read(event_type) as u16,
                        value: self.read(value) as u32,
                    };
                    self.commands.push(command);
                }
                OpCode::Call { func, arg, result } => {
                    let arg = self.read(arg) as u32;
                    let value = match self.bound.get(func as usize) {
                        Some(Some(f)) => f(arg),
                        _ => {
                            warn!("Called an undefined function (global slot {})", func);
                            0
                        }
                    };
                    self.set_global(result, value as i64);
                }
                OpCode::JumpUnless {
                    op,
                    lhs,
                    rhs,
                    target,
                } => {
                    if !op.eval(self.read(lhs), self.read(rhs)) {
                        pc = target;
                        continue;
                    }
                }
                OpCode::Repeat {
                    counter,
                    bound,
                    exit,
                } => {
                    let count = self.read(Operand::Global(counter));
                    if count < bound as i64 {
                        self.set_global(counter, count + 1);
                    } else {
                        self.set_global(counter, 0);
                        pc = exit;
                        continue;
                    }
                }
                OpCode::Jump(target) => {
                    pc = target;
                    continue;
                }
                OpCode::End => return self.finish(),
            }
            pc += 1;
        }

        warn!(
            "Object {}: execution ran {} instructions without waiting, yielding",
            self.object_id, max_steps
        );
        self.pc = Some(pc);
        Resume::Suspended
    }

    fn finish(&mut self) -> Resume {
        self.pc = None;
        self.slept_ms = None;
        Resume::Finished
    }
}

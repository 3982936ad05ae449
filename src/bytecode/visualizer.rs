use super::opcode::{OpCode, Operand};
use super::{GlobalKind, Program, Trigger};
use std::fmt::Write;

/// Formats a `Program` into a human-readable listing for debugging.
pub fn visualize_program(program: &Program, name: &str) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "======== PROGRAM for Graph: {} ========", name);

    let _ = writeln!(output, "\n--- GLOBALS ---");
    for (slot, global) in program.globals.iter().enumerate() {
        let kind = match global.kind {
            GlobalKind::Int => "int".to_string(),
            GlobalKind::Counter => "counter".to_string(),
            GlobalKind::UserFunc(hash) => format!("func #{:08X}", hash),
        };
        let _ = writeln!(output, "g{:<3} {:<14} {} = {}", slot, kind, global.name, global.init);
    }

    let _ = writeln!(output, "\n--- ENTRIES ---");
    for trigger in Trigger::ALL {
        match program.entry(trigger) {
            Some(addr) => {
                let _ = writeln!(output, "{:<10} -> {:04}", trigger, addr);
            }
            None => {
                let _ = writeln!(output, "{:<10} -> (none)", trigger);
            }
        }
    }

    let _ = writeln!(output, "\n--- CODE (max locals: {}) ---", program.max_locals);
    format_code(&mut output, &program.code);

    let _ = writeln!(output, "\n================ END OF PROGRAM ================");
    output
}

fn operand(op: &Operand) -> String {
    match op {
        Operand::Const(v) => format!("#{}", v),
        Operand::Global(slot) => format!("g{}", slot),
        Operand::Local(slot) => format!("l{}", slot),
    }
}

fn format_code(output: &mut String, code: &[OpCode]) {
    for (i, op) in code.iter().enumerate() {
        let text = match op {
            OpCode::SetLocal(slot, v) => format!("SetLocal       l{} = {}", slot, v),
            OpCode::Sleep(ms) => format!("Sleep          {} ms", operand(ms)),
            OpCode::DeleteObject(obj) => format!("DeleteObject   {}", operand(obj)),
            OpCode::SendEvent {
                object,
                event_type,
                value,
            } => format!(
                "SendEvent      obj {} type {} value {}",
                operand(object),
                operand(event_type),
                operand(value)
            ),
            OpCode::Call { func, arg, result } => {
                format!("Call           g{}({}) -> g{}", func, operand(arg), result)
            }
            OpCode::JumpUnless {
                op,
                lhs,
                rhs,
                target,
            } => format!(
                "{:<14} {} {} {} else -> {:04}",
                "JumpUnless",
                operand(lhs),
                op,
                operand(rhs),
                target
            ),
            OpCode::Repeat {
                counter,
                bound,
                exit,
            } => format!("Repeat         g{} < {} else -> {:04}", counter, bound, exit),
            OpCode::Jump(addr) => format!("{:<14} -> {:04}", "Jump", addr),
            OpCode::End => "End".to_string(),
        };
        let _ = writeln!(output, "{:04}: {}", i, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_entries_and_jumps() {
        let program = Program {
            code: vec![OpCode::Jump(1), OpCode::End],
            entries: [Some(0), None, None],
            globals: Vec::new(),
            max_locals: 0,
        };
        let text = visualize_program(&program, "demo");
        assert!(text.contains("Init       -> 0000"));
        assert!(text.contains("Event      -> (none)"));
        assert!(text.contains("0000: Jump           -> 0001"));
        assert!(text.contains("0001: End"));
    }
}

//! Human-readable listings of code artifacts.
//!
//! Columns are the source line (where one starts), the byte offset the
//! instruction would be encoded at, a label for jump targets and the
//! instruction with its resolved operand.

use core::fmt;

use hashbrown::HashMap;

use crate::code::{CodeArtifact, InstrId, Instruction, Operand};
use crate::encoder::Layout;
use crate::options::EncodeOptions;
use crate::{String, Vec, format};

impl fmt::Display for CodeArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Code {} ({}:{}) {{", self.name, self.filename, self.first_line)?;
        writeln!(f, "  arg_count: {}", self.arg_count)?;
        writeln!(f, "  nlocals: {}", self.nlocals())?;
        writeln!(f, "  stack_size: {}", self.stack_size)?;
        writeln!(f, "  flags: {:?}", self.flags)?;

        if self.constants.is_empty() {
            writeln!(f, "  constants: []")?;
        } else {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                writeln!(f, "    [{}] = {}", i, constant)?;
            }
            writeln!(f, "  ]")?;
        }
        write_names(f, "names", self.names.as_slice())?;
        write_names(f, "varnames", self.varnames.as_slice())?;
        write_names(f, "cellvars", self.cellvars.as_slice())?;
        write_names(f, "freevars", self.freevars.as_slice())?;

        let stream = &self.instructions;
        let labels = labels(self);
        // Offsets are unavailable while a jump dangles; fall back to positions.
        let offsets = Layout::compute(stream, EncodeOptions::default().max_iterations)
            .map(|layout| layout.offsets)
            .unwrap_or_else(|_| (0..stream.len()).collect());

        writeln!(f, "  instructions:")?;
        for (index, (id, instr)) in stream.iter().enumerate() {
            let line = instr.line.map(|l| format!("{l}")).unwrap_or_default();
            let label = labels
                .get(&id)
                .map(|n| format!("L{n}:"))
                .unwrap_or_default();
            writeln!(
                f,
                "    {:>4} {:>5} {:>4}  {}",
                line,
                offsets.get(index).copied().unwrap_or(index),
                label,
                describe(self, &labels, instr)
            )?;
        }

        write!(f, "}}")
    }
}

fn write_names(f: &mut fmt::Formatter<'_>, title: &str, names: &[String]) -> fmt::Result {
    if names.is_empty() {
        return Ok(());
    }
    writeln!(f, "  {}: [{}]", title, names.join(", "))
}

/// Label numbers for jump targets, in program order.
fn labels(artifact: &CodeArtifact) -> HashMap<InstrId, usize> {
    let stream = &artifact.instructions;
    let mut targets: Vec<(usize, InstrId)> = stream
        .iter()
        .filter_map(|(_, instr)| instr.jump_target())
        .filter_map(|target| stream.index_of(target).map(|pos| (pos, target)))
        .collect();
    targets.sort_unstable();
    targets.dedup();
    targets
        .into_iter()
        .enumerate()
        .map(|(n, (_, id))| (id, n))
        .collect()
}

fn describe(artifact: &CodeArtifact, labels: &HashMap<InstrId, usize>, instr: &Instruction) -> String {
    let name = instr.opcode().name();
    let Some(operand) = instr.operand() else {
        return String::from(name);
    };

    let detail = match *operand {
        Operand::Const(i) => artifact.constants.get(i).map(|c| format!("{c}")),
        Operand::Name(i) => artifact.names.get(i).cloned(),
        Operand::Local(i) => artifact.varnames.get(i).cloned(),
        Operand::Free(i) => artifact.free_name(i).map(String::from),
        Operand::Compare(op) => Some(String::from(op.symbol())),
        Operand::RelJump(target) | Operand::AbsJump(target) => Some(match labels.get(&target) {
            Some(n) => format!("to L{n}"),
            None => format!("to {target}, missing"),
        }),
        Operand::Immediate(_) => None,
    };
    let arg = match operand.value() {
        Some(v) => format!("{v}"),
        None => String::new(),
    };

    match detail {
        Some(detail) if arg.is_empty() => format!("{name:<20} ({detail})"),
        Some(detail) => format!("{name:<20} {arg} ({detail})"),
        None => format!("{name:<20} {arg}"),
    }
}

//! Editable artifact to raw bytecode.
//!
//! Encoding resolves every jump to the current position of its target,
//! sizes `EXTENDED_ARG` prefixes (see [`layout`](self)), rebuilds the line
//! table from the instructions' line annotations and, unless disabled,
//! recomputes the stack size.

mod layout;


use tracing::debug;

use crate::analysis;
use crate::code::{CodeArtifact, Operand, RawCode};
use crate::error::EncodeError;
use crate::line_table::{self, LineStart};
use crate::opcode::OperandKind;
use crate::options::EncodeOptions;

pub(crate) use layout::Layout;

/// Encodes `artifact` with default [`EncodeOptions`].
pub fn encode(artifact: &CodeArtifact) -> Result<RawCode, EncodeError> {
    Encoder::new(EncodeOptions::default()).encode(artifact)
}

/// Turns a [`CodeArtifact`] back into [`RawCode`].
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

impl Encoder {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }

    pub fn encode(&self, artifact: &CodeArtifact) -> Result<RawCode, EncodeError> {
        let stream = &artifact.instructions;
        check_operands(artifact)?;

        let layout = Layout::compute(stream, self.options.max_iterations)?;
        let code = layout.emit(stream);

        let starts = stream
            .iter()
            .zip(&layout.offsets)
            .filter_map(|((_, instr), &offset)| instr.line.map(|line| LineStart { offset, line }));
        let lnotab = line_table::encode_line_starts(starts, artifact.first_line);

        let stack_size = if self.options.recompute_stack_size {
            analysis::max_stack_depth(stream, artifact.arg_count)?
        } else {
            artifact.stack_size
        };

        debug!(
            name = %artifact.name,
            instructions = stream.len(),
            bytes = code.len(),
            passes = layout.passes,
            stack_size,
            "encoded code object"
        );

        Ok(RawCode {
            arg_count: artifact.arg_count,
            nlocals: artifact.nlocals(),
            stack_size,
            flags: artifact.flags,
            code,
            constants: artifact.constants.as_slice().to_vec(),
            names: artifact.names.as_slice().to_vec(),
            varnames: artifact.varnames.as_slice().to_vec(),
            filename: artifact.filename.clone(),
            name: artifact.name.clone(),
            first_line: artifact.first_line,
            lnotab,
            freevars: artifact.freevars.as_slice().to_vec(),
            cellvars: artifact.cellvars.as_slice().to_vec(),
        })
    }
}

/// Checks table-indexing operands against the artifact's tables.
fn check_operands(artifact: &CodeArtifact) -> Result<(), EncodeError> {
    for (index, (_, instr)) in artifact.instructions.iter().enumerate() {
        let (kind, value, len) = match instr.operand() {
            Some(&Operand::Const(v)) => (OperandKind::Const, v, artifact.constants.len()),
            Some(&Operand::Name(v)) => (OperandKind::Name, v, artifact.names.len()),
            Some(&Operand::Local(v)) => (OperandKind::Local, v, artifact.varnames.len()),
            Some(&Operand::Free(v)) => (OperandKind::Free, v, artifact.free_slots()),
            _ => continue,
        };
        if value as usize >= len {
            return Err(EncodeError::OperandOutOfRange {
                index,
                kind,
                value,
                len,
            });
        }
    }
    Ok(())
}

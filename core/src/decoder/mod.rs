//! Raw bytecode to editable artifact.
//!
//! Decoding runs in three steps:
//!
//! 1. [`scan`] splits the bytes into logical instructions, folding
//!    `EXTENDED_ARG` prefixes into the operand that follows them.
//! 2. Operands are classified by the opcode table. Jump offsets are resolved
//!    to the identity of the instruction that starts at the target offset.
//! 3. The line table is expanded into line starts and attached to the
//!    instructions at those offsets.

mod scan;


use hashbrown::HashMap;
use tracing::debug;

use crate::code::{CodeArtifact, InstrId, Instruction, InstructionStream, Operand, RawCode, Table};
use crate::error::DecodeError;
use crate::line_table;
use crate::opcode::{CompareOp, OperandKind};
use crate::options::DecodeOptions;

pub(crate) use scan::{RawInstr, scan};

/// Decodes `raw` with default [`DecodeOptions`].
pub fn decode(raw: &RawCode) -> Result<CodeArtifact, DecodeError> {
    Decoder::new(DecodeOptions::default()).decode(raw)
}

/// Turns [`RawCode`] into a [`CodeArtifact`].
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    pub fn decode(&self, raw: &RawCode) -> Result<CodeArtifact, DecodeError> {
        let scanned = scan(&raw.code)?;
        let by_start: HashMap<usize, usize> = scanned
            .iter()
            .enumerate()
            .map(|(index, instr)| (instr.start, index))
            .collect();

        let mut artifact = CodeArtifact {
            instructions: InstructionStream::with_capacity(scanned.len()),
            constants: Table::from(raw.constants.clone()),
            names: Table::from(raw.names.clone()),
            varnames: Table::from(raw.varnames.clone()),
            freevars: Table::from(raw.freevars.clone()),
            cellvars: Table::from(raw.cellvars.clone()),
            arg_count: raw.arg_count,
            stack_size: raw.stack_size,
            flags: raw.flags,
            filename: raw.filename.clone(),
            name: raw.name.clone(),
            first_line: raw.first_line,
        };

        // Ids are handed out in push order, so instruction `i` will get
        // `base + i` and forward jumps can name their targets up front.
        let base = artifact.instructions.next_id().slot();
        let id_at = |offset: usize| by_start.get(&offset).map(|&i| InstrId::from_slot(base + i));

        for instr in &scanned {
            let operand = match (instr.opcode.operand_kind(), instr.arg) {
                (_, None) => None,
                (OperandKind::RelJump, Some(arg)) => {
                    let target = instr.end + arg as usize;
                    let id = id_at(target).ok_or(DecodeError::InvalidJumpTarget {
                        offset: instr.start,
                        target,
                    })?;
                    Some(Operand::RelJump(id))
                }
                (OperandKind::AbsJump, Some(arg)) => {
                    let target = arg as usize;
                    let id = id_at(target).ok_or(DecodeError::InvalidJumpTarget {
                        offset: instr.start,
                        target,
                    })?;
                    Some(Operand::AbsJump(id))
                }
                (kind, Some(arg)) => Some(self.operand(&artifact, instr, kind, arg)?),
            };
            artifact
                .instructions
                .push_unchecked(Instruction::from_parts(instr.opcode, operand));
        }

        if !scanned.is_empty() {
            for start in line_table::decode_line_starts(&raw.lnotab, raw.first_line)? {
                let id = id_at(start.offset).ok_or(DecodeError::MisalignedLineEntry {
                    offset: start.offset,
                })?;
                if let Some(instr) = artifact.instructions.get_mut(id) {
                    instr.line = Some(start.line);
                }
            }
        }

        if raw.nlocals as usize != raw.varnames.len() {
            debug!(
                nlocals = raw.nlocals,
                varnames = raw.varnames.len(),
                "declared local count differs from variable names"
            );
        }
        debug!(
            name = %raw.name,
            bytes = raw.code.len(),
            instructions = scanned.len(),
            "decoded code object"
        );
        Ok(artifact)
    }

    fn operand(
        &self,
        artifact: &CodeArtifact,
        instr: &RawInstr,
        kind: OperandKind,
        arg: u32,
    ) -> Result<Operand, DecodeError> {
        let out_of_range = |len: usize| DecodeError::OperandOutOfRange {
            offset: instr.start,
            kind,
            index: arg,
            len,
        };

        if kind == OperandKind::Compare {
            return CompareOp::from_index(arg)
                .map(Operand::Compare)
                .ok_or_else(|| out_of_range(CompareOp::ALL.len()));
        }

        if self.options.validate_operands {
            let len = match kind {
                OperandKind::Const => Some(artifact.constants.len()),
                OperandKind::Name => Some(artifact.names.len()),
                OperandKind::Local => Some(artifact.varnames.len()),
                OperandKind::Free => Some(artifact.free_slots()),
                _ => None,
            };
            if let Some(len) = len {
                if arg as usize >= len {
                    return Err(out_of_range(len));
                }
            }
        }

        Operand::from_value(kind, arg).ok_or_else(|| out_of_range(0))
    }
}

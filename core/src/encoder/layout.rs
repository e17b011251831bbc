//! Byte offsets and `EXTENDED_ARG` prefix counts for an instruction stream.
//!
//! An operand wider than 16 bits needs one prefix per extra 16-bit chunk, and
//! every prefix shifts the instructions after it by three bytes. That can push
//! another jump operand past a 16-bit boundary, so layout is a fixed point:
//! offsets are recomputed until no prefix count changes. Counts only ever
//! grow, which bounds the number of passes.

use hashbrown::HashMap;
use tracing::trace;

use crate::Vec;
use crate::code::{InstrId, InstructionStream, Operand};
use crate::error::{EncodeError, IntegrityError};
use crate::opcode::Opcode;

const PREFIX_SIZE: usize = 3;

/// Final placement of every instruction, by program position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) offsets: Vec<usize>,
    pub(crate) prefixes: Vec<u8>,
    /// Encoded operand value, with jumps resolved to byte offsets.
    pub(crate) args: Vec<Option<u32>>,
    pub(crate) len: usize,
    pub(crate) passes: usize,
}

impl Layout {
    pub(crate) fn compute(stream: &InstructionStream, max_iterations: usize) -> Result<Self, EncodeError> {
        let position: HashMap<InstrId, usize> = stream
            .ids()
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();

        let mut operands = Vec::with_capacity(stream.len());
        let mut args = Vec::with_capacity(stream.len());
        let mut prefixes = Vec::with_capacity(stream.len());
        for (index, (_, instr)) in stream.iter().enumerate() {
            let operand = match instr.operand() {
                None => Slot::Bare,
                Some(&Operand::RelJump(target)) => Slot::Relative(resolve(&position, index, target)?),
                Some(&Operand::AbsJump(target)) => Slot::Absolute(resolve(&position, index, target)?),
                Some(operand) => Slot::Value(operand.value().unwrap_or(0)),
            };
            let arg = match operand {
                Slot::Bare => None,
                Slot::Value(v) => Some(v),
                Slot::Relative(_) | Slot::Absolute(_) => Some(0),
            };
            prefixes.push(arg.map_or(0, |v| prefix_count(u64::from(v))));
            args.push(arg);
            operands.push(operand);
        }

        let mut offsets = crate::vec![0; operands.len()];
        for pass in 1..=max_iterations {
            let len = place(&operands, &prefixes, &mut offsets);

            let mut changed = false;
            for (index, operand) in operands.iter().enumerate() {
                let end = offsets[index] + size(operand, prefixes[index]);
                let value = match *operand {
                    Slot::Bare | Slot::Value(_) => continue,
                    Slot::Absolute(target) => offset_at(&offsets, target, len),
                    Slot::Relative(target) => offset_at(&offsets, target, len)
                        .checked_sub(end)
                        .ok_or(EncodeError::BackwardRelativeJump { index })?,
                };
                let value = u64::try_from(value).unwrap_or(u64::MAX);
                let arg = u32::try_from(value).map_err(|_| EncodeError::Overflow { index, value })?;
                args[index] = Some(arg);

                let needed = prefix_count(value);
                if needed > prefixes[index] {
                    prefixes[index] = needed;
                    changed = true;
                }
            }

            if !changed {
                trace!(pass, len, "layout settled");
                return Ok(Self {
                    offsets,
                    prefixes,
                    args,
                    len,
                    passes: pass,
                });
            }
        }

        Err(EncodeError::LayoutDiverged {
            passes: max_iterations,
        })
    }

    /// Writes the bytecode for `stream` using this layout.
    pub(crate) fn emit(&self, stream: &InstructionStream) -> Vec<u8> {
        let mut code = Vec::with_capacity(self.len);
        for (index, (_, instr)) in stream.iter().enumerate() {
            let Some(arg) = self.args[index] else {
                code.push(instr.opcode().byte());
                continue;
            };
            let wide = u64::from(arg);
            for chunk in (1..=u32::from(self.prefixes[index])).rev() {
                let ext = (wide >> (16 * chunk)) & 0xFFFF;
                code.push(Opcode::ExtendedArg.byte());
                code.push((ext & 0xFF) as u8);
                code.push((ext >> 8) as u8);
            }
            code.push(instr.opcode().byte());
            code.push((arg & 0xFF) as u8);
            code.push(((arg >> 8) & 0xFF) as u8);
        }
        code
    }
}

#[derive(Clone, Copy, Debug)]
enum Slot {
    Bare,
    Value(u32),
    Relative(usize),
    Absolute(usize),
}

fn resolve(
    position: &HashMap<InstrId, usize>,
    index: usize,
    target: InstrId,
) -> Result<usize, IntegrityError> {
    position
        .get(&target)
        .copied()
        .ok_or(IntegrityError::DanglingJump { index, target })
}

fn size(operand: &Slot, prefixes: u8) -> usize {
    match operand {
        Slot::Bare => 1,
        _ => 3 + PREFIX_SIZE * usize::from(prefixes),
    }
}

/// Assigns offsets in program order and returns the total code length.
fn place(operands: &[Slot], prefixes: &[u8], offsets: &mut [usize]) -> usize {
    let mut offset = 0;
    for (index, operand) in operands.iter().enumerate() {
        offsets[index] = offset;
        offset += size(operand, prefixes[index]);
    }
    offset
}

fn offset_at(offsets: &[usize], position: usize, len: usize) -> usize {
    offsets.get(position).copied().unwrap_or(len)
}

/// Number of `EXTENDED_ARG` prefixes needed to carry `value`.
pub(crate) fn prefix_count(value: u64) -> u8 {
    let mut count = 0;
    let mut rest = value;
    while rest > 0xFFFF {
        rest >>= 16;
        count += 1;
    }
    count
}

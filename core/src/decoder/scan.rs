//! Splits raw bytecode into logical instructions, folding `EXTENDED_ARG`
//! prefixes into the operand of the instruction they precede.

use crate::Vec;
use crate::error::DecodeError;
use crate::opcode::Opcode;

/// One logical instruction as laid out in the raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawInstr {
    /// Offset of the first byte, including any `EXTENDED_ARG` prefixes.
    pub start: usize,
    /// Offset of the opcode byte itself.
    pub offset: usize,
    /// Offset just past the operand.
    pub end: usize,
    pub opcode: Opcode,
    pub arg: Option<u32>,
}

pub(crate) fn scan(code: &[u8]) -> Result<Vec<RawInstr>, DecodeError> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    // Pending prefix: where the chain started and the bits accumulated so far.
    let mut prefix: Option<(usize, u64)> = None;

    while pos < code.len() {
        let byte = code[pos];
        let opcode = Opcode::from_byte(byte).ok_or(DecodeError::UnknownOpcode { offset: pos, byte })?;

        if !opcode.has_arg() {
            if let Some((start, _)) = prefix {
                return Err(DecodeError::DanglingExtendedArg { offset: start });
            }
            out.push(RawInstr {
                start: pos,
                offset: pos,
                end: pos + 1,
                opcode,
                arg: None,
            });
            pos += 1;
            continue;
        }

        let (lo, hi) = match (code.get(pos + 1), code.get(pos + 2)) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => return Err(DecodeError::Truncated { offset: pos, opcode }),
        };
        let low = u64::from(u16::from_le_bytes([lo, hi]));
        let high = prefix.map_or(0, |(_, bits)| bits);
        let value = (high << 16) | low;
        if value > u64::from(u32::MAX) {
            return Err(DecodeError::OperandOverflow { offset: pos });
        }

        if opcode == Opcode::ExtendedArg {
            let start = prefix.map_or(pos, |(start, _)| start);
            prefix = Some((start, value));
        } else {
            let start = prefix.take().map_or(pos, |(start, _)| start);
            out.push(RawInstr {
                start,
                offset: pos,
                end: pos + 3,
                opcode,
                arg: Some(value as u32),
            });
        }
        pos += 3;
    }

    if let Some((start, _)) = prefix {
        return Err(DecodeError::DanglingExtendedArg { offset: start });
    }
    Ok(out)
}

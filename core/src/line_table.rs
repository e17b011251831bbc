//! The compressed line-number table (`co_lnotab`).
//!
//! The table is a sequence of unsigned byte pairs `(bytecode delta, line
//! delta)` applied in order starting from `(0, first_line)`. Deltas that do
//! not fit in a byte are spread over several pairs:
//!
//! ```text
//! offset +300, line +1    ->  (255, 0) (45, 1)
//! offset +10,  line +300  ->  (10, 255) (0, 45)
//! ```
//!
//! Lines never decrease, so an annotation that would move backwards cannot be
//! represented and is dropped by the encoder.

use tracing::{trace, warn};

use crate::error::DecodeError;
use crate::{Vec, vec};

/// A source line beginning at a bytecode offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineStart {
    pub offset: usize,
    pub line: u32,
}

/// Expands a line table into the offsets where a source statement begins.
///
/// The result is sorted by offset and always begins at offset 0. Every entry
/// that advances the bytecode offset yields a start, including entries that
/// keep the same line, so re-encoding reproduces the table. A `(255, 0)`
/// entry followed by more entries is taken as the first half of a split
/// offset delta.
pub fn decode_line_starts(lnotab: &[u8], first_line: u32) -> Result<Vec<LineStart>, DecodeError> {
    if lnotab.len() % 2 != 0 {
        return Err(DecodeError::OddLineTable { len: lnotab.len() });
    }

    let mut starts = vec![LineStart {
        offset: 0,
        line: first_line,
    }];
    let mut offset = 0usize;
    let mut line = first_line;
    let mut pairs = lnotab.chunks_exact(2).peekable();

    while let Some(pair) = pairs.next() {
        let (byte_delta, line_delta) = (pair[0], pair[1]);
        offset += usize::from(byte_delta);
        line = line
            .checked_add(u32::from(line_delta))
            .ok_or(DecodeError::LineOverflow)?;
        if (byte_delta, line_delta) == (255, 0) && pairs.peek().is_some() {
            continue;
        }
        match starts.last_mut() {
            Some(last) if last.offset == offset => last.line = line,
            _ => starts.push(LineStart { offset, line }),
        }
    }

    trace!(entries = lnotab.len() / 2, starts = starts.len(), "decoded line table");
    Ok(starts)
}

/// Compresses line starts into a line table relative to `first_line`.
///
/// `starts` must be sorted by offset. Starts that would move the line
/// backwards are skipped with a warning.
pub fn encode_line_starts<I>(starts: I, first_line: u32) -> Vec<u8>
where
    I: IntoIterator<Item = LineStart>,
{
    let mut table = Vec::new();
    let mut last_offset = 0usize;
    let mut last_line = first_line;

    for LineStart { offset, line } in starts {
        if line < last_line {
            warn!(offset, line, last_line, "line number moves backwards; annotation dropped");
            continue;
        }
        let mut byte_delta = offset.saturating_sub(last_offset);
        let mut line_delta = line - last_line;
        if byte_delta == 0 && line_delta == 0 {
            continue;
        }

        while byte_delta > 255 {
            table.extend_from_slice(&[255, 0]);
            byte_delta -= 255;
        }
        if line_delta > 255 {
            table.extend_from_slice(&[byte_delta as u8, 255]);
            line_delta -= 255;
            byte_delta = 0;
            while line_delta > 255 {
                table.extend_from_slice(&[0, 255]);
                line_delta -= 255;
            }
        }
        table.extend_from_slice(&[byte_delta as u8, line_delta as u8]);

        last_offset = offset;
        last_line = line;
    }
    table
}

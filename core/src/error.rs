//! Error types.
//!
//! Each pipeline stage has its own error enum; [`Error`] wraps all of them
//! and [`Error::kind`] classifies a failure into the categories callers act
//! on.

use crate::code::InstrId;
use crate::opcode::{Opcode, OperandKind};
use crate::{String, Vec};

/// Malformed raw code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode {byte} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("{opcode} at offset {offset} is missing its operand bytes")]
    Truncated { offset: usize, opcode: Opcode },

    #[error("EXTENDED_ARG at offset {offset} is not followed by an instruction that takes an operand")]
    DanglingExtendedArg { offset: usize },

    #[error("operand at offset {offset} does not fit in 32 bits")]
    OperandOverflow { offset: usize },

    #[error("jump at offset {offset} targets offset {target}, which is not an instruction boundary")]
    InvalidJumpTarget { offset: usize, target: usize },

    #[error("{kind} operand {index} at offset {offset} is out of range ({len} available)")]
    OperandOutOfRange {
        offset: usize,
        kind: OperandKind,
        index: u32,
        len: usize,
    },

    #[error("line table has odd length {len}")]
    OddLineTable { len: usize },

    #[error("line table entry at offset {offset} is not on an instruction boundary")]
    MisalignedLineEntry { offset: usize },

    #[error("line number overflows in line table")]
    LineOverflow,
}

/// An edit or encode would break a jump reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("instruction {0} is not in the stream")]
    UnknownInstruction(InstrId),

    #[error("instruction {target} is the target of {} jump(s)", .referrers.len())]
    JumpTarget {
        target: InstrId,
        referrers: Vec<InstrId>,
    },

    #[error("jump target {target} is not in the stream")]
    UnknownTarget { target: InstrId },

    #[error("cannot redirect jumps from {0} to itself")]
    SelfRedirect(InstrId),

    #[error("jump at position {index} targets {target}, which is not in the stream")]
    DanglingJump { index: usize, target: InstrId },
}

/// Stack-depth analysis found inconsistent or impossible code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("instruction at position {index} is reached with stack depth {found}, expected {expected}")]
    Divergence {
        index: usize,
        expected: i64,
        found: i64,
    },

    #[error("{opcode} at position {index} underflows the stack (depth {depth})")]
    Underflow {
        index: usize,
        opcode: Opcode,
        depth: i64,
    },

    #[error("{opcode} at position {index} has no matching block")]
    UnbalancedBlock { index: usize, opcode: Opcode },

    #[error("jump at position {index} targets an instruction that is not in the stream")]
    UnresolvedTarget { index: usize },
}

/// Failure to serialize an artifact back into raw code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("operand of instruction at position {index} needs {value}, which does not fit in 32 bits")]
    Overflow { index: usize, value: u64 },

    #[error("relative jump at position {index} points backwards")]
    BackwardRelativeJump { index: usize },

    #[error("{kind} operand {value} at position {index} is out of range ({len} available)")]
    OperandOutOfRange {
        index: usize,
        kind: OperandKind,
        value: u32,
        len: usize,
    },

    #[error("instruction layout did not settle after {passes} passes")]
    LayoutDiverged { passes: usize },

    #[error(transparent)]
    Stack(#[from] StackError),
}

/// An operand does not belong to the opcode it was paired with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{opcode} takes {expected} operand, got {}", .found.map_or("none", kind_name))]
pub struct OperandMismatch {
    pub opcode: Opcode,
    pub expected: OperandKind,
    pub found: Option<OperandKind>,
}

fn kind_name(kind: OperandKind) -> &'static str {
    match kind {
        OperandKind::None => "none",
        OperandKind::Const => "a constant",
        OperandKind::Name => "a name",
        OperandKind::Local => "a local",
        OperandKind::Free => "a free variable",
        OperandKind::Compare => "a comparison",
        OperandKind::RelJump => "a relative jump",
        OperandKind::AbsJump => "an absolute jump",
        OperandKind::Immediate => "an immediate",
    }
}

/// Failure to place re-encoded code into a containing object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("no nested code object named `{name}`")]
    NotFound { name: String },
}

/// Broad failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    Integrity,
    StackAnalysis,
    Overflow,
    Encode,
    Operand,
    Install,
}

/// Any error produced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Operand(#[from] OperandMismatch),
    #[error(transparent)]
    Install(#[from] InstallError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Decode(_) => ErrorKind::Decode,
            Error::Integrity(_) => ErrorKind::Integrity,
            Error::Stack(_) => ErrorKind::StackAnalysis,
            Error::Encode(EncodeError::Integrity(_)) => ErrorKind::Integrity,
            Error::Encode(EncodeError::Stack(_)) => ErrorKind::StackAnalysis,
            Error::Encode(EncodeError::Overflow { .. }) => ErrorKind::Overflow,
            Error::Encode(_) => ErrorKind::Encode,
            Error::Operand(_) => ErrorKind::Operand,
            Error::Install(_) => ErrorKind::Install,
        }
    }
}

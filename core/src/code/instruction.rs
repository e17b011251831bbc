use core::fmt;

use crate::error::OperandMismatch;
use crate::opcode::{CompareOp, Opcode, OperandKind};

/// Stable identity of an instruction within one [`InstructionStream`].
///
/// Identities are never reused, so a removed instruction's id stays dead.
///
/// [`InstructionStream`]: super::InstructionStream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(u32);

impl InstrId {
    pub(crate) fn from_slot(slot: usize) -> Self {
        // Code objects never approach u32::MAX instructions.
        InstrId(slot as u32)
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for InstrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decoded operand.
///
/// Jumps hold the identity of their target rather than a byte offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Const(u32),
    Name(u32),
    Local(u32),
    Free(u32),
    Compare(CompareOp),
    RelJump(InstrId),
    AbsJump(InstrId),
    Immediate(u32),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Const(_) => OperandKind::Const,
            Operand::Name(_) => OperandKind::Name,
            Operand::Local(_) => OperandKind::Local,
            Operand::Free(_) => OperandKind::Free,
            Operand::Compare(_) => OperandKind::Compare,
            Operand::RelJump(_) => OperandKind::RelJump,
            Operand::AbsJump(_) => OperandKind::AbsJump,
            Operand::Immediate(_) => OperandKind::Immediate,
        }
    }

    pub fn jump_target(&self) -> Option<InstrId> {
        match *self {
            Operand::RelJump(id) | Operand::AbsJump(id) => Some(id),
            _ => None,
        }
    }

    /// The encoded operand value, or `None` for jumps, whose value depends on
    /// layout.
    pub fn value(&self) -> Option<u32> {
        match *self {
            Operand::Const(v)
            | Operand::Name(v)
            | Operand::Local(v)
            | Operand::Free(v)
            | Operand::Immediate(v) => Some(v),
            Operand::Compare(op) => Some(op.index()),
            Operand::RelJump(_) | Operand::AbsJump(_) => None,
        }
    }

    /// Builds the operand of class `kind` for a non-jump value.
    ///
    /// Returns `None` for jump classes, `OperandKind::None`, and comparison
    /// indices past the operator table.
    pub fn from_value(kind: OperandKind, value: u32) -> Option<Operand> {
        match kind {
            OperandKind::Const => Some(Operand::Const(value)),
            OperandKind::Name => Some(Operand::Name(value)),
            OperandKind::Local => Some(Operand::Local(value)),
            OperandKind::Free => Some(Operand::Free(value)),
            OperandKind::Immediate => Some(Operand::Immediate(value)),
            OperandKind::Compare => CompareOp::from_index(value).map(Operand::Compare),
            OperandKind::None | OperandKind::RelJump | OperandKind::AbsJump => None,
        }
    }

    fn retarget(&mut self, to: InstrId) {
        match self {
            Operand::RelJump(id) | Operand::AbsJump(id) => *id = to,
            _ => {}
        }
    }
}

/// One logical instruction: an opcode, its operand, and an optional line
/// annotation.
///
/// `EXTENDED_ARG` never appears here; wide operands are folded in by the
/// decoder and regenerated by the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    opcode: Opcode,
    operand: Option<Operand>,
    /// Source line that starts at this instruction, if any. Instructions with
    /// `None` belong to the nearest annotated instruction before them.
    pub line: Option<u32>,
}

impl Instruction {
    /// Pairs `opcode` with `operand`, checking that the operand class matches.
    ///
    /// `EXTENDED_ARG` is always rejected.
    pub fn new(opcode: Opcode, operand: Option<Operand>) -> Result<Self, OperandMismatch> {
        check_operand(opcode, operand.as_ref())?;
        Ok(Self {
            opcode,
            operand,
            line: None,
        })
    }

    /// Builds an instruction whose operand class is already known to match.
    pub(crate) fn from_parts(opcode: Opcode, operand: Option<Operand>) -> Self {
        Self {
            opcode,
            operand,
            line: None,
        }
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operand(&self) -> Option<&Operand> {
        self.operand.as_ref()
    }

    pub fn set_operand(&mut self, operand: Option<Operand>) -> Result<(), OperandMismatch> {
        check_operand(self.opcode, operand.as_ref())?;
        self.operand = operand;
        Ok(())
    }

    pub fn jump_target(&self) -> Option<InstrId> {
        self.operand.as_ref().and_then(Operand::jump_target)
    }

    /// Operand value used for stack effects; zero for jumps and bare opcodes.
    pub fn arg(&self) -> u32 {
        self.operand.as_ref().and_then(Operand::value).unwrap_or(0)
    }

    pub(crate) fn retarget(&mut self, to: InstrId) {
        if let Some(operand) = self.operand.as_mut() {
            operand.retarget(to);
        }
    }
}

fn check_operand(opcode: Opcode, operand: Option<&Operand>) -> Result<(), OperandMismatch> {
    // Prefixes are emitted by the encoder, never stored.
    let expected = match opcode {
        Opcode::ExtendedArg => OperandKind::None,
        _ => opcode.operand_kind(),
    };
    let found = operand.map(Operand::kind);
    let ok = match found {
        None => expected == OperandKind::None && opcode != Opcode::ExtendedArg,
        Some(kind) => kind == expected,
    };
    if ok {
        Ok(())
    } else {
        Err(OperandMismatch {
            opcode,
            expected,
            found,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        match self.operand {
            None => Ok(()),
            Some(Operand::Compare(op)) => write!(f, " {}", op.index()),
            Some(Operand::RelJump(id)) | Some(Operand::AbsJump(id)) => write!(f, " {id}"),
            Some(ref operand) => write!(f, " {}", operand.value().unwrap_or(0)),
        }
    }
}

//! CPython 2.7 opcode table.
//!
//! # Instruction Format
//!
//! ```text
//! no operand (opcode < 90):   ┌────────┐
//!                             │ opcode │
//!                             └────────┘
//! with operand (opcode >= 90): ┌────────┬─────────┬──────────┐
//!                              │ opcode │ arg low │ arg high │
//!                              └────────┴─────────┴──────────┘
//! ```
//!
//! Operands wider than 16 bits are prefixed by `EXTENDED_ARG hi`, which
//! contributes `hi << 16` to the operand of the instruction that follows.
//!
//! Every opcode carries a static descriptor: mnemonic, operand class,
//! control-flow class and stack effect. The decoder, encoder and stack-depth
//! analyzer all read from this one table.

mod compare;
mod table;


use core::fmt;

pub use compare::CompareOp;
pub use table::Opcode;

/// First opcode that carries a two-byte operand.
pub const HAVE_ARGUMENT: u8 = 90;

/// What an instruction's operand refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// The opcode takes no operand.
    None,
    /// Index into the constant pool.
    Const,
    /// Index into the names table.
    Name,
    /// Index into the local variable names.
    Local,
    /// Index into cell variables followed by free variables.
    Free,
    /// Index into the comparison operator table.
    Compare,
    /// Byte displacement from the end of the jump instruction.
    RelJump,
    /// Absolute byte offset.
    AbsJump,
    /// Plain integer (counts, flags).
    Immediate,
}

impl OperandKind {
    pub fn is_jump(self) -> bool {
        matches!(self, OperandKind::RelJump | OperandKind::AbsJump)
    }
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandKind::None => "no",
            OperandKind::Const => "constant",
            OperandKind::Name => "name",
            OperandKind::Local => "local",
            OperandKind::Free => "free variable",
            OperandKind::Compare => "comparison",
            OperandKind::RelJump => "relative jump",
            OperandKind::AbsJump => "absolute jump",
            OperandKind::Immediate => "immediate",
        };
        f.write_str(name)
    }
}

/// How control leaves an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Falls through to the next instruction.
    Next,
    /// Always transfers to its target.
    Jump,
    /// Either falls through or transfers to its target.
    Branch,
    /// Leaves the frame.
    Return,
    /// Leaves through the innermost exception handler, if any.
    Raise,
    /// Pushes a loop block ending at its target.
    SetupLoop,
    /// Pushes an exception handler block.
    SetupExcept,
    /// Pushes a finally handler block.
    SetupFinally,
    /// Pushes a finally handler block and enters a context manager.
    SetupWith,
    /// Pops the innermost block.
    PopBlock,
    /// Leaves the innermost loop.
    BreakLoop,
    /// Unwinds to the innermost loop and jumps to its target.
    ContinueLoop,
    /// Ends a finally or except clause.
    EndFinally,
}

impl Flow {
    /// Whether execution can continue with the next instruction.
    pub fn falls_through(self) -> bool {
        !matches!(
            self,
            Flow::Jump | Flow::Return | Flow::Raise | Flow::BreakLoop | Flow::ContinueLoop
        )
    }
}

/// Net change of the value stack depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackEffect {
    /// Same effect on every edge.
    Fixed(i8),
    /// Conditional jumps whose two edges leave different depths.
    Branch { fall: i8, jump: i8 },
    /// Effect computed from the operand value.
    Operand(OperandEffect),
}

/// Stack effects that depend on the operand value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandEffect {
    /// `CALL_FUNCTION*`: positional count in the low byte, keyword pairs in
    /// the high byte, plus `extra` for `*args`/`**kwargs`.
    Call { extra: u8 },
    /// `BUILD_TUPLE`/`BUILD_LIST`/`BUILD_SET`: n items into one.
    Collect,
    /// `UNPACK_SEQUENCE`: one into n.
    Unpack,
    /// `DUP_TOPX`: pushes n.
    Duplicate,
    /// `RAISE_VARARGS`: pops n.
    Raise,
    /// `MAKE_FUNCTION`: pops n defaults.
    MakeFunction,
    /// `MAKE_CLOSURE`: pops n defaults and the closure tuple.
    MakeClosure,
    /// `BUILD_SLICE`: two or three bounds into one slice.
    BuildSlice,
}

/// Static description of an opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpInfo {
    pub name: &'static str,
    pub operand: OperandKind,
    pub flow: Flow,
    pub effect: StackEffect,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn has_arg(self) -> bool {
        self.byte() >= HAVE_ARGUMENT
    }

    pub fn operand_kind(self) -> OperandKind {
        self.info().operand
    }

    pub fn flow(self) -> Flow {
        self.info().flow
    }

    pub fn is_jump(self) -> bool {
        self.operand_kind().is_jump()
    }

    /// Looks up an opcode by mnemonic (`"LOAD_FAST"`, `"SLICE+1"`).
    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL.iter().copied().find(|op| op.name() == name)
    }

    /// Stack depth change when control leaves along the fall-through edge
    /// (`jump == false`) or the jump edge (`jump == true`).
    ///
    /// `arg` is the operand value; it is ignored by fixed-effect opcodes.
    pub fn stack_effect(self, arg: u32, jump: bool) -> i32 {
        match self.info().effect {
            StackEffect::Fixed(n) => i32::from(n),
            StackEffect::Branch { fall, jump: taken } => {
                if jump {
                    i32::from(taken)
                } else {
                    i32::from(fall)
                }
            }
            StackEffect::Operand(effect) => operand_effect(effect, arg),
        }
    }
}

fn operand_effect(effect: OperandEffect, arg: u32) -> i32 {
    // Saturate on junk operands.
    let n = i32::try_from(arg).unwrap_or(i32::MAX);
    match effect {
        OperandEffect::Call { extra } => {
            let positional = (arg & 0xFF) as i32;
            let keyword = ((arg >> 8) & 0xFF) as i32;
            -(positional + 2 * keyword) - i32::from(extra)
        }
        OperandEffect::Collect => 1 - n,
        OperandEffect::Unpack => n - 1,
        OperandEffect::Duplicate => n,
        OperandEffect::Raise => -n,
        OperandEffect::MakeFunction => -n,
        OperandEffect::MakeClosure => -n - 1,
        OperandEffect::BuildSlice => {
            if arg == 3 {
                -2
            } else {
                -1
            }
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static_assertions::assert_eq_size!(Opcode, u8);

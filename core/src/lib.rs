#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
//! Editable CPython 2.7 code objects.
//!
//! The pipeline is `RawCode` -> [`decoder`] -> [`CodeArtifact`] (edit the
//! [`InstructionStream`]) -> [`encoder`] -> `RawCode`. Jumps inside the
//! stream reference instructions by identity, so insertions and removals
//! never invalidate them; the encoder recomputes byte offsets, `EXTENDED_ARG`
//! prefixes, the line table and the stack size.

extern crate alloc;

// Re-export for convenience so other modules don't need alloc:: prefix
#[allow(unused_imports)]
pub(crate) use alloc::{boxed::Box, format, string::String, string::ToString, vec, vec::Vec};

pub mod analysis;
pub mod code;
pub mod decoder;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod install;
pub mod line_table;
pub mod opcode;
pub mod options;

pub use code::{
    CodeArtifact, CodeFlags, Constant, InstrId, Instruction, InstructionStream, Operand, RawCode,
    Table,
};
pub use decoder::{Decoder, decode};
pub use encoder::{Encoder, encode};
pub use error::{
    DecodeError, EncodeError, Error, ErrorKind, InstallError, IntegrityError, OperandMismatch,
    StackError,
};
pub use install::{CodeInstaller, NestedCodeInstaller, find_nested};
pub use opcode::{CompareOp, Opcode, OperandKind};
pub use options::{DecodeOptions, EncodeOptions};

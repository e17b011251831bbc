//! Bytepatch - edit CPython 2.7 bytecode without breaking it
//!
//! # Overview
//!
//! Bytepatch turns a code object into an editable instruction stream and
//! back. Jumps refer to instructions by identity rather than byte offset, so
//! instructions can be inserted, replaced and removed freely; the encoder
//! recomputes offsets, `EXTENDED_ARG` prefixes, the line-number table and the
//! maximum stack depth. Common uses:
//!
//! - Instrumenting functions with tracing or counters
//! - Patching a function body inside a compiled module
//! - Inspecting and disassembling bytecode
//!
//! # Quick Start
//!
//! ```
//! use bytepatch::{CodeArtifact, assemble_into, decode, encode};
//!
//! let mut artifact = CodeArtifact::new("answer");
//! assemble_into(
//!     "LOAD_CONST =42 @ 1\nRETURN_VALUE",
//!     &mut artifact,
//! )
//! .unwrap();
//!
//! let raw = encode(&artifact).unwrap();
//! assert_eq!(raw.code, vec![100, 0, 0, 83]);
//! assert_eq!(raw.stack_size, 1);
//!
//! let back = decode(&raw).unwrap();
//! assert_eq!(back.instructions.len(), 2);
//! ```
//!
//! # Editing
//!
//! ```
//! use bytepatch::{CodeArtifact, Instruction, Opcode, assemble_into, encode};
//!
//! let mut artifact = CodeArtifact::new("f");
//! assemble_into("LOAD_FAST x\nRETURN_VALUE", &mut artifact).unwrap();
//!
//! // Duplicate the argument before returning it.
//! let ret = artifact.instructions.last().unwrap();
//! let dup = Instruction::new(Opcode::DupTop, None).unwrap();
//! artifact.instructions.insert_before(ret, dup).unwrap();
//! let pop = Instruction::new(Opcode::PopTop, None).unwrap();
//! artifact.instructions.insert_before(ret, pop).unwrap();
//!
//! let raw = encode(&artifact).unwrap();
//! assert_eq!(raw.stack_size, 2);
//! ```

mod asm;
mod error_renderer;

// Re-export the engine from bytepatch_core
pub use bytepatch_core::{
    CodeArtifact, CodeFlags, CodeInstaller, CompareOp, Constant, DecodeError, DecodeOptions,
    Decoder, EncodeError, EncodeOptions, Encoder, Error, ErrorKind, InstallError, InstrId,
    Instruction, InstructionStream, IntegrityError, NestedCodeInstaller, Opcode, Operand,
    OperandKind, OperandMismatch, RawCode, StackError, Table, decode, encode, find_nested,
};

// Lower-level building blocks
pub use bytepatch_core::{analysis, line_table};

pub use asm::{AsmError, AsmErrorKind, assemble, assemble_into};
pub use error_renderer::{ErrorReport, render_error, render_error_to_string};

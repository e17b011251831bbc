//! Code objects in raw and editable form.
//!
//! - [`RawCode`] is the serialized form: raw bytecode, line table and
//!   tables, as stored on disk.
//! - [`CodeArtifact`] is the editable form: an [`InstructionStream`] whose
//!   jumps reference instructions by [`InstrId`], plus the same tables.

mod artifact;
mod instruction;
mod raw;
mod stream;
mod table;


pub use artifact::CodeArtifact;
pub use instruction::{InstrId, Instruction, Operand};
pub use raw::{CodeFlags, Constant, RawCode};
pub use stream::InstructionStream;
pub use table::Table;

//! The serialized code-object form consumed by the decoder and produced by
//! the encoder.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{Box, String, Vec};

bitflags::bitflags! {
    /// `co_flags` bits.
    ///
    /// Unknown bits are preserved through a round trip.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CodeFlags: u32 {
        const OPTIMIZED = 0x0001;
        const NEWLOCALS = 0x0002;
        const VARARGS = 0x0004;
        const VARKEYWORDS = 0x0008;
        const NESTED = 0x0010;
        const GENERATOR = 0x0020;
        const NOFREE = 0x0040;
        const FUTURE_DIVISION = 0x2000;
        const FUTURE_ABSOLUTE_IMPORT = 0x4000;
        const FUTURE_WITH_STATEMENT = 0x8000;
        const FUTURE_PRINT_FUNCTION = 0x1_0000;
        const FUTURE_UNICODE_LITERALS = 0x2_0000;

        const _ = !0;
    }
}

impl Default for CodeFlags {
    fn default() -> Self {
        CodeFlags::empty()
    }
}

/// An entry of the constant pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<Constant>),
    Code(Box<RawCode>),
}

// Floats compare by bit pattern so that `0.0` and `-0.0` stay distinct
// constants and a NaN constant equals itself.
impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::None, Constant::None) => true,
            (Constant::Bool(a), Constant::Bool(b)) => a == b,
            (Constant::Int(a), Constant::Int(b)) => a == b,
            (Constant::Float(a), Constant::Float(b)) => a.to_bits() == b.to_bits(),
            (Constant::Str(a), Constant::Str(b)) => a == b,
            (Constant::Bytes(a), Constant::Bytes(b)) => a == b,
            (Constant::Tuple(a), Constant::Tuple(b)) => a == b,
            (Constant::Code(a), Constant::Code(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => f.write_str("None"),
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Float(x) => write!(f, "{x:?}"),
            Constant::Str(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("'")
            }
            Constant::Bytes(bytes) => {
                f.write_str("b'")?;
                for &b in bytes {
                    match b {
                        b'\'' => f.write_str("\\'")?,
                        b'\\' => f.write_str("\\\\")?,
                        0x20..=0x7e => write!(f, "{}", b as char)?,
                        _ => write!(f, "\\x{b:02x}")?,
                    }
                }
                f.write_str("'")
            }
            Constant::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Constant::Code(code) => write!(
                f,
                "<code object {}, file \"{}\", line {}>",
                code.name, code.filename, code.first_line
            ),
        }
    }
}

/// A code object in serialized form.
///
/// Field order follows the `code` constructor. `code` is the raw bytecode
/// and `lnotab` the compressed line-number table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCode {
    pub arg_count: u32,
    pub nlocals: u32,
    pub stack_size: u32,
    pub flags: CodeFlags,
    pub code: Vec<u8>,
    pub constants: Vec<Constant>,
    pub names: Vec<String>,
    pub varnames: Vec<String>,
    pub filename: String,
    pub name: String,
    pub first_line: u32,
    pub lnotab: Vec<u8>,
    pub freevars: Vec<String>,
    pub cellvars: Vec<String>,
}

impl RawCode {
    /// Serializes to the compact binary form used on disk.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<RawCode, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

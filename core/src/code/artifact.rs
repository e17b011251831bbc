use crate::String;
use crate::analysis;
use crate::encoder;
use crate::error::{EncodeError, StackError};

use super::{CodeFlags, Constant, InstructionStream, RawCode, Table};

/// A decoded code object: instruction stream plus the tables its operands
/// index into.
#[derive(Clone, Debug, Default)]
pub struct CodeArtifact {
    pub instructions: InstructionStream,
    pub constants: Table<Constant>,
    pub names: Table<String>,
    pub varnames: Table<String>,
    pub freevars: Table<String>,
    pub cellvars: Table<String>,
    pub arg_count: u32,
    /// Stack size declared by the source; the encoder replaces it unless told
    /// to keep it.
    pub stack_size: u32,
    pub flags: CodeFlags,
    pub filename: String,
    pub name: String,
    pub first_line: u32,
}

impl CodeArtifact {
    /// An empty artifact named `name`, starting at line 1.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            first_line: 1,
            ..Self::default()
        }
    }

    /// Index of `constant`, adding it to the pool if absent.
    pub fn add_constant(&mut self, constant: Constant) -> u32 {
        self.constants.intern(constant)
    }

    /// Index of `name` in the names table, adding it if absent.
    pub fn add_name(&mut self, name: impl Into<String>) -> u32 {
        self.names.intern(name.into())
    }

    /// Index of the local `name`, adding it if absent.
    pub fn add_varname(&mut self, name: impl Into<String>) -> u32 {
        self.varnames.intern(name.into())
    }

    /// Number of local slots, one per variable name.
    pub fn nlocals(&self) -> u32 {
        u32::try_from(self.varnames.len()).unwrap_or(u32::MAX)
    }

    /// Number of entries a free-variable operand may index: cell variables
    /// first, then free variables.
    pub fn free_slots(&self) -> usize {
        self.cellvars.len() + self.freevars.len()
    }

    /// Name behind a free-variable operand.
    pub fn free_name(&self, index: u32) -> Option<&str> {
        let cells = u32::try_from(self.cellvars.len()).unwrap_or(u32::MAX);
        if index < cells {
            self.cellvars.get(index).map(String::as_str)
        } else {
            self.freevars.get(index - cells).map(String::as_str)
        }
    }

    /// Index of a free-variable operand naming `name`.
    pub fn free_index(&self, name: &str) -> Option<u32> {
        let cell = self.cellvars.iter().position(|n| n == name);
        let free = || {
            self.freevars
                .iter()
                .position(|n| n == name)
                .map(|i| i + self.cellvars.len())
        };
        cell.or_else(free).and_then(|i| u32::try_from(i).ok())
    }

    /// Deepest value stack the instructions can reach.
    pub fn max_stack_depth(&self) -> Result<u32, StackError> {
        analysis::max_stack_depth(&self.instructions, self.arg_count)
    }

    /// Serializes with default [`EncodeOptions`](crate::EncodeOptions).
    pub fn encode(&self) -> Result<RawCode, EncodeError> {
        encoder::encode(self)
    }
}

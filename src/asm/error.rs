use bytepatch_core::{IntegrityError, OperandKind, OperandMismatch};
use miette::{Diagnostic, NamedSource, SourceSpan};

/// What went wrong while assembling a listing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsmErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),

    #[error("label `{0}` is not defined")]
    UndefinedLabel(String),

    #[error("label `{0}` is defined more than once")]
    DuplicateLabel(String),

    #[error("label `{0}` is not followed by an instruction")]
    DanglingLabel(String),

    #[error(transparent)]
    Operand(#[from] OperandMismatch),

    #[error("{0} takes no operand")]
    UnexpectedOperand(String),

    #[error("`{text}` is not a valid {expected} operand")]
    BadOperand { expected: OperandKind, text: String },

    #[error("`{0}` needs a code object to intern into")]
    NoTables(String),

    #[error("`{0}` is not a cell or free variable")]
    UnknownFreeVar(String),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

impl AsmErrorKind {
    fn help(&self) -> Option<String> {
        match self {
            AsmErrorKind::UnknownMnemonic(_) => {
                Some("mnemonics are CPython 2.7 opcode names such as LOAD_FAST".into())
            }
            AsmErrorKind::UndefinedLabel(name) => Some(format!("define it with `{name}:` before an instruction")),
            AsmErrorKind::NoTables(_) => {
                Some("use assemble_into with the code object that owns the tables".into())
            }
            _ => None,
        }
    }
}

/// An assembly error, pointing into the listing.
#[derive(Debug, thiserror::Error, Diagnostic)]
#[error("{kind}")]
#[diagnostic(code(bytepatch::asm))]
pub struct AsmError {
    pub kind: AsmErrorKind,
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
}

impl AsmError {
    pub(crate) fn new(kind: AsmErrorKind, source: &str, span: (usize, usize)) -> Self {
        let (start, end) = span;
        Self {
            help: kind.help(),
            kind,
            src: NamedSource::new("listing", source.to_string()),
            span: (start, end.saturating_sub(start)).into(),
        }
    }

    /// Byte range of the offending text.
    pub fn span(&self) -> SourceSpan {
        self.span
    }
}

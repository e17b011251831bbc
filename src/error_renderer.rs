//! Error rendering using miette
//!
//! Assembly errors carry the listing they came from and render with a source
//! snippet. Core errors have no source text; they render with a diagnostic
//! code derived from their [`ErrorKind`] and, where one applies, a hint.

use std::fmt;

use bytepatch_core::{EncodeError, Error, ErrorKind, StackError};
use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme};

/// Render a diagnostic with colors to stderr
///
/// # Example
/// ```no_run
/// use bytepatch::{assemble, render_error};
///
/// if let Err(e) = assemble("LOAD_MAGIC 1") {
///     render_error(&e);
/// }
/// ```
pub fn render_error(error: &dyn Diagnostic) {
    let mut out = String::new();
    if GraphicalReportHandler::new().render_report(&mut out, error).is_ok() {
        eprint!("{out}");
    } else {
        eprintln!("error: {error}");
    }
}

/// Render a diagnostic to a String without color codes (useful for tests)
///
/// # Example
/// ```
/// use bytepatch::{assemble, render_error_to_string};
///
/// let err = assemble("LOAD_MAGIC 1").unwrap_err();
/// let text = render_error_to_string(&err);
/// assert!(text.contains("unknown mnemonic `LOAD_MAGIC`"));
/// ```
pub fn render_error_to_string(error: &dyn Diagnostic) -> String {
    let mut out = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    if handler.render_report(&mut out, error).is_err() {
        out = format!("error: {error}");
    }
    out
}

/// A core [`Error`] presented as a miette diagnostic.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ErrorReport(#[from] pub Error);

impl Diagnostic for ErrorReport {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.0.kind() {
            ErrorKind::Decode => "bytepatch::decode",
            ErrorKind::Integrity => "bytepatch::integrity",
            ErrorKind::StackAnalysis => "bytepatch::stack",
            ErrorKind::Overflow => "bytepatch::overflow",
            ErrorKind::Encode => "bytepatch::encode",
            ErrorKind::Operand => "bytepatch::operand",
            ErrorKind::Install => "bytepatch::install",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            Error::Integrity(_) | Error::Encode(EncodeError::Integrity(_)) => {
                "use remove_redirect to move jumps off an instruction before removing it"
            }
            Error::Stack(StackError::Divergence { .. })
            | Error::Encode(EncodeError::Stack(StackError::Divergence { .. })) => {
                "every path into an instruction must leave the same number of values on the stack"
            }
            Error::Encode(EncodeError::BackwardRelativeJump { .. }) => {
                "relative jumps only go forward; use JUMP_ABSOLUTE for loops"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

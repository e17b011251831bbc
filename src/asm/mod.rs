//! Text assembler for instruction listings.
//!
//! A listing has one instruction per line, optionally preceded by labels:
//!
//! ```text
//!         LOAD_FAST n           @ 2
//!         LOAD_CONST =2
//!         COMPARE_OP <
//!         POP_JUMP_IF_FALSE else
//!         LOAD_FAST n           @ 3
//!         RETURN_VALUE
//! else:   LOAD_GLOBAL fib       @ 4
//! ```
//!
//! Operands are read according to the opcode's operand class: numbers are
//! raw indices, jumps name labels, `COMPARE_OP` takes an operator symbol, and
//! names, locals and `=constant` literals are interned into the code object
//! given to [`assemble_into`]. `@ n` marks the start of source line `n`;
//! `;` starts a comment.

mod error;

#[cfg(test)]
mod asm_test;

pub use error::{AsmError, AsmErrorKind};

use bytepatch_core::{
    CodeArtifact, CompareOp, Constant, InstrId, Instruction, InstructionStream, Opcode, Operand,
    OperandKind, OperandMismatch,
};
use hashbrown::HashMap;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "asm/listing.pest"]
struct ListingParser;

/// Assembles `listing` into a fresh instruction stream.
///
/// Only numeric operands, labels and comparison symbols are available; names
/// and constants need a code object, see [`assemble_into`].
pub fn assemble(listing: &str) -> Result<InstructionStream, AsmError> {
    Assembler::new(listing, None).run()
}

/// Assembles `listing` and installs the result as `artifact`'s instruction
/// stream, interning symbolic operands into its tables.
///
/// On error `artifact` is left unchanged.
pub fn assemble_into(listing: &str, artifact: &mut CodeArtifact) -> Result<(), AsmError> {
    let mut scratch = artifact.clone();
    let stream = Assembler::new(listing, Some(&mut scratch)).run()?;
    scratch.instructions = stream;
    *artifact = scratch;
    Ok(())
}

type Span = (usize, usize);

fn span_of(pair: &Pair<'_, Rule>) -> Span {
    let span = pair.as_span();
    (span.start(), span.end())
}

/// An operand before labels are resolved.
enum Pending {
    Ready(Option<Operand>),
    Jump { label: String, span: Span },
}

struct Parsed {
    opcode: Opcode,
    operand: Pending,
    line: Option<u32>,
    span: Span,
}

struct Assembler<'a> {
    source: &'a str,
    tables: Option<&'a mut CodeArtifact>,
    labels: HashMap<String, usize>,
    instructions: Vec<Parsed>,
}

impl<'a> Assembler<'a> {
    fn new(source: &'a str, tables: Option<&'a mut CodeArtifact>) -> Self {
        Self {
            source,
            tables,
            labels: HashMap::new(),
            instructions: Vec::new(),
        }
    }

    fn error(&self, kind: impl Into<AsmErrorKind>, span: Span) -> AsmError {
        AsmError::new(kind.into(), self.source, span)
    }

    fn run(mut self) -> Result<InstructionStream, AsmError> {
        let source = self.source;
        let listing = ListingParser::parse(Rule::listing, source)
            .map_err(|err| {
                let span = match err.location {
                    pest::error::InputLocation::Pos(pos) => (pos, pos),
                    pest::error::InputLocation::Span(span) => span,
                };
                self.error(AsmErrorKind::Syntax(err.variant.message().into_owned()), span)
            })?
            .next()
            .ok_or_else(|| self.error(AsmErrorKind::Syntax("empty listing".into()), (0, 0)))?;

        let mut unbound: Option<(String, Span)> = None;
        for line in listing.into_inner().filter(|p| p.as_rule() == Rule::line) {
            for pair in line.into_inner() {
                match pair.as_rule() {
                    Rule::label_def => {
                        let span = span_of(&pair);
                        let name = pair.into_inner().as_str().to_string();
                        if self.labels.contains_key(&name) {
                            return Err(self.error(AsmErrorKind::DuplicateLabel(name), span));
                        }
                        self.labels.insert(name.clone(), self.instructions.len());
                        unbound = Some((name, span));
                    }
                    Rule::instruction => {
                        let parsed = self.instruction(pair)?;
                        self.instructions.push(parsed);
                        unbound = None;
                    }
                    _ => {}
                }
            }
        }
        if let Some((name, span)) = unbound {
            return Err(self.error(AsmErrorKind::DanglingLabel(name), span));
        }

        self.build()
    }

    fn instruction(&mut self, pair: Pair<'a, Rule>) -> Result<Parsed, AsmError> {
        let span = span_of(&pair);
        let mut parts = pair.into_inner();
        let mnemonic = parts
            .next()
            .filter(|p| p.as_rule() == Rule::mnemonic)
            .ok_or_else(|| self.error(AsmErrorKind::Syntax("expected a mnemonic".into()), span))?;
        let opcode = Opcode::from_name(mnemonic.as_str()).ok_or_else(|| {
            self.error(
                AsmErrorKind::UnknownMnemonic(mnemonic.as_str().to_string()),
                span_of(&mnemonic),
            )
        })?;

        let mut operand = None;
        let mut line = None;
        for part in parts {
            if part.as_rule() == Rule::line_note {
                let note = span_of(&part);
                let number = part.into_inner().as_str();
                let parsed = number.parse::<u32>().map_err(|_| {
                    self.error(
                        AsmErrorKind::BadOperand {
                            expected: OperandKind::Immediate,
                            text: number.to_string(),
                        },
                        note,
                    )
                })?;
                line = Some(parsed);
            } else {
                operand = Some(part);
            }
        }

        let kind = opcode.operand_kind();
        let operand = match operand {
            None if kind == OperandKind::None => Pending::Ready(None),
            None => {
                let mismatch = OperandMismatch {
                    opcode,
                    expected: kind,
                    found: None,
                };
                return Err(self.error(mismatch, span));
            }
            Some(part) if kind == OperandKind::None => {
                return Err(self.error(
                    AsmErrorKind::UnexpectedOperand(opcode.name().to_string()),
                    span_of(&part),
                ));
            }
            Some(part) if kind.is_jump() && part.as_rule() == Rule::words => Pending::Jump {
                label: part.as_str().to_string(),
                span: span_of(&part),
            },
            Some(part) => Pending::Ready(Some(self.operand(kind, part)?)),
        };

        Ok(Parsed {
            opcode,
            operand,
            line,
            span,
        })
    }

    fn operand(&mut self, kind: OperandKind, part: Pair<'a, Rule>) -> Result<Operand, AsmError> {
        let span = span_of(&part);
        let text = part.as_str();
        let bad = |this: &Self| {
            this.error(
                AsmErrorKind::BadOperand {
                    expected: kind,
                    text: text.to_string(),
                },
                span,
            )
        };

        match (kind, part.as_rule()) {
            (_, Rule::number) => text
                .parse::<u32>()
                .ok()
                .and_then(|value| Operand::from_value(kind, value))
                .ok_or_else(|| bad(self)),
            (OperandKind::Compare, Rule::symbol | Rule::words) => CompareOp::from_symbol(text)
                .map(Operand::Compare)
                .ok_or_else(|| bad(self)),
            (OperandKind::Const, Rule::literal) => {
                let constant = literal(part).ok_or_else(|| bad(self))?;
                Ok(Operand::Const(self.tables(text, span)?.add_constant(constant)))
            }
            (OperandKind::Name, Rule::words) => Ok(Operand::Name(self.tables(text, span)?.add_name(text))),
            (OperandKind::Local, Rule::words) => {
                Ok(Operand::Local(self.tables(text, span)?.add_varname(text)))
            }
            (OperandKind::Free, Rule::words) => self
                .tables(text, span)?
                .free_index(text)
                .map(Operand::Free)
                .ok_or_else(|| self.error(AsmErrorKind::UnknownFreeVar(text.to_string()), span)),
            _ => Err(bad(self)),
        }
    }

    fn tables(&mut self, text: &str, span: Span) -> Result<&mut CodeArtifact, AsmError> {
        let source = self.source;
        self.tables
            .as_deref_mut()
            .ok_or_else(|| AsmError::new(AsmErrorKind::NoTables(text.to_string()), source, span))
    }

    /// Pushes every instruction, then points jumps at their labels. Jumps go
    /// in as `NOP` placeholders first since their targets may not exist yet.
    fn build(self) -> Result<InstructionStream, AsmError> {
        let mut stream = InstructionStream::new();
        let mut ids: Vec<InstrId> = Vec::with_capacity(self.instructions.len());

        for parsed in &self.instructions {
            let (opcode, operand) = match parsed.operand {
                Pending::Ready(operand) => (parsed.opcode, operand),
                Pending::Jump { .. } => (Opcode::Nop, None),
            };
            let mut instruction =
                Instruction::new(opcode, operand).map_err(|mismatch| self.error(mismatch, parsed.span))?;
            instruction.line = parsed.line;
            let id = stream
                .push(instruction)
                .map_err(|err| self.error(err, parsed.span))?;
            ids.push(id);
        }

        for (parsed, &id) in self.instructions.iter().zip(&ids) {
            let Pending::Jump { label, span } = &parsed.operand else {
                continue;
            };
            let target = self
                .labels
                .get(label)
                .and_then(|&position| ids.get(position))
                .copied()
                .ok_or_else(|| self.error(AsmErrorKind::UndefinedLabel(label.clone()), *span))?;
            let operand = match parsed.opcode.operand_kind() {
                OperandKind::RelJump => Operand::RelJump(target),
                _ => Operand::AbsJump(target),
            };
            let mut instruction = Instruction::new(parsed.opcode, Some(operand))
                .map_err(|mismatch| self.error(mismatch, parsed.span))?;
            instruction.line = parsed.line;
            stream
                .replace(id, instruction)
                .map_err(|err| self.error(err, parsed.span))?;
        }

        Ok(stream)
    }
}

fn literal(pair: Pair<'_, Rule>) -> Option<Constant> {
    let constant = pair.into_inner().next()?;
    let text = constant.as_str();
    match constant.as_rule() {
        Rule::none => Some(Constant::None),
        Rule::boolean => Some(Constant::Bool(text == "True")),
        Rule::integer => text.parse().ok().map(Constant::Int),
        Rule::float => text.parse().ok().map(Constant::Float),
        Rule::string => Some(Constant::Str(unescape(constant.into_inner().as_str()))),
        _ => None,
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

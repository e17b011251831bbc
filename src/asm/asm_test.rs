use bytepatch_core::{
    CodeArtifact, CompareOp, Constant, Opcode, Operand, OperandKind, OperandMismatch,
};
use indoc::indoc;
use pretty_assertions::assert_eq;

use super::{AsmErrorKind, assemble, assemble_into};

fn opcodes(listing: &str) -> Vec<Opcode> {
    assemble(listing)
        .unwrap()
        .iter()
        .map(|(_, instr)| instr.opcode())
        .collect()
}

fn error_kind(listing: &str) -> AsmErrorKind {
    assemble(listing).unwrap_err().kind
}

#[test]
fn test_numeric_operands() {
    let stream = assemble(indoc! {"
        LOAD_CONST 1
        LOAD_FAST 0
        BINARY_ADD
        RETURN_VALUE
    "})
    .unwrap();

    let (_, load) = stream.at(0).unwrap();
    assert_eq!(load.operand(), Some(&Operand::Const(1)));
    let (_, fast) = stream.at(1).unwrap();
    assert_eq!(fast.operand(), Some(&Operand::Local(0)));
    assert_eq!(stream.len(), 4);
}

#[test]
fn test_labels_resolve_forward_and_backward() {
    let stream = assemble(indoc! {"
                SETUP_LOOP end
                LOAD_FAST 0
                GET_ITER
        next:   FOR_ITER done
                STORE_FAST 1
                JUMP_ABSOLUTE next
        done:   POP_BLOCK
        end:
                LOAD_CONST 0
                RETURN_VALUE
    "})
    .unwrap();

    let ids = stream.ids().to_vec();
    let target = |index: usize| stream.at(index).unwrap().1.operand().copied();
    assert_eq!(target(0), Some(Operand::RelJump(ids[7])));
    assert_eq!(target(3), Some(Operand::RelJump(ids[6])));
    assert_eq!(target(5), Some(Operand::AbsJump(ids[3])));
}

#[test]
fn test_comparison_symbols() {
    let stream = assemble(indoc! {"
        COMPARE_OP <=
        COMPARE_OP not in
        COMPARE_OP exception match
        COMPARE_OP 2
    "})
    .unwrap();

    let ops: Vec<_> = stream
        .iter()
        .map(|(_, instr)| instr.operand().copied())
        .collect();
    assert_eq!(ops, vec![
        Some(Operand::Compare(CompareOp::Le)),
        Some(Operand::Compare(CompareOp::NotIn)),
        Some(Operand::Compare(CompareOp::ExceptionMatch)),
        Some(Operand::Compare(CompareOp::Eq)),
    ]);
}

#[test]
fn test_line_annotations_and_comments() {
    let stream = assemble(indoc! {"
        ; prologue
        LOAD_CONST 0      @ 3   ; start of line 3
        POP_TOP
        LOAD_CONST 0      @ 5
        RETURN_VALUE
    "})
    .unwrap();

    let lines: Vec<Option<u32>> = stream.iter().map(|(_, i)| i.line).collect();
    assert_eq!(lines, vec![Some(3), None, Some(5), None]);
}

#[test]
fn test_symbolic_operands_are_interned() {
    let mut artifact = CodeArtifact::new("f");
    artifact.add_varname("n");
    artifact.freevars.push("cell".into());

    assemble_into(
        indoc! {"
            LOAD_FAST n
            LOAD_GLOBAL len
            LOAD_CONST =None
            LOAD_CONST ='it\\'s'
            LOAD_CONST =-2
            LOAD_CONST =None
            LOAD_DEREF cell
            STORE_FAST m
        "},
        &mut artifact,
    )
    .unwrap();

    assert_eq!(artifact.constants.as_slice(), &[
        Constant::None,
        Constant::Str("it's".into()),
        Constant::Int(-2),
    ]);
    assert_eq!(artifact.names.as_slice(), &["len".to_string()]);
    assert_eq!(artifact.varnames.as_slice(), &["n".to_string(), "m".to_string()]);

    let operands: Vec<_> = artifact
        .instructions
        .iter()
        .map(|(_, i)| i.operand().copied())
        .collect();
    assert_eq!(operands[0], Some(Operand::Local(0)));
    assert_eq!(operands[5], Some(Operand::Const(0)));
    assert_eq!(operands[6], Some(Operand::Free(0)));
    assert_eq!(operands[7], Some(Operand::Local(1)));
}

#[test]
fn test_failed_listing_leaves_tables_untouched() {
    let mut artifact = CodeArtifact::new("f");
    artifact.add_varname("n");
    assemble_into("LOAD_FAST n\nRETURN_VALUE", &mut artifact).unwrap();

    let err = assemble_into(
        indoc! {"
            LOAD_GLOBAL len
            LOAD_CONST =7
            STORE_FAST tmp
            JUMP_ABSOLUTE nowhere
        "},
        &mut artifact,
    )
    .unwrap_err();

    assert_eq!(err.kind, AsmErrorKind::UndefinedLabel("nowhere".into()));
    assert!(artifact.names.is_empty());
    assert!(artifact.constants.is_empty());
    assert_eq!(artifact.varnames.as_slice(), &["n".to_string()]);
    let opcodes: Vec<_> = artifact
        .instructions
        .iter()
        .map(|(_, i)| i.opcode())
        .collect();
    assert_eq!(opcodes, vec![Opcode::LoadFast, Opcode::ReturnValue]);
}

#[test]
fn test_slice_mnemonics() {
    assert_eq!(opcodes("SLICE+2\nSTORE_SLICE+0"), vec![
        Opcode::Slice2,
        Opcode::StoreSlice0
    ]);
}

#[test]
fn test_unknown_mnemonic() {
    let err = assemble("LOAD_FAST 0\nLOAD_MAGIC 1").unwrap_err();
    assert_eq!(err.kind, AsmErrorKind::UnknownMnemonic("LOAD_MAGIC".into()));
    assert_eq!(err.span().offset(), 12);
    assert_eq!(err.span().len(), 10);
}

#[test]
fn test_label_errors() {
    assert_eq!(
        error_kind("JUMP_ABSOLUTE nowhere"),
        AsmErrorKind::UndefinedLabel("nowhere".into())
    );
    assert_eq!(
        error_kind("a: NOP\na: NOP"),
        AsmErrorKind::DuplicateLabel("a".into())
    );
    assert_eq!(
        error_kind("NOP\ntail:"),
        AsmErrorKind::DanglingLabel("tail".into())
    );
}

#[test]
fn test_operand_errors() {
    assert_eq!(
        error_kind("LOAD_FAST"),
        AsmErrorKind::Operand(OperandMismatch {
            opcode: Opcode::LoadFast,
            expected: OperandKind::Local,
            found: None,
        })
    );
    assert_eq!(
        error_kind("POP_TOP 1"),
        AsmErrorKind::UnexpectedOperand("POP_TOP".into())
    );
    assert_eq!(
        error_kind("JUMP_FORWARD 12"),
        AsmErrorKind::BadOperand {
            expected: OperandKind::RelJump,
            text: "12".into()
        }
    );
    assert_eq!(
        error_kind("COMPARE_OP roughly"),
        AsmErrorKind::BadOperand {
            expected: OperandKind::Compare,
            text: "roughly".into()
        }
    );
    assert_eq!(
        error_kind("LOAD_GLOBAL len"),
        AsmErrorKind::NoTables("len".into())
    );
}

#[test]
fn test_extended_arg_cannot_be_written() {
    assert!(matches!(
        error_kind("EXTENDED_ARG 1\nLOAD_CONST 0"),
        AsmErrorKind::Operand(_)
    ));
}

#[test]
fn test_syntax_error_points_into_listing() {
    let err = assemble("LOAD_CONST 0\n)").unwrap_err();
    assert!(matches!(err.kind, AsmErrorKind::Syntax(_)));
    assert_eq!(err.span().offset(), 13);
}

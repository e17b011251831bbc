mod common;

use bytepatch::{
    DecodeError, EncodeError, EncodeOptions, Encoder, Error, ErrorKind, ErrorReport, Opcode,
    decode, encode, render_error_to_string,
};
use pretty_assertions::assert_eq;

fn kind(error: impl Into<Error>) -> ErrorKind {
    error.into().kind()
}

#[test]
fn test_unknown_opcode() {
    let mut raw = common::fib();
    raw.code[15] = 6;
    let err = decode(&raw).unwrap_err();
    assert_eq!(err, DecodeError::UnknownOpcode { offset: 15, byte: 6 });
    assert_eq!(kind(err), ErrorKind::Decode);
}

#[test]
fn test_truncated_operand() {
    let mut raw = common::fib();
    // Cut the final CALL_FUNCTION after its first operand byte.
    raw.code.truncate(41);
    assert_eq!(
        decode(&raw).unwrap_err(),
        DecodeError::Truncated {
            offset: 39,
            opcode: Opcode::CallFunction
        }
    );
}

#[test]
fn test_stack_errors_surface_through_encode() {
    let mut artifact = decode(&common::fib()).unwrap();
    // Without the first load, COMPARE_OP has one operand to pop.
    let first = artifact.instructions.first().unwrap();
    artifact.instructions.remove(first).unwrap();

    let err = encode(&artifact).unwrap_err();
    assert!(matches!(err, EncodeError::Stack(_)));
    assert_eq!(kind(err), ErrorKind::StackAnalysis);
}

#[test]
fn test_layout_limit() {
    let artifact = decode(&common::fib()).unwrap();
    let err = Encoder::new(EncodeOptions {
        max_iterations: 0,
        ..EncodeOptions::default()
    })
    .encode(&artifact)
    .unwrap_err();
    assert_eq!(err, EncodeError::LayoutDiverged { passes: 0 });
    assert_eq!(kind(err), ErrorKind::Encode);
}

#[test]
fn test_reports_render_with_code() {
    let mut raw = common::fib();
    raw.code[0] = 6;
    let report = ErrorReport(decode(&raw).unwrap_err().into());
    let text = render_error_to_string(&report);
    assert!(text.contains("bytepatch::decode"));
    assert!(text.contains("unknown opcode 6 at offset 0"), "{text}");
}

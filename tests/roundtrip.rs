mod common;

use bytepatch::{Decoder, DecodeOptions, RawCode, decode, encode};
use pretty_assertions::assert_eq;

#[test]
fn test_unedited_code_is_reproduced() {
    for raw in [common::fib(), common::total()] {
        let artifact = decode(&raw).unwrap();
        let encoded = encode(&artifact).unwrap();
        assert_eq!(encoded, raw, "{}", raw.name);
    }
}

#[test]
fn test_reencoding_is_stable() {
    let raw = common::total();
    let once = encode(&decode(&raw).unwrap()).unwrap();
    let twice = encode(&decode(&once).unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_tables_are_carried_through() {
    let artifact = decode(&common::fib()).unwrap();
    assert_eq!(artifact.names.as_slice(), &["fib".to_string()]);
    assert_eq!(artifact.varnames.as_slice(), &["n".to_string()]);
    assert_eq!(artifact.constants.len(), 3);
    assert_eq!(artifact.arg_count, 1);
    assert_eq!(artifact.instructions.len(), 18);
}

#[test]
fn test_serialized_module_round_trip() {
    let module = common::module(vec![common::fib(), common::total()]);
    let bytes = module.to_bytes().unwrap();
    assert_eq!(RawCode::from_bytes(&bytes).unwrap(), module);
}

#[test]
fn test_unvalidated_decode_keeps_out_of_range_operands() {
    let mut raw = common::fib();
    raw.constants.truncate(1);

    assert!(decode(&raw).is_err());
    let artifact = Decoder::new(DecodeOptions {
        validate_operands: false,
    })
    .decode(&raw)
    .unwrap();
    assert_eq!(artifact.instructions.len(), 18);
    // The encoder still refuses to write them.
    assert!(encode(&artifact).is_err());
}

#![allow(dead_code)]

use bytepatch::{CodeArtifact, Constant, RawCode, assemble_into};

/// `def fib(n): if n < 2: return n; return fib(n - 1) + fib(n - 2)`
pub fn fib() -> RawCode {
    RawCode {
        arg_count: 1,
        nlocals: 1,
        stack_size: 4,
        code: vec![
            124, 0, 0, // LOAD_FAST n
            100, 1, 0, // LOAD_CONST 2
            107, 0, 0, // COMPARE_OP <
            114, 16, 0, // POP_JUMP_IF_FALSE 16
            124, 0, 0, // LOAD_FAST n
            83, // RETURN_VALUE
            116, 0, 0, // LOAD_GLOBAL fib
            124, 0, 0, // LOAD_FAST n
            100, 2, 0, // LOAD_CONST 1
            24,  // BINARY_SUBTRACT
            131, 1, 0, // CALL_FUNCTION 1
            116, 0, 0, // LOAD_GLOBAL fib
            124, 0, 0, // LOAD_FAST n
            100, 1, 0, // LOAD_CONST 2
            24,  // BINARY_SUBTRACT
            131, 1, 0, // CALL_FUNCTION 1
            23,  // BINARY_ADD
            83,  // RETURN_VALUE
        ],
        constants: vec![Constant::None, Constant::Int(2), Constant::Int(1)],
        names: vec!["fib".into()],
        varnames: vec!["n".into()],
        filename: "fib.py".into(),
        name: "fib".into(),
        first_line: 1,
        lnotab: vec![0, 1, 12, 1, 4, 1],
        ..RawCode::default()
    }
}

/// `def total(xs): s = 0; for x in xs: s += x; return s`
pub fn total() -> RawCode {
    RawCode {
        arg_count: 1,
        nlocals: 3,
        stack_size: 3,
        code: vec![
            100, 1, 0, // LOAD_CONST 0
            125, 1, 0, // STORE_FAST s
            120, 24, 0, // SETUP_LOOP to 33
            124, 0, 0, // LOAD_FAST xs
            68,  // GET_ITER
            93, 16, 0, // FOR_ITER to 32
            125, 2, 0, // STORE_FAST x
            124, 1, 0, // LOAD_FAST s
            124, 2, 0, // LOAD_FAST x
            55,  // INPLACE_ADD
            125, 1, 0, // STORE_FAST s
            113, 13, 0, // JUMP_ABSOLUTE 13
            87,  // POP_BLOCK
            124, 1, 0, // LOAD_FAST s
            83,  // RETURN_VALUE
        ],
        constants: vec![Constant::None, Constant::Int(0)],
        varnames: vec!["xs".into(), "s".into(), "x".into()],
        filename: "total.py".into(),
        name: "total".into(),
        first_line: 1,
        lnotab: vec![0, 1, 6, 1, 13, 1, 14, 1],
        ..RawCode::default()
    }
}

/// A module code object holding `functions` in its constant pool.
pub fn module(functions: Vec<RawCode>) -> RawCode {
    let mut constants: Vec<Constant> = functions
        .into_iter()
        .map(|code| Constant::Code(Box::new(code)))
        .collect();
    constants.push(Constant::None);
    RawCode {
        stack_size: 1,
        code: vec![100, 0, 0, 83],
        constants,
        filename: "module.py".into(),
        name: "<module>".into(),
        first_line: 1,
        ..RawCode::default()
    }
}

/// A fresh code object named `name` with `listing` assembled into it.
pub fn assembled(name: &str, listing: &str) -> CodeArtifact {
    let mut artifact = CodeArtifact::new(name);
    assemble_into(listing, &mut artifact).unwrap();
    artifact
}

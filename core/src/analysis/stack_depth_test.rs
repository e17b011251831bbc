//! Tests for the stack-depth analyzer.

use pretty_assertions::assert_eq;

use super::{analyze, max_stack_depth};
use crate::code::{InstructionStream, Operand};
use crate::error::StackError;
use crate::opcode::{CompareOp, Opcode};
use crate::test_utils::{StreamBuilder, init_test_logging};
use crate::vec;

fn depth(stream: &InstructionStream) -> Result<u32, StackError> {
    max_stack_depth(stream, 0)
}

#[test]
fn test_straight_line() {
    let stream = StreamBuilder::new()
        .arg(Opcode::LoadConst, Operand::Const(0))
        .arg(Opcode::LoadConst, Operand::Const(1))
        .op(Opcode::BinaryAdd)
        .arg(Opcode::StoreFast, Operand::Local(0))
        .finish();

    assert_eq!(depth(&stream), Ok(2));
    assert_eq!(
        analyze(&stream, 0).unwrap().entry,
        vec![Some(0), Some(1), Some(2), Some(1)]
    );
}

#[test]
fn test_conditional_branches() {
    // if n < 2: return n
    // return fib(n - 1) + fib(n - 2)
    let stream = StreamBuilder::new()
        .arg(Opcode::LoadFast, Operand::Local(0))
        .arg(Opcode::LoadConst, Operand::Const(1))
        .arg(Opcode::CompareOp, Operand::Compare(CompareOp::Lt))
        .jump(Opcode::PopJumpIfFalse, "else")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .op(Opcode::ReturnValue)
        .label("else")
        .arg(Opcode::LoadGlobal, Operand::Name(0))
        .arg(Opcode::LoadFast, Operand::Local(0))
        .arg(Opcode::LoadConst, Operand::Const(2))
        .op(Opcode::BinarySubtract)
        .arg(Opcode::CallFunction, Operand::Immediate(1))
        .arg(Opcode::LoadGlobal, Operand::Name(0))
        .arg(Opcode::LoadFast, Operand::Local(0))
        .arg(Opcode::LoadConst, Operand::Const(1))
        .op(Opcode::BinarySubtract)
        .arg(Opcode::CallFunction, Operand::Immediate(1))
        .op(Opcode::BinaryAdd)
        .op(Opcode::ReturnValue)
        .finish();

    assert_eq!(depth(&stream), Ok(4));
}

#[test]
fn test_for_loop() {
    let stream = StreamBuilder::new()
        .arg(Opcode::LoadConst, Operand::Const(1))
        .arg(Opcode::StoreFast, Operand::Local(1))
        .jump(Opcode::SetupLoop, "end")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .op(Opcode::GetIter)
        .label("next")
        .jump(Opcode::ForIter, "done")
        .arg(Opcode::StoreFast, Operand::Local(2))
        .arg(Opcode::LoadFast, Operand::Local(1))
        .arg(Opcode::LoadFast, Operand::Local(2))
        .op(Opcode::InplaceAdd)
        .arg(Opcode::StoreFast, Operand::Local(1))
        .jump(Opcode::JumpAbsolute, "next")
        .label("done")
        .op(Opcode::PopBlock)
        .label("end")
        .arg(Opcode::LoadFast, Operand::Local(1))
        .op(Opcode::ReturnValue)
        .finish();

    assert_eq!(depth(&stream), Ok(3));
}

#[test]
fn test_break_discards_iterator() {
    let stream = StreamBuilder::new()
        .jump(Opcode::SetupLoop, "end")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .op(Opcode::GetIter)
        .label("next")
        .jump(Opcode::ForIter, "done")
        .arg(Opcode::StoreFast, Operand::Local(1))
        .op(Opcode::BreakLoop)
        .jump(Opcode::JumpAbsolute, "next")
        .label("done")
        .op(Opcode::PopBlock)
        .label("end")
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    let depths = analyze(&stream, 1).unwrap();
    assert_eq!(depths.max, 2);
    // JUMP_ABSOLUTE after BREAK_LOOP is dead.
    assert_eq!(depths.entry[6], None);
    assert_eq!(depths.entry[8], Some(0));
}

#[test]
fn test_try_except_handler_depth() {
    init_test_logging();
    let stream = StreamBuilder::new()
        .jump(Opcode::SetupExcept, "handler")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .arg(Opcode::CallFunction, Operand::Immediate(0))
        .op(Opcode::ReturnValue)
        .op(Opcode::PopBlock)
        .jump(Opcode::JumpForward, "end")
        .label("handler")
        .op(Opcode::PopTop)
        .op(Opcode::PopTop)
        .op(Opcode::PopTop)
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .op(Opcode::EndFinally)
        .label("end")
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    let depths = analyze(&stream, 1).unwrap();
    assert_eq!(depths.max, 3);
    assert_eq!(depths.entry[6], Some(3));
    assert_eq!(depths.entry[12], None);
}

#[test]
fn test_try_except_with_type_match() {
    let stream = StreamBuilder::new()
        .arg(Opcode::LoadConst, Operand::Const(0))
        .jump(Opcode::SetupExcept, "handler")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .op(Opcode::PopTop)
        .op(Opcode::PopBlock)
        .jump(Opcode::JumpForward, "end")
        .label("handler")
        .op(Opcode::DupTop)
        .arg(Opcode::LoadGlobal, Operand::Name(0))
        .arg(Opcode::CompareOp, Operand::Compare(CompareOp::ExceptionMatch))
        .jump(Opcode::PopJumpIfFalse, "reraise")
        .op(Opcode::PopTop)
        .op(Opcode::PopTop)
        .op(Opcode::PopTop)
        .jump(Opcode::JumpForward, "end")
        .label("reraise")
        .op(Opcode::EndFinally)
        .label("end")
        .op(Opcode::ReturnValue)
        .finish();

    // One value below the handler frame, three exception values, plus
    // DUP_TOP and the class being matched.
    assert_eq!(depth(&stream), Ok(6));
}

#[test]
fn test_try_finally_joins_normal_and_exceptional_entry() {
    let stream = StreamBuilder::new()
        .jump(Opcode::SetupFinally, "finally")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .arg(Opcode::CallFunction, Operand::Immediate(0))
        .op(Opcode::PopTop)
        .op(Opcode::PopBlock)
        .arg(Opcode::LoadConst, Operand::Const(0))
        .label("finally")
        .arg(Opcode::LoadFast, Operand::Local(1))
        .arg(Opcode::CallFunction, Operand::Immediate(0))
        .op(Opcode::PopTop)
        .op(Opcode::EndFinally)
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    assert_eq!(depth(&stream), Ok(4));
}

#[test]
fn test_with_statement() {
    let stream = StreamBuilder::new()
        .arg(Opcode::LoadGlobal, Operand::Name(0))
        .arg(Opcode::CallFunction, Operand::Immediate(0))
        .jump(Opcode::SetupWith, "exit")
        .op(Opcode::PopTop)
        .arg(Opcode::LoadConst, Operand::Const(1))
        .op(Opcode::PrintItem)
        .op(Opcode::PopBlock)
        .arg(Opcode::LoadConst, Operand::Const(0))
        .label("exit")
        .op(Opcode::WithCleanup)
        .op(Opcode::EndFinally)
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    let depths = analyze(&stream, 0).unwrap();
    assert_eq!(depths.max, 4);
    assert_eq!(depths.entry[8], Some(4));
    assert_eq!(depths.entry[10], Some(0));
}

#[test]
fn test_continue_inside_try_unwinds_to_loop() {
    let stream = StreamBuilder::new()
        .jump(Opcode::SetupLoop, "end")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .op(Opcode::GetIter)
        .label("next")
        .jump(Opcode::ForIter, "done")
        .arg(Opcode::StoreFast, Operand::Local(1))
        .jump(Opcode::SetupExcept, "handler")
        .arg(Opcode::LoadFast, Operand::Local(1))
        .op(Opcode::PopTop)
        .jump(Opcode::ContinueLoop, "next")
        .label("handler")
        .op(Opcode::PopTop)
        .op(Opcode::PopTop)
        .op(Opcode::PopTop)
        .jump(Opcode::JumpAbsolute, "next")
        .label("done")
        .op(Opcode::PopBlock)
        .label("end")
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    assert_eq!(depth(&stream), Ok(4));
}

#[test]
fn test_continue_inside_with_drops_exit() {
    // for x in xs:
    //     with m:
    //         continue
    let stream = StreamBuilder::new()
        .jump(Opcode::SetupLoop, "end")
        .arg(Opcode::LoadFast, Operand::Local(0))
        .op(Opcode::GetIter)
        .label("top")
        .jump(Opcode::ForIter, "done")
        .arg(Opcode::StoreFast, Operand::Local(1))
        .arg(Opcode::LoadFast, Operand::Local(2))
        .jump(Opcode::SetupWith, "cleanup")
        .op(Opcode::PopTop)
        .jump(Opcode::ContinueLoop, "top")
        .op(Opcode::PopBlock)
        .arg(Opcode::LoadConst, Operand::Const(0))
        .label("cleanup")
        .op(Opcode::WithCleanup)
        .op(Opcode::EndFinally)
        .jump(Opcode::JumpAbsolute, "top")
        .label("done")
        .op(Opcode::PopBlock)
        .label("end")
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    let depths = analyze(&stream, 1).unwrap();
    // The iterator alone is on the stack whenever FOR_ITER runs.
    assert_eq!(depths.entry[3], Some(1));
    assert_eq!(depths.entry[9], None);
    // __exit__ plus the three exception values.
    assert_eq!(depths.entry[11], Some(5));
    assert_eq!(depths.max, 5);
}

#[test]
fn test_unreachable_code_is_ignored() {
    let mut builder = StreamBuilder::new()
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue);
    for _ in 0..5 {
        builder = builder.arg(Opcode::LoadConst, Operand::Const(0));
    }
    let stream = builder.finish();

    assert_eq!(depth(&stream), Ok(1));
}

#[test]
fn test_divergent_join_is_an_error() {
    let stream = StreamBuilder::new()
        .arg(Opcode::LoadFast, Operand::Local(0))
        .jump(Opcode::PopJumpIfFalse, "join")
        .arg(Opcode::LoadConst, Operand::Const(0))
        .label("join")
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    assert_eq!(
        depth(&stream),
        Err(StackError::Divergence {
            index: 3,
            expected: 0,
            found: 1
        })
    );
}

#[test]
fn test_underflow() {
    let stream = StreamBuilder::new()
        .op(Opcode::PopTop)
        .op(Opcode::ReturnValue)
        .finish();

    assert_eq!(
        depth(&stream),
        Err(StackError::Underflow {
            index: 0,
            opcode: Opcode::PopTop,
            depth: 0
        })
    );
}

#[test]
fn test_pop_block_without_setup() {
    let stream = StreamBuilder::new()
        .op(Opcode::PopBlock)
        .arg(Opcode::LoadConst, Operand::Const(0))
        .op(Opcode::ReturnValue)
        .finish();

    assert_eq!(
        depth(&stream),
        Err(StackError::UnbalancedBlock {
            index: 0,
            opcode: Opcode::PopBlock
        })
    );
}

#[test]
fn test_unresolved_jump_target() {
    let mut stream = StreamBuilder::new()
        .jump(Opcode::JumpAbsolute, "x")
        .label("x")
        .op(Opcode::Nop)
        .op(Opcode::ReturnValue)
        .finish();
    let ids = stream.ids().to_vec();
    let ret = ids[2];
    stream.remove(ret).unwrap();
    stream
        .get_mut(ids[0])
        .unwrap()
        .set_operand(Some(Operand::AbsJump(ret)))
        .unwrap();

    assert_eq!(depth(&stream), Err(StackError::UnresolvedTarget { index: 0 }));
}

#[test]
fn test_empty_stream() {
    assert_eq!(depth(&InstructionStream::new()), Ok(0));
}

//! The opcode table itself.

use super::OperandEffect::{
    BuildSlice, Call, Collect, Duplicate, MakeClosure, MakeFunction, Raise, Unpack,
};
use super::StackEffect::{Branch, Fixed, Operand};
use super::{Flow, OpInfo, OperandKind};

macro_rules! opcodes {
    ($($byte:literal => $variant:ident $name:literal $operand:ident $flow:ident $effect:expr;)*) => {
        /// A CPython 2.7 opcode.
        ///
        /// Discriminants are the opcode bytes; bytes not listed here are
        /// unassigned and rejected by the decoder.
        #[repr(u8)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Opcode {
            $($variant = $byte,)*
        }

        impl Opcode {
            /// Every assigned opcode, in byte order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            pub const fn from_byte(byte: u8) -> Option<Opcode> {
                match byte {
                    $($byte => Some(Opcode::$variant),)*
                    _ => None,
                }
            }

            pub const fn info(self) -> OpInfo {
                match self {
                    $(Opcode::$variant => OpInfo {
                        name: $name,
                        operand: OperandKind::$operand,
                        flow: Flow::$flow,
                        effect: $effect,
                    },)*
                }
            }
        }
    };
}

opcodes! {
      0 => StopCode "STOP_CODE" None Raise Fixed(0);
      1 => PopTop "POP_TOP" None Next Fixed(-1);
      2 => RotTwo "ROT_TWO" None Next Fixed(0);
      3 => RotThree "ROT_THREE" None Next Fixed(0);
      4 => DupTop "DUP_TOP" None Next Fixed(1);
      5 => RotFour "ROT_FOUR" None Next Fixed(0);
      9 => Nop "NOP" None Next Fixed(0);
     10 => UnaryPositive "UNARY_POSITIVE" None Next Fixed(0);
     11 => UnaryNegative "UNARY_NEGATIVE" None Next Fixed(0);
     12 => UnaryNot "UNARY_NOT" None Next Fixed(0);
     13 => UnaryConvert "UNARY_CONVERT" None Next Fixed(0);
     15 => UnaryInvert "UNARY_INVERT" None Next Fixed(0);
     19 => BinaryPower "BINARY_POWER" None Next Fixed(-1);
     20 => BinaryMultiply "BINARY_MULTIPLY" None Next Fixed(-1);
     21 => BinaryDivide "BINARY_DIVIDE" None Next Fixed(-1);
     22 => BinaryModulo "BINARY_MODULO" None Next Fixed(-1);
     23 => BinaryAdd "BINARY_ADD" None Next Fixed(-1);
     24 => BinarySubtract "BINARY_SUBTRACT" None Next Fixed(-1);
     25 => BinarySubscr "BINARY_SUBSCR" None Next Fixed(-1);
     26 => BinaryFloorDivide "BINARY_FLOOR_DIVIDE" None Next Fixed(-1);
     27 => BinaryTrueDivide "BINARY_TRUE_DIVIDE" None Next Fixed(-1);
     28 => InplaceFloorDivide "INPLACE_FLOOR_DIVIDE" None Next Fixed(-1);
     29 => InplaceTrueDivide "INPLACE_TRUE_DIVIDE" None Next Fixed(-1);
     30 => Slice0 "SLICE+0" None Next Fixed(0);
     31 => Slice1 "SLICE+1" None Next Fixed(-1);
     32 => Slice2 "SLICE+2" None Next Fixed(-1);
     33 => Slice3 "SLICE+3" None Next Fixed(-2);
     40 => StoreSlice0 "STORE_SLICE+0" None Next Fixed(-2);
     41 => StoreSlice1 "STORE_SLICE+1" None Next Fixed(-3);
     42 => StoreSlice2 "STORE_SLICE+2" None Next Fixed(-3);
     43 => StoreSlice3 "STORE_SLICE+3" None Next Fixed(-4);
     50 => DeleteSlice0 "DELETE_SLICE+0" None Next Fixed(-1);
     51 => DeleteSlice1 "DELETE_SLICE+1" None Next Fixed(-2);
     52 => DeleteSlice2 "DELETE_SLICE+2" None Next Fixed(-2);
     53 => DeleteSlice3 "DELETE_SLICE+3" None Next Fixed(-3);
     54 => StoreMap "STORE_MAP" None Next Fixed(-2);
     55 => InplaceAdd "INPLACE_ADD" None Next Fixed(-1);
     56 => InplaceSubtract "INPLACE_SUBTRACT" None Next Fixed(-1);
     57 => InplaceMultiply "INPLACE_MULTIPLY" None Next Fixed(-1);
     58 => InplaceDivide "INPLACE_DIVIDE" None Next Fixed(-1);
     59 => InplaceModulo "INPLACE_MODULO" None Next Fixed(-1);
     60 => StoreSubscr "STORE_SUBSCR" None Next Fixed(-3);
     61 => DeleteSubscr "DELETE_SUBSCR" None Next Fixed(-2);
     62 => BinaryLshift "BINARY_LSHIFT" None Next Fixed(-1);
     63 => BinaryRshift "BINARY_RSHIFT" None Next Fixed(-1);
     64 => BinaryAnd "BINARY_AND" None Next Fixed(-1);
     65 => BinaryXor "BINARY_XOR" None Next Fixed(-1);
     66 => BinaryOr "BINARY_OR" None Next Fixed(-1);
     67 => InplacePower "INPLACE_POWER" None Next Fixed(-1);
     68 => GetIter "GET_ITER" None Next Fixed(0);
     70 => PrintExpr "PRINT_EXPR" None Next Fixed(-1);
     71 => PrintItem "PRINT_ITEM" None Next Fixed(-1);
     72 => PrintNewline "PRINT_NEWLINE" None Next Fixed(0);
     73 => PrintItemTo "PRINT_ITEM_TO" None Next Fixed(-2);
     74 => PrintNewlineTo "PRINT_NEWLINE_TO" None Next Fixed(-1);
     75 => InplaceLshift "INPLACE_LSHIFT" None Next Fixed(-1);
     76 => InplaceRshift "INPLACE_RSHIFT" None Next Fixed(-1);
     77 => InplaceAnd "INPLACE_AND" None Next Fixed(-1);
     78 => InplaceXor "INPLACE_XOR" None Next Fixed(-1);
     79 => InplaceOr "INPLACE_OR" None Next Fixed(-1);
     80 => BreakLoop "BREAK_LOOP" None BreakLoop Fixed(0);
     81 => WithCleanup "WITH_CLEANUP" None Next Fixed(-1);
     82 => LoadLocals "LOAD_LOCALS" None Next Fixed(1);
     83 => ReturnValue "RETURN_VALUE" None Return Fixed(-1);
     84 => ImportStar "IMPORT_STAR" None Next Fixed(-1);
     85 => ExecStmt "EXEC_STMT" None Next Fixed(-3);
     86 => YieldValue "YIELD_VALUE" None Next Fixed(0);
     87 => PopBlock "POP_BLOCK" None PopBlock Fixed(0);
     88 => EndFinally "END_FINALLY" None EndFinally Fixed(-3);
     89 => BuildClass "BUILD_CLASS" None Next Fixed(-2);
     90 => StoreName "STORE_NAME" Name Next Fixed(-1);
     91 => DeleteName "DELETE_NAME" Name Next Fixed(0);
     92 => UnpackSequence "UNPACK_SEQUENCE" Immediate Next Operand(Unpack);
     93 => ForIter "FOR_ITER" RelJump Branch Branch { fall: 1, jump: -1 };
     94 => ListAppend "LIST_APPEND" Immediate Next Fixed(-1);
     95 => StoreAttr "STORE_ATTR" Name Next Fixed(-2);
     96 => DeleteAttr "DELETE_ATTR" Name Next Fixed(-1);
     97 => StoreGlobal "STORE_GLOBAL" Name Next Fixed(-1);
     98 => DeleteGlobal "DELETE_GLOBAL" Name Next Fixed(0);
     99 => DupTopx "DUP_TOPX" Immediate Next Operand(Duplicate);
    100 => LoadConst "LOAD_CONST" Const Next Fixed(1);
    101 => LoadName "LOAD_NAME" Name Next Fixed(1);
    102 => BuildTuple "BUILD_TUPLE" Immediate Next Operand(Collect);
    103 => BuildList "BUILD_LIST" Immediate Next Operand(Collect);
    104 => BuildSet "BUILD_SET" Immediate Next Operand(Collect);
    105 => BuildMap "BUILD_MAP" Immediate Next Fixed(1);
    106 => LoadAttr "LOAD_ATTR" Name Next Fixed(0);
    107 => CompareOp "COMPARE_OP" Compare Next Fixed(-1);
    108 => ImportName "IMPORT_NAME" Name Next Fixed(-1);
    109 => ImportFrom "IMPORT_FROM" Name Next Fixed(1);
    110 => JumpForward "JUMP_FORWARD" RelJump Jump Fixed(0);
    111 => JumpIfFalseOrPop "JUMP_IF_FALSE_OR_POP" AbsJump Branch Branch { fall: -1, jump: 0 };
    112 => JumpIfTrueOrPop "JUMP_IF_TRUE_OR_POP" AbsJump Branch Branch { fall: -1, jump: 0 };
    113 => JumpAbsolute "JUMP_ABSOLUTE" AbsJump Jump Fixed(0);
    114 => PopJumpIfFalse "POP_JUMP_IF_FALSE" AbsJump Branch Fixed(-1);
    115 => PopJumpIfTrue "POP_JUMP_IF_TRUE" AbsJump Branch Fixed(-1);
    116 => LoadGlobal "LOAD_GLOBAL" Name Next Fixed(1);
    119 => ContinueLoop "CONTINUE_LOOP" AbsJump ContinueLoop Fixed(0);
    120 => SetupLoop "SETUP_LOOP" RelJump SetupLoop Fixed(0);
    121 => SetupExcept "SETUP_EXCEPT" RelJump SetupExcept Fixed(0);
    122 => SetupFinally "SETUP_FINALLY" RelJump SetupFinally Fixed(0);
    124 => LoadFast "LOAD_FAST" Local Next Fixed(1);
    125 => StoreFast "STORE_FAST" Local Next Fixed(-1);
    126 => DeleteFast "DELETE_FAST" Local Next Fixed(0);
    130 => RaiseVarargs "RAISE_VARARGS" Immediate Raise Operand(Raise);
    131 => CallFunction "CALL_FUNCTION" Immediate Next Operand(Call { extra: 0 });
    132 => MakeFunction "MAKE_FUNCTION" Immediate Next Operand(MakeFunction);
    133 => BuildSlice "BUILD_SLICE" Immediate Next Operand(BuildSlice);
    134 => MakeClosure "MAKE_CLOSURE" Immediate Next Operand(MakeClosure);
    135 => LoadClosure "LOAD_CLOSURE" Free Next Fixed(1);
    136 => LoadDeref "LOAD_DEREF" Free Next Fixed(1);
    137 => StoreDeref "STORE_DEREF" Free Next Fixed(-1);
    140 => CallFunctionVar "CALL_FUNCTION_VAR" Immediate Next Operand(Call { extra: 1 });
    141 => CallFunctionKw "CALL_FUNCTION_KW" Immediate Next Operand(Call { extra: 1 });
    142 => CallFunctionVarKw "CALL_FUNCTION_VAR_KW" Immediate Next Operand(Call { extra: 2 });
    143 => SetupWith "SETUP_WITH" RelJump SetupWith Fixed(1);
    145 => ExtendedArg "EXTENDED_ARG" Immediate Next Fixed(0);
    146 => SetAdd "SET_ADD" Immediate Next Fixed(-1);
    147 => MapAdd "MAP_ADD" Immediate Next Fixed(-2);
}

//! The stable global token set every bytecode variant's local opcodes map onto, plus the
//! variable-length token encoding shared by every revision (`spec.md` §4.6).

/// ~130 tokens spanning every bytecode revision this core understands. Each variant only uses a
/// subset; `variant_record::BytecodeVariant::token_map` is the per-variant local-opcode → global
/// mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum GlobalToken {
    Empty,
    Identifier,
    Constant,
    SelfKeyword,
    BuiltInType,
    BuiltInFunc,
    OpIn,
    OpEqual,
    OpNotEqual,
    OpLess,
    OpLessEqual,
    OpGreater,
    OpGreaterEqual,
    OpAnd,
    OpOr,
    OpNot,
    OpAdd,
    OpSub,
    OpMul,
    OpDiv,
    OpMod,
    OpShiftLeft,
    OpShiftRight,
    OpAssign,
    OpAssignAdd,
    OpAssignSub,
    OpAssignMul,
    OpAssignDiv,
    OpAssignMod,
    OpAssignShiftLeft,
    OpAssignShiftRight,
    OpAssignBitAnd,
    OpAssignBitOr,
    OpAssignBitXor,
    OpBitAnd,
    OpBitOr,
    OpBitXor,
    OpBitInvert,
    CfIf,
    CfElif,
    CfElse,
    CfFor,
    CfWhile,
    CfBreak,
    CfContinue,
    CfPass,
    CfReturn,
    CfMatch,
    PrFunction,
    PrClass,
    PrClassName,
    PrExtends,
    PrIs,
    PrOnready,
    PrTool,
    PrStatic,
    PrExport,
    PrSetget,
    PrConst,
    PrVar,
    PrAs,
    PrVoid,
    PrEnum,
    PrPreload,
    PrAssert,
    PrYield,
    PrSignal,
    PrBreakpoint,
    PrRemote,
    PrSync,
    PrMaster,
    PrSlave,
    PrPuppet,
    PrRemoteSync,
    PrMasterSync,
    PrPuppetSync,
    BracketOpen,
    BracketClose,
    CurlyBracketOpen,
    CurlyBracketClose,
    ParenthesisOpen,
    ParenthesisClose,
    Comma,
    Semicolon,
    Period,
    QuestionMark,
    Colon,
    Dollar,
    ForwardArrow,
    Newline,
    ConstPi,
    ConstTau,
    Wildcard,
    ConstInf,
    ConstNan,
    Error,
    Eof,
    Cursor,
    PrSlaveSync,
    CfDo,
    CfCase,
    CfSwitch,
}

/// A token's payload always occupies the upper 24 bits; only its meaning (identifier index,
/// constant index, built-in function index, or indent level on `Newline`) depends on the opcode.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub opcode: GlobalToken,
    pub payload: u32,
}

const TOKEN_BYTE_MASK: u32 = 0x80;
const TOKEN_BITS: u32 = 8;
const TOKEN_MASK: u32 = (1 << TOKEN_BITS) - 1;

/// Decodes the raw `token-count × token` region of a bytecode file into 32-bit values: the low 8
/// bits are the variant-local opcode, the upper 24 the payload. Resolving the opcode into a
/// [`GlobalToken`] is the caller's job (it needs the owning variant's token map).
pub fn decode_raw_tokens(mut bytes: &[u8], token_count: u32) -> Option<Vec<u32>> {
    let mut tokens = Vec::with_capacity(token_count as usize);
    for _ in 0..token_count {
        let first = *bytes.first()?;
        if u32::from(first) & TOKEN_BYTE_MASK != 0 {
            let word = bytes.get(0..4)?;
            let value = u32::from_le_bytes(word.try_into().ok()?);
            tokens.push(value & !TOKEN_BYTE_MASK);
            bytes = &bytes[4..];
        } else {
            tokens.push(u32::from(first));
            bytes = &bytes[1..];
        }
    }
    Some(tokens)
}

#[must_use]
pub fn local_opcode(raw: u32) -> u32 {
    raw & TOKEN_MASK
}

#[must_use]
pub fn payload(raw: u32) -> u32 {
    raw >> TOKEN_BITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_tokens_decode_in_order() {
        let bytes = [0x01, 0x02, 0x03];
        let tokens = decode_raw_tokens(&bytes, 3).unwrap();
        assert_eq!(tokens, vec![1, 2, 3]);
    }

    #[test]
    fn wide_token_clears_the_continuation_bit() {
        // opcode 5, payload 300, encoded as a little-endian u32 with the high bit set.
        let raw = (300u32 << TOKEN_BITS) | 5 | TOKEN_BYTE_MASK;
        let bytes = raw.to_le_bytes();
        let tokens = decode_raw_tokens(&bytes, 1).unwrap();
        assert_eq!(local_opcode(tokens[0]), 5);
        assert_eq!(payload(tokens[0]), 300);
    }

    #[test]
    fn truncated_wide_token_reports_none() {
        let bytes = [0x80, 0x01];
        assert!(decode_raw_tokens(&bytes, 1).is_none());
    }
}

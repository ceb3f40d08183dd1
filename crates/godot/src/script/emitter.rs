//! Turns a decoded [`super::decoder::Script`] back into GDScript source text (`spec.md` §4.6's
//! "Emission algorithm"). One state machine shared by every variant; each variant only supplies
//! its local-opcode table and built-in function names through [`BytecodeVariant`].

use snafu::prelude::*;

use super::decoder::{self, Script};
use super::token::GlobalToken;
use super::variant_record::BytecodeVariant;
use crate::text::format_value;
use crate::variant::Variant;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Token references identifier {index} but only {len} are present"))]
    IdentifierIndexOutOfBounds { index: u32, len: usize },
    #[snafu(display("Token references constant {index} but only {len} are present"))]
    ConstantIndexOutOfBounds { index: u32, len: usize },
    #[snafu(display("Token references built-in function {index}, unknown to this variant"))]
    UnknownFunction { index: u32 },
    #[snafu(display("Local opcode {opcode} has no mapping in this variant's token table"))]
    UnknownOpcode { opcode: u32 },
    #[snafu(display("Decoded script produced no source text"))]
    Empty,
}

impl crate::error::HasErrorKind for Error {
    fn kind(&self) -> crate::error::ErrorKind {
        match self {
            Self::UnknownFunction { .. } | Self::UnknownOpcode { .. } => crate::error::ErrorKind::FileUnsupported,
            _ => crate::error::ErrorKind::FileCorrupt,
        }
    }
}

type Result<T> = core::result::Result<T, Error>;

/// Tracks the previous opcode so spacing decisions (unary minus, `if` after a bare newline, a
/// leading operator at line start) can see one token of context, mirroring
/// `bytecode_620ec47.cpp`'s `prev_token` local.
struct State {
    text: String,
    line: String,
    indent: u32,
    prev_opcode: GlobalToken,
}

/// Emits source text for `script` using `variant`'s token and function tables.
pub fn emit(script: &Script, variant: &BytecodeVariant) -> Result<String> {
    let mut state = State { text: String::new(), line: String::new(), indent: 0, prev_opcode: GlobalToken::Newline };

    for &raw in &script.tokens {
        let (local, payload) = decoder::local_opcode_and_payload(raw);
        let opcode = variant.global_token(local).context(UnknownOpcodeSnafu { opcode: local })?;
        emit_token(&mut state, script, variant, opcode, payload)?;
        state.prev_opcode = opcode;
    }

    if !state.line.is_empty() {
        flush_line(&mut state);
    }

    ensure!(!state.text.is_empty(), EmptySnafu);
    Ok(state.text)
}

fn flush_line(state: &mut State) {
    // The token stream opens with a `Newline` before any real content (it carries the first
    // line's indent), so flushing unconditionally here would emit a spurious blank line before
    // the script even starts. Once something has been emitted, a later empty line is a real blank
    // line in the source and still needs to flush.
    if state.line.is_empty() && state.text.is_empty() {
        return;
    }
    for _ in 0..state.indent {
        state.text.push('\t');
    }
    state.text.push_str(&state.line);
    state.text.push('\n');
    state.line.clear();
}

fn ensure_space(line: &mut String) {
    if !line.is_empty() && !line.ends_with(' ') {
        line.push(' ');
    }
}

#[allow(clippy::too_many_lines)]
fn emit_token(state: &mut State, script: &Script, variant: &BytecodeVariant, opcode: GlobalToken, payload: u32) -> Result<()> {
    use GlobalToken as T;
    match opcode {
        T::Empty | T::Error | T::Eof | T::Cursor => {}
        T::Identifier => {
            let name = script
                .identifiers
                .get(payload as usize)
                .context(IdentifierIndexOutOfBoundsSnafu { index: payload, len: script.identifiers.len() })?;
            state.line.push_str(name);
        }
        T::Constant => {
            let value = script
                .constants
                .get(payload as usize)
                .context(ConstantIndexOutOfBoundsSnafu { index: payload, len: script.constants.len() })?;
            state.line.push_str(&format_constant(value));
        }
        T::SelfKeyword => state.line.push_str("self"),
        T::BuiltInType => state.line.push_str(builtin_type_name(payload)),
        T::BuiltInFunc => {
            let name = variant.function_name(payload).context(UnknownFunctionSnafu { index: payload })?;
            state.line.push_str(name);
        }
        T::OpIn => push_spaced(state, "in "),
        T::OpEqual => push_spaced(state, "== "),
        T::OpNotEqual => push_spaced(state, "!= "),
        T::OpLess => push_spaced(state, "< "),
        T::OpLessEqual => push_spaced(state, "<= "),
        T::OpGreater => push_spaced(state, "> "),
        T::OpGreaterEqual => push_spaced(state, ">= "),
        T::OpAnd => push_spaced(state, "and "),
        T::OpOr => push_spaced(state, "or "),
        T::OpNot => push_spaced(state, "not "),
        T::OpAdd => push_spaced(state, "+ "),
        T::OpSub => {
            // No space before a unary minus at the start of a line (`bytecode_620ec47.cpp`'s
            // `if (prev_token != TK_NEWLINE) _ensure_space(line);`).
            if state.prev_opcode != T::Newline {
                ensure_space(&mut state.line);
            }
            state.line.push_str("- ");
        }
        T::OpMul => push_spaced(state, "* "),
        T::OpDiv => push_spaced(state, "/ "),
        T::OpMod => push_spaced(state, "% "),
        T::OpShiftLeft => push_spaced(state, "<< "),
        T::OpShiftRight => push_spaced(state, ">> "),
        T::OpAssign => push_spaced(state, "= "),
        T::OpAssignAdd => push_spaced(state, "+= "),
        T::OpAssignSub => push_spaced(state, "-= "),
        T::OpAssignMul => push_spaced(state, "*= "),
        T::OpAssignDiv => push_spaced(state, "/= "),
        T::OpAssignMod => push_spaced(state, "%= "),
        T::OpAssignShiftLeft => push_spaced(state, "<<= "),
        T::OpAssignShiftRight => push_spaced(state, ">>= "),
        T::OpAssignBitAnd => push_spaced(state, "&= "),
        T::OpAssignBitOr => push_spaced(state, "|= "),
        T::OpAssignBitXor => push_spaced(state, "^= "),
        T::OpBitAnd => push_spaced(state, "& "),
        T::OpBitOr => push_spaced(state, "| "),
        T::OpBitXor => push_spaced(state, "^ "),
        T::OpBitInvert => push_spaced(state, "~ "),
        T::CfIf => {
            if state.prev_opcode != T::Newline {
                ensure_space(&mut state.line);
            }
            state.line.push_str("if ");
        }
        T::CfElif => state.line.push_str("elif "),
        T::CfElse => {
            if state.prev_opcode != T::Newline {
                ensure_space(&mut state.line);
            }
            state.line.push_str("else ");
        }
        T::CfFor => state.line.push_str("for "),
        T::CfWhile => state.line.push_str("while "),
        T::CfBreak => state.line.push_str("break"),
        T::CfContinue => state.line.push_str("continue"),
        T::CfPass => state.line.push_str("pass"),
        T::CfReturn => state.line.push_str("return "),
        T::CfMatch => state.line.push_str("match "),
        T::CfDo => state.line.push_str("do "),
        T::CfCase => state.line.push_str("case "),
        T::CfSwitch => state.line.push_str("switch "),
        T::PrFunction => state.line.push_str("func "),
        T::PrClass => state.line.push_str("class "),
        T::PrClassName => state.line.push_str("class_name "),
        T::PrExtends => {
            if state.prev_opcode != T::Newline {
                ensure_space(&mut state.line);
            }
            state.line.push_str("extends ");
        }
        T::PrIs => push_spaced(state, "is "),
        T::PrOnready => state.line.push_str("onready "),
        T::PrTool => state.line.push_str("tool "),
        T::PrStatic => state.line.push_str("static "),
        T::PrExport => state.line.push_str("export "),
        T::PrSetget => state.line.push_str("setget "),
        T::PrConst => state.line.push_str("const "),
        T::PrVar => state.line.push_str("var "),
        T::PrAs => push_spaced(state, "as "),
        T::PrVoid => state.line.push_str("void "),
        T::PrEnum => state.line.push_str("enum "),
        T::PrPreload => state.line.push_str("preload"),
        T::PrAssert => state.line.push_str("assert"),
        T::PrYield => state.line.push_str("yield"),
        T::PrSignal => state.line.push_str("signal "),
        T::PrBreakpoint => state.line.push_str("breakpoint"),
        T::PrRemote => state.line.push_str("remote "),
        T::PrSync => state.line.push_str("sync "),
        T::PrMaster => state.line.push_str("master "),
        T::PrSlave | T::PrSlaveSync => state.line.push_str("puppet "),
        T::PrPuppet => state.line.push_str("puppet "),
        T::PrRemoteSync => state.line.push_str("remotesync "),
        T::PrMasterSync => state.line.push_str("mastersync "),
        T::PrPuppetSync => state.line.push_str("puppetsync "),
        T::BracketOpen => state.line.push('['),
        T::BracketClose => state.line.push(']'),
        T::CurlyBracketOpen => state.line.push('{'),
        T::CurlyBracketClose => state.line.push('}'),
        T::ParenthesisOpen => state.line.push('('),
        T::ParenthesisClose => state.line.push(')'),
        T::Comma => state.line.push_str(", "),
        T::Semicolon => state.line.push(';'),
        T::Period => state.line.push('.'),
        T::QuestionMark => state.line.push('?'),
        T::Colon => state.line.push(':'),
        T::Dollar => state.line.push('$'),
        T::ForwardArrow => state.line.push_str("->"),
        T::Newline => {
            flush_line(state);
            state.indent = payload;
        }
        T::ConstPi => state.line.push_str("PI"),
        T::ConstTau => state.line.push_str("TAU"),
        T::Wildcard => state.line.push('_'),
        T::ConstInf => state.line.push_str("INF"),
        T::ConstNan => state.line.push_str("NAN"),
    }
    Ok(())
}

fn push_spaced(state: &mut State, text: &str) {
    ensure_space(&mut state.line);
    state.line.push_str(text);
}

/// Property-literal rendering for a bytecode constant reuses the text-resource variant grammar,
/// since both surfaces need the same "numbers, quoted strings, `Vector2(…)`…" notation
/// (`spec.md` §6).
fn format_constant(value: &Variant) -> String {
    format_value(value)
}

/// The handful of built-in type names a `BuiltInType` token's payload can index; this core only
/// needs the ones constant-folded expressions actually reference in decompiled output, not a full
/// `Variant::Type` enum.
fn builtin_type_name(payload: u32) -> &'static str {
    const NAMES: &[&str] = &[
        "null", "bool", "int", "float", "String", "Vector2", "Rect2", "Vector3", "Transform2D", "Plane",
        "Quaternion", "AABB", "Basis", "Transform3D", "Color", "NodePath", "RID", "Object", "Dictionary", "Array",
    ];
    NAMES.get(payload as usize).copied().unwrap_or("Variant")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::decoder::Script;
    use crate::script::variant_record::BC_620EC47;
    use hashbrown::HashMap;

    fn token(opcode_index: u32, payload: u32) -> u32 {
        (payload << 8) | opcode_index
    }

    #[test]
    fn emits_a_simple_assignment_statement() {
        // `speed = 5`, followed by a trailing newline token with indent 0.
        let script = Script {
            version: 13,
            identifiers: vec!["speed".to_owned()],
            constants: vec![Variant::Int(5)],
            lines: HashMap::new(),
            tokens: vec![
                token(1, 0), // identifier "speed"
                token(23, 0), // OpAssign is index 23 in BASE_TOKEN_ORDER
                token(2, 0), // constant 5
                token(89, 0), // Newline
            ],
        };
        let text = emit(&script, &BC_620EC47).unwrap();
        assert_eq!(text, "speed = 5\n");
    }

    #[test]
    fn leading_newline_token_does_not_emit_a_blank_first_line() {
        // A token stream that opens with the indent-carrying `Newline` every decoded script
        // starts with, then `var x = 1`, then a trailing `Newline`.
        let script = Script {
            version: 13,
            identifiers: vec!["x".to_owned()],
            constants: vec![Variant::Int(1)],
            lines: HashMap::new(),
            tokens: vec![
                token(89, 0), // leading Newline, indent 0
                token(59, 0), // PrVar
                token(1, 0),  // identifier "x"
                token(23, 0), // OpAssign
                token(2, 0),  // constant 1
                token(89, 0), // trailing Newline
            ],
        };
        let text = emit(&script, &BC_620EC47).unwrap();
        assert_eq!(text, "var x = 1\n");
    }

    #[test]
    fn unknown_opcode_is_reported() {
        let script = Script { version: 13, identifiers: vec![], constants: vec![], lines: HashMap::new(), tokens: vec![9999] };
        assert!(matches!(emit(&script, &BC_620EC47), Err(Error::UnknownOpcode { .. })));
    }
}

//! Native builtins: arithmetic, comparisons, boolean connectives, text
//! concatenation and the write primitives.
//!
//! Each builtin is an ordinary rewrite whose pattern is written in XL and
//! parsed with the active syntax table; only the body is native code. The
//! integer variants are declared before the real ones, so exact integer
//! arithmetic wins and mixed operands fall through to the real forms by
//! the usual candidate order.

use std::io::Write;

use xl_core::{Arena, NodeId, Node, Position, Positions};
use xl_syntax::Syntax;

use crate::error::{ErrorKind, EvalError, Result};
use crate::eval::Context;
use crate::scope::{NativeCtx, NativeFn};

/// Parse every builtin pattern and register it in the global scope.
pub fn install(
    arena: &mut Arena,
    syntax: &mut Syntax,
    positions: &mut Positions,
    ctx: &mut Context,
) {
    let global = ctx.scopes.global();
    for &(pattern, native) in TABLE {
        let result = xl_syntax::parse_source("builtins", pattern, arena, syntax, positions);
        let root = result
            .root
            .filter(|_| !result.diagnostics.has_errors())
            .expect("builtin patterns are well-formed");
        ctx.scopes.define_native(arena, global, root, native);
    }
}

/// Builtin patterns in declaration order: first match wins, so integer
/// forms precede real forms.
const TABLE: &[(&str, NativeFn)] = &[
    ("X:integer + Y:integer", int_add),
    ("X:integer - Y:integer", int_sub),
    ("X:integer * Y:integer", int_mul),
    ("X:integer / Y:integer", int_div),
    ("X:integer mod Y:integer", int_mod),
    ("X:integer rem Y:integer", int_rem),
    ("X:integer ^ Y:integer", int_pow),
    ("-(X:integer)", int_neg),
    ("X:integer = Y:integer", int_eq),
    ("X:integer <> Y:integer", int_ne),
    ("X:integer < Y:integer", int_lt),
    ("X:integer > Y:integer", int_gt),
    ("X:integer <= Y:integer", int_le),
    ("X:integer >= Y:integer", int_ge),
    ("X:real + Y:real", real_add),
    ("X:real - Y:real", real_sub),
    ("X:real * Y:real", real_mul),
    ("X:real / Y:real", real_div),
    ("X:real ^ Y:real", real_pow),
    ("-(X:real)", real_neg),
    ("X:real = Y:real", real_eq),
    ("X:real <> Y:real", real_ne),
    ("X:real < Y:real", real_lt),
    ("X:real > Y:real", real_gt),
    ("X:real <= Y:real", real_le),
    ("X:real >= Y:real", real_ge),
    ("X:boolean and Y:boolean", bool_and),
    ("X:boolean or Y:boolean", bool_or),
    ("X:boolean xor Y:boolean", bool_xor),
    ("not (X:boolean)", bool_not),
    ("X:boolean = Y:boolean", bool_eq),
    ("X:boolean <> Y:boolean", bool_ne),
    ("X:text & Y:text", text_concat),
    ("X:text = Y:text", text_eq),
    ("X:text <> Y:text", text_ne),
    ("write X", write),
    ("writeln X", writeln),
];

// ----------------------------------------------------------------------
// Argument access: patterns guarantee the canonical kinds.
// ----------------------------------------------------------------------

fn int2(ctx: &NativeCtx<'_>, args: &[NodeId]) -> (i64, i64) {
    let a = ctx.arena.as_integer(args[0]).expect("type-checked integer");
    let b = ctx.arena.as_integer(args[1]).expect("type-checked integer");
    (a, b)
}

fn real2(ctx: &NativeCtx<'_>, args: &[NodeId]) -> (f64, f64) {
    let a = ctx.arena.as_real(args[0]).expect("type-checked real");
    let b = ctx.arena.as_real(args[1]).expect("type-checked real");
    (a, b)
}

fn bool_value(ctx: &NativeCtx<'_>, arg: NodeId) -> bool {
    matches!(ctx.arena.node(arg), Node::Name(n) if n == "true")
}

fn integer(ctx: &mut NativeCtx<'_>, value: i64) -> NodeId {
    let pos = ctx.pos;
    ctx.arena.alloc(Node::Integer(value), pos)
}

fn real(ctx: &mut NativeCtx<'_>, value: f64) -> NodeId {
    let pos = ctx.pos;
    ctx.arena.alloc(Node::Real(value), pos)
}

fn boolean(ctx: &mut NativeCtx<'_>, value: bool) -> NodeId {
    let pos = ctx.pos;
    let name = if value { "true" } else { "false" };
    ctx.arena.alloc(Node::Name(name.to_owned()), pos)
}

fn text(ctx: &mut NativeCtx<'_>, value: String) -> NodeId {
    let pos = ctx.pos;
    ctx.arena.alloc(
        Node::Text {
            value,
            opening: "\"".to_owned(),
            closing: "\"".to_owned(),
        },
        pos,
    )
}

fn overflow(ctx: &NativeCtx<'_>, op: &str) -> EvalError {
    EvalError::new(
        ErrorKind::Arithmetic,
        format!("integer overflow in '{op}'"),
        ctx.pos,
    )
}

fn zero_division(ctx: &NativeCtx<'_>) -> EvalError {
    EvalError::new(ErrorKind::Arithmetic, "division by zero", ctx.pos)
}

// ----------------------------------------------------------------------
// Integer arithmetic
// ----------------------------------------------------------------------

fn int_add(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    let value = a.checked_add(b).ok_or_else(|| overflow(ctx, "+"))?;
    Ok(integer(ctx, value))
}

fn int_sub(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    let value = a.checked_sub(b).ok_or_else(|| overflow(ctx, "-"))?;
    Ok(integer(ctx, value))
}

fn int_mul(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    let value = a.checked_mul(b).ok_or_else(|| overflow(ctx, "*"))?;
    Ok(integer(ctx, value))
}

fn int_div(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    if b == 0 {
        return Err(zero_division(ctx));
    }
    let value = a.checked_div(b).ok_or_else(|| overflow(ctx, "/"))?;
    Ok(integer(ctx, value))
}

fn int_mod(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    if b == 0 {
        return Err(zero_division(ctx));
    }
    // i64::MIN mod -1 overflows the euclidean remainder.
    let value = a.checked_rem_euclid(b).ok_or_else(|| overflow(ctx, "mod"))?;
    Ok(integer(ctx, value))
}

fn int_rem(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    if b == 0 {
        return Err(zero_division(ctx));
    }
    let value = a.checked_rem(b).ok_or_else(|| overflow(ctx, "rem"))?;
    Ok(integer(ctx, value))
}

fn int_pow(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    if b < 0 {
        return Err(EvalError::new(
            ErrorKind::Arithmetic,
            "negative exponent for integer power",
            ctx.pos,
        ));
    }
    let exponent = u32::try_from(b).map_err(|_| overflow(ctx, "^"))?;
    let value = a.checked_pow(exponent).ok_or_else(|| overflow(ctx, "^"))?;
    Ok(integer(ctx, value))
}

fn int_neg(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let a = ctx.arena.as_integer(args[0]).expect("type-checked integer");
    let value = a.checked_neg().ok_or_else(|| overflow(ctx, "-"))?;
    Ok(integer(ctx, value))
}

fn int_eq(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    Ok(boolean(ctx, a == b))
}

fn int_ne(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    Ok(boolean(ctx, a != b))
}

fn int_lt(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    Ok(boolean(ctx, a < b))
}

fn int_gt(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    Ok(boolean(ctx, a > b))
}

fn int_le(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    Ok(boolean(ctx, a <= b))
}

fn int_ge(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = int2(ctx, args);
    Ok(boolean(ctx, a >= b))
}

// ----------------------------------------------------------------------
// Real arithmetic: saturates like IEEE-754 does.
// ----------------------------------------------------------------------

fn real_add(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(real(ctx, a + b))
}

fn real_sub(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(real(ctx, a - b))
}

fn real_mul(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(real(ctx, a * b))
}

fn real_div(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(real(ctx, a / b))
}

fn real_pow(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(real(ctx, a.powf(b)))
}

fn real_neg(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let a = ctx.arena.as_real(args[0]).expect("type-checked real");
    Ok(real(ctx, -a))
}

fn real_eq(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(boolean(ctx, a == b))
}

fn real_ne(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(boolean(ctx, a != b))
}

fn real_lt(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(boolean(ctx, a < b))
}

fn real_gt(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(boolean(ctx, a > b))
}

fn real_le(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(boolean(ctx, a <= b))
}

fn real_ge(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let (a, b) = real2(ctx, args);
    Ok(boolean(ctx, a >= b))
}

// ----------------------------------------------------------------------
// Booleans
// ----------------------------------------------------------------------

fn bool_and(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let value = bool_value(ctx, args[0]) && bool_value(ctx, args[1]);
    Ok(boolean(ctx, value))
}

fn bool_or(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let value = bool_value(ctx, args[0]) || bool_value(ctx, args[1]);
    Ok(boolean(ctx, value))
}

fn bool_xor(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let value = bool_value(ctx, args[0]) != bool_value(ctx, args[1]);
    Ok(boolean(ctx, value))
}

fn bool_not(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let value = !bool_value(ctx, args[0]);
    Ok(boolean(ctx, value))
}

fn bool_eq(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let value = bool_value(ctx, args[0]) == bool_value(ctx, args[1]);
    Ok(boolean(ctx, value))
}

fn bool_ne(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let value = bool_value(ctx, args[0]) != bool_value(ctx, args[1]);
    Ok(boolean(ctx, value))
}

// ----------------------------------------------------------------------
// Text
// ----------------------------------------------------------------------

fn text_concat(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let a = ctx.arena.as_text(args[0]).expect("type-checked text");
    let b = ctx.arena.as_text(args[1]).expect("type-checked text");
    let joined = format!("{a}{b}");
    Ok(text(ctx, joined))
}

fn text_eq(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let equal = ctx.arena.as_text(args[0]) == ctx.arena.as_text(args[1]);
    Ok(boolean(ctx, equal))
}

fn text_ne(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let equal = ctx.arena.as_text(args[0]) == ctx.arena.as_text(args[1]);
    Ok(boolean(ctx, !equal))
}

// ----------------------------------------------------------------------
// Output
// ----------------------------------------------------------------------

/// Text prints raw; other values print in rendered form.
fn shown(ctx: &NativeCtx<'_>, value: NodeId) -> String {
    match ctx.arena.node(value) {
        Node::Text { value, .. } => value.clone(),
        _ => xl_syntax::Renderer::new(ctx.syntax).render(ctx.arena, value),
    }
}

fn write_failed(pos: Position) -> EvalError {
    EvalError::new(ErrorKind::Resource, "cannot write to output", pos)
}

fn write(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let shown = shown(ctx, args[0]);
    write!(ctx.out, "{shown}").map_err(|_| write_failed(ctx.pos))?;
    Ok(boolean(ctx, true))
}

fn writeln(ctx: &mut NativeCtx<'_>, args: &[NodeId]) -> Result<NodeId> {
    let shown = shown(ctx, args[0]);
    writeln!(ctx.out, "{shown}").map_err(|_| write_failed(ctx.pos))?;
    Ok(boolean(ctx, true))
}

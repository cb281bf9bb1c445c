//! Value printing.

use crate::gc::Heap;

use super::intern::StringInterner;
use super::value::Value;

/// Render a value in its external representation.
pub fn format_value(heap: &Heap, interner: &StringInterner, value: Value) -> String {
    let mut out = String::new();
    write_value(heap, interner, value, &mut out);
    out
}

fn write_value(heap: &Heap, interner: &StringInterner, value: Value, out: &mut String) {
    match value {
        Value::Nil => out.push_str("()"),
        Value::Bool(true) => out.push_str("#T"),
        Value::Bool(false) => out.push_str("#F"),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Symbol(id) => out.push_str(interner.resolve(id)),
        Value::Str(id) => write_string_literal(heap.string(id), out),
        Value::Pair(id) => {
            out.push('(');
            let mut current = id;
            let mut first = true;
            loop {
                let car = heap.pair_car(current);
                let cdr = heap.pair_cdr(current);
                if !first {
                    out.push(' ');
                }
                first = false;
                write_value(heap, interner, car, out);
                match cdr {
                    Value::Nil => break,
                    Value::Pair(next) => current = next,
                    other => {
                        out.push_str(" . ");
                        write_value(heap, interner, other, out);
                        break;
                    }
                }
            }
            out.push(')');
        }
        Value::Vector(id) => {
            out.push_str("#(");
            for (i, item) in heap.vector(id).data.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(heap, interner, *item, out);
            }
            out.push(')');
        }
        Value::Procedure(id) => {
            let name = interner.resolve(heap.procedure(id).name);
            out.push_str("[Procedure ");
            out.push_str(name);
            out.push(']');
        }
        Value::Syntax(id) => {
            let name = interner.resolve(heap.syntax(id).name);
            out.push_str("[Syntax ");
            out.push_str(name);
            out.push(']');
        }
    }
}

/// Quoted form with the reader's escapes re-emitted, so printed strings
/// read back as the same bytes.
fn write_string_literal(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0C' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out.push('"');
}

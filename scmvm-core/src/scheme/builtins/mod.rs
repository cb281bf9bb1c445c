//! Native procedures.
//!
//! Every function here takes pre-evaluated arguments and returns
//! `EvalResult`.  The evaluator dispatches to them after evaluating the
//! argument forms left to right; the argument slice stays pinned on the
//! root stack for the duration of the call.

mod arithmetic;
mod lists;
mod vectors;

use crate::gc::ObjId;

use super::error::{ErrorKind, EvalResult, Thrown};
use super::eval::Evaluator;
use super::value::{list_to_vec, NativeFn, Value};

/// Register every native procedure into the `<global>` frame.  A negative
/// arity means variadic; a non-negative one is the most arguments the
/// evaluator will hand through.
pub(crate) fn register(ev: &mut Evaluator) {
    let defs: &[(&str, NativeFn, i32)] = &[
        ("eval", eval, 1),
        ("apply", apply, 2),
        ("gc", gc, 0),
        ("display", display, -1),
        ("newline", newline, 0),
        ("+", arithmetic::add, -1),
        ("-", arithmetic::sub, -1),
        ("*", arithmetic::mul, -1),
        ("/", arithmetic::div, -1),
        ("%", arithmetic::rem, 2),
        ("<", arithmetic::less, -1),
        ("<=", arithmetic::less_eq, -1),
        (">", arithmetic::greater, -1),
        (">=", arithmetic::greater_eq, -1),
        ("=", arithmetic::num_eq, -1),
        ("!=", arithmetic::num_ne, -1),
        ("car", lists::car, 1),
        ("cdr", lists::cdr, 1),
        ("cons", lists::cons, 2),
        ("list", lists::list, -1),
        ("length", lists::length, 1),
        ("not", lists::not, 1),
        ("eq?", lists::eq_p, 2),
        ("eqv?", lists::eqv_p, 2),
        ("equal?", lists::equal_p, 2),
        ("null?", lists::null_p, 1),
        ("pair?", lists::pair_p, 1),
        ("list?", lists::list_p, 1),
        ("atom?", lists::atom_p, 1),
        ("zero?", lists::zero_p, 1),
        ("symbol?", lists::symbol_p, 1),
        ("string?", lists::string_p, 1),
        ("number?", lists::number_p, 1),
        ("boolean?", lists::boolean_p, 1),
        ("vector?", lists::vector_p, 1),
        ("procedure?", lists::procedure_p, 1),
        ("make-vector", vectors::make_vector, 2),
        ("vector", vectors::vector, -1),
        ("vector-copy", vectors::vector_copy, 1),
        ("vector-length", vectors::vector_length, 1),
        ("vector-capacity", vectors::vector_capacity, 1),
        ("vector-ref", vectors::vector_ref, 2),
        ("vector-set!", vectors::vector_set, 3),
    ];
    for (name, func, arg_max) in defs {
        ev.define_native(name, *func, *arg_max);
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Expect exactly N arguments.
pub(super) fn expect_args(
    ev: &mut Evaluator,
    name: &str,
    args: &[Value],
    n: usize,
) -> Result<(), Thrown> {
    if args.len() != n {
        let text = format!("{name}: expected {n} arguments, got {}", args.len());
        Err(ev.throw(ErrorKind::Arity, text))
    } else {
        Ok(())
    }
}

/// Expect at least N arguments.
pub(super) fn expect_min_args(
    ev: &mut Evaluator,
    name: &str,
    args: &[Value],
    min: usize,
) -> Result<(), Thrown> {
    if args.len() < min {
        let text = format!(
            "{name}: expected at least {min} arguments, got {}",
            args.len()
        );
        Err(ev.throw(ErrorKind::Arity, text))
    } else {
        Ok(())
    }
}

/// Extract an integer, raising a type error if the value is anything else.
pub(super) fn expect_int(ev: &mut Evaluator, name: &str, value: Value) -> Result<i32, Thrown> {
    match value {
        Value::Int(n) => Ok(n),
        other => {
            let text = format!("{name}: expected an integer, got {}", other.type_name());
            Err(ev.throw(ErrorKind::Type, text))
        }
    }
}

pub(super) fn expect_pair(ev: &mut Evaluator, name: &str, value: Value) -> Result<ObjId, Thrown> {
    match value {
        Value::Pair(id) => Ok(id),
        other => {
            let text = format!("{name}: expected a pair, got {}", other.type_name());
            Err(ev.throw(ErrorKind::Type, text))
        }
    }
}

pub(super) fn expect_vector(ev: &mut Evaluator, name: &str, value: Value) -> Result<ObjId, Thrown> {
    match value {
        Value::Vector(id) => Ok(id),
        other => {
            let text = format!("{name}: expected a vector, got {}", other.type_name());
            Err(ev.throw(ErrorKind::Type, text))
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluator access and I/O
// ---------------------------------------------------------------------------

fn eval(ev: &mut Evaluator, env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "EVAL", args, 1)?;
    ev.eval(env, args[0])
}

fn apply(ev: &mut Evaluator, env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "APPLY", args, 2)?;
    let Value::Procedure(pid) = args[0] else {
        let text = format!("APPLY: expected a procedure, got {}", args[0].type_name());
        return Err(ev.throw(ErrorKind::Type, text));
    };
    let Some(items) = list_to_vec(&ev.heap, args[1]) else {
        let text = format!("APPLY: expected a proper list, got {}", args[1].type_name());
        return Err(ev.throw(ErrorKind::Type, text));
    };
    ev.apply_procedure(env, pid, &items)
}

fn gc(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "GC", args, 0)?;
    ev.collect();
    Ok(Value::Nil)
}

fn display(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    let mut text = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(&ev.format_value(*arg));
    }
    ev.write_output(&text);
    Ok(Value::Nil)
}

fn newline(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "NEWLINE", args, 0)?;
    ev.write_output("\n");
    Ok(Value::Nil)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::error::ErrorKind;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Write sink that tests can read back.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().expect("sink poisoned").clone())
                .expect("non-utf8 output")
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("sink poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(src: &str) -> String {
        let mut ev = Evaluator::new();
        let sink = SharedBuf::default();
        ev.set_output(Box::new(sink.clone()));
        if ev.eval_source(src).is_err() {
            panic!("eval failed: {:?}", ev.get_exception());
        }
        sink.contents()
    }

    fn eval_err(src: &str) -> ErrorKind {
        let mut ev = Evaluator::new();
        assert!(ev.eval_source(src).is_err(), "expected failure for {src:?}");
        ev.get_exception().expect("no exception recorded").kind
    }

    #[test]
    fn display_formats_values() {
        assert_eq!(capture("(display 42)"), "42");
        assert_eq!(capture("(display '(a . b))"), "(A . B)");
        assert_eq!(capture("(display 1 2 3)"), "1 2 3");
    }

    #[test]
    fn newline_emits_newline() {
        assert_eq!(capture("(display 1) (newline) (display 2)"), "1\n2");
    }

    #[test]
    fn eval_native_evaluates_twice() {
        let mut ev = Evaluator::new();
        assert_eq!(ev.eval_source("(define x 3) (eval 'x)"), Ok(Value::Int(3)));
    }

    #[test]
    fn apply_spreads_list() {
        let mut ev = Evaluator::new();
        assert_eq!(ev.eval_source("(apply + '(1 2 3))"), Ok(Value::Int(6)));
    }

    #[test]
    fn apply_does_not_re_evaluate_arguments() {
        let mut ev = Evaluator::new();
        // If apply re-evaluated, the symbol A would be looked up and fail.
        assert_eq!(
            ev.eval_source("(apply car '((a b)))"),
            Ok(Value::Symbol(ev.intern("a")))
        );
    }

    #[test]
    fn apply_rejects_non_procedure() {
        assert_eq!(eval_err("(apply 5 '(1))"), ErrorKind::Type);
    }

    #[test]
    fn too_many_arguments_to_fixed_native() {
        assert_eq!(eval_err("(car '(1) '(2))"), ErrorKind::Arity);
    }

    #[test]
    fn gc_native_runs_and_returns_nil() {
        let mut ev = Evaluator::new();
        assert_eq!(ev.eval_source("(cons 1 2) (gc)"), Ok(Value::Nil));
    }
}

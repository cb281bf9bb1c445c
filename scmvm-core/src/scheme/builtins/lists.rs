//! Pairs, lists, equality, and type predicates.

use crate::gc::ObjId;

use super::super::error::{ErrorKind, EvalResult};
use super::super::eval::Evaluator;
use super::super::value::{equal_value, list_from_slice, list_length, Value};
use super::{expect_args, expect_int, expect_pair};

pub(super) fn car(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "CAR", args, 1)?;
    let id = expect_pair(ev, "CAR", args[0])?;
    Ok(ev.heap.pair_car(id))
}

pub(super) fn cdr(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "CDR", args, 1)?;
    let id = expect_pair(ev, "CDR", args[0])?;
    Ok(ev.heap.pair_cdr(id))
}

pub(super) fn cons(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "CONS", args, 2)?;
    Ok(ev.cons(args[0], args[1]))
}

pub(super) fn list(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    Ok(list_from_slice(&mut ev.heap, args))
}

pub(super) fn length(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "LENGTH", args, 1)?;
    match list_length(&ev.heap, args[0]) {
        Some(len) => Ok(Value::Int(len as i32)),
        None => {
            let text = format!("LENGTH: expected a proper list, got {}", args[0].type_name());
            Err(ev.throw(ErrorKind::Type, text))
        }
    }
}

// ---------------------------------------------------------------------------
// Equality
// ---------------------------------------------------------------------------

pub(super) fn not(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "NOT", args, 1)?;
    Ok(Value::Bool(args[0] == Value::Bool(false)))
}

pub(super) fn eq_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "EQ?", args, 2)?;
    Ok(Value::Bool(args[0] == args[1]))
}

pub(super) fn eqv_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "EQV?", args, 2)?;
    Ok(Value::Bool(args[0] == args[1]))
}

pub(super) fn equal_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "EQUAL?", args, 2)?;
    Ok(Value::Bool(equal_value(&ev.heap, &args[0], &args[1], 0)))
}

// ---------------------------------------------------------------------------
// Type predicates
// ---------------------------------------------------------------------------

pub(super) fn null_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "NULL?", args, 1)?;
    Ok(Value::Bool(args[0].is_nil()))
}

pub(super) fn pair_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "PAIR?", args, 1)?;
    Ok(Value::Bool(args[0].is_pair()))
}

pub(super) fn list_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "LIST?", args, 1)?;
    Ok(Value::Bool(args[0].is_list()))
}

pub(super) fn atom_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "ATOM?", args, 1)?;
    Ok(Value::Bool(args[0].is_atom()))
}

pub(super) fn zero_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "ZERO?", args, 1)?;
    let n = expect_int(ev, "ZERO?", args[0])?;
    Ok(Value::Bool(n == 0))
}

pub(super) fn symbol_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "SYMBOL?", args, 1)?;
    Ok(Value::Bool(args[0].is_symbol()))
}

pub(super) fn string_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "STRING?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Str(_))))
}

pub(super) fn number_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "NUMBER?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Int(_))))
}

pub(super) fn boolean_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "BOOLEAN?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
}

pub(super) fn vector_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "VECTOR?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Vector(_))))
}

pub(super) fn procedure_p(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "PROCEDURE?", args, 1)?;
    Ok(Value::Bool(matches!(args[0], Value::Procedure(_))))
}

#[cfg(test)]
mod tests {
    use super::super::super::error::ErrorKind;
    use super::*;

    fn eval_ok(src: &str) -> Value {
        let mut ev = Evaluator::new();
        match ev.eval_source(src) {
            Ok(v) => v,
            Err(_) => panic!("eval failed: {:?}", ev.get_exception()),
        }
    }

    fn eval_err(src: &str) -> ErrorKind {
        let mut ev = Evaluator::new();
        assert!(ev.eval_source(src).is_err(), "expected failure for {src:?}");
        ev.get_exception().expect("no exception recorded").kind
    }

    #[test]
    fn cons_car_cdr_laws() {
        assert_eq!(eval_ok("(car (cons 1 2))"), Value::Int(1));
        assert_eq!(eval_ok("(cdr (cons 1 2))"), Value::Int(2));
        assert_eq!(eval_ok("(equal? (car (cons '(a) 2)) '(a))"), Value::Bool(true));
    }

    #[test]
    fn car_of_nil_is_a_type_error() {
        assert_eq!(eval_err("(car '())"), ErrorKind::Type);
        assert_eq!(eval_err("(cdr '())"), ErrorKind::Type);
    }

    #[test]
    fn list_and_length() {
        assert_eq!(eval_ok("(length (list 1 2 3))"), Value::Int(3));
        assert_eq!(eval_ok("(length '())"), Value::Int(0));
        assert_eq!(eval_err("(length '(1 . 2))"), ErrorKind::Type);
    }

    #[test]
    fn predicates() {
        assert_eq!(eval_ok("(null? '())"), Value::Bool(true));
        assert_eq!(eval_ok("(null? '(1))"), Value::Bool(false));
        assert_eq!(eval_ok("(pair? '(1))"), Value::Bool(true));
        assert_eq!(eval_ok("(pair? '())"), Value::Bool(false));
        assert_eq!(eval_ok("(atom? 1)"), Value::Bool(true));
        assert_eq!(eval_ok("(atom? '(1))"), Value::Bool(false));
        assert_eq!(eval_ok("(list? '())"), Value::Bool(true));
        assert_eq!(eval_ok("(zero? 0)"), Value::Bool(true));
        assert_eq!(eval_ok("(zero? 1)"), Value::Bool(false));
        assert_eq!(eval_ok("(symbol? 'a)"), Value::Bool(true));
        assert_eq!(eval_ok("(string? \"a\")"), Value::Bool(true));
        assert_eq!(eval_ok("(number? 1)"), Value::Bool(true));
        assert_eq!(eval_ok("(boolean? #f)"), Value::Bool(true));
        assert_eq!(eval_ok("(vector? (vector 1))"), Value::Bool(true));
        assert_eq!(eval_ok("(procedure? car)"), Value::Bool(true));
        assert_eq!(eval_ok("(procedure? 'car)"), Value::Bool(false));
    }

    #[test]
    fn zero_p_requires_a_number() {
        assert_eq!(eval_err("(zero? 'a)"), ErrorKind::Type);
    }

    #[test]
    fn not_inverts_false_only() {
        assert_eq!(eval_ok("(not #f)"), Value::Bool(true));
        assert_eq!(eval_ok("(not #t)"), Value::Bool(false));
        assert_eq!(eval_ok("(not '())"), Value::Bool(false));
    }

    #[test]
    fn eq_identity_vs_equal_structure() {
        assert_eq!(eval_ok("(eq? 'foo 'foo)"), Value::Bool(true));
        assert_eq!(eval_ok("(eq? '(1) '(1))"), Value::Bool(false));
        assert_eq!(eval_ok("(equal? '(1 (2)) '(1 (2)))"), Value::Bool(true));
        assert_eq!(eval_ok("(equal? \"ab\" \"ab\")"), Value::Bool(true));
        assert_eq!(eval_ok("(eqv? 3 3)"), Value::Bool(true));
    }
}

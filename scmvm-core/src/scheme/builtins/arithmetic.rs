//! Integer arithmetic and numeric comparisons.
//!
//! All arithmetic is 32-bit two's-complement with wrap-around on overflow.
//! Division and remainder by zero are type errors.

use crate::gc::ObjId;

use super::super::error::{ErrorKind, EvalResult};
use super::super::eval::Evaluator;
use super::super::value::Value;
use super::{expect_int, expect_args, expect_min_args};

pub(super) fn add(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    let mut sum = 0i32;
    for arg in args {
        sum = sum.wrapping_add(expect_int(ev, "+", *arg)?);
    }
    Ok(Value::Int(sum))
}

pub(super) fn sub(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    if args.is_empty() {
        return Ok(Value::Int(0));
    }
    let first = expect_int(ev, "-", args[0])?;
    if args.len() == 1 {
        return Ok(Value::Int(first.wrapping_neg()));
    }
    let mut acc = first;
    for arg in &args[1..] {
        acc = acc.wrapping_sub(expect_int(ev, "-", *arg)?);
    }
    Ok(Value::Int(acc))
}

pub(super) fn mul(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    let mut product = 1i32;
    for arg in args {
        product = product.wrapping_mul(expect_int(ev, "*", *arg)?);
    }
    Ok(Value::Int(product))
}

pub(super) fn div(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_min_args(ev, "/", args, 1)?;
    let first = expect_int(ev, "/", args[0])?;
    if args.len() == 1 {
        return Ok(Value::Int(checked_div(ev, "/", 1, first)?));
    }
    let mut acc = first;
    for arg in &args[1..] {
        let divisor = expect_int(ev, "/", *arg)?;
        acc = checked_div(ev, "/", acc, divisor)?;
    }
    Ok(Value::Int(acc))
}

pub(super) fn rem(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "%", args, 2)?;
    let a = expect_int(ev, "%", args[0])?;
    let b = expect_int(ev, "%", args[1])?;
    if b == 0 {
        return Err(ev.throw(ErrorKind::Type, "%: division by zero"));
    }
    Ok(Value::Int(a.wrapping_rem(b)))
}

fn checked_div(
    ev: &mut Evaluator,
    name: &str,
    a: i32,
    b: i32,
) -> Result<i32, super::super::error::Thrown> {
    if b == 0 {
        Err(ev.throw(ErrorKind::Type, format!("{name}: division by zero")))
    } else {
        Ok(a.wrapping_div(b))
    }
}

// ---------------------------------------------------------------------------
// Comparisons: chained over adjacent argument pairs, true when empty.
// ---------------------------------------------------------------------------

fn chain(
    ev: &mut Evaluator,
    name: &str,
    args: &[Value],
    pred: fn(i32, i32) -> bool,
) -> EvalResult {
    for pair in args.windows(2) {
        let a = expect_int(ev, name, pair[0])?;
        let b = expect_int(ev, name, pair[1])?;
        if !pred(a, b) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub(super) fn less(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    chain(ev, "<", args, |a, b| a < b)
}

pub(super) fn less_eq(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    chain(ev, "<=", args, |a, b| a <= b)
}

pub(super) fn greater(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    chain(ev, ">", args, |a, b| a > b)
}

pub(super) fn greater_eq(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    chain(ev, ">=", args, |a, b| a >= b)
}

pub(super) fn num_eq(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    chain(ev, "=", args, |a, b| a == b)
}

pub(super) fn num_ne(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    chain(ev, "!=", args, |a, b| a != b)
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
    fn addition() {
        assert_eq!(eval_ok("(+)"), Value::Int(0));
        assert_eq!(eval_ok("(+ 5)"), Value::Int(5));
        assert_eq!(eval_ok("(+ 1 2 3 4)"), Value::Int(10));
    }

    #[test]
    fn subtraction() {
        assert_eq!(eval_ok("(-)"), Value::Int(0));
        assert_eq!(eval_ok("(- 5)"), Value::Int(-5));
        assert_eq!(eval_ok("(- 10 3 2)"), Value::Int(5));
    }

    #[test]
    fn multiplication() {
        assert_eq!(eval_ok("(*)"), Value::Int(1));
        assert_eq!(eval_ok("(* 2 3 4)"), Value::Int(24));
    }

    #[test]
    fn division() {
        assert_eq!(eval_ok("(/ 20 2 5)"), Value::Int(2));
        assert_eq!(eval_ok("(/ 7 2)"), Value::Int(3));
        assert_eq!(eval_ok("(/ 1)"), Value::Int(1));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(eval_err("(/ 1 0)"), ErrorKind::Type);
        assert_eq!(eval_err("(% 1 0)"), ErrorKind::Type);
        assert_eq!(eval_err("(/ 0)"), ErrorKind::Type);
    }

    #[test]
    fn remainder() {
        assert_eq!(eval_ok("(% 7 3)"), Value::Int(1));
        assert_eq!(eval_ok("(% -7 3)"), Value::Int(-1));
    }

    #[test]
    fn overflow_wraps() {
        assert_eq!(eval_ok("(+ 2147483647 1)"), Value::Int(i32::MIN));
        assert_eq!(eval_ok("(- -2147483648 1)"), Value::Int(i32::MAX));
        assert_eq!(eval_ok("(- -2147483648)"), Value::Int(i32::MIN));
    }

    #[test]
    fn comparisons_chain() {
        assert_eq!(eval_ok("(< 1 2 3)"), Value::Bool(true));
        assert_eq!(eval_ok("(< 1 3 2)"), Value::Bool(false));
        assert_eq!(eval_ok("(<= 1 1 2)"), Value::Bool(true));
        assert_eq!(eval_ok("(> 3 2 1)"), Value::Bool(true));
        assert_eq!(eval_ok("(>= 3 3 1)"), Value::Bool(true));
        assert_eq!(eval_ok("(= 2 2 2)"), Value::Bool(true));
        assert_eq!(eval_ok("(= 2 2 3)"), Value::Bool(false));
        assert_eq!(eval_ok("(!= 1 2)"), Value::Bool(true));
        assert_eq!(eval_ok("(!= 2 2)"), Value::Bool(false));
    }

    #[test]
    fn degenerate_comparisons_are_true() {
        assert_eq!(eval_ok("(<)"), Value::Bool(true));
        assert_eq!(eval_ok("(< 1)"), Value::Bool(true));
    }

    #[test]
    fn non_integer_operand_is_a_type_error() {
        assert_eq!(eval_err("(+ 1 'a)"), ErrorKind::Type);
        assert_eq!(eval_err("(< 1 \"2\")"), ErrorKind::Type);
    }
}

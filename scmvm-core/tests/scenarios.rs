//! End-to-end interpreter scenarios: full programs evaluated against a
//! fresh evaluator, asserting on displayed output and heap behavior.

use std::io::Write;
use std::sync::{Arc, Mutex};

use scmvm_core::{Evaluator, Value};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().expect("sink poisoned").clone()).expect("non-utf8 output")
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

fn run(src: &str) -> String {
    let mut ev = Evaluator::new();
    let sink = SharedBuf::default();
    ev.set_output(Box::new(sink.clone()));
    if ev.eval_source(src).is_err() {
        panic!("script failed: {:?}", ev.get_exception());
    }
    sink.contents()
}

#[test]
fn naive_fibonacci() {
    let src = "(define (fib n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))
               (display (fib 10))";
    assert_eq!(run(src), "55");
}

#[test]
fn iterative_fibonacci_with_inner_definition() {
    let src = "(define (fib-1 n)
                 (define (fib-iter cur last i n)
                   (if (!= i n) (fib-iter (+ cur last) cur (+ 1 i) n) cur))
                 (fib-iter 1 0 1 n))
               (display (fib-1 25))";
    assert_eq!(run(src), "75025");
}

#[test]
fn closure_capture() {
    let src = "(define adder (lambda (x) (lambda (y) (+ x y))))
               (display ((adder 10) 32))";
    assert_eq!(run(src), "42");
}

#[test]
fn dotted_pair_round_trip() {
    assert_eq!(run("(display '(a . b))"), "(A . B)");
}

#[test]
fn letrec_mutual_visibility() {
    let src = "(letrec ((even? (lambda (n) (if (= n 0) #t (odd? (- n 1)))))
                        (odd?  (lambda (n) (if (= n 0) #f (even? (- n 1))))))
                 (display (even? 10)))";
    assert_eq!(run(src), "#T");
}

#[test]
fn cycle_reclamation() {
    let mut ev = Evaluator::new();
    ev.eval_source("(define (leak) (let ((p (cons 1 2))) (set! p (cons p p)) p))")
        .expect("define failed");
    ev.collect();
    let baseline = ev.live_objects();

    assert_eq!(
        ev.eval_source("(leak) (leak) (leak) (gc)"),
        Ok(Value::Nil)
    );
    assert!(
        ev.live_objects() <= baseline + 4,
        "cycles leaked: live objects grew from {} to {}",
        baseline,
        ev.live_objects()
    );
}

#[test]
fn script_stops_at_first_uncaught_exception() {
    let mut ev = Evaluator::new();
    let sink = SharedBuf::default();
    ev.set_output(Box::new(sink.clone()));
    assert!(ev.eval_source("(display 1) (car '()) (display 2)").is_err());
    assert_eq!(sink.contents(), "1");
    assert!(ev.get_exception().is_some());
}

#[test]
fn repl_like_sequence_recovers_between_forms() {
    let mut ev = Evaluator::new();
    // A REPL discards the exception and keeps the same evaluator state.
    assert!(ev.eval_source("(define x 1) (undefined-proc)").is_err());
    let _ = ev.get_exception();
    assert_eq!(ev.eval_source("(+ x 1)"), Ok(Value::Int(2)));
}

#[test]
fn explicit_collection_at_every_recursion_level() {
    // Runs a full collection inside every frame of a recursive build.
    // In-flight argument buffers, frames, and the accumulating list must
    // all survive through the evaluator's roots.
    let src = "(define (stress n acc)
                 (if (= n 0) acc (stress (- n 1) (begin (gc) (cons n acc)))))
               (display (length (stress 30 '())))";
    assert_eq!(run(src), "30");
}

#[test]
fn deep_program_with_collection_pressure() {
    // Builds and discards thousands of objects; the adaptive threshold
    // forces several collections while closures and frames are live.
    let src = "(define (range n acc) (if (= n 0) acc (range (- n 1) (cons n acc))))
               (define (sum lst acc) (if (null? lst) acc (sum (cdr lst) (+ acc (car lst)))))
               (define (go n acc)
                 (if (= n 0) acc (go (- n 1) (+ acc (sum (range 20 '()) 0)))))
               (display (go 50 0))";
    assert_eq!(run(src), "10500");
}

//! Property tests for the reader/printer round-trip laws.

use proptest::prelude::*;

use scmvm_core::scheme::value::equal_value;
use scmvm_core::{Evaluator, Reader, Value};

/// Abstract description of a printable, readable value: everything except
/// procedures, syntax handlers, and vectors (whose printed form is not
/// part of the read grammar).
#[derive(Debug, Clone)]
enum Tree {
    Nil,
    Bool(bool),
    Int(i32),
    Sym(String),
    Str(String),
    Pair(Box<Tree>, Box<Tree>),
}

fn symbol_name() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Z][A-Z0-9?!*]{0,6}").expect("bad symbol regex")
}

fn string_contents() -> impl Strategy<Value = String> {
    let ch = prop::sample::select(
        "abcXYZ 019_-+;()'#\\\"\n\t\r".chars().collect::<Vec<_>>(),
    );
    prop::collection::vec(ch, 0..12).prop_map(|chars| chars.into_iter().collect())
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        Just(Tree::Nil),
        any::<bool>().prop_map(Tree::Bool),
        any::<i32>().prop_map(Tree::Int),
        symbol_name().prop_map(Tree::Sym),
        string_contents().prop_map(Tree::Str),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        (inner.clone(), inner)
            .prop_map(|(car, cdr)| Tree::Pair(Box::new(car), Box::new(cdr)))
    })
}

fn build(ev: &mut Evaluator, tree: &Tree) -> Value {
    match tree {
        Tree::Nil => Value::Nil,
        Tree::Bool(b) => Value::Bool(*b),
        Tree::Int(n) => Value::Int(*n),
        Tree::Sym(name) => Value::Symbol(ev.intern(name)),
        Tree::Str(s) => ev.alloc_string(s.clone()),
        Tree::Pair(car, cdr) => {
            let car = build(ev, car);
            let cdr = build(ev, cdr);
            ev.cons(car, cdr)
        }
    }
}

proptest! {
    /// read(format(v)) is structurally equal to v.
    #[test]
    fn format_then_read_is_identity(tree in tree_strategy()) {
        let mut ev = Evaluator::new();
        let original = build(&mut ev, &tree);
        let text = ev.format_value(original);

        let mut reader = Reader::new(text.as_bytes());
        let read_back = reader
            .read_form(&mut ev)
            .expect("printed value failed to parse")
            .expect("printed value read as EOF");
        prop_assert!(
            equal_value(ev.heap(), &original, &read_back, 0),
            "{text} read back as {}",
            ev.format_value(read_back)
        );
        // Exactly one form was printed.
        prop_assert!(reader.read_form(&mut ev).expect("trailing parse error").is_none());
    }

    /// (quote X) evaluates to the same structure read("X") produces.
    #[test]
    fn quote_agrees_with_read(tree in tree_strategy()) {
        let mut ev = Evaluator::new();
        let text = {
            let value = build(&mut ev, &tree);
            ev.format_value(value)
        };

        // Evaluate before reading: evaluation may collect, and the freshly
        // read value would not be rooted across it.
        let quoted = ev
            .eval_source(&format!("(quote {text})"))
            .expect("quote evaluation failed");
        let mut reader = Reader::new(text.as_bytes());
        let read_back = reader
            .read_form(&mut ev)
            .expect("printed value failed to parse")
            .expect("printed value read as EOF");
        prop_assert!(equal_value(ev.heap(), &quoted, &read_back, 0));
    }

    /// The reader never panics, whatever bytes it is fed.
    #[test]
    fn reader_is_total(input in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut ev = Evaluator::new();
        let mut reader = Reader::new(input.as_slice());
        loop {
            match reader.read_form(&mut ev) {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => {
                    prop_assert!(ev.get_exception().is_some());
                    break;
                }
            }
        }
    }
}

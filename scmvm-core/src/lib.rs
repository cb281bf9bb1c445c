//! scmvm-core — a tree-walking interpreter for a small Scheme dialect.
//!
//! The crate is split the way the runtime is layered:
//!
//! - [`gc`] — the object manager: an arena of slots addressed by
//!   generational handles, reclaimed by mark-and-sweep tracing.  Closures
//!   capture environment frames that in turn hold the closures, so the
//!   collector's whole reason to exist is reclaiming those cycles.
//! - [`scheme`] — everything above the heap: the `Copy` tagged
//!   [`Value`](scheme::Value), case-folding symbol interner, streaming
//!   reader, printer, and the [`Evaluator`](scheme::Evaluator) with its
//!   special forms and native procedures.
//!
//! ```
//! use scmvm_core::{Evaluator, Value};
//!
//! let mut ev = Evaluator::new();
//! assert_eq!(ev.eval_source("(+ 1 2)"), Ok(Value::Int(3)));
//! ```

pub mod gc;
pub mod scheme;

pub use gc::ObjId;
pub use scheme::{ErrorKind, EvalResult, Evaluator, ParseErrorKind, RaisedError, Reader, Thrown, Value};

//! GC heap object types and handles.

pub mod heap;

pub use heap::Heap;

use crate::scheme::env::EnvData;
use crate::scheme::value::{ProcData, ProcKind, SyntaxData, Value, VectorData};

/// Handle to a heap-allocated object.  Copy-able, 8 bytes.
///
/// `index` selects the slot in `Heap::objects`.
/// `generation` detects use-after-free (stale handles panic on access).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl std::fmt::Debug for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjId({}/{})", self.index, self.generation)
    }
}

/// The concrete object stored on the managed heap.
///
/// Every heap-resident value lives here: pairs, vectors, strings,
/// procedures, syntax handlers, and environment frames.  Environments are
/// heap objects because closures capture them, which is exactly how cycles
/// form (a procedure stored in a frame that the procedure itself captured).
pub enum HeapObject {
    Pair { car: Value, cdr: Value },
    Vector(VectorData),
    Str(String),
    Procedure(ProcData),
    Syntax(SyntaxData),
    Env(EnvData),
    /// Freed slot, available for reuse.
    Free,
}

impl HeapObject {
    /// Push the ObjIds of every directly-referenced heap object onto the
    /// worklist.  This is the single tracing hook the collector uses.
    pub fn trace(&self, out: &mut Vec<ObjId>) {
        match self {
            HeapObject::Pair { car, cdr } => {
                push_value_id(car, out);
                push_value_id(cdr, out);
            }
            HeapObject::Vector(v) => {
                for val in &v.data {
                    push_value_id(val, out);
                }
            }
            HeapObject::Str(_) => {}
            HeapObject::Procedure(p) => match &p.kind {
                ProcKind::Interpreted { body, env, .. } => {
                    push_value_id(body, out);
                    out.push(*env);
                }
                ProcKind::Native { .. } => {}
            },
            HeapObject::Syntax(s) => {
                for val in &s.data {
                    push_value_id(val, out);
                }
            }
            HeapObject::Env(e) => {
                if let Some(parent) = e.parent {
                    out.push(parent);
                }
                for val in e.vars.values() {
                    push_value_id(val, out);
                }
            }
            HeapObject::Free => {}
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            HeapObject::Pair { .. } => "pair",
            HeapObject::Vector(_) => "vector",
            HeapObject::Str(_) => "string",
            HeapObject::Procedure(_) => "procedure",
            HeapObject::Syntax(_) => "syntax",
            HeapObject::Env(_) => "environment",
            HeapObject::Free => "free",
        }
    }
}

fn push_value_id(val: &Value, out: &mut Vec<ObjId>) {
    if let Some(id) = val.heap_id() {
        out.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objid_copy_eq_hash() {
        let a = ObjId {
            index: 1,
            generation: 0,
        };
        let b = a; // Copy
        assert_eq!(a, b);

        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn trace_pair() {
        let id = ObjId {
            index: 7,
            generation: 0,
        };
        let obj = HeapObject::Pair {
            car: Value::Pair(id),
            cdr: Value::Int(2),
        };
        let mut out = Vec::new();
        obj.trace(&mut out);
        assert_eq!(out, vec![id]);
    }

    #[test]
    fn trace_atoms_empty() {
        let mut out = Vec::new();
        HeapObject::Str("hello".to_string()).trace(&mut out);
        HeapObject::Free.trace(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn trace_vector() {
        let id = ObjId {
            index: 3,
            generation: 1,
        };
        let obj = HeapObject::Vector(VectorData::filled(2, Value::Str(id)));
        let mut out = Vec::new();
        obj.trace(&mut out);
        assert_eq!(out, vec![id, id]);
    }
}

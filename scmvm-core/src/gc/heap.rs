//! Arena-based heap with tri-color mark-and-sweep collection.

use super::{HeapObject, ObjId};
use crate::scheme::env::EnvData;
use crate::scheme::value::{ProcData, SyntaxData, Value, VectorData};

/// Allocation-count threshold for the first collection.  After every sweep
/// the threshold adapts to twice the surviving object count, never dropping
/// below this floor.
pub const INITIAL_GC_THRESHOLD: usize = 128;

/// The managed heap for cycle-forming interpreter objects.
///
/// Objects live in slots of a single arena; freed slots go on a free list
/// and are reused with a bumped generation so stale handles are caught on
/// access.  Collection is a full mark (gray worklist) and sweep, run only
/// at quiescent points chosen by the evaluator.
pub struct Heap {
    objects: Vec<HeapObject>,
    generations: Vec<u32>,
    /// Mark bits: `true` = black (reached from a root), `false` = white.
    marks: Vec<bool>,
    free_list: Vec<u32>,
    allocated_count: usize,
    gc_threshold: usize,
    /// Gray worklist — marked objects whose children are not yet scanned.
    gray_queue: Vec<ObjId>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            generations: Vec::new(),
            marks: Vec::new(),
            free_list: Vec::new(),
            allocated_count: 0,
            gc_threshold: INITIAL_GC_THRESHOLD,
            gray_queue: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    fn alloc(&mut self, obj: HeapObject) -> ObjId {
        self.allocated_count += 1;
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generations[i] = self.generations[i].wrapping_add(1);
            self.objects[i] = obj;
            self.marks[i] = false;
            ObjId {
                index: idx,
                generation: self.generations[i],
            }
        } else {
            let idx = self.objects.len() as u32;
            self.objects.push(obj);
            self.generations.push(0);
            self.marks.push(false);
            ObjId {
                index: idx,
                generation: 0,
            }
        }
    }

    pub fn alloc_pair(&mut self, car: Value, cdr: Value) -> ObjId {
        self.alloc(HeapObject::Pair { car, cdr })
    }

    pub fn alloc_vector(&mut self, data: VectorData) -> ObjId {
        self.alloc(HeapObject::Vector(data))
    }

    pub fn alloc_string(&mut self, s: String) -> ObjId {
        self.alloc(HeapObject::Str(s))
    }

    pub fn alloc_procedure(&mut self, data: ProcData) -> ObjId {
        self.alloc(HeapObject::Procedure(data))
    }

    pub fn alloc_syntax(&mut self, data: SyntaxData) -> ObjId {
        self.alloc(HeapObject::Syntax(data))
    }

    pub fn alloc_env(&mut self, data: EnvData) -> ObjId {
        self.alloc(HeapObject::Env(data))
    }

    /// Current allocation threshold used by the evaluator's safe points.
    pub fn gc_threshold(&self) -> usize {
        self.gc_threshold
    }

    /// Update the allocation threshold.  Clamped to 1 so callers never
    /// disable threshold checks with zero.
    pub fn set_gc_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold.max(1);
    }

    /// True when allocated objects reached the adaptive threshold.
    pub fn should_collect(&self) -> bool {
        self.allocated_count >= self.gc_threshold
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    // -----------------------------------------------------------------------
    // Checked access
    // -----------------------------------------------------------------------

    #[inline]
    fn check(&self, id: ObjId) {
        let i = id.index as usize;
        assert!(
            i < self.objects.len() && self.generations[i] == id.generation,
            "stale ObjId: {:?} (current gen={})",
            id,
            if i < self.generations.len() {
                self.generations[i]
            } else {
                u32::MAX
            }
        );
    }

    pub fn get(&self, id: ObjId) -> &HeapObject {
        self.check(id);
        &self.objects[id.index as usize]
    }

    pub fn get_mut(&mut self, id: ObjId) -> &mut HeapObject {
        self.check(id);
        &mut self.objects[id.index as usize]
    }

    // -----------------------------------------------------------------------
    // Pair accessors
    // -----------------------------------------------------------------------

    pub fn pair_car(&self, id: ObjId) -> Value {
        match self.get(id) {
            HeapObject::Pair { car, .. } => *car,
            other => panic!("pair_car on {}", other.kind_name()),
        }
    }

    pub fn pair_cdr(&self, id: ObjId) -> Value {
        match self.get(id) {
            HeapObject::Pair { cdr, .. } => *cdr,
            other => panic!("pair_cdr on {}", other.kind_name()),
        }
    }

    // -----------------------------------------------------------------------
    // Vector accessors
    // -----------------------------------------------------------------------

    pub fn vector(&self, id: ObjId) -> &VectorData {
        match self.get(id) {
            HeapObject::Vector(v) => v,
            other => panic!("vector on {}", other.kind_name()),
        }
    }

    pub fn vector_mut(&mut self, id: ObjId) -> &mut VectorData {
        match self.get_mut(id) {
            HeapObject::Vector(v) => v,
            other => panic!("vector_mut on {}", other.kind_name()),
        }
    }

    // -----------------------------------------------------------------------
    // String accessor
    // -----------------------------------------------------------------------

    pub fn string(&self, id: ObjId) -> &str {
        match self.get(id) {
            HeapObject::Str(s) => s,
            other => panic!("string on {}", other.kind_name()),
        }
    }

    // -----------------------------------------------------------------------
    // Procedure / syntax / environment accessors
    // -----------------------------------------------------------------------

    pub fn procedure(&self, id: ObjId) -> &ProcData {
        match self.get(id) {
            HeapObject::Procedure(p) => p,
            other => panic!("procedure on {}", other.kind_name()),
        }
    }

    pub fn syntax(&self, id: ObjId) -> &SyntaxData {
        match self.get(id) {
            HeapObject::Syntax(s) => s,
            other => panic!("syntax on {}", other.kind_name()),
        }
    }

    pub fn env(&self, id: ObjId) -> &EnvData {
        match self.get(id) {
            HeapObject::Env(e) => e,
            other => panic!("env on {}", other.kind_name()),
        }
    }

    pub fn env_mut(&mut self, id: ObjId) -> &mut EnvData {
        match self.get_mut(id) {
            HeapObject::Env(e) => e,
            other => panic!("env_mut on {}", other.kind_name()),
        }
    }

    // -----------------------------------------------------------------------
    // Mark-and-sweep collection
    // -----------------------------------------------------------------------

    /// Collect garbage.  `roots` must yield a handle for every externally
    /// reachable object; everything transitively reachable from them
    /// survives, everything else (cycles included) is reclaimed.
    pub fn collect<I>(&mut self, roots: I)
    where
        I: IntoIterator<Item = ObjId>,
    {
        let before = self.allocated_count;

        for m in self.marks.iter_mut() {
            *m = false;
        }
        self.marks.resize(self.objects.len(), false);
        self.gray_queue.clear();
        self.gray_queue.extend(roots);

        self.mark_all();
        self.sweep_all();

        // Next collection triggers at 2x the survivors.
        self.gc_threshold = self
            .allocated_count
            .saturating_mul(2)
            .max(INITIAL_GC_THRESHOLD);

        log::debug!(
            "gc: {} -> {} objects (next threshold {})",
            before,
            self.allocated_count,
            self.gc_threshold
        );
    }

    /// Process gray objects until the worklist is empty.
    fn mark_all(&mut self) {
        let mut children = Vec::new();
        while let Some(id) = self.gray_queue.pop() {
            let i = id.index as usize;
            if i >= self.marks.len() || self.marks[i] {
                continue;
            }
            if self.generations[i] != id.generation {
                continue; // stale
            }
            self.marks[i] = true;

            children.clear();
            self.objects[i].trace(&mut children);
            self.gray_queue.extend_from_slice(&children);
        }
    }

    /// Free every unmarked slot in one pass.
    fn sweep_all(&mut self) {
        for i in 0..self.objects.len() {
            if !self.marks[i] && !matches!(self.objects[i], HeapObject::Free) {
                self.objects[i] = HeapObject::Free;
                self.generations[i] = self.generations[i].wrapping_add(1);
                self.free_list.push(i as u32);
                self.allocated_count = self.allocated_count.saturating_sub(1);
            }
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

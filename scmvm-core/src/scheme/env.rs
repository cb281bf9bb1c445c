//! Environment frames: ordered symbol-to-value maps with a parent link.
//!
//! Frames are heap objects (`HeapObject::Env`) because closures capture
//! them; the object manager is what reclaims frame/closure cycles.  The
//! ordered map is a `BTreeMap` keyed by `SymId` — symbols are interned
//! case-folded, so id equality is folded-name equality.

use std::collections::BTreeMap;

use crate::gc::ObjId;

use super::error::{ErrorKind, EvalResult, Thrown};
use super::eval::Evaluator;
use super::intern::SymId;
use super::value::Value;

/// One environment frame.
pub struct EnvData {
    /// Diagnostic name only.
    pub name: String,
    pub parent: Option<ObjId>,
    pub vars: BTreeMap<SymId, Value>,
}

impl EnvData {
    pub fn new(name: impl Into<String>, parent: Option<ObjId>) -> Self {
        Self {
            name: name.into(),
            parent,
            vars: BTreeMap::new(),
        }
    }
}

impl Evaluator {
    /// Create a child frame of `parent`.
    pub(crate) fn new_env(&mut self, name: impl Into<String>, parent: ObjId) -> ObjId {
        self.heap.alloc_env(EnvData::new(name, Some(parent)))
    }

    /// Insert a new binding into `env` itself.  Rebinding an existing name
    /// is tolerated in the `<global>` and `top-level` frames and an error
    /// in any local frame.
    pub(crate) fn env_define(
        &mut self,
        env: ObjId,
        name: SymId,
        value: Value,
    ) -> Result<(), Thrown> {
        let frame = self.heap.env_mut(env);
        if frame.vars.contains_key(&name) && env != self.global && env != self.top_level {
            let text = format!(
                "{} is already defined in this scope",
                self.interner.resolve(name)
            );
            return Err(self.throw(ErrorKind::Internal, text));
        }
        self.heap.env_mut(env).vars.insert(name, value);
        Ok(())
    }

    /// Look a symbol up through `env` and its ancestors.
    pub(crate) fn env_lookup(&mut self, env: ObjId, name: SymId) -> EvalResult {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = self.heap.env(id);
            if let Some(value) = frame.vars.get(&name) {
                return Ok(*value);
            }
            current = frame.parent;
        }
        let text = format!("no such variable: {}", self.interner.resolve(name));
        Err(self.throw(ErrorKind::Unbound, text))
    }

    /// Overwrite the nearest enclosing binding of `name`.  Never defines.
    pub(crate) fn env_assign(
        &mut self,
        env: ObjId,
        name: SymId,
        value: Value,
    ) -> Result<(), Thrown> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = self.heap.env_mut(id);
            if let Some(cell) = frame.vars.get_mut(&name) {
                *cell = value;
                return Ok(());
            }
            current = frame.parent;
        }
        let text = format!("no such variable: {}", self.interner.resolve(name));
        Err(self.throw(ErrorKind::Unbound, text))
    }
}

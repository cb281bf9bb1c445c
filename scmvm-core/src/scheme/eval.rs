//! Evaluator — special forms, procedure application, and dispatch.
//!
//! The `Evaluator` owns every piece of runtime state: the managed heap, the
//! symbol interner, the exception list, and the `<global>` / `top-level`
//! environment pair.  Collection runs only at evaluation safe points; every
//! in-flight value (the current form, evaluated argument buffers, fresh
//! frames) is pinned on a shadow root stack until its caller completes.

use std::io::{self, Write};

use crate::gc::{Heap, ObjId};

use super::builtins;
use super::env::EnvData;
use super::error::{ErrorKind, EvalResult, RaisedError, Thrown};
use super::intern::{StringInterner, SymId};
use super::print;
use super::reader::Reader;
use super::value::{
    list_from_slice, list_length, NativeFn, ParamSpec, ProcData, ProcKind, SyntaxData, SyntaxFn,
    Value,
};

const MAX_EVAL_DEPTH: usize = 512;

pub(crate) const MAGIC_LET: i32 = 0;
pub(crate) const MAGIC_LET_STAR: i32 = 1;
pub(crate) const MAGIC_LET_REC: i32 = 2;

/// The interpreter runtime.
pub struct Evaluator {
    pub(crate) heap: Heap,
    pub(crate) interner: StringInterner,
    /// Most recently raised error last.
    exceptions: Vec<RaisedError>,
    /// Root frame holding the special forms and native procedures.
    pub(crate) global: ObjId,
    /// Child of `<global>` where user definitions land.
    pub(crate) top_level: ObjId,
    /// Shadow stack of heap handles pinned by in-flight evaluation.
    roots: Vec<ObjId>,
    depth: usize,
    max_depth: usize,
    out: Box<dyn Write>,
}

impl Evaluator {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let global = heap.alloc_env(EnvData::new("<global>", None));
        let mut ev = Self {
            heap,
            interner: StringInterner::new(),
            exceptions: Vec::new(),
            global,
            top_level: global,
            roots: Vec::new(),
            depth: 0,
            max_depth: MAX_EVAL_DEPTH,
            out: Box::new(io::stdout()),
        };
        ev.register_special_forms();
        builtins::register(&mut ev);
        let nil = ev.intern("nil");
        ev.env_define(global, nil, Value::Nil)
            .expect("startup bindings cannot fail");
        ev.top_level = ev.new_env("top-level", global);
        log::debug!(
            "evaluator ready: {} startup objects",
            ev.heap.allocated_count()
        );
        ev
    }

    // -----------------------------------------------------------------------
    // Embedding surface
    // -----------------------------------------------------------------------

    /// The environment in which user definitions land.
    pub fn top_level(&self) -> ObjId {
        self.top_level
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn intern(&mut self, name: &str) -> SymId {
        self.interner.intern(name)
    }

    pub fn symbol_name(&self, id: SymId) -> &str {
        self.interner.resolve(id)
    }

    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        Value::Pair(self.heap.alloc_pair(car, cdr))
    }

    pub fn alloc_string(&mut self, s: impl Into<String>) -> Value {
        Value::Str(self.heap.alloc_string(s.into()))
    }

    /// Raise an error: push the payload onto the exception list and hand
    /// back the sentinel for the caller to propagate.
    pub(crate) fn throw(&mut self, kind: ErrorKind, message: impl Into<String>) -> Thrown {
        let err = RaisedError {
            kind,
            message: message.into(),
        };
        log::debug!("throwing {err}");
        self.exceptions.push(err);
        Thrown
    }

    /// Pop the most recently raised error.
    pub fn get_exception(&mut self) -> Option<RaisedError> {
        self.exceptions.pop()
    }

    /// Pop and print the most recently raised error.
    pub fn print_exception(&mut self) {
        match self.get_exception() {
            Some(err) => {
                let _ = writeln!(self.out, "error: {err}");
            }
            None => {
                let _ = writeln!(self.out, "error: (no pending exception)");
            }
        }
    }

    pub fn format_value(&self, value: Value) -> String {
        print::format_value(&self.heap, &self.interner, value)
    }

    /// Write a value plus newline to the output sink.
    pub fn print_value(&mut self, value: Value) {
        let text = self.format_value(value);
        let _ = writeln!(self.out, "{text}");
    }

    pub(crate) fn write_output(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    /// Redirect `display` and value printing (tests capture output here).
    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    /// Number of live heap objects.
    pub fn live_objects(&self) -> usize {
        self.heap.allocated_count()
    }

    /// Run a full collection cycle now.
    pub fn collect(&mut self) {
        let global = self.global;
        let top = self.top_level;
        let pinned = self.roots.clone();
        self.heap
            .collect([global, top].into_iter().chain(pinned));
    }

    /// Read and evaluate every form in `src` against `top-level`,
    /// returning the value of the last one (Nil for empty input).
    pub fn eval_source(&mut self, src: &str) -> EvalResult {
        let mut reader = Reader::new(src.as_bytes());
        let mut last = Value::Nil;
        while let Some(form) = reader.read_form(self)? {
            last = self.eval(self.top_level, form)?;
        }
        Ok(last)
    }

    // -----------------------------------------------------------------------
    // Core eval
    // -----------------------------------------------------------------------

    pub fn eval(&mut self, env: ObjId, form: Value) -> EvalResult {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            let text = format!("excessive nesting in evaluation (depth {})", self.max_depth);
            return Err(self.throw(ErrorKind::Internal, text));
        }
        let mark = self.roots.len();
        self.root(form);
        self.roots.push(env);
        if self.heap.should_collect() {
            self.collect();
        }
        let result = self.eval_inner(env, form);
        self.roots.truncate(mark);
        self.depth -= 1;
        result
    }

    fn eval_inner(&mut self, env: ObjId, form: Value) -> EvalResult {
        match form {
            Value::Pair(id) => self.eval_call(env, id),
            Value::Symbol(sym) => self.env_lookup(env, sym),
            other => Ok(other),
        }
    }

    fn eval_call(&mut self, env: ObjId, id: ObjId) -> EvalResult {
        let head = self.heap.pair_car(id);
        let rest = self.heap.pair_cdr(id);
        let callee = self.eval(env, head)?;

        match callee {
            Value::Syntax(sid) => {
                let syn = self.heap.syntax(sid);
                let func = syn.func;
                let magic = syn.magic;
                let data = syn.data.clone();
                let mark = self.roots.len();
                self.roots.push(sid);
                for value in &data {
                    self.root(*value);
                }
                let result = func(self, env, rest, magic, &data);
                self.roots.truncate(mark);
                result
            }
            Value::Procedure(pid) => {
                let mark = self.roots.len();
                self.roots.push(pid);
                let mut args = Vec::new();
                let mut cursor = rest;
                loop {
                    match cursor {
                        Value::Nil => break,
                        Value::Pair(pair) => {
                            let arg_form = self.heap.pair_car(pair);
                            cursor = self.heap.pair_cdr(pair);
                            let value = self.eval(env, arg_form)?;
                            self.root(value);
                            args.push(value);
                        }
                        _ => {
                            return Err(
                                self.throw(ErrorKind::Type, "improper argument list in call")
                            )
                        }
                    }
                }
                let result = self.apply_procedure(env, pid, &args);
                self.roots.truncate(mark);
                result
            }
            other => {
                let text = format!("not a procedure: {}", self.format_value(other));
                Err(self.throw(ErrorKind::Type, text))
            }
        }
    }

    /// Invoke a procedure on pre-evaluated arguments.  `caller_env` is only
    /// visible to natives (`eval` uses it); interpreted bodies see a fresh
    /// child of their captured environment.
    pub(crate) fn apply_procedure(
        &mut self,
        caller_env: ObjId,
        pid: ObjId,
        args: &[Value],
    ) -> EvalResult {
        let proc = self.heap.procedure(pid);
        let name = proc.name;
        match &proc.kind {
            ProcKind::Native { func, arg_max } => {
                let func = *func;
                let arg_max = *arg_max;
                if arg_max >= 0 && args.len() > arg_max as usize {
                    let text = format!(
                        "too many arguments to {}: got {}",
                        self.interner.resolve(name),
                        args.len()
                    );
                    return Err(self.throw(ErrorKind::Arity, text));
                }
                func(self, caller_env, args)
            }
            ProcKind::Interpreted {
                params,
                body,
                env: captured,
            } => {
                let params = params.clone();
                let body = *body;
                let captured = *captured;

                if args.len() < params.min_arity() {
                    let text = format!(
                        "too few arguments to {}: got {}, need {}",
                        self.interner.resolve(name),
                        args.len(),
                        params.min_arity()
                    );
                    return Err(self.throw(ErrorKind::Arity, text));
                }
                if let Some(max) = params.max_arity() {
                    if args.len() > max {
                        let text = format!(
                            "too many arguments to {}: got {}, need {}",
                            self.interner.resolve(name),
                            args.len(),
                            max
                        );
                        return Err(self.throw(ErrorKind::Arity, text));
                    }
                }

                let frame_name = self.interner.resolve(name).to_string();
                let new_env = self.new_env(frame_name, captured);
                let mark = self.roots.len();
                self.roots.push(new_env);

                for (param, value) in params.required.iter().zip(args) {
                    self.env_define(new_env, *param, *value)?;
                }
                if let Some(rest) = params.rest {
                    let remaining = list_from_slice(&mut self.heap, &args[params.required.len()..]);
                    self.env_define(new_env, rest, remaining)?;
                }

                let result = self.eval_body(new_env, body);
                self.roots.truncate(mark);
                result
            }
        }
    }

    /// Evaluate a list of forms sequentially; the last value wins (Nil for
    /// an empty list).
    fn eval_body(&mut self, env: ObjId, body: Value) -> EvalResult {
        let mut result = Value::Nil;
        let mut cursor = body;
        loop {
            match cursor {
                Value::Nil => return Ok(result),
                Value::Pair(id) => {
                    let form = self.heap.pair_car(id);
                    cursor = self.heap.pair_cdr(id);
                    result = self.eval(env, form)?;
                }
                _ => return Err(self.throw(ErrorKind::Type, "improper form list")),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    fn register_special_forms(&mut self) {
        let defs: &[(&str, SyntaxFn, i32)] = &[
            ("quote", Evaluator::sf_quote, 0),
            ("if", Evaluator::sf_if, 0),
            ("cond", Evaluator::sf_cond, 0),
            ("define", Evaluator::sf_define, 0),
            ("set!", Evaluator::sf_set, 0),
            ("lambda", Evaluator::sf_lambda, 0),
            ("named-lambda", Evaluator::sf_named_lambda, 0),
            ("let", Evaluator::sf_let, MAGIC_LET),
            ("let*", Evaluator::sf_let, MAGIC_LET_STAR),
            ("letrec", Evaluator::sf_let, MAGIC_LET_REC),
            ("begin", Evaluator::sf_begin, 0),
        ];
        for (name, func, magic) in defs {
            self.define_syntax(name, *func, *magic);
        }
    }

    fn define_syntax(&mut self, name: &str, func: SyntaxFn, magic: i32) {
        let sym = self.intern(name);
        let id = self.heap.alloc_syntax(SyntaxData {
            name: sym,
            func,
            magic,
            data: Vec::new(),
        });
        self.env_define(self.global, sym, Value::Syntax(id))
            .expect("startup syntax registration cannot fail");
    }

    pub(crate) fn define_native(&mut self, name: &str, func: NativeFn, arg_max: i32) {
        let sym = self.intern(name);
        let id = self.heap.alloc_procedure(ProcData {
            name: sym,
            kind: ProcKind::Native { func, arg_max },
        });
        self.env_define(self.global, sym, Value::Procedure(id))
            .expect("startup native registration cannot fail");
    }

    // -----------------------------------------------------------------------
    // Special forms
    // -----------------------------------------------------------------------

    fn sf_quote(&mut self, _env: ObjId, form: Value, _magic: i32, _data: &[Value]) -> EvalResult {
        let ([quoted], _) = self.extract_forms::<1>(form)?;
        Ok(quoted)
    }

    fn sf_if(&mut self, env: ObjId, form: Value, _magic: i32, _data: &[Value]) -> EvalResult {
        let ([test, then_branch], else_branch) = self.extract_forms::<2>(form)?;
        let test_value = self.eval(env, test)?;
        if self.expect_condition(test_value)? {
            self.eval(env, then_branch)
        } else {
            self.eval_body(env, else_branch)
        }
    }

    fn sf_cond(&mut self, env: ObjId, form: Value, _magic: i32, _data: &[Value]) -> EvalResult {
        let else_sym = self.intern("else");
        let mut clauses = form;
        loop {
            let Value::Pair(id) = clauses else {
                return Ok(Value::Nil);
            };
            let clause = self.heap.pair_car(id);
            clauses = self.heap.pair_cdr(id);

            let ([test], body) = self.extract_forms::<1>(clause)?;
            let truthy = if test == Value::Symbol(else_sym) {
                if !clauses.is_nil() {
                    return Err(
                        self.throw(ErrorKind::Internal, "ELSE must be the last clause in COND")
                    );
                }
                true
            } else {
                let test_value = self.eval(env, test)?;
                self.expect_condition(test_value)?
            };
            if truthy {
                return self.eval_body(env, body);
            }
        }
    }

    fn sf_define(&mut self, env: ObjId, form: Value, _magic: i32, _data: &[Value]) -> EvalResult {
        let ([signature], rest) = self.extract_forms::<1>(form)?;
        match signature {
            // (define (name params...) body...)
            Value::Pair(sig) => {
                let name_form = self.heap.pair_car(sig);
                let params = self.heap.pair_cdr(sig);
                let Value::Symbol(name) = name_form else {
                    let text = format!(
                        "DEFINE: procedure name must be a symbol, got {}",
                        name_form.type_name()
                    );
                    return Err(self.throw(ErrorKind::Type, text));
                };
                let proc = self.make_procedure(name, params, rest, env)?;
                self.env_define(env, name, proc)?;
                Ok(Value::Nil)
            }
            // (define name expr)
            Value::Symbol(name) => {
                let ([expr], _) = self.extract_forms::<1>(rest)?;
                let value = self.eval(env, expr)?;
                self.env_define(env, name, value)?;
                Ok(Value::Nil)
            }
            other => {
                let text = format!("DEFINE: invalid target: {}", other.type_name());
                Err(self.throw(ErrorKind::Type, text))
            }
        }
    }

    fn sf_set(&mut self, env: ObjId, form: Value, _magic: i32, _data: &[Value]) -> EvalResult {
        let ([target, expr], _) = self.extract_forms::<2>(form)?;
        let Value::Symbol(name) = target else {
            let text = format!("SET!: target must be a symbol, got {}", target.type_name());
            return Err(self.throw(ErrorKind::Type, text));
        };
        let value = self.eval(env, expr)?;
        self.env_assign(env, name, value)?;
        Ok(Value::Nil)
    }

    fn sf_lambda(&mut self, env: ObjId, form: Value, _magic: i32, _data: &[Value]) -> EvalResult {
        let ([params], body) = self.extract_forms::<1>(form)?;
        let name = self.intern("#[lambda]");
        self.make_procedure(name, params, body, env)
    }

    fn sf_named_lambda(
        &mut self,
        env: ObjId,
        form: Value,
        _magic: i32,
        _data: &[Value],
    ) -> EvalResult {
        let ([signature], body) = self.extract_forms::<1>(form)?;
        let Value::Pair(sig) = signature else {
            return Err(self.throw(
                ErrorKind::Type,
                "NAMED-LAMBDA: expected (name params...) signature",
            ));
        };
        let name_form = self.heap.pair_car(sig);
        let params = self.heap.pair_cdr(sig);
        let Value::Symbol(name) = name_form else {
            let text = format!(
                "NAMED-LAMBDA: name must be a symbol, got {}",
                name_form.type_name()
            );
            return Err(self.throw(ErrorKind::Type, text));
        };
        self.make_procedure(name, params, body, env)
    }

    /// `let`, `let*`, and `letrec` share this handler; `magic` picks the
    /// binding discipline.
    fn sf_let(&mut self, env: ObjId, form: Value, magic: i32, _data: &[Value]) -> EvalResult {
        let ([bindings], body) = self.extract_forms::<1>(form)?;
        if list_length(&self.heap, bindings).is_none() {
            let text = format!("malformed binding list: {}", bindings.type_name());
            return Err(self.throw(ErrorKind::Type, text));
        }
        let mark = self.roots.len();
        let result = self.eval_let(env, bindings, body, magic);
        self.roots.truncate(mark);
        result
    }

    fn eval_let(&mut self, env: ObjId, bindings: Value, body: Value, magic: i32) -> EvalResult {
        match magic {
            // Initializers see the enclosing environment only.
            MAGIC_LET => {
                let mut names = Vec::new();
                let mut values = Vec::new();
                let mut cursor = bindings;
                while let Value::Pair(id) = cursor {
                    let binding = self.heap.pair_car(id);
                    cursor = self.heap.pair_cdr(id);
                    let (name, init) = self.let_binding(binding)?;
                    let value = self.eval(env, init)?;
                    self.root(value);
                    names.push(name);
                    values.push(value);
                }
                let new_env = self.new_env("let", env);
                self.roots.push(new_env);
                for (name, value) in names.into_iter().zip(values) {
                    self.env_define(new_env, name, value)?;
                }
                self.eval_body(new_env, body)
            }
            // Each initializer sees the bindings before it, in a nested
            // frame per binding so shadowing works.
            MAGIC_LET_STAR => {
                let mut current = self.new_env("let*", env);
                self.roots.push(current);
                let mut cursor = bindings;
                while let Value::Pair(id) = cursor {
                    let binding = self.heap.pair_car(id);
                    cursor = self.heap.pair_cdr(id);
                    let (name, init) = self.let_binding(binding)?;
                    let child = self.new_env("let*", current);
                    self.roots.push(child);
                    let value = self.eval(child, init)?;
                    self.env_define(child, name, value)?;
                    current = child;
                }
                self.eval_body(current, body)
            }
            // All initializers evaluate in the new frame, so procedure
            // bindings can reference each other (and themselves).
            MAGIC_LET_REC => {
                let new_env = self.new_env("letrec", env);
                self.roots.push(new_env);
                let mut cursor = bindings;
                while let Value::Pair(id) = cursor {
                    let binding = self.heap.pair_car(id);
                    cursor = self.heap.pair_cdr(id);
                    let (name, init) = self.let_binding(binding)?;
                    let value = self.eval(new_env, init)?;
                    self.env_define(new_env, name, value)?;
                }
                self.eval_body(new_env, body)
            }
            other => {
                let text = format!("unknown let variant magic: {other}");
                Err(self.throw(ErrorKind::Internal, text))
            }
        }
    }

    fn sf_begin(&mut self, env: ObjId, form: Value, _magic: i32, _data: &[Value]) -> EvalResult {
        self.eval_body(env, form)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// A binding clause is a two-element list `(name init)`.
    fn let_binding(&mut self, binding: Value) -> Result<(SymId, Value), Thrown> {
        let ([name_form, init], _) = self.extract_forms::<2>(binding)?;
        let Value::Symbol(name) = name_form else {
            let text = format!(
                "binding name must be a symbol, got {}",
                name_form.type_name()
            );
            return Err(self.throw(ErrorKind::Type, text));
        };
        Ok((name, init))
    }

    fn make_procedure(
        &mut self,
        name: SymId,
        params_form: Value,
        body: Value,
        env: ObjId,
    ) -> EvalResult {
        let params = self.parse_params(params_form)?;
        let id = self.heap.alloc_procedure(ProcData {
            name,
            kind: ProcKind::Interpreted { params, body, env },
        });
        Ok(Value::Procedure(id))
    }

    fn parse_params(&mut self, form: Value) -> Result<ParamSpec, Thrown> {
        let mut required = Vec::new();
        let mut rest = None;
        let mut cursor = form;
        loop {
            match cursor {
                Value::Nil => break,
                Value::Symbol(sym) => {
                    rest = Some(sym);
                    break;
                }
                Value::Pair(id) => {
                    let head = self.heap.pair_car(id);
                    cursor = self.heap.pair_cdr(id);
                    let Value::Symbol(sym) = head else {
                        let text = format!(
                            "parameter name must be a symbol, got {}",
                            head.type_name()
                        );
                        return Err(self.throw(ErrorKind::Type, text));
                    };
                    if required.contains(&sym) {
                        let text =
                            format!("duplicate parameter: {}", self.interner.resolve(sym));
                        return Err(self.throw(ErrorKind::Type, text));
                    }
                    required.push(sym);
                }
                other => {
                    let text = format!("malformed parameter list: {}", other.type_name());
                    return Err(self.throw(ErrorKind::Type, text));
                }
            }
        }
        if let Some(sym) = rest {
            if required.contains(&sym) {
                let text = format!("duplicate parameter: {}", self.interner.resolve(sym));
                return Err(self.throw(ErrorKind::Type, text));
            }
        }
        Ok(ParamSpec { required, rest })
    }

    /// Pull `N` leading elements off a form list; the remainder comes back
    /// as the tail.
    fn extract_forms<const N: usize>(
        &mut self,
        list: Value,
    ) -> Result<([Value; N], Value), Thrown> {
        let mut heads = [Value::Nil; N];
        let mut cursor = list;
        for slot in heads.iter_mut() {
            let Value::Pair(id) = cursor else {
                return Err(self.throw(ErrorKind::Type, "malformed form: too few elements"));
            };
            *slot = self.heap.pair_car(id);
            cursor = self.heap.pair_cdr(id);
        }
        Ok((heads, cursor))
    }

    /// Conditions are strictly boolean in this dialect.
    fn expect_condition(&mut self, value: Value) -> Result<bool, Thrown> {
        match value {
            Value::Bool(b) => Ok(b),
            other => {
                let text = format!("expected a boolean, got {}", other.type_name());
                Err(self.throw(ErrorKind::Type, text))
            }
        }
    }

    fn root(&mut self, value: Value) {
        if let Some(id) = value.heap_id() {
            self.roots.push(id);
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Fixed-length vectors.

use crate::gc::ObjId;

use super::super::error::{ErrorKind, EvalResult, Thrown};
use super::super::eval::Evaluator;
use super::super::value::{Value, VectorData};
use super::{expect_args, expect_int, expect_min_args, expect_vector};

/// Refuse absurd lengths before the allocator does.
const MAX_VECTOR_LEN: i32 = 1 << 30;

pub(super) fn make_vector(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_min_args(ev, "MAKE-VECTOR", args, 1)?;
    let len = expect_int(ev, "MAKE-VECTOR", args[0])?;
    if len < 0 {
        let text = format!("MAKE-VECTOR: negative length {len}");
        return Err(ev.throw(ErrorKind::Type, text));
    }
    if len > MAX_VECTOR_LEN {
        let text = format!("MAKE-VECTOR: cannot allocate {len} elements");
        return Err(ev.throw(ErrorKind::OutOfMemory, text));
    }
    let fill = args.get(1).copied().unwrap_or(Value::Nil);
    let id = ev.heap.alloc_vector(VectorData::filled(len as usize, fill));
    Ok(Value::Vector(id))
}

pub(super) fn vector(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    let id = ev.heap.alloc_vector(VectorData::from_values(args.to_vec()));
    Ok(Value::Vector(id))
}

pub(super) fn vector_copy(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "VECTOR-COPY", args, 1)?;
    let id = expect_vector(ev, "VECTOR-COPY", args[0])?;
    let data = ev.heap.vector(id).data.clone();
    let copy = ev.heap.alloc_vector(VectorData::from_values(data));
    Ok(Value::Vector(copy))
}

pub(super) fn vector_length(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "VECTOR-LENGTH", args, 1)?;
    let id = expect_vector(ev, "VECTOR-LENGTH", args[0])?;
    Ok(Value::Int(ev.heap.vector(id).data.len() as i32))
}

pub(super) fn vector_capacity(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "VECTOR-CAPACITY", args, 1)?;
    let id = expect_vector(ev, "VECTOR-CAPACITY", args[0])?;
    Ok(Value::Int(ev.heap.vector(id).capacity as i32))
}

pub(super) fn vector_ref(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "VECTOR-REF", args, 2)?;
    let id = expect_vector(ev, "VECTOR-REF", args[0])?;
    let index = checked_index(ev, "VECTOR-REF", id, args[1])?;
    Ok(ev.heap.vector(id).data[index])
}

pub(super) fn vector_set(ev: &mut Evaluator, _env: ObjId, args: &[Value]) -> EvalResult {
    expect_args(ev, "VECTOR-SET!", args, 3)?;
    let id = expect_vector(ev, "VECTOR-SET!", args[0])?;
    let index = checked_index(ev, "VECTOR-SET!", id, args[1])?;
    ev.heap.vector_mut(id).data[index] = args[2];
    Ok(Value::Nil)
}

fn checked_index(
    ev: &mut Evaluator,
    name: &str,
    id: ObjId,
    value: Value,
) -> Result<usize, Thrown> {
    let index = expect_int(ev, name, value)?;
    let len = ev.heap.vector(id).data.len();
    if index < 0 || index as usize >= len {
        let text = format!("{name}: index {index} out of range for length {len}");
        return Err(ev.throw(ErrorKind::Internal, text));
    }
    Ok(index as usize)
}

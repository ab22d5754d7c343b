//! Ready-made primitive sets.
//!
//! `symbolic_regression` is the arithmetic set used by the classic
//! symbolic-regression demo; `image_ops` works element-wise on 2-D arrays
//! so that intermediate nodes render as pictures.

use super::PrimitiveSet;
use crate::error::{Result, TreeError};
use crate::value::{NdArray, Value};

/// `add`, `sub`, `mul`, `protectedDiv`, `neg`, `cos`, `sin` over one input
/// renamed to `x`.
pub fn symbolic_regression() -> PrimitiveSet {
    let mut pset = PrimitiveSet::new("MAIN", 1);
    pset.add_primitive("add", 2, |a| binary(a, i64::checked_add, |x, y| x + y))
        .add_primitive("sub", 2, |a| binary(a, i64::checked_sub, |x, y| x - y))
        .add_primitive("mul", 2, |a| binary(a, i64::checked_mul, |x, y| x * y))
        .add_primitive("protectedDiv", 2, protected_div)
        .add_primitive("neg", 1, |a| unary(a, |x| -x, Some(i64::checked_neg)))
        .add_primitive("cos", 1, |a| unary(a, f64::cos, None))
        .add_primitive("sin", 1, |a| unary(a, f64::sin, None))
        .rename_arguments(&[("ARG0", "x")]);
    pset
}

/// Element-wise array arithmetic plus a few geometric operations, over one
/// 2-D input renamed to `img`.
pub fn image_ops() -> PrimitiveSet {
    let mut pset = PrimitiveSet::new("IMAGE", 1);
    pset.add_primitive("add", 2, |a| binary(a, i64::checked_add, |x, y| x + y))
        .add_primitive("sub", 2, |a| binary(a, i64::checked_sub, |x, y| x - y))
        .add_primitive("mul", 2, |a| binary(a, i64::checked_mul, |x, y| x * y))
        .add_primitive("protectedDiv", 2, protected_div)
        .add_primitive("neg", 1, |a| unary(a, |x| -x, Some(i64::checked_neg)))
        .add_primitive("abs", 1, |a| unary(a, f64::abs, Some(i64::checked_abs)))
        .add_primitive("transpose", 1, |a| {
            Ok(Value::Array(expect_array(&a[0], "transpose")?.transpose()?))
        })
        .add_primitive("flipH", 1, |a| {
            Ok(Value::Array(expect_array(&a[0], "flipH")?.flip_horizontal()?))
        })
        .add_primitive("flipV", 1, |a| {
            Ok(Value::Array(expect_array(&a[0], "flipV")?.flip_vertical()?))
        })
        .add_primitive("mean", 1, |a| {
            Ok(Value::Float(expect_array(&a[0], "mean")?.mean()))
        })
        .add_primitive("threshold", 2, |a| {
            let img = expect_array(&a[0], "threshold")?;
            let level = expect_number(&a[1], "threshold")?;
            Ok(Value::Array(img.map(|v| if v >= level { 1.0 } else { 0.0 })))
        })
        .add_terminal(Value::Float(0.5), Some("half"))
        .add_terminal(Value::Int(2), None)
        .rename_arguments(&[("ARG0", "img")]);
    pset
}

/// Numeric binary operation with broadcasting between scalars and arrays.
/// Integer pairs stay integral unless `int_op` overflows.
pub fn binary(
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => Ok(match int_op(*a, *b) {
            Some(v) => Value::Int(v),
            None => Value::Float(float_op(*a as f64, *b as f64)),
        }),
        (Value::Array(a), Value::Array(b)) => Ok(Value::Array(a.zip_with(b, float_op)?)),
        (Value::Array(a), scalar) => {
            let s = expect_number(scalar, "arithmetic")?;
            Ok(Value::Array(a.map(|v| float_op(v, s))))
        }
        (scalar, Value::Array(b)) => {
            let s = expect_number(scalar, "arithmetic")?;
            Ok(Value::Array(b.map(|v| float_op(s, v))))
        }
        (a, b) => Ok(Value::Float(float_op(
            expect_number(a, "arithmetic")?,
            expect_number(b, "arithmetic")?,
        ))),
    }
}

/// Numeric unary operation; `int_op` keeps integers integral where given.
pub fn unary(
    args: &[Value],
    float_op: fn(f64) -> f64,
    int_op: Option<fn(i64) -> Option<i64>>,
) -> Result<Value> {
    match (&args[0], int_op) {
        (Value::Int(i), Some(op)) => Ok(match op(*i) {
            Some(v) => Value::Int(v),
            None => Value::Float(float_op(*i as f64)),
        }),
        (Value::Array(a), _) => Ok(Value::Array(a.map(float_op))),
        (v, _) => Ok(Value::Float(float_op(expect_number(v, "arithmetic")?))),
    }
}

/// True division that yields 1 where the divisor is zero. Arrays are
/// protected element by element.
pub fn protected_div(args: &[Value]) -> Result<Value> {
    fn div(x: f64, y: f64) -> f64 {
        if y == 0.0 {
            1.0
        } else {
            x / y
        }
    }
    match (&args[0], &args[1]) {
        (Value::Array(_), _) | (_, Value::Array(_)) => binary(args, |_, _| None, div),
        (_, divisor) if divisor.as_f64() == Some(0.0) => Ok(Value::Int(1)),
        (a, b) => Ok(Value::Float(
            expect_number(a, "protectedDiv")? / expect_number(b, "protectedDiv")?,
        )),
    }
}

fn expect_number(v: &Value, op: &str) -> Result<f64> {
    v.as_f64().ok_or_else(|| {
        TreeError::Eval(format!("{} expects a number, got {}", op, v.type_name()))
    })
}

fn expect_array<'a>(v: &'a Value, op: &str) -> Result<&'a NdArray> {
    match v {
        Value::Array(a) => Ok(a),
        other => Err(TreeError::Eval(format!(
            "{} expects an array, got {}",
            op,
            other.type_name()
        ))),
    }
}

//! Runtime values produced by evaluating expression trees.
//!
//! A primitive set is free to return any of these. The renderer only
//! cares about one question: is the value image-worthy (a decoded image or
//! a numeric array with exactly two dimensions), or should it be shown as
//! text?

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::{Result, TreeError};

/// A dense row-major `f64` array of arbitrary rank. Every constructor
/// checks that `data` holds exactly `shape.iter().product()` elements.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TreeError::Eval(format!(
                "array shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Build a 2-D array from equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(TreeError::Eval("ragged rows in 2-D array".to_string()));
        }
        let data = rows.iter().flatten().copied().collect();
        Self::new(vec![rows.len(), cols], data)
    }

    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn filled(shape: Vec<usize>, value: f64) -> Self {
        let n = shape.iter().product();
        Self {
            shape,
            data: vec![value; n],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at `(row, col)` of a 2-D array.
    pub fn get2(&self, row: usize, col: usize) -> Option<f64> {
        if self.ndim() != 2 || row >= self.shape[0] || col >= self.shape[1] {
            return None;
        }
        self.data.get(row * self.shape[1] + col).copied()
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    pub fn zip_with(&self, other: &NdArray, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.shape != other.shape {
            return Err(TreeError::Eval(format!(
                "shape mismatch: {:?} vs {:?}",
                self.shape, other.shape
            )));
        }
        Ok(Self {
            shape: self.shape.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Grayscale intensities of a decoded image in `0.0..=1.0`, shape `[height, width]`.
    pub fn from_luma(img: &DynamicImage) -> Self {
        let gray = img.to_luma32f();
        let (w, h) = gray.dimensions();
        Self {
            shape: vec![h as usize, w as usize],
            data: gray.pixels().map(|p| f64::from(p[0])).collect(),
        }
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        let mut it = self.data.iter().copied().filter(|v| v.is_finite());
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return f64::NAN;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    pub fn transpose(&self) -> Result<Self> {
        let (rows, cols) = self.dims2()?;
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..cols {
            for r in 0..rows {
                data.push(self.data[r * cols + c]);
            }
        }
        Ok(Self {
            shape: vec![cols, rows],
            data,
        })
    }

    /// Mirror a 2-D array left to right.
    pub fn flip_horizontal(&self) -> Result<Self> {
        let (rows, cols) = self.dims2()?;
        let mut data = Vec::with_capacity(self.data.len());
        for r in 0..rows {
            data.extend(self.data[r * cols..(r + 1) * cols].iter().rev());
        }
        Ok(Self {
            shape: self.shape.clone(),
            data,
        })
    }

    /// Mirror a 2-D array top to bottom.
    pub fn flip_vertical(&self) -> Result<Self> {
        let (rows, cols) = self.dims2()?;
        let mut data = Vec::with_capacity(self.data.len());
        for r in (0..rows).rev() {
            data.extend_from_slice(&self.data[r * cols..(r + 1) * cols]);
        }
        Ok(Self {
            shape: self.shape.clone(),
            data,
        })
    }

    fn dims2(&self) -> Result<(usize, usize)> {
        match self.shape.as_slice() {
            [rows, cols] => Ok((*rows, *cols)),
            other => Err(TreeError::Eval(format!(
                "expected a 2-D array, got shape {:?}",
                other
            ))),
        }
    }

    fn fmt_axis(&self, f: &mut fmt::Formatter<'_>, axis: usize, offset: usize) -> fmt::Result {
        let stride: usize = self.shape[axis + 1..].iter().product();
        write!(f, "[")?;
        for i in 0..self.shape[axis] {
            if i > 0 {
                write!(f, ", ")?;
            }
            if axis + 1 == self.shape.len() {
                write!(f, "{}", format_float(self.data[offset + i]))?;
            } else {
                self.fmt_axis(f, axis + 1, offset + i * stride)?;
            }
        }
        write!(f, "]")
    }
}

impl fmt::Display for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.shape.is_empty() {
            return write!(f, "{}", format_float(self.data.first().copied().unwrap_or(0.0)));
        }
        self.fmt_axis(f, 0, 0)
    }
}

/// A value computed by a tree node.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Array(NdArray),
    Image(Arc<DynamicImage>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
            Value::Image(_) => "image",
        }
    }

    /// True if this value should be depicted as a picture rather than text:
    /// a decoded image, or a numeric array with exactly two dimensions.
    pub fn is_image(&self) -> bool {
        match self {
            Value::Image(_) => true,
            Value::Array(a) => a.ndim() == 2,
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Literal source form, used when a constant terminal formats itself.
    /// The expression lexer reads every scalar literal back to an equal value.
    pub fn literal(&self) -> String {
        match self {
            Value::Text(s) => quote_text(s),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Image(a), Value::Image(b)) => Arc::ptr_eq(a, b) || a.as_bytes() == b.as_bytes(),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Value::Array(v)
    }
}

impl From<DynamicImage> for Value {
    fn from(v: DynamicImage) -> Self {
        Value::Image(Arc::new(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Array(a) => write!(f, "{}", a),
            Value::Image(img) => write!(f, "<image {}x{}>", img.width(), img.height()),
        }
    }
}

/// Floats always carry a fractional part or exponent so they read back as
/// floats: `10.0`, `0.5`, `inf`, `nan`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        let s = if x > 0.0 { "inf" } else { "-inf" };
        s.to_string()
    } else {
        format!("{:?}", x)
    }
}

/// Double-quote `s`, escaping exactly what the expression lexer unescapes.
pub fn quote_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

//! Typed arrays
//!
//! [`TypedArray`] owns a contiguous buffer of one [`ElementType`]. Every
//! variant holds a plain `Vec`, so dropping the array releases the buffer
//! exactly once. [`ArrayView`] is the borrowed counterpart, used for the
//! complex/real reinterpretation that shares storage with its owner.
//!
//! Element access through [`TypedArray::read`] and [`TypedArray::write`] is
//! permissive: the stored value is converted into (or from) whatever
//! [`Element`] type the caller asks for, following these rules:
//!
//! - integers and floats convert with Rust `as` casts through a 64-bit
//!   intermediate (float to integer saturates, wide integers truncate)
//! - complex to real keeps the real part, real to complex sets imaginary 0
//! - writes into a `bint8` array store the value modulo 2

use crate::{ElementType, Error, Result};
use num_complex::{Complex32, Complex64};
use tracing::debug;

/// Run `$body` with `$data` bound to the buffer of whichever variant `$array` holds
///
/// Works for both [`TypedArray`] and [`ArrayView`], which share variant names.
macro_rules! dispatch {
    ($kind:ident, $array:expr, $data:ident => $body:expr) => {
        match $array {
            $kind::UInt8($data) => $body,
            $kind::UInt16($data) => $body,
            $kind::UInt32($data) => $body,
            $kind::UInt64($data) => $body,
            $kind::Int8($data) => $body,
            $kind::Int16($data) => $body,
            $kind::Int32($data) => $body,
            $kind::Int64($data) => $body,
            $kind::Float32($data) => $body,
            $kind::Float64($data) => $body,
            $kind::Bint8($data) => $body,
            $kind::Complex32($data) => $body,
            $kind::Complex64($data) => $body,
        }
    };
}

/// Scalar in its widest form, used to move values between element types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    UInt(u64),
    Int(i64),
    Float(f64),
    Complex(Complex64),
}

impl Value {
    pub fn as_u64(self) -> u64 {
        match self {
            Value::UInt(v) => v,
            Value::Int(v) => v as u64,
            Value::Float(v) => v as u64,
            Value::Complex(v) => v.re as u64,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Value::UInt(v) => v as i64,
            Value::Int(v) => v,
            Value::Float(v) => v as i64,
            Value::Complex(v) => v.re as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Value::UInt(v) => v as f64,
            Value::Int(v) => v as f64,
            Value::Float(v) => v,
            Value::Complex(v) => v.re,
        }
    }

    pub fn as_complex(self) -> Complex64 {
        match self {
            Value::Complex(v) => v,
            other => Complex64::new(other.as_f64(), 0.0),
        }
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Complex(v) => write!(f, "{} + {}i", v.re, v.im),
        }
    }
}

/// Rust types that can be stored in, or read out of, a [`TypedArray`]
pub trait Element: bytemuck::Pod + Send + Sync + 'static {
    /// Element type used when a `Vec<Self>` becomes an array
    const TYPE: ElementType;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Self;

    /// Borrow the buffer if the array stores this Rust type
    fn slice(array: &TypedArray) -> Option<&[Self]>;

    fn slice_mut(array: &mut TypedArray) -> Option<&mut [Self]>;

    fn wrap(data: Vec<Self>) -> TypedArray;
}

macro_rules! impl_element {
    ($type:ty, $variant:ident, $value:ident, $as:ident) => {
        impl Element for $type {
            const TYPE: ElementType = ElementType::$variant;

            fn into_value(self) -> Value {
                Value::$value(self as _)
            }

            fn from_value(value: Value) -> Self {
                value.$as() as $type
            }

            fn slice(array: &TypedArray) -> Option<&[Self]> {
                match array {
                    TypedArray::$variant(data) => Some(data.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(array: &mut TypedArray) -> Option<&mut [Self]> {
                match array {
                    TypedArray::$variant(data) => Some(data.as_mut_slice()),
                    _ => None,
                }
            }

            fn wrap(data: Vec<Self>) -> TypedArray {
                TypedArray::$variant(data)
            }
        }
    };
}

impl_element!(u16, UInt16, UInt, as_u64);
impl_element!(u32, UInt32, UInt, as_u64);
impl_element!(u64, UInt64, UInt, as_u64);
impl_element!(i8, Int8, Int, as_i64);
impl_element!(i16, Int16, Int, as_i64);
impl_element!(i32, Int32, Int, as_i64);
impl_element!(i64, Int64, Int, as_i64);
impl_element!(f32, Float32, Float, as_f64);
impl_element!(f64, Float64, Float, as_f64);

// u8 backs both uint8 and bint8 arrays
impl Element for u8 {
    const TYPE: ElementType = ElementType::UInt8;

    fn into_value(self) -> Value {
        Value::UInt(self as u64)
    }

    fn from_value(value: Value) -> Self {
        value.as_u64() as u8
    }

    fn slice(array: &TypedArray) -> Option<&[Self]> {
        match array {
            TypedArray::UInt8(data) | TypedArray::Bint8(data) => Some(data.as_slice()),
            _ => None,
        }
    }

    fn slice_mut(array: &mut TypedArray) -> Option<&mut [Self]> {
        match array {
            TypedArray::UInt8(data) | TypedArray::Bint8(data) => Some(data.as_mut_slice()),
            _ => None,
        }
    }

    fn wrap(data: Vec<Self>) -> TypedArray {
        TypedArray::UInt8(data)
    }
}

macro_rules! impl_complex_element {
    ($type:ty, $variant:ident, $part:ty) => {
        impl Element for $type {
            const TYPE: ElementType = ElementType::$variant;

            fn into_value(self) -> Value {
                Value::Complex(Complex64::new(self.re as f64, self.im as f64))
            }

            fn from_value(value: Value) -> Self {
                let v = value.as_complex();
                <$type>::new(v.re as $part, v.im as $part)
            }

            fn slice(array: &TypedArray) -> Option<&[Self]> {
                match array {
                    TypedArray::$variant(data) => Some(data.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(array: &mut TypedArray) -> Option<&mut [Self]> {
                match array {
                    TypedArray::$variant(data) => Some(data.as_mut_slice()),
                    _ => None,
                }
            }

            fn wrap(data: Vec<Self>) -> TypedArray {
                TypedArray::$variant(data)
            }
        }
    };
}

impl_complex_element!(Complex32, Complex32, f32);
impl_complex_element!(Complex64, Complex64, f64);

/// Owning, homogeneously typed, contiguous array
#[derive(Debug, Clone)]
pub enum TypedArray {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Bint8(Vec<u8>),
    Complex32(Vec<Complex32>),
    Complex64(Vec<Complex64>),
}

/// Borrowed view over typed elements, never owning the storage
#[derive(Debug, Clone, Copy)]
pub enum ArrayView<'a> {
    UInt8(&'a [u8]),
    UInt16(&'a [u16]),
    UInt32(&'a [u32]),
    UInt64(&'a [u64]),
    Int8(&'a [i8]),
    Int16(&'a [i16]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Float32(&'a [f32]),
    Float64(&'a [f64]),
    Bint8(&'a [u8]),
    Complex32(&'a [Complex32]),
    Complex64(&'a [Complex64]),
}

fn alloc_zeroed<T: Element>(len: usize, ty: ElementType) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { len, ty })?;
    data.resize(len, T::zeroed());
    Ok(data)
}

impl Default for TypedArray {
    /// Zero-length sentinel
    fn default() -> Self {
        TypedArray::UInt8(Vec::new())
    }
}

impl<T: Element> From<Vec<T>> for TypedArray {
    fn from(data: Vec<T>) -> Self {
        T::wrap(data)
    }
}

impl TypedArray {
    /// Allocate a zero-filled array of `len` elements
    pub fn new(len: usize, ty: ElementType) -> Result<Self> {
        Ok(match ty {
            ElementType::UInt8 => TypedArray::UInt8(alloc_zeroed(len, ty)?),
            ElementType::UInt16 => TypedArray::UInt16(alloc_zeroed(len, ty)?),
            ElementType::UInt32 => TypedArray::UInt32(alloc_zeroed(len, ty)?),
            ElementType::UInt64 => TypedArray::UInt64(alloc_zeroed(len, ty)?),
            ElementType::Int8 => TypedArray::Int8(alloc_zeroed(len, ty)?),
            ElementType::Int16 => TypedArray::Int16(alloc_zeroed(len, ty)?),
            ElementType::Int32 => TypedArray::Int32(alloc_zeroed(len, ty)?),
            ElementType::Int64 => TypedArray::Int64(alloc_zeroed(len, ty)?),
            ElementType::Float32 => TypedArray::Float32(alloc_zeroed(len, ty)?),
            ElementType::Float64 => TypedArray::Float64(alloc_zeroed(len, ty)?),
            ElementType::Bint8 => TypedArray::Bint8(alloc_zeroed(len, ty)?),
            ElementType::Complex32 => TypedArray::Complex32(alloc_zeroed(len, ty)?),
            ElementType::Complex64 => TypedArray::Complex64(alloc_zeroed(len, ty)?),
        })
    }

    /// Build a bint8 array; nonzero inputs are stored as 1
    pub fn bint8(data: Vec<u8>) -> Self {
        TypedArray::Bint8(data.into_iter().map(|v| (v != 0) as u8).collect())
    }

    pub fn len(&self) -> usize {
        dispatch!(TypedArray, self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        self.view().element_type()
    }

    /// Size of the buffer in bytes
    pub fn nbytes(&self) -> usize {
        self.len() * self.element_type().size_bytes()
    }

    /// Borrow the whole array as a view
    pub fn view(&self) -> ArrayView<'_> {
        match self {
            TypedArray::UInt8(data) => ArrayView::UInt8(data),
            TypedArray::UInt16(data) => ArrayView::UInt16(data),
            TypedArray::UInt32(data) => ArrayView::UInt32(data),
            TypedArray::UInt64(data) => ArrayView::UInt64(data),
            TypedArray::Int8(data) => ArrayView::Int8(data),
            TypedArray::Int16(data) => ArrayView::Int16(data),
            TypedArray::Int32(data) => ArrayView::Int32(data),
            TypedArray::Int64(data) => ArrayView::Int64(data),
            TypedArray::Float32(data) => ArrayView::Float32(data),
            TypedArray::Float64(data) => ArrayView::Float64(data),
            TypedArray::Bint8(data) => ArrayView::Bint8(data),
            TypedArray::Complex32(data) => ArrayView::Complex32(data),
            TypedArray::Complex64(data) => ArrayView::Complex64(data),
        }
    }

    /// Raw little-endian bytes of the buffer
    pub fn as_bytes(&self) -> &[u8] {
        dispatch!(TypedArray, self, data => bytemuck::cast_slice(data.as_slice()))
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        dispatch!(TypedArray, self, data => bytemuck::cast_slice_mut(data.as_mut_slice()))
    }

    /// Borrow the buffer as `&[T]` when `T` is the stored Rust type
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Read element `index` converted to `T`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn read<T: Element>(&self, index: usize) -> T {
        T::from_value(self.value(index))
    }

    /// Element `index` in its widest scalar form
    pub fn value(&self, index: usize) -> Value {
        dispatch!(TypedArray, self, data => data[index].into_value())
    }

    /// Read an index or offset entry
    pub fn index(&self, index: usize) -> usize {
        self.read::<u64>(index) as usize
    }

    /// Write `value` converted to the stored type at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn write<T: Element>(&mut self, index: usize, value: T) {
        self.write_value(index, value.into_value());
    }

    pub fn write_value(&mut self, index: usize, value: Value) {
        match self {
            TypedArray::Bint8(data) => data[index] = value.as_i64().rem_euclid(2) as u8,
            other => dispatch!(TypedArray, other, data => data[index] = Element::from_value(value)),
        }
    }

    /// Exchange elements `i` and `j`
    pub fn swap(&mut self, i: usize, j: usize) {
        dispatch!(TypedArray, self, data => data.swap(i, j))
    }

    /// Reorder so that element `k` becomes the old element `order[k]`
    ///
    /// `order` may be shorter than the array, which then shrinks to fit.
    pub fn permute(&mut self, order: &[usize]) {
        dispatch!(TypedArray, self, data => {
            let permuted = order.iter().map(|&i| data[i]).collect();
            *data = permuted;
        })
    }

    /// Compare two arrays byte for byte
    ///
    /// Arrays of different length never match; empty arrays match regardless
    /// of type. The first differing index is logged at debug level.
    pub fn equal(a: &TypedArray, b: &TypedArray) -> bool {
        if a.len() != b.len() {
            return false;
        }
        if a.is_empty() {
            return true;
        }
        if a.element_type() != b.element_type() {
            return false;
        }

        let width = a.element_type().size_bytes();
        let mismatch = a
            .as_bytes()
            .chunks_exact(width)
            .zip(b.as_bytes().chunks_exact(width))
            .position(|(x, y)| x != y);

        match mismatch {
            Some(index) => {
                debug!(index, "arrays differ");
                false
            }
            None => true,
        }
    }

    /// Copy into a new array of type `ty`, converting element by element
    pub fn to_type(&self, ty: ElementType) -> Result<TypedArray> {
        if ty == self.element_type() {
            return Ok(self.clone());
        }

        let mut converted = TypedArray::new(self.len(), ty)?;
        for index in 0..self.len() {
            converted.write_value(index, self.value(index));
        }
        Ok(converted)
    }

    /// Reinterpret a complex array as interleaved real parts, sharing storage
    pub fn as_real_view(&self) -> Result<ArrayView<'_>> {
        self.view().as_real_view()
    }

    /// Re-type a float array of interleaved pairs as complex
    ///
    /// This is the inverse of [`TypedArray::as_real_view`] for owned data.
    pub fn from_real_pairs(array: TypedArray) -> Result<TypedArray> {
        if array.len() % 2 != 0 {
            return Err(Error::InvalidMatrix(format!(
                "complex data needs an even number of components, found {}",
                array.len()
            )));
        }

        match array {
            TypedArray::Float32(data) => Ok(TypedArray::Complex32(
                data.chunks_exact(2)
                    .map(|pair| Complex32::new(pair[0], pair[1]))
                    .collect(),
            )),
            TypedArray::Float64(data) => Ok(TypedArray::Complex64(
                data.chunks_exact(2)
                    .map(|pair| Complex64::new(pair[0], pair[1]))
                    .collect(),
            )),
            other => Err(Error::TypeMismatch {
                expected: "floating point",
                found: other.element_type(),
            }),
        }
    }
}

impl PartialEq for TypedArray {
    fn eq(&self, other: &Self) -> bool {
        TypedArray::equal(self, other)
    }
}

impl Eq for TypedArray {}

impl<'a> ArrayView<'a> {
    pub fn len(&self) -> usize {
        dispatch!(ArrayView, self, data => data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ArrayView::UInt8(_) => ElementType::UInt8,
            ArrayView::UInt16(_) => ElementType::UInt16,
            ArrayView::UInt32(_) => ElementType::UInt32,
            ArrayView::UInt64(_) => ElementType::UInt64,
            ArrayView::Int8(_) => ElementType::Int8,
            ArrayView::Int16(_) => ElementType::Int16,
            ArrayView::Int32(_) => ElementType::Int32,
            ArrayView::Int64(_) => ElementType::Int64,
            ArrayView::Float32(_) => ElementType::Float32,
            ArrayView::Float64(_) => ElementType::Float64,
            ArrayView::Bint8(_) => ElementType::Bint8,
            ArrayView::Complex32(_) => ElementType::Complex32,
            ArrayView::Complex64(_) => ElementType::Complex64,
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        dispatch!(ArrayView, *self, data => bytemuck::cast_slice(data))
    }

    /// Complex view as twice as many real components
    pub fn as_real_view(self) -> Result<ArrayView<'a>> {
        match self {
            ArrayView::Complex32(data) => Ok(ArrayView::Float32(bytemuck::cast_slice(data))),
            ArrayView::Complex64(data) => Ok(ArrayView::Float64(bytemuck::cast_slice(data))),
            other => Err(Error::TypeMismatch {
                expected: "complex",
                found: other.element_type(),
            }),
        }
    }

    /// Real view as half as many complex elements
    pub fn as_complex_view(self) -> Result<ArrayView<'a>> {
        let odd_length = || {
            Error::InvalidMatrix(format!(
                "complex view needs an even number of components, found {}",
                self.len()
            ))
        };

        match self {
            ArrayView::Float32(data) => bytemuck::try_cast_slice(data)
                .map(ArrayView::Complex32)
                .map_err(|_| odd_length()),
            ArrayView::Float64(data) => bytemuck::try_cast_slice(data)
                .map(ArrayView::Complex64)
                .map_err(|_| odd_length()),
            other => Err(Error::TypeMismatch {
                expected: "floating point",
                found: other.element_type(),
            }),
        }
    }

    /// Copy the viewed elements into an owning array
    pub fn to_array(self) -> TypedArray {
        match self {
            ArrayView::UInt8(data) => TypedArray::UInt8(data.to_vec()),
            ArrayView::UInt16(data) => TypedArray::UInt16(data.to_vec()),
            ArrayView::UInt32(data) => TypedArray::UInt32(data.to_vec()),
            ArrayView::UInt64(data) => TypedArray::UInt64(data.to_vec()),
            ArrayView::Int8(data) => TypedArray::Int8(data.to_vec()),
            ArrayView::Int16(data) => TypedArray::Int16(data.to_vec()),
            ArrayView::Int32(data) => TypedArray::Int32(data.to_vec()),
            ArrayView::Int64(data) => TypedArray::Int64(data.to_vec()),
            ArrayView::Float32(data) => TypedArray::Float32(data.to_vec()),
            ArrayView::Float64(data) => TypedArray::Float64(data.to_vec()),
            ArrayView::Bint8(data) => TypedArray::Bint8(data.to_vec()),
            ArrayView::Complex32(data) => TypedArray::Complex32(data.to_vec()),
            ArrayView::Complex64(data) => TypedArray::Complex64(data.to_vec()),
        }
    }
}

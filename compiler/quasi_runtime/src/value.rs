//! Host values.
//!
//! Every host value is a shared, reference-counted [`Object`]. Values are
//! only created through the factory methods on [`Value`]:
//!
//! ```text
//! let n = Value::int(2);
//! let s = Value::str("hello");
//! let xs = Value::list(vec![n.clone(), s]);
//! ```
//!
//! Cloning a `Value` shares the object, so identity ([`Value::is`]) and
//! mutation of lists are visible through every clone, the way the host
//! language treats its objects.
//!
//! # Handles
//!
//! Native quote bodies see a value as an opaque `qq_object *`: the raw
//! pointer behind the `Arc`, carrying one strong count per owned reference.
//! [`Value::into_raw`], [`Value::from_raw`] and [`Value::from_borrowed_raw`]
//! convert between the two.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Quoter;

/// The object a [`Value`] refers to.
pub enum Object {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Mutable list; mutation is visible through every clone of the value.
    List(Mutex<Vec<Value>>),
    Quoter(Arc<dyn Quoter>),
}

/// A reference to a host object.
#[derive(Clone)]
pub struct Value(Arc<Object>);

/// Numeric view used for arithmetic and comparison. `bool` counts as an
/// integer, as in the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(
        clippy::cast_precision_loss,
        reason = "int/float mixing follows the host's lossy promotion"
    )]
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }
}

impl Value {
    // Factories

    pub fn none() -> Self {
        Self(Arc::new(Object::None))
    }

    pub fn bool(b: bool) -> Self {
        Self(Arc::new(Object::Bool(b)))
    }

    pub fn int(i: i64) -> Self {
        Self(Arc::new(Object::Int(i)))
    }

    pub fn float(f: f64) -> Self {
        Self(Arc::new(Object::Float(f)))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self(Arc::new(Object::Str(s.into())))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Self(Arc::new(Object::List(Mutex::new(items))))
    }

    pub fn quoter(quoter: impl Quoter + 'static) -> Self {
        Self::from_quoter(Arc::new(quoter))
    }

    pub fn from_quoter(quoter: Arc<dyn Quoter>) -> Self {
        Self(Arc::new(Object::Quoter(quoter)))
    }

    // Inspection

    pub fn object(&self) -> &Object {
        &self.0
    }

    /// Host type name, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self.object() {
            Object::None => "NoneType",
            Object::Bool(_) => "bool",
            Object::Int(_) => "int",
            Object::Float(_) => "float",
            Object::Str(_) => "str",
            Object::List(_) => "list",
            Object::Quoter(_) => "quoter",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.object(), Object::None)
    }

    /// Object identity.
    pub fn is(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_number(&self) -> Option<Number> {
        match *self.object() {
            Object::Bool(b) => Some(Number::Int(i64::from(b))),
            Object::Int(i) => Some(Number::Int(i)),
            Object::Float(f) => Some(Number::Float(f)),
            _ => None,
        }
    }

    /// Integer value of an `int` or `bool`.
    pub fn as_int(&self) -> Option<i64> {
        match self.as_number()? {
            Number::Int(i) => Some(i),
            Number::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.object() {
            Object::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_quoter(&self) -> Option<&Arc<dyn Quoter>> {
        match self.object() {
            Object::Quoter(q) => Some(q),
            _ => None,
        }
    }

    /// Snapshot of a list's items.
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match self.object() {
            Object::List(items) => Some(items.lock().clone()),
            _ => None,
        }
    }

    pub fn list_len(&self) -> Option<usize> {
        match self.object() {
            Object::List(items) => Some(items.lock().len()),
            _ => None,
        }
    }

    pub fn list_get(&self, index: usize) -> Option<Value> {
        match self.object() {
            Object::List(items) => items.lock().get(index).cloned(),
            _ => None,
        }
    }

    /// Replace a list item, returning the previous one.
    pub fn list_set(&self, index: usize, value: Value) -> Option<Value> {
        match self.object() {
            Object::List(items) => items
                .lock()
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, value)),
            _ => None,
        }
    }

    /// Host truthiness.
    pub fn truthy(&self) -> bool {
        match self.object() {
            Object::None => false,
            Object::Bool(b) => *b,
            Object::Int(i) => *i != 0,
            Object::Float(f) => *f != 0.0,
            Object::Str(s) => !s.is_empty(),
            Object::List(items) => !items.lock().is_empty(),
            Object::Quoter(_) => true,
        }
    }

    /// Number of live references to the object.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Host `repr()` of the value.
    pub fn repr(&self) -> String {
        match self.object() {
            Object::None => "None".to_owned(),
            Object::Bool(true) => "True".to_owned(),
            Object::Bool(false) => "False".to_owned(),
            Object::Int(i) => i.to_string(),
            Object::Float(f) => format!("{f:?}"),
            Object::Str(s) => repr_str(s),
            Object::List(items) => {
                let items = items.lock();
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", parts.join(", "))
            }
            Object::Quoter(_) => "<quoter>".to_owned(),
        }
    }

    // Handles

    /// Give up this reference as a raw handle.
    pub fn into_raw(self) -> *const Object {
        Arc::into_raw(self.0)
    }

    /// Raw handle for this value, without transferring a reference.
    pub fn as_ptr(&self) -> *const Object {
        Arc::as_ptr(&self.0)
    }

    /// Take ownership of one reference held by a raw handle.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Value::into_raw`] (possibly via an increment
    /// through [`Value::increment_raw`]) and the caller must own the
    /// reference being taken over.
    #[allow(unsafe_code, reason = "handles cross the native ABI as raw Arc pointers")]
    pub unsafe fn from_raw(ptr: *const Object) -> Self {
        Self(Arc::from_raw(ptr))
    }

    /// New owned reference to the object behind a borrowed handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live handle produced by [`Value::into_raw`] or
    /// [`Value::as_ptr`].
    #[allow(unsafe_code, reason = "handles cross the native ABI as raw Arc pointers")]
    pub unsafe fn from_borrowed_raw(ptr: *const Object) -> Self {
        Arc::increment_strong_count(ptr);
        Self(Arc::from_raw(ptr))
    }

    /// Add one reference to a handle.
    ///
    /// # Safety
    ///
    /// Same as [`Value::from_borrowed_raw`].
    #[allow(unsafe_code, reason = "handles cross the native ABI as raw Arc pointers")]
    pub unsafe fn increment_raw(ptr: *const Object) {
        Arc::increment_strong_count(ptr);
    }

    /// Drop one reference held by a handle.
    ///
    /// # Safety
    ///
    /// The caller must own the reference being released.
    #[allow(unsafe_code, reason = "handles cross the native ABI as raw Arc pointers")]
    pub unsafe fn decrement_raw(ptr: *const Object) {
        Arc::decrement_strong_count(ptr);
    }
}

fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

impl PartialEq for Value {
    #[allow(clippy::float_cmp, reason = "host equality on floats is exact")]
    fn eq(&self, other: &Self) -> bool {
        if self.is(other) {
            return true;
        }
        if let (Some(a), Some(b)) = (self.as_number(), other.as_number()) {
            return match (a, b) {
                (Number::Int(a), Number::Int(b)) => a == b,
                _ => a.to_f64() == b.to_f64(),
            };
        }
        match (self.object(), other.object()) {
            (Object::None, Object::None) => true,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::List(a), Object::List(b)) => *a.lock() == *b.lock(),
            (Object::Quoter(a), Object::Quoter(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

/// Host `str()` of the value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.write_str(s),
            None => f.write_str(&self.repr()),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]

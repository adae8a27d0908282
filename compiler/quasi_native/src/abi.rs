//! The C interface between the host and compiled quote bodies.
//!
//! Compiled code never touches host values directly. It receives opaque
//! `qq_object *` handles and a table of functions ([`QqApi`]) to inspect,
//! create and release them. Handle ownership follows three conventions:
//!
//! - **borrowed**: handles passed into the body and those returned by
//!   `list_get` stay owned by the host; do not `decref` them.
//! - **owned**: handles returned by `none`, `from_*` and `list_new` carry a
//!   reference the body must release or hand on.
//! - **stolen**: `list_set` takes over the reference of its item, and a new
//!   handle assigned to a host variable is taken over by the host.
//!
//! A function that fails records a message and returns `NULL` or `-1`;
//! the body propagates the failure by returning `NULL`, and the message
//! becomes the quote's error. `raise` records a message of the body's own.
//!
//! Each artifact exports one [`QqEntry`] under [`ENTRY_SYMBOL`].

#![allow(
    unsafe_code,
    reason = "C-ABI functions convert raw handles back into host values"
)]
#![allow(
    clippy::not_unsafe_ptr_arg_deref,
    reason = "FFI entry points receive pointers from generated code, which only passes live handles"
)]

use std::cell::RefCell;
use std::ffi::{c_char, c_int, CStr};
use std::ptr;

use quasi_runtime::{Object, Value};

/// Version of the table and entry layouts. Artifacts built against another
/// version are rejected at load time.
pub const ABI_VERSION: u32 = 1;

/// `QqEntry::kind` of a block artifact.
pub const KIND_BLOCK: u32 = 0;
/// `QqEntry::kind` of an expression artifact.
pub const KIND_EXPR: u32 = 1;

/// Exported symbol holding an artifact's [`QqEntry`].
pub const ENTRY_SYMBOL: &str = "__qq_entry";

/// Compiled body: takes the function table and one slot per declared name,
/// returns an owned handle or `NULL` on error.
pub type QqCallFn =
    unsafe extern "C" fn(api: *const QqApi, slots: *mut *const Object) -> *const Object;

/// Function table handed to every compiled body as `qq`.
#[repr(C)]
pub struct QqApi {
    pub abi_version: u32,
    pub incref: extern "C" fn(*const Object),
    pub decref: extern "C" fn(*const Object),
    pub none: extern "C" fn() -> *const Object,
    pub is_none: extern "C" fn(*const Object) -> c_int,
    pub from_int: extern "C" fn(i64) -> *const Object,
    pub as_int: extern "C" fn(*const Object, *mut i64) -> c_int,
    pub from_float: extern "C" fn(f64) -> *const Object,
    pub as_float: extern "C" fn(*const Object, *mut f64) -> c_int,
    pub from_str: extern "C" fn(*const c_char, usize) -> *const Object,
    pub str_data: extern "C" fn(*const Object, *mut usize) -> *const c_char,
    pub list_new: extern "C" fn(usize) -> *const Object,
    pub list_len: extern "C" fn(*const Object) -> isize,
    pub list_get: extern "C" fn(*const Object, usize) -> *const Object,
    pub list_set: extern "C" fn(*const Object, usize, *const Object) -> c_int,
    pub raise: extern "C" fn(*const c_char),
}

/// Table exported by each artifact.
#[repr(C)]
pub struct QqEntry {
    pub abi_version: u32,
    pub kind: u32,
    pub name_count: usize,
    /// `name_count` NUL-terminated names, in slot order.
    pub names: *const *const c_char,
    pub call: QqCallFn,
}

/// C declarations matching [`QqApi`] and [`QqEntry`], prepended to every
/// generated source.
pub const C_HEADER: &str = r"/* Handles passed in and returned by list_get are borrowed.
 * none, from_*, list_new return owned handles; list_set steals its item.
 * A new handle assigned to a host variable is stolen by the host.
 * An expression body evaluates to an owned handle.
 * Return NULL (after qq->raise, or a failing qq call) to report an error.
 * str_data is not NUL-terminated; its length is stored through len.
 */
#include <stddef.h>
#include <stdint.h>

typedef struct qq_object qq_object;

typedef struct qq_api {
    unsigned int abi_version;
    void (*incref)(qq_object *obj);
    void (*decref)(qq_object *obj);
    qq_object *(*none)(void);
    int (*is_none)(qq_object *obj);
    qq_object *(*from_int)(int64_t value);
    int (*as_int)(qq_object *obj, int64_t *out);
    qq_object *(*from_float)(double value);
    int (*as_float)(qq_object *obj, double *out);
    qq_object *(*from_str)(const char *data, size_t len);
    const char *(*str_data)(qq_object *obj, size_t *len);
    qq_object *(*list_new)(size_t len);
    ptrdiff_t (*list_len)(qq_object *list);
    qq_object *(*list_get)(qq_object *list, size_t index);
    int (*list_set)(qq_object *list, size_t index, qq_object *item);
    void (*raise)(const char *message);
} qq_api;

typedef struct qq_entry {
    unsigned int abi_version;
    unsigned int kind;
    size_t name_count;
    const char *const *names;
    qq_object *(*call)(const qq_api *qq, qq_object **slots);
} qq_entry;
";

static QQ_API: QqApi = QqApi {
    abi_version: ABI_VERSION,
    incref: qq_incref,
    decref: qq_decref,
    none: qq_none,
    is_none: qq_is_none,
    from_int: qq_from_int,
    as_int: qq_as_int,
    from_float: qq_from_float,
    as_float: qq_as_float,
    from_str: qq_from_str,
    str_data: qq_str_data,
    list_new: qq_list_new,
    list_len: qq_list_len,
    list_get: qq_list_get,
    list_set: qq_list_set,
    raise: qq_raise,
};

/// The table passed to compiled bodies.
pub fn api() -> &'static QqApi {
    &QQ_API
}

// Error state

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Take the message recorded by the last failing call on this thread.
pub fn take_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

pub(crate) fn clear_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn set_error(message: impl Into<String>) {
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(message.into()));
}

// Handle helpers

/// New reference to the value behind a borrowed handle.
fn borrow(obj: *const Object) -> Option<Value> {
    if obj.is_null() {
        set_error("SystemError: NULL handle");
        return None;
    }
    // SAFETY: non-null handles given to compiled code come from
    // `Value::into_raw`/`Value::as_ptr` and are kept alive by their owner.
    Some(unsafe { Value::from_borrowed_raw(obj) })
}

fn type_mismatch(expected: &str, value: &Value) {
    set_error(format!(
        "TypeError: expected {expected}, got {}",
        value.type_name()
    ));
}

// Table functions

extern "C" fn qq_incref(obj: *const Object) {
    if !obj.is_null() {
        // SAFETY: see `borrow`.
        unsafe { Value::increment_raw(obj) };
    }
}

extern "C" fn qq_decref(obj: *const Object) {
    if !obj.is_null() {
        // SAFETY: the caller owns the reference it releases.
        unsafe { Value::decrement_raw(obj) };
    }
}

extern "C" fn qq_none() -> *const Object {
    Value::none().into_raw()
}

extern "C" fn qq_is_none(obj: *const Object) -> c_int {
    borrow(obj).map_or(-1, |v| c_int::from(v.is_none()))
}

extern "C" fn qq_from_int(value: i64) -> *const Object {
    Value::int(value).into_raw()
}

extern "C" fn qq_as_int(obj: *const Object, out: *mut i64) -> c_int {
    let Some(value) = borrow(obj) else {
        return -1;
    };
    let Some(i) = value.as_int() else {
        type_mismatch("int", &value);
        return -1;
    };
    if !out.is_null() {
        // SAFETY: `out` points to an `int64_t` owned by the caller.
        unsafe { out.write(i) };
    }
    0
}

extern "C" fn qq_from_float(value: f64) -> *const Object {
    Value::float(value).into_raw()
}

extern "C" fn qq_as_float(obj: *const Object, out: *mut f64) -> c_int {
    let Some(value) = borrow(obj) else {
        return -1;
    };
    let Some(number) = value.as_number() else {
        type_mismatch("float", &value);
        return -1;
    };
    if !out.is_null() {
        // SAFETY: `out` points to a `double` owned by the caller.
        unsafe { out.write(number.to_f64()) };
    }
    0
}

extern "C" fn qq_from_str(data: *const c_char, len: usize) -> *const Object {
    if data.is_null() {
        if len == 0 {
            return Value::str("").into_raw();
        }
        set_error("SystemError: NULL string data");
        return ptr::null();
    }
    // SAFETY: the caller passes `len` readable bytes at `data`.
    let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) };
    Value::str(String::from_utf8_lossy(bytes)).into_raw()
}

extern "C" fn qq_str_data(obj: *const Object, len: *mut usize) -> *const c_char {
    if obj.is_null() {
        set_error("SystemError: NULL handle");
        return ptr::null();
    }
    // SAFETY: see `borrow`. The text lives as long as the object, which the
    // caller holds a reference to.
    let object: &Object = unsafe { &*obj };
    let Object::Str(text) = object else {
        if let Some(value) = borrow(obj) {
            type_mismatch("str", &value);
        }
        return ptr::null();
    };
    if !len.is_null() {
        // SAFETY: `len` points to a `size_t` owned by the caller.
        unsafe { len.write(text.len()) };
    }
    text.as_ptr().cast()
}

extern "C" fn qq_list_new(len: usize) -> *const Object {
    Value::list(vec![Value::none(); len]).into_raw()
}

extern "C" fn qq_list_len(list: *const Object) -> isize {
    let Some(value) = borrow(list) else {
        return -1;
    };
    match value.list_len() {
        Some(len) => isize::try_from(len).unwrap_or(isize::MAX),
        None => {
            type_mismatch("list", &value);
            -1
        }
    }
}

extern "C" fn qq_list_get(list: *const Object, index: usize) -> *const Object {
    let Some(value) = borrow(list) else {
        return ptr::null();
    };
    let Some(len) = value.list_len() else {
        type_mismatch("list", &value);
        return ptr::null();
    };
    match value.list_get(index) {
        // The list keeps its own reference, so the pointer outlives `item`.
        Some(item) => item.as_ptr(),
        None => {
            set_error(format!("IndexError: index {index} out of range for list of length {len}"));
            ptr::null()
        }
    }
}

extern "C" fn qq_list_set(list: *const Object, index: usize, item: *const Object) -> c_int {
    if item.is_null() {
        set_error("SystemError: NULL item");
        return -1;
    }
    // SAFETY: `list_set` steals `item`; the reference is ours from here on.
    let item = unsafe { Value::from_raw(item) };
    let Some(value) = borrow(list) else {
        return -1;
    };
    let Some(len) = value.list_len() else {
        type_mismatch("list", &value);
        return -1;
    };
    if value.list_set(index, item).is_none() {
        set_error(format!("IndexError: index {index} out of range for list of length {len}"));
        return -1;
    }
    0
}

extern "C" fn qq_raise(message: *const c_char) {
    if message.is_null() {
        set_error("error raised by native code");
        return;
    }
    // SAFETY: `raise` takes a NUL-terminated C string.
    let message = unsafe { CStr::from_ptr(message) };
    set_error(message.to_string_lossy());
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]

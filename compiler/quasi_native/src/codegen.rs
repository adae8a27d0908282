//! Wrapper generation for native quote bodies.
//!
//! A body is spliced verbatim into a function with the [`QqCallFn`]
//! signature. Every host binding the body mentions becomes a local
//! `qq_object *` initialized from its slot, and is written back to the slot
//! once the body finishes:
//!
//! ```text
//! static qq_object *__qq_call(const qq_api *qq, qq_object **__qq_slots)
//! {
//!     qq_object *a = __qq_slots[0];
//!     {
//! #line 12 "/src/m.py"
//!         a = qq->from_int(3);
//!     }
//!     __qq_slots[0] = a;
//!     return qq->none();
//! }
//! ```
//!
//! Expression bodies become the value of a GNU statement expression whose
//! type is checked at compile time. Their first line is indented to the
//! column the body starts at in the host line, so diagnostics carry host
//! columns.
//!
//! [`QqCallFn`]: crate::abi::QqCallFn

use std::fmt::Write;
use std::path::{Path, PathBuf};

use quasi_rewrite::QuoteKind;

use crate::abi::{ABI_VERSION, C_HEADER, ENTRY_SYMBOL, KIND_BLOCK, KIND_EXPR};

/// Names a body may not bind as host variables.
const RESERVED: &[&str] = &["qq"];

/// Prefix of the wrapper's own identifiers.
const RESERVED_PREFIX: &str = "__qq";

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic",
    "_Bool", "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert",
    "_Thread_local", "asm", "typeof", "__auto_type", "__typeof__", "__attribute__",
];

/// Where a body came from, for `#line` directives.
#[derive(Clone, Debug)]
pub struct Origin<'a> {
    pub file: &'a Path,
    /// Host line the body's first line sits on.
    pub line: u32,
}

/// Identifiers the body uses that name visible host bindings, in order of
/// first use. Comments, string and character literals are skipped.
pub fn referenced_names(body: &str, is_bound: impl Fn(&str) -> bool) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for ident in identifiers(body) {
        if is_declarable(ident) && is_bound(ident) && !names.iter().any(|n| n == ident) {
            names.push(ident.to_owned());
        }
    }
    names
}

fn is_declarable(ident: &str) -> bool {
    !C_KEYWORDS.contains(&ident)
        && !RESERVED.contains(&ident)
        && !ident.starts_with(RESERVED_PREFIX)
}

/// C identifiers outside comments and literals.
fn identifiers(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = memchr::memchr(b'\n', &bytes[i..]).map_or(bytes.len(), |at| i + at);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = memchr::memmem::find(&bytes[i + 2..], b"*/")
                    .map_or(bytes.len(), |at| i + 2 + at + 2);
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    i += if bytes[i] == b'\\' { 2 } else { 1 };
                }
                i += 1;
            }
            b if b == b'_' || b.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && (bytes[i] == b'_' || bytes[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                out.push(&body[start..i]);
            }
            b if b.is_ascii_digit() => {
                // Numeric literal, including suffixes like `10UL` or `0x1f`.
                while i < bytes.len() && (bytes[i] == b'.' || bytes[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    out
}

/// C string literal for `text`.
fn c_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for byte in text.bytes() {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => {
                let _ = write!(out, "\\{byte:03o}");
            }
        }
    }
    out.push('"');
    out
}

/// Complete C translation unit for one quote.
pub fn generate(
    kind: QuoteKind,
    body: &str,
    names: &[String],
    origin: &Origin<'_>,
    body_column: u32,
) -> String {
    let mut out = String::with_capacity(C_HEADER.len() + body.len() + 512);
    out.push_str(C_HEADER);
    out.push('\n');

    out.push_str("static qq_object *__qq_call(const qq_api *qq, qq_object **__qq_slots)\n{\n");
    for (i, name) in names.iter().enumerate() {
        let _ = writeln!(out, "    qq_object *{name} = __qq_slots[{i}];");
    }
    for name in names {
        let _ = writeln!(out, "    (void){name};");
    }

    let line_directive = format!(
        "#line {} {}\n",
        origin.line,
        c_string(&origin.file.to_string_lossy())
    );
    match kind {
        QuoteKind::Block => {
            out.push_str("    {\n");
            out.push_str(&line_directive);
            out.push_str(body);
            if !body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("    }\n");
            write_back(&mut out, names);
            out.push_str("    return qq->none();\n");
        }
        QuoteKind::Expr => {
            out.push_str("    __auto_type __qq_value = ({\n");
            out.push_str(&line_directive);
            out.push_str(&" ".repeat(body_column as usize));
            out.push_str(body);
            out.push_str("\n    ;});\n");
            out.push_str(
                "    _Static_assert(__builtin_types_compatible_p(__typeof__(__qq_value), qq_object *),\n                   \"a quoted C expression must have type qq_object *\");\n",
            );
            write_back(&mut out, names);
            out.push_str("    return __qq_value;\n");
        }
    }
    out.push_str("}\n\n");

    out.push_str("static const char *const __qq_names[] = {");
    for name in names {
        let _ = write!(out, "{}, ", c_string(name));
    }
    out.push_str("NULL};\n\n");

    let kind_tag = match kind {
        QuoteKind::Block => KIND_BLOCK,
        QuoteKind::Expr => KIND_EXPR,
    };
    let _ = writeln!(
        out,
        "const qq_entry {ENTRY_SYMBOL} = {{{ABI_VERSION}u, {kind_tag}u, {}, __qq_names, __qq_call}};",
        names.len()
    );
    out
}

fn write_back(out: &mut String, names: &[String]) {
    for (i, name) in names.iter().enumerate() {
        let _ = writeln!(out, "    __qq_slots[{i}] = {name};");
    }
}

/// Everything needed to build one quote.
#[derive(Clone, Debug)]
pub struct CompilationUnit {
    pub kind: QuoteKind,
    pub module: String,
    pub body_hash: String,
    pub interface_tag: String,
    pub generated_source: String,
    /// Where the generated source is written when kept.
    pub source_path: PathBuf,
    /// Canonical artifact path.
    pub artifact_path: PathBuf,
    pub compile_flags: Vec<String>,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]

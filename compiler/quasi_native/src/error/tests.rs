use std::io;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use quasi_runtime::QuoteError;

use super::{BuildError, CacheError, LoadError};

#[test]
fn compilation_keeps_the_diagnostics() {
    let err: QuoteError = BuildError::Compilation {
        compiler: "cc".to_owned(),
        diagnostics: "m.py:3:5: error: expected ';'".to_owned(),
    }
    .into();
    match err {
        QuoteError::Compilation { diagnostics } => {
            assert_eq!(diagnostics, "m.py:3:5: error: expected ';'");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_compiler_is_a_compilation_error() {
    let err: QuoteError = BuildError::CompilerNotFound.into();
    assert!(matches!(err, QuoteError::Compilation { ref diagnostics } if diagnostics.contains("QUASI_CC")));
}

#[test]
fn load_errors_name_the_artifact() {
    let path = PathBuf::from("/src/_qq_expr_m_x_t.so");
    let err: QuoteError = LoadError::AbiMismatch {
        path: path.clone(),
        found: 7,
        expected: 1,
    }
    .into();
    match err {
        QuoteError::Load { path: got, message } => {
            assert_eq!(got, path);
            assert!(message.ends_with("was built for ABI version 7, expected 1"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn cache_errors_unwrap_their_cause() {
    let err: QuoteError = CacheError::from(LoadError::Missing {
        path: PathBuf::from("a.so"),
    })
    .into();
    assert!(matches!(err, QuoteError::Load { .. }));

    let err: QuoteError = CacheError::Io {
        path: PathBuf::from("dir"),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    }
    .into();
    assert_eq!(err.to_string(), "dir: denied");
}

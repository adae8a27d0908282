use std::fs;

use super::load_quote;
use crate::LoadError;

#[test]
fn missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("_qq_expr_m_x_t.so");
    let err = load_quote(&path).unwrap_err();
    assert!(matches!(err, LoadError::Missing { .. }));
    assert_eq!(err.path(), &path);
}

#[test]
fn directory_is_not_an_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_quote(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::Missing { .. }));
}

#[test]
fn garbage_is_rejected_by_the_dynamic_linker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.so");
    fs::write(&path, b"this is not a shared object").unwrap();
    let err = load_quote(&path).unwrap_err();
    assert!(matches!(err, LoadError::Open { .. }), "{err}");
}

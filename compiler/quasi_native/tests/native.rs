//! End-to-end tests against the host's C compiler.
//!
//! Each test returns early when no compiler can be found.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]

use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use quasi_native::{BuildCache, NativeConfig, NativeQuoter, Toolchain};
use quasi_runtime::dispatch::{quote_block, quote_expr};
use quasi_runtime::{Frame, QuoteError, Value};

fn have_compiler() -> bool {
    match Toolchain::detect() {
        Ok(_) => true,
        Err(err) => {
            eprintln!("skipping: {err}");
            false
        }
    }
}

fn module_frame(dir: &Path, quoter: NativeQuoter) -> Frame {
    let mut frame = Frame::module("m", dir.join("m.py")).with_line(3);
    frame.set("c", Value::quoter(quoter));
    frame
}

#[test]
fn block_reassigns_a_binding_and_hands_over_its_reference() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(BuildCache::new());
    let mut frame = module_frame(dir.path(), NativeQuoter::new(Arc::clone(&cache)));

    let old = Value::int(1);
    let sentinel = Value::list(vec![Value::str("sentinel")]);
    frame.set("a", old.clone());
    frame.set("sentinel", sentinel.clone());
    assert_eq!(sentinel.ref_count(), 2);

    quote_block(
        &mut frame,
        "c",
        "    qq->incref(sentinel);\n    a = sentinel;\n",
        0,
    )
    .unwrap();

    let a = frame.get("a").unwrap();
    assert!(a.is(&sentinel));
    drop(a);
    assert_eq!(sentinel.ref_count(), 3);
    assert_eq!(old.ref_count(), 1);
    assert_eq!(cache.stats().builds, 1);
}

#[test]
fn expression_value_is_returned() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(BuildCache::new());
    let mut frame = module_frame(dir.path(), NativeQuoter::new(Arc::clone(&cache)));
    frame.set("a", Value::int(20));

    let body = "({ int64_t v; qq->as_int(a, &v) ? NULL : qq->from_int(v + 22); })";
    let value = quote_expr(&mut frame, "c", body, 8).unwrap();
    assert_eq!(value.as_int(), Some(42));

    // Same site again: served from memory with the current binding.
    frame.set("a", Value::int(0));
    let value = quote_expr(&mut frame, "c", body, 8).unwrap();
    assert_eq!(value.as_int(), Some(22));
    let stats = cache.stats();
    assert_eq!((stats.builds, stats.memory_hits), (1, 1));
}

#[test]
fn artifacts_are_reused_across_caches() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let body = "qq->from_int(7)";

    let first = Arc::new(BuildCache::new());
    let mut frame = module_frame(dir.path(), NativeQuoter::new(Arc::clone(&first)));
    quote_expr(&mut frame, "c", body, 0).unwrap();
    assert_eq!(first.stats().builds, 1);

    let second = Arc::new(BuildCache::new());
    let mut frame = module_frame(dir.path(), NativeQuoter::new(Arc::clone(&second)));
    let value = quote_expr(&mut frame, "c", body, 0).unwrap();
    assert_eq!(value.as_int(), Some(7));
    assert_eq!(second.stats().builds, 0);
    assert_eq!(second.stats().disk_hits, 1);
}

#[test]
fn discarded_artifacts_leave_nothing_behind() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let quoter = NativeQuoter::with_config(
        NativeConfig::new().with_compiled_artifact(false),
        Arc::new(BuildCache::new()),
    );
    let mut frame = module_frame(dir.path(), quoter);

    let value = quote_expr(&mut frame, "c", "qq->none()", 0).unwrap();
    assert!(value.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn expression_of_the_wrong_type_does_not_compile() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(BuildCache::new());
    let mut frame = module_frame(dir.path(), NativeQuoter::new(Arc::clone(&cache)));

    let err = quote_expr(&mut frame, "c", "1 + 2", 4).unwrap_err();
    assert!(matches!(err, QuoteError::Compilation { .. }), "{err:?}");
    assert!(cache.is_empty());
}

#[test]
fn raised_errors_come_back_and_roll_back_assignments() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut frame = module_frame(dir.path(), NativeQuoter::new(Arc::new(BuildCache::new())));
    frame.set("a", Value::int(1));

    let body = "    a = qq->from_int(2);\n    qq->raise(\"ValueError: no\");\n    return NULL;\n";
    match quote_block(&mut frame, "c", body, 0).unwrap_err() {
        QuoteError::Native { message } => assert_eq!(message, "ValueError: no"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(frame.get("a").unwrap().as_int(), Some(1));
}

#[test]
fn compile_args_change_the_build() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let body = "qq->from_int(VALUE)";
    let quoter = |value: i64| {
        NativeQuoter::with_config(
            NativeConfig::new().with_compile_args([format!("-DVALUE={value}")]),
            Arc::new(BuildCache::new()),
        )
    };

    let mut frame = module_frame(dir.path(), quoter(1));
    assert_eq!(quote_expr(&mut frame, "c", body, 0).unwrap().as_int(), Some(1));
    let mut frame = module_frame(dir.path(), quoter(2));
    assert_eq!(quote_expr(&mut frame, "c", body, 0).unwrap().as_int(), Some(2));
}

#[test]
fn shared_artifact_runs_where_a_declared_name_is_unbound() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(BuildCache::new());
    let body = "    for (int n = 0; n < 1; n++) { }\n";

    let mut bound = module_frame(dir.path(), NativeQuoter::new(Arc::clone(&cache)));
    bound.set("n", Value::int(5));
    quote_block(&mut bound, "c", body, 0).unwrap();
    assert_eq!(bound.get("n").unwrap().as_int(), Some(5));

    let mut unbound = module_frame(dir.path(), NativeQuoter::new(Arc::clone(&cache)));
    quote_block(&mut unbound, "c", body, 0).unwrap();
    assert!(unbound.get("n").is_none());
    let stats = cache.stats();
    assert_eq!((stats.builds, stats.memory_hits), (1, 1));
}

#[test]
fn expression_diagnostics_point_at_the_body_column() {
    if !have_compiler() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let mut frame = module_frame(dir.path(), NativeQuoter::new(Arc::new(BuildCache::new())));

    // x = [$c|undefined_name_zz|]
    let err = quote_expr(&mut frame, "c", "undefined_name_zz", 4).unwrap_err();
    let QuoteError::Compilation { diagnostics } = err else {
        panic!("unexpected {err:?}");
    };
    assert!(diagnostics.contains("m.py:3:9:"), "{diagnostics}");
}

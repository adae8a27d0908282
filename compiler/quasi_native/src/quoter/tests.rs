use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use quasi_rewrite::{find_sites, QuoteKind};
use quasi_runtime::{Capabilities, ExecutionContext, Frame, QuoteError, Quoter, Value};

use super::{module_stem, NativeConfig, NativeQuoter};
use crate::fingerprint::interface_tag;
use crate::BuildCache;

fn frame_in(dir: &Path) -> Frame {
    let mut frame = Frame::module("pkg.m", dir.join("m.py")).with_line(4);
    frame.set("a", Value::int(1));
    frame.set("b", Value::str("two"));
    frame
}

#[test]
fn config_defaults_keep_only_the_artifact() {
    let config = NativeConfig::default();
    assert!(config.extra_compile_args.is_empty());
    assert!(!config.keep_generated_source);
    assert!(config.keep_compiled_artifact);

    let config = NativeConfig::new()
        .with_compile_args(["-DX=1", "-lm"])
        .with_generated_source(true)
        .with_compiled_artifact(false);
    assert_eq!(config.extra_compile_args, ["-DX=1", "-lm"]);
    assert!(config.keep_generated_source);
    assert!(!config.keep_compiled_artifact);
}

#[test]
fn supports_both_forms() {
    let quoter = NativeQuoter::new(Arc::new(BuildCache::new()));
    assert_eq!(
        quoter.capabilities(),
        Capabilities::QUOTE_BLOCK | Capabilities::QUOTE_EXPR
    );
}

#[test]
fn module_stem_comes_from_the_file() {
    let mut frame = Frame::module("pkg.m", "/src/pkg/m.py");
    assert_eq!(module_stem(&ExecutionContext::new(&mut frame)), "m");

    let mut frame = Frame::module("anon", "");
    assert_eq!(module_stem(&ExecutionContext::new(&mut frame)), "anon");
}

#[test]
fn block_unit_points_at_the_line_after_with() {
    let dir = tempfile::tempdir().unwrap();
    let mut frame = frame_in(dir.path());
    let ctx = ExecutionContext::new(&mut frame);
    let quoter = NativeQuoter::with_config(
        NativeConfig::new().with_compile_args(["-DFAST"]),
        Arc::new(BuildCache::new()),
    );

    let unit = quoter.compilation_unit(QuoteKind::Block, "    a = qq->none();\n", &ctx, 0);
    assert_eq!(unit.kind, QuoteKind::Block);
    assert_eq!(unit.module, "m");
    assert_eq!(unit.interface_tag, interface_tag(&["-DFAST".to_owned()]));
    assert_eq!(unit.compile_flags, ["-DFAST"]);
    assert_eq!(unit.artifact_path.parent(), Some(dir.path()));
    assert_eq!(unit.source_path.extension().unwrap(), "c");

    let line = format!("#line 5 \"{}\"", dir.path().join("m.py").display());
    assert!(unit.generated_source.contains(&line));
    assert!(unit.generated_source.contains("qq_object *a = __qq_slots[0];"));
    assert!(!unit.generated_source.contains("qq_object *b"));
}

#[test]
fn block_unit_lines_follow_blank_and_comment_lines() {
    let source = "with $c:\n\n# set up\n    a = qq->none();\n";
    let site = find_sites(source).unwrap().remove(0);
    let dir = tempfile::tempdir().unwrap();
    let mut frame = frame_in(dir.path()).with_line(site.line);
    let ctx = ExecutionContext::new(&mut frame).with_quoter("c");
    let quoter = NativeQuoter::new(Arc::new(BuildCache::new()));

    let unit = quoter.compilation_unit(site.kind, &site.body, &ctx, site.col_offset);
    let directive = format!(
        "#line {} \"{}\"\n\n# set up\n    a = qq->none();\n",
        site.body_line,
        dir.path().join("m.py").display()
    );
    assert!(unit.generated_source.contains(&directive), "{}", unit.generated_source);
}

#[test]
fn expr_unit_starts_the_body_past_the_quoter_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut frame = frame_in(dir.path());
    let quoter = NativeQuoter::new(Arc::new(BuildCache::new()));
    let file = dir.path().join("m.py");

    // y = 1; [$cc|b|]
    let ctx = ExecutionContext::new(&mut frame).with_quoter("cc");
    let unit = quoter.compilation_unit(QuoteKind::Expr, "b", &ctx, 7);
    let line = format!("#line 4 \"{}\"\n            b\n", file.display());
    assert!(unit.generated_source.contains(&line), "{}", unit.generated_source);
    assert!(unit.generated_source.contains("qq_object *b = __qq_slots[0];"));
    drop(ctx);

    let ctx = ExecutionContext::new(&mut frame);
    let unit = quoter.compilation_unit(QuoteKind::Expr, "b", &ctx, 6);
    let line = format!("#line 4 \"{}\"\n      b\n", file.display());
    assert!(unit.generated_source.contains(&line));
}

#[test]
fn identical_bodies_share_an_artifact_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut frame = frame_in(dir.path());
    let ctx = ExecutionContext::new(&mut frame);
    let quoter = NativeQuoter::new(Arc::new(BuildCache::new()));

    let first = quoter.compilation_unit(QuoteKind::Expr, "a", &ctx, 0);
    let again = quoter.compilation_unit(QuoteKind::Expr, "a", &ctx, 12);
    let block = quoter.compilation_unit(QuoteKind::Block, "a", &ctx, 0);
    assert_eq!(first.artifact_path, again.artifact_path);
    assert_ne!(first.artifact_path, block.artifact_path);
}

#[cfg(unix)]
mod fake_compiler {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use quasi_runtime::{ExecutionContext, QuoteError, Quoter};

    use super::frame_in;
    use crate::{BuildCache, NativeConfig, NativeQuoter, Toolchain};

    fn script(dir: &Path, text: &str) -> Toolchain {
        let path = dir.join("fake-cc");
        fs::write(&path, format!("#!/bin/sh\n{text}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        Toolchain::new(path.to_string_lossy())
    }

    #[test]
    fn compiler_errors_surface_and_nothing_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(BuildCache::new());
        let quoter = NativeQuoter::new(Arc::clone(&cache))
            .with_toolchain(script(dir.path(), "echo 'm.py:5:5: error: bad' >&2; exit 1"));
        let mut frame = frame_in(dir.path());
        let mut ctx = ExecutionContext::new(&mut frame);

        match quoter.quote_block("    a = 1;\n", &mut ctx, 0).unwrap_err() {
            QuoteError::Compilation { diagnostics } => {
                assert_eq!(diagnostics, "m.py:5:5: error: bad");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(cache.is_empty());
        assert!(!ctx.has_pending());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name != "fake-cc")
            .collect();
        assert_eq!(leftovers, Vec::<String>::new());
    }

    #[test]
    fn kept_source_is_written_beside_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let quoter = NativeQuoter::with_config(
            NativeConfig::new().with_generated_source(true),
            Arc::new(BuildCache::new()),
        )
        .with_toolchain(script(dir.path(), "exit 1"));
        let mut frame = frame_in(dir.path());
        let mut ctx = ExecutionContext::new(&mut frame);

        let unit = quoter.compilation_unit(quasi_rewrite::QuoteKind::Expr, "a", &ctx, 0);
        assert!(quoter.quote_expr("a", &mut ctx, 0).is_err());
        assert_eq!(
            fs::read_to_string(&unit.source_path).unwrap(),
            unit.generated_source
        );
    }

    #[test]
    fn output_that_does_not_load_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(BuildCache::new());
        let writes_garbage = r#"while [ "$1" != "-o" ]; do shift; done; echo garbage > "$2""#;
        let quoter = NativeQuoter::new(Arc::clone(&cache))
            .with_toolchain(script(dir.path(), writes_garbage));
        let mut frame = frame_in(dir.path());
        let mut ctx = ExecutionContext::new(&mut frame);

        let err = quoter.quote_expr("a", &mut ctx, 0).unwrap_err();
        assert!(matches!(err, QuoteError::Load { .. }), "{err:?}");
        assert!(cache.is_empty());
        assert_eq!(cache.stats().builds, 1);
    }
}

#[test]
fn missing_compiler_is_a_compilation_error() {
    let dir = tempfile::tempdir().unwrap();
    let quoter = NativeQuoter::new(Arc::new(BuildCache::new()))
        .with_toolchain(crate::Toolchain::new("quasi-no-such-compiler"));
    let mut frame = frame_in(dir.path());
    let mut ctx = ExecutionContext::new(&mut frame);

    let err = quoter.quote_expr("a", &mut ctx, 0).unwrap_err();
    match err {
        QuoteError::Compilation { diagnostics } => {
            assert!(diagnostics.contains("quasi-no-such-compiler"), "{diagnostics}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

use std::fs;
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use crate::{
    Capabilities, ExecutionContext, Frame, FromFile, HostQuoter, QuoteError, Quoter, Value,
};

/// Remembers the last body it was handed.
#[derive(Default)]
struct Echo {
    last: Mutex<Option<(String, u32)>>,
}

impl Quoter for Echo {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn quote_block(
        &self,
        body: &str,
        _ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<(), QuoteError> {
        *self.last.lock() = Some((body.to_owned(), col_offset));
        Ok(())
    }

    fn quote_expr(
        &self,
        body: &str,
        _ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<Value, QuoteError> {
        *self.last.lock() = Some((body.to_owned(), col_offset));
        Ok(Value::none())
    }
}

fn frame_in(dir: &tempfile::TempDir) -> Frame {
    Frame::module("m", dir.path().join("m.py"))
}

#[test]
fn expression_reads_relative_to_module() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("calc.py"), "a * 3").unwrap();
    let mut frame = frame_in(&dir);
    frame.set("a", Value::int(5));

    let quoter = FromFile::new(HostQuoter);
    let mut ctx = ExecutionContext::new(&mut frame);
    let value = quoter.quote_expr("calc.py", &mut ctx, 0).unwrap();
    assert_eq!(value, Value::int(15));
}

#[test]
fn expression_contents_are_passed_unchanged_with_the_site_column() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("body.c"), "x + 1").unwrap();
    let echo = Arc::new(Echo::default());
    let quoter = FromFile::wrap(echo.clone());

    let mut frame = frame_in(&dir);
    let mut ctx = ExecutionContext::new(&mut frame);
    quoter.quote_expr(" body.c ", &mut ctx, 6).unwrap();
    assert_eq!(
        echo.last.lock().clone(),
        Some(("x + 1".to_owned(), 6))
    );
}

#[test]
fn block_names_one_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("setup.py"), "b = 2\nc = b + 1\n").unwrap();
    let mut frame = frame_in(&dir);

    let quoter = FromFile::new(HostQuoter);
    let mut ctx = ExecutionContext::new(&mut frame);
    quoter.quote_block("\n    setup.py\n\n", &mut ctx, 4).unwrap();
    ctx.commit();
    drop(ctx);
    assert_eq!(frame.get("c"), Some(Value::int(3)));
}

#[test]
fn block_contents_are_passed_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("raw.txt"), "  keep\n").unwrap();
    let echo = Arc::new(Echo::default());
    let quoter = FromFile::wrap(echo.clone());

    let mut frame = frame_in(&dir);
    let mut ctx = ExecutionContext::new(&mut frame);
    quoter.quote_block("    raw.txt\n", &mut ctx, 4).unwrap();
    assert_eq!(echo.last.lock().clone(), Some(("  keep\n".to_owned(), 4)));
}

#[test]
fn block_with_several_lines_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut frame = frame_in(&dir);
    let quoter = FromFile::new(Echo::default());
    let mut ctx = ExecutionContext::new(&mut frame);

    let err = quoter.quote_block("    a.py\n    b.py\n", &mut ctx, 4).unwrap_err();
    assert!(matches!(err, QuoteError::Body { .. }));
    let err = quoter.quote_block("\n\n", &mut ctx, 4).unwrap_err();
    assert!(matches!(err, QuoteError::Body { .. }));
}

#[test]
fn absolute_paths_are_used_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let other = tempfile::tempdir().unwrap();
    let file = other.path().join("abs.py");
    fs::write(&file, "'far'").unwrap();

    let mut frame = frame_in(&dir);
    let quoter = FromFile::new(HostQuoter);
    let mut ctx = ExecutionContext::new(&mut frame);
    let value = quoter
        .quote_expr(&file.display().to_string(), &mut ctx, 0)
        .unwrap();
    assert_eq!(value, Value::str("far"));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut frame = frame_in(&dir);
    let quoter = FromFile::new(HostQuoter);
    let mut ctx = ExecutionContext::new(&mut frame);

    let err = quoter.quote_expr("nowhere.py", &mut ctx, 0).unwrap_err();
    match err {
        QuoteError::Io { path, .. } => assert_eq!(path, dir.path().join("nowhere.py")),
        other => panic!("expected an io error, got {other:?}"),
    }
}

#[test]
fn capabilities_follow_the_wrapped_quoter() {
    assert_eq!(
        FromFile::new(HostQuoter).capabilities(),
        Capabilities::QUOTE_BLOCK | Capabilities::QUOTE_EXPR
    );
}

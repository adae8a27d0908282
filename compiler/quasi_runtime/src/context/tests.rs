use pretty_assertions::assert_eq;

use crate::{ExecutionContext, Frame, Value};

fn function_frame() -> Frame {
    let module = Frame::module("m", "/src/m.py");
    module.set_global("__name__", Value::str("m"));
    module.set_global("g", Value::int(1));
    module.set_global("shadowed", Value::str("global"));
    let mut frame = Frame::function(&module, &["a", "shadowed"]);
    frame.set("a", Value::int(2));
    frame.set("shadowed", Value::str("local"));
    frame
}

#[test]
fn bindings_shadow_globals_and_hide_dunders() {
    let mut frame = function_frame();
    let ctx = ExecutionContext::new(&mut frame);
    let bindings = ctx.bindings();
    let names: Vec<_> = bindings.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["g", "shadowed", "a"]);
    assert_eq!(bindings["shadowed"], Value::str("local"));
    assert_eq!(ctx.get("__name__"), None);
}

#[test]
fn staged_writes_are_visible_to_the_context_only() {
    let mut frame = function_frame();
    {
        let mut ctx = ExecutionContext::new(&mut frame);
        ctx.set("a", Value::int(5));
        assert_eq!(ctx.get("a"), Some(Value::int(5)));
        assert_eq!(ctx.bindings()["a"], Value::int(5));
        assert!(ctx.has_pending());
        assert_eq!(ctx.frame().get("a"), Some(Value::int(2)));
    }
    assert_eq!(frame.get("a"), Some(Value::int(2)));
}

#[test]
fn commit_updates_mapping_and_fast_slots() {
    let mut frame = function_frame();
    let mut ctx = ExecutionContext::new(&mut frame);
    ctx.set("a", Value::int(5));
    ctx.set("fresh", Value::str("new"));
    assert_eq!(ctx.pending().collect::<Vec<_>>(), vec!["a", "fresh"]);
    ctx.commit();
    assert!(!ctx.has_pending());

    assert_eq!(frame.get("a"), Some(Value::int(5)));
    assert_eq!(frame.locals().get("fresh"), Some(&Value::str("new")));
}

#[test]
fn module_level_commit_writes_globals() {
    let mut frame = Frame::module("m", "/src/m.py");
    let mut ctx = ExecutionContext::new(&mut frame);
    ctx.set("x", Value::int(1));
    ctx.commit();
    assert_eq!(frame.globals().read().get("x"), Some(&Value::int(1)));
}

#[test]
fn context_reports_site_location() {
    let mut frame = Frame::module("pkg.mod", "/src/pkg/mod.py").with_line(7);
    let ctx = ExecutionContext::new(&mut frame);
    assert_eq!(ctx.module_name(), "pkg.mod");
    assert_eq!(ctx.line(), 7);
    assert_eq!(ctx.filename(), std::path::Path::new("/src/pkg/mod.py"));
}

//! End-to-end tests for semantic analysis.
//!
//! Each test parses Tern sources into one forest and runs the full
//! register, resolve and check pipeline over it.

use pretty_assertions::assert_eq;
use tern::frontend::ast::{ExprKind, Forest, FuncId, Visibility};
use tern::frontend::module::parse_source;
use tern::{analyze, Analysis, Error};

fn load(sources: &[(&str, &str)]) -> Forest {
    let mut forest = Forest::new();
    for (path, source) in sources {
        parse_source(&mut forest, path, source).unwrap();
    }
    forest
}

fn analyze_ok(forest: &Forest) -> Analysis {
    match analyze(forest) {
        Ok(analysis) => analysis,
        Err(err) => panic!("analysis failed: {}", err),
    }
}

fn analyze_err(source: &str) -> Error {
    let forest = load(&[("test.tn", source)]);
    analyze(&forest).unwrap_err()
}

fn callees(forest: &Forest, id: FuncId) -> Vec<FuncId> {
    let mut found = Vec::new();
    if let Some(body) = &forest.function(id).body {
        body.visit_exprs(&mut |expr| {
            if let ExprKind::Call { callee, .. } = &expr.kind {
                found.extend(callee.get().copied());
            }
        });
    }
    found
}

#[test]
fn test_calls_bind_to_one_function() {
    let forest = load(&[(
        "test.tn",
        "package test; int foo(int x,int y){return x+y-42;} \
         int bar(bool b){if(b) return foo(123,456); return foo(42,15);}",
    )]);
    let analysis = analyze_ok(&forest);
    let bar = FuncId::new(0, 1);
    assert_eq!(callees(&forest, bar), vec![FuncId::new(0, 0); 2]);
    assert_eq!(forest.function(callees(&forest, bar)[0]).name.name, "foo");
    assert_eq!(analysis.untyped_expressions(&forest), 0);
}

#[test]
fn test_cross_package_aliases() {
    let forest = load(&[
        (
            "a.tn",
            "package test.a;\nimport test.b.baz as bar;\nexport int foo(int x) { return bar(x) + 1; }",
        ),
        (
            "b.tn",
            "package test.b;\nimport test.a.foo;\nexport int baz(int y) { return y; }\nint twice(int z) { return foo(z) * 2; }",
        ),
    ]);
    let analysis = analyze_ok(&forest);
    assert_eq!(callees(&forest, FuncId::new(0, 0)), vec![FuncId::new(1, 0)]);
    assert_eq!(callees(&forest, FuncId::new(1, 1)), vec![FuncId::new(0, 0)]);
    assert_eq!(analysis.untyped_expressions(&forest), 0);
}

#[test]
fn test_duplicate_struct_in_either_order() {
    let first = analyze_err("package test;\nstruct Point{int x;int y;}\nstruct Point{int x;int y;int z;}");
    assert_eq!(
        first.to_string(),
        "Struct 'test.Point' conflicts with other declarations.\ntest.tn:2:1: notice: Struct 'test.Point'"
    );
    assert_eq!(first.span().map(|s| (s.line, s.column)), Some((3, 1)));

    let second = analyze_err("package test;\nstruct Point{int x;int y;int z;}\nstruct Point{int x;int y;}");
    assert_eq!(
        second.to_string(),
        "Struct 'test.Point' conflicts with other declarations.\ntest.tn:2:1: notice: Struct 'test.Point'"
    );
}

#[test]
fn test_duplicate_struct_across_files() {
    let forest = load(&[
        ("one.tn", "package test;\nstruct Point {}"),
        ("two.tn", "package test;\n\nstruct Point {}"),
    ]);
    let err = analyze(&forest).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Struct 'test.Point' conflicts with other declarations.\none.tn:2:1: notice: Struct 'test.Point'"
    );
    let span = err.span().unwrap();
    assert_eq!((forest.path(span.file_id), span.line), ("two.tn", 3));
}

#[test]
fn test_unused_argument() {
    let err = analyze_err("package test; int foo(int x){return 5;}");
    assert_eq!(err.to_string(), "Variable 'x' is never used");
}

#[test]
fn test_mutual_auto_recursion() {
    let err = analyze_err("package test; auto foo(){return bar();} auto bar(){return foo();}");
    assert_eq!(err.to_string(), "Can't return value of incomplete type");
}

#[test]
fn test_default_argument_order() {
    let err = analyze_err("package test; int foo(int x=42,int y){return x+y;}");
    assert_eq!(
        err.to_string(),
        "Argument 'y' has no default value while previous argument 'x' has"
    );
}

#[test]
fn test_visibility_follows_sections() {
    let forest = load(&[(
        "test.tn",
        "package test;\n\
         int a() { return 1; }\n\
         private:\n\
         int b() { return 2; }\n\
         public int c() { return 3; }\n\
         struct S {}\n\
         export:\n\
         int d() { return 4; }\n\
         extern int e();",
    )]);
    analyze_ok(&forest);
    let file = forest.file(0);
    let functions: Vec<Visibility> = file.functions.iter().map(|f| f.visibility()).collect();
    assert_eq!(
        functions,
        vec![
            Visibility::Default,
            Visibility::Private,
            Visibility::Public,
            Visibility::Export,
            Visibility::Extern,
        ]
    );
    assert_eq!(file.structs[0].visibility(), Visibility::Private);
}

#[test]
fn test_filtered_candidates_are_listed() {
    let forest = load(&[
        (
            "lib.tn",
            "package lib;\nprivate int f() { return 1; }\nprotected int f(int x) { return x; }\nprivate int f(int x, int y) { return x + y; }",
        ),
        ("app.tn", "package app;\nimport lib.f as g;"),
    ]);
    let err = analyze(&forest).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Function 'f' from the package 'lib' has no overloads visible from the current package 'app'\n\
         lib.tn:2:1: notice: Function 'lib.f()' is private\n\
         lib.tn:3:1: notice: Function 'lib.f(int)' is protected\n\
         lib.tn:4:1: notice: Function 'lib.f(int, int)' is private"
    );
}

#[test]
fn test_protected_visible_to_child_package() {
    let forest = load(&[
        ("lib.tn", "package lib;\nprotected int f(int x) { return x; }\nprivate int f() { return 0; }"),
        ("child.tn", "package lib.child;\nimport lib.f;\nint g() { return f(1); }"),
    ]);
    analyze_ok(&forest);
    assert_eq!(callees(&forest, FuncId::new(1, 0)), vec![FuncId::new(0, 0)]);
}

#[test]
fn test_branch_writes_do_not_initialize() {
    let err = analyze_err(
        "package test;\nint f(bool b) {\nint x;\nif (b) { x = 1; } else { x = 2; }\nreturn x;\n}",
    );
    assert_eq!(err.to_string(), "Variable 'x' accessed before initialization");
    assert_eq!(err.span().map(|s| (s.line, s.column)), Some((5, 8)));
}

#[test]
fn test_recheck_is_idempotent() {
    let forest = load(&[(
        "test.tn",
        "package test; @entrypoint int main() { auto v = twice(21); return v; } auto twice(int n) { return n * 2; }",
    )]);
    let mut analysis = analyze_ok(&forest);
    let types = analysis.types.len();
    let returns: Vec<_> = forest
        .function_ids()
        .map(|id| forest.function(id).resolved_return.get().copied())
        .collect();

    analysis.recheck(&forest).unwrap();

    assert_eq!(analysis.types.len(), types);
    let again: Vec<_> = forest
        .function_ids()
        .map(|id| forest.function(id).resolved_return.get().copied())
        .collect();
    assert_eq!(returns, again);
    assert_eq!(analysis.entrypoints(&forest), vec![FuncId::new(0, 0)]);
}

#[test]
fn test_every_expression_is_typed() {
    let forest = load(&[
        (
            "shapes.tn",
            "package shapes;\nexport struct Box { int w; }\nexport auto area(int w, int h = 2) { return w * h; }",
        ),
        (
            "main.tn",
            "package app;\n\
             import shapes.Box;\n\
             import shapes.area;\n\
             Box keep(Box b) { return b; }\n\
             @entrypoint auto main() {\n\
               auto total = area(3) + area(4, 5);\n\
               bool big = total > 10 && !(total == 0);\n\
               string label = \"n\";\n\
               if (big) { total = total - 1; }\n\
               return label == \"n\" || total >= -1;\n\
             }",
        ),
    ]);
    let analysis = analyze_ok(&forest);
    assert_eq!(analysis.untyped_expressions(&forest), 0);
    let main = forest.function(FuncId::new(1, 1));
    let ty = main.resolved_return.get().copied().unwrap();
    assert_eq!(analysis.types.name(ty), "bool");
    let keep = forest.function(FuncId::new(1, 0));
    let ty = keep.resolved_return.get().copied().unwrap();
    assert_eq!(analysis.types.name(ty), "shapes.Box");
}

#[test]
fn test_parse_errors_carry_position() {
    let mut forest = Forest::new();
    let err = parse_source(&mut forest, "bad.tn", "package test;\nint f( { }").unwrap_err();
    assert_eq!(err.span().map(|s| (s.line, s.column)), Some((2, 8)));
    assert!(forest.files().is_empty());
}

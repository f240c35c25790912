//! Diagnostic message composition
//!
//! Pure functions shared by the registry and the resolver. They read the
//! forest but never touch analysis state.

use crate::frontend::ast::{Forest, FuncId};
use crate::frontend::semantic::registry::Declaration;
use crate::utils::Span;

/// Where a binding entered a scope through an import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSite {
    pub alias: String,
    pub span: Span,
}

/// `path:line:col`
pub fn location(forest: &Forest, span: Span) -> String {
    format!("{}:{}:{}", forest.path(span.file_id), span.line, span.column)
}

/// `Struct 'pkg.Name'` or `Function 'pkg.name(int, bool)'`
pub fn declaration_label(forest: &Forest, decl: Declaration) -> String {
    match decl {
        Declaration::Struct(id) => {
            let package = &forest.file(id.file).package;
            format!("Struct '{}.{}'", package, forest.struct_decl(id).name.name)
        }
        Declaration::Function(id) => {
            let package = &forest.file(id.file).package;
            let func = forest.function(id);
            let params = func
                .params
                .iter()
                .map(|p| p.ty_name.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("Function '{}.{}({})'", package, func.name.name, params)
        }
    }
}

/// Conflict between a new declaration (or import) and existing bindings
pub fn conflict(
    forest: &Forest,
    new: Declaration,
    existing: &[(Declaration, Option<ImportSite>)],
) -> String {
    let mut message = format!(
        "{} conflicts with other declarations.",
        declaration_label(forest, new)
    );
    for (decl, site) in existing {
        message.push_str(&format!(
            "\n{}: notice: {}",
            location(forest, decl.span(forest)),
            declaration_label(forest, *decl)
        ));
        if let Some(site) = site {
            message.push_str(&format!(
                "\n\timported as '{}' here: {}",
                site.alias,
                location(forest, site.span)
            ));
        }
    }
    message
}

/// Every overload of an imported function was filtered by visibility
pub fn hidden_overloads(
    forest: &Forest,
    name: &str,
    package: &str,
    current: &str,
    candidates: &[FuncId],
) -> String {
    let mut message = format!(
        "Function '{}' from the package '{}' has no overloads visible from the current package '{}'",
        name, package, current
    );
    for &id in candidates {
        let func = forest.function(id);
        message.push_str(&format!(
            "\n{}: notice: {} is {}",
            location(forest, func.span),
            declaration_label(forest, Declaration::Function(id)),
            func.visibility()
        ));
    }
    message
}

/// A local declaration colliding with a parameter or a same-block local
pub fn local_conflict(forest: &Forest, name: &str, previous: Span, is_param: bool) -> String {
    let kind = if is_param { "Argument" } else { "Variable" };
    format!(
        "Variable '{}' conflicts with other declarations.\n{}: notice: {} '{}'",
        name,
        location(forest, previous),
        kind,
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::StructId;
    use crate::frontend::module::parse_source;

    fn forest(sources: &[(&str, &str)]) -> Forest {
        let mut forest = Forest::new();
        for (path, source) in sources {
            parse_source(&mut forest, path, source).unwrap();
        }
        forest
    }

    #[test]
    fn labels() {
        let forest = forest(&[(
            "a.tn",
            "package test.a;\nstruct Point { int x; }\nint foo(int x, bool y) { return 1; }",
        )]);
        assert_eq!(
            declaration_label(&forest, Declaration::Struct(StructId::new(0, 0))),
            "Struct 'test.a.Point'"
        );
        assert_eq!(
            declaration_label(&forest, Declaration::Function(FuncId::new(0, 0))),
            "Function 'test.a.foo(int, bool)'"
        );
    }

    #[test]
    fn conflict_with_import_provenance() {
        let forest = forest(&[
            ("a.tn", "package test.a;\nimport test.b.foo as bar;\nstruct bar {}"),
            ("b.tn", "package test.b;\nint foo() { return 1; }"),
        ]);
        let site = ImportSite {
            alias: "bar".to_string(),
            span: forest.file(0).imports[0].span,
        };
        let message = conflict(
            &forest,
            Declaration::Struct(StructId::new(0, 0)),
            &[(Declaration::Function(FuncId::new(1, 0)), Some(site))],
        );
        assert_eq!(
            message,
            "Struct 'test.a.bar' conflicts with other declarations.\n\
             b.tn:2:1: notice: Function 'test.b.foo()'\n\
             \timported as 'bar' here: a.tn:2:1"
        );
    }

    #[test]
    fn hidden_overload_notices() {
        let forest = forest(&[(
            "b.tn",
            "package test.b;\nprivate int foo() { return 1; }\nprotected int foo(int x) { return x; }",
        )]);
        let message = hidden_overloads(
            &forest,
            "foo",
            "test.b",
            "other",
            &[FuncId::new(0, 0), FuncId::new(0, 1)],
        );
        assert_eq!(
            message,
            "Function 'foo' from the package 'test.b' has no overloads visible from the current package 'other'\n\
             b.tn:2:1: notice: Function 'test.b.foo()' is private\n\
             b.tn:3:1: notice: Function 'test.b.foo(int)' is protected"
        );
    }
}

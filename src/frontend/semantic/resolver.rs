//! Name resolution for Tern
//!
//! Walks every file depth-first with a [`ScopeStack`], binding imports,
//! calls and variable references to their declarations and tracking how
//! each local is written and read.

use log::{debug, trace};

use crate::frontend::ast::*;
use crate::frontend::semantic::diagnostics::{self, ImportSite};
use crate::frontend::semantic::registry::{Declaration, Registry};
use crate::frontend::semantic::scope::{FunctionBinding, ScopeKind, ScopeStack, StructBinding};
use crate::utils::{Error, FileId, Result};

/// Whether a declaration with `visibility` in `package` may be imported from `current`
pub fn importable(visibility: Visibility, package: &str, current: &str) -> bool {
    match visibility {
        Visibility::Private => false,
        Visibility::Protected => current
            .strip_prefix(package)
            .is_some_and(|rest| rest.starts_with('.')),
        Visibility::Default | Visibility::Public | Visibility::Export | Visibility::Extern => true,
    }
}

/// Resolve every file of the forest
pub fn resolve(forest: &Forest, registry: &Registry) -> Result<()> {
    for file in 0..forest.files().len() {
        Resolver::new(forest, registry).resolve_file(file)?;
    }
    Ok(())
}

/// Scope chain builder for one source file
pub struct Resolver<'a> {
    forest: &'a Forest,
    registry: &'a Registry,
    scopes: ScopeStack,
    package: String,
}

impl<'a> Resolver<'a> {
    pub fn new(forest: &'a Forest, registry: &'a Registry) -> Self {
        Self {
            forest,
            registry,
            scopes: ScopeStack::new(),
            package: String::new(),
        }
    }

    pub fn resolve_file(&mut self, file: FileId) -> Result<()> {
        let forest = self.forest;
        let source = forest.file(file);
        self.package = source.package.to_string();
        debug!("resolving {} (package {})", source.path, self.package);

        self.scopes.enter(ScopeKind::File);
        let outcome = self.resolve_file_items(source, file);
        self.scopes.leave(outcome)
    }

    fn resolve_file_items(&mut self, source: &SourceFile, file: FileId) -> Result<()> {
        self.seed_package()?;
        for import in &source.imports {
            self.resolve_import(import)?;
        }
        // struct fields are parsed but not resolved
        for index in 0..source.functions.len() {
            self.resolve_function(FuncId::new(file, index))?;
        }
        Ok(())
    }

    /// Bind every declaration of the current package without imports
    fn seed_package(&mut self) -> Result<()> {
        let registry = self.registry;
        let Some(package) = registry.package(&self.package) else {
            return Err(Error::Internal(format!(
                "package '{}' was never registered",
                self.package
            )));
        };
        for (name, ids) in package.function_sets() {
            for &func in ids {
                self.scopes.bind_function(name, FunctionBinding { func, import: None })?;
            }
        }
        for (name, id) in package.structs() {
            self.scopes.bind_struct(name, StructBinding { id, import: None })?;
        }
        Ok(())
    }

    // ==================== Imports ====================

    fn resolve_import(&mut self, import: &Import) -> Result<()> {
        let registry = self.registry;
        let package_name = import.package();
        let name = import.target().name.as_str();
        if package_name == self.package {
            return Err(Error::MeaninglessImport { span: import.span });
        }
        let Some(package) = registry.package(&package_name) else {
            return Err(Error::NoSuchPackage {
                package: package_name,
                span: import.span,
            });
        };

        let site = ImportSite {
            alias: import.local_name().to_string(),
            span: import.span,
        };

        if let Some(id) = package.struct_decl(name) {
            match self.forest.struct_decl(id).visibility() {
                Visibility::Private => {
                    return Err(Error::PrivateStruct {
                        name: name.to_string(),
                        package: package_name,
                        span: import.span,
                    })
                }
                visibility if !importable(visibility, &package_name, &self.package) => {
                    return Err(Error::ProtectedStruct {
                        name: name.to_string(),
                        package: package_name,
                        current: self.package.clone(),
                        span: import.span,
                    })
                }
                _ => {}
            }
            self.bind_imported(Declaration::Struct(id), &site)?;
            self.scopes.bind_struct(&site.alias, StructBinding { id, import: Some(site.clone()) })?;
            import.resolved.get_or_init(|| ImportTarget::Struct(id));
            debug!("import {}.{} as {}", package_name, name, site.alias);
            return Ok(());
        }

        let candidates = package.functions(name);
        if candidates.is_empty() {
            return Err(Error::DeclarationNotFound {
                name: name.to_string(),
                package: package_name,
                span: import.span,
            });
        }
        let visible: Vec<FuncId> = candidates
            .iter()
            .copied()
            .filter(|&id| importable(self.forest.function(id).visibility(), &package_name, &self.package))
            .collect();
        let Some(&first) = visible.first() else {
            return Err(Error::NoVisibleOverloads {
                message: diagnostics::hidden_overloads(
                    self.forest,
                    name,
                    &package_name,
                    &self.package,
                    candidates,
                ),
                span: import.span,
            });
        };

        if self.scopes.has_struct(&site.alias) {
            self.bind_imported(Declaration::Function(first), &site)?;
        }
        for &func in &visible {
            self.scopes.bind_function(
                &site.alias,
                FunctionBinding {
                    func,
                    import: Some(site.clone()),
                },
            )?;
        }
        debug!(
            "import {}.{} as {} ({} of {} overloads)",
            package_name,
            name,
            site.alias,
            visible.len(),
            candidates.len()
        );
        import.resolved.get_or_init(|| ImportTarget::Functions(visible));
        Ok(())
    }

    /// Fails when `alias` is already bound in the file scope
    fn bind_imported(&self, decl: Declaration, site: &ImportSite) -> Result<()> {
        let existing = self.scopes.declarations(&site.alias);
        if existing.is_empty() {
            return Ok(());
        }
        Err(Error::Conflict {
            message: diagnostics::conflict(self.forest, decl, &existing),
            span: site.span,
        })
    }

    // ==================== Functions ====================

    fn resolve_function(&mut self, id: FuncId) -> Result<()> {
        let forest = self.forest;
        let func = forest.function(id);
        match (func.is_extern(), &func.body) {
            (true, Some(_)) => {
                return Err(Error::ExternWithBody {
                    name: func.name.name.clone(),
                    span: func.span,
                })
            }
            (false, None) => {
                return Err(Error::MissingImplementation {
                    name: func.name.name.clone(),
                    span: func.span,
                })
            }
            _ => {}
        }

        let mut previous_default: Option<&VarDecl> = None;
        for param in &func.params {
            match (&param.init, previous_default) {
                (Some(value), _) => {
                    // default values see the file scope only
                    self.resolve_expr(value)?;
                    previous_default = Some(param);
                }
                (None, Some(previous)) => {
                    return Err(Error::MissingDefaultValue {
                        name: param.name.name.clone(),
                        previous: previous.name.name.clone(),
                        span: param.span,
                    })
                }
                (None, None) => {}
            }
        }

        let Some(body) = &func.body else {
            return Ok(());
        };
        trace!("resolving function {}", func.name.name);
        self.scopes.enter(ScopeKind::Function);
        let outcome = self.resolve_params_and_body(&func.params, body);
        self.scopes.leave(outcome)
    }

    fn resolve_params_and_body(&mut self, params: &[VarDecl], body: &Block) -> Result<()> {
        for param in params {
            self.declare_local(param, true)?;
        }
        self.resolve_block(body, ScopeKind::Block)
    }

    fn declare_local(&mut self, decl: &VarDecl, is_param: bool) -> Result<()> {
        if let Some(previous) = self.scopes.conflicting_local(&decl.name.name) {
            return Err(Error::Conflict {
                message: diagnostics::local_conflict(
                    self.forest,
                    &decl.name.name,
                    previous.span,
                    previous.is_param,
                ),
                span: decl.span,
            });
        }
        self.scopes.declare(decl, is_param || decl.init.is_some(), is_param)
    }

    // ==================== Statements ====================

    fn resolve_block(&mut self, block: &Block, kind: ScopeKind) -> Result<()> {
        self.scopes.enter(kind);
        let outcome = self.resolve_stmts(&block.stmts);
        self.scopes.leave(outcome)
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    /// An `if`/`else` branch gets its own scope even without braces
    fn resolve_branch(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(block) => self.resolve_block(block, ScopeKind::Branch),
            other => {
                self.scopes.enter(ScopeKind::Branch);
                let outcome = self.resolve_stmt(other);
                self.scopes.leave(outcome)
            }
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(block) => self.resolve_block(block, ScopeKind::Block),
            Stmt::If { cond, then_branch, else_branch, .. } => {
                self.resolve_expr(cond)?;
                self.resolve_branch(then_branch)?;
                if let Some(branch) = else_branch {
                    self.resolve_branch(branch)?;
                }
                Ok(())
            }
            Stmt::VarDecl(decl) => {
                if let Some(init) = &decl.init {
                    self.resolve_expr(init)?;
                }
                self.declare_local(decl, false)
            }
            Stmt::Assign { target, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_assign_target(target)
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => self.resolve_expr(value),
                None => Ok(()),
            },
            Stmt::Expr(expr) => self.resolve_expr(expr),
        }
    }

    fn resolve_assign_target(&mut self, target: &AssignTarget) -> Result<()> {
        let var = match target {
            AssignTarget::Var(var) => var,
            AssignTarget::Member { base, .. } => {
                return Err(Error::Internal(format!(
                    "assignment to a member of '{}' is not implemented",
                    base.name.name
                )))
            }
        };
        let name = &var.name.name;
        let Some(stats) = self.scopes.lookup_var(name) else {
            return Err(Error::UndefinedVariable {
                name: name.clone(),
                span: var.name.span,
            });
        };
        if stats.is_param {
            return Err(Error::ArgumentModification {
                name: name.clone(),
                span: var.name.span,
            });
        }
        stats.assignments += 1;
        var.binding.get_or_init(|| stats.decl);
        Ok(())
    }

    // ==================== Expressions ====================

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(_) => Ok(()),
            ExprKind::Var(var) => self.resolve_var_read(var),
            ExprKind::Call { name, args, callee } => {
                for arg in args {
                    self.resolve_expr(arg)?;
                }
                let func = self.resolve_call(name, args.len(), expr)?;
                callee.get_or_init(|| func);
                Ok(())
            }
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
        }
    }

    fn resolve_var_read(&mut self, var: &VarRef) -> Result<()> {
        let name = &var.name.name;
        let Some(stats) = self.scopes.lookup_var(name) else {
            return Err(Error::UndefinedVariable {
                name: name.clone(),
                span: var.name.span,
            });
        };
        if stats.assignments == 0 {
            return Err(Error::UninitializedAccess {
                name: name.clone(),
                span: var.name.span,
            });
        }
        stats.accesses += 1;
        var.binding.get_or_init(|| stats.decl);
        Ok(())
    }

    /// Pick the single overload of the innermost set accepting `args` arguments
    fn resolve_call(&self, name: &Ident, args: usize, call: &Expr) -> Result<FuncId> {
        let Some(set) = self.scopes.functions(&name.name) else {
            return Err(Error::UnresolvedCall {
                name: name.name.clone(),
                span: call.span,
            });
        };
        let matching: Vec<FuncId> = set
            .iter()
            .map(|binding| binding.func)
            .filter(|&id| self.forest.function(id).accepts(args))
            .collect();
        match matching.as_slice() {
            [func] => {
                trace!("call {} bound to {:?}", name.name, func);
                Ok(*func)
            }
            [] => Err(Error::ArgumentCount {
                descr: format!("Function '{}'", name.name),
                span: call.span,
            }),
            _ => Err(Error::AmbiguousCall {
                name: name.name.clone(),
                candidates: matching.len(),
                args,
                span: call.span,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::module::parse_source;

    fn forest(sources: &[(&str, &str)]) -> Forest {
        let mut forest = Forest::new();
        for (path, source) in sources {
            parse_source(&mut forest, path, source).unwrap();
        }
        forest
    }

    fn run(forest: &Forest) -> Result<()> {
        let registry = Registry::build(forest)?;
        resolve(forest, &registry)
    }

    fn error(source: &str) -> String {
        let forest = forest(&[("test.tn", source)]);
        run(&forest).unwrap_err().to_string()
    }

    fn callees(forest: &Forest, file: FileId, index: usize) -> Vec<FuncId> {
        let mut found = Vec::new();
        forest.file(file).functions[index]
            .body
            .as_ref()
            .unwrap()
            .visit_exprs(&mut |expr| {
                if let ExprKind::Call { callee, .. } = &expr.kind {
                    found.push(*callee.get().unwrap());
                }
            });
        found
    }

    #[test]
    fn protected_visibility_follows_package_prefix() {
        assert!(importable(Visibility::Protected, "test", "test.a"));
        assert!(!importable(Visibility::Protected, "test", "tester"));
        assert!(!importable(Visibility::Protected, "test.a", "test"));
        assert!(!importable(Visibility::Private, "test", "test.a"));
        assert!(importable(Visibility::Extern, "test", "other"));
    }

    #[test]
    fn calls_bind_to_the_same_overload() {
        let forest = forest(&[(
            "test.tn",
            "package test; int foo(int x,int y){return x+y-42;} \
             int bar(bool b){if(b) return foo(123,456); return foo(42,15);}",
        )]);
        run(&forest).unwrap();
        let foo = FuncId::new(0, 0);
        assert_eq!(callees(&forest, 0, 1), vec![foo, foo]);
    }

    #[test]
    fn overloads_are_picked_by_arity() {
        let forest = forest(&[(
            "test.tn",
            "package test; int f(int a) { return a; } int f(int a, int b, int c = 1) { return a + b + c; } \
             int g() { return f(1) + f(1, 2) + f(1, 2, 3); }",
        )]);
        run(&forest).unwrap();
        let (one, three) = (FuncId::new(0, 0), FuncId::new(0, 1));
        assert_eq!(callees(&forest, 0, 2), vec![one, three, three]);
    }

    #[test]
    fn call_errors() {
        assert_eq!(
            error("package test; int g() { return h(); }"),
            "Unresolved function call 'h'"
        );
        assert_eq!(
            error("package test; int f(int a) { return a; } int g() { return f(); }"),
            "Function 'f' is called with incorrect number of arguments"
        );
        assert_eq!(
            error("package test; int f(int a) { return a; } bool f(bool b) { return b; } int g() { return f(1); }"),
            "Call of function 'f' is ambiguous: 2 overloads accept 1 arguments"
        );
    }

    #[test]
    fn variable_errors() {
        assert_eq!(
            error("package test; int f() { return y; }"),
            "Undefined variable 'y'"
        );
        assert_eq!(
            error("package test; int f() { int y; return y; }"),
            "Variable 'y' accessed before initialization"
        );
        assert_eq!(
            error("package test; int f(int x) { x = 2; return x; }"),
            "Attempt to modify function argument 'x'"
        );
        assert_eq!(
            error("package test; int f() { int y = 1; return 0; }"),
            "Variable 'y' is never used"
        );
    }

    #[test]
    fn initializer_does_not_see_its_own_binding() {
        assert_eq!(
            error("package test; int f() { int y = y; return y; }"),
            "Undefined variable 'y'"
        );
    }

    #[test]
    fn parameter_conflicts_across_blocks() {
        assert_eq!(
            error("package test;\nint f(int x) {\n{ int x = 1; return x; } }"),
            "Variable 'x' conflicts with other declarations.\ntest.tn:2:7: notice: Argument 'x'"
        );
        assert_eq!(
            error("package test;\nint f() {\nint x = 1;\nint x = 2; return x; }"),
            "Variable 'x' conflicts with other declarations.\ntest.tn:3:1: notice: Variable 'x'"
        );
    }

    #[test]
    fn outer_locals_can_be_shadowed() {
        let forest = forest(&[(
            "test.tn",
            "package test; int f() { int x = 1; { int x = 2; return x; } return x; }",
        )]);
        run(&forest).unwrap();
    }

    #[test]
    fn linear_block_writes_initialize() {
        let forest = forest(&[(
            "test.tn",
            "package test; int f() { int x; { x = 1; } return x; }",
        )]);
        run(&forest).unwrap();
    }

    #[test]
    fn branch_writes_do_not_initialize() {
        assert_eq!(
            error("package test; int f(bool b) { int x; if (b) x = 1; else x = 2; return x; }"),
            "Variable 'x' accessed before initialization"
        );
        assert_eq!(
            error("package test; int f(bool b) { int x; if (b) { x = 1; return x; } return x; }"),
            "Variable 'x' accessed before initialization"
        );
    }

    #[test]
    fn function_shape_errors() {
        assert_eq!(
            error("package test; int f();"),
            "Implementation missing for the function 'f'"
        );
        assert_eq!(
            error("package test; extern int f() { return 1; }"),
            "Extern function 'f' must not have implementation"
        );
        assert_eq!(
            error("package test; int foo(int x=42,int y){return x+y;}"),
            "Argument 'y' has no default value while previous argument 'x' has"
        );
        let forest = forest(&[("test.tn", "package test; extern int puts(string s);")]);
        run(&forest).unwrap();
    }

    #[test]
    fn member_assignment_is_internal() {
        let forest = forest(&[(
            "test.tn",
            "package test; struct P { int x; } int f(P p) { p.x = 1; return 0; }",
        )]);
        let err = run(&forest).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn aliased_imports_in_both_directions() {
        let forest = forest(&[
            (
                "a.tn",
                "package test.a; import test.b.baz as bar; export int foo(int x) { return bar(x); }",
            ),
            (
                "b.tn",
                "package test.b; import test.a.foo; export int baz(int y) { return y; } int qux() { return foo(1); }",
            ),
        ]);
        run(&forest).unwrap();
        assert_eq!(callees(&forest, 0, 0), vec![FuncId::new(1, 0)]);
        assert_eq!(callees(&forest, 1, 1), vec![FuncId::new(0, 0)]);
        assert_eq!(
            forest.file(0).imports[0].resolved.get(),
            Some(&ImportTarget::Functions(vec![FuncId::new(1, 0)]))
        );
    }

    #[test]
    fn import_errors() {
        let lib = ("lib.tn", "package lib; private struct Secret {} protected struct Family {} int f() { return 1; }");
        let cases = [
            ("package lib; import lib.f;", "Import of a declaration from the current package is meaningless"),
            ("package app; import nowhere.f;", "No such package 'nowhere'"),
            ("package app; import lib.g;", "Declaration 'g' not found in package 'lib'"),
            ("package app; import lib.Secret;", "Struct 'Secret' is private in the package 'lib'"),
            (
                "package app; import lib.Family;",
                "Struct 'Family' is protected in the package 'lib' which is not parent of current package 'app'",
            ),
        ];
        for (source, expected) in cases {
            let forest = forest(&[lib, ("app.tn", source)]);
            assert_eq!(run(&forest).unwrap_err().to_string(), expected);
        }

        let forest = forest(&[lib, ("child.tn", "package lib.child; import lib.Family;")]);
        run(&forest).unwrap();
    }

    #[test]
    fn hidden_overloads_are_listed() {
        let forest = forest(&[
            (
                "lib.tn",
                "package lib;\nprivate int f() { return 1; }\nprotected int f(int x) { return x; }",
            ),
            ("app.tn", "package app; import lib.f;"),
        ]);
        assert_eq!(
            run(&forest).unwrap_err().to_string(),
            "Function 'f' from the package 'lib' has no overloads visible from the current package 'app'\n\
             lib.tn:2:1: notice: Function 'lib.f()' is private\n\
             lib.tn:3:1: notice: Function 'lib.f(int)' is protected"
        );
    }

    #[test]
    fn import_alias_conflicts_with_local_struct() {
        let forest = forest(&[
            ("a.tn", "package test.a;\nimport test.b.foo as Point;\nstruct Point {}"),
            ("b.tn", "package test.b;\nint foo() { return 1; }"),
        ]);
        assert_eq!(
            run(&forest).unwrap_err().to_string(),
            "Function 'test.b.foo()' conflicts with other declarations.\na.tn:3:1: notice: Struct 'test.a.Point'"
        );
    }

    #[test]
    fn repeated_import_reports_provenance() {
        let forest = forest(&[
            ("a.tn", "package test.a;\nimport test.b.foo as bar;\nimport test.b.S as bar;"),
            ("b.tn", "package test.b;\nint foo() { return 1; }\nstruct S {}"),
        ]);
        assert_eq!(
            run(&forest).unwrap_err().to_string(),
            "Struct 'test.b.S' conflicts with other declarations.\n\
             b.tn:2:1: notice: Function 'test.b.foo()'\n\
             \timported as 'bar' here: a.tn:2:1"
        );
    }
}

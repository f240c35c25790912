//! Declaration registry
//!
//! Collects every package's functions (name → overloads) and structs
//! (name → unique entry). Filled once before resolution, read-only afterwards.

use std::collections::BTreeMap;

use log::debug;

use crate::frontend::ast::{Forest, FuncId, Layout, StructId, Visibility};
use crate::frontend::semantic::diagnostics;
use crate::utils::{Error, FileId, Result, Span};

/// A top-level declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Declaration {
    Function(FuncId),
    Struct(StructId),
}

impl Declaration {
    pub fn span(self, forest: &Forest) -> Span {
        match self {
            Declaration::Function(id) => forest.function(id).span,
            Declaration::Struct(id) => forest.struct_decl(id).span,
        }
    }
}

/// Declarations of one dotted-name package
#[derive(Debug, Default)]
pub struct Package {
    pub name: String,
    functions: BTreeMap<String, Vec<FuncId>>,
    structs: BTreeMap<String, StructId>,
}

impl Package {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Overloads registered under `name`, in registration order
    pub fn functions(&self, name: &str) -> &[FuncId] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn struct_decl(&self, name: &str) -> Option<StructId> {
        self.structs.get(name).copied()
    }

    pub fn function_sets(&self) -> impl Iterator<Item = (&str, &[FuncId])> {
        self.functions.iter().map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    pub fn structs(&self) -> impl Iterator<Item = (&str, StructId)> {
        self.structs.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

/// Registration state of one source file
///
/// Carries the owning package and the default visibility set by the most
/// recent section marker. Threaded through the `register_*` calls.
#[derive(Debug, Clone)]
pub struct DeclContext {
    package: String,
    default_visibility: Visibility,
}

impl DeclContext {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            default_visibility: Visibility::Default,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn default_visibility(&self) -> Visibility {
        self.default_visibility
    }

    /// Apply a `public:`-style section marker to subsequent declarations
    pub fn set_default_visibility(&mut self, visibility: Visibility) {
        self.default_visibility = visibility;
    }
}

/// Global symbol table of every package
#[derive(Debug, Default)]
pub struct Registry {
    packages: BTreeMap<String, Package>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every declaration of every file in the forest
    pub fn build(forest: &Forest) -> Result<Self> {
        let mut registry = Self::new();
        for file in 0..forest.files().len() {
            registry.register_file(forest, file)?;
        }
        Ok(registry)
    }

    /// Register one file's declarations in source order
    pub fn register_file(&mut self, forest: &Forest, file: FileId) -> Result<()> {
        let source = forest.file(file);
        let mut ctx = DeclContext::new(source.package.to_string());
        // a file without declarations still makes its package importable
        self.packages
            .entry(ctx.package().to_string())
            .or_insert_with(|| Package::new(&source.package.to_string()));

        for entry in &source.layout {
            match *entry {
                Layout::Section(visibility) => ctx.set_default_visibility(visibility),
                Layout::Struct(index) => self.register_struct(forest, &ctx, StructId::new(file, index))?,
                Layout::Function(index) => {
                    self.register_function(forest, &ctx, FuncId::new(file, index))?
                }
            }
        }
        Ok(())
    }

    /// Add a function to its package's overload set
    pub fn register_function(&mut self, forest: &Forest, ctx: &DeclContext, id: FuncId) -> Result<()> {
        let decl = forest.function(id);
        let visibility = *decl
            .visibility
            .get_or_init(|| decl.declared_visibility.unwrap_or(ctx.default_visibility()));

        let package = self.package_entry(ctx.package());
        if let Some(existing) = package.struct_decl(&decl.name.name) {
            return Err(Error::Conflict {
                message: diagnostics::conflict(
                    forest,
                    Declaration::Function(id),
                    &[(Declaration::Struct(existing), None)],
                ),
                span: decl.span,
            });
        }

        package
            .functions
            .entry(decl.name.name.clone())
            .or_default()
            .push(id);
        debug!(
            "registered function {}.{} ({} params, {})",
            ctx.package(),
            decl.name.name,
            decl.params.len(),
            visibility
        );
        Ok(())
    }

    /// Add a struct to its package; names must be unique among all declarations
    pub fn register_struct(&mut self, forest: &Forest, ctx: &DeclContext, id: StructId) -> Result<()> {
        let decl = forest.struct_decl(id);
        let visibility = *decl
            .visibility
            .get_or_init(|| decl.declared_visibility.unwrap_or(ctx.default_visibility()));

        let package = self.package_entry(ctx.package());
        let mut existing: Vec<Declaration> = package
            .functions(&decl.name.name)
            .iter()
            .map(|&f| Declaration::Function(f))
            .collect();
        if let Some(other) = package.struct_decl(&decl.name.name) {
            existing.push(Declaration::Struct(other));
        }
        if !existing.is_empty() {
            let existing: Vec<_> = existing.into_iter().map(|d| (d, None)).collect();
            return Err(Error::Conflict {
                message: diagnostics::conflict(forest, Declaration::Struct(id), &existing),
                span: decl.span,
            });
        }

        package.structs.insert(decl.name.name.clone(), id);
        debug!("registered struct {}.{} ({})", ctx.package(), decl.name.name, visibility);
        Ok(())
    }

    fn package_entry(&mut self, name: &str) -> &mut Package {
        self.packages
            .entry(name.to_string())
            .or_insert_with(|| Package::new(name))
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::module::parse_source;

    fn forest(source: &str) -> Forest {
        let mut forest = Forest::new();
        parse_source(&mut forest, "test.tn", source).unwrap();
        forest
    }

    #[test]
    fn collects_overloads() {
        let forest = forest("package test; int foo() { return 1; } int foo(int x) { return x; } struct S {}");
        let registry = Registry::build(&forest).unwrap();
        let package = registry.package("test").unwrap();
        assert_eq!(package.functions("foo").len(), 2);
        assert_eq!(package.struct_decl("S"), Some(StructId::new(0, 0)));
        assert!(package.functions("bar").is_empty());
    }

    #[test]
    fn section_markers_set_default_visibility() {
        let forest = forest(
            "package test; int a(); protected: int b(); private int c(); struct S {} public: struct T {}",
        );
        Registry::build(&forest).unwrap();
        let file = forest.file(0);
        let visibilities: Vec<_> = file.functions.iter().map(|f| f.visibility()).collect();
        assert_eq!(
            visibilities,
            vec![Visibility::Default, Visibility::Protected, Visibility::Private]
        );
        assert_eq!(file.structs[0].visibility(), Visibility::Protected);
        assert_eq!(file.structs[1].visibility(), Visibility::Public);
    }

    #[test]
    fn struct_after_function_conflicts() {
        let forest = forest("package test;\nint Point() { return 1; }\nstruct Point {}");
        let err = Registry::build(&forest).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Struct 'test.Point' conflicts with other declarations.\ntest.tn:2:1: notice: Function 'test.Point()'"
        );
        assert_eq!(err.span().map(|s| s.line), Some(3));
    }

    #[test]
    fn function_after_struct_conflicts() {
        let forest = forest("package test;\nstruct Point {}\nint Point(int x) { return x; }");
        let err = Registry::build(&forest).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Function 'test.Point(int)' conflicts with other declarations.\ntest.tn:2:1: notice: Struct 'test.Point'"
        );
    }

    #[test]
    fn explicit_context_threading() {
        let forest = forest("package test; int f(); int g();");
        let mut registry = Registry::new();
        let mut ctx = DeclContext::new("test");
        registry.register_function(&forest, &ctx, FuncId::new(0, 0)).unwrap();
        ctx.set_default_visibility(Visibility::Export);
        registry.register_function(&forest, &ctx, FuncId::new(0, 1)).unwrap();
        assert_eq!(forest.file(0).functions[0].visibility(), Visibility::Default);
        assert_eq!(forest.file(0).functions[1].visibility(), Visibility::Export);
    }
}

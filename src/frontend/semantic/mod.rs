//! Semantic analysis for Tern
//!
//! Three passes over one [`Forest`], each feeding the next:
//! declaration registration, name resolution and type checking.
//! The first error aborts the whole analysis.

pub mod checker;
pub mod diagnostics;
pub mod registry;
pub mod resolver;
pub mod scope;

pub use checker::Checker;
pub use registry::{DeclContext, Declaration, Registry};
pub use resolver::Resolver;

use log::debug;

use crate::frontend::ast::{Forest, FuncId};
use crate::types::TypeStore;
use crate::utils::Result;

/// Result of a successful analysis
#[derive(Debug)]
pub struct Analysis {
    pub registry: Registry,
    pub types: TypeStore,
}

impl Analysis {
    /// Expressions without a complete type; zero after a successful analysis
    pub fn untyped_expressions(&self, forest: &Forest) -> usize {
        let mut count = 0;
        forest.visit_exprs(&mut |expr| match expr.ty.get() {
            Some(&ty) if self.types.is_complete(ty) => {}
            _ => count += 1,
        });
        count
    }

    /// Functions annotated with `@entrypoint`
    pub fn entrypoints(&self, forest: &Forest) -> Vec<FuncId> {
        forest
            .function_ids()
            .filter(|&id| forest.function(id).is_entrypoint())
            .collect()
    }

    /// Re-run the checker; a no-op on an already typed forest
    pub fn recheck(&mut self, forest: &Forest) -> Result<()> {
        Checker::new(forest, &self.registry, &mut self.types).check()
    }
}

/// Register, resolve and type-check every file of the forest
pub fn analyze(forest: &Forest) -> Result<Analysis> {
    let registry = Registry::build(forest)?;
    debug!("registered {} packages", registry.packages().count());

    resolver::resolve(forest, &registry)?;

    let mut types = TypeStore::new();
    Checker::new(forest, &registry, &mut types).check()?;
    debug!("checked {} functions, {} types", forest.function_ids().count(), types.len());

    Ok(Analysis { registry, types })
}

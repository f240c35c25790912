//! Lexical scope stack
//!
//! One frame per syntactic block, pushed and popped in traversal order.
//! A frame reaches its creator only by position in the stack, so no frame
//! ever owns its parent.

use std::collections::BTreeMap;

use log::trace;

use crate::frontend::ast::{FuncId, StructId, VarDecl, VarId};
use crate::frontend::semantic::diagnostics::ImportSite;
use crate::frontend::semantic::registry::Declaration;
use crate::utils::{Error, Result, Span};

/// What opened a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    File,
    /// Holds the parameters
    Function,
    Block,
    /// `if`/`else` branch; outer writes are undone on exit
    Branch,
}

/// Usage counters of one local
#[derive(Debug, Clone)]
pub struct VarStats {
    pub decl: VarId,
    pub name: String,
    pub span: Span,
    pub is_param: bool,
    pub assignments: u32,
    pub accesses: u32,
}

/// A visible function and the import that brought it in, if any
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBinding {
    pub func: FuncId,
    pub import: Option<ImportSite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructBinding {
    pub id: StructId,
    pub import: Option<ImportSite>,
}

#[derive(Debug)]
struct Frame {
    kind: ScopeKind,
    locals: Vec<VarStats>,
    functions: BTreeMap<String, Vec<FunctionBinding>>,
    structs: BTreeMap<String, StructBinding>,
    /// (frame, local, assignments) of every outer local at branch entry
    saved: Vec<(usize, usize, u32)>,
}

impl Frame {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            locals: Vec::new(),
            functions: BTreeMap::new(),
            structs: BTreeMap::new(),
            saved: Vec::new(),
        }
    }
}

/// Stack of active scopes, innermost last
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn enter(&mut self, kind: ScopeKind) {
        let mut frame = Frame::new(kind);
        if kind == ScopeKind::Branch {
            for (f, outer) in self.frames.iter().enumerate() {
                for (l, stats) in outer.locals.iter().enumerate() {
                    frame.saved.push((f, l, stats.assignments));
                }
            }
        }
        trace!("enter {:?} scope at depth {}", kind, self.frames.len());
        self.frames.push(frame);
    }

    /// Pop the innermost frame
    ///
    /// `outcome` is the result of walking the frame's block. On success the
    /// frame's locals must all have been read; on failure the original error
    /// is returned unchanged and no usage check runs.
    pub fn leave(&mut self, outcome: Result<()>) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::Internal("scope stack underflow".to_string()))?;
        trace!("leave {:?} scope at depth {}", frame.kind, self.frames.len());
        outcome?;

        if let Some(unused) = frame.locals.iter().find(|stats| stats.accesses == 0) {
            return Err(Error::UnusedVariable {
                name: unused.name.clone(),
                span: unused.span,
            });
        }
        for (f, l, assignments) in frame.saved {
            self.frames[f].locals[l].assignments = assignments;
        }
        Ok(())
    }

    fn innermost(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::Internal("no active scope".to_string()))
    }

    // ==================== Variables ====================

    /// Add a local to the innermost frame
    pub fn declare(&mut self, decl: &VarDecl, initialized: bool, is_param: bool) -> Result<()> {
        let frame = self.innermost()?;
        frame.locals.push(VarStats {
            decl: decl.id,
            name: decl.name.name.clone(),
            span: decl.span,
            is_param,
            assignments: u32::from(initialized),
            accesses: 0,
        });
        Ok(())
    }

    /// A binding a new local named `name` would collide with
    ///
    /// Same-frame locals always collide; parameters collide from any nested
    /// block of their function. Other outer locals are shadowed.
    pub fn conflicting_local(&self, name: &str) -> Option<&VarStats> {
        let mut frames = self.frames.iter().rev();
        let innermost = frames.next()?;
        if let Some(stats) = innermost.locals.iter().find(|s| s.name == name) {
            return Some(stats);
        }
        if innermost.kind == ScopeKind::Function {
            return None;
        }
        for frame in frames {
            if frame.kind == ScopeKind::Function {
                return frame.locals.iter().find(|s| s.is_param && s.name == name);
            }
        }
        None
    }

    /// Innermost local named `name`
    pub fn lookup_var(&mut self, name: &str) -> Option<&mut VarStats> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.locals.iter_mut().rev().find(|s| s.name == name))
    }

    // ==================== Declarations ====================

    /// Add a function to the innermost frame's overload set of `name`
    pub fn bind_function(&mut self, name: &str, binding: FunctionBinding) -> Result<()> {
        let set = self.innermost()?.functions.entry(name.to_string()).or_default();
        if !set.iter().any(|b| b.func == binding.func) {
            set.push(binding);
        }
        Ok(())
    }

    pub fn bind_struct(&mut self, name: &str, binding: StructBinding) -> Result<()> {
        self.innermost()?.structs.insert(name.to_string(), binding);
        Ok(())
    }

    /// Overload set of the innermost frame that has one named `name`
    pub fn functions(&self, name: &str) -> Option<&[FunctionBinding]> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.functions.get(name))
            .map(Vec::as_slice)
    }

    /// Every declaration bound as `name` in the innermost frame, with provenance
    pub fn declarations(&self, name: &str) -> Vec<(Declaration, Option<ImportSite>)> {
        let Some(frame) = self.frames.last() else {
            return Vec::new();
        };
        let mut found: Vec<_> = frame
            .functions
            .get(name)
            .into_iter()
            .flatten()
            .map(|b| (Declaration::Function(b.func), b.import.clone()))
            .collect();
        if let Some(binding) = frame.structs.get(name) {
            found.push((Declaration::Struct(binding.id), binding.import.clone()));
        }
        found
    }

    pub fn has_struct(&self, name: &str) -> bool {
        self.frames.last().is_some_and(|frame| frame.structs.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::Ident;
    use std::cell::OnceCell;

    fn var(index: usize, name: &str) -> VarDecl {
        VarDecl {
            id: VarId::new(0, index),
            name: Ident {
                name: name.to_string(),
                span: Span::dummy(),
            },
            ty_name: Ident {
                name: "int".to_string(),
                span: Span::dummy(),
            },
            init: None,
            span: Span::dummy(),
            ty: OnceCell::new(),
        }
    }

    #[test]
    fn unused_local_is_reported_on_exit() {
        let mut scopes = ScopeStack::new();
        scopes.enter(ScopeKind::Block);
        scopes.declare(&var(0, "x"), true, false).unwrap();
        let err = scopes.leave(Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "Variable 'x' is never used");
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn failing_block_keeps_original_error() {
        let mut scopes = ScopeStack::new();
        scopes.enter(ScopeKind::Block);
        scopes.declare(&var(0, "x"), true, false).unwrap();
        let original = Error::Internal("boom".to_string());
        let err = scopes.leave(Err(original.clone())).unwrap_err();
        assert_eq!(err, original);
    }

    #[test]
    fn parameters_conflict_across_blocks() {
        let mut scopes = ScopeStack::new();
        scopes.enter(ScopeKind::Function);
        scopes.declare(&var(0, "p"), true, true).unwrap();
        scopes.declare(&var(1, "q"), true, false).unwrap();
        scopes.enter(ScopeKind::Block);
        scopes.enter(ScopeKind::Block);
        assert!(scopes.conflicting_local("p").is_some());
        assert!(scopes.conflicting_local("q").is_none());
        assert!(scopes.conflicting_local("r").is_none());
    }

    #[test]
    fn branch_writes_are_undone() {
        let mut scopes = ScopeStack::new();
        scopes.enter(ScopeKind::Block);
        scopes.declare(&var(0, "x"), false, false).unwrap();
        scopes.enter(ScopeKind::Branch);
        scopes.lookup_var("x").unwrap().assignments += 1;
        scopes.leave(Ok(())).unwrap();
        assert_eq!(scopes.lookup_var("x").unwrap().assignments, 0);

        scopes.enter(ScopeKind::Block);
        scopes.lookup_var("x").unwrap().assignments += 1;
        scopes.leave(Ok(())).unwrap();
        assert_eq!(scopes.lookup_var("x").unwrap().assignments, 1);
    }

    #[test]
    fn innermost_overload_set_wins() {
        let mut scopes = ScopeStack::new();
        scopes.enter(ScopeKind::File);
        let outer = FunctionBinding {
            func: FuncId::new(0, 0),
            import: None,
        };
        scopes.bind_function("f", outer.clone()).unwrap();
        scopes.bind_function("f", outer).unwrap();
        assert_eq!(scopes.functions("f").map(<[_]>::len), Some(1));

        scopes.enter(ScopeKind::File);
        let inner = FunctionBinding {
            func: FuncId::new(1, 0),
            import: None,
        };
        scopes.bind_function("f", inner.clone()).unwrap();
        assert_eq!(scopes.functions("f"), Some(&[inner][..]));
        assert!(scopes.functions("g").is_none());
    }
}

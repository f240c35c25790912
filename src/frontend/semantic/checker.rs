//! Type checking for Tern
//!
//! Types every expression of a resolved forest and deduces `auto` variable
//! and return types. A call into a function that has not been checked yet
//! checks that function first, so forward and mutual references work in
//! any declaration order.

use std::collections::HashMap;

use log::{debug, trace};

use crate::frontend::ast::*;
use crate::frontend::semantic::registry::Registry;
use crate::types::{TypeId, TypeStore};
use crate::utils::{Error, FileId, Result};

/// Type evaluator and statement checker
pub struct Checker<'a> {
    forest: &'a Forest,
    registry: &'a Registry,
    types: &'a mut TypeStore,
    vars: HashMap<VarId, &'a VarDecl>,
    /// Calls into functions whose return type was still being deduced
    deferred: Vec<(&'a Expr, FuncId)>,
}

impl<'a> Checker<'a> {
    pub fn new(forest: &'a Forest, registry: &'a Registry, types: &'a mut TypeStore) -> Self {
        let mut vars = HashMap::new();
        for file in forest.files() {
            for func in &file.functions {
                for param in &func.params {
                    vars.insert(param.id, param);
                }
                if let Some(body) = &func.body {
                    collect_locals(&body.stmts, &mut vars);
                }
            }
        }
        Self {
            forest,
            registry,
            types,
            vars,
            deferred: Vec::new(),
        }
    }

    /// Check every function of the forest
    pub fn check(&mut self) -> Result<()> {
        let forest = self.forest;
        for (file, source) in forest.files().iter().enumerate() {
            for (index, decl) in source.structs.iter().enumerate() {
                let name = format!("{}.{}", source.package, decl.name.name);
                self.types.declare_struct(StructId::new(file, index), name);
            }
        }
        for id in forest.function_ids() {
            self.check_function(id)?;
        }

        for (expr, callee) in std::mem::take(&mut self.deferred) {
            let Some(&ty) = forest.function(callee).resolved_return.get() else {
                return Err(Error::Internal(format!(
                    "return type of '{}' was never fixed",
                    forest.function(callee).name.name
                )));
            };
            expr.ty.get_or_init(|| ty);
        }
        Ok(())
    }

    /// Type a function's signature and body unless already done or underway
    pub fn check_function(&mut self, id: FuncId) -> Result<()> {
        let forest = self.forest;
        let func = forest.function(id);
        if func.check_state.get() != CheckState::Unchecked {
            return Ok(());
        }
        func.check_state.set(CheckState::InProgress);
        trace!("checking function {}", func.name.name);

        let declared = self.resolve_type_name(id.file, &func.return_type.name).ok_or_else(|| {
            Error::UnknownReturnType {
                name: func.name.name.clone(),
                ty: func.return_type.name.clone(),
                span: func.return_type.span,
            }
        })?;
        if declared != TypeStore::AUTO {
            func.resolved_return.get_or_init(|| declared);
        }

        // annotated parameter types first so a default value that calls back
        // into this function can have its arguments checked
        for param in &func.params {
            if !param.is_auto() {
                let ty = self.declared_type(param, id.file)?;
                param.ty.get_or_init(|| ty);
            }
        }
        for param in &func.params {
            self.check_var_decl(param, id)?;
        }
        if let Some(body) = &func.body {
            self.check_stmts(&body.stmts, id)?;
        }

        if func.resolved_return.get().is_none() {
            if func.body.is_none() {
                return Err(Error::UnknownReturnType {
                    name: func.name.name.clone(),
                    ty: func.return_type.name.clone(),
                    span: func.return_type.span,
                });
            }
            func.resolved_return.get_or_init(|| TypeStore::VOID);
        }
        if func.return_type.name == "auto" {
            debug!(
                "deduced return type of {}: {}",
                func.name.name,
                self.type_name(func.resolved_return.get().copied().unwrap_or(TypeStore::AUTO))
            );
        }
        func.check_state.set(CheckState::Checked);
        Ok(())
    }

    /// Builtin, then same-package struct, then imported struct
    fn resolve_type_name(&self, file: FileId, name: &str) -> Option<TypeId> {
        if let Some(ty) = self.types.builtin(name) {
            return Some(ty);
        }
        let source = self.forest.file(file);
        let id = self
            .registry
            .package(&source.package.to_string())
            .and_then(|package| package.struct_decl(name))
            .or_else(|| {
                source.imports.iter().find_map(|import| match import.resolved.get() {
                    Some(ImportTarget::Struct(id)) if import.local_name() == name => Some(*id),
                    _ => None,
                })
            })?;
        self.types.struct_type(id)
    }

    fn type_name(&self, ty: TypeId) -> String {
        self.types.name(ty).to_string()
    }

    fn var_type(&self, var: &VarRef) -> Result<TypeId> {
        var.binding
            .get()
            .and_then(|id| self.vars.get(id))
            .and_then(|decl| decl.ty.get().copied())
            .ok_or_else(|| Error::Internal(format!("variable '{}' has no type", var.name.name)))
    }

    // ==================== Statements ====================

    fn declared_type(&self, decl: &VarDecl, file: FileId) -> Result<TypeId> {
        self.resolve_type_name(file, &decl.ty_name.name)
            .ok_or_else(|| Error::UnknownVariableType {
                name: decl.name.name.clone(),
                ty: decl.ty_name.name.clone(),
                span: decl.ty_name.span,
            })
    }

    fn check_var_decl(&mut self, decl: &'a VarDecl, func: FuncId) -> Result<()> {
        let name = &decl.name.name;
        let ty = if decl.is_auto() {
            let Some(init) = &decl.init else {
                return Err(Error::CannotDeduce {
                    name: name.clone(),
                    span: decl.span,
                });
            };
            let ty = self.eval(init)?;
            if !self.types.is_complete(ty) {
                return Err(Error::CannotDeduce {
                    name: name.clone(),
                    span: decl.span,
                });
            }
            trace!("deduced {}: {}", name, self.type_name(ty));
            ty
        } else {
            let ty = match decl.ty.get() {
                Some(&ty) => ty,
                None => self.declared_type(decl, func.file)?,
            };
            if let Some(init) = &decl.init {
                let got = self.eval(init)?;
                if got != ty {
                    return Err(Error::InitTypeMismatch {
                        name: name.clone(),
                        expected: self.type_name(ty),
                        got: self.type_name(got),
                        span: init.span,
                    });
                }
            }
            ty
        };
        decl.ty.get_or_init(|| ty);
        Ok(())
    }

    fn check_stmts(&mut self, stmts: &'a [Stmt], func: FuncId) -> Result<()> {
        for stmt in stmts {
            self.check_stmt(stmt, func)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &'a Stmt, func: FuncId) -> Result<()> {
        match stmt {
            Stmt::Block(block) => self.check_stmts(&block.stmts, func),
            Stmt::If { cond, then_branch, else_branch, .. } => {
                let ty = self.eval(cond)?;
                if !self.types.is_boolean(ty) {
                    return Err(Error::IfCondition {
                        ty: self.type_name(ty),
                        span: cond.span,
                    });
                }
                self.check_stmt(then_branch, func)?;
                match else_branch {
                    Some(branch) => self.check_stmt(branch, func),
                    None => Ok(()),
                }
            }
            Stmt::VarDecl(decl) => self.check_var_decl(decl, func),
            Stmt::Assign { target, value, span } => {
                let var = match target {
                    AssignTarget::Var(var) => var,
                    AssignTarget::Member { base, .. } => {
                        return Err(Error::Internal(format!(
                            "assignment to a member of '{}' is not implemented",
                            base.name.name
                        )))
                    }
                };
                let got = self.eval(value)?;
                let expected = self.var_type(var)?;
                if got != expected {
                    return Err(Error::AssignTypeMismatch {
                        name: var.name.name.clone(),
                        expected: self.type_name(expected),
                        got: self.type_name(got),
                        span: *span,
                    });
                }
                Ok(())
            }
            Stmt::Return { value, span } => {
                let got = match value {
                    Some(value) => self.eval(value)?,
                    None => TypeStore::VOID,
                };
                let function = self.forest.function(func);
                match function.resolved_return.get() {
                    Some(&expected) if expected != got => Err(Error::ReturnTypeMismatch {
                        got: self.type_name(got),
                        expected: self.type_name(expected),
                        span: *span,
                    }),
                    Some(_) => Ok(()),
                    None if !self.types.is_complete(got) => Err(Error::IncompleteReturn { span: *span }),
                    None => {
                        function.resolved_return.get_or_init(|| got);
                        Ok(())
                    }
                }
            }
            Stmt::Expr(expr) => self.eval(expr).map(|_| ()),
        }
    }

    // ==================== Expressions ====================

    /// Type of `expr`, memoized on the node once complete
    ///
    /// Only a call into a function whose return type is still being deduced
    /// yields an incomplete type; that node is typed after the pass.
    pub fn eval(&mut self, expr: &'a Expr) -> Result<TypeId> {
        if let Some(&ty) = expr.ty.get() {
            return Ok(ty);
        }
        let ty = match &expr.kind {
            ExprKind::Literal(Literal::Int(_)) => TypeStore::INT,
            ExprKind::Literal(Literal::Bool(_)) => TypeStore::BOOL,
            ExprKind::Literal(Literal::String(_)) => TypeStore::STRING,
            ExprKind::Var(var) => self.var_type(var)?,
            ExprKind::Call { name, args, callee } => {
                let Some(&id) = callee.get() else {
                    return Err(Error::Internal(format!("call '{}' was never resolved", name.name)));
                };
                self.eval_call(expr, id, args)?
            }
            ExprKind::Binary { op, left, right } => {
                let left_ty = self.eval(left)?;
                let right_ty = self.eval(right)?;
                self.eval_binary(*op, left_ty, right_ty, expr)?
            }
            ExprKind::Unary { op, operand } => {
                let ty = self.eval(operand)?;
                match op {
                    UnOp::Plus | UnOp::Neg if !self.types.is_numeric(ty) => {
                        return Err(Error::ArithmeticOperand {
                            ty: self.type_name(ty),
                            span: expr.span,
                        })
                    }
                    UnOp::Not if !self.types.is_boolean(ty) => {
                        return Err(Error::NotOperand {
                            ty: self.type_name(ty),
                            span: expr.span,
                        })
                    }
                    _ => ty,
                }
            }
        };
        if self.types.is_complete(ty) {
            expr.ty.get_or_init(|| ty);
        }
        Ok(ty)
    }

    fn eval_call(&mut self, expr: &'a Expr, id: FuncId, args: &'a [Expr]) -> Result<TypeId> {
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            arg_types.push(self.eval(arg)?);
        }
        self.check_function(id)?;

        let callee = self.forest.function(id);
        for (index, ((arg, got), param)) in args.iter().zip(arg_types).zip(&callee.params).enumerate() {
            // an `auto` parameter whose default value is still being evaluated
            let Some(&expected) = param.ty.get() else {
                return Err(Error::CannotDeduce {
                    name: param.name.name.clone(),
                    span: param.span,
                });
            };
            if got != expected {
                return Err(Error::ArgumentTypeMismatch {
                    name: callee.name.name.clone(),
                    index: index + 1,
                    got: self.type_name(got),
                    expected: self.type_name(expected),
                    span: arg.span,
                });
            }
        }

        match callee.resolved_return.get() {
            Some(&ty) => Ok(ty),
            None => {
                trace!("deferring call to {}", callee.name.name);
                self.deferred.push((expr, id));
                Ok(TypeStore::AUTO)
            }
        }
    }

    fn eval_binary(&self, op: BinOp, left: TypeId, right: TypeId, expr: &Expr) -> Result<TypeId> {
        let types = &*self.types;
        let names = || (types.name(left).to_string(), types.name(right).to_string());
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                if types.is_numeric(left) && types.is_numeric(right) {
                    // single numeric type today, so no widening
                    Ok(left)
                } else {
                    let (left, right) = names();
                    Err(Error::ArithmeticOperands { left, right, span: expr.span })
                }
            }
            BinOp::Eq | BinOp::Ne => {
                if left == right && types.is_complete(left) {
                    Ok(TypeStore::BOOL)
                } else {
                    let (left, right) = names();
                    Err(Error::ComparisonOperands { left, right, span: expr.span })
                }
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if types.is_numeric(left) && types.is_numeric(right) {
                    Ok(TypeStore::BOOL)
                } else {
                    let (left, right) = names();
                    Err(Error::ComparisonOperands { left, right, span: expr.span })
                }
            }
            BinOp::And | BinOp::Or => {
                if types.is_boolean(left) && types.is_boolean(right) {
                    Ok(TypeStore::BOOL)
                } else {
                    let (left, right) = names();
                    Err(Error::BooleanOperands { left, right, span: expr.span })
                }
            }
        }
    }
}

fn collect_locals<'a>(stmts: &'a [Stmt], vars: &mut HashMap<VarId, &'a VarDecl>) {
    for stmt in stmts {
        match stmt {
            Stmt::Block(block) => collect_locals(&block.stmts, vars),
            Stmt::If { then_branch, else_branch, .. } => {
                collect_locals(std::slice::from_ref(&**then_branch), vars);
                if let Some(branch) = else_branch {
                    collect_locals(std::slice::from_ref(&**branch), vars);
                }
            }
            Stmt::VarDecl(decl) => {
                vars.insert(decl.id, decl);
            }
            Stmt::Assign { .. } | Stmt::Return { .. } | Stmt::Expr(_) => {}
        }
    }
}

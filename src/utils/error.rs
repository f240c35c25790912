//! Error handling for Tern

use crate::utils::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Compiler error
///
/// Every variant except [`Error::Internal`] and [`Error::Io`] is a user
/// diagnostic and carries the span it is reported at.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Parser Errors ====================

    #[error("Unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Expected identifier")]
    ExpectedIdent { span: Span },

    #[error("Expected expression")]
    ExpectedExpr { span: Span },

    #[error("Unknown annotation '@{name}'")]
    UnknownAnnotation { name: String, span: Span },

    #[error("Integer literal {literal} is out of range")]
    IntegerOutOfRange { literal: String, span: Span },

    // ==================== Declaration Errors ====================

    /// Composed by the diagnostics formatter, notices included
    #[error("{message}")]
    Conflict { message: String, span: Span },

    #[error("Implementation missing for the function '{name}'")]
    MissingImplementation { name: String, span: Span },

    #[error("Extern function '{name}' must not have implementation")]
    ExternWithBody { name: String, span: Span },

    #[error("Argument '{name}' has no default value while previous argument '{previous}' has")]
    MissingDefaultValue {
        name: String,
        previous: String,
        span: Span,
    },

    // ==================== Import Errors ====================

    #[error("Import of a declaration from the current package is meaningless")]
    MeaninglessImport { span: Span },

    #[error("No such package '{package}'")]
    NoSuchPackage { package: String, span: Span },

    #[error("Declaration '{name}' not found in package '{package}'")]
    DeclarationNotFound {
        name: String,
        package: String,
        span: Span,
    },

    #[error("Struct '{name}' is private in the package '{package}'")]
    PrivateStruct {
        name: String,
        package: String,
        span: Span,
    },

    #[error("Struct '{name}' is protected in the package '{package}' which is not parent of current package '{current}'")]
    ProtectedStruct {
        name: String,
        package: String,
        current: String,
        span: Span,
    },

    /// Composed by the diagnostics formatter, candidate notices included
    #[error("{message}")]
    NoVisibleOverloads { message: String, span: Span },

    // ==================== Resolution Errors ====================

    #[error("Unresolved function call '{name}'")]
    UnresolvedCall { name: String, span: Span },

    #[error("{descr} is called with incorrect number of arguments")]
    ArgumentCount { descr: String, span: Span },

    #[error("Call of function '{name}' is ambiguous: {candidates} overloads accept {args} arguments")]
    AmbiguousCall {
        name: String,
        candidates: usize,
        args: usize,
        span: Span,
    },

    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    #[error("Variable '{name}' accessed before initialization")]
    UninitializedAccess { name: String, span: Span },

    #[error("Variable '{name}' is never used")]
    UnusedVariable { name: String, span: Span },

    #[error("Attempt to modify function argument '{name}'")]
    ArgumentModification { name: String, span: Span },

    // ==================== Type Errors ====================

    #[error("Attempt to init variable '{name}' of type '{expected}' with value of type '{got}'")]
    InitTypeMismatch {
        name: String,
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Attempt to assign value of type '{got}' to the variable '{name}' of type '{expected}'")]
    AssignTypeMismatch {
        name: String,
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Can't perform arythmetic operation on values of types '{left}' and '{right}'")]
    ArithmeticOperands {
        left: String,
        right: String,
        span: Span,
    },

    #[error("Can't perform arythmetic operation on value of type '{ty}'")]
    ArithmeticOperand { ty: String, span: Span },

    #[error("Can't compare values of types '{left}' and '{right}'")]
    ComparisonOperands {
        left: String,
        right: String,
        span: Span,
    },

    #[error("Can't perform boolean operations on values of types '{left}' and '{right}'")]
    BooleanOperands {
        left: String,
        right: String,
        span: Span,
    },

    #[error("Can't perform boolean not operation on value of type '{ty}'")]
    NotOperand { ty: String, span: Span },

    #[error("If statement can't work with condition of type '{ty}'")]
    IfCondition { ty: String, span: Span },

    #[error("Can't return value of incomplete type")]
    IncompleteReturn { span: Span },

    #[error("Attempt to return value of type '{got}' from function returning '{expected}'")]
    ReturnTypeMismatch {
        got: String,
        expected: String,
        span: Span,
    },

    #[error("Function '{name}' returns unknown type '{ty}'")]
    UnknownReturnType {
        name: String,
        ty: String,
        span: Span,
    },

    #[error("Variable '{name}' has unknown type '{ty}'")]
    UnknownVariableType {
        name: String,
        ty: String,
        span: Span,
    },

    #[error("Can't deduce variable '{name}' type.")]
    CannotDeduce { name: String, span: Span },

    #[error("Can't call function '{name}' with argument {index} of type '{got}'. Expected type is '{expected}'")]
    ArgumentTypeMismatch {
        name: String,
        index: usize,
        got: String,
        expected: String,
        span: Span,
    },

    // ==================== Non-diagnostic Errors ====================

    /// An analyzer gap or broken invariant, not a user mistake
    #[error("Internal compiler error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::ExpectedIdent { span }
            | Self::ExpectedExpr { span }
            | Self::UnknownAnnotation { span, .. }
            | Self::IntegerOutOfRange { span, .. }
            | Self::Conflict { span, .. }
            | Self::MissingImplementation { span, .. }
            | Self::ExternWithBody { span, .. }
            | Self::MissingDefaultValue { span, .. }
            | Self::MeaninglessImport { span }
            | Self::NoSuchPackage { span, .. }
            | Self::DeclarationNotFound { span, .. }
            | Self::PrivateStruct { span, .. }
            | Self::ProtectedStruct { span, .. }
            | Self::NoVisibleOverloads { span, .. }
            | Self::UnresolvedCall { span, .. }
            | Self::ArgumentCount { span, .. }
            | Self::AmbiguousCall { span, .. }
            | Self::UndefinedVariable { span, .. }
            | Self::UninitializedAccess { span, .. }
            | Self::UnusedVariable { span, .. }
            | Self::ArgumentModification { span, .. }
            | Self::InitTypeMismatch { span, .. }
            | Self::AssignTypeMismatch { span, .. }
            | Self::ArithmeticOperands { span, .. }
            | Self::ArithmeticOperand { span, .. }
            | Self::ComparisonOperands { span, .. }
            | Self::BooleanOperands { span, .. }
            | Self::NotOperand { span, .. }
            | Self::IfCondition { span, .. }
            | Self::IncompleteReturn { span }
            | Self::ReturnTypeMismatch { span, .. }
            | Self::UnknownReturnType { span, .. }
            | Self::UnknownVariableType { span, .. }
            | Self::CannotDeduce { span, .. }
            | Self::ArgumentTypeMismatch { span, .. } => Some(*span),
            Self::Internal(_) | Self::Io(_) => None,
        }
    }

    /// Whether this error signals an analyzer bug rather than a user mistake
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

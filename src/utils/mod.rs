//! Utility module

mod span;
mod error;

pub use span::{FileId, Span};
pub use error::{Error, Result};

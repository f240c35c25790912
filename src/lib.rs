//! Tern
//!
//! Front end and semantic analysis for a small statically-typed language
//! organized into dotted-name packages.

pub mod feedback;
pub mod frontend;
pub mod types;
pub mod utils;

pub use frontend::semantic::{analyze, Analysis};
pub use utils::{Error, Result};

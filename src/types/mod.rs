//! Canonical types

mod type_system;

pub use type_system::{TypeId, TypeInfo, TypeProps, TypeStore};

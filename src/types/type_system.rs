//! Type System for Tern
//!
//! Every type lives exactly once in a [`TypeStore`]; two types are the same
//! type iff their [`TypeId`] handles are equal.

use std::collections::HashMap;
use std::ops::BitOr;

use crate::frontend::ast::StructId;

/// Handle into the canonical type store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// Property bitmask of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeProps(u8);

impl TypeProps {
    pub const NONE: Self = Self(0);
    pub const COMPLETE: Self = Self(1);
    pub const NUMERIC: Self = Self(1 << 1);
    pub const BOOLEAN: Self = Self(1 << 2);
    pub const PRIMITIVE: Self = Self(1 << 3);
    pub const VOID: Self = Self(1 << 4);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TypeProps {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Canonical type entry
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub props: TypeProps,
}

/// The global type catalog
#[derive(Debug)]
pub struct TypeStore {
    types: Vec<TypeInfo>,
    builtins: HashMap<&'static str, TypeId>,
    structs: HashMap<StructId, TypeId>,
}

impl TypeStore {
    pub const AUTO: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    pub const STRING: TypeId = TypeId(4);

    pub fn new() -> Self {
        let mut store = Self {
            types: Vec::new(),
            builtins: HashMap::new(),
            structs: HashMap::new(),
        };
        // order must match the associated constants
        store.add_builtin("auto", TypeProps::NONE);
        store.add_builtin("void", TypeProps::COMPLETE | TypeProps::PRIMITIVE | TypeProps::VOID);
        store.add_builtin("int", TypeProps::COMPLETE | TypeProps::PRIMITIVE | TypeProps::NUMERIC);
        store.add_builtin("bool", TypeProps::COMPLETE | TypeProps::PRIMITIVE | TypeProps::BOOLEAN);
        store.add_builtin("string", TypeProps::COMPLETE);
        store
    }

    fn add_builtin(&mut self, name: &'static str, props: TypeProps) {
        let id = TypeId(self.types.len());
        self.types.push(TypeInfo {
            name: name.to_string(),
            props,
        });
        self.builtins.insert(name, id);
    }

    /// Look up a builtin type by its source name
    pub fn builtin(&self, name: &str) -> Option<TypeId> {
        self.builtins.get(name).copied()
    }

    /// Register the type of a struct declaration; idempotent
    pub fn declare_struct(&mut self, id: StructId, qualified_name: String) -> TypeId {
        if let Some(&existing) = self.structs.get(&id) {
            return existing;
        }
        let ty = TypeId(self.types.len());
        self.types.push(TypeInfo {
            name: qualified_name,
            props: TypeProps::COMPLETE,
        });
        self.structs.insert(id, ty);
        ty
    }

    pub fn struct_type(&self, id: StructId) -> Option<TypeId> {
        self.structs.get(&id).copied()
    }

    pub fn info(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.0]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.types[id.0].name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_complete(&self, id: TypeId) -> bool {
        self.info(id).props.contains(TypeProps::COMPLETE)
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.info(id).props.contains(TypeProps::NUMERIC)
    }

    pub fn is_boolean(&self, id: TypeId) -> bool {
        self.info(id).props.contains(TypeProps::BOOLEAN)
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        self.info(id).props.contains(TypeProps::VOID)
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

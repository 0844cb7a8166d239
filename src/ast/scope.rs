// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Static scopes: name to type symbol tables used when building the tree
//!
//! The interpreter consults a frame's scope to decide whether an identifier is
//! resolved statically (declared by the scope) or dynamically (searched across
//! frames at runtime).

use crate::model::TypeInfo;
use indexmap::IndexMap;
use std::sync::Arc;

/// Kind of a static scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeType {
    /// Root scope of the evaluated data object
    Global,
    /// Nested scope of a navigated object or loop body
    Local,
    /// Scope of a collection filter predicate
    Filter,
    /// Scope of bound variables
    VariablesMap,
}

/// Immutable symbol table with an optional parent
#[derive(Debug, Clone)]
pub struct Scope {
    scope_type: ScopeType,
    parent: Option<Arc<Scope>>,
    object_type: TypeInfo,
    symbols: IndexMap<String, TypeInfo>,
}

impl Scope {
    /// Create a parentless scope
    pub fn new(scope_type: ScopeType, object_type: TypeInfo) -> Self {
        Self {
            scope_type,
            parent: None,
            object_type,
            symbols: IndexMap::new(),
        }
    }

    /// Global scope without any declared symbols
    pub fn root() -> Arc<Scope> {
        Arc::new(Scope::new(ScopeType::Global, TypeInfo::Any))
    }

    /// Declare a symbol
    pub fn with_symbol(mut self, name: impl Into<String>, symbol_type: TypeInfo) -> Self {
        self.symbols.insert(name.into(), symbol_type);
        self
    }

    /// Attach a parent scope
    pub fn with_parent(mut self, parent: &Arc<Scope>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Child scope of `parent`
    pub fn child(parent: &Arc<Scope>, scope_type: ScopeType, object_type: TypeInfo) -> Self {
        Scope::new(scope_type, object_type).with_parent(parent)
    }

    /// Finish building
    pub fn shared(self) -> Arc<Scope> {
        Arc::new(self)
    }

    /// Kind of this scope
    pub fn scope_type(&self) -> ScopeType {
        self.scope_type
    }

    /// Static type of the object this scope describes
    pub fn object_type(&self) -> &TypeInfo {
        &self.object_type
    }

    /// Parent scope
    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Symbols declared directly in this scope
    pub fn symbols(&self) -> &IndexMap<String, TypeInfo> {
        &self.symbols
    }

    /// Check whether this scope itself declares a name
    pub fn declares(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Resolve a name through this scope and its ancestors
    pub fn resolve(&self, name: &str) -> Option<(&TypeInfo, ScopeType)> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(symbol_type) = scope.symbols.get(name) {
                return Some((symbol_type, scope.scope_type));
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// The scope in this chain that declares a name, innermost first
    pub fn declaring_scope<'a>(self: &'a Arc<Self>, name: &str) -> Option<&'a Arc<Scope>> {
        let mut current = self;
        loop {
            if current.declares(name) {
                return Some(current);
            }
            current = current.parent.as_ref()?;
        }
    }

    /// Check whether a name resolves to a symbol of the global scope
    pub fn is_global(&self, name: &str) -> bool {
        matches!(self.resolve(name), Some((_, ScopeType::Global)))
    }

    /// Outermost ancestor
    pub fn global(self: &Arc<Self>) -> Arc<Scope> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent.clone() {
            current = parent;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_walks_parents() {
        let global = Scope::new(ScopeType::Global, TypeInfo::named("Policy"))
            .with_symbol("state", TypeInfo::String)
            .shared();
        let filter = Scope::child(&global, ScopeType::Filter, TypeInfo::named("Vehicle"))
            .with_symbol("model", TypeInfo::String)
            .shared();

        assert!(filter.declares("model"));
        assert!(!filter.declares("state"));
        assert_eq!(
            filter.resolve("state"),
            Some((&TypeInfo::String, ScopeType::Global))
        );
        assert_eq!(filter.resolve("missing"), None);
        assert!(filter.is_global("state"));
        assert!(!filter.is_global("model"));
        assert!(Arc::ptr_eq(&filter.global(), &global));
        assert!(filter.declaring_scope("state").is_some_and(|s| Arc::ptr_eq(s, &global)));
        assert!(filter.declaring_scope("model").is_some_and(|s| Arc::ptr_eq(s, &filter)));
        assert!(filter.declaring_scope("missing").is_none());
    }
}

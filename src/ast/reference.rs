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

//! Addressable-path view over expression nodes

use super::expression::{Expression, ExpressionKind};
use super::scope::ScopeType;

/// An expression usable as an addressable path
#[derive(Debug, Clone, Copy)]
pub struct Reference<'a> {
    expression: &'a Expression,
}

impl Expression {
    /// View this node as a reference, if it is one
    pub fn as_reference(&self) -> Option<Reference<'_>> {
        match self.kind() {
            ExpressionKind::Identifier(_)
            | ExpressionKind::This
            | ExpressionKind::Path(_)
            | ExpressionKind::AccessByIndex(_)
            | ExpressionKind::CollectionFilter(_)
            | ExpressionKind::Cast(_) => Some(Reference { expression: self }),
            _ => None,
        }
    }
}

impl<'a> Reference<'a> {
    /// Underlying node
    pub fn expression(&self) -> &'a Expression {
        self.expression
    }

    /// Leftmost constituent reference
    pub fn first_reference(&self) -> Reference<'a> {
        let next = match self.expression.kind() {
            ExpressionKind::Path(path) => path.object.as_reference(),
            ExpressionKind::AccessByIndex(access) => access.collection.as_reference(),
            ExpressionKind::CollectionFilter(filter) => filter.collection.as_reference(),
            ExpressionKind::Cast(cast) => cast.expression.as_reference(),
            _ => None,
        };
        match next {
            Some(reference) => reference.first_reference(),
            None => *self,
        }
    }

    /// Kind of scope the leftmost reference resolves in; `None` when the name
    /// is not statically known and is resolved dynamically at runtime
    pub fn scope_type(&self) -> Option<ScopeType> {
        let first = self.first_reference().expression;
        match first.kind() {
            ExpressionKind::Identifier(name) => {
                let head = name.split('.').next().unwrap_or(name);
                first.scope().resolve(head).map(|(_, scope_type)| scope_type)
            }
            ExpressionKind::This => Some(first.scope().scope_type()),
            _ => None,
        }
    }

    /// True when the reference starts in the scope it was built in, rather
    /// than being reachable only through an enclosing or global scope
    pub fn is_referencing_current_scope(&self) -> bool {
        let first = self.first_reference().expression;
        match first.kind() {
            ExpressionKind::Identifier(name) => {
                let head = name.split('.').next().unwrap_or(name);
                first.scope().declares(head)
            }
            ExpressionKind::This => true,
            _ => false,
        }
    }

    /// Only identifiers joined by navigation, with no array-typed object in
    /// between
    pub fn is_simple_bean_path(&self) -> bool {
        match self.expression.kind() {
            ExpressionKind::Identifier(_) => true,
            ExpressionKind::Path(path) => {
                !path.object.eval_type().is_array_like()
                    && is_simple_bean_path(&path.object)
                    && is_simple_bean_path(&path.property)
            }
            _ => false,
        }
    }

    /// Composed purely of identifiers joined by navigation
    pub fn is_simple_path(&self) -> bool {
        match self.expression.kind() {
            ExpressionKind::Identifier(_) => true,
            ExpressionKind::Path(path) => {
                is_simple_path(&path.object) && is_simple_path(&path.property)
            }
            _ => false,
        }
    }
}

fn is_simple_bean_path(expression: &Expression) -> bool {
    expression
        .as_reference()
        .is_some_and(|r| r.is_simple_bean_path())
}

fn is_simple_path(expression: &Expression) -> bool {
    expression.as_reference().is_some_and(|r| r.is_simple_path())
}

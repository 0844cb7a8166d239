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

//! Runtime type checks behind `instanceof` and `typeof`

use crate::model::{TypeInfo, Value};
use rustc_hash::FxHashMap;

/// Answers runtime type questions about values
pub trait TypeProvider: Send + Sync {
    /// Exact type name of a value
    fn type_of(&self, value: &Value) -> String;

    /// Check whether a value is an instance of a type, honoring inheritance
    fn is_instance_of(&self, value: &Value, target: &TypeInfo) -> bool;

    /// Check whether a value has exactly the given type
    fn is_exactly(&self, value: &Value, target: &TypeInfo) -> bool {
        !value.is_null() && self.type_of(value) == target.to_string()
    }
}

/// Type provider backed by a table of declared supertypes
#[derive(Debug, Clone, Default)]
pub struct DefaultTypeProvider {
    supertypes: FxHashMap<String, Vec<String>>,
}

impl DefaultTypeProvider {
    /// Provider without any declared inheritance
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `supertype` as a parent of `type_name`
    pub fn with_supertype(
        mut self,
        type_name: impl Into<String>,
        supertype: impl Into<String>,
    ) -> Self {
        self.supertypes
            .entry(type_name.into())
            .or_default()
            .push(supertype.into());
        self
    }

    /// Check whether `type_name` is `ancestor` or inherits from it
    pub fn is_subtype(&self, type_name: &str, ancestor: &str) -> bool {
        let mut pending = vec![type_name];
        let mut seen: Vec<&str> = Vec::new();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(parents) = self.supertypes.get(current) {
                pending.extend(parents.iter().map(String::as_str));
            }
        }
        false
    }
}

impl TypeProvider for DefaultTypeProvider {
    fn type_of(&self, value: &Value) -> String {
        match value {
            Value::Null => "Null".to_string(),
            other => TypeInfo::of(other).to_string(),
        }
    }

    fn is_instance_of(&self, value: &Value, target: &TypeInfo) -> bool {
        match (target, value) {
            (_, Value::Null) => false,
            (TypeInfo::Any | TypeInfo::Generic(_), _) => true,
            (TypeInfo::Unknown, _) => false,
            (TypeInfo::Named(name), Value::Object(object)) => {
                self.is_subtype(object.type_name(), name)
            }
            (TypeInfo::Array(element), Value::Collection(items)) => items
                .iter()
                .all(|item| item.is_null() || self.is_instance_of(item, element)),
            (TypeInfo::Union(members), value) => {
                members.iter().any(|member| self.is_instance_of(value, member))
            }
            (target, value) => target.accepts(value),
        }
    }
}

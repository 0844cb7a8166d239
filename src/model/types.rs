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

//! Static type system for KEL expressions

use super::value::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type information attached to AST nodes and function signatures
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeInfo {
    /// Any type (dynamic)
    Any,
    /// No type could be determined
    Unknown,
    /// Boolean value (true/false)
    Boolean,
    /// String value
    String,
    /// Decimal number
    Number,
    /// Monetary amount with currency
    Money,
    /// Calendar date without time
    Date,
    /// Date with time in UTC
    DateTime,
    /// String-keyed map
    Map,
    /// Array with element type
    Array(Box<TypeInfo>),
    /// Domain type known by name
    Named(String),
    /// Generic type parameter of a function signature
    Generic(String),
    /// Union of multiple types
    Union(Vec<TypeInfo>),
}

impl TypeInfo {
    /// Array of the given element type
    pub fn array(element: TypeInfo) -> Self {
        TypeInfo::Array(Box::new(element))
    }

    /// Generic type parameter reference
    pub fn generic(name: impl Into<String>) -> Self {
        TypeInfo::Generic(name.into())
    }

    /// Named domain type
    pub fn named(name: impl Into<String>) -> Self {
        TypeInfo::Named(name.into())
    }

    /// Resolve a type token as written in expressions (`Number`, `Date[]`, `Vehicle`)
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if let Some(element) = name.strip_suffix("[]") {
            return TypeInfo::array(TypeInfo::from_name(element));
        }
        match name {
            "Any" => TypeInfo::Any,
            "Boolean" => TypeInfo::Boolean,
            "String" => TypeInfo::String,
            "Number" | "Decimal" | "Integer" => TypeInfo::Number,
            "Money" => TypeInfo::Money,
            "Date" => TypeInfo::Date,
            "DateTime" => TypeInfo::DateTime,
            "Map" => TypeInfo::Map,
            "Unknown" => TypeInfo::Unknown,
            other => TypeInfo::Named(other.to_string()),
        }
    }

    /// Check whether a value of type `other` can be used where `self` is expected
    pub fn is_assignable_from(&self, other: &TypeInfo) -> bool {
        match (self, other) {
            (TypeInfo::Any, _) => true,
            (_, TypeInfo::Unknown) => false,
            (TypeInfo::Union(members), TypeInfo::Union(others)) => others
                .iter()
                .all(|o| members.iter().any(|m| m.is_assignable_from(o))),
            (TypeInfo::Union(members), other) => {
                members.iter().any(|m| m.is_assignable_from(other))
            }
            (TypeInfo::Array(a), TypeInfo::Array(b)) => a.is_assignable_from(b),
            _ => self == other,
        }
    }

    /// Nearest common type of two types, if one exists
    pub fn common_type(&self, other: &TypeInfo) -> Option<TypeInfo> {
        if self.is_assignable_from(other) {
            return Some(self.clone());
        }
        if other.is_assignable_from(self) {
            return Some(other.clone());
        }
        match (self, other) {
            (TypeInfo::Array(a), TypeInfo::Array(b)) => a.common_type(b).map(TypeInfo::array),
            _ => None,
        }
    }

    /// Element type for array-like types
    pub fn element_type(&self) -> TypeInfo {
        match self {
            TypeInfo::Array(element) => (**element).clone(),
            TypeInfo::Any => TypeInfo::Any,
            _ => TypeInfo::Unknown,
        }
    }

    /// Check if this type denotes a collection
    pub fn is_array_like(&self) -> bool {
        matches!(self, TypeInfo::Array(_))
    }

    /// True when any part of this type is an unresolved generic
    pub fn contains_generic(&self) -> bool {
        match self {
            TypeInfo::Generic(_) => true,
            TypeInfo::Array(element) => element.contains_generic(),
            TypeInfo::Union(members) => members.iter().any(TypeInfo::contains_generic),
            _ => false,
        }
    }

    /// Collect generic parameter names used in this type
    pub fn generic_names(&self, names: &mut Vec<String>) {
        match self {
            TypeInfo::Generic(name) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            TypeInfo::Array(element) => element.generic_names(names),
            TypeInfo::Union(members) => members.iter().for_each(|m| m.generic_names(names)),
            _ => {}
        }
    }

    /// Replace generic parameters with their bindings
    pub fn substitute(&self, bindings: &FxHashMap<String, TypeInfo>) -> TypeInfo {
        match self {
            TypeInfo::Generic(name) => bindings.get(name).cloned().unwrap_or(TypeInfo::Any),
            TypeInfo::Array(element) => TypeInfo::array(element.substitute(bindings)),
            TypeInfo::Union(members) => {
                TypeInfo::Union(members.iter().map(|m| m.substitute(bindings)).collect())
            }
            other => other.clone(),
        }
    }

    /// Check a runtime value against this type without any coercion.
    ///
    /// Null is accepted by every type; nullability is a parameter constraint,
    /// not a type property.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (TypeInfo::Any | TypeInfo::Generic(_), _) => true,
            (TypeInfo::Boolean, Value::Boolean(_)) => true,
            (TypeInfo::String, Value::String(_)) => true,
            (TypeInfo::Number, Value::Number(_)) => true,
            (TypeInfo::Money, Value::Money(_)) => true,
            (TypeInfo::Date, Value::Date(_)) => true,
            (TypeInfo::DateTime, Value::DateTime(_)) => true,
            (TypeInfo::Map, Value::Map(_)) => true,
            (TypeInfo::Array(element), Value::Collection(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (TypeInfo::Named(name), Value::Object(object)) => object.type_name() == name,
            (TypeInfo::Union(members), value) => members.iter().any(|m| m.accepts(value)),
            _ => false,
        }
    }

    /// Runtime type of a value
    pub fn of(value: &Value) -> TypeInfo {
        match value {
            Value::Null => TypeInfo::Any,
            Value::Boolean(_) => TypeInfo::Boolean,
            Value::String(_) => TypeInfo::String,
            Value::Number(_) => TypeInfo::Number,
            Value::Money(_) => TypeInfo::Money,
            Value::Date(_) => TypeInfo::Date,
            Value::DateTime(_) => TypeInfo::DateTime,
            Value::Map(_) => TypeInfo::Map,
            Value::Object(object) => TypeInfo::Named(object.type_name().to_string()),
            Value::Collection(items) => {
                let mut element: Option<TypeInfo> = None;
                for item in items.iter().filter(|i| !i.is_null()) {
                    let item_type = TypeInfo::of(item);
                    element = match element {
                        None => Some(item_type),
                        Some(current) => {
                            Some(current.common_type(&item_type).unwrap_or(TypeInfo::Any))
                        }
                    };
                }
                TypeInfo::array(element.unwrap_or(TypeInfo::Any))
            }
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Any => write!(f, "Any"),
            TypeInfo::Unknown => write!(f, "Unknown"),
            TypeInfo::Boolean => write!(f, "Boolean"),
            TypeInfo::String => write!(f, "String"),
            TypeInfo::Number => write!(f, "Number"),
            TypeInfo::Money => write!(f, "Money"),
            TypeInfo::Date => write!(f, "Date"),
            TypeInfo::DateTime => write!(f, "DateTime"),
            TypeInfo::Map => write!(f, "Map"),
            TypeInfo::Array(element) => write!(f, "{element}[]"),
            TypeInfo::Named(name) => write!(f, "{name}"),
            TypeInfo::Generic(name) => write!(f, "<{name}>"),
            TypeInfo::Union(members) => {
                let names: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", names.join(" | "))
            }
        }
    }
}

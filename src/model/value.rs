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

//! Runtime value representation

use super::compare;
use super::money::Money;
use super::object::DataObject;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a domain object
pub type ObjectRef = Arc<dyn DataObject>;

/// Dynamic runtime value produced by evaluation
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Null,
    /// Boolean value
    Boolean(bool),
    /// String value
    String(Arc<str>),
    /// Decimal number
    Number(Decimal),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time in UTC
    DateTime(DateTime<Utc>),
    /// Monetary amount
    Money(Money),
    /// Ordered collection of values
    Collection(Collection),
    /// String-keyed map, insertion ordered
    Map(Arc<IndexMap<String, Value>>),
    /// Opaque domain object
    Object(ObjectRef),
}

/// Immutable ordered collection of values
#[derive(Clone, Default)]
pub struct Collection(Arc<[Value]>);

impl Collection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection from a vector
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self(values.into())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the collection has no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over elements
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Element at a zero-based index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// First element
    pub fn first(&self) -> Option<&Value> {
        self.0.first()
    }

    /// Last element
    pub fn last(&self) -> Option<&Value> {
        self.0.last()
    }

    /// Element-wise membership using value equality
    pub fn contains(&self, value: &Value) -> bool {
        self.0.iter().any(|item| item == value)
    }

    /// Elements as a slice
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Copy elements into a vector
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.to_vec()
    }
}

impl From<Vec<Value>> for Collection {
    fn from(values: Vec<Value>) -> Self {
        Self::from_vec(values)
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Value {
    /// String value
    pub fn string(value: impl AsRef<str>) -> Self {
        Value::String(Arc::from(value.as_ref()))
    }

    /// Number value
    pub fn number(value: impl Into<Decimal>) -> Self {
        Value::Number(value.into())
    }

    /// Collection value
    pub fn collection(values: Vec<Value>) -> Self {
        Value::Collection(Collection::from_vec(values))
    }

    /// Empty collection
    pub fn empty_collection() -> Self {
        Value::Collection(Collection::new())
    }

    /// Map value
    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Value::Map(Arc::new(entries))
    }

    /// Domain object value
    pub fn object(object: impl DataObject + 'static) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Monetary value
    pub fn money(amount: impl Into<Decimal>, currency: impl Into<String>) -> Self {
        Value::Money(Money::new(amount.into(), currency))
    }

    /// Check if this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a collection
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Collection(_))
    }

    /// Coerced truth: only `true` is true, everything else (null included) is false
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    /// Boolean content
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String content
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content; money contributes its amount
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Money(m) => Some(m.amount),
            _ => None,
        }
    }

    /// Collection content
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// View as a list of elements: a collection yields its elements, null
    /// yields nothing, anything else is a single element
    pub fn to_elements(&self) -> Vec<Value> {
        match self {
            Value::Null => Vec::new(),
            Value::Collection(items) => items.to_vec(),
            other => vec![other.clone()],
        }
    }

    /// Runtime type name used in messages and by `typeof`
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "Null".to_string(),
            Value::Boolean(_) => "Boolean".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Number(_) => "Number".to_string(),
            Value::Date(_) => "Date".to_string(),
            Value::DateTime(_) => "DateTime".to_string(),
            Value::Money(_) => "Money".to_string(),
            Value::Collection(_) => "Collection".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Object(object) => object.type_name().to_string(),
        }
    }

    /// Read a property of a map or domain object
    pub fn get_property(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(entries) => entries.get(name).cloned(),
            Value::Object(object) => object.get(name),
            _ => None,
        }
    }

    /// Check whether a map or domain object carries a property
    pub fn has_property(&self, name: &str) -> bool {
        match self {
            Value::Map(entries) => entries.contains_key(name),
            Value::Object(object) => object.has_property(name),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        compare::equals(self, other).unwrap_or(false)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Money> for Value {
    fn from(value: Money) -> Self {
        Value::Money(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::collection(values)
    }
}

/// Rendering used by string templates; null renders as an empty string
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Money(m) => write!(f, "{m}"),
            Value::Collection(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Object(object) => write!(f, "{}", object.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Date(d) => write!(f, "Date({d})"),
            Value::DateTime(dt) => write!(f, "DateTime({})", dt.to_rfc3339()),
            Value::Money(m) => write!(f, "Money({m})"),
            Value::Collection(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Map(entries) => f.debug_map().entries(entries.iter()).finish(),
            Value::Object(object) => write!(f, "{object:?}"),
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn test_numbers_equal_after_normalization() {
        assert_eq!(Value::Number(dec("1.0")), Value::Number(dec("1")));
        assert_eq!(Value::Number(dec("2.500")), Value::Number(dec("2.5")));
        assert_ne!(Value::Number(dec("2.51")), Value::Number(dec("2.5")));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Boolean(true).is_true());
        assert!(!Value::Boolean(false).is_true());
        assert!(!Value::Null.is_true());
        assert!(!Value::string("true").is_true());
    }

    #[test]
    fn test_display_for_templates() {
        assert_eq!(Value::Number(dec("10.50")).to_string(), "10.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(
            Value::collection(vec![Value::from(1), Value::from("a")]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn test_money_as_decimal() {
        assert_eq!(Value::money(dec("12.3"), "EUR").as_decimal(), Some(dec("12.3")));
        assert_eq!(Value::string("x").as_decimal(), None);
    }
}

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

//! Equality and ordering between runtime values

use super::value::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Equality of two values.
///
/// Returns `None` when the pair of kinds has no defined equality. Null equals
/// only null. Numbers compare after normalization, money compares as its
/// amount against plain numbers.
pub fn equals(left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(true),
        (Value::Null, _) | (_, Value::Null) => Some(false),
        (Value::Money(a), Value::Money(b)) => {
            Some(a.amount.normalize() == b.amount.normalize() && a.same_currency(b))
        }
        (Value::Number(_) | Value::Money(_), Value::Number(_) | Value::Money(_)) => {
            let a = left.as_decimal()?.normalize();
            let b = right.as_decimal()?.normalize();
            Some(a == b)
        }
        (Value::Boolean(a), Value::Boolean(b)) => Some(a == b),
        (Value::String(a), Value::String(b)) => Some(a == b),
        (Value::Date(a), Value::Date(b)) => Some(a == b),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a == b),
        (Value::Collection(a), Value::Collection(b)) => {
            if a.len() != b.len() {
                return Some(false);
            }
            for (x, y) in a.iter().zip(b.iter()) {
                if equals(x, y) != Some(true) {
                    return Some(false);
                }
            }
            Some(true)
        }
        (Value::Map(a), Value::Map(b)) => {
            if a.len() != b.len() {
                return Some(false);
            }
            Some(a.iter().all(|(key, value)| {
                b.get(key).is_some_and(|other| equals(value, other) == Some(true))
            }))
        }
        (Value::Object(a), Value::Object(b)) => Some(Arc::ptr_eq(a, b)),
        _ => None,
    }
}

/// Ordering of two values.
///
/// Defined for number against number (money counting as its amount), date
/// against date and datetime against datetime. Money against money needs a
/// shared currency. Every other pairing yields `None`.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Money(a), Value::Money(b)) if !a.same_currency(b) => None,
        (Value::Number(_) | Value::Money(_), Value::Number(_) | Value::Money(_)) => {
            Some(left.as_decimal()?.cmp(&right.as_decimal()?))
        }
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Membership test used by the `in` operator
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Collection(items) => items.iter().any(|item| equals(item, needle) == Some(true)),
        Value::Null => false,
        single => equals(single, needle) == Some(true),
    }
}

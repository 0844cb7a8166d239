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

//! Value coercion to a declared type

use super::types::TypeInfo;
use super::value::{Collection, Value};

/// Coerce a value to a declared type.
///
/// A value the type already accepts is returned unchanged. The only
/// conversion applied is money to number via its amount, also element-wise
/// inside arrays. Returns `None` for anything else.
pub fn coerce_value(value: Value, target: &TypeInfo) -> Option<Value> {
    if target.accepts(&value) {
        return Some(value);
    }
    match (target, value) {
        (target, Value::Money(money)) if target.accepts(&Value::Number(money.amount)) => {
            Some(Value::Number(money.amount))
        }
        (TypeInfo::Array(element), Value::Collection(items)) => {
            let coerced: Option<Collection> = items
                .iter()
                .map(|item| coerce_value(item.clone(), element))
                .collect();
            coerced.map(Value::Collection)
        }
        _ => None,
    }
}

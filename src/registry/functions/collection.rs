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

//! Collection functions
//!
//! A null argument behaves as an empty collection. Membership and set
//! operations use value equality, so `1.0` and `1` are the same element.

use crate::model::compare;
use crate::model::{TypeInfo, Value};
use crate::registry::function::FnNative;
use crate::registry::library::FunctionRegistration;
use crate::registry::signature::ParameterInfo;

fn items_of_t() -> TypeInfo {
    TypeInfo::array(TypeInfo::generic("T"))
}

/// Register all collection functions
pub fn register_collection_functions(functions: &mut Vec<FunctionRegistration>) {
    functions.push(
        FnNative::builder("Count")
            .param("items", TypeInfo::array(TypeInfo::Any))
            .returns(TypeInfo::Number)
            .doc("Number of elements.")
            .body(|args, _| Ok(Value::from(args[0].to_elements().len() as i64)))
            .into(),
    );
    functions.push(
        FnNative::builder("IsEmpty")
            .param("items", TypeInfo::array(TypeInfo::Any))
            .returns(TypeInfo::Boolean)
            .doc("Checks whether there are no elements. Null is empty.")
            .body(|args, _| Ok(Value::Boolean(args[0].to_elements().is_empty())))
            .into(),
    );
    functions.push(
        FnNative::builder("First")
            .generic("T", None)
            .param("items", items_of_t())
            .returns(TypeInfo::generic("T"))
            .doc("First element, or null when empty.")
            .body(|args, _| Ok(args[0].to_elements().into_iter().next().unwrap_or_default()))
            .into(),
    );
    functions.push(
        FnNative::builder("Last")
            .generic("T", None)
            .param("items", items_of_t())
            .returns(TypeInfo::generic("T"))
            .doc("Last element, or null when empty.")
            .body(|args, _| Ok(args[0].to_elements().pop().unwrap_or_default()))
            .into(),
    );
    functions.push(
        FnNative::builder("Distinct")
            .generic("T", None)
            .param("items", items_of_t())
            .returns(items_of_t())
            .doc("Elements without repetitions, in order of first occurrence.")
            .body(|args, _| Ok(Value::collection(distinct(args[0].to_elements()))))
            .into(),
    );
    functions.push(
        FnNative::builder("Flat")
            .param("items", TypeInfo::array(TypeInfo::Any))
            .returns(TypeInfo::array(TypeInfo::Any))
            .doc("Flattens nested collections by one level.")
            .body(|args, _| {
                Ok(Value::collection(
                    args[0]
                        .to_elements()
                        .iter()
                        .flat_map(|item| match item {
                            Value::Collection(nested) => nested.to_vec(),
                            other => vec![other.clone()],
                        })
                        .collect(),
                ))
            })
            .into(),
    );
    functions.push(
        FnNative::builder("Includes")
            .generic("T", None)
            .param("items", items_of_t())
            .parameter(ParameterInfo::new("item", TypeInfo::generic("T")).non_iterable())
            .returns(TypeInfo::Boolean)
            .doc("Checks whether the item is an element.")
            .body(|args, _| Ok(Value::Boolean(compare::contains(&args[0], &args[1]))))
            .into(),
    );
    functions.push(
        FnNative::builder("Union")
            .generic("T", None)
            .param("left", items_of_t())
            .param("right", items_of_t())
            .returns(items_of_t())
            .doc("Distinct elements of both collections.")
            .body(|args, _| {
                let mut all = args[0].to_elements();
                all.extend(args[1].to_elements());
                Ok(Value::collection(distinct(all)))
            })
            .into(),
    );
    functions.push(
        FnNative::builder("Intersection")
            .generic("T", None)
            .param("left", items_of_t())
            .param("right", items_of_t())
            .returns(items_of_t())
            .doc("Distinct elements present in both collections.")
            .body(|args, _| {
                let right = &args[1];
                let common = args[0]
                    .to_elements()
                    .into_iter()
                    .filter(|item| compare::contains(right, item))
                    .collect();
                Ok(Value::collection(distinct(common)))
            })
            .into(),
    );
    functions.push(
        FnNative::builder("Difference")
            .generic("T", None)
            .param("left", items_of_t())
            .param("right", items_of_t())
            .returns(items_of_t())
            .doc("Distinct elements of the left collection absent from the right one.")
            .body(|args, _| {
                let right = &args[1];
                let remaining = args[0]
                    .to_elements()
                    .into_iter()
                    .filter(|item| !compare::contains(right, item))
                    .collect();
                Ok(Value::collection(distinct(remaining)))
            })
            .into(),
    );
}

fn distinct(items: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

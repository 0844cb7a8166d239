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

//! Floor(), Ceil(), Abs() and FromMoney()

use crate::model::{TypeInfo, Value};
use crate::registry::function::{CallContext, NativeFunction, NativeResult};
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use once_cell::sync::Lazy;

fn number_signature(name: &str) -> FunctionSignature {
    FunctionSignature::new(
        name,
        vec![ParameterInfo::new("number", TypeInfo::Number)],
        TypeInfo::Number,
    )
}

/// Floor(number) - largest whole number not greater than the input
pub struct FloorFunction;

impl NativeFunction for FloorFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| number_signature("Floor"));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the largest whole number less than or equal to the input."
    }

    fn call(&self, args: &[Value], _context: &mut CallContext<'_>) -> NativeResult {
        Ok(args[0]
            .as_decimal()
            .map_or(Value::Null, |n| Value::Number(n.floor())))
    }
}

/// Ceil(number) - smallest whole number not less than the input
pub struct CeilFunction;

impl NativeFunction for CeilFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| number_signature("Ceil"));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the smallest whole number greater than or equal to the input."
    }

    fn call(&self, args: &[Value], _context: &mut CallContext<'_>) -> NativeResult {
        Ok(args[0]
            .as_decimal()
            .map_or(Value::Null, |n| Value::Number(n.ceil())))
    }
}

/// Abs(number) - absolute value
pub struct AbsFunction;

impl NativeFunction for AbsFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> =
            Lazy::new(|| number_signature("Abs"));
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the absolute value of the input."
    }

    fn call(&self, args: &[Value], _context: &mut CallContext<'_>) -> NativeResult {
        Ok(args[0]
            .as_decimal()
            .map_or(Value::Null, |n| Value::Number(n.abs())))
    }
}

/// FromMoney(money) - numeric amount of a monetary value
pub struct FromMoneyFunction;

impl NativeFunction for FromMoneyFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIG: Lazy<FunctionSignature> = Lazy::new(|| {
            FunctionSignature::new(
                "FromMoney",
                vec![ParameterInfo::new("money", TypeInfo::Money)],
                TypeInfo::Number,
            )
        });
        &SIG
    }

    fn documentation(&self) -> &str {
        "Returns the amount of a monetary value as a number."
    }

    fn call(&self, args: &[Value], _context: &mut CallContext<'_>) -> NativeResult {
        Ok(args[0].as_decimal().map_or(Value::Null, Value::Number))
    }
}

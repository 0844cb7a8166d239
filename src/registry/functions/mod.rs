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

//! Standard function library
//!
//! Functions are grouped by domain, each group exposing a `register_*`
//! function that appends its registrations.

pub mod collection;
pub mod date;
pub mod math;
pub mod string;

pub use collection::register_collection_functions;
pub use date::register_date_functions;
pub use math::register_math_functions;
pub use string::register_string_functions;

use super::library::{FunctionLibrary, FunctionRegistration};
use crate::model::Value;
use rust_decimal::prelude::ToPrimitive;

/// Library of built-in native functions
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLibrary;

impl FunctionLibrary for StandardLibrary {
    fn name(&self) -> &str {
        "standard"
    }

    fn functions(&self) -> Vec<FunctionRegistration> {
        let mut functions = Vec::new();
        register_math_functions(&mut functions);
        register_string_functions(&mut functions);
        register_collection_functions(&mut functions);
        register_date_functions(&mut functions);
        functions
    }
}

/// Whole-number argument, `None` for null
pub(crate) fn integer_arg(value: &Value, parameter: &str) -> anyhow::Result<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            anyhow::ensure!(
                n.fract().is_zero(),
                "{parameter} must be a whole number, got {}",
                n.normalize()
            );
            n.to_i64()
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("{parameter} is out of range: {n}"))
        }
        other => anyhow::bail!("{parameter} must be a number, got {}", other.type_name()),
    }
}

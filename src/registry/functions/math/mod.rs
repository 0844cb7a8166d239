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

//! Mathematical functions for KEL expressions

mod aggregate;
mod round;
mod unary;

pub use aggregate::{Aggregate, AggregateFunction};
pub use round::{RoundFunction, RoundingMode};
pub use unary::{AbsFunction, CeilFunction, FloorFunction, FromMoneyFunction};

use crate::registry::library::FunctionRegistration;
use std::sync::Arc;

/// Register all math functions
pub fn register_math_functions(functions: &mut Vec<FunctionRegistration>) {
    functions.push(FunctionRegistration::Native(Arc::new(RoundFunction::new(
        RoundingMode::HalfUp,
        false,
    ))));
    functions.push(FunctionRegistration::Native(Arc::new(RoundFunction::new(
        RoundingMode::HalfUp,
        true,
    ))));
    functions.push(FunctionRegistration::Native(Arc::new(RoundFunction::new(
        RoundingMode::HalfEven,
        false,
    ))));
    functions.push(FunctionRegistration::Native(Arc::new(RoundFunction::new(
        RoundingMode::HalfEven,
        true,
    ))));
    functions.push(FunctionRegistration::Native(Arc::new(FloorFunction)));
    functions.push(FunctionRegistration::Native(Arc::new(CeilFunction)));
    functions.push(FunctionRegistration::Native(Arc::new(AbsFunction)));
    functions.push(FunctionRegistration::Native(Arc::new(FromMoneyFunction)));
    for aggregate in [Aggregate::Sum, Aggregate::Avg, Aggregate::Min, Aggregate::Max] {
        functions.push(FunctionRegistration::Native(Arc::new(AggregateFunction::new(
            aggregate,
        ))));
    }
}

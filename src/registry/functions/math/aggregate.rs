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

//! Aggregates over number arrays: Sum(), Avg(), Min(), Max()
//!
//! Money elements arrive already coerced to their amounts. Null elements are
//! skipped.

use crate::model::{TypeInfo, Value};
use crate::registry::function::{CallContext, NativeFunction, NativeResult};
use crate::registry::signature::{FunctionSignature, ParameterInfo};
use rust_decimal::Decimal;

/// Aggregate operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Sum of elements, 0 for an empty array
    Sum,
    /// Arithmetic mean, null for an empty array
    Avg,
    /// Smallest element, null for an empty array
    Min,
    /// Largest element, null for an empty array
    Max,
}

/// Sum(numbers), Avg(numbers), Min(numbers), Max(numbers)
pub struct AggregateFunction {
    aggregate: Aggregate,
    signature: FunctionSignature,
}

impl AggregateFunction {
    /// Create the function for an aggregate
    pub fn new(aggregate: Aggregate) -> Self {
        let name = match aggregate {
            Aggregate::Sum => "Sum",
            Aggregate::Avg => "Avg",
            Aggregate::Min => "Min",
            Aggregate::Max => "Max",
        };
        Self {
            aggregate,
            signature: FunctionSignature::new(
                name,
                vec![ParameterInfo::new(
                    "numbers",
                    TypeInfo::array(TypeInfo::Number),
                )],
                TypeInfo::Number,
            ),
        }
    }
}

impl NativeFunction for AggregateFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn call(&self, args: &[Value], _context: &mut CallContext<'_>) -> NativeResult {
        let numbers: Vec<Decimal> = args[0]
            .to_elements()
            .iter()
            .filter_map(Value::as_decimal)
            .collect();

        let result = match self.aggregate {
            Aggregate::Sum => Some(checked_sum(&numbers)?),
            Aggregate::Avg => {
                if numbers.is_empty() {
                    None
                } else {
                    let count = Decimal::from(numbers.len() as u64);
                    Some(
                        checked_sum(&numbers)?
                            .checked_div(count)
                            .ok_or_else(|| anyhow::anyhow!("average overflow"))?,
                    )
                }
            }
            Aggregate::Min => numbers.iter().min().copied(),
            Aggregate::Max => numbers.iter().max().copied(),
        };
        Ok(result.map_or(Value::Null, Value::Number))
    }
}

fn checked_sum(numbers: &[Decimal]) -> anyhow::Result<Decimal> {
    numbers.iter().try_fold(Decimal::ZERO, |total, n| {
        total
            .checked_add(*n)
            .ok_or_else(|| anyhow::anyhow!("sum overflow"))
    })
}

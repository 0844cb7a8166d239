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

//! Round() and RoundEven() - rounding to a decimal scale

use super::super::integer_arg;
use crate::model::arithmetic::{round_half_even, round_half_up};
use crate::model::{TypeInfo, Value};
use crate::registry::function::{CallContext, NativeFunction, NativeResult};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// Largest scale a decimal can carry
const MAX_SCALE: i64 = 28;

/// Tie-breaking rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    /// Ties away from zero (`Round`)
    HalfUp,
    /// Ties to the even neighbour (`RoundEven`)
    HalfEven,
}

/// Round(number) / Round(number, scale) and the RoundEven variants
pub struct RoundFunction {
    mode: RoundingMode,
    signature: FunctionSignature,
}

impl RoundFunction {
    /// Create the function for a rounding mode, with or without a scale parameter
    pub fn new(mode: RoundingMode, with_scale: bool) -> Self {
        let name = match mode {
            RoundingMode::HalfUp => "Round",
            RoundingMode::HalfEven => "RoundEven",
        };
        let mut parameters = vec![ParameterInfo::new("number", TypeInfo::Number)];
        if with_scale {
            parameters.push(ParameterInfo::new("scale", TypeInfo::Number).not_null());
        }
        Self {
            mode,
            signature: FunctionSignature::new(name, parameters, TypeInfo::Number),
        }
    }
}

impl NativeFunction for RoundFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn documentation(&self) -> &str {
        match self.mode {
            RoundingMode::HalfUp => {
                "Rounds the number to the given scale (default 0). Ties round away from \
                 zero, so 2.5 becomes 3 and -2.5 becomes -3."
            }
            RoundingMode::HalfEven => {
                "Rounds the number to the given scale (default 0). Ties round to the even \
                 neighbour, so 2.5 becomes 2 and 3.5 becomes 4."
            }
        }
    }

    fn call(&self, args: &[Value], _context: &mut CallContext<'_>) -> NativeResult {
        let Some(number) = args[0].as_decimal() else {
            return Ok(Value::Null);
        };
        let scale = match args.get(1) {
            Some(scale) => integer_arg(scale, "scale")?.unwrap_or(0),
            None => 0,
        };
        anyhow::ensure!(
            (0..=MAX_SCALE).contains(&scale),
            "scale must be between 0 and {MAX_SCALE}, got {scale}"
        );
        let scale = scale as u32;
        let rounded = match self.mode {
            RoundingMode::HalfUp => round_half_up(number, scale),
            RoundingMode::HalfEven => round_half_even(number, scale),
        };
        Ok(Value::Number(rounded))
    }
}

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

//! Decimal arithmetic over runtime values
//!
//! Operands are expected to be non-null; null handling depends on the
//! evaluation mode and happens in the interpreter.

use super::value::Value;
use crate::error::{KelError, Result};
use rust_decimal::prelude::*;

/// Arithmetic operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `^`
    Power,
}

impl ArithmeticOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
            ArithmeticOp::Power => "^",
        }
    }
}

/// Apply an arithmetic operation to two non-null values
pub fn apply(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value> {
    let textual = matches!(left, Value::String(_)) || matches!(right, Value::String(_));
    if op == ArithmeticOp::Add && textual {
        return Ok(Value::string(format!("{left}{right}")));
    }

    let (Some(a), Some(b)) = (left.as_decimal(), right.as_decimal()) else {
        return Err(not_comparable(op, left, right));
    };
    let result = compute(op, a, b)?;

    // money keeps its currency through additive and scaling operations
    match (left, right, op) {
        (Value::Money(m), Value::Money(n), ArithmeticOp::Add | ArithmeticOp::Subtract) => {
            if m.same_currency(n) {
                Ok(Value::Money(m.with_amount(result)))
            } else {
                Err(not_comparable(op, left, right))
            }
        }
        (Value::Money(m), Value::Number(_), _)
            if matches!(op, ArithmeticOp::Multiply | ArithmeticOp::Divide) =>
        {
            Ok(Value::Money(m.with_amount(result)))
        }
        _ => Ok(Value::Number(result)),
    }
}

fn not_comparable(op: ArithmeticOp, left: &Value, right: &Value) -> KelError {
    KelError::NotComparable {
        operator: op.symbol().to_string(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

fn compute(op: ArithmeticOp, a: Decimal, b: Decimal) -> Result<Decimal> {
    let overflow = || KelError::arithmetic(format!("overflow in {a} {} {b}", op.symbol()));
    match op {
        ArithmeticOp::Add => a.checked_add(b).ok_or_else(overflow),
        ArithmeticOp::Subtract => a.checked_sub(b).ok_or_else(overflow),
        ArithmeticOp::Multiply => a.checked_mul(b).ok_or_else(overflow),
        ArithmeticOp::Divide => {
            if b.is_zero() {
                return Err(KelError::arithmetic("Division by zero"));
            }
            a.checked_div(b).ok_or_else(overflow)
        }
        ArithmeticOp::Modulo => {
            if b.is_zero() {
                return Err(KelError::arithmetic("Division by zero"));
            }
            a.checked_rem(b).ok_or_else(overflow)
        }
        ArithmeticOp::Power => {
            if a.is_zero() && b.is_sign_negative() && !b.is_zero() {
                return Err(KelError::arithmetic("Division by zero"));
            }
            if a.is_sign_negative() && !a.is_zero() && !b.fract().is_zero() {
                return Err(KelError::arithmetic(format!(
                    "{a} ^ {b} is not a real number"
                )));
            }
            // a negative exponent on a base above one shrinks the result
            let out_of_range = || {
                if b.is_sign_negative() && a.abs() > Decimal::ONE {
                    KelError::arithmetic(format!("underflow in {a} ^ {b}"))
                } else {
                    overflow()
                }
            };
            if b.fract().is_zero() {
                let exponent = b.to_i64().ok_or_else(out_of_range)?;
                a.checked_powi(exponent).ok_or_else(out_of_range)
            } else {
                a.checked_powd(b).ok_or_else(out_of_range)
            }
        }
    }
}

/// Arithmetic negation of a number or money value
pub fn negate(value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(-*n)),
        Value::Money(m) => Ok(Value::Money(m.with_amount(-m.amount))),
        other => Err(KelError::type_mismatch("Number", other.type_name(), "negation")),
    }
}

/// Round half away from zero to `scale` fractional digits
pub fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// Round half to even (banker's rounding) to `scale` fractional digits
pub fn round_half_even(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    #[test]
    fn test_decimal_precision() {
        let sum = apply(ArithmeticOp::Add, &Value::Number(dec("0.1")), &Value::Number(dec("0.2")))
            .unwrap();
        assert_eq!(sum, Value::Number(dec("0.3")));
    }

    #[test]
    fn test_division_by_zero() {
        let err = apply(ArithmeticOp::Divide, &Value::from(1), &Value::from(0)).unwrap_err();
        assert!(matches!(err, KelError::Arithmetic { .. }));
    }

    #[test]
    fn test_string_concatenation() {
        let joined = apply(ArithmeticOp::Add, &Value::from("n="), &Value::from(5)).unwrap();
        assert_eq!(joined.as_str(), Some("n=5"));
        let joined = apply(ArithmeticOp::Add, &Value::from(5), &Value::from("x")).unwrap();
        assert_eq!(joined.as_str(), Some("5x"));
    }

    #[test]
    fn test_money_keeps_currency() {
        let total = apply(
            ArithmeticOp::Add,
            &Value::money(dec("10.50"), "EUR"),
            &Value::money(dec("4.50"), "EUR"),
        )
        .unwrap();
        assert_eq!(total, Value::money(dec("15"), "EUR"));
    }

    #[test]
    fn test_rounding_strategies() {
        assert_eq!(round_half_up(dec("2.5"), 0), dec("3"));
        assert_eq!(round_half_even(dec("2.5"), 0), dec("2"));
        assert_eq!(round_half_up(dec("-2.5"), 0), dec("-3"));
        assert_eq!(round_half_even(dec("-2.5"), 0), dec("-2"));
        assert_eq!(round_half_up(dec("1.005"), 2), dec("1.01"));
        assert_eq!(round_half_even(dec("1.005"), 2), dec("1.00"));
    }

    #[test]
    fn test_power() {
        assert_eq!(
            apply(ArithmeticOp::Power, &Value::from(2), &Value::from(10)).unwrap(),
            Value::from(1024)
        );
    }

    #[test]
    fn test_power_of_negative_base_with_fractional_exponent() {
        let err = apply(ArithmeticOp::Power, &Value::from(-8), &Value::Number(dec("0.5")))
            .unwrap_err();
        match err {
            KelError::Arithmetic { message } => assert!(message.contains("not a real number")),
            other => panic!("unexpected error: {other:?}"),
        }
        // integral exponents stay defined for negative bases
        assert_eq!(
            apply(ArithmeticOp::Power, &Value::from(-2), &Value::from(3)).unwrap(),
            Value::from(-8)
        );
    }

    #[test]
    fn test_power_reports_underflow_and_overflow() {
        let message = |err: KelError| match err {
            KelError::Arithmetic { message } => message,
            other => panic!("unexpected error: {other:?}"),
        };
        let tiny = apply(ArithmeticOp::Power, &Value::from(10), &Value::from(-30)).unwrap_err();
        assert!(message(tiny).starts_with("underflow"));
        let huge = apply(ArithmeticOp::Power, &Value::from(10), &Value::from(30)).unwrap_err();
        assert!(message(huge).starts_with("overflow"));
    }

    #[test]
    fn test_money_in_different_currencies_is_not_additive() {
        for op in [ArithmeticOp::Add, ArithmeticOp::Subtract] {
            let err = apply(
                op,
                &Value::money(dec("10"), "USD"),
                &Value::money(dec("5"), "EUR"),
            )
            .unwrap_err();
            assert!(matches!(err, KelError::NotComparable { .. }), "{op:?}: {err:?}");
        }
    }
}

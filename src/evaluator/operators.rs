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

//! Operator semantics under strict and coercing evaluation
//!
//! `and`/`or` short-circuit and live in the interpreter; everything else
//! works on already evaluated operands.

use super::config::EvaluationMode;
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{KelError, Result};
use crate::model::{arithmetic, compare, Value};
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::num::NonZeroUsize;

const REGEX_CACHE_SIZE: usize = 256;

static REGEX_CACHE: Lazy<Mutex<LruCache<String, Regex>>> = Lazy::new(|| {
    Mutex::new(LruCache::new(
        NonZeroUsize::new(REGEX_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
    ))
});

/// Truth value of a condition operand
pub(crate) fn truth(value: &Value, mode: EvaluationMode, context: &str) -> Result<bool> {
    match (mode, value) {
        (_, Value::Boolean(b)) => Ok(*b),
        (EvaluationMode::Coercing, _) => Ok(false),
        (EvaluationMode::Strict, other) => Err(KelError::type_mismatch(
            "Boolean",
            other.type_name(),
            context,
        )),
    }
}

/// Apply a non-logical binary operator
pub(crate) fn binary(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    mode: EvaluationMode,
) -> Result<Value> {
    if let Some(op) = operator.arithmetic() {
        if left.is_null() || right.is_null() {
            return match mode {
                EvaluationMode::Coercing => Ok(Value::Null),
                EvaluationMode::Strict => Err(not_comparable(operator, left, right)),
            };
        }
        return arithmetic::apply(op, left, right);
    }

    match operator {
        BinaryOperator::Equal | BinaryOperator::NotEqual => {
            let equal = match compare::equals(left, right) {
                Some(equal) => equal,
                None if mode == EvaluationMode::Strict => {
                    return Err(not_comparable(operator, left, right));
                }
                None => false,
            };
            Ok(Value::Boolean(equal == (operator == BinaryOperator::Equal)))
        }
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => ordering(operator, left, right, mode),
        BinaryOperator::Matches => matches(left, right, mode),
        BinaryOperator::In => Ok(Value::Boolean(compare::contains(right, left))),
        BinaryOperator::And | BinaryOperator::Or => {
            let left = truth(left, mode, operator.symbol())?;
            let right = truth(right, mode, operator.symbol())?;
            Ok(Value::Boolean(if operator == BinaryOperator::And {
                left && right
            } else {
                left || right
            }))
        }
        _ => Err(not_comparable(operator, left, right)),
    }
}

fn ordering(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    mode: EvaluationMode,
) -> Result<Value> {
    if (left.is_null() || right.is_null()) && mode == EvaluationMode::Coercing {
        return Ok(Value::Boolean(false));
    }
    let ordering =
        compare::compare(left, right).ok_or_else(|| not_comparable(operator, left, right))?;
    let holds = match operator {
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Boolean(holds))
}

fn matches(text: &Value, pattern: &Value, mode: EvaluationMode) -> Result<Value> {
    let Some(pattern) = pattern.as_str() else {
        return Err(KelError::type_mismatch(
            "String",
            pattern.type_name(),
            "regular expression pattern",
        ));
    };
    match (text, mode) {
        (Value::String(text), _) => Ok(Value::Boolean(regex_matches(pattern, text)?)),
        (_, EvaluationMode::Coercing) => Ok(Value::Boolean(false)),
        (other, EvaluationMode::Strict) => Err(KelError::type_mismatch(
            "String",
            other.type_name(),
            "left operand of =~",
        )),
    }
}

/// Whole-text match against a cached compiled pattern
fn regex_matches(pattern: &str, text: &str) -> Result<bool> {
    let mut cache = REGEX_CACHE.lock();
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.is_match(text));
    }
    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| KelError::InvalidRegex {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    let matched = regex.is_match(text);
    cache.put(pattern.to_string(), regex);
    Ok(matched)
}

/// Apply a unary operator
pub(crate) fn unary(
    operator: UnaryOperator,
    operand: &Value,
    mode: EvaluationMode,
) -> Result<Value> {
    match operator {
        UnaryOperator::Not => Ok(Value::Boolean(!truth(operand, mode, "operand of !")?)),
        UnaryOperator::Negate => match (operand, mode) {
            (Value::Null, EvaluationMode::Coercing) => Ok(Value::Null),
            (operand, _) => arithmetic::negate(operand),
        },
    }
}

fn not_comparable(operator: BinaryOperator, left: &Value, right: &Value) -> KelError {
    KelError::NotComparable {
        operator: operator.symbol().to_string(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use rust_decimal::Decimal;

    const COERCING: EvaluationMode = EvaluationMode::Coercing;
    const STRICT: EvaluationMode = EvaluationMode::Strict;

    #[test]
    fn test_trailing_zeros_are_equal() {
        let result = binary(
            BinaryOperator::Equal,
            &Value::number(Decimal::new(10, 1)),
            &Value::from(1),
            STRICT,
        )
        .unwrap();
        assert_eq!(result, Value::Boolean(true));
    }

    #[rstest]
    #[case(COERCING, Some(false))]
    #[case(STRICT, None)]
    fn test_mismatched_equality(#[case] mode: EvaluationMode, #[case] expected: Option<bool>) {
        let result = binary(BinaryOperator::Equal, &Value::from("1"), &Value::from(1), mode);
        assert_eq!(result.ok().and_then(|v| v.as_bool()), expected);
    }

    #[rstest]
    #[case(COERCING, Some(false))]
    #[case(STRICT, None)]
    fn test_null_ordering(#[case] mode: EvaluationMode, #[case] expected: Option<bool>) {
        let result = binary(BinaryOperator::LessThan, &Value::Null, &Value::from(1), mode);
        assert_eq!(result.ok().and_then(|v| v.as_bool()), expected);
    }

    #[test]
    fn test_ordering_mismatch_fails_in_both_modes() {
        for mode in [COERCING, STRICT] {
            let err = binary(BinaryOperator::GreaterThan, &Value::from("a"), &Value::from(1), mode)
                .unwrap_err();
            assert!(matches!(err, KelError::NotComparable { .. }));
        }
    }

    #[test]
    fn test_null_arithmetic() {
        assert_eq!(
            binary(BinaryOperator::Add, &Value::Null, &Value::from(1), COERCING).unwrap(),
            Value::Null
        );
        assert!(binary(BinaryOperator::Add, &Value::Null, &Value::from(1), STRICT).is_err());
    }

    #[test]
    fn test_regex_matches_whole_text() {
        let pattern = Value::from("[A-Z]{2}\\d+");
        let matched = |text: &str| {
            binary(BinaryOperator::Matches, &Value::from(text), &pattern, COERCING).unwrap()
        };
        assert_eq!(matched("AB12"), Value::Boolean(true));
        assert_eq!(matched("xAB12"), Value::Boolean(false));
        let err = binary(BinaryOperator::Matches, &Value::from("x"), &Value::from("("), COERCING)
            .unwrap_err();
        assert!(matches!(err, KelError::InvalidRegex { .. }));
    }

    #[test]
    fn test_membership() {
        let haystack = Value::collection(vec![Value::from(1), Value::from(2)]);
        assert_eq!(
            binary(
                BinaryOperator::In,
                &Value::number(Decimal::new(20, 1)),
                &haystack,
                STRICT,
            )
            .unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_not_in_strict_mode_requires_boolean() {
        assert_eq!(
            unary(UnaryOperator::Not, &Value::Null, COERCING).unwrap(),
            Value::Boolean(true)
        );
        assert!(unary(UnaryOperator::Not, &Value::Null, STRICT).is_err());
    }
}

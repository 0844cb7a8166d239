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

//! Property writes addressed by a dotted path

use super::config::EvaluationConfig;
use super::context::EvaluationContext;
use super::interpreter::evaluate;
use crate::ast::{Expression, Scope, Token};
use crate::error::{AstError, KelError, Result};
use crate::model::{TypeInfo, Value};
use indexmap::IndexMap;

/// Assign `value` to the property addressed by `property_path` on `target`.
///
/// All segments but the last are evaluated against `target` to find the
/// holder; the last segment is written through the holder's setter, which
/// coerces the value to the declared property type.
pub fn evaluate_set_expression(
    value: Value,
    property_path: &str,
    target: &Value,
    context: &EvaluationContext,
    config: &EvaluationConfig,
) -> Result<()> {
    let (holder_path, property) = match property_path.rsplit_once('.') {
        Some((holder, property)) => (Some(holder), property),
        None => (None, property_path),
    };
    if property.is_empty() {
        return Err(AstError::InvalidExpression {
            message: format!("invalid property path '{property_path}'"),
        }
        .into());
    }

    let holder = match holder_path {
        None => target.clone(),
        Some(path) => {
            let token = Token::synthetic(path);
            let expression = Expression::identifier(path, TypeInfo::Any, token, &Scope::root())?;
            let context = context
                .with_data(target.clone())
                .with_variables(IndexMap::new());
            evaluate(&expression, &context, config)?
        }
    };

    match &holder {
        Value::Object(object) => {
            log::trace!("setting {property} on {}", object.type_name());
            object.set(property, value)
        }
        other => Err(KelError::NotSettable {
            property: property.to_string(),
            type_name: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataObject, MapObject, Record};
    use crate::registry::FunctionCatalog;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn context() -> EvaluationContext {
        EvaluationContext::new(Value::Null, Arc::new(FunctionCatalog::standard().unwrap()))
    }

    #[test]
    fn test_nested_write_coerces_to_declared_type() {
        let vehicle = Arc::new(
            Record::new("Vehicle").with_property("value", TypeInfo::Number, Value::Null),
        );
        let policy = Value::object(
            MapObject::new("Policy").with_entry("vehicle", Value::Object(vehicle.clone())),
        );
        evaluate_set_expression(
            Value::money(Decimal::from(25000), "USD"),
            "vehicle.value",
            &policy,
            &context(),
            &EvaluationConfig::default(),
        )
        .unwrap();
        assert_eq!(vehicle.get("value"), Some(Value::from(25000)));
    }

    #[test]
    fn test_unknown_or_read_only_property_fails() {
        let record = Value::object(
            Record::new("Policy").with_read_only("number", TypeInfo::String, "P-1"),
        );
        let config = EvaluationConfig::default();
        let err =
            evaluate_set_expression(Value::from("P-2"), "number", &record, &context(), &config)
                .unwrap_err();
        assert!(matches!(err, KelError::NotSettable { .. }));
        let err = evaluate_set_expression(Value::from(1), "missing", &record, &context(), &config)
            .unwrap_err();
        assert!(matches!(err, KelError::NotSettable { .. }));
    }

    #[test]
    fn test_plain_map_is_not_settable() {
        let data = Value::from_json(serde_json::json!({"a": {"b": 1}})).unwrap();
        let err = evaluate_set_expression(
            Value::from(2),
            "a.b",
            &data,
            &context(),
            &EvaluationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KelError::NotSettable { .. }));
    }
}

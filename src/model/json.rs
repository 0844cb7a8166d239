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

//! Conversion between runtime values and `serde_json::Value`

use super::money::Money;
use super::value::Value;
use crate::error::{KelError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use rust_decimal::prelude::*;
use serde_json::Value as JsonValue;

/// Convert from serde_json::Value to Value.
///
/// Fails for numbers the decimal type cannot hold.
impl TryFrom<JsonValue> for Value {
    type Error = KelError;

    fn try_from(json: JsonValue) -> Result<Self> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(b),
            JsonValue::Number(n) => Value::Number(json_number(&n)?),
            JsonValue::String(s) => {
                if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                    Value::Date(date)
                } else if let Ok(datetime) = DateTime::parse_from_rfc3339(&s) {
                    Value::DateTime(datetime.with_timezone(&Utc))
                } else {
                    Value::from(s)
                }
            }
            JsonValue::Array(items) => Value::collection(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            JsonValue::Object(entries) => {
                // {"amount": .., "currency": ".."} is a monetary amount
                if entries.len() == 2 {
                    if let (Some(JsonValue::Number(amount)), Some(JsonValue::String(currency))) =
                        (entries.get("amount"), entries.get("currency"))
                    {
                        let amount = json_number(amount)?;
                        return Ok(Value::Money(Money::new(amount, currency.clone())));
                    }
                }
                let map = entries
                    .into_iter()
                    .map(|(key, value)| Ok((key, Value::try_from(value)?)))
                    .collect::<Result<IndexMap<String, Value>>>()?;
                Value::map(map)
            }
        })
    }
}

fn json_number(number: &serde_json::Number) -> Result<Decimal> {
    let text = number.to_string();
    Decimal::from_str_exact(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| KelError::Conversion {
            message: format!("number {text} is outside the decimal range"),
        })
}

impl Value {
    /// Convert host JSON data into a runtime value
    pub fn from_json(json: JsonValue) -> Result<Value> {
        Value::try_from(json)
    }

    /// Unwrap to a plain JSON value for the caller
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::String(s) => JsonValue::String(s.to_string()),
            Value::Number(n) => decimal_to_json(*n),
            Value::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            Value::Money(m) => {
                let mut object = serde_json::Map::new();
                object.insert("amount".to_string(), decimal_to_json(m.amount));
                object.insert("currency".to_string(), JsonValue::String(m.currency.clone()));
                JsonValue::Object(object)
            }
            Value::Collection(items) => {
                JsonValue::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Object(object) => JsonValue::Object(
                object
                    .property_names()
                    .into_iter()
                    .map(|name| {
                        let value = object.get(&name).unwrap_or_default().to_json();
                        (name, value)
                    })
                    .collect(),
            ),
        }
    }
}

/// JSON number when it carries the decimal exactly, the decimal's text otherwise
fn decimal_to_json(value: Decimal) -> JsonValue {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        if let Some(i) = normalized.to_i64() {
            return JsonValue::from(i);
        }
    }
    let exact = normalized.to_f64().filter(|f| {
        Decimal::from_str(&f.to_string()).is_ok_and(|back| back == normalized)
    });
    exact
        .and_then(serde_json::Number::from_f64)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(normalized.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_json_detects_dates_and_money() {
        let value = Value::from_json(json!({
            "start": "2024-02-29",
            "premium": {"amount": 99.5, "currency": "EUR"},
            "count": 3
        }))
        .unwrap();
        assert_eq!(value.get_property("start").unwrap().type_name(), "Date");
        assert_eq!(value.get_property("premium").unwrap().type_name(), "Money");
        assert_eq!(value.get_property("count"), Some(Value::from(3)));
    }

    #[test]
    fn test_to_json_unwraps_plain_values() {
        let value = Value::from_json(json!({"a": [1, 2.5, "x", null], "b": true})).unwrap();
        assert_eq!(value.to_json(), json!({"a": [1, 2.5, "x", null], "b": true}));
    }

    #[test]
    fn test_numbers_outside_decimal_range_fail() {
        let err = Value::from_json(json!({"huge": 1e40})).unwrap_err();
        assert!(matches!(err, KelError::Conversion { .. }), "{err}");
        let err = Value::from_json(json!([{"amount": 1e300, "currency": "USD"}])).unwrap_err();
        assert!(matches!(err, KelError::Conversion { .. }), "{err}");
        assert_eq!(
            Value::from_json(json!(1.5e3)).unwrap(),
            Value::Number(Decimal::from(1500))
        );
    }

    #[test]
    fn test_to_json_keeps_decimal_precision() {
        let precise = Decimal::from_str("0.1234567890123456789012345").unwrap();
        assert_eq!(
            Value::Number(precise).to_json(),
            JsonValue::String("0.1234567890123456789012345".to_string())
        );
        let plain = Decimal::from_str("19.99").unwrap();
        assert_eq!(Value::Number(plain).to_json(), json!(19.99));
    }
}

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

//! Date and datetime functions
//!
//! Shifting functions are generic over `Date | DateTime` and return the kind
//! they were given. Month arithmetic clamps to the last day of the month.

use super::integer_arg;
use crate::model::{TypeInfo, Value};
use crate::registry::function::FnNative;
use crate::registry::library::FunctionRegistration;
use crate::registry::signature::ParameterInfo;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};

fn temporal() -> TypeInfo {
    TypeInfo::Union(vec![TypeInfo::Date, TypeInfo::DateTime])
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Days,
    Months,
    Years,
}

/// Register all date functions
pub fn register_date_functions(functions: &mut Vec<FunctionRegistration>) {
    functions.push(
        FnNative::builder("Date")
            .parameter(ParameterInfo::new("year", TypeInfo::Number).not_null())
            .parameter(ParameterInfo::new("month", TypeInfo::Number).not_null())
            .parameter(ParameterInfo::new("day", TypeInfo::Number).not_null())
            .returns(TypeInfo::Date)
            .doc("Date from year, month and day.")
            .body(|args, _| {
                let year = integer_arg(&args[0], "year")?.unwrap_or_default();
                let month = integer_arg(&args[1], "month")?.unwrap_or_default();
                let day = integer_arg(&args[2], "day")?.unwrap_or_default();
                let date = i32::try_from(year)
                    .ok()
                    .zip(u32::try_from(month).ok())
                    .zip(u32::try_from(day).ok())
                    .and_then(|((y, m), d)| NaiveDate::from_ymd_opt(y, m, d))
                    .ok_or_else(|| anyhow::anyhow!("invalid date {year}-{month}-{day}"))?;
                Ok(Value::Date(date))
            })
            .into(),
    );
    functions.push(
        FnNative::builder("Date")
            .param("text", TypeInfo::String)
            .returns(TypeInfo::Date)
            .doc("Parses an ISO date such as 2024-02-29.")
            .body(|args, _| match args[0].as_str() {
                Some(text) => Ok(Value::Date(parse_date(text)?)),
                None => Ok(Value::Null),
            })
            .into(),
    );
    functions.push(
        FnNative::builder("DateTime")
            .param("text", TypeInfo::String)
            .returns(TypeInfo::DateTime)
            .doc("Parses an ISO datetime. Without an offset the time is taken as UTC.")
            .body(|args, _| match args[0].as_str() {
                Some(text) => Ok(Value::DateTime(parse_date_time(text)?)),
                None => Ok(Value::Null),
            })
            .into(),
    );
    functions.push(
        FnNative::builder("AsDate")
            .param("date", temporal())
            .returns(TypeInfo::Date)
            .doc("Date part of a date or datetime.")
            .body(|args, _| Ok(date_of(&args[0]).map_or(Value::Null, Value::Date)))
            .into(),
    );
    functions.push(
        FnNative::builder("Today")
            .returns(TypeInfo::Date)
            .doc("Current date in UTC.")
            .body(|_, _| Ok(Value::Date(Utc::now().date_naive())))
            .into(),
    );
    functions.push(
        FnNative::builder("Now")
            .returns(TypeInfo::DateTime)
            .doc("Current datetime in UTC.")
            .body(|_, _| Ok(Value::DateTime(Utc::now())))
            .into(),
    );

    let parts: [(&str, &str, fn(&NaiveDate) -> i64); 3] = [
        ("GetYear", "Year of a date or datetime.", |d| i64::from(d.year())),
        ("GetMonth", "Month (1-12) of a date or datetime.", |d| i64::from(d.month())),
        ("GetDay", "Day of month of a date or datetime.", |d| i64::from(d.day())),
    ];
    for (name, doc, part) in parts {
        functions.push(
            FnNative::builder(name)
                .param("date", temporal())
                .returns(TypeInfo::Number)
                .doc(doc)
                .body(move |args, _| {
                    Ok(date_of(&args[0]).map_or(Value::Null, |date| Value::from(part(&date))))
                })
                .into(),
        );
    }

    for (name, parameter, unit) in [
        ("PlusDays", "days", Unit::Days),
        ("PlusMonths", "months", Unit::Months),
        ("PlusYears", "years", Unit::Years),
    ] {
        functions.push(
            FnNative::builder(name)
                .generic("T", Some(temporal()))
                .param("date", TypeInfo::generic("T"))
                .parameter(
                    ParameterInfo::new(parameter, TypeInfo::Number)
                        .not_null()
                        .non_iterable(),
                )
                .returns(TypeInfo::generic("T"))
                .doc(format!(
                    "Shifts a date or datetime by a number of {parameter}, which may be negative."
                ))
                .body(move |args, _| {
                    let amount = integer_arg(&args[1], parameter)?.unwrap_or_default();
                    shift(&args[0], amount, unit)
                })
                .into(),
        );
    }

    functions.push(
        FnNative::builder("NumberOfDaysBetween")
            .param("from", temporal())
            .parameter(ParameterInfo::new("to", temporal()).non_iterable())
            .returns(TypeInfo::Number)
            .doc("Whole days between two dates, ignoring order.")
            .body(|args, _| {
                Ok(match (date_of(&args[0]), date_of(&args[1])) {
                    (Some(from), Some(to)) => Value::from((to - from).num_days().abs()),
                    _ => Value::Null,
                })
            })
            .into(),
    );
    functions.push(
        FnNative::builder("NumberOfMonthsBetween")
            .param("from", temporal())
            .parameter(ParameterInfo::new("to", temporal()).non_iterable())
            .returns(TypeInfo::Number)
            .doc("Whole months between two dates, ignoring order.")
            .body(|args, _| {
                Ok(match (date_of(&args[0]), date_of(&args[1])) {
                    (Some(from), Some(to)) => Value::from(months_between(from, to)),
                    _ => Value::Null,
                })
            })
            .into(),
    );
}

fn date_of(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(date) => Some(*date),
        Value::DateTime(date_time) => Some(date_time.date_naive()),
        _ => None,
    }
}

fn parse_date(text: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("cannot parse date '{text}': {e}"))
}

fn parse_date_time(text: &str) -> anyhow::Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| anyhow::anyhow!("cannot parse datetime '{text}': {e}"))
}

/// Calendar shifting shared by dates and datetimes
trait Shift: Sized {
    fn shift_days(self, days: Days, forward: bool) -> Option<Self>;
    fn shift_months(self, months: Months, forward: bool) -> Option<Self>;
}

impl Shift for NaiveDate {
    fn shift_days(self, days: Days, forward: bool) -> Option<Self> {
        if forward {
            self.checked_add_days(days)
        } else {
            self.checked_sub_days(days)
        }
    }

    fn shift_months(self, months: Months, forward: bool) -> Option<Self> {
        if forward {
            self.checked_add_months(months)
        } else {
            self.checked_sub_months(months)
        }
    }
}

impl Shift for NaiveDateTime {
    fn shift_days(self, days: Days, forward: bool) -> Option<Self> {
        if forward {
            self.checked_add_days(days)
        } else {
            self.checked_sub_days(days)
        }
    }

    fn shift_months(self, months: Months, forward: bool) -> Option<Self> {
        if forward {
            self.checked_add_months(months)
        } else {
            self.checked_sub_months(months)
        }
    }
}

fn shift_by<T: Shift>(value: T, amount: i64, unit: Unit) -> Option<T> {
    let forward = amount >= 0;
    let magnitude = amount.unsigned_abs();
    match unit {
        Unit::Days => value.shift_days(Days::new(magnitude), forward),
        Unit::Months => value.shift_months(Months::new(u32::try_from(magnitude).ok()?), forward),
        Unit::Years => {
            let months = magnitude.checked_mul(12)?;
            value.shift_months(Months::new(u32::try_from(months).ok()?), forward)
        }
    }
}

fn shift(value: &Value, amount: i64, unit: Unit) -> anyhow::Result<Value> {
    let shifted = match value {
        Value::Null => return Ok(Value::Null),
        Value::Date(date) => shift_by(*date, amount, unit).map(Value::Date),
        Value::DateTime(date_time) => shift_by(date_time.naive_utc(), amount, unit)
            .map(|naive| Value::DateTime(naive.and_utc())),
        other => anyhow::bail!("expected a date or datetime, got {}", other.type_name()),
    };
    shifted.ok_or_else(|| {
        anyhow::anyhow!("date out of range after shifting {value} by {amount} {unit:?}")
    })
}

fn months_between(a: NaiveDate, b: NaiveDate) -> i64 {
    let (from, to) = if a <= b { (a, b) } else { (b, a) };
    let mut months = i64::from(to.year() - from.year()) * 12
        + i64::from(to.month()) - i64::from(from.month());
    if to.day() < from.day() {
        months -= 1;
    }
    months
}

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

//! String functions
//!
//! Positions are character based and zero indexed.

use super::integer_arg;
use crate::model::{TypeInfo, Value};
use crate::registry::function::FnNative;
use crate::registry::library::FunctionRegistration;
use crate::registry::signature::ParameterInfo;

/// Register all string functions
pub fn register_string_functions(functions: &mut Vec<FunctionRegistration>) {
    functions.push(
        FnNative::builder("Upper")
            .param("text", TypeInfo::String)
            .returns(TypeInfo::String)
            .doc("Converts text to upper case.")
            .body(|args, _| Ok(map_text(&args[0], str::to_uppercase)))
            .into(),
    );
    functions.push(
        FnNative::builder("Lower")
            .param("text", TypeInfo::String)
            .returns(TypeInfo::String)
            .doc("Converts text to lower case.")
            .body(|args, _| Ok(map_text(&args[0], str::to_lowercase)))
            .into(),
    );
    functions.push(
        FnNative::builder("Trim")
            .param("text", TypeInfo::String)
            .returns(TypeInfo::String)
            .doc("Removes leading and trailing whitespace.")
            .body(|args, _| Ok(map_text(&args[0], |text| text.trim().to_string())))
            .into(),
    );
    functions.push(
        FnNative::builder("Length")
            .param("text", TypeInfo::String)
            .returns(TypeInfo::Number)
            .doc("Number of characters in text.")
            .body(|args, _| {
                Ok(args[0]
                    .as_str()
                    .map_or(Value::Null, |text| Value::from(text.chars().count() as i64)))
            })
            .into(),
    );
    functions.push(
        FnNative::builder("Substring")
            .param("text", TypeInfo::String)
            .parameter(ParameterInfo::new("begin", TypeInfo::Number).not_null())
            .returns(TypeInfo::String)
            .doc("Text from the begin position to the end.")
            .body(|args, _| substring(&args[0], &args[1], None))
            .into(),
    );
    functions.push(
        FnNative::builder("Substring")
            .param("text", TypeInfo::String)
            .parameter(ParameterInfo::new("begin", TypeInfo::Number).not_null())
            .parameter(ParameterInfo::new("end", TypeInfo::Number).not_null())
            .returns(TypeInfo::String)
            .doc("Text from the begin position up to, not including, the end position.")
            .body(|args, _| substring(&args[0], &args[1], Some(&args[2])))
            .into(),
    );
    functions.push(
        FnNative::builder("StartsWith")
            .param("text", TypeInfo::String)
            .parameter(ParameterInfo::new("prefix", TypeInfo::String).non_iterable())
            .returns(TypeInfo::Boolean)
            .doc("Checks whether text starts with the prefix. Null text never matches.")
            .body(|args, _| {
                Ok(Value::Boolean(match (args[0].as_str(), args[1].as_str()) {
                    (Some(text), Some(prefix)) => text.starts_with(prefix),
                    _ => false,
                }))
            })
            .into(),
    );
    functions.push(
        FnNative::builder("EndsWith")
            .param("text", TypeInfo::String)
            .parameter(ParameterInfo::new("suffix", TypeInfo::String).non_iterable())
            .returns(TypeInfo::Boolean)
            .doc("Checks whether text ends with the suffix. Null text never matches.")
            .body(|args, _| {
                Ok(Value::Boolean(match (args[0].as_str(), args[1].as_str()) {
                    (Some(text), Some(suffix)) => text.ends_with(suffix),
                    _ => false,
                }))
            })
            .into(),
    );
    functions.push(
        FnNative::builder("Concat")
            .param("values", TypeInfo::array(TypeInfo::Any))
            .returns(TypeInfo::String)
            .doc("Concatenates the text form of every non-null element.")
            .body(|args, _| Ok(Value::string(join(&args[0], ""))))
            .into(),
    );
    functions.push(
        FnNative::builder("Join")
            .param("values", TypeInfo::array(TypeInfo::Any))
            .parameter(ParameterInfo::new("separator", TypeInfo::String).non_iterable())
            .returns(TypeInfo::String)
            .doc("Joins the text form of every non-null element with a separator.")
            .body(|args, _| {
                let separator = args[1].as_str().unwrap_or_default();
                Ok(Value::string(join(&args[0], separator)))
            })
            .into(),
    );
}

fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Value {
    value.as_str().map_or(Value::Null, |text| Value::string(f(text)))
}

fn join(values: &Value, separator: &str) -> String {
    values
        .to_elements()
        .iter()
        .filter(|value| !value.is_null())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

fn substring(text: &Value, begin: &Value, end: Option<&Value>) -> anyhow::Result<Value> {
    let Some(text) = text.as_str() else {
        return Ok(Value::Null);
    };
    let length = text.chars().count() as i64;
    let begin = integer_arg(begin, "begin")?.unwrap_or(0);
    let end = match end {
        Some(end) => integer_arg(end, "end")?.unwrap_or(length),
        None => length,
    };
    anyhow::ensure!(
        0 <= begin && begin <= end && end <= length,
        "range {begin}..{end} is out of bounds for text of length {length}"
    );
    Ok(Value::string(
        text.chars()
            .skip(begin as usize)
            .take((end - begin) as usize)
            .collect::<String>(),
    ))
}

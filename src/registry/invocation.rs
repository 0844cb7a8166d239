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

//! Call dispatch: argument validation, coercion and automatic iteration

use super::catalog::FunctionCatalog;
use super::function::{CallContext, FunctionDefinition, KelFunctionEvaluator, NativeFunction};
use super::signature::FunctionSignature;
use crate::error::{KelError, Result};
use crate::model::{Value, coerce_value};
use std::sync::Arc;

impl FunctionCatalog {
    /// Resolve and invoke a function without automatic iteration
    pub fn invoke(
        &self,
        name: &str,
        args: Vec<Value>,
        target: Option<&str>,
        evaluator: &mut dyn KelFunctionEvaluator,
    ) -> Result<Value> {
        let definition = self.resolve(name, args.len(), target)?;
        match definition {
            FunctionDefinition::Native(function) => {
                self.call_native(&function, args, target, evaluator)
            }
            FunctionDefinition::Kel(function) => evaluator.evaluate_function(&function, args),
        }
    }

    /// Resolve and invoke a function, fanning out over the first eligible
    /// collection argument.
    ///
    /// The first parameter (left to right) that is iteration-eligible, not
    /// declared as an array and received a collection selects the fan-out:
    /// the function is called once per element with the element substituted
    /// at that position, and the results are collected in order. Interpreted
    /// functions never iterate.
    pub fn invoke_with_iteration(
        &self,
        name: &str,
        args: Vec<Value>,
        target: Option<&str>,
        evaluator: &mut dyn KelFunctionEvaluator,
    ) -> Result<Value> {
        let definition = self.resolve(name, args.len(), target)?;
        let function = match definition {
            FunctionDefinition::Native(function) => function,
            FunctionDefinition::Kel(function) => {
                return evaluator.evaluate_function(&function, args);
            }
        };

        let Some(position) = iteration_position(function.signature(), &args) else {
            return self.call_native(&function, args, target, evaluator);
        };
        let Value::Collection(items) = args[position].clone() else {
            return self.call_native(&function, args, target, evaluator);
        };

        log::debug!(
            "Iterating {} over {} element(s) of parameter {position}",
            function.name(),
            items.len()
        );
        let mut results = Vec::with_capacity(items.len());
        for item in items.iter() {
            let mut element_args = args.clone();
            element_args[position] = item.clone();
            results.push(self.call_native(&function, element_args, target, evaluator)?);
        }
        Ok(Value::collection(results))
    }

    fn call_native(
        &self,
        function: &Arc<dyn NativeFunction>,
        args: Vec<Value>,
        target: Option<&str>,
        evaluator: &mut dyn KelFunctionEvaluator,
    ) -> Result<Value> {
        let args = validate_arguments(function.signature(), args)?;
        log::trace!("Calling native {}", function.signature());
        let mut context = CallContext::new(self, evaluator, target);
        function
            .call(&args, &mut context)
            .map_err(|err| wrap_failure(function.name(), err))
    }
}

fn iteration_position(signature: &FunctionSignature, args: &[Value]) -> Option<usize> {
    signature
        .parameters
        .iter()
        .zip(args)
        .position(|(parameter, arg)| {
            parameter.iterable && !parameter.param_type.is_array_like() && arg.is_collection()
        })
}

/// Check nullability and coerce each argument to its declared parameter type
pub(crate) fn validate_arguments(
    signature: &FunctionSignature,
    args: Vec<Value>,
) -> Result<Vec<Value>> {
    args.into_iter()
        .enumerate()
        .map(|(index, arg)| {
            let Some(parameter) = signature.parameters.get(index) else {
                return Ok(arg);
            };
            if arg.is_null() {
                if parameter.not_null {
                    return Err(KelError::NullArgument {
                        function: signature.name.clone(),
                        index,
                    });
                }
                return Ok(arg);
            }
            let expected = signature.runtime_parameter_type(index);
            let actual = arg.type_name();
            coerce_value(arg, &expected).ok_or_else(|| KelError::ArgumentType {
                function: signature.name.clone(),
                index,
                expected: expected.to_string(),
                actual,
            })
        })
        .collect()
}

/// Recognized errors pass through unchanged, anything else is wrapped with
/// the function name
fn wrap_failure(function: &str, err: anyhow::Error) -> KelError {
    match err.downcast::<KelError>() {
        Ok(known) => known,
        Err(other) => KelError::FunctionFailure {
            function: function.to_string(),
            message: format!("{other:#}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeInfo;
    use crate::registry::function::{FnNative, KelFunction};
    use crate::registry::library::StaticLibrary;
    use crate::registry::signature::ParameterInfo;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    struct NoInterpreter;

    impl KelFunctionEvaluator for NoInterpreter {
        fn evaluate_function(
            &mut self,
            function: &KelFunction,
            _args: Vec<Value>,
        ) -> Result<Value> {
            Err(KelError::FunctionFailure {
                function: function.name().to_string(),
                message: "no interpreter".to_string(),
            })
        }
    }

    fn catalog() -> FunctionCatalog {
        let double = FnNative::builder("Double")
            .param("x", TypeInfo::Number)
            .returns(TypeInfo::Number)
            .body(|args, _| match &args[0] {
                Value::Number(n) => Ok(Value::Number(n * Decimal::from(2))),
                _ => Ok(Value::Null),
            });
        let strict = FnNative::builder("Strict")
            .parameter(ParameterInfo::new("x", TypeInfo::String).not_null())
            .returns(TypeInfo::String)
            .body(|args, _| Ok(args[0].clone()));
        let size = FnNative::builder("Size")
            .param("items", TypeInfo::array(TypeInfo::Any))
            .returns(TypeInfo::Number)
            .body(|args, _| Ok(Value::from(args[0].to_elements().len() as i64)));
        let failing = FnNative::builder("Failing")
            .returns(TypeInfo::Any)
            .body(|_, _| Err(anyhow::anyhow!("boom")));
        let passing = FnNative::builder("Passing")
            .returns(TypeInfo::Any)
            .body(|_, _| Err(KelError::ThisNotAvailable.into()));
        let nested = FnNative::builder("Nested")
            .param("x", TypeInfo::Number)
            .returns(TypeInfo::Number)
            .body(|args, context| Ok(context.invoke("Double", args.to_vec())?));
        FunctionCatalog::builder()
            .library(StaticLibrary::new(
                "test",
                vec![
                    double.into(),
                    strict.into(),
                    size.into(),
                    failing.into(),
                    passing.into(),
                    nested.into(),
                ],
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_automatic_iteration_preserves_order() {
        let catalog = catalog();
        let args = vec![Value::collection(vec![
            Value::from(1),
            Value::from(2),
            Value::from(3),
        ])];
        let result = catalog
            .invoke_with_iteration("Double", args, None, &mut NoInterpreter)
            .unwrap();
        assert_eq!(
            result,
            Value::collection(vec![Value::from(2), Value::from(4), Value::from(6)])
        );
    }

    #[test]
    fn test_array_parameter_does_not_iterate() {
        let catalog = catalog();
        let args = vec![Value::collection(vec![Value::from(1), Value::from(2)])];
        let result = catalog
            .invoke_with_iteration("Size", args, None, &mut NoInterpreter)
            .unwrap();
        assert_eq!(result, Value::from(2));
    }

    #[test]
    fn test_direct_invoke_rejects_collection() {
        let catalog = catalog();
        let args = vec![Value::collection(vec![Value::from(1)])];
        let err = catalog
            .invoke("Double", args, None, &mut NoInterpreter)
            .unwrap_err();
        assert!(matches!(err, KelError::ArgumentType { index: 0, .. }));
    }

    #[test]
    fn test_money_is_coerced_to_number() {
        let catalog = catalog();
        let args = vec![Value::money(Decimal::from(5), "EUR")];
        let result = catalog.invoke("Double", args, None, &mut NoInterpreter).unwrap();
        assert!(matches!(result, Value::Number(_)));
        assert_eq!(result, Value::from(10));
    }

    #[test]
    fn test_not_null_parameter() {
        let catalog = catalog();
        let err = catalog
            .invoke("Strict", vec![Value::Null], None, &mut NoInterpreter)
            .unwrap_err();
        assert_eq!(
            err,
            KelError::NullArgument {
                function: "Strict".to_string(),
                index: 0
            }
        );
    }

    #[test]
    fn test_failures_are_wrapped_unless_recognized() {
        let catalog = catalog();
        let err = catalog
            .invoke("Failing", vec![], None, &mut NoInterpreter)
            .unwrap_err();
        assert_eq!(
            err,
            KelError::FunctionFailure {
                function: "Failing".to_string(),
                message: "boom".to_string()
            }
        );
        let err = catalog
            .invoke("Passing", vec![], None, &mut NoInterpreter)
            .unwrap_err();
        assert_eq!(err, KelError::ThisNotAvailable);
    }

    #[test]
    fn test_native_calls_native_through_context() {
        let catalog = catalog();
        let result = catalog
            .invoke("Nested", vec![Value::from(21)], None, &mut NoInterpreter)
            .unwrap();
        assert_eq!(result, Value::from(42));
    }
}

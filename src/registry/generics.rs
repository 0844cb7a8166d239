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

//! Generic type binding for static typing of function calls
//!
//! Only consulted when building trees; runtime dispatch is header based.

use super::catalog::FunctionCatalog;
use super::function::FunctionDefinition;
use super::signature::FunctionSignature;
use crate::error::{KelError, Result};
use crate::model::TypeInfo;
use rustc_hash::FxHashMap;

impl FunctionCatalog {
    /// Resolved return type of a call with the given argument types.
    ///
    /// Generic parameters are bound from the argument types and checked
    /// against their bounds; unbound generics fall back to their bound. When
    /// an iteration-eligible scalar parameter receives an array type the call
    /// fans out at runtime, so the result is an array of the return type.
    pub fn resolve_return_type(
        &self,
        name: &str,
        argument_types: &[TypeInfo],
        target: Option<&str>,
    ) -> Result<TypeInfo> {
        match self.resolve(name, argument_types.len(), target)? {
            FunctionDefinition::Kel(function) => Ok(function.return_type().clone()),
            FunctionDefinition::Native(function) => {
                bind_return_type(function.signature(), argument_types)
            }
        }
    }
}

pub(crate) fn bind_return_type(
    signature: &FunctionSignature,
    argument_types: &[TypeInfo],
) -> Result<TypeInfo> {
    let mut bindings: FxHashMap<String, TypeInfo> = FxHashMap::default();
    let mut iterated = false;

    for (parameter, argument) in signature.parameters.iter().zip(argument_types) {
        let declared = &parameter.param_type;
        let argument = if parameter.iterable
            && !declared.is_array_like()
            && argument.is_array_like()
        {
            iterated = true;
            argument.element_type()
        } else {
            argument.clone()
        };
        bind(declared, &argument, &mut bindings);
    }

    for generic in &signature.generics {
        match (bindings.get(&generic.name), &generic.bound) {
            (Some(bound_to), Some(bound)) => {
                if !bound.is_assignable_from(bound_to) {
                    return Err(KelError::type_mismatch(
                        bound.to_string(),
                        bound_to.to_string(),
                        format!("generic type {} of {}", generic.name, signature.name),
                    ));
                }
            }
            (None, _) => {
                bindings.insert(generic.name.clone(), signature.bound_of(&generic.name));
            }
            _ => {}
        }
    }

    let resolved = signature.return_type.substitute(&bindings);
    if iterated {
        Ok(TypeInfo::array(resolved))
    } else {
        Ok(resolved)
    }
}

fn bind(declared: &TypeInfo, actual: &TypeInfo, bindings: &mut FxHashMap<String, TypeInfo>) {
    match (declared, actual) {
        (_, TypeInfo::Any | TypeInfo::Unknown) => {}
        (TypeInfo::Generic(name), actual) => {
            let merged = match bindings.get(name) {
                Some(existing) => existing.common_type(actual).unwrap_or(TypeInfo::Any),
                None => actual.clone(),
            };
            bindings.insert(name.clone(), merged);
        }
        (TypeInfo::Array(declared), TypeInfo::Array(actual)) => bind(declared, actual, bindings),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::signature::ParameterInfo;
    use pretty_assertions::assert_eq;

    fn first() -> FunctionSignature {
        FunctionSignature::new(
            "First",
            vec![ParameterInfo::new("items", TypeInfo::array(TypeInfo::generic("T")))],
            TypeInfo::generic("T"),
        )
        .with_generic("T", None)
    }

    fn plus_days() -> FunctionSignature {
        FunctionSignature::new(
            "PlusDays",
            vec![
                ParameterInfo::new("date", TypeInfo::generic("T")),
                ParameterInfo::new("days", TypeInfo::Number),
            ],
            TypeInfo::generic("T"),
        )
        .with_generic(
            "T",
            Some(TypeInfo::Union(vec![TypeInfo::Date, TypeInfo::DateTime])),
        )
    }

    #[test]
    fn test_binds_element_type() {
        let resolved = bind_return_type(&first(), &[TypeInfo::array(TypeInfo::Money)]).unwrap();
        assert_eq!(resolved, TypeInfo::Money);
    }

    #[test]
    fn test_unbound_generic_uses_bound() {
        let resolved = bind_return_type(&plus_days(), &[TypeInfo::Any, TypeInfo::Number]).unwrap();
        assert_eq!(
            resolved,
            TypeInfo::Union(vec![TypeInfo::Date, TypeInfo::DateTime])
        );
        let resolved = bind_return_type(&first(), &[TypeInfo::Any]).unwrap();
        assert_eq!(resolved, TypeInfo::Any);
    }

    #[test]
    fn test_bound_violation() {
        let err =
            bind_return_type(&plus_days(), &[TypeInfo::String, TypeInfo::Number]).unwrap_err();
        assert!(matches!(err, KelError::TypeMismatch { .. }));
    }

    #[test]
    fn test_iteration_wraps_result() {
        let resolved = bind_return_type(
            &plus_days(),
            &[TypeInfo::array(TypeInfo::Date), TypeInfo::Number],
        )
        .unwrap();
        assert_eq!(resolved, TypeInfo::array(TypeInfo::Date));
    }
}

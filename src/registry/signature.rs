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

//! Function headers and signatures

use crate::error::CatalogError;
use crate::model::TypeInfo;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a callable: name and parameter count
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionHeader {
    name: String,
    arity: usize,
}

impl FunctionHeader {
    /// Create a header
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter count
    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for FunctionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Function signature used for validation, dispatch and static typing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Parameters in call order
    pub parameters: Vec<ParameterInfo>,
    /// Return type
    pub return_type: TypeInfo,
    /// Generic type parameters
    pub generics: Vec<GenericParameter>,
    /// Expression targets the function is restricted to; empty means everywhere
    pub targets: Vec<String>,
}

/// Parameter information for functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub param_type: TypeInfo,
    /// Null arguments are rejected before the call
    pub not_null: bool,
    /// Eligible for automatic per-element iteration
    pub iterable: bool,
}

/// Generic type parameter with an optional upper bound
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenericParameter {
    /// Name used in `TypeInfo::Generic`
    pub name: String,
    /// Upper bound
    pub bound: Option<TypeInfo>,
}

impl FunctionSignature {
    /// Create a new function signature
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<ParameterInfo>,
        return_type: TypeInfo,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            return_type,
            generics: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Declare a generic type parameter
    pub fn with_generic(mut self, name: impl Into<String>, bound: Option<TypeInfo>) -> Self {
        self.generics.push(GenericParameter {
            name: name.into(),
            bound,
        });
        self
    }

    /// Restrict the function to an expression target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Header of this signature
    pub fn header(&self) -> FunctionHeader {
        FunctionHeader::new(self.name.clone(), self.parameters.len())
    }

    /// Upper bound of a generic parameter, `Any` when unbounded or undeclared
    pub fn bound_of(&self, generic: &str) -> TypeInfo {
        self.generics
            .iter()
            .find(|g| g.name == generic)
            .and_then(|g| g.bound.clone())
            .unwrap_or(TypeInfo::Any)
    }

    /// Parameter type with generics replaced by their bounds, used for runtime
    /// argument checks
    pub fn runtime_parameter_type(&self, index: usize) -> TypeInfo {
        let Some(parameter) = self.parameters.get(index) else {
            return TypeInfo::Any;
        };
        if !parameter.param_type.contains_generic() {
            return parameter.param_type.clone();
        }
        let bounds: FxHashMap<String, TypeInfo> = self
            .generics
            .iter()
            .map(|g| (g.name.clone(), self.bound_of(&g.name)))
            .collect();
        parameter.param_type.substitute(&bounds)
    }

    /// Check the signature for shapes the catalog cannot dispatch
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.is_empty() {
            return Err(CatalogError::UnsupportedSignature {
                function: self.name.clone(),
                message: "function name is empty".to_string(),
            });
        }

        for (i, generic) in self.generics.iter().enumerate() {
            if self.generics[..i].iter().any(|g| g.name == generic.name) {
                return Err(CatalogError::DuplicateGeneric {
                    function: self.name.clone(),
                    generic: generic.name.clone(),
                });
            }
            if let Some(bound) = &generic.bound {
                if bound.contains_generic() {
                    return Err(CatalogError::UnsupportedSignature {
                        function: self.name.clone(),
                        message: format!("bound of '{}' refers to a generic type", generic.name),
                    });
                }
            }
        }

        let mut used = Vec::new();
        for parameter in &self.parameters {
            parameter.param_type.generic_names(&mut used);
            if parameter.param_type == TypeInfo::Unknown {
                return Err(CatalogError::UnsupportedSignature {
                    function: self.name.clone(),
                    message: format!("parameter '{}' has no type", parameter.name),
                });
            }
            if let TypeInfo::Array(element) = &parameter.param_type {
                if element.is_array_like() {
                    return Err(CatalogError::UnsupportedSignature {
                        function: self.name.clone(),
                        message: format!("parameter '{}' is a nested array", parameter.name),
                    });
                }
            }
        }
        self.return_type.generic_names(&mut used);
        if self.return_type == TypeInfo::Unknown {
            return Err(CatalogError::UnsupportedSignature {
                function: self.name.clone(),
                message: "return type is unknown".to_string(),
            });
        }

        if let Some(undeclared) = used
            .into_iter()
            .find(|name| !self.generics.iter().any(|g| &g.name == name))
        {
            return Err(CatalogError::UndeclaredGeneric {
                function: self.name.clone(),
                generic: undeclared,
            });
        }
        Ok(())
    }
}

impl ParameterInfo {
    /// Create a nullable, iteration-eligible parameter
    pub fn new(name: impl Into<String>, param_type: TypeInfo) -> Self {
        Self {
            name: name.into(),
            param_type,
            not_null: false,
            iterable: true,
        }
    }

    /// Reject null arguments
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Exclude from automatic iteration
    pub fn non_iterable(mut self) -> Self {
        self.iterable = false;
        self
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.generics.is_empty() {
            let generics: Vec<String> = self
                .generics
                .iter()
                .map(|g| match &g.bound {
                    Some(bound) => format!("{}: {bound}", g.name),
                    None => g.name.clone(),
                })
                .collect();
            write!(f, "<{}>", generics.join(", "))?;
        }
        write!(f, "(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.param_type)?;
            if param.not_null {
                write!(f, "!")?;
            }
        }
        write!(f, ") -> {}", self.return_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_identity() {
        let signature = FunctionSignature::new(
            "Round",
            vec![ParameterInfo::new("number", TypeInfo::Number)],
            TypeInfo::Number,
        );
        assert_eq!(signature.header(), FunctionHeader::new("Round", 1));
        assert_eq!(signature.header().to_string(), "Round/1");
    }

    #[test]
    fn test_runtime_parameter_type_uses_bounds() {
        let date_like = TypeInfo::Union(vec![TypeInfo::Date, TypeInfo::DateTime]);
        let signature = FunctionSignature::new(
            "PlusDays",
            vec![
                ParameterInfo::new("date", TypeInfo::generic("T")),
                ParameterInfo::new("days", TypeInfo::Number),
            ],
            TypeInfo::generic("T"),
        )
        .with_generic("T", Some(date_like.clone()));
        assert!(signature.validate().is_ok());
        assert_eq!(signature.runtime_parameter_type(0), date_like);
        assert_eq!(
            signature.to_string(),
            "PlusDays<T: Date | DateTime>(date: <T>, days: Number) -> <T>"
        );
    }

    #[test]
    fn test_invalid_generics() {
        let duplicate = FunctionSignature::new("F", vec![], TypeInfo::Any)
            .with_generic("T", None)
            .with_generic("T", None);
        assert!(matches!(
            duplicate.validate(),
            Err(CatalogError::DuplicateGeneric { .. })
        ));

        let undeclared = FunctionSignature::new(
            "F",
            vec![ParameterInfo::new("x", TypeInfo::generic("U"))],
            TypeInfo::Any,
        );
        assert!(matches!(
            undeclared.validate(),
            Err(CatalogError::UndeclaredGeneric { .. })
        ));
    }

    #[test]
    fn test_nested_array_parameter_is_unsupported() {
        let nested = FunctionSignature::new(
            "F",
            vec![ParameterInfo::new(
                "x",
                TypeInfo::array(TypeInfo::array(TypeInfo::Any)),
            )],
            TypeInfo::Any,
        );
        assert!(matches!(
            nested.validate(),
            Err(CatalogError::UnsupportedSignature { .. })
        ));
    }
}

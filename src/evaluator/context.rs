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

//! Evaluation context handed to the interpreter

use super::type_provider::{DefaultTypeProvider, TypeProvider};
use crate::model::Value;
use crate::registry::FunctionCatalog;
use indexmap::IndexMap;
use std::sync::Arc;

/// Inputs of one evaluation: root data, variables, functions and type checks.
///
/// Cloning is cheap; all parts are shared.
#[derive(Clone)]
pub struct EvaluationContext {
    data: Value,
    variables: Arc<IndexMap<String, Value>>,
    catalog: Arc<FunctionCatalog>,
    type_provider: Arc<dyn TypeProvider>,
}

impl EvaluationContext {
    /// Context over `data` with no variables and the default type provider
    pub fn new(data: Value, catalog: Arc<FunctionCatalog>) -> Self {
        Self {
            data,
            variables: Arc::new(IndexMap::new()),
            catalog,
            type_provider: Arc::new(DefaultTypeProvider::new()),
        }
    }

    /// Bind a variable, replacing an existing binding
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.variables).insert(name.into(), value.into());
        self
    }

    /// Replace all variables
    pub fn with_variables(mut self, variables: IndexMap<String, Value>) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    /// Use another type provider
    pub fn with_type_provider(mut self, type_provider: Arc<dyn TypeProvider>) -> Self {
        self.type_provider = type_provider;
        self
    }

    /// Same variables, catalog and provider over different root data
    pub fn with_data(&self, data: Value) -> Self {
        Self {
            data,
            ..self.clone()
        }
    }

    /// Root data object
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Variable bindings
    pub fn variables(&self) -> &IndexMap<String, Value> {
        &self.variables
    }

    /// Function catalog used for calls
    pub fn catalog(&self) -> &Arc<FunctionCatalog> {
        &self.catalog
    }

    /// Type provider used by `instanceof` and `typeof`
    pub fn type_provider(&self) -> &dyn TypeProvider {
        self.type_provider.as_ref()
    }

    pub(crate) fn variables_value(&self) -> Value {
        Value::Map(Arc::clone(&self.variables))
    }
}

impl std::fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("data", &self.data)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

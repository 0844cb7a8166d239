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

//! Function definitions: host-native and interpreted

use super::catalog::FunctionCatalog;
use super::signature::{FunctionHeader, FunctionSignature, ParameterInfo};
use crate::ast::Expression;
use crate::error::Result;
use crate::model::{TypeInfo, Value};
use std::fmt;
use std::sync::Arc;

/// Result of a native function body
pub type NativeResult = anyhow::Result<Value>;

/// Host-native function exposed to expressions
pub trait NativeFunction: Send + Sync {
    /// Function name
    fn name(&self) -> &str {
        &self.signature().name
    }

    /// Function signature
    fn signature(&self) -> &FunctionSignature;

    /// Invoke with validated and coerced arguments
    fn call(&self, args: &[Value], context: &mut CallContext<'_>) -> NativeResult;

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }
}

type NativeBody = dyn Fn(&[Value], &mut CallContext<'_>) -> NativeResult + Send + Sync;

/// Native function backed by a closure
pub struct FnNative {
    signature: FunctionSignature,
    documentation: String,
    body: Box<NativeBody>,
}

impl FnNative {
    /// Start building a closure-backed native function
    pub fn builder(name: impl Into<String>) -> NativeFunctionBuilder {
        NativeFunctionBuilder {
            signature: FunctionSignature::new(name, Vec::new(), TypeInfo::Any),
            documentation: String::new(),
        }
    }
}

impl NativeFunction for FnNative {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn call(&self, args: &[Value], context: &mut CallContext<'_>) -> NativeResult {
        (self.body)(args, context)
    }

    fn documentation(&self) -> &str {
        &self.documentation
    }
}

impl fmt::Debug for FnNative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnNative")
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

/// Builder for closure-backed native functions
pub struct NativeFunctionBuilder {
    signature: FunctionSignature,
    documentation: String,
}

impl NativeFunctionBuilder {
    /// Add a nullable, iteration-eligible parameter
    pub fn param(mut self, name: impl Into<String>, param_type: TypeInfo) -> Self {
        self.signature
            .parameters
            .push(ParameterInfo::new(name, param_type));
        self
    }

    /// Add a fully specified parameter
    pub fn parameter(mut self, parameter: ParameterInfo) -> Self {
        self.signature.parameters.push(parameter);
        self
    }

    /// Declare a generic type parameter
    pub fn generic(mut self, name: impl Into<String>, bound: Option<TypeInfo>) -> Self {
        self.signature = self.signature.with_generic(name, bound);
        self
    }

    /// Restrict to an expression target
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.signature = self.signature.with_target(target);
        self
    }

    /// Set the return type
    pub fn returns(mut self, return_type: TypeInfo) -> Self {
        self.signature.return_type = return_type;
        self
    }

    /// Set documentation
    pub fn doc(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = documentation.into();
        self
    }

    /// Finish with the function body
    pub fn body<F>(self, body: F) -> Arc<dyn NativeFunction>
    where
        F: Fn(&[Value], &mut CallContext<'_>) -> NativeResult + Send + Sync + 'static,
    {
        Arc::new(FnNative {
            signature: self.signature,
            documentation: self.documentation,
            body: Box::new(body),
        })
    }
}

/// Function whose body is an expression tree
#[derive(Debug, Clone)]
pub struct KelFunction {
    name: String,
    parameters: Vec<String>,
    body: Arc<Expression>,
}

impl KelFunction {
    /// Create an interpreted function
    pub fn new(name: impl Into<String>, parameters: Vec<String>, body: Expression) -> Self {
        Self {
            name: name.into(),
            parameters,
            body: Arc::new(body),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered parameter names
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Body expression
    pub fn body(&self) -> &Arc<Expression> {
        &self.body
    }

    /// Header of this function
    pub fn header(&self) -> FunctionHeader {
        FunctionHeader::new(self.name.clone(), self.parameters.len())
    }

    /// Return type is the body's evaluation type
    pub fn return_type(&self) -> &TypeInfo {
        self.body.eval_type()
    }
}

/// A definition resolved from the catalog
#[derive(Clone)]
pub enum FunctionDefinition {
    /// Host-native function
    Native(Arc<dyn NativeFunction>),
    /// Interpreted function
    Kel(Arc<KelFunction>),
}

impl FunctionDefinition {
    /// Function name
    pub fn name(&self) -> &str {
        match self {
            FunctionDefinition::Native(f) => f.name(),
            FunctionDefinition::Kel(f) => f.name(),
        }
    }

    /// True for host-native definitions
    pub fn is_native(&self) -> bool {
        matches!(self, FunctionDefinition::Native(_))
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionDefinition::Native(native) => write!(f, "Native({})", native.signature()),
            FunctionDefinition::Kel(kel) => write!(f, "Kel({})", kel.header()),
        }
    }
}

/// Evaluates interpreted function bodies; implemented by the interpreter
pub trait KelFunctionEvaluator {
    /// Evaluate `function` with arguments bound to its parameters in a fresh frame
    fn evaluate_function(&mut self, function: &KelFunction, args: Vec<Value>) -> Result<Value>;
}

/// Invocation facade handed to native function bodies
pub struct CallContext<'a> {
    catalog: &'a FunctionCatalog,
    evaluator: &'a mut dyn KelFunctionEvaluator,
    target: Option<&'a str>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        catalog: &'a FunctionCatalog,
        evaluator: &'a mut dyn KelFunctionEvaluator,
        target: Option<&'a str>,
    ) -> Self {
        Self {
            catalog,
            evaluator,
            target,
        }
    }

    /// Expression target of the current evaluation
    pub fn target(&self) -> Option<&str> {
        self.target
    }

    /// Call another function by name
    pub fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.catalog
            .invoke(name, args, self.target, &mut *self.evaluator)
    }

    /// Call another function by name with automatic iteration
    pub fn invoke_with_iteration(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.catalog
            .invoke_with_iteration(name, args, self.target, &mut *self.evaluator)
    }
}

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

//! Function catalog for KEL
//!
//! Native and interpreted functions are harvested from [`FunctionLibrary`]
//! instances into a [`FunctionCatalog`], which resolves calls by header
//! (name and arity) and dispatches them, optionally iterating over
//! collection arguments.

#![warn(missing_docs)]

pub mod catalog;
pub mod function;
pub mod functions;
pub mod generics;
pub mod invocation;
pub mod library;
pub mod signature;

pub use catalog::{CatalogStats, FunctionCatalog, FunctionCatalogBuilder};
pub use function::{
    CallContext, FnNative, FunctionDefinition, KelFunction, KelFunctionEvaluator, NativeFunction,
    NativeFunctionBuilder, NativeResult,
};
pub use functions::StandardLibrary;
pub use library::{FunctionLibrary, FunctionRegistration, RuleFunctionLibrary, StaticLibrary};
pub use signature::{FunctionHeader, FunctionSignature, GenericParameter, ParameterInfo};

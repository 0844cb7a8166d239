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

//! KEL expression evaluation core
//!
//! Business rules are written as KEL expressions over a domain object
//! graph. An external parser turns source text into a typed, immutable
//! [`Expression`] tree once; the tree-walking interpreter then evaluates it
//! any number of times against different data. Calls go through a
//! [`FunctionCatalog`] holding native functions and functions written in
//! KEL itself.
//!
//! ```
//! use kel_engine::{EvaluationContext, Expression, FunctionCatalog, Scope, Token, Value};
//! use kel_engine::evaluator::{evaluate, EvaluationConfig};
//! use kel_engine::model::TypeInfo;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(FunctionCatalog::standard().unwrap());
//! let scope = Scope::root();
//! let half = rust_decimal::Decimal::new(25, 1);
//! let argument = Expression::number(half, Token::synthetic("2.5"), &scope);
//! let call = Expression::function_call(&catalog, None, "Round", vec![argument],
//!     Token::synthetic("Round"), &scope).unwrap();
//! assert_eq!(call.eval_type(), &TypeInfo::Number);
//!
//! let context = EvaluationContext::new(Value::Null, catalog);
//! let result = evaluate(&call, &context, &EvaluationConfig::default()).unwrap();
//! assert_eq!(result, Value::from(3));
//! ```

pub mod ast;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod registry;

pub use ast::{Expression, ExpressionKind, Scope, ScopeType, Token};
pub use engine::{EngineConfig, ExpressionParser, KelEngine, SyntaxError};
pub use error::{AstError, CatalogError, KelError, Result};
pub use evaluator::{EvaluationConfig, EvaluationContext, EvaluationMode, evaluate};
pub use model::{DataObject, MapObject, Money, Record, TypeInfo, Value};
pub use registry::{FnNative, FunctionCatalog, FunctionLibrary, KelFunction, StaticLibrary};

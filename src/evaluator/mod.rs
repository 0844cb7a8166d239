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

//! Expression evaluation
//!
//! [`evaluate`] walks an expression tree against an [`EvaluationContext`];
//! [`evaluate_set_expression`] writes a property addressed by a dotted path.

pub mod config;
pub mod context;
pub mod interpreter;
mod operators;
pub mod setter;
mod stack;
pub mod type_provider;

pub use config::{EvaluationConfig, EvaluationMode};
pub use context::EvaluationContext;
pub use interpreter::{Interpreter, evaluate};
pub use setter::evaluate_set_expression;
pub use type_provider::{DefaultTypeProvider, TypeProvider};

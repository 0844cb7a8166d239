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

//! Abstract syntax tree for KEL expressions
//!
//! Trees are produced by an external parser, are immutable once built and
//! can be shared across threads and evaluations.

mod display;
pub mod expression;
pub mod operator;
pub mod reference;
pub mod scope;
pub mod span;

pub use expression::{
    AccessByIndexData, Arguments, BinaryData, CollectionFilterData, Expression, ExpressionKind,
    FunctionCallData, IfData, IterationData, PathData, TemplatePart, TypeOperationData,
    UnaryData, ValueBlockData,
};
pub use operator::{BinaryOperator, UnaryOperator};
pub use reference::Reference;
pub use scope::{Scope, ScopeType};
pub use span::{Span, Token};

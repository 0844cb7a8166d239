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

//! Tree-walking interpreter
//!
//! Each evaluation owns a fresh [`FrameStack`]. A name declared somewhere up
//! the identifier's static scope chain is read from the innermost visible
//! frame bound to the declaring scope. Only undeclared names fall back to
//! the first visible frame whose object carries the property. While a path
//! is navigating, the navigated object alone answers.

use super::config::{EvaluationConfig, EvaluationMode};
use super::context::EvaluationContext;
use super::operators;
use super::stack::{Frame, FrameKind, FrameStack};
use crate::ast::{
    AccessByIndexData, BinaryData, BinaryOperator, CollectionFilterData, Expression,
    ExpressionKind, FunctionCallData, IterationData, PathData, Scope, ScopeType, TemplatePart,
    ValueBlockData,
};
use crate::error::{KelError, Result};
use crate::model::Value;
use crate::registry::{KelFunction, KelFunctionEvaluator};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

/// Evaluate an expression tree against a context
pub fn evaluate(
    root: &Expression,
    context: &EvaluationContext,
    config: &EvaluationConfig,
) -> Result<Value> {
    Interpreter::new(context, config).evaluate(root)
}

/// Interpreter bound to one context and configuration
pub struct Interpreter<'a> {
    context: &'a EvaluationContext,
    config: &'a EvaluationConfig,
    stack: FrameStack,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter with an empty stack
    pub fn new(context: &'a EvaluationContext, config: &'a EvaluationConfig) -> Self {
        Self {
            context,
            config,
            stack: FrameStack::default(),
        }
    }

    /// Evaluate a tree with the root data and the variables as the bottom frames
    pub fn evaluate(&mut self, root: &Expression) -> Result<Value> {
        self.stack.clear();
        self.stack.push(
            Frame::new(FrameKind::Root, self.context.data().clone())
                .with_scope(&root.scope().global())
                .this_candidate(),
        );
        self.stack.push(Frame::new(
            FrameKind::Variables,
            self.context.variables_value(),
        ));

        log::trace!("evaluating {root}");
        let result = self.eval(root);
        self.stack.clear();
        if let Err(err) = &result {
            log::debug!("evaluation of {root} failed: {err}");
        }
        result
    }

    fn mode(&self) -> EvaluationMode {
        self.config.mode
    }

    fn eval(&mut self, expression: &Expression) -> Result<Value> {
        match expression.kind() {
            ExpressionKind::Null => Ok(Value::Null),
            ExpressionKind::Boolean(value) => Ok(Value::Boolean(*value)),
            ExpressionKind::String(value) => Ok(Value::String(Arc::clone(value))),
            ExpressionKind::Number(value) => Ok(Value::Number(*value)),
            ExpressionKind::Date(value) => Ok(Value::Date(*value)),
            ExpressionKind::DateTime(value) => Ok(Value::DateTime(*value)),
            ExpressionKind::Identifier(name) => {
                self.resolve_identifier(name, expression.scope())
            }
            ExpressionKind::This => self
                .stack
                .this_object()
                .cloned()
                .ok_or(KelError::ThisNotAvailable),
            ExpressionKind::Path(path) => self.eval_path(path),
            ExpressionKind::AccessByIndex(access) => self.eval_access_by_index(access),
            ExpressionKind::CollectionFilter(filter) => self.eval_filter(filter),
            ExpressionKind::ForEach(iteration) => self.eval_for_each(iteration),
            ExpressionKind::ForSome(iteration) => self.eval_quantifier(iteration, true),
            ExpressionKind::ForEvery(iteration) => self.eval_quantifier(iteration, false),
            ExpressionKind::If(conditional) => {
                let condition = self.eval(&conditional.condition)?;
                if operators::truth(&condition, self.mode(), "if condition")? {
                    self.eval(&conditional.then_branch)
                } else if let Some(otherwise) = &conditional.else_branch {
                    self.eval(otherwise)
                } else {
                    Ok(Value::Null)
                }
            }
            ExpressionKind::Binary(binary) => self.eval_binary(binary),
            ExpressionKind::Unary(unary) => {
                let operand = self.eval(&unary.operand)?;
                operators::unary(unary.operator, &operand, self.mode())
            }
            ExpressionKind::Cast(cast) => self.eval(&cast.expression),
            ExpressionKind::InstanceOf(check) => {
                let value = self.eval(&check.expression)?;
                let provider = self.context.type_provider();
                Ok(Value::Boolean(provider.is_instance_of(&value, &check.target)))
            }
            ExpressionKind::TypeOf(check) => {
                let value = self.eval(&check.expression)?;
                let provider = self.context.type_provider();
                Ok(Value::Boolean(provider.is_exactly(&value, &check.target)))
            }
            ExpressionKind::Function(call) => self.eval_function(call),
            ExpressionKind::InlineArray(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::collection(values))
            }
            ExpressionKind::InlineMap(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, item) in entries {
                    map.insert(key.clone(), self.eval(item)?);
                }
                Ok(Value::map(map))
            }
            ExpressionKind::Template(parts) => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(literal) => text.push_str(literal),
                        TemplatePart::Expression(inner) => {
                            text.push_str(&self.eval(inner)?.to_string());
                        }
                    }
                }
                Ok(Value::string(text))
            }
            ExpressionKind::ValueBlock(block) => {
                let height = self.stack.height();
                let result = self.eval_value_block(block);
                self.stack.truncate(height);
                result
            }
        }
    }

    // Name resolution

    fn resolve_identifier(&self, name: &str, scope: &Arc<Scope>) -> Result<Value> {
        let mut segments = name.split('.');
        let first = segments.next().unwrap_or(name);
        let mut value = self.resolve_name(first, scope)?;
        for segment in segments {
            value = self.property_of(&value, segment, None)?;
        }
        Ok(value)
    }

    fn resolve_name(&self, name: &str, scope: &Arc<Scope>) -> Result<Value> {
        if let Some(frame) = self
            .stack
            .top()
            .filter(|frame| frame.kind == FrameKind::Navigation)
        {
            return self.property_of(&frame.object, name, frame.scope.as_ref());
        }

        if let Some(declaring) = scope.declaring_scope(name) {
            let mut bound = self
                .stack
                .visible()
                .filter(|frame| frame.scope.as_ref().is_some_and(|s| Arc::ptr_eq(s, declaring)))
                .peekable();
            // several binding frames may share one block scope
            if bound.peek().is_some() {
                let value = bound.find_map(|frame| frame.object.get_property(name));
                return Ok(value.unwrap_or_default());
            }
        }

        for frame in self.stack.visible() {
            if let Some(value) = frame.object.get_property(name) {
                return Ok(value);
            }
        }

        if self.stack.is_null_safe() {
            return Ok(Value::Null);
        }
        Err(KelError::UnresolvedReference {
            name: name.to_string(),
        })
    }

    /// Property of a navigated value; collections are navigated per element
    /// and flattened one level
    fn property_of(&self, object: &Value, name: &str, scope: Option<&Arc<Scope>>) -> Result<Value> {
        match object {
            Value::Collection(items) => {
                let mut results = Vec::with_capacity(items.len());
                for item in items {
                    flatten_into(&mut results, self.property_of(item, name, scope)?);
                }
                Ok(Value::collection(results))
            }
            Value::Null if self.stack.is_null_safe() => Ok(Value::Null),
            other => {
                if let Some(value) = other.get_property(name) {
                    return Ok(value);
                }
                let declared = scope.is_some_and(|scope| scope.declares(name));
                if !other.is_null() && (declared || self.stack.is_null_safe()) {
                    return Ok(Value::Null);
                }
                Err(KelError::PropertyNotFound {
                    property: name.to_string(),
                    type_name: other.type_name(),
                })
            }
        }
    }

    // Navigation

    fn eval_path(&mut self, path: &PathData) -> Result<Value> {
        let object = self.eval(&path.object)?;
        match object {
            Value::Collection(items) => {
                let mut results = Vec::with_capacity(items.len());
                for item in &items {
                    let value = self.navigate(item.clone(), path)?;
                    flatten_into(&mut results, value);
                }
                Ok(Value::collection(results))
            }
            Value::Null
                if path.null_safe
                    || self.stack.is_null_safe()
                    || is_null_safe_chain(&path.object) =>
            {
                Ok(Value::Null)
            }
            Value::Null => Err(KelError::PropertyNotFound {
                property: path.property.to_string(),
                type_name: "Null".to_string(),
            }),
            single => self.navigate(single, path),
        }
    }

    fn navigate(&mut self, object: Value, path: &PathData) -> Result<Value> {
        let mut frame = Frame::new(FrameKind::Navigation, object).null_safe(path.null_safe);
        if let Some(scope) = local_scope(&path.property) {
            frame = frame.with_scope(scope);
        }
        self.with_frame(frame, |this| this.eval(&path.property))
    }

    fn eval_access_by_index(&mut self, access: &AccessByIndexData) -> Result<Value> {
        let collection = self.eval(&access.collection)?;
        let index = self.rewound(|this| this.eval(&access.index))?;
        let index = match &index {
            Value::Number(n) if n.fract().is_zero() => n.to_i64(),
            _ => None,
        }
        .ok_or_else(|| {
            KelError::type_mismatch("whole Number", index.type_name(), "collection index")
        })?;

        match collection {
            Value::Null => Ok(Value::Null),
            Value::Collection(items) => usize::try_from(index)
                .ok()
                .and_then(|position| items.get(position))
                .cloned()
                .ok_or(KelError::IndexOutOfBounds {
                    index,
                    size: items.len(),
                }),
            single if index == 0 => Ok(single),
            _ => Err(KelError::IndexOutOfBounds { index, size: 1 }),
        }
    }

    // Collections

    fn eval_filter(&mut self, filter: &CollectionFilterData) -> Result<Value> {
        let collection = self.eval(&filter.collection)?;
        let Some(predicate) = &filter.predicate else {
            return Ok(collection);
        };
        let elements = collection.to_elements();
        let scope = local_scope(predicate).cloned();

        self.rewound(|this| {
            let mut kept = Vec::new();
            for element in elements {
                let mut frame = Frame::new(FrameKind::Block, element.clone()).this_candidate();
                if let Some(scope) = &scope {
                    frame = frame.with_scope(scope);
                }
                if this.with_frame(frame, |this| this.eval(predicate))?.is_true() {
                    kept.push(element);
                }
            }
            Ok(Value::collection(kept))
        })
    }

    fn eval_for_each(&mut self, iteration: &IterationData) -> Result<Value> {
        let elements = self.eval(&iteration.collection)?.to_elements();
        self.rewound(|this| {
            let mut results = Vec::with_capacity(elements.len());
            for element in elements {
                let frame = binding_frame(&iteration.variable, element, &iteration.body);
                let value = this.with_frame(frame, |this| this.eval(&iteration.body))?;
                flatten_into(&mut results, value);
            }
            Ok(Value::collection(results))
        })
    }

    /// `some` stops at the first true body, `every` at the first non-true one
    fn eval_quantifier(&mut self, iteration: &IterationData, some: bool) -> Result<Value> {
        let elements = self.eval(&iteration.collection)?.to_elements();
        self.rewound(|this| {
            for element in elements {
                let frame = binding_frame(&iteration.variable, element, &iteration.body);
                let holds = this
                    .with_frame(frame, |this| this.eval(&iteration.body))?
                    .is_true();
                if holds == some {
                    return Ok(Value::Boolean(some));
                }
            }
            Ok(Value::Boolean(!some))
        })
    }

    fn eval_value_block(&mut self, block: &ValueBlockData) -> Result<Value> {
        let height = self.stack.height();
        let result = self.eval_bindings(block);
        self.stack.truncate(height);
        result
    }

    fn eval_bindings(&mut self, block: &ValueBlockData) -> Result<Value> {
        for (name, binding) in &block.bindings {
            let value = self.eval(binding)?;
            self.stack.push(binding_frame(name, value, &block.result));
        }
        self.eval(&block.result)
    }

    // Operators and calls

    fn eval_binary(&mut self, binary: &BinaryData) -> Result<Value> {
        let operator = binary.operator;
        if operator.is_logical() {
            let mode = self.mode();
            let left = self.eval(&binary.left)?;
            let left = operators::truth(&left, mode, operator.symbol())?;
            match (operator, left) {
                (BinaryOperator::And, false) => return Ok(Value::Boolean(false)),
                (BinaryOperator::Or, true) => return Ok(Value::Boolean(true)),
                _ => {}
            }
            let right = self.eval(&binary.right)?;
            return Ok(Value::Boolean(operators::truth(&right, mode, operator.symbol())?));
        }

        let left = self.eval(&binary.left)?;
        let right = self.eval(&binary.right)?;
        operators::binary(operator, &left, &right, self.mode())
    }

    fn eval_function(&mut self, call: &FunctionCallData) -> Result<Value> {
        let args = call
            .arguments
            .iter()
            .map(|argument| self.eval(argument))
            .collect::<Result<Vec<_>>>()?;

        let context = self.context;
        let config = self.config;
        let target = config.expression_target.as_deref();
        let catalog = context.catalog();
        if config.automatic_iteration {
            catalog.invoke_with_iteration(&call.name, args, target, self)
        } else {
            catalog.invoke(&call.name, args, target, self)
        }
    }

    // Stack helpers

    fn with_frame<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let height = self.stack.height();
        self.stack.push(frame);
        let result = f(self);
        self.stack.truncate(height);
        result
    }

    /// Run `f` against the stack rewound to the nearest block boundary
    fn rewound<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mark = self.stack.rewind();
        let height = self.stack.height();
        let result = f(self);
        self.stack.truncate(height);
        self.stack.restore(mark);
        result
    }
}

impl KelFunctionEvaluator for Interpreter<'_> {
    fn evaluate_function(&mut self, function: &KelFunction, args: Vec<Value>) -> Result<Value> {
        let parameters: IndexMap<String, Value> =
            function.parameters().iter().cloned().zip(args).collect();
        log::trace!("calling {} with {:?}", function.header(), parameters);
        let frame = Frame::new(FrameKind::Function, Value::map(parameters));
        self.with_frame(frame, |this| this.eval(function.body()))
    }
}

/// Frame holding one named binding, tied to the scope that declares the
/// name as seen from the expressions evaluated under it
fn binding_frame(name: &str, value: Value, body: &Expression) -> Frame {
    let mut binding = IndexMap::with_capacity(1);
    binding.insert(name.to_string(), value);
    let frame = Frame::new(FrameKind::Block, Value::map(binding));
    match body.scope().declaring_scope(name) {
        Some(scope) => frame.with_scope(scope),
        None => frame,
    }
}

/// Scope worth consulting for static declarations; the global scope is
/// already attached to the root frame
fn local_scope(expression: &Expression) -> Option<&Arc<Scope>> {
    let scope = expression.scope();
    (scope.scope_type() != ScopeType::Global).then_some(scope)
}

/// A `?.` anywhere along the navigated side makes the whole chain null-safe
fn is_null_safe_chain(expression: &Expression) -> bool {
    match expression.kind() {
        ExpressionKind::Path(path) => path.null_safe || is_null_safe_chain(&path.object),
        ExpressionKind::AccessByIndex(access) => is_null_safe_chain(&access.collection),
        ExpressionKind::CollectionFilter(filter) => is_null_safe_chain(&filter.collection),
        _ => false,
    }
}

fn flatten_into(results: &mut Vec<Value>, value: Value) {
    match value {
        Value::Collection(items) => results.extend(items.iter().cloned()),
        other => results.push(other),
    }
}

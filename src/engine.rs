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

//! Engine facade
//!
//! [`KelEngine`] ties together the function catalog, a type provider, the
//! evaluation configuration and an optional [`ExpressionParser`]. Parsed
//! trees are cached per expression text and static scope.

use crate::ast::{Expression, Scope, Span};
use crate::error::{KelError, Result};
use crate::evaluator::{
    self, DefaultTypeProvider, EvaluationConfig, EvaluationContext, Interpreter, TypeProvider,
};
use crate::model::Value;
use crate::registry::FunctionCatalog;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Settings applied to every evaluation
    pub evaluation: EvaluationConfig,
    /// Capacity of the parsed expression cache; 0 disables caching
    pub expression_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluation: EvaluationConfig::default(),
            expression_cache_size: 1000,
        }
    }
}

/// Error reported by an expression parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Human-readable message
    pub message: String,
    /// Location in the source text
    pub span: Span,
}

impl SyntaxError {
    /// Create a syntax error
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

/// Builds typed expression trees from source text
pub trait ExpressionParser: Send + Sync {
    /// Parse `source` in the static `scope`; the catalog types function calls
    fn build_ast(
        &self,
        source: &str,
        scope: &Arc<Scope>,
        catalog: &FunctionCatalog,
    ) -> std::result::Result<Expression, Vec<SyntaxError>>;
}

impl<F> ExpressionParser for F
where
    F: Fn(&str, &Arc<Scope>, &FunctionCatalog) -> std::result::Result<Expression, Vec<SyntaxError>>
        + Send
        + Sync,
{
    fn build_ast(
        &self,
        source: &str,
        scope: &Arc<Scope>,
        catalog: &FunctionCatalog,
    ) -> std::result::Result<Expression, Vec<SyntaxError>> {
        self(source, scope, catalog)
    }
}

/// Cache key: expression text and scope identity
type CacheKey = (String, usize);

struct CachedExpression {
    // keeps the scope alive so its address is not reused by another scope
    _scope: Arc<Scope>,
    expression: Arc<Expression>,
    generation: u64,
}

/// Entry point for parsing and evaluating KEL expressions
pub struct KelEngine {
    catalog: Arc<FunctionCatalog>,
    type_provider: Arc<dyn TypeProvider>,
    config: EngineConfig,
    parser: Option<Arc<dyn ExpressionParser>>,
    cache: Option<Mutex<LruCache<CacheKey, CachedExpression>>>,
}

impl KelEngine {
    /// Engine over a catalog with the default configuration
    pub fn new(catalog: Arc<FunctionCatalog>) -> Self {
        let config = EngineConfig::default();
        Self {
            catalog,
            type_provider: Arc::new(DefaultTypeProvider::new()),
            cache: new_cache(config.expression_cache_size),
            config,
            parser: None,
        }
    }

    /// Engine over a catalog holding only the standard library
    pub fn standard() -> Result<Self> {
        Ok(Self::new(Arc::new(FunctionCatalog::standard()?)))
    }

    /// Replace the configuration; the expression cache starts empty
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.cache = new_cache(config.expression_cache_size);
        self.config = config;
        self
    }

    /// Use another type provider for new contexts
    pub fn with_type_provider(mut self, type_provider: Arc<dyn TypeProvider>) -> Self {
        self.type_provider = type_provider;
        self
    }

    /// Attach the parser used by [`KelEngine::parse`]
    pub fn with_parser(mut self, parser: impl ExpressionParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Shared function catalog
    pub fn catalog(&self) -> &Arc<FunctionCatalog> {
        &self.catalog
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh evaluation context over `data`
    pub fn context(&self, data: Value) -> EvaluationContext {
        EvaluationContext::new(data, Arc::clone(&self.catalog))
            .with_type_provider(Arc::clone(&self.type_provider))
    }

    /// Evaluate a tree
    pub fn evaluate(&self, expression: &Expression, context: &EvaluationContext) -> Result<Value> {
        evaluator::evaluate(expression, context, &self.config.evaluation)
    }

    /// Parse source text in a static scope, reusing a cached tree when
    /// the same text was parsed in the same scope before.
    ///
    /// A cached tree is only reused while the catalog generation it was
    /// built against is current, so reloading the shared catalog through
    /// any handle forces a fresh parse.
    pub fn parse(&self, source: &str, scope: &Arc<Scope>) -> Result<Arc<Expression>> {
        let key: CacheKey = (source.to_string(), Arc::as_ptr(scope) as usize);
        let generation = self.catalog.generation();
        if let Some(cache) = &self.cache {
            let mut cache = cache.lock();
            let cached = cache
                .get(&key)
                .map(|cached| (cached.generation, Arc::clone(&cached.expression)));
            match cached {
                Some((built, expression)) if built == generation => return Ok(expression),
                Some(_) => {
                    log::trace!("dropping {source:?} parsed against an older catalog");
                    cache.pop(&key);
                }
                None => {}
            }
        }

        let parser = self.parser.as_ref().ok_or_else(|| KelError::Parse {
            expression: source.to_string(),
            messages: vec!["no expression parser configured".to_string()],
        })?;
        let expression = parser
            .build_ast(source, scope, &self.catalog)
            .map(Arc::new)
            .map_err(|errors| KelError::Parse {
                expression: source.to_string(),
                messages: errors.iter().map(ToString::to_string).collect(),
            })?;
        log::debug!("parsed {source:?} as {expression}");

        if let Some(cache) = &self.cache {
            cache.lock().put(
                key,
                CachedExpression {
                    _scope: Arc::clone(scope),
                    expression: Arc::clone(&expression),
                    generation,
                },
            );
        }
        Ok(expression)
    }

    /// Parse then evaluate
    pub fn evaluate_expression(
        &self,
        source: &str,
        scope: &Arc<Scope>,
        context: &EvaluationContext,
    ) -> Result<Value> {
        let expression = self.parse(source, scope)?;
        self.evaluate(&expression, context)
    }

    /// Assign `value` to the property at `property_path` on `target`
    pub fn evaluate_set_expression(
        &self,
        value: Value,
        property_path: &str,
        target: &Value,
    ) -> Result<()> {
        let context = self.context(target.clone());
        evaluator::evaluate_set_expression(
            value,
            property_path,
            target,
            &context,
            &self.config.evaluation,
        )
    }

    /// Call a function by name outside of any expression
    pub fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let context = self.context(Value::Null);
        let mut interpreter = Interpreter::new(&context, &self.config.evaluation);
        let target = self.config.evaluation.expression_target.as_deref();
        self.catalog.invoke(name, args, target, &mut interpreter)
    }

    /// Call a function by name with automatic iteration
    pub fn invoke_with_iteration(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let context = self.context(Value::Null);
        let mut interpreter = Interpreter::new(&context, &self.config.evaluation);
        let target = self.config.evaluation.expression_target.as_deref();
        self.catalog
            .invoke_with_iteration(name, args, target, &mut interpreter)
    }

    /// Rebuild the catalog from its libraries and drop cached trees, whose
    /// function types may be stale
    pub fn reload_catalog(&self) -> Result<()> {
        self.catalog.reload()?;
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
        Ok(())
    }

    /// Number of cached trees
    pub fn cached_expressions(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.lock().len())
    }
}

fn new_cache(size: usize) -> Option<Mutex<LruCache<CacheKey, CachedExpression>>> {
    NonZeroUsize::new(size).map(|size| Mutex::new(LruCache::new(size)))
}

impl fmt::Debug for KelEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KelEngine")
            .field("config", &self.config)
            .field("libraries", &self.catalog.libraries())
            .field("cached_expressions", &self.cached_expressions())
            .finish_non_exhaustive()
    }
}

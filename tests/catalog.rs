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

//! Function catalog behavior: libraries, targets and reloads

mod utils;

use kel_engine::registry::{FunctionRegistration, RuleFunctionLibrary};
use kel_engine::{
    CatalogError, EngineConfig, EvaluationConfig, ExpressionParser, FnNative, FunctionCatalog,
    FunctionLibrary, KelEngine, KelError, KelFunction, Scope, ScopeType, StaticLibrary, TypeInfo,
    Value,
};
use parking_lot::RwLock;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use utils::{TestParser, eval, init_logging, num, policy};

/// Interpreted function over the given parameters, parsed from source
fn kel_function(
    catalog: &FunctionCatalog,
    name: &str,
    parameters: &[&str],
    body: &str,
) -> KelFunction {
    let mut scope = Scope::new(ScopeType::VariablesMap, TypeInfo::Any);
    for parameter in parameters {
        scope = scope.with_symbol(*parameter, TypeInfo::Any);
    }
    let body = TestParser
        .build_ast(body, &scope.shared(), catalog)
        .expect("function body parses");
    KelFunction::new(
        name,
        parameters.iter().map(ToString::to_string).collect(),
        body,
    )
}

/// Native library whose content can be swapped between reloads
struct ReplaceableLibrary {
    functions: RwLock<Vec<FunctionRegistration>>,
}

impl ReplaceableLibrary {
    fn new(functions: Vec<FunctionRegistration>) -> Arc<Self> {
        Arc::new(Self {
            functions: RwLock::new(functions),
        })
    }

    fn replace(&self, functions: Vec<FunctionRegistration>) {
        *self.functions.write() = functions;
    }
}

impl FunctionLibrary for ReplaceableLibrary {
    fn name(&self) -> &str {
        "replaceable"
    }

    fn functions(&self) -> Vec<FunctionRegistration> {
        self.functions.read().clone()
    }
}

fn engine_with_rules(rules: &Arc<RuleFunctionLibrary>) -> KelEngine {
    init_logging();
    let catalog = FunctionCatalog::builder()
        .standard_library()
        .shared_library(rules.clone())
        .build()
        .unwrap();
    KelEngine::new(Arc::new(catalog)).with_parser(TestParser)
}

#[test]
fn test_interpreted_functions_are_callable_from_expressions() {
    let rules = Arc::new(RuleFunctionLibrary::new("rules"));
    let engine = engine_with_rules(&rules);
    rules.replace(vec![kel_function(
        engine.catalog(),
        "Discounted",
        &["amount", "rate"],
        "Round(amount * (1 - rate), 2)",
    )]);
    engine.reload_catalog().unwrap();

    let result = eval(&engine, "Discounted(policy.riskItems[2].value, 0.125)", policy()).unwrap();
    assert_eq!(result, num("700"));
}

#[test]
fn test_interpreted_function_cannot_see_caller_data() {
    let rules = Arc::new(RuleFunctionLibrary::new("rules"));
    let engine = engine_with_rules(&rules);
    rules.replace(vec![kel_function(
        engine.catalog(),
        "StateOf",
        &["x"],
        "policy.state",
    )]);
    engine.reload_catalog().unwrap();

    let err = eval(&engine, "StateOf(1)", policy()).unwrap_err();
    assert_eq!(
        err,
        KelError::UnresolvedReference {
            name: "policy".to_string()
        }
    );
}

#[test]
fn test_reload_replaces_content_and_clears_parsed_trees() {
    let rules = Arc::new(RuleFunctionLibrary::new("rules"));
    let engine = engine_with_rules(&rules);
    rules.replace(vec![kel_function(engine.catalog(), "Factor", &[], "2")]);
    engine.reload_catalog().unwrap();
    assert_eq!(eval(&engine, "Factor() * 10", policy()).unwrap(), num("20"));
    assert_eq!(engine.cached_expressions(), 1);

    rules.replace(vec![kel_function(engine.catalog(), "Factor", &[], "3")]);
    engine.reload_catalog().unwrap();
    assert_eq!(engine.cached_expressions(), 0);
    assert_eq!(eval(&engine, "Factor() * 10", policy()).unwrap(), num("30"));

    rules.replace(Vec::new());
    engine.reload_catalog().unwrap();
    let err = eval(&engine, "Factor()", policy()).unwrap_err();
    assert!(matches!(err, KelError::Parse { .. }), "{err}");
}

#[test]
fn test_reload_through_shared_catalog_refreshes_parsed_trees() {
    let rules = Arc::new(RuleFunctionLibrary::new("rules"));
    let engine = engine_with_rules(&rules);
    let other = KelEngine::new(Arc::clone(engine.catalog())).with_parser(TestParser);
    rules.replace(vec![kel_function(engine.catalog(), "Factor", &[], "2")]);
    engine.reload_catalog().unwrap();
    let scope = Scope::root();
    let first = engine.parse("Factor()", &scope).unwrap();
    assert_eq!(eval(&engine, "Factor()", policy()).unwrap(), num("2"));

    let generation = engine.catalog().generation();
    rules.replace(vec![kel_function(engine.catalog(), "Factor", &[], "3")]);
    other.reload_catalog().unwrap();
    assert_eq!(engine.catalog().generation(), generation + 1);

    let second = engine.parse("Factor()", &scope).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(eval(&engine, "Factor()", policy()).unwrap(), num("3"));

    rules.replace(Vec::new());
    engine.catalog().reload().unwrap();
    let err = eval(&engine, "Factor()", policy()).unwrap_err();
    assert!(matches!(err, KelError::Parse { .. }), "{err}");
}

#[test]
fn test_reload_drops_stale_target_overlay() {
    let rating = ReplaceableLibrary::new(vec![
        FnNative::builder("BaseRate")
            .target("rating")
            .returns(TypeInfo::Number)
            .body(|_, _| Ok(Value::from(120)))
            .into(),
    ]);
    let catalog = FunctionCatalog::builder()
        .standard_library()
        .shared_library(rating.clone())
        .build()
        .unwrap();
    assert!(catalog.contains("BaseRate", 0, Some("rating")));
    assert!(!catalog.contains("BaseRate", 0, None));

    rating.replace(Vec::new());
    catalog.reload().unwrap();
    assert!(!catalog.contains("BaseRate", 0, Some("rating")));
    assert!(catalog.contains("Abs", 1, Some("rating")));
    assert!(catalog.contains("Abs", 1, None));
}

#[test]
fn test_interpreted_function_shadows_native() {
    let rules = Arc::new(RuleFunctionLibrary::new("rules"));
    let engine = engine_with_rules(&rules);
    rules.replace(vec![kel_function(engine.catalog(), "Abs", &["x"], "x")]);
    engine.reload_catalog().unwrap();
    assert_eq!(engine.invoke("Abs", vec![Value::from(-4)]).unwrap(), Value::from(-4));
}

#[test]
fn test_failed_reload_keeps_previous_state() {
    let rules = Arc::new(RuleFunctionLibrary::new("rules"));
    let engine = engine_with_rules(&rules);
    rules.replace(vec![kel_function(engine.catalog(), "One", &[], "1")]);
    engine.reload_catalog().unwrap();

    rules.replace(vec![
        kel_function(engine.catalog(), "Two", &["a"], "a"),
        kel_function(engine.catalog(), "Two", &["b"], "b"),
    ]);
    let err = engine.reload_catalog().unwrap_err();
    assert!(
        matches!(err, KelError::Catalog(CatalogError::DuplicateFunction { .. })),
        "{err}"
    );
    assert!(engine.catalog().contains("One", 0, None));
    assert!(!engine.catalog().contains("Two", 1, None));
}

#[test]
fn test_duplicate_native_header_fails_build() {
    let round = FnNative::builder("Round")
        .param("x", TypeInfo::Number)
        .returns(TypeInfo::Number)
        .body(|args, _| Ok(args[0].clone()));
    let result = FunctionCatalog::builder()
        .standard_library()
        .library(StaticLibrary::new("custom", vec![round.into()]))
        .build();
    let Err(KelError::Catalog(CatalogError::DuplicateFunction { header, .. })) = result else {
        panic!("expected a duplicate function error");
    };
    assert_eq!(header, "Round/1");
}

#[test]
fn test_targeted_functions_need_matching_expression_target() {
    let rating = FnNative::builder("BaseRate")
        .target("rating")
        .returns(TypeInfo::Number)
        .body(|_, _| Ok(Value::from(120)));
    let catalog = FunctionCatalog::builder()
        .standard_library()
        .library(StaticLibrary::new("rating", vec![rating.into()]))
        .build()
        .unwrap();
    let catalog = Arc::new(catalog);

    let untargeted = KelEngine::new(Arc::clone(&catalog));
    let err = untargeted.invoke("BaseRate", Vec::new()).unwrap_err();
    assert!(matches!(err, KelError::FunctionNotFound { .. }), "{err}");

    let targeted = KelEngine::new(catalog).with_config(EngineConfig {
        evaluation: EvaluationConfig::default().with_expression_target("rating"),
        ..EngineConfig::default()
    });
    assert_eq!(targeted.invoke("BaseRate", Vec::new()).unwrap(), Value::from(120));
    assert_eq!(
        targeted.invoke("Abs", vec![Value::from(-2)]).unwrap(),
        Value::from(2)
    );
}

#[test]
fn test_invoke_with_iteration() {
    let engine = utils::engine();
    let names = Value::collection(vec![Value::from("a"), Value::from("b")]);
    assert_eq!(
        engine.invoke_with_iteration("Upper", vec![names]).unwrap(),
        Value::collection(vec![Value::from("A"), Value::from("B")])
    );
}

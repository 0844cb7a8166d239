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

//! Concurrent evaluation while the catalog is reloaded

mod utils;

use kel_engine::registry::RuleFunctionLibrary;
use kel_engine::{
    ExpressionParser, FunctionCatalog, KelEngine, KelFunction, Scope, ScopeType, TypeInfo, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use utils::{TestParser, eval, init_logging, num, policy};

fn surcharge(catalog: &FunctionCatalog, factor: &str) -> KelFunction {
    let scope = Scope::new(ScopeType::VariablesMap, TypeInfo::Any)
        .with_symbol("value", TypeInfo::Number)
        .shared();
    let body = TestParser
        .build_ast(&format!("value * {factor}"), &scope, catalog)
        .expect("surcharge body parses");
    KelFunction::new("Surcharge", vec!["value".to_string()], body)
}

#[test]
fn test_evaluation_during_reloads() {
    init_logging();
    let rules = Arc::new(RuleFunctionLibrary::new("rules"));
    let catalog = FunctionCatalog::builder()
        .standard_library()
        .shared_library(rules.clone())
        .build()
        .unwrap();
    let engine = KelEngine::new(Arc::new(catalog)).with_parser(TestParser);
    rules.replace(vec![surcharge(engine.catalog(), "2")]);
    engine.reload_catalog().unwrap();

    let allowed = [num("1600"), num("2400")];
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    for _ in 0..200 {
                        let result: Value =
                            eval(&engine, "Surcharge(policy.riskItems[2].value)", policy())
                                .expect("evaluation succeeds during reload");
                        assert!(allowed.contains(&result), "unexpected {result}");
                    }
                })
            })
            .collect();

        s.spawn(|| {
            let mut round = 0;
            while !done.load(Ordering::Acquire) {
                let factor = if round % 2 == 0 { "3" } else { "2" };
                rules.replace(vec![surcharge(engine.catalog(), factor)]);
                engine.reload_catalog().expect("reload succeeds");
                round += 1;
                thread::yield_now();
            }
        });

        for worker in workers {
            worker.join().expect("worker thread");
        }
        done.store(true, Ordering::Release);
    });
}

#[test]
fn test_engine_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<KelEngine>();
    assert_send_sync::<FunctionCatalog>();
}

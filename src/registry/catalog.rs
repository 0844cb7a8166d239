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

//! Function catalog: header to definition map with expression-target overlays
//!
//! Interpreted functions are looked up first and are never target scoped.
//! Native functions without a target are visible everywhere; target-scoped
//! natives are visible only through the overlay of their target, which is the
//! untargeted set plus the target's own functions.
//!
//! The catalog state is rebuilt from scratch on every reload and swapped in
//! under a write lock, so readers see either the old or the new state.

use super::function::{FunctionDefinition, KelFunction, NativeFunction};
use super::functions::StandardLibrary;
use super::library::{FunctionLibrary, FunctionRegistration};
use super::signature::{FunctionHeader, FunctionSignature};
use crate::error::{CatalogError, KelError, Result};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type NativeMap = FxHashMap<FunctionHeader, Arc<dyn NativeFunction>>;

#[derive(Default)]
struct CatalogState {
    kel: FxHashMap<FunctionHeader, Arc<KelFunction>>,
    natives: NativeMap,
    overlays: FxHashMap<String, NativeMap>,
}

/// Counts describing the current catalog state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Interpreted functions
    pub kel_functions: usize,
    /// Native functions visible without a target
    pub native_functions: usize,
    /// Native functions per target overlay, including untargeted ones
    pub target_functions: Vec<(String, usize)>,
}

/// Holds all callable functions and dispatches calls to them
pub struct FunctionCatalog {
    libraries: RwLock<Vec<Arc<dyn FunctionLibrary>>>,
    state: RwLock<CatalogState>,
    reload_lock: Mutex<()>,
    generation: AtomicU64,
}

/// Builder collecting libraries before the first catalog build
#[derive(Default)]
pub struct FunctionCatalogBuilder {
    libraries: Vec<Arc<dyn FunctionLibrary>>,
}

impl FunctionCatalogBuilder {
    /// Add a library
    pub fn library(mut self, library: impl FunctionLibrary + 'static) -> Self {
        self.libraries.push(Arc::new(library));
        self
    }

    /// Add a shared library, keeping a handle for later content changes
    pub fn shared_library(mut self, library: Arc<dyn FunctionLibrary>) -> Self {
        self.libraries.push(library);
        self
    }

    /// Add the standard function library
    pub fn standard_library(self) -> Self {
        self.library(StandardLibrary)
    }

    /// Harvest all libraries and build the catalog
    pub fn build(self) -> Result<FunctionCatalog> {
        let state = build_state(&self.libraries)?;
        log_state("built", &state);
        Ok(FunctionCatalog {
            libraries: RwLock::new(self.libraries),
            state: RwLock::new(state),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }
}

impl FunctionCatalog {
    /// Start building a catalog
    pub fn builder() -> FunctionCatalogBuilder {
        FunctionCatalogBuilder::default()
    }

    /// Catalog containing only the standard library
    pub fn standard() -> Result<Self> {
        Self::builder().standard_library().build()
    }

    /// Discard all registrations and re-harvest every library.
    ///
    /// On failure the previous state stays in effect.
    pub fn reload(&self) -> Result<()> {
        let _guard = self.reload_lock.lock();
        let libraries = self.libraries.read().clone();
        let state = build_state(&libraries)?;
        log_state("reloaded", &state);
        *self.state.write() = state;
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Register an additional library and reload
    pub fn add_library(&self, library: Arc<dyn FunctionLibrary>) -> Result<()> {
        let _guard = self.reload_lock.lock();
        let mut libraries = self.libraries.read().clone();
        libraries.push(library);
        let state = build_state(&libraries)?;
        log_state("reloaded", &state);
        *self.libraries.write() = libraries;
        *self.state.write() = state;
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Number of successful reloads since the catalog was built.
    ///
    /// Trees built against an older generation may hold stale function
    /// references.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Names of registered libraries
    pub fn libraries(&self) -> Vec<String> {
        self.libraries
            .read()
            .iter()
            .map(|l| l.name().to_string())
            .collect()
    }

    /// Resolve a call by name and arity for an optional expression target
    pub fn resolve(
        &self,
        name: &str,
        arity: usize,
        target: Option<&str>,
    ) -> Result<FunctionDefinition> {
        let header = FunctionHeader::new(name, arity);
        let state = self.state.read();
        if let Some(kel) = state.kel.get(&header) {
            return Ok(FunctionDefinition::Kel(Arc::clone(kel)));
        }
        if let Some(native) = state.visible_natives(target).get(&header) {
            return Ok(FunctionDefinition::Native(Arc::clone(native)));
        }
        log::debug!("Function {header} not found for target {target:?}");
        Err(KelError::FunctionNotFound {
            name: name.to_string(),
            arity,
        })
    }

    /// Check whether a call would resolve
    pub fn contains(&self, name: &str, arity: usize, target: Option<&str>) -> bool {
        self.resolve(name, arity, target).is_ok()
    }

    /// Signature of a visible native function
    pub fn signature(
        &self,
        header: &FunctionHeader,
        target: Option<&str>,
    ) -> Option<FunctionSignature> {
        self.state
            .read()
            .visible_natives(target)
            .get(header)
            .map(|f| f.signature().clone())
    }

    /// Headers of every function visible for a target, sorted
    pub fn function_headers(&self, target: Option<&str>) -> Vec<FunctionHeader> {
        let state = self.state.read();
        let headers: BTreeSet<FunctionHeader> = state
            .kel
            .keys()
            .chain(state.visible_natives(target).keys())
            .cloned()
            .collect();
        headers.into_iter().collect()
    }

    /// Current counts
    pub fn stats(&self) -> CatalogStats {
        let state = self.state.read();
        state.stats()
    }
}

impl CatalogState {
    fn visible_natives(&self, target: Option<&str>) -> &NativeMap {
        target
            .and_then(|t| self.overlays.get(t))
            .unwrap_or(&self.natives)
    }

    fn stats(&self) -> CatalogStats {
        let mut target_functions: Vec<(String, usize)> = self
            .overlays
            .iter()
            .map(|(target, overlay)| (target.clone(), overlay.len()))
            .collect();
        target_functions.sort();
        CatalogStats {
            kel_functions: self.kel.len(),
            native_functions: self.natives.len(),
            target_functions,
        }
    }
}

fn build_state(libraries: &[Arc<dyn FunctionLibrary>]) -> Result<CatalogState> {
    let mut state = CatalogState::default();
    let mut native_sources: FxHashMap<FunctionHeader, String> = FxHashMap::default();
    let mut kel_sources: FxHashMap<FunctionHeader, String> = FxHashMap::default();
    let mut scoped: FxHashMap<String, NativeMap> = FxHashMap::default();

    for library in libraries {
        for registration in library.functions() {
            let source = format!("{}::{}", library.name(), registration.name());
            match registration {
                FunctionRegistration::Native(function) => {
                    let signature = function.signature();
                    signature.validate()?;
                    let header = signature.header();
                    if let Some(first) = native_sources.get(&header) {
                        return Err(duplicate(&header, first, &source));
                    }
                    native_sources.insert(header.clone(), source);
                    if signature.targets.is_empty() {
                        state.natives.insert(header, function);
                    } else {
                        for target in &signature.targets {
                            scoped
                                .entry(target.clone())
                                .or_default()
                                .insert(header.clone(), Arc::clone(&function));
                        }
                    }
                }
                FunctionRegistration::Kel(function) => {
                    validate_kel(&function)?;
                    let header = function.header();
                    if let Some(first) = kel_sources.get(&header) {
                        return Err(duplicate(&header, first, &source));
                    }
                    kel_sources.insert(header.clone(), source);
                    state.kel.insert(header, function);
                }
            }
        }
    }

    // every overlay is a superset of the untargeted natives
    for (target, functions) in scoped {
        let mut overlay = state.natives.clone();
        overlay.extend(functions);
        state.overlays.insert(target, overlay);
    }
    Ok(state)
}

fn validate_kel(function: &KelFunction) -> Result<()> {
    let parameters = function.parameters();
    for (i, parameter) in parameters.iter().enumerate() {
        if parameters[..i].contains(parameter) {
            return Err(CatalogError::UnsupportedSignature {
                function: function.name().to_string(),
                message: format!("parameter '{parameter}' is declared more than once"),
            }
            .into());
        }
    }
    Ok(())
}

fn duplicate(header: &FunctionHeader, first: &str, second: &str) -> KelError {
    CatalogError::DuplicateFunction {
        header: header.to_string(),
        first: first.to_string(),
        second: second.to_string(),
    }
    .into()
}

fn log_state(action: &str, state: &CatalogState) {
    let stats = state.stats();
    log::info!(
        "Function catalog {action}: {} native, {} interpreted, {} target overlay(s)",
        stats.native_functions,
        stats.kel_functions,
        stats.target_functions.len()
    );
}

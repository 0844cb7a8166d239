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

//! Function libraries harvested by the catalog at build and reload time

use super::function::{KelFunction, NativeFunction};
use parking_lot::RwLock;
use std::sync::Arc;

/// One function offered by a library
#[derive(Clone)]
pub enum FunctionRegistration {
    /// Host-native function
    Native(Arc<dyn NativeFunction>),
    /// Interpreted function
    Kel(Arc<KelFunction>),
}

impl FunctionRegistration {
    /// Registered function name
    pub fn name(&self) -> &str {
        match self {
            FunctionRegistration::Native(f) => f.name(),
            FunctionRegistration::Kel(f) => f.name(),
        }
    }
}

impl From<Arc<dyn NativeFunction>> for FunctionRegistration {
    fn from(function: Arc<dyn NativeFunction>) -> Self {
        FunctionRegistration::Native(function)
    }
}

impl From<KelFunction> for FunctionRegistration {
    fn from(function: KelFunction) -> Self {
        FunctionRegistration::Kel(Arc::new(function))
    }
}

/// A named set of functions.
///
/// The catalog calls [`FunctionLibrary::functions`] on every build and reload,
/// so a library may return different content over time.
pub trait FunctionLibrary: Send + Sync {
    /// Library name, used in duplicate-definition errors
    fn name(&self) -> &str;

    /// Functions currently offered
    fn functions(&self) -> Vec<FunctionRegistration>;
}

/// Library with a fixed list of functions
pub struct StaticLibrary {
    name: String,
    functions: Vec<FunctionRegistration>,
}

impl StaticLibrary {
    /// Create a library from registrations
    pub fn new(name: impl Into<String>, functions: Vec<FunctionRegistration>) -> Self {
        Self {
            name: name.into(),
            functions,
        }
    }
}

impl FunctionLibrary for StaticLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn functions(&self) -> Vec<FunctionRegistration> {
        self.functions.clone()
    }
}

/// Library of interpreted functions whose content can be replaced, e.g. when
/// rule content is hot-reloaded
pub struct RuleFunctionLibrary {
    name: String,
    functions: RwLock<Vec<Arc<KelFunction>>>,
}

impl RuleFunctionLibrary {
    /// Create an empty library
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: RwLock::new(Vec::new()),
        }
    }

    /// Replace the offered functions; takes effect on the next catalog reload
    pub fn replace(&self, functions: Vec<KelFunction>) {
        *self.functions.write() = functions.into_iter().map(Arc::new).collect();
    }
}

impl FunctionLibrary for RuleFunctionLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn functions(&self) -> Vec<FunctionRegistration> {
        self.functions
            .read()
            .iter()
            .cloned()
            .map(FunctionRegistration::Kel)
            .collect()
    }
}

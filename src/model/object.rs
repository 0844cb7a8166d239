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

//! Domain object capability and the two stock adapters
//!
//! The interpreter reads and writes domain data only through [`DataObject`];
//! hosts wrap their own structures by implementing it.

use super::coerce::coerce_value;
use super::types::TypeInfo;
use super::value::Value;
use crate::error::{KelError, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;

/// Property access capability of a domain object
pub trait DataObject: fmt::Debug + Send + Sync {
    /// Name of the domain type
    fn type_name(&self) -> &str;

    /// Read a property; `None` when the object has no such property
    fn get(&self, name: &str) -> Option<Value>;

    /// Check whether the object carries a property
    fn has_property(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Declared type of a property, if the object knows it
    fn property_type(&self, _name: &str) -> Option<TypeInfo> {
        None
    }

    /// Write a property
    fn set(&self, name: &str, value: Value) -> Result<()>;

    /// Names of all properties, in declaration order
    fn property_names(&self) -> Vec<String>;
}

/// Mutable string-keyed map; every key is settable
pub struct MapObject {
    type_name: String,
    entries: RwLock<IndexMap<String, Value>>,
}

impl MapObject {
    /// Create an empty map object
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            entries: RwLock::new(IndexMap::new()),
        }
    }

    /// Add an entry
    pub fn with_entry(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.write().insert(name.into(), value.into());
        self
    }

    /// Snapshot of the current entries
    pub fn entries(&self) -> IndexMap<String, Value> {
        self.entries.read().clone()
    }
}

impl DataObject for MapObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.entries.read().get(name).cloned()
    }

    fn has_property(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    fn property_type(&self, name: &str) -> Option<TypeInfo> {
        self.entries.read().get(name).map(TypeInfo::of)
    }

    fn set(&self, name: &str, value: Value) -> Result<()> {
        self.entries.write().insert(name.to_string(), value);
        Ok(())
    }

    fn property_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl fmt::Debug for MapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapObject")
            .field("type_name", &self.type_name)
            .field("entries", &*self.entries.read())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct PropertyDefinition {
    property_type: TypeInfo,
    read_only: bool,
}

/// Structured object with declared, typed properties.
///
/// Undeclared properties do not exist; writes coerce to the declared type.
pub struct Record {
    type_name: String,
    definitions: IndexMap<String, PropertyDefinition>,
    values: RwLock<IndexMap<String, Value>>,
}

impl Record {
    /// Create a record of the given domain type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            definitions: IndexMap::new(),
            values: RwLock::new(IndexMap::new()),
        }
    }

    /// Declare a writable property with an initial value
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        property_type: TypeInfo,
        value: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        self.definitions.insert(
            name.clone(),
            PropertyDefinition {
                property_type,
                read_only: false,
            },
        );
        self.values.write().insert(name, value.into());
        self
    }

    /// Declare a property that cannot be written
    pub fn with_read_only(
        mut self,
        name: impl Into<String>,
        property_type: TypeInfo,
        value: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        self.definitions.insert(
            name.clone(),
            PropertyDefinition {
                property_type,
                read_only: true,
            },
        );
        self.values.write().insert(name, value.into());
        self
    }
}

impl DataObject for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn get(&self, name: &str) -> Option<Value> {
        if !self.definitions.contains_key(name) {
            return None;
        }
        Some(self.values.read().get(name).cloned().unwrap_or_default())
    }

    fn has_property(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn property_type(&self, name: &str) -> Option<TypeInfo> {
        self.definitions.get(name).map(|d| d.property_type.clone())
    }

    fn set(&self, name: &str, value: Value) -> Result<()> {
        let definition = match self.definitions.get(name) {
            Some(d) if !d.read_only => d,
            _ => {
                return Err(KelError::NotSettable {
                    property: name.to_string(),
                    type_name: self.type_name.clone(),
                });
            }
        };
        let coerced = coerce_value(value.clone(), &definition.property_type).ok_or_else(|| {
            KelError::type_mismatch(
                definition.property_type.to_string(),
                value.type_name(),
                format!("assignment to {}.{name}", self.type_name),
            )
        })?;
        self.values.write().insert(name.to_string(), coerced);
        Ok(())
    }

    fn property_names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type_name", &self.type_name)
            .field("values", &*self.values.read())
            .finish()
    }
}

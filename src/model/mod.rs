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

//! Value model: runtime values, static types and domain object adapters

pub mod arithmetic;
pub mod coerce;
pub mod compare;
mod json;
pub mod money;
pub mod object;
pub mod types;
pub mod value;

pub use coerce::coerce_value;
pub use money::Money;
pub use object::{DataObject, MapObject, Record};
pub use types::TypeInfo;
pub use value::{Collection, ObjectRef, Value};

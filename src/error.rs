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

//! Error types for KEL evaluation
//!
//! Build-time failures (catalog construction, AST node construction) have their
//! own enums and convert into [`KelError`], which is what every public
//! operation returns.

use thiserror::Error;

/// Result type alias for KEL operations
pub type Result<T> = std::result::Result<T, KelError>;

/// Fatal errors raised while building or reloading a function catalog
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Two definitions share the same name and parameter count
    #[error("Function {header} is defined more than once: in '{first}' and in '{second}'")]
    DuplicateFunction {
        /// Header of the conflicting functions, as `Name/arity`
        header: String,
        /// Source of the definition registered first
        first: String,
        /// Source of the conflicting definition
        second: String,
    },

    /// A generic type parameter is declared twice on one function
    #[error("Function '{function}' declares generic type '{generic}' more than once")]
    DuplicateGeneric {
        /// Function name
        function: String,
        /// Generic parameter name
        generic: String,
    },

    /// A parameter or return type refers to a generic that was never declared
    #[error("Function '{function}' uses generic type '{generic}' which is not declared")]
    UndeclaredGeneric {
        /// Function name
        function: String,
        /// Generic parameter name
        generic: String,
    },

    /// Parameter or return shape the catalog cannot dispatch
    #[error("Function '{function}' has an unsupported signature: {message}")]
    UnsupportedSignature {
        /// Function name
        function: String,
        /// What is wrong with the signature
        message: String,
    },
}

/// Errors raised while constructing AST nodes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AstError {
    /// Evaluation type of a node would be an unresolved generic
    #[error("Expression '{expression}' has unresolved generic evaluation type '{type_name}'")]
    UnresolvedGenericType {
        /// Textual form of the offending node
        expression: String,
        /// The generic type that leaked into the node
        type_name: String,
    },

    /// Structurally invalid node
    #[error("Invalid expression: {message}")]
    InvalidExpression {
        /// Human-readable message
        message: String,
    },
}

/// Comprehensive error type for KEL operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KelError {
    /// Catalog build or reload failure
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// AST construction failure
    #[error(transparent)]
    Ast(#[from] AstError),

    /// Source text could not be turned into an expression tree
    #[error("Cannot parse expression '{expression}': {}", messages.join("; "))]
    Parse {
        /// Source text handed to the parser
        expression: String,
        /// Diagnostics reported by the parser
        messages: Vec<String>,
    },

    /// No function is registered for the called name and arity
    #[error("Function {name} with {arity} parameter(s) does not exist")]
    FunctionNotFound {
        /// Called function name
        name: String,
        /// Number of supplied arguments
        arity: usize,
    },

    /// Null passed to a parameter that does not accept null
    #[error("Function '{function}' parameter {index} does not accept null")]
    NullArgument {
        /// Function name
        function: String,
        /// Zero-based parameter index
        index: usize,
    },

    /// Argument is neither assignable nor coercible to the parameter type
    #[error("Function '{function}' parameter {index} expects {expected}, got {actual}")]
    ArgumentType {
        /// Function name
        function: String,
        /// Zero-based parameter index
        index: usize,
        /// Declared parameter type
        expected: String,
        /// Runtime type of the argument
        actual: String,
    },

    /// Identifier not found in any frame
    #[error("Reference '{name}' cannot be resolved")]
    UnresolvedReference {
        /// Identifier name
        name: String,
    },

    /// Property missing on a navigated object
    #[error("Property '{property}' does not exist on {type_name}")]
    PropertyNotFound {
        /// Property name
        property: String,
        /// Type of the navigated object
        type_name: String,
    },

    /// Index out of bounds
    #[error("Index out of bounds: {index} for collection of size {size}")]
    IndexOutOfBounds {
        /// The index that was out of bounds
        index: i64,
        /// The size of the collection
        size: usize,
    },

    /// Operand pairing that an operator cannot compare
    #[error("Operator '{operator}' cannot compare {left} with {right}")]
    NotComparable {
        /// Operator symbol
        operator: String,
        /// Type of the left operand
        left: String,
        /// Type of the right operand
        right: String,
    },

    /// Operand or value of an unexpected type
    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual type
        actual: String,
        /// Where the mismatch happened
        context: String,
    },

    /// `this` used outside any frame that can provide it
    #[error("'this' is not available in the current scope")]
    ThisNotAvailable,

    /// Division by zero, overflow and similar
    #[error("Arithmetic error: {message}")]
    Arithmetic {
        /// Human-readable message
        message: String,
    },

    /// Pattern of the match operator does not compile
    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// The pattern
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Property cannot be written
    #[error("Property '{property}' is not settable on {type_name}")]
    NotSettable {
        /// Property name
        property: String,
        /// Type of the target object
        type_name: String,
    },

    /// Conversion between host data and runtime values failed
    #[error("Conversion error: {message}")]
    Conversion {
        /// Human-readable message
        message: String,
    },

    /// A native function body failed with an unrecognized error
    #[error("Function '{function}' failed: {message}")]
    FunctionFailure {
        /// Function name
        function: String,
        /// Message of the underlying failure
        message: String,
    },
}

impl KelError {
    /// True for errors raised once at catalog build or reload time
    pub fn is_catalog_error(&self) -> bool {
        matches!(self, KelError::Catalog(_))
    }

    /// True for errors raised while walking an expression tree, including
    /// call resolution and argument validation
    pub fn is_evaluation_error(&self) -> bool {
        !matches!(
            self,
            KelError::Catalog(_) | KelError::Ast(_) | KelError::Parse { .. }
        )
    }

    pub(crate) fn type_mismatch(
        expected: impl Into<String>,
        actual: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        KelError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
            context: context.into(),
        }
    }

    pub(crate) fn arithmetic(message: impl Into<String>) -> Self {
        KelError::Arithmetic {
            message: message.into(),
        }
    }
}

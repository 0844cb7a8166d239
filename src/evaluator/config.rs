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

//! Evaluation configuration

use serde::{Deserialize, Serialize};

/// How operators treat operands of an unexpected kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Logical operators and comparisons require operands of the expected
    /// type and fail otherwise
    Strict,
    /// Null and non-boolean values count as false, mismatched equality is
    /// false, null in arithmetic propagates
    #[default]
    Coercing,
}

/// Per-evaluation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Operand handling policy
    pub mode: EvaluationMode,
    /// Fan function calls out over collection arguments
    pub automatic_iteration: bool,
    /// Expression target selecting target-scoped native functions
    pub expression_target: Option<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::Coercing,
            automatic_iteration: true,
            expression_target: None,
        }
    }
}

impl EvaluationConfig {
    /// Strict configuration with automatic iteration enabled
    pub fn strict() -> Self {
        Self::default().with_mode(EvaluationMode::Strict)
    }

    /// Set the operand handling policy
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable automatic iteration
    pub fn with_automatic_iteration(mut self, enabled: bool) -> Self {
        self.automatic_iteration = enabled;
        self
    }

    /// Select an expression target
    pub fn with_expression_target(mut self, target: impl Into<String>) -> Self {
        self.expression_target = Some(target.into());
        self
    }

    /// Check for strict mode
    pub fn is_strict(&self) -> bool {
        self.mode == EvaluationMode::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvaluationConfig::default();
        assert_eq!(config.mode, EvaluationMode::Coercing);
        assert!(config.automatic_iteration);
        assert!(config.expression_target.is_none());
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: EvaluationConfig =
            serde_json::from_str(r#"{"mode": "strict", "expression_target": "Validation"}"#)
                .unwrap();
        assert!(config.is_strict());
        assert!(config.automatic_iteration);
        assert_eq!(config.expression_target.as_deref(), Some("Validation"));
    }
}

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

//! Textual reconstruction of expression trees
//!
//! The output depends only on node kinds and children, so two trees built
//! from the same source and scope print identically. Binary operations are
//! fully parenthesized.

use super::expression::{Expression, ExpressionKind, TemplatePart};
use std::fmt;

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExpressionKind::Null => write!(f, "null"),
            ExpressionKind::Boolean(b) => write!(f, "{b}"),
            ExpressionKind::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            ExpressionKind::Number(n) => write!(f, "{}", n.normalize()),
            ExpressionKind::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            ExpressionKind::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            ExpressionKind::Identifier(name) => write!(f, "{name}"),
            ExpressionKind::This => write!(f, "this"),
            ExpressionKind::Path(path) => {
                let separator = if path.null_safe { "?." } else { "." };
                write!(f, "{}{separator}{}", path.object, path.property)
            }
            ExpressionKind::AccessByIndex(access) => {
                write!(f, "{}[{}]", access.collection, access.index)
            }
            ExpressionKind::CollectionFilter(filter) => match &filter.predicate {
                Some(predicate) => write!(f, "{}[{predicate}]", filter.collection),
                None => write!(f, "{}[*]", filter.collection),
            },
            ExpressionKind::ForEach(data) => write!(
                f,
                "for {} in {} return {}",
                data.variable, data.collection, data.body
            ),
            ExpressionKind::ForSome(data) => write!(
                f,
                "some {} in {} satisfies {}",
                data.variable, data.collection, data.body
            ),
            ExpressionKind::ForEvery(data) => write!(
                f,
                "every {} in {} satisfies {}",
                data.variable, data.collection, data.body
            ),
            ExpressionKind::If(data) => {
                write!(f, "if {} then {}", data.condition, data.then_branch)?;
                if let Some(otherwise) = &data.else_branch {
                    write!(f, " else {otherwise}")?;
                }
                Ok(())
            }
            ExpressionKind::Binary(data) => {
                write!(f, "({} {} {})", data.left, data.operator, data.right)
            }
            ExpressionKind::Unary(data) => write!(f, "{}{}", data.operator, data.operand),
            ExpressionKind::Cast(data) => write!(f, "(({}) {})", data.target, data.expression),
            ExpressionKind::InstanceOf(data) => {
                write!(f, "({} instanceof {})", data.expression, data.target)
            }
            ExpressionKind::TypeOf(data) => {
                write!(f, "({} typeof {})", data.expression, data.target)
            }
            ExpressionKind::Function(call) => {
                write!(f, "{}(", call.name)?;
                write_separated(f, call.arguments.iter())?;
                write!(f, ")")
            }
            ExpressionKind::InlineArray(items) => {
                write!(f, "{{")?;
                write_separated(f, items.iter())?;
                write!(f, "}}")
            }
            ExpressionKind::InlineMap(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            ExpressionKind::Template(parts) => {
                write!(f, "`")?;
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => write!(f, "{text}")?,
                        TemplatePart::Expression(e) => write!(f, "${{{e}}}")?,
                    }
                }
                write!(f, "`")
            }
            ExpressionKind::ValueBlock(block) => {
                write!(f, "{{ ")?;
                for (name, value) in &block.bindings {
                    write!(f, "set {name} to {value} ")?;
                }
                write!(f, "return {} }}", block.result)
            }
        }
    }
}

fn write_separated<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Expression>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

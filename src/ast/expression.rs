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

//! Typed, immutable expression tree
//!
//! Every node carries its kind, a statically resolved evaluation type, the
//! source token it was built from and the static scope it was built in.
//! Constructors compute evaluation types from already typed children; nodes
//! whose type is supplied by the builder reject unresolved generic types.

use super::operator::{BinaryOperator, UnaryOperator};
use super::scope::Scope;
use super::span::Token;
use crate::error::{AstError, Result};
use crate::model::TypeInfo;
use crate::registry::FunctionCatalog;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Argument list of a function call node
pub type Arguments = SmallVec<[Expression; 4]>;

/// A node of the expression tree
#[derive(Debug, Clone)]
pub struct Expression {
    kind: ExpressionKind,
    eval_type: TypeInfo,
    token: Token,
    scope: Arc<Scope>,
}

/// The closed set of node kinds
#[derive(Debug, Clone)]
pub enum ExpressionKind {
    /// `null`
    Null,
    /// Boolean literal
    Boolean(bool),
    /// String literal
    String(Arc<str>),
    /// Number literal
    Number(Decimal),
    /// Date literal
    Date(NaiveDate),
    /// DateTime literal
    DateTime(DateTime<Utc>),
    /// Reference by name, possibly dotted (`policy.state`)
    Identifier(String),
    /// `this`
    This,
    /// `object.property` or `object?.property`
    Path(Box<PathData>),
    /// `collection[index]`
    AccessByIndex(Box<AccessByIndexData>),
    /// `collection[predicate]`, or `collection[*]` without a predicate
    CollectionFilter(Box<CollectionFilterData>),
    /// `for v in collection return body`
    ForEach(Box<IterationData>),
    /// `some v in collection satisfies body`
    ForSome(Box<IterationData>),
    /// `every v in collection satisfies body`
    ForEvery(Box<IterationData>),
    /// `if condition then a else b`
    If(Box<IfData>),
    /// Binary operation
    Binary(Box<BinaryData>),
    /// Unary operation
    Unary(Box<UnaryData>),
    /// `(Type) expression`
    Cast(Box<TypeOperationData>),
    /// `expression instanceof Type`
    InstanceOf(Box<TypeOperationData>),
    /// `expression typeof Type`
    TypeOf(Box<TypeOperationData>),
    /// Function call by name with positional arguments
    Function(Box<FunctionCallData>),
    /// `{a, b, c}`
    InlineArray(Vec<Expression>),
    /// `{key: value, ...}`
    InlineMap(Vec<(String, Expression)>),
    /// String interpolation
    Template(Vec<TemplatePart>),
    /// Local variable bindings followed by a result expression
    ValueBlock(Box<ValueBlockData>),
}

/// Path navigation data
#[derive(Debug, Clone)]
pub struct PathData {
    /// Object being navigated
    pub object: Expression,
    /// Property evaluated against each navigated object
    pub property: Expression,
    /// `?.` navigation
    pub null_safe: bool,
}

/// Index access data
#[derive(Debug, Clone)]
pub struct AccessByIndexData {
    /// Indexed collection
    pub collection: Expression,
    /// Zero-based index expression
    pub index: Expression,
}

/// Collection filter data
#[derive(Debug, Clone)]
pub struct CollectionFilterData {
    /// Filtered collection
    pub collection: Expression,
    /// Predicate; `None` selects all elements
    pub predicate: Option<Expression>,
}

/// Shared shape of `for`, `some` and `every`
#[derive(Debug, Clone)]
pub struct IterationData {
    /// Loop variable name
    pub variable: String,
    /// Iterated collection
    pub collection: Expression,
    /// Body evaluated per element
    pub body: Expression,
}

/// Conditional data
#[derive(Debug, Clone)]
pub struct IfData {
    /// Condition
    pub condition: Expression,
    /// Branch taken when the condition holds
    pub then_branch: Expression,
    /// Optional branch taken otherwise
    pub else_branch: Option<Expression>,
}

/// Binary operation data
#[derive(Debug, Clone)]
pub struct BinaryData {
    /// The operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Expression,
    /// Right operand
    pub right: Expression,
}

/// Unary operation data
#[derive(Debug, Clone)]
pub struct UnaryData {
    /// The operator
    pub operator: UnaryOperator,
    /// Operand
    pub operand: Expression,
}

/// Data of cast and type comparison nodes
#[derive(Debug, Clone)]
pub struct TypeOperationData {
    /// Checked or cast expression
    pub expression: Expression,
    /// Target type
    pub target: TypeInfo,
}

/// Function call data
#[derive(Debug, Clone)]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Positional arguments
    pub arguments: Arguments,
}

/// Piece of a string template
#[derive(Debug, Clone)]
pub enum TemplatePart {
    /// Literal text
    Text(String),
    /// Interpolated expression
    Expression(Expression),
}

/// Value block data
#[derive(Debug, Clone)]
pub struct ValueBlockData {
    /// Variable bindings, evaluated in order
    pub bindings: Vec<(String, Expression)>,
    /// Result expression
    pub result: Expression,
}

impl Expression {
    fn new(kind: ExpressionKind, eval_type: TypeInfo, token: Token, scope: Arc<Scope>) -> Self {
        Self {
            kind,
            eval_type,
            token,
            scope,
        }
    }

    fn checked(
        kind: ExpressionKind,
        eval_type: TypeInfo,
        token: Token,
        scope: Arc<Scope>,
    ) -> Result<Self> {
        let node = Self::new(kind, eval_type, token, scope);
        if node.eval_type.contains_generic() {
            return Err(AstError::UnresolvedGenericType {
                expression: node.to_string(),
                type_name: node.eval_type.to_string(),
            }
            .into());
        }
        Ok(node)
    }

    // Literals

    /// `null` literal
    pub fn null(token: Token, scope: &Arc<Scope>) -> Self {
        Self::new(ExpressionKind::Null, TypeInfo::Any, token, Arc::clone(scope))
    }

    /// Boolean literal
    pub fn boolean(value: bool, token: Token, scope: &Arc<Scope>) -> Self {
        Self::new(
            ExpressionKind::Boolean(value),
            TypeInfo::Boolean,
            token,
            Arc::clone(scope),
        )
    }

    /// String literal
    pub fn string(value: impl AsRef<str>, token: Token, scope: &Arc<Scope>) -> Self {
        Self::new(
            ExpressionKind::String(Arc::from(value.as_ref())),
            TypeInfo::String,
            token,
            Arc::clone(scope),
        )
    }

    /// Number literal
    pub fn number(value: impl Into<Decimal>, token: Token, scope: &Arc<Scope>) -> Self {
        Self::new(
            ExpressionKind::Number(value.into()),
            TypeInfo::Number,
            token,
            Arc::clone(scope),
        )
    }

    /// Date literal
    pub fn date(value: NaiveDate, token: Token, scope: &Arc<Scope>) -> Self {
        Self::new(
            ExpressionKind::Date(value),
            TypeInfo::Date,
            token,
            Arc::clone(scope),
        )
    }

    /// DateTime literal
    pub fn date_time(value: DateTime<Utc>, token: Token, scope: &Arc<Scope>) -> Self {
        Self::new(
            ExpressionKind::DateTime(value),
            TypeInfo::DateTime,
            token,
            Arc::clone(scope),
        )
    }

    // References

    /// Identifier with the type produced by static scope resolution
    pub fn identifier(
        name: impl Into<String>,
        eval_type: TypeInfo,
        token: Token,
        scope: &Arc<Scope>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || name.split('.').any(str::is_empty) {
            return Err(AstError::InvalidExpression {
                message: format!("invalid identifier '{name}'"),
            }
            .into());
        }
        Self::checked(
            ExpressionKind::Identifier(name),
            eval_type,
            token,
            Arc::clone(scope),
        )
    }

    /// `this` with the type of the current object
    pub fn this(eval_type: TypeInfo, token: Token, scope: &Arc<Scope>) -> Result<Self> {
        Self::checked(ExpressionKind::This, eval_type, token, Arc::clone(scope))
    }

    /// Path navigation; the evaluation type is carried by the builder
    pub fn path(
        object: Expression,
        property: Expression,
        null_safe: bool,
        eval_type: TypeInfo,
        token: Token,
    ) -> Result<Self> {
        let scope = Arc::clone(&object.scope);
        Self::checked(
            ExpressionKind::Path(Box::new(PathData {
                object,
                property,
                null_safe,
            })),
            eval_type,
            token,
            scope,
        )
    }

    /// Index access: element type for arrays, `Any` for `Any`, otherwise unknown
    pub fn access_by_index(collection: Expression, index: Expression, token: Token) -> Self {
        let eval_type = collection.eval_type.element_type();
        let scope = Arc::clone(&collection.scope);
        Self::new(
            ExpressionKind::AccessByIndex(Box::new(AccessByIndexData { collection, index })),
            eval_type,
            token,
            scope,
        )
    }

    /// Collection filter; keeps the collection type
    pub fn collection_filter(
        collection: Expression,
        predicate: Option<Expression>,
        token: Token,
    ) -> Self {
        let eval_type = match &collection.eval_type {
            t @ (TypeInfo::Array(_) | TypeInfo::Any) => t.clone(),
            t => TypeInfo::array(t.clone()),
        };
        let scope = Arc::clone(&collection.scope);
        Self::new(
            ExpressionKind::CollectionFilter(Box::new(CollectionFilterData {
                collection,
                predicate,
            })),
            eval_type,
            token,
            scope,
        )
    }

    // Control forms

    /// `for` loop; results are flattened one level so an array body stays an array
    pub fn for_each(
        variable: impl Into<String>,
        collection: Expression,
        body: Expression,
        token: Token,
    ) -> Self {
        let eval_type = match &body.eval_type {
            TypeInfo::Array(element) => TypeInfo::Array(element.clone()),
            other => TypeInfo::array(other.clone()),
        };
        let scope = Arc::clone(&collection.scope);
        Self::new(
            ExpressionKind::ForEach(Box::new(IterationData {
                variable: variable.into(),
                collection,
                body,
            })),
            eval_type,
            token,
            scope,
        )
    }

    /// Existential quantifier
    pub fn for_some(
        variable: impl Into<String>,
        collection: Expression,
        body: Expression,
        token: Token,
    ) -> Self {
        let scope = Arc::clone(&collection.scope);
        Self::new(
            ExpressionKind::ForSome(Box::new(IterationData {
                variable: variable.into(),
                collection,
                body,
            })),
            TypeInfo::Boolean,
            token,
            scope,
        )
    }

    /// Universal quantifier
    pub fn for_every(
        variable: impl Into<String>,
        collection: Expression,
        body: Expression,
        token: Token,
    ) -> Self {
        let scope = Arc::clone(&collection.scope);
        Self::new(
            ExpressionKind::ForEvery(Box::new(IterationData {
                variable: variable.into(),
                collection,
                body,
            })),
            TypeInfo::Boolean,
            token,
            scope,
        )
    }

    /// Conditional.
    ///
    /// Without an else branch the type is the then-branch type; with both
    /// branches it is their nearest common type, or `Unknown` when none exists.
    pub fn if_then(
        condition: Expression,
        then_branch: Expression,
        else_branch: Option<Expression>,
        token: Token,
    ) -> Self {
        let eval_type = match &else_branch {
            None => then_branch.eval_type.clone(),
            Some(otherwise) => then_branch
                .eval_type
                .common_type(&otherwise.eval_type)
                .unwrap_or(TypeInfo::Unknown),
        };
        let scope = Arc::clone(&condition.scope);
        Self::new(
            ExpressionKind::If(Box::new(IfData {
                condition,
                then_branch,
                else_branch,
            })),
            eval_type,
            token,
            scope,
        )
    }

    /// Local variable bindings followed by a result expression
    pub fn value_block(
        bindings: Vec<(String, Expression)>,
        result: Expression,
        token: Token,
    ) -> Self {
        let eval_type = result.eval_type.clone();
        let scope = Arc::clone(&result.scope);
        Self::new(
            ExpressionKind::ValueBlock(Box::new(ValueBlockData { bindings, result })),
            eval_type,
            token,
            scope,
        )
    }

    // Operators

    /// Binary operation
    pub fn binary(
        operator: BinaryOperator,
        left: Expression,
        right: Expression,
        token: Token,
    ) -> Self {
        let eval_type = if operator.is_predicate() {
            TypeInfo::Boolean
        } else {
            arithmetic_type(operator, &left.eval_type, &right.eval_type)
        };
        let scope = Arc::clone(&left.scope);
        Self::new(
            ExpressionKind::Binary(Box::new(BinaryData {
                operator,
                left,
                right,
            })),
            eval_type,
            token,
            scope,
        )
    }

    /// Unary operation
    pub fn unary(operator: UnaryOperator, operand: Expression, token: Token) -> Self {
        let eval_type = match operator {
            UnaryOperator::Not => TypeInfo::Boolean,
            UnaryOperator::Negate => operand.eval_type.clone(),
        };
        let scope = Arc::clone(&operand.scope);
        Self::new(
            ExpressionKind::Unary(Box::new(UnaryData { operator, operand })),
            eval_type,
            token,
            scope,
        )
    }

    /// Cast; narrows the static type only
    pub fn cast(expression: Expression, target: TypeInfo, token: Token) -> Result<Self> {
        let scope = Arc::clone(&expression.scope);
        let eval_type = target.clone();
        Self::checked(
            ExpressionKind::Cast(Box::new(TypeOperationData { expression, target })),
            eval_type,
            token,
            scope,
        )
    }

    /// `instanceof` type comparison
    pub fn instance_of(expression: Expression, target: TypeInfo, token: Token) -> Result<Self> {
        Self::type_comparison(expression, target, token, true)
    }

    /// `typeof` type comparison
    pub fn type_of(expression: Expression, target: TypeInfo, token: Token) -> Result<Self> {
        Self::type_comparison(expression, target, token, false)
    }

    fn type_comparison(
        expression: Expression,
        target: TypeInfo,
        token: Token,
        instance_of: bool,
    ) -> Result<Self> {
        if target.contains_generic() {
            return Err(AstError::UnresolvedGenericType {
                expression: expression.to_string(),
                type_name: target.to_string(),
            }
            .into());
        }
        let scope = Arc::clone(&expression.scope);
        let data = Box::new(TypeOperationData { expression, target });
        let kind = if instance_of {
            ExpressionKind::InstanceOf(data)
        } else {
            ExpressionKind::TypeOf(data)
        };
        Ok(Self::new(kind, TypeInfo::Boolean, token, scope))
    }

    // Calls and composites

    /// Function call with an explicitly resolved return type
    pub fn function(
        name: impl Into<String>,
        arguments: Vec<Expression>,
        eval_type: TypeInfo,
        token: Token,
        scope: &Arc<Scope>,
    ) -> Result<Self> {
        Self::checked(
            ExpressionKind::Function(Box::new(FunctionCallData {
                name: name.into(),
                arguments: Arguments::from_vec(arguments),
            })),
            eval_type,
            token,
            Arc::clone(scope),
        )
    }

    /// Function call typed through the catalog's generic resolution
    pub fn function_call(
        catalog: &FunctionCatalog,
        target: Option<&str>,
        name: impl Into<String>,
        arguments: Vec<Expression>,
        token: Token,
        scope: &Arc<Scope>,
    ) -> Result<Self> {
        let name = name.into();
        let argument_types: Vec<TypeInfo> =
            arguments.iter().map(|a| a.eval_type.clone()).collect();
        let eval_type = catalog.resolve_return_type(&name, &argument_types, target)?;
        Self::function(name, arguments, eval_type, token, scope)
    }

    /// Inline array; element type is the common type of the items
    pub fn inline_array(items: Vec<Expression>, token: Token, scope: &Arc<Scope>) -> Self {
        let mut element: Option<TypeInfo> = None;
        for item in &items {
            element = Some(match element {
                None => item.eval_type.clone(),
                Some(current) => current
                    .common_type(&item.eval_type)
                    .unwrap_or(TypeInfo::Any),
            });
        }
        Self::new(
            ExpressionKind::InlineArray(items),
            TypeInfo::array(element.unwrap_or(TypeInfo::Any)),
            token,
            Arc::clone(scope),
        )
    }

    /// Inline map
    pub fn inline_map(
        entries: Vec<(String, Expression)>,
        token: Token,
        scope: &Arc<Scope>,
    ) -> Self {
        Self::new(
            ExpressionKind::InlineMap(entries),
            TypeInfo::Map,
            token,
            Arc::clone(scope),
        )
    }

    /// String template
    pub fn template(parts: Vec<TemplatePart>, token: Token, scope: &Arc<Scope>) -> Self {
        Self::new(
            ExpressionKind::Template(parts),
            TypeInfo::String,
            token,
            Arc::clone(scope),
        )
    }

    // Accessors

    /// Node kind and children
    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    /// Statically resolved evaluation type
    pub fn eval_type(&self) -> &TypeInfo {
        &self.eval_type
    }

    /// Source token
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Static scope the node was built in
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    /// Type facts established when this expression evaluates to true.
    ///
    /// `x instanceof T` and `x typeof T` narrow `x` to `T`; `and` combines the
    /// facts of both sides.
    pub fn deduced_types(&self) -> FxHashMap<String, TypeInfo> {
        let mut facts = FxHashMap::default();
        self.collect_deduced_types(&mut facts);
        facts
    }

    fn collect_deduced_types(&self, facts: &mut FxHashMap<String, TypeInfo>) {
        match &self.kind {
            ExpressionKind::InstanceOf(data) | ExpressionKind::TypeOf(data) => {
                if data.expression.as_reference().is_some() {
                    facts.insert(data.expression.to_string(), data.target.clone());
                }
            }
            ExpressionKind::Binary(data) if data.operator == BinaryOperator::And => {
                data.left.collect_deduced_types(facts);
                data.right.collect_deduced_types(facts);
            }
            _ => {}
        }
    }
}

fn arithmetic_type(operator: BinaryOperator, left: &TypeInfo, right: &TypeInfo) -> TypeInfo {
    match (left, right) {
        (TypeInfo::String, _) | (_, TypeInfo::String) if operator == BinaryOperator::Add => {
            TypeInfo::String
        }
        (TypeInfo::Money, TypeInfo::Money)
            if matches!(operator, BinaryOperator::Add | BinaryOperator::Subtract) =>
        {
            TypeInfo::Money
        }
        (TypeInfo::Money, TypeInfo::Number)
            if matches!(operator, BinaryOperator::Multiply | BinaryOperator::Divide) =>
        {
            TypeInfo::Money
        }
        (TypeInfo::Number | TypeInfo::Money, TypeInfo::Number | TypeInfo::Money) => {
            TypeInfo::Number
        }
        _ => TypeInfo::Any,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KelError;
    use pretty_assertions::assert_eq;

    fn token(text: &str) -> Token {
        Token::synthetic(text)
    }

    fn ident(name: &str, eval_type: TypeInfo) -> Expression {
        Expression::identifier(name, eval_type, token(name), &Scope::root()).unwrap()
    }

    #[test]
    fn test_if_type_rules() {
        let scope = Scope::root();
        let condition = Expression::boolean(true, token("true"), &scope);
        let number = Expression::number(1, token("1"), &scope);
        let text = Expression::string("a", token("'a'"), &scope);

        let without_else =
            Expression::if_then(condition.clone(), number.clone(), None, token("if"));
        assert_eq!(without_else.eval_type(), &TypeInfo::Number);

        let mixed = Expression::if_then(condition.clone(), number.clone(), Some(text), token("if"));
        assert_eq!(mixed.eval_type(), &TypeInfo::Unknown);

        let same = Expression::if_then(condition, number.clone(), Some(number), token("if"));
        assert_eq!(same.eval_type(), &TypeInfo::Number);
    }

    #[test]
    fn test_access_by_index_type_rules() {
        let index = Expression::number(0, token("0"), &Scope::root());
        let on_array = Expression::access_by_index(
            ident("items", TypeInfo::array(TypeInfo::Date)),
            index.clone(),
            token("["),
        );
        assert_eq!(on_array.eval_type(), &TypeInfo::Date);

        let on_any =
            Expression::access_by_index(ident("x", TypeInfo::Any), index.clone(), token("["));
        assert_eq!(on_any.eval_type(), &TypeInfo::Any);

        let on_string =
            Expression::access_by_index(ident("s", TypeInfo::String), index, token("["));
        assert_eq!(on_string.eval_type(), &TypeInfo::Unknown);
    }

    #[test]
    fn test_iteration_types() {
        let items = ident("items", TypeInfo::array(TypeInfo::Number));
        let body = ident("x", TypeInfo::Number);
        let for_each = Expression::for_each("x", items.clone(), body.clone(), token("for"));
        assert_eq!(for_each.eval_type(), &TypeInfo::array(TypeInfo::Number));
        let some = Expression::for_some("x", items, body, token("some"));
        assert_eq!(some.eval_type(), &TypeInfo::Boolean);
    }

    #[test]
    fn test_generic_type_is_rejected() {
        let err = Expression::identifier("x", TypeInfo::generic("T"), token("x"), &Scope::root())
            .unwrap_err();
        assert!(matches!(
            err,
            KelError::Ast(AstError::UnresolvedGenericType { .. })
        ));

        let err = Expression::function(
            "First",
            vec![],
            TypeInfo::array(TypeInfo::generic("T")),
            token("First"),
            &Scope::root(),
        )
        .unwrap_err();
        assert!(matches!(err, KelError::Ast(_)));
    }

    #[test]
    fn test_deduced_types() {
        let vehicle = TypeInfo::named("Car");
        let check = Expression::instance_of(
            ident("vehicle", TypeInfo::Any),
            vehicle.clone(),
            token("instanceof"),
        )
        .unwrap();
        let other = Expression::type_of(
            ident("owner", TypeInfo::Any),
            TypeInfo::named("Person"),
            token("typeof"),
        )
        .unwrap();
        let both = Expression::binary(BinaryOperator::And, check, other, token("and"));

        let facts = both.deduced_types();
        assert_eq!(facts.get("vehicle"), Some(&vehicle));
        assert_eq!(facts.get("owner"), Some(&TypeInfo::named("Person")));
        assert_eq!(both.eval_type(), &TypeInfo::Boolean);
    }

    #[test]
    fn test_arithmetic_types() {
        let scope = Scope::root();
        let sum = Expression::binary(
            BinaryOperator::Add,
            Expression::number(1, token("1"), &scope),
            Expression::number(2, token("2"), &scope),
            token("+"),
        );
        assert_eq!(sum.eval_type(), &TypeInfo::Number);
        let text = Expression::binary(
            BinaryOperator::Add,
            Expression::string("a", token("'a'"), &scope),
            Expression::number(2, token("2"), &scope),
            token("+"),
        );
        assert_eq!(text.eval_type(), &TypeInfo::String);
    }
}

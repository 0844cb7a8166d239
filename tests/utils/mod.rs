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

//! Shared test utilities
//!
//! Provides a small expression parser for a subset of KEL so integration
//! tests can be written as source text, plus sample policy data.

#![allow(dead_code)]

use kel_engine::ast::{BinaryOperator, Span, UnaryOperator};
use kel_engine::{
    EvaluationContext, Expression, ExpressionParser, FunctionCatalog, KelEngine, Result, Scope,
    ScopeType, SyntaxError, Token, TypeInfo, Value,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

/// Enable `RUST_LOG` output inside tests
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Engine over the standard library with the test parser attached
pub fn engine() -> KelEngine {
    init_logging();
    KelEngine::standard()
        .expect("standard catalog")
        .with_parser(TestParser)
}

/// Parse and evaluate `source` against JSON data in the root scope
pub fn eval(engine: &KelEngine, source: &str, data: serde_json::Value) -> Result<Value> {
    let context = engine.context(Value::from_json(data).expect("test data converts"));
    eval_in(engine, source, &context)
}

/// Parse and evaluate `source` against a prepared context
pub fn eval_in(engine: &KelEngine, source: &str, context: &EvaluationContext) -> Result<Value> {
    engine.evaluate_expression(source, &Scope::root(), context)
}

pub fn num(text: &str) -> Value {
    Value::Number(Decimal::from_str(text).expect("decimal literal"))
}

pub fn list(items: Vec<Value>) -> Value {
    Value::collection(items)
}

/// Sample insurance policy
pub fn policy() -> serde_json::Value {
    json!({
        "policy": {
            "policyNumber": "P-1001",
            "state": "CA",
            "effectiveDate": "2024-01-15",
            "owner": null,
            "codes": ["A1", "B2", "C3"],
            "riskItems": [
                {
                    "name": "sedan",
                    "value": 25000,
                    "coverages": [{"code": "COLL", "limit": 500}, {"code": "COMP", "limit": 250}]
                },
                {
                    "name": "truck",
                    "value": 40000,
                    "coverages": [{"code": "COLL", "limit": 1000}]
                },
                {
                    "name": "trailer",
                    "value": 800,
                    "coverages": []
                }
            ]
        }
    })
}

/// Parser for a subset of KEL: literals, identifiers, `.` and `?.`
/// navigation, `[..]` filters and indexes, function calls, binary and unary
/// operators, `if`, `for`, `some` and `every`.
///
/// A bracket whose inner expression is boolean is a filter; anything else is
/// an index. Identifiers and navigation results are typed `Any`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestParser;

impl ExpressionParser for TestParser {
    fn build_ast(
        &self,
        source: &str,
        scope: &Arc<Scope>,
        catalog: &FunctionCatalog,
    ) -> std::result::Result<Expression, Vec<SyntaxError>> {
        let tokens = tokenize(source).map_err(|e| vec![e])?;
        let mut parser = Parser {
            tokens,
            position: 0,
            catalog,
        };
        let expression = parser.expression(scope).map_err(|e| vec![e])?;
        match parser.peek() {
            None => Ok(expression),
            Some((lexeme, span)) => Err(vec![SyntaxError::new(
                format!("unexpected '{}'", lexeme.text()),
                *span,
            )]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Number(Decimal),
    Text(String),
    Word(String),
    Symbol(&'static str),
}

impl Lexeme {
    fn text(&self) -> String {
        match self {
            Lexeme::Number(n) => n.to_string(),
            Lexeme::Text(s) => format!("'{s}'"),
            Lexeme::Word(w) => w.clone(),
            Lexeme::Symbol(s) => (*s).to_string(),
        }
    }
}

const SYMBOLS: [&str; 22] = [
    "?.", "==", "!=", "<=", ">=", "=~", ".", "[", "]", "(", ")", ",", "+", "-", "*", "/", "%",
    "^", "<", ">", "!", "=",
];

type ParseResult<T> = std::result::Result<T, SyntaxError>;

fn tokenize(source: &str) -> ParseResult<Vec<(Lexeme, Span)>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || (chars[i] == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)))
            {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = Decimal::from_str(&text)
                .map_err(|e| SyntaxError::new(e.to_string(), Span::new(start, i)))?;
            tokens.push((Lexeme::Number(value), Span::new(start, i)));
        } else if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                i += 1;
            }
            if i == chars.len() {
                return Err(SyntaxError::new("unterminated string", Span::new(start, i)));
            }
            let text: String = chars[start + 1..i].iter().collect();
            i += 1;
            tokens.push((Lexeme::Text(text), Span::new(start, i)));
        } else if c.is_alphabetic() || c == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push((Lexeme::Word(word), Span::new(start, i)));
        } else {
            let rest: String = chars[i..].iter().take(2).collect();
            let symbol: &'static str = SYMBOLS
                .iter()
                .copied()
                .find(|symbol| rest.starts_with(symbol))
                .ok_or_else(|| SyntaxError::new(format!("unexpected '{c}'"), Span::new(i, i + 1)))?;
            i += symbol.chars().count();
            tokens.push((Lexeme::Symbol(symbol), Span::new(start, i)));
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(Lexeme, Span)>,
    position: usize,
    catalog: &'a FunctionCatalog,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&(Lexeme, Span)> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> ParseResult<(Lexeme, Span)> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or_else(|| SyntaxError::new("unexpected end of expression", self.end()))?;
        self.position += 1;
        Ok(token)
    }

    fn end(&self) -> Span {
        self.tokens
            .last()
            .map_or(Span::new(0, 0), |(_, span)| Span::new(span.end, span.end))
    }

    fn at_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some((Lexeme::Symbol(s), _)) if *s == symbol)
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some((Lexeme::Word(w), _)) if w == word)
    }

    fn expect_symbol(&mut self, symbol: &str) -> ParseResult<()> {
        let (lexeme, span) = self.next()?;
        if !matches!(&lexeme, Lexeme::Symbol(s) if *s == symbol) {
            return Err(SyntaxError::new(
                format!("expected '{symbol}', found {}", lexeme.text()),
                span,
            ));
        }
        Ok(())
    }

    fn expect_word(&mut self, word: &str) -> ParseResult<()> {
        let (lexeme, span) = self.next()?;
        if lexeme != Lexeme::Word(word.to_string()) {
            return Err(SyntaxError::new(
                format!("expected '{word}', found {}", lexeme.text()),
                span,
            ));
        }
        Ok(())
    }

    fn name(&mut self) -> ParseResult<(String, Span)> {
        match self.next()? {
            (Lexeme::Word(word), span) => Ok((word, span)),
            (other, span) => Err(SyntaxError::new(
                format!("expected a name, found {}", other.text()),
                span,
            )),
        }
    }

    fn expression(&mut self, scope: &Arc<Scope>) -> ParseResult<Expression> {
        self.binary(scope, 0)
    }

    fn peek_operator(&self) -> Option<BinaryOperator> {
        match self.peek()? {
            (Lexeme::Symbol(symbol), _) if *symbol != "!" => BinaryOperator::from_symbol(symbol),
            (Lexeme::Word(word), _) if matches!(word.as_str(), "and" | "or" | "in") => {
                BinaryOperator::from_symbol(word)
            }
            _ => None,
        }
    }

    fn binary(&mut self, scope: &Arc<Scope>, min_precedence: u8) -> ParseResult<Expression> {
        let mut left = self.unary(scope)?;
        while let Some(operator) = self.peek_operator() {
            if operator.precedence() < min_precedence {
                break;
            }
            self.position += 1;
            let right = self.binary(scope, operator.precedence() + 1)?;
            left = Expression::binary(operator, left, right, Token::synthetic(operator.symbol()));
        }
        Ok(left)
    }

    fn unary(&mut self, scope: &Arc<Scope>) -> ParseResult<Expression> {
        let operator = if self.at_symbol("!") || self.at_word("not") {
            Some(UnaryOperator::Not)
        } else if self.at_symbol("-") {
            Some(UnaryOperator::Negate)
        } else {
            None
        };
        match operator {
            Some(operator) => {
                self.position += 1;
                let operand = self.unary(scope)?;
                Ok(Expression::unary(operator, operand, Token::synthetic(operator.symbol())))
            }
            None => self.postfix(scope),
        }
    }

    fn postfix(&mut self, scope: &Arc<Scope>) -> ParseResult<Expression> {
        let mut expression = self.primary(scope)?;
        loop {
            if self.at_symbol(".") || self.at_symbol("?.") {
                let null_safe = self.at_symbol("?.");
                self.position += 1;
                let (name, span) = self.name()?;
                let property = identifier(&name, span, scope)?;
                expression = Expression::path(
                    expression,
                    property,
                    null_safe,
                    TypeInfo::Any,
                    Token::synthetic("."),
                )
                .map_err(|e| SyntaxError::new(e.to_string(), span))?;
            } else if self.at_symbol("[") {
                self.position += 1;
                let filter_scope = Scope::child(scope, ScopeType::Filter, TypeInfo::Any).shared();
                let inner = self.expression(&filter_scope)?;
                self.expect_symbol("]")?;
                expression = if inner.eval_type() == &TypeInfo::Boolean {
                    Expression::collection_filter(expression, Some(inner), Token::synthetic("["))
                } else {
                    Expression::access_by_index(expression, inner, Token::synthetic("["))
                };
            } else {
                return Ok(expression);
            }
        }
    }

    fn primary(&mut self, scope: &Arc<Scope>) -> ParseResult<Expression> {
        let (lexeme, span) = self.next()?;
        let token = Token::new(lexeme.text(), span.start, span.end);
        match lexeme {
            Lexeme::Number(value) => Ok(Expression::number(value, token, scope)),
            Lexeme::Text(text) => Ok(Expression::string(text, token, scope)),
            Lexeme::Symbol("(") => {
                let inner = self.expression(scope)?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Lexeme::Word(word) => match word.as_str() {
                "true" => Ok(Expression::boolean(true, token, scope)),
                "false" => Ok(Expression::boolean(false, token, scope)),
                "null" => Ok(Expression::null(token, scope)),
                "this" => Expression::this(TypeInfo::Any, token, scope)
                    .map_err(|e| SyntaxError::new(e.to_string(), span)),
                "if" => {
                    let condition = self.expression(scope)?;
                    self.expect_word("then")?;
                    let then_branch = self.expression(scope)?;
                    let else_branch = if self.at_word("else") {
                        self.position += 1;
                        Some(self.expression(scope)?)
                    } else {
                        None
                    };
                    Ok(Expression::if_then(condition, then_branch, else_branch, token))
                }
                "for" | "some" | "every" => self.iteration(&word, token, scope),
                _ if self.at_symbol("(") => self.call(word.clone(), token, span, scope),
                _ => identifier(&word, span, scope),
            },
            other => Err(SyntaxError::new(
                format!("unexpected {}", other.text()),
                span,
            )),
        }
    }

    fn iteration(
        &mut self,
        keyword: &str,
        token: Token,
        scope: &Arc<Scope>,
    ) -> ParseResult<Expression> {
        let (variable, _) = self.name()?;
        self.expect_word("in")?;
        // the collection must not swallow a following `in`
        let collection = self.binary(scope, BinaryOperator::In.precedence() + 1)?;
        let body_scope = Scope::child(scope, ScopeType::Local, TypeInfo::Any)
            .with_symbol(variable.clone(), TypeInfo::Any)
            .shared();
        if keyword == "for" {
            self.expect_word("return")?;
            let body = self.expression(&body_scope)?;
            Ok(Expression::for_each(variable, collection, body, token))
        } else {
            self.expect_word("satisfies")?;
            let body = self.expression(&body_scope)?;
            Ok(if keyword == "some" {
                Expression::for_some(variable, collection, body, token)
            } else {
                Expression::for_every(variable, collection, body, token)
            })
        }
    }

    fn call(
        &mut self,
        name: String,
        token: Token,
        span: Span,
        scope: &Arc<Scope>,
    ) -> ParseResult<Expression> {
        self.expect_symbol("(")?;
        let mut arguments = Vec::new();
        if !self.at_symbol(")") {
            loop {
                arguments.push(self.expression(scope)?);
                if !self.at_symbol(",") {
                    break;
                }
                self.position += 1;
            }
        }
        self.expect_symbol(")")?;
        Expression::function_call(self.catalog, None, name, arguments, token, scope)
            .map_err(|e| SyntaxError::new(e.to_string(), span))
    }
}

fn identifier(name: &str, span: Span, scope: &Arc<Scope>) -> ParseResult<Expression> {
    let token = Token::new(name, span.start, span.end);
    Expression::identifier(name, TypeInfo::Any, token, scope)
        .map_err(|e| SyntaxError::new(e.to_string(), span))
}

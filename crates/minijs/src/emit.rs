//! Tree emission in the three supported shapes.

use serde_json::{Map, Value, json};

use crate::Shape;
use crate::ast::{Expr, LiteralValue, Program, Statement};
use crate::lexer::{Position, Span};

/// Emit `program` as a raw JSON tree of the given shape.
pub fn to_json(program: &Program, shape: Shape) -> Value {
    Emitter { shape }.program(program)
}

struct Emitter {
    shape: Shape,
}

impl Emitter {
    fn node(&self, node_type: &str, span: Span, fields: Vec<(&str, Value)>) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::from(node_type));
        for (name, value) in fields {
            map.insert(name.into(), value);
        }
        let loc = json!({"start": position(span.start_pos), "end": position(span.end_pos)});
        match self.shape {
            Shape::Hermes => {
                map.insert("range".into(), json!([span.start, span.end]));
                map.insert("loc".into(), loc);
            }
            Shape::Babel => {
                map.insert("start".into(), json!(span.start));
                map.insert("end".into(), json!(span.end));
                map.insert("loc".into(), loc);
            }
            Shape::Estree => {
                map.insert("start".into(), json!(span.start));
                map.insert("end".into(), json!(span.end));
                map.insert("range".into(), json!([span.start, span.end]));
                map.insert("loc".into(), loc);
            }
        }
        Value::Object(map)
    }

    fn program(&self, program: &Program) -> Value {
        let body: Vec<Value> = program.body.iter().map(|s| self.statement(s)).collect();
        let mut fields = vec![("body", Value::Array(body))];
        if self.shape != Shape::Hermes {
            fields.push(("sourceType", json!("script")));
        }
        self.node("Program", program.span, fields)
    }

    fn statement(&self, statement: &Statement) -> Value {
        match statement {
            Statement::Empty { span } => self.node("EmptyStatement", *span, Vec::new()),
            Statement::Expression { expression, span } => {
                let mut fields = vec![("expression", self.expr(expression, false))];
                if self.shape == Shape::Hermes {
                    fields.push(("directive", Value::Null));
                }
                self.node("ExpressionStatement", *span, fields)
            }
        }
    }

    /// `continuation` is set for the object/callee slot of a chain link.
    fn expr(&self, expr: &Expr, continuation: bool) -> Value {
        match expr {
            Expr::Identifier { name, span } => self.identifier(name, *span),
            Expr::Literal { value, raw, span } => self.literal(value, raw, *span),
            Expr::Paren { expr: inner, span } => self.paren(inner, *span),
            Expr::Member {
                object,
                property,
                computed,
                optional,
                span,
            } => {
                let mut fields = vec![
                    ("object", self.expr(object, true)),
                    ("property", self.expr(property, false)),
                    ("computed", Value::Bool(*computed)),
                ];
                let node_type = self.link_type(expr, "MemberExpression", "OptionalMemberExpression");
                if self.shape != Shape::Babel || node_type != "MemberExpression" {
                    fields.push(("optional", Value::Bool(*optional)));
                }
                self.chain_top(expr, continuation, self.node(node_type, *span, fields))
            }
            Expr::Call {
                callee,
                arguments,
                optional,
                span,
            } => {
                let arguments: Vec<Value> = arguments.iter().map(|a| self.expr(a, false)).collect();
                let mut fields = vec![
                    ("callee", self.expr(callee, true)),
                    ("arguments", Value::Array(arguments)),
                ];
                let node_type = self.link_type(expr, "CallExpression", "OptionalCallExpression");
                if self.shape != Shape::Babel || node_type != "CallExpression" {
                    fields.push(("optional", Value::Bool(*optional)));
                }
                if self.shape == Shape::Hermes {
                    fields.push(("typeArguments", Value::Null));
                }
                self.chain_top(expr, continuation, self.node(node_type, *span, fields))
            }
        }
    }

    /// Flat shapes give every link of an optional chain its own node type.
    fn link_type<'t>(&self, expr: &Expr, plain: &'t str, optional: &'t str) -> &'t str {
        if self.shape != Shape::Estree && expr.in_optional_chain() {
            optional
        } else {
            plain
        }
    }

    /// ESTree wraps the outermost link of an optional chain.
    fn chain_top(&self, expr: &Expr, continuation: bool, node: Value) -> Value {
        if self.shape == Shape::Estree && !continuation && expr.in_optional_chain() {
            self.node("ChainExpression", expr.span(), vec![("expression", node)])
        } else {
            node
        }
    }

    fn paren(&self, inner: &Expr, span: Span) -> Value {
        let mut value = self.expr(inner, false);
        if self.shape == Shape::Babel {
            if let Some(map) = value.as_object_mut() {
                let extra = map.entry("extra").or_insert_with(|| json!({}));
                if let Some(extra) = extra.as_object_mut() {
                    extra.insert("parenthesized".into(), Value::Bool(true));
                    extra.insert("parenStart".into(), json!(span.start));
                }
            }
        }
        value
    }

    fn identifier(&self, name: &str, span: Span) -> Value {
        let mut fields = vec![("name", Value::from(name))];
        if self.shape == Shape::Hermes {
            fields.push(("optional", Value::Bool(false)));
            fields.push(("typeAnnotation", Value::Null));
        }
        self.node("Identifier", span, fields)
    }

    fn literal(&self, value: &LiteralValue, raw: &str, span: Span) -> Value {
        let json_value = match value {
            LiteralValue::Number(n) => number(*n),
            LiteralValue::String(s) => Value::from(s.as_str()),
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Null => Value::Null,
        };
        match self.shape {
            Shape::Hermes => {
                let literal_type = match value {
                    LiteralValue::Number(_) => "numeric",
                    LiteralValue::String(_) => "string",
                    LiteralValue::Bool(_) => "boolean",
                    LiteralValue::Null => "null",
                };
                self.node(
                    "Literal",
                    span,
                    vec![
                        ("value", json_value),
                        ("raw", Value::from(raw)),
                        ("literalType", Value::from(literal_type)),
                    ],
                )
            }
            Shape::Estree => self.node("Literal", span, vec![("value", json_value), ("raw", Value::from(raw))]),
            Shape::Babel => {
                let extra = json!({"rawValue": json_value.clone(), "raw": raw});
                match value {
                    LiteralValue::Number(_) => {
                        self.node("NumericLiteral", span, vec![("value", json_value), ("extra", extra)])
                    }
                    LiteralValue::String(_) => {
                        self.node("StringLiteral", span, vec![("value", json_value), ("extra", extra)])
                    }
                    LiteralValue::Bool(_) => self.node("BooleanLiteral", span, vec![("value", json_value)]),
                    LiteralValue::Null => self.node("NullLiteral", span, Vec::new()),
                }
            }
        }
    }
}

fn position(pos: Position) -> Value {
    json!({"line": pos.line, "column": pos.column})
}

/// Integral values are emitted as JSON integers, like a JS engine would print them.
#[allow(clippy::cast_possible_truncation)]
fn number(value: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

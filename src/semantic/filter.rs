//! Structured filters on dimension attributes.
//!
//! Filters are written as SQL predicates over one dimension attribute, for
//! example `customers.region = 'west'` or `orders.amount >= 100`, and parsed
//! with sqlparser into a [`Filter`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::ast::{
    BinaryOperator as SqlBinaryOperator, Expr as SqlExpr, UnaryOperator as SqlUnaryOperator,
    Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token as SqlToken;

use crate::sql::expr::{lit_bool, lit_float, lit_int, lit_null, lit_str, Expr, ExprExt};

use super::error::{SemanticError, SemanticResult};

/// A filter condition on a dimension attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub dimension: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FilterValue>),
}

impl Filter {
    pub fn new(dimension: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            dimension: dimension.into(),
            op,
            value,
        }
    }

    pub fn eq(dimension: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(dimension, FilterOp::Eq, value.into())
    }

    pub fn in_list<V: Into<FilterValue>>(
        dimension: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            dimension,
            FilterOp::In,
            FilterValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn is_null(dimension: impl Into<String>) -> Self {
        Self::new(dimension, FilterOp::IsNull, FilterValue::Null)
    }

    /// Apply this filter to the column holding the dimension.
    pub fn to_expr(&self, column: Expr) -> SemanticResult<Expr> {
        let invalid = |reason: &str| SemanticError::InvalidFilter {
            filter: self.to_string(),
            reason: reason.to_string(),
        };

        let scalar = || scalar_expr(&self.value).map_err(invalid);

        let expr = match self.op {
            FilterOp::IsNull => column.is_null(),
            FilterOp::IsNotNull => column.is_not_null(),
            FilterOp::In | FilterOp::NotIn => {
                let FilterValue::List(values) = &self.value else {
                    return Err(invalid("IN needs a list of values"));
                };
                let values = values
                    .iter()
                    .map(|v| match v {
                        FilterValue::List(_) => Err(invalid("nested lists are not supported")),
                        v => scalar_expr(v).map_err(invalid),
                    })
                    .collect::<SemanticResult<Vec<_>>>()?;
                Expr::In {
                    expr: Box::new(column),
                    values,
                    negated: self.op == FilterOp::NotIn,
                }
            }
            FilterOp::Eq => column.eq(scalar()?),
            FilterOp::Ne => column.ne(scalar()?),
            FilterOp::Gt => column.gt(scalar()?),
            FilterOp::Gte => column.gte(scalar()?),
            FilterOp::Lt => column.lt(scalar()?),
            FilterOp::Lte => column.lte(scalar()?),
            FilterOp::Like => column.like(scalar()?),
        };
        Ok(expr)
    }
}

fn scalar_expr(value: &FilterValue) -> Result<Expr, &'static str> {
    match value {
        FilterValue::Null => Ok(lit_null()),
        FilterValue::Bool(b) => Ok(lit_bool(*b)),
        FilterValue::Int(n) => Ok(lit_int(*n)),
        FilterValue::Float(f) if !f.is_finite() => {
            Err("NaN and infinite values cannot be written as SQL")
        }
        FilterValue::Float(f) => Ok(lit_float(*f)),
        FilterValue::String(s) => Ok(lit_str(s)),
        FilterValue::List(_) => Err("only IN and NOT IN accept a list of values"),
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Int(n)
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        FilterValue::Float(f)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

// =============================================================================
// Parsing
// =============================================================================

impl FromStr for Filter {
    type Err = SemanticError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| SemanticError::InvalidFilter {
            filter: text.to_string(),
            reason,
        };

        let dialect = GenericDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(text)
            .map_err(|e| invalid(e.to_string()))?;
        let expr = parser.parse_expr().map_err(|e| invalid(e.to_string()))?;
        if parser.peek_token().token != SqlToken::EOF {
            return Err(invalid("unexpected input after the predicate".into()));
        }

        let (column, op, value) = match expr {
            SqlExpr::BinaryOp { left, op, right } => {
                let op = match op {
                    SqlBinaryOperator::Eq => FilterOp::Eq,
                    SqlBinaryOperator::NotEq => FilterOp::Ne,
                    SqlBinaryOperator::Gt => FilterOp::Gt,
                    SqlBinaryOperator::GtEq => FilterOp::Gte,
                    SqlBinaryOperator::Lt => FilterOp::Lt,
                    SqlBinaryOperator::LtEq => FilterOp::Lte,
                    other => return Err(invalid(format!("unsupported operator {}", other))),
                };
                (*left, op, parse_value(&right).map_err(&invalid)?)
            }
            SqlExpr::Like {
                negated: false,
                expr,
                pattern,
                ..
            } => (*expr, FilterOp::Like, parse_value(&pattern).map_err(&invalid)?),
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                let values = list
                    .iter()
                    .map(parse_value)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(&invalid)?;
                let op = if negated { FilterOp::NotIn } else { FilterOp::In };
                (*expr, op, FilterValue::List(values))
            }
            SqlExpr::IsNull(expr) => (*expr, FilterOp::IsNull, FilterValue::Null),
            SqlExpr::IsNotNull(expr) => (*expr, FilterOp::IsNotNull, FilterValue::Null),
            other => {
                return Err(invalid(format!(
                    "expected `<dimension> <op> <value>`, got {}",
                    other
                )))
            }
        };

        let dimension = match column {
            SqlExpr::Identifier(ident) => ident.value,
            SqlExpr::CompoundIdentifier(parts) => parts
                .into_iter()
                .map(|ident| ident.value)
                .collect::<Vec<_>>()
                .join("."),
            other => {
                return Err(invalid(format!(
                    "left side must be a dimension name, got {}",
                    other
                )))
            }
        };

        Ok(Filter::new(dimension, op, value))
    }
}

fn parse_value(expr: &SqlExpr) -> Result<FilterValue, String> {
    match expr {
        SqlExpr::Value(value) => match value {
            SqlValue::Null => Ok(FilterValue::Null),
            SqlValue::Boolean(b) => Ok(FilterValue::Bool(*b)),
            SqlValue::SingleQuotedString(s) => Ok(FilterValue::String(s.clone())),
            SqlValue::Number(n, _) => parse_number(n),
            other => Err(format!("unsupported literal {}", other)),
        },
        SqlExpr::UnaryOp {
            op: SqlUnaryOperator::Minus,
            expr,
        } => match parse_value(expr)? {
            FilterValue::Int(n) => Ok(FilterValue::Int(-n)),
            FilterValue::Float(f) => Ok(FilterValue::Float(-f)),
            _ => Err(format!("cannot negate {}", expr)),
        },
        SqlExpr::Nested(inner) => parse_value(inner),
        other => Err(format!("expected a literal value, got {}", other)),
    }
}

fn parse_number(text: &str) -> Result<FilterValue, String> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(FilterValue::Int(n));
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(FilterValue::Float(f)),
        _ => Err(format!("invalid number {}", text)),
    }
}

// =============================================================================
// Display
// =============================================================================

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => "LIKE",
            FilterOp::In => "IN",
            FilterOp::NotIn => "NOT IN",
            FilterOp::IsNull => "IS NULL",
            FilterOp::IsNotNull => "IS NOT NULL",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Null => write!(f, "NULL"),
            FilterValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            FilterValue::Int(n) => write!(f, "{}", n),
            FilterValue::Float(x) => write!(f, "{}", x),
            FilterValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            FilterValue::List(values) => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "({})", items.join(", "))
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            FilterOp::IsNull | FilterOp::IsNotNull => write!(f, "{} {}", self.dimension, self.op),
            _ => write!(f, "{} {} {}", self.dimension, self.op, self.value),
        }
    }
}

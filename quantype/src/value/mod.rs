//! Runtime values and the value-function protocol

pub mod builtins;
pub mod explanation;
pub mod function;

pub use builtins::{FunctionDefinition, FunctionRegistry};
pub use explanation::{Explanation, ExplanationLocation, Recorded};
pub use function::{CallState, ValueFunction};

use crate::types::DateTimeGranularity;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A date or time value at one of the supported granularities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "granularity", content = "value", rename_all = "snake_case")]
pub enum TemporalValue {
    Date(NaiveDate),
    YearMonth { year: i32, month: u32 },
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeZoned(DateTime<FixedOffset>),
}

impl TemporalValue {
    pub fn granularity(&self) -> DateTimeGranularity {
        match self {
            TemporalValue::Date(_) => DateTimeGranularity::YearMonthDay,
            TemporalValue::YearMonth { .. } => DateTimeGranularity::YearMonth,
            TemporalValue::Time(_) => DateTimeGranularity::TimeOfDay,
            TemporalValue::DateTime(_) => DateTimeGranularity::DateTime,
            TemporalValue::DateTimeZoned(_) => DateTimeGranularity::DateTimeZoned,
        }
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            TemporalValue::YearMonth { year, month } => write!(f, "{:04}-{:02}", year, month),
            TemporalValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            TemporalValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            TemporalValue::DateTimeZoned(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// A runtime value.
///
/// Numbers do not carry their unit: the unit is part of the checked type of
/// the expression that produced the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Number(Decimal),
    Text(String),
    Boolean(bool),
    Temporal(TemporalValue),
    Tagged {
        tag: String,
        inner: Option<Box<Value>>,
    },
    Record(BTreeMap<String, Value>),
    Tuple(Vec<Value>),
    List(Vec<Value>),
}

impl Value {
    pub fn number(n: impl Into<Decimal>) -> Self {
        Value::Number(n.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn tag(tag: impl Into<String>, inner: Option<Value>) -> Self {
        Value::Tagged {
            tag: tag.into(),
            inner: inner.map(Box::new),
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Temporal(_) => "date/time",
            Value::Tagged { .. } => "tagged",
            Value::Record(_) => "record",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Temporal(t) => write!(f, "{}", t),
            Value::Tagged { tag, inner: None } => write!(f, "{}", tag),
            Value::Tagged {
                tag,
                inner: Some(inner),
            } => write!(f, "{}({})", tag, inner),
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
        }
    }
}

//! Expression tree consumed by the checker and the evaluator
//!
//! Trees are produced by an external parser. Every node carries an
//! [`ExpressionId`] so that checked types and explanations can refer back
//! to it; [`ExpressionBuilder`] hands out ids while building a tree.

use crate::units::UnitExpression;
use crate::value::TemporalValue;
use rust_decimal::Decimal;
use std::fmt;

/// Unique identifier for each expression in a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpressionId(u64);

impl ExpressionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expr_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub id: ExpressionId,
}

impl Expression {
    pub fn new(kind: ExpressionKind, id: ExpressionId) -> Self {
        Self { kind, id }
    }

    /// Direct sub-expressions, in evaluation order.
    pub fn children(&self) -> Vec<&Expression> {
        match &self.kind {
            ExpressionKind::Number { .. }
            | ExpressionKind::Text(_)
            | ExpressionKind::Boolean(_)
            | ExpressionKind::Temporal(_)
            | ExpressionKind::Column(_)
            | ExpressionKind::EntireColumn(_) => Vec::new(),
            ExpressionKind::List(items) | ExpressionKind::Tuple(items) => items.iter().collect(),
            ExpressionKind::Record(fields) => fields.iter().map(|(_, e)| e).collect(),
            ExpressionKind::Tag { inner, .. } => inner.iter().map(|e| e.as_ref()).collect(),
            ExpressionKind::Arithmetic(l, _, r) | ExpressionKind::Comparison(l, _, r) => {
                vec![l.as_ref(), r.as_ref()]
            }
            ExpressionKind::Raise(base, _) => vec![base.as_ref()],
            ExpressionKind::If {
                condition,
                then,
                otherwise,
            } => vec![condition.as_ref(), then.as_ref(), otherwise.as_ref()],
            ExpressionKind::Call { args, .. } => args.iter().collect(),
            ExpressionKind::ConvertUnit { value, .. } => vec![value.as_ref()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl ComparisonOperator {
    /// Whether the operator needs an ordering rather than just equality.
    pub fn is_ordering(self) -> bool {
        !matches!(self, ComparisonOperator::Equal | ComparisonOperator::NotEqual)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Number literal; without a unit it is dimensionless
    Number {
        value: Decimal,
        unit: Option<UnitExpression>,
    },
    Text(String),
    Boolean(bool),
    Temporal(TemporalValue),
    /// Value of a column in the current row
    Column(String),
    /// Every value of a column, as a list
    EntireColumn(String),
    List(Vec<Expression>),
    Tuple(Vec<Expression>),
    Record(Vec<(String, Expression)>),
    /// Tag construction such as `Is(3)`; the type is inferred when not named
    Tag {
        type_name: Option<String>,
        tag: String,
        inner: Option<Box<Expression>>,
    },
    Arithmetic(Box<Expression>, ArithmeticOperator, Box<Expression>),
    /// Raise to a whole-number power written in the source
    Raise(Box<Expression>, i32),
    Comparison(Box<Expression>, ComparisonOperator, Box<Expression>),
    If {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
    Call {
        function: String,
        args: Vec<Expression>,
    },
    ConvertUnit {
        value: Box<Expression>,
        target: UnitExpression,
    },
}

/// Builds expression trees with unique ids.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    next_id: u64,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ExpressionId {
        let id = ExpressionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn build(&mut self, kind: ExpressionKind) -> Expression {
        Expression::new(kind, self.next_id())
    }

    pub fn number(&mut self, value: impl Into<Decimal>) -> Expression {
        self.build(ExpressionKind::Number {
            value: value.into(),
            unit: None,
        })
    }

    pub fn quantity(&mut self, value: impl Into<Decimal>, unit: UnitExpression) -> Expression {
        self.build(ExpressionKind::Number {
            value: value.into(),
            unit: Some(unit),
        })
    }

    pub fn text(&mut self, value: impl Into<String>) -> Expression {
        self.build(ExpressionKind::Text(value.into()))
    }

    pub fn boolean(&mut self, value: bool) -> Expression {
        self.build(ExpressionKind::Boolean(value))
    }

    pub fn temporal(&mut self, value: TemporalValue) -> Expression {
        self.build(ExpressionKind::Temporal(value))
    }

    pub fn column(&mut self, name: impl Into<String>) -> Expression {
        self.build(ExpressionKind::Column(name.into()))
    }

    pub fn entire_column(&mut self, name: impl Into<String>) -> Expression {
        self.build(ExpressionKind::EntireColumn(name.into()))
    }

    pub fn list(&mut self, items: Vec<Expression>) -> Expression {
        self.build(ExpressionKind::List(items))
    }

    pub fn tuple(&mut self, items: Vec<Expression>) -> Expression {
        self.build(ExpressionKind::Tuple(items))
    }

    pub fn record(&mut self, fields: Vec<(&str, Expression)>) -> Expression {
        self.build(ExpressionKind::Record(
            fields
                .into_iter()
                .map(|(name, e)| (name.to_string(), e))
                .collect(),
        ))
    }

    pub fn tag(&mut self, tag: impl Into<String>, inner: Option<Expression>) -> Expression {
        self.build(ExpressionKind::Tag {
            type_name: None,
            tag: tag.into(),
            inner: inner.map(Box::new),
        })
    }

    pub fn typed_tag(
        &mut self,
        type_name: impl Into<String>,
        tag: impl Into<String>,
        inner: Option<Expression>,
    ) -> Expression {
        self.build(ExpressionKind::Tag {
            type_name: Some(type_name.into()),
            tag: tag.into(),
            inner: inner.map(Box::new),
        })
    }

    pub fn arithmetic(
        &mut self,
        left: Expression,
        op: ArithmeticOperator,
        right: Expression,
    ) -> Expression {
        self.build(ExpressionKind::Arithmetic(Box::new(left), op, Box::new(right)))
    }

    pub fn raise(&mut self, base: Expression, power: i32) -> Expression {
        self.build(ExpressionKind::Raise(Box::new(base), power))
    }

    pub fn comparison(
        &mut self,
        left: Expression,
        op: ComparisonOperator,
        right: Expression,
    ) -> Expression {
        self.build(ExpressionKind::Comparison(Box::new(left), op, Box::new(right)))
    }

    pub fn if_then_else(
        &mut self,
        condition: Expression,
        then: Expression,
        otherwise: Expression,
    ) -> Expression {
        self.build(ExpressionKind::If {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    pub fn call(&mut self, function: impl Into<String>, args: Vec<Expression>) -> Expression {
        self.build(ExpressionKind::Call {
            function: function.into(),
            args,
        })
    }

    pub fn convert(&mut self, value: Expression, target: UnitExpression) -> Expression {
        self.build(ExpressionKind::ConvertUnit {
            value: Box::new(value),
            target,
        })
    }
}

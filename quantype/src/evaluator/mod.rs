//! Evaluation of checked expressions
//!
//! Walks a [`CheckedExpression`] for one row of a [`ColumnSource`]. In
//! recording mode every node also produces an [`Explanation`], and a node
//! whose value is exactly a stored value (a cell, a whole column, the element
//! picked by `element`) carries that location as its `result_is`.

pub mod operations;
pub mod table;

pub use table::{ColumnSource, TableData};

use crate::checker::{CheckedExpression, Expression, ExpressionId, ExpressionKind};
use crate::error::{EngineError, EngineResult};
use crate::types::DataType;
use crate::units::{Unit, UnitManager};
use crate::value::builtins::ConvertUnit;
use crate::value::{
    Explanation, ExplanationLocation, FunctionRegistry, Recorded, Value, ValueFunction,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::trace;

pub struct Evaluator<'a> {
    units: &'a UnitManager,
    functions: &'a FunctionRegistry,
    source: &'a dyn ColumnSource,
}

/// Everything needed during evaluation of one expression for one row.
struct EvaluationContext<'c> {
    checked: &'c CheckedExpression,
    row: usize,
    record: bool,
}

/// Result of evaluating one node.
struct Evaluated {
    value: Value,
    location: Option<ExplanationLocation>,
    explanation: Option<Explanation>,
}

impl Evaluated {
    fn number(&self) -> EngineResult<Decimal> {
        self.value.as_number().ok_or_else(|| {
            EngineError::internal(format!("expected a number, found {}", self.value.kind()))
        })
    }
}

impl<'a> Evaluator<'a> {
    pub fn new(
        units: &'a UnitManager,
        functions: &'a FunctionRegistry,
        source: &'a dyn ColumnSource,
    ) -> Self {
        Self {
            units,
            functions,
            source,
        }
    }

    pub fn evaluate(&self, checked: &CheckedExpression, row: usize) -> EngineResult<Value> {
        let context = EvaluationContext {
            checked,
            row,
            record: false,
        };
        Ok(self.eval(&context, &checked.expression)?.value)
    }

    /// Evaluate and explain how the result was obtained.
    pub fn evaluate_record(
        &self,
        checked: &CheckedExpression,
        row: usize,
    ) -> EngineResult<Recorded<Value>> {
        let context = EvaluationContext {
            checked,
            row,
            record: true,
        };
        let evaluated = self.eval(&context, &checked.expression)?;
        let explanation = evaluated
            .explanation
            .ok_or_else(|| EngineError::internal("recorded evaluation without explanation"))?;
        Ok(Recorded::new(evaluated.value, explanation))
    }

    fn eval(&self, context: &EvaluationContext, expr: &Expression) -> EngineResult<Evaluated> {
        match &expr.kind {
            ExpressionKind::Number { value, .. } => {
                let description = self.number_text(context, expr.id, *value);
                Ok(leaf(context, description, Value::Number(*value), None))
            }
            ExpressionKind::Text(text) => {
                let value = Value::Text(text.clone());
                Ok(leaf(context, value.to_string(), value, None))
            }
            ExpressionKind::Boolean(b) => Ok(leaf(context, b.to_string(), Value::Boolean(*b), None)),
            ExpressionKind::Temporal(t) => {
                Ok(leaf(context, t.to_string(), Value::Temporal(t.clone()), None))
            }
            ExpressionKind::Column(name) => {
                let value = self
                    .source
                    .column_value(name, context.row)
                    .ok_or_else(|| {
                        EngineError::evaluation(format!(
                            "column '{}' has no value in row {}",
                            name, context.row
                        ))
                    })?;
                let location =
                    ExplanationLocation::cell(self.source.table_name(), name.clone(), context.row);
                Ok(leaf(context, name.clone(), value, Some(location)))
            }
            ExpressionKind::EntireColumn(name) => {
                let values = self.source.column_values(name).ok_or_else(|| {
                    EngineError::evaluation(format!("column '{}' has no values", name))
                })?;
                let location = ExplanationLocation::column(self.source.table_name(), name.clone());
                Ok(leaf(
                    context,
                    format!("entire column {}", name),
                    Value::List(values),
                    Some(location),
                ))
            }
            ExpressionKind::List(items) => {
                let parts = self.eval_all(context, items.iter())?;
                let value = Value::List(parts.iter().map(|p| p.value.clone()).collect());
                Ok(node(context, || value.to_string(), value.clone(), parts, None))
            }
            ExpressionKind::Tuple(items) => {
                let parts = self.eval_all(context, items.iter())?;
                let value = Value::Tuple(parts.iter().map(|p| p.value.clone()).collect());
                Ok(node(context, || value.to_string(), value.clone(), parts, None))
            }
            ExpressionKind::Record(fields) => {
                let parts = self.eval_all(context, fields.iter().map(|(_, e)| e))?;
                let value = Value::Record(
                    fields
                        .iter()
                        .map(|(name, _)| name.clone())
                        .zip(parts.iter().map(|p| p.value.clone()))
                        .collect::<BTreeMap<_, _>>(),
                );
                Ok(node(context, || value.to_string(), value.clone(), parts, None))
            }
            ExpressionKind::Tag { tag, inner, .. } => {
                let parts = match inner {
                    Some(inner) => vec![self.eval(context, inner)?],
                    None => Vec::new(),
                };
                let value = Value::tag(tag.clone(), parts.first().map(|p| p.value.clone()));
                Ok(node(context, || value.to_string(), value.clone(), parts, None))
            }
            ExpressionKind::Arithmetic(left, op, right) => {
                let l = self.eval(context, left)?;
                let r = self.eval(context, right)?;
                let (ln, rn) = (l.number()?, r.number()?);
                let result = operations::arithmetic(ln, *op, rn)?;
                let description = || {
                    format!(
                        "{} {} {} = {}",
                        self.number_text(context, left.id, ln),
                        op,
                        self.number_text(context, right.id, rn),
                        self.number_text(context, expr.id, result)
                    )
                };
                Ok(node(context, description, Value::Number(result), vec![l, r], None))
            }
            ExpressionKind::Raise(base, power) => {
                let b = self.eval(context, base)?;
                let bn = b.number()?;
                let result = operations::power(bn, *power)?;
                let description = || {
                    format!(
                        "{} ^ {} = {}",
                        self.number_text(context, base.id, bn),
                        power,
                        self.number_text(context, expr.id, result)
                    )
                };
                Ok(node(context, description, Value::Number(result), vec![b], None))
            }
            ExpressionKind::Comparison(left, op, right) => {
                let l = self.eval(context, left)?;
                let r = self.eval(context, right)?;
                let result = operations::compare(&l.value, *op, &r.value)?;
                let description = format!("{} {} {} is {}", l.value, op, r.value, result);
                Ok(node(context, || description, Value::Boolean(result), vec![l, r], None))
            }
            ExpressionKind::If {
                condition,
                then,
                otherwise,
            } => {
                let c = self.eval(context, condition)?;
                let holds = c.value.as_bool().ok_or_else(|| {
                    EngineError::internal(format!("condition evaluated to {}", c.value.kind()))
                })?;
                let branch = self.eval(context, if holds { then } else { otherwise })?;
                let value = branch.value.clone();
                let location = branch.location.clone();
                let description = format!(
                    "condition is {}, so the {} branch",
                    holds,
                    if holds { "then" } else { "else" }
                );
                Ok(node(context, || description, value, vec![c, branch], location))
            }
            ExpressionKind::Call { function, args } => {
                let definition = self.functions.get(function).ok_or_else(|| {
                    EngineError::internal(format!("call to unchecked function '{}'", function))
                })?;
                let parts = self.eval_all(context, args.iter())?;
                self.apply(context, definition.function.as_ref(), parts)
            }
            ExpressionKind::ConvertUnit { value, .. } => {
                let from = self.number_unit(context, value.id)?;
                let to = self.number_unit(context, expr.id)?;
                let conversion = ConvertUnit::new(self.units, from, to)?;
                let part = self.eval(context, value)?;
                self.apply(context, &conversion, vec![part])
            }
        }
    }

    fn eval_all<'e>(
        &self,
        context: &EvaluationContext,
        exprs: impl Iterator<Item = &'e Expression>,
    ) -> EngineResult<Vec<Evaluated>> {
        exprs.map(|e| self.eval(context, e)).collect()
    }

    fn apply(
        &self,
        context: &EvaluationContext,
        function: &dyn ValueFunction,
        parts: Vec<Evaluated>,
    ) -> EngineResult<Evaluated> {
        let args: Vec<Value> = parts.iter().map(|p| p.value.clone()).collect();
        if !context.record {
            let value = function.call(&args)?;
            return Ok(Evaluated {
                value,
                location: None,
                explanation: None,
            });
        }
        let locations: Vec<Option<ExplanationLocation>> =
            parts.iter().map(|p| p.location.clone()).collect();
        let recorded = function.call_record(&args, &locations)?;
        trace!(function = function.name(), result = %recorded.value, "recorded call");
        let location = recorded.explanation.result_is.clone();
        let children = parts.into_iter().filter_map(|p| p.explanation).collect();
        Ok(Evaluated {
            value: recorded.value,
            location,
            explanation: Some(recorded.explanation.with_children(children)),
        })
    }

    fn number_unit<'c>(
        &self,
        context: &EvaluationContext<'c>,
        id: ExpressionId,
    ) -> EngineResult<&'c Unit> {
        match context.checked.type_of(id) {
            Some(DataType::Number(unit)) => Ok(unit),
            other => Err(EngineError::internal(format!(
                "expected a number type for {}, found {:?}",
                id, other
            ))),
        }
    }

    /// A number as the user would write it in the unit of node `id`.
    fn number_text(&self, context: &EvaluationContext, id: ExpressionId, n: Decimal) -> String {
        match context.checked.type_of(id) {
            Some(DataType::Number(unit)) => self.units.display_value(&n.normalize(), unit),
            _ => n.normalize().to_string(),
        }
    }
}

fn leaf(
    context: &EvaluationContext,
    description: String,
    value: Value,
    location: Option<ExplanationLocation>,
) -> Evaluated {
    let explanation = context.record.then(|| {
        let mut explanation = Explanation::new(description, value.clone());
        explanation.result_is = location.clone();
        explanation
    });
    Evaluated {
        value,
        location,
        explanation,
    }
}

fn node(
    context: &EvaluationContext,
    description: impl FnOnce() -> String,
    value: Value,
    parts: Vec<Evaluated>,
    location: Option<ExplanationLocation>,
) -> Evaluated {
    let explanation = context.record.then(|| {
        let children = parts.into_iter().filter_map(|p| p.explanation).collect();
        let mut explanation =
            Explanation::new(description(), value.clone()).with_children(children);
        explanation.result_is = location.clone();
        explanation
    });
    Evaluated {
        value,
        location,
        explanation,
    }
}

//! Built-in value functions and their type signatures

use super::function::{CallState, ValueFunction};
use super::Value;
use crate::error::{EngineError, EngineResult};
use crate::typeexp::{TypeExp, TypeState};
use crate::units::{rational_parts, Unit, UnitManager};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A callable function: its type signature and its implementation.
///
/// The signature builder allocates fresh variables on every use, so each call
/// site gets its own instance of a polymorphic signature.
#[derive(Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub signature: fn(&mut TypeState) -> TypeExp,
    pub function: Arc<dyn ValueFunction>,
}

impl FunctionDefinition {
    pub fn new(
        name: impl Into<String>,
        signature: fn(&mut TypeState) -> TypeExp,
        function: Arc<dyn ValueFunction>,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            function,
        }
    }

    /// A fresh instance of the signature, as a `Function` type.
    pub fn instantiate(&self, state: &mut TypeState) -> TypeExp {
        (self.signature)(state)
    }
}

impl fmt::Debug for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDefinition")
            .field("name", &self.name)
            .field("function", &self.function)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionDefinition>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `element`, `single`, `count`, `sum` and `abs`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(FunctionDefinition::new(
            "element",
            |state| {
                let t = state.fresh_var();
                TypeExp::function(vec![TypeExp::list(t.clone()), TypeExp::scalar_number()], t)
            },
            Arc::new(Element),
        ));
        registry.register(FunctionDefinition::new(
            "single",
            |state| {
                let t = state.fresh_var();
                TypeExp::function(vec![TypeExp::list(t.clone())], t)
            },
            Arc::new(Single),
        ));
        registry.register(FunctionDefinition::new(
            "count",
            |state| {
                let t = state.fresh_var();
                TypeExp::function(vec![TypeExp::list(t)], TypeExp::scalar_number())
            },
            Arc::new(Count),
        ));
        registry.register(FunctionDefinition::new(
            "sum",
            |state| {
                let n = state.fresh_number();
                TypeExp::function(vec![TypeExp::list(n.clone())], n)
            },
            Arc::new(Sum),
        ));
        registry.register(FunctionDefinition::new(
            "abs",
            |state| {
                let n = state.fresh_number();
                TypeExp::function(vec![n.clone()], n)
            },
            Arc::new(Abs),
        ));
        registry
    }

    /// Add a function, replacing any function of the same name.
    pub fn register(&mut self, definition: FunctionDefinition) {
        self.functions.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

fn list_arg<'a>(state: &CallState<'a>, index: usize) -> EngineResult<&'a [Value]> {
    let value = state.arg(index)?;
    value.as_list().ok_or_else(|| {
        EngineError::internal(format!("expected a list argument, got {}", value.kind()))
    })
}

fn number_arg(state: &CallState<'_>, index: usize) -> EngineResult<Decimal> {
    let value = state.arg(index)?;
    value.as_number().ok_or_else(|| {
        EngineError::internal(format!("expected a number argument, got {}", value.kind()))
    })
}

/// Point the result at row `row` of the list argument's column, when the
/// list is a whole column; otherwise just note that the list was read.
fn link_to_row(state: &mut CallState<'_>, list_index: usize, row: usize) -> EngineResult<()> {
    if let Some(location) = state.arg_location(list_index)? {
        match location.row {
            None => state.result_is_location(location.with_row(row)),
            Some(_) => state.uses_location(location.clone()),
        }
    }
    Ok(())
}

/// `element(list, n)`: the n-th element, counting from 1.
#[derive(Debug)]
struct Element;

impl ValueFunction for Element {
    fn name(&self) -> &str {
        "element"
    }

    fn arity(&self) -> usize {
        2
    }

    fn evaluate(&self, state: &mut CallState<'_>) -> EngineResult<Value> {
        let items = list_arg(state, 0)?;
        let n = number_arg(state, 1)?;
        let position = (n.fract().is_zero())
            .then(|| n.to_usize())
            .flatten()
            .filter(|p| (1..=items.len()).contains(p))
            .ok_or_else(|| {
                EngineError::evaluation(format!(
                    "element {} does not exist in a list of {} element(s)",
                    n.normalize(),
                    items.len()
                ))
            })?;
        link_to_row(state, 0, position - 1)?;
        Ok(items[position - 1].clone())
    }
}

/// `single(list)`: the only element of a one-element list.
#[derive(Debug)]
struct Single;

impl ValueFunction for Single {
    fn name(&self) -> &str {
        "single"
    }

    fn arity(&self) -> usize {
        1
    }

    fn evaluate(&self, state: &mut CallState<'_>) -> EngineResult<Value> {
        match list_arg(state, 0)? {
            [only] => {
                link_to_row(state, 0, 0)?;
                Ok(only.clone())
            }
            _ => Err(EngineError::evaluation("list must be of size 1")),
        }
    }
}

#[derive(Debug)]
struct Count;

impl ValueFunction for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn arity(&self) -> usize {
        1
    }

    fn evaluate(&self, state: &mut CallState<'_>) -> EngineResult<Value> {
        let items = list_arg(state, 0)?;
        if let Some(location) = state.arg_location(0)? {
            state.uses_location(location.clone());
        }
        Ok(Value::Number(Decimal::from(items.len())))
    }
}

#[derive(Debug)]
struct Sum;

impl ValueFunction for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn arity(&self) -> usize {
        1
    }

    fn evaluate(&self, state: &mut CallState<'_>) -> EngineResult<Value> {
        let items = list_arg(state, 0)?;
        let mut total = Decimal::ZERO;
        for item in items {
            let n = item.as_number().ok_or_else(|| {
                EngineError::internal(format!("cannot sum a {} element", item.kind()))
            })?;
            total = total
                .checked_add(n)
                .ok_or_else(|| EngineError::evaluation("sum overflows"))?;
        }
        if let Some(location) = state.arg_location(0)? {
            state.uses_location(location.clone());
        }
        Ok(Value::Number(total))
    }
}

#[derive(Debug)]
struct Abs;

impl ValueFunction for Abs {
    fn name(&self) -> &str {
        "abs"
    }

    fn arity(&self) -> usize {
        1
    }

    fn evaluate(&self, state: &mut CallState<'_>) -> EngineResult<Value> {
        Ok(Value::Number(number_arg(state, 0)?.abs()))
    }
}

/// Rescale a number from one unit to a convertible one.
///
/// The exact factor is applied as a multiplication followed by a division,
/// so `90 min` becomes exactly `1.5 hour`.
#[derive(Debug, Clone)]
pub struct ConvertUnit {
    from: Unit,
    to: Unit,
    numerator: Decimal,
    denominator: Decimal,
}

impl ConvertUnit {
    pub fn new(units: &UnitManager, from: &Unit, to: &Unit) -> EngineResult<Self> {
        let (numerator, denominator) = rational_parts(&units.convert_factor(from, to)?)?;
        Ok(Self {
            from: from.clone(),
            to: to.clone(),
            numerator,
            denominator,
        })
    }
}

impl ValueFunction for ConvertUnit {
    fn name(&self) -> &str {
        "convert unit"
    }

    fn arity(&self) -> usize {
        1
    }

    fn evaluate(&self, state: &mut CallState<'_>) -> EngineResult<Value> {
        let n = number_arg(state, 0)?;
        let converted = n
            .checked_mul(self.numerator)
            .and_then(|scaled| scaled.checked_div(self.denominator))
            .ok_or_else(|| {
                EngineError::evaluation(format!(
                    "converting {} {} to {} overflows",
                    n, self.from, self.to
                ))
            })?;
        state.describe(format!(
            "convert {} {} to {}",
            n.normalize(),
            self.from,
            self.to
        ));
        Ok(Value::Number(converted))
    }
}

//! # Quantype
//!
//! **Types and units for spreadsheet-style expressions**
//!
//! Quantype infers the types of expressions written against typed table
//! columns, checks their units of measure and evaluates them while keeping
//! track of where every value came from.
//!
//! ## Quick Start
//!
//! ```rust
//! use quantype::{
//!     ArithmeticOperator, DataType, EngineResult, Evaluator, ExpressionBuilder,
//!     FunctionRegistry, TableData, TypeChecker, TypeManager, UnitExpression, UnitManager, Value,
//! };
//!
//! fn main() -> EngineResult<()> {
//!     let units = UnitManager::with_builtin_units();
//!     let types = TypeManager::with_builtin_types();
//!     let functions = FunctionRegistry::with_builtins();
//!
//!     let metres = DataType::Number(units.get_unit("m")?);
//!     let table = TableData::new("runs")
//!         .with_column("distance", metres, vec![Value::number(1200)]);
//!
//!     // distance / 4 min
//!     let mut b = ExpressionBuilder::new();
//!     let distance = b.column("distance");
//!     let time = b.quantity(4, UnitExpression::named("min"));
//!     let speed = b.arithmetic(distance, ArithmeticOperator::Divide, time);
//!
//!     let checked = TypeChecker::new(&types, &units, &functions, &table).check(&speed, None)?;
//!     assert_eq!(checked.result_type.to_string(), "Number{m/min}");
//!
//!     let value = Evaluator::new(&units, &functions, &table).evaluate(&checked, 0)?;
//!     assert_eq!(value, Value::number(300));
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Units
//! A [`Unit`] is an exact rational scale times a product of named units
//! raised to integer powers. The [`UnitManager`] knows how declared units
//! relate, so values can be converted between compatible units.
//!
//! ### Type expressions
//! During checking every sub-expression gets a [`TypeExp`]. Type and unit
//! variables live in a [`TypeState`] and are solved by unification; numbers
//! unify their units over the group of units, so `m/s * s` is `m`.
//!
//! ### Concretisation
//! When checking ends, the [`TypeManager`] turns each type expression into a
//! [`DataType`], defaulting undetermined units to the scalar unit.
//!
//! ### Explanations
//! [`Evaluator::evaluate_record`] returns an [`Explanation`] tree next to
//! the value, naming the table cells the result was computed from.

pub mod checker;
pub mod error;
pub mod evaluator;
pub mod resource_limits;
pub mod typeexp;
pub mod types;
pub mod units;
pub mod value;

pub use checker::{
    ArithmeticOperator, CheckedExpression, ColumnTypes, ComparisonOperator, Expression,
    ExpressionBuilder, ExpressionId, ExpressionKind, TypeChecker,
};
pub use error::{
    ConcretisationError, EngineError, EngineResult, InternalError, TypeError, UnitError,
    UserError,
};
pub use evaluator::{ColumnSource, Evaluator, TableData};
pub use resource_limits::ResourceLimits;
pub use typeexp::{TypeCons, TypeExp, TypeState, TypeVarId, UnitVarId};
pub use types::{DataType, DateTimeGranularity, TagType, TaggedType, TypeManager, TypeTemplate};
pub use units::{
    SingleUnit, Unit, UnitDeclaration, UnitExp, UnitExpression, UnitManager, MAX_UNIT_EXPONENT,
};
pub use value::{
    CallState, Explanation, ExplanationLocation, FunctionRegistry, Recorded, TemporalValue,
    Value, ValueFunction,
};

#[cfg(test)]
mod tests;

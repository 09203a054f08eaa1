//! Type checking of expression trees
//!
//! The checker walks an [`Expression`] bottom-up, gives every node a
//! [`TypeExp`] and unifies them in one [`TypeState`]. Independent user errors
//! are collected rather than stopping at the first one. Once inference is
//! done every node is concretised into a [`DataType`].

pub mod expression;

pub use expression::{
    ArithmeticOperator, ComparisonOperator, Expression, ExpressionBuilder, ExpressionId,
    ExpressionKind,
};

use crate::error::{EngineError, EngineResult, UnitError, UserError};
use crate::resource_limits::ResourceLimits;
use crate::typeexp::{TypeExp, TypeState};
use crate::types::{DataType, TypeManager};
use crate::units::{Unit, UnitExp, UnitManager};
use crate::value::FunctionRegistry;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Declared types of the columns an expression may refer to.
pub trait ColumnTypes {
    fn column_type(&self, name: &str) -> Option<DataType>;
}

/// An expression whose every node has a concrete type.
#[derive(Debug, Clone)]
pub struct CheckedExpression {
    pub expression: Expression,
    pub result_type: DataType,
    node_types: HashMap<ExpressionId, DataType>,
}

impl CheckedExpression {
    pub fn type_of(&self, id: ExpressionId) -> Option<&DataType> {
        self.node_types.get(&id)
    }

    pub fn node_types(&self) -> &HashMap<ExpressionId, DataType> {
        &self.node_types
    }
}

pub struct TypeChecker<'a> {
    types: &'a TypeManager,
    units: &'a UnitManager,
    functions: &'a FunctionRegistry,
    columns: &'a dyn ColumnTypes,
    limits: ResourceLimits,
    allow_default: bool,
}

/// State of one check.
struct Pass {
    state: TypeState,
    node_exps: Vec<(ExpressionId, TypeExp)>,
    conversions: Vec<(ExpressionId, Unit)>,
    errors: Vec<UserError>,
}

impl Pass {
    fn report(&mut self, error: impl Into<UserError>) {
        let error = error.into();
        debug!(error = %error, "type error");
        self.errors.push(error);
    }

    /// Unify, reporting a failure and carrying on with a fresh variable.
    fn unify(&mut self, a: &TypeExp, b: &TypeExp) -> TypeExp {
        match self.state.unify(a, b) {
            Ok(unified) => unified,
            Err(err) => {
                self.report(err);
                self.state.fresh_var()
            }
        }
    }

    /// A number in `unit`, or in a fresh unit once the failure is reported.
    fn number(&mut self, unit: Result<UnitExp, UnitError>) -> TypeExp {
        match unit {
            Ok(unit) => TypeExp::Number(unit),
            Err(err) => {
                self.report(err);
                self.state.fresh_number()
            }
        }
    }
}

impl<'a> TypeChecker<'a> {
    pub fn new(
        types: &'a TypeManager,
        units: &'a UnitManager,
        functions: &'a FunctionRegistry,
        columns: &'a dyn ColumnTypes,
    ) -> Self {
        Self {
            types,
            units,
            functions,
            columns,
            limits: ResourceLimits::default(),
            allow_default: false,
        }
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Let ambiguous units fall back to their suggested type instead of failing.
    pub fn allow_default(mut self, allow: bool) -> Self {
        self.allow_default = allow;
        self
    }

    /// Check `expression`, optionally against the type its result must have.
    pub fn check(
        &self,
        expression: &Expression,
        expected: Option<&DataType>,
    ) -> EngineResult<CheckedExpression> {
        let mut pass = Pass {
            state: TypeState::new(self.limits.clone()),
            node_exps: Vec::new(),
            conversions: Vec::new(),
            errors: Vec::new(),
        };

        let root = self.infer(&mut pass, expression, 0)?;
        if let Some(expected) = expected {
            pass.unify(&root, &expected.to_type_exp());
        }
        if let Some(error) = UserError::from_list(std::mem::take(&mut pass.errors)) {
            return Err(error.into());
        }

        let mut node_types = HashMap::with_capacity(pass.node_exps.len());
        let mut errors: Vec<UserError> = Vec::new();
        for (id, exp) in &pass.node_exps {
            match self.types.concretise(&pass.state, exp, self.allow_default) {
                Ok(data_type) => {
                    node_types.insert(*id, data_type);
                }
                Err(EngineError::User(err)) => {
                    if !errors.contains(&err) {
                        errors.push(err);
                    }
                }
                Err(internal) => return Err(internal),
            }
        }

        for (value_id, target) in &pass.conversions {
            if let Some(DataType::Number(source)) = node_types.get(value_id) {
                if let Err(err) = self.units.convert_factor(source, target) {
                    errors.push(err.into());
                }
            }
        }
        if let Some(error) = UserError::from_list(errors) {
            return Err(error.into());
        }

        let result_type = node_types
            .get(&expression.id)
            .cloned()
            .ok_or_else(|| EngineError::internal("root expression has no type"))?;
        Ok(CheckedExpression {
            expression: expression.clone(),
            result_type,
            node_types,
        })
    }

    fn infer(&self, pass: &mut Pass, expr: &Expression, depth: usize) -> EngineResult<TypeExp> {
        if depth > self.limits.max_expression_depth {
            return Err(UserError::LimitExceeded {
                limit_name: "max_expression_depth".to_string(),
                limit: self.limits.max_expression_depth,
            }
            .into());
        }
        let exp = self.infer_kind(pass, expr, depth + 1)?;
        pass.node_exps.push((expr.id, exp.clone()));
        Ok(exp)
    }

    fn infer_kind(&self, pass: &mut Pass, expr: &Expression, depth: usize) -> EngineResult<TypeExp> {
        let exp = match &expr.kind {
            ExpressionKind::Number { unit, .. } => match unit {
                None => TypeExp::scalar_number(),
                Some(unit) => pass.number(self.units.resolve(unit).map(|u| UnitExp::from_unit(&u))),
            },
            ExpressionKind::Text(_) => TypeExp::text(),
            ExpressionKind::Boolean(_) => TypeExp::boolean(),
            ExpressionKind::Temporal(value) => {
                TypeExp::cons(value.granularity().cons_name(), Vec::new())
            }
            ExpressionKind::Column(name) => self.column(pass, name),
            ExpressionKind::EntireColumn(name) => TypeExp::list(self.column(pass, name)),
            ExpressionKind::List(items) => {
                let mut element = pass.state.fresh_var();
                for item in items {
                    let t = self.infer(pass, item, depth)?;
                    element = pass.unify(&element, &t);
                }
                TypeExp::list(element)
            }
            ExpressionKind::Tuple(items) => {
                let mut members = Vec::with_capacity(items.len());
                for item in items {
                    members.push(self.infer(pass, item, depth)?);
                }
                TypeExp::tuple(members)
            }
            ExpressionKind::Record(fields) => {
                let mut seen = BTreeSet::new();
                let mut typed = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    let t = self.infer(pass, value, depth)?;
                    if seen.insert(name.as_str()) {
                        typed.push((name.clone(), t));
                    } else {
                        pass.report(UserError::DuplicateField(name.clone()));
                    }
                }
                TypeExp::record(typed)
            }
            ExpressionKind::Tag {
                type_name,
                tag,
                inner,
            } => {
                let inner_type = match inner {
                    Some(inner) => Some(self.infer(pass, inner, depth)?),
                    None => None,
                };
                self.tag(pass, type_name.as_deref(), tag, inner_type)?
            }
            ExpressionKind::Arithmetic(left, op, right) => {
                let l = self.infer(pass, left, depth)?;
                let r = self.infer(pass, right, depth)?;
                match op {
                    ArithmeticOperator::Add | ArithmeticOperator::Subtract => {
                        let n = pass.state.fresh_number();
                        pass.unify(&n, &l);
                        pass.unify(&n, &r)
                    }
                    ArithmeticOperator::Multiply | ArithmeticOperator::Divide => {
                        let lu = UnitExp::var(pass.state.fresh_unit_var());
                        let ru = UnitExp::var(pass.state.fresh_unit_var());
                        pass.unify(&TypeExp::Number(lu.clone()), &l);
                        pass.unify(&TypeExp::Number(ru.clone()), &r);
                        let unit = if *op == ArithmeticOperator::Multiply {
                            lu.times(&ru)
                        } else {
                            lu.divide(&ru)
                        };
                        let resolved = unit.and_then(|unit| pass.state.resolve_unit(&unit));
                        pass.number(resolved)
                    }
                }
            }
            ExpressionKind::Raise(base, power) => {
                let b = self.infer(pass, base, depth)?;
                let unit = UnitExp::var(pass.state.fresh_unit_var());
                pass.unify(&TypeExp::Number(unit.clone()), &b);
                let raised = pass
                    .state
                    .resolve_unit(&unit)
                    .and_then(|unit| unit.raised_to(*power));
                pass.number(raised)
            }
            ExpressionKind::Comparison(left, _, right) => {
                let l = self.infer(pass, left, depth)?;
                let r = self.infer(pass, right, depth)?;
                pass.unify(&l, &r);
                TypeExp::boolean()
            }
            ExpressionKind::If {
                condition,
                then,
                otherwise,
            } => {
                let c = self.infer(pass, condition, depth)?;
                pass.unify(&c, &TypeExp::boolean());
                let t = self.infer(pass, then, depth)?;
                let o = self.infer(pass, otherwise, depth)?;
                pass.unify(&t, &o)
            }
            ExpressionKind::Call { function, args } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.infer(pass, arg, depth)?);
                }
                self.call(pass, function, &arg_types)?
            }
            ExpressionKind::ConvertUnit { value, target } => {
                let v = self.infer(pass, value, depth)?;
                let n = pass.state.fresh_number();
                pass.unify(&n, &v);
                match self.units.resolve(target) {
                    Ok(target) => {
                        pass.conversions.push((value.id, target.clone()));
                        TypeExp::Number(UnitExp::from_unit(&target))
                    }
                    Err(err) => {
                        pass.report(err);
                        pass.state.fresh_number()
                    }
                }
            }
        };
        Ok(exp)
    }

    fn column(&self, pass: &mut Pass, name: &str) -> TypeExp {
        match self.columns.column_type(name) {
            Some(data_type) => data_type.to_type_exp(),
            None => {
                pass.report(UserError::UnknownColumn(name.to_string()));
                pass.state.fresh_var()
            }
        }
    }

    /// Type of a tag construction.
    ///
    /// With several candidate types the result is an `Or` over
    /// `Tuple(candidate, payload)` pairs, unified with the tuple of a fresh
    /// result variable and the payload's inferred type, so that picking a
    /// candidate also constrains the payload.
    fn tag(
        &self,
        pass: &mut Pass,
        type_name: Option<&str>,
        tag: &str,
        inner: Option<TypeExp>,
    ) -> EngineResult<TypeExp> {
        let candidates = match type_name {
            Some(name) => match self.types.lookup_tagged(name) {
                Some(definition) if definition.tag(tag).is_some() => vec![definition],
                Some(_) => Vec::new(),
                None => {
                    pass.report(UserError::UnknownType(name.to_string()));
                    return Ok(pass.state.fresh_var());
                }
            },
            None => self.types.types_with_tag(tag),
        };
        if candidates.is_empty() {
            pass.report(UserError::UnknownTag(tag.to_string()));
            return Ok(pass.state.fresh_var());
        }

        let takes_value = inner.is_some();
        let mut options = Vec::new();
        for definition in candidates {
            let (result, args) = definition.instantiate(&mut pass.state);
            let payload = definition.inner_type(tag, &args)?;
            match (payload, &inner) {
                (Some(payload), Some(_)) => options.push(TypeExp::tuple(vec![result, payload])),
                (None, None) => options.push(result),
                _ => {}
            }
        }

        let Some(candidates) = TypeExp::or(options) else {
            pass.report(UserError::TagPayload {
                tag: tag.to_string(),
                takes_value: !takes_value,
            });
            return Ok(pass.state.fresh_var());
        };
        let result = pass.state.fresh_var();
        match inner {
            None => {
                pass.unify(&result, &candidates);
            }
            Some(inner) => {
                let unified =
                    pass.unify(&candidates, &TypeExp::tuple(vec![result.clone(), inner]));
                // several candidates still fit: the result is one of their types
                if let TypeExp::Or(pairs) = &unified {
                    let types = pairs
                        .iter()
                        .filter_map(|p| p.as_cons().and_then(|c| c.operands.first().cloned()))
                        .collect();
                    if let Some(types) = TypeExp::or(types) {
                        pass.unify(&result, &types);
                    }
                }
            }
        }
        Ok(result)
    }

    fn call(&self, pass: &mut Pass, name: &str, args: &[TypeExp]) -> EngineResult<TypeExp> {
        let Some(definition) = self.functions.get(name) else {
            pass.report(UserError::UnknownFunction(name.to_string()));
            return Ok(pass.state.fresh_var());
        };
        let signature = definition.instantiate(&mut pass.state);
        let Some(mut operands) = signature.as_cons().map(|c| c.operands.clone()) else {
            return Err(EngineError::internal(format!(
                "signature of '{}' is not a function type",
                name
            )));
        };
        let result = operands
            .pop()
            .ok_or_else(|| EngineError::internal(format!("signature of '{}' has no result", name)))?;
        if operands.len() != args.len() {
            pass.report(UserError::ArgumentCount {
                function: name.to_string(),
                expected: operands.len(),
                actual: args.len(),
            });
            return Ok(pass.state.fresh_var());
        }
        for (param, arg) in operands.iter().zip(args) {
            pass.unify(param, arg);
        }
        Ok(result)
    }
}

/// Shorthand for a one-off check with default limits.
pub fn check_expression(
    types: &TypeManager,
    units: &UnitManager,
    functions: &FunctionRegistry,
    columns: &dyn ColumnTypes,
    expression: &Expression,
) -> EngineResult<CheckedExpression> {
    TypeChecker::new(types, units, functions, columns).check(expression, None)
}

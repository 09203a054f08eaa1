//! Unification of type and unit expressions

use super::state::{Snapshot, TypeState};
use super::{TypeCons, TypeExp, TypeVarId, UnitVarId};
use crate::error::TypeError;
use crate::units::{rational_root, UnitAtom, UnitExp};
use num_rational::BigRational;
use num_traits::One;
use std::collections::BTreeMap;
use tracing::{debug, trace};

impl TypeState {
    /// Unify two type expressions, binding variables in this state.
    ///
    /// Returns the unified type. On failure the cells touched before the
    /// failing step keep their bindings; callers that need all-or-nothing
    /// behaviour snapshot the state first, as `Or` unification does.
    pub fn unify(&mut self, a: &TypeExp, b: &TypeExp) -> Result<TypeExp, TypeError> {
        self.unify_calls += 1;
        let bound = [self.chain_end(a), self.chain_end(b)];
        let a = self.prune(a)?;
        let b = self.prune(b)?;

        match (&a, &b) {
            (TypeExp::Var(x), TypeExp::Var(y)) => {
                if x != y {
                    self.bind_type(*x, TypeExp::Var(*y));
                }
                Ok(a)
            }
            (TypeExp::Var(var), other) | (other, TypeExp::Var(var)) => self.bind_var(*var, other),
            (TypeExp::Or(_), _) | (_, TypeExp::Or(_)) => {
                let unified = self.unify_options(&a, &b)?;
                // variables bound to either side now stand for the narrowed type
                for var in bound.into_iter().flatten() {
                    self.bind_type(var, unified.clone());
                }
                Ok(unified)
            }
            (TypeExp::Number(x), TypeExp::Number(y)) => {
                self.unify_units(x, y)?;
                Ok(TypeExp::Number(self.resolve_unit(x)?))
            }
            (TypeExp::Cons(x), TypeExp::Cons(y)) if x.same_shape(y) => {
                let mut operands = Vec::with_capacity(x.operands.len());
                for (left, right) in x.operands.iter().zip(&y.operands) {
                    operands.push(self.unify(left, right)?);
                }
                Ok(TypeExp::Cons(TypeCons {
                    name: x.name.clone(),
                    labels: x.labels.clone(),
                    operands,
                }))
            }
            _ => {
                let err = TypeError::Mismatch {
                    left: self.describe(&a),
                    right: self.describe(&b),
                };
                trace!(error = %err, "unification failed");
                Err(err)
            }
        }
    }

    fn bind_var(&mut self, var: TypeVarId, to: &TypeExp) -> Result<TypeExp, TypeError> {
        match self.without_var(var, to)? {
            Some(clean) => {
                self.bind_type(var, clean);
                Ok(TypeExp::Var(var))
            }
            None => Err(TypeError::Cyclic {
                var: var.to_string(),
                ty: self.describe(to),
            }),
        }
    }

    /// Occurs check: `exp` with every unavoidable occurrence of `var` removed.
    ///
    /// `None` means `var` cannot be eliminated. Options of an `Or` that
    /// mention `var` are dropped; the `Or` only fails when no option is left.
    pub fn without_var(
        &mut self,
        var: TypeVarId,
        exp: &TypeExp,
    ) -> Result<Option<TypeExp>, TypeError> {
        Ok(match self.prune(exp)? {
            TypeExp::Var(other) if other == var => None,
            TypeExp::Cons(cons) => {
                let mut operands = Vec::with_capacity(cons.operands.len());
                for operand in &cons.operands {
                    match self.without_var(var, operand)? {
                        Some(clean) => operands.push(clean),
                        None => return Ok(None),
                    }
                }
                Some(TypeExp::Cons(TypeCons { operands, ..cons }))
            }
            TypeExp::Or(options) => {
                let mut kept = Vec::with_capacity(options.len());
                for option in &options {
                    kept.extend(self.without_var(var, option)?);
                }
                TypeExp::or(kept)
            }
            pruned => Some(pruned),
        })
    }

    fn unify_options(&mut self, a: &TypeExp, b: &TypeExp) -> Result<TypeExp, TypeError> {
        let left = a.options();
        let right = b.options();
        let count = left.len().saturating_mul(right.len());
        let limit = self.limits.max_type_option_product;
        if count > limit {
            debug!(count, limit, "refusing to unify or-types");
            return Err(TypeError::TooManyOptions { count, limit });
        }

        let start = self.snapshot();
        let mut survivors: Vec<(TypeExp, Snapshot)> = Vec::new();
        for l in &left {
            for r in &right {
                match self.unify(l, r) {
                    Ok(unified) => match self.resolved(&unified) {
                        Ok(resolved) => {
                            if !survivors.iter().any(|(t, _)| *t == resolved) {
                                survivors.push((resolved, self.snapshot()));
                            }
                        }
                        Err(err) => trace!(left = %l, right = %r, error = %err, "option rejected"),
                    },
                    Err(err) => trace!(left = %l, right = %r, error = %err, "option rejected"),
                }
                self.restore(&start);
            }
        }

        match survivors.len() {
            0 => Err(TypeError::NoOptions {
                left: self.describe(a),
                right: self.describe(b),
            }),
            1 => {
                let (unified, bindings) = survivors.remove(0);
                self.restore(&bindings);
                Ok(unified)
            }
            _ => {
                let options = survivors.into_iter().map(|(t, _)| t).collect();
                // at least two distinct survivors
                Ok(TypeExp::or(options).unwrap_or_else(|| a.clone()))
            }
        }
    }

    /// Unify two unit expressions over the free abelian group of units.
    ///
    /// Solves `left / right = 1` one variable at a time. When the variable
    /// with the smallest exponent `e` divides every other exponent it is
    /// solved for directly; otherwise it is replaced by a fresh variable times
    /// the other factors raised to `-(k div e)`, which shrinks every remaining
    /// exponent below `|e|`.
    pub fn unify_units(&mut self, left: &UnitExp, right: &UnitExp) -> Result<(), TypeError> {
        let mismatch = |state: &TypeState| {
            let describe = |unit: &UnitExp| match state.resolve_unit(unit) {
                Ok(resolved) => resolved.to_string(),
                Err(_) => unit.to_string(),
            };
            TypeError::UnitMismatch {
                left: describe(left),
                right: describe(right),
            }
        };

        let mut residual = self.resolve_unit(&left.divide(right)?)?;
        loop {
            let Some((var, power)) = residual.vars().min_by_key(|(_, p)| p.abs()) else {
                return if residual.is_one() {
                    Ok(())
                } else {
                    Err(mismatch(self))
                };
            };
            let others: Vec<(UnitAtom, i32)> = residual
                .factors()
                .iter()
                .filter(|(atom, _)| **atom != UnitAtom::Var(var))
                .map(|(atom, p)| (atom.clone(), *p))
                .collect();

            if others.iter().all(|(_, p)| p % power == 0) {
                // var^e * S * prod(x^k) = 1  =>  var = S^(-1/e) * prod(x^(-k/e))
                let Some(root) = rational_root(residual.scale(), power.unsigned_abs()) else {
                    return Err(mismatch(self));
                };
                let scale = if power > 0 { root.recip() } else { root };
                let factors = others
                    .into_iter()
                    .map(|(atom, p)| (atom, -p / power))
                    .collect();
                let solution = UnitExp::from_parts(scale, factors);
                self.bind_unit_var(var, solution);
                return Ok(());
            }

            if residual.vars().count() == 1 {
                return Err(mismatch(self));
            }

            let fresh = self.fresh_unit_var();
            let mut factors = BTreeMap::new();
            factors.insert(UnitAtom::Var(fresh), 1);
            for (atom, p) in &others {
                let quotient = p.div_euclid(power);
                if quotient != 0 {
                    factors.insert(atom.clone(), -quotient);
                }
            }
            let step = UnitExp::from_parts(BigRational::one(), factors);
            residual = residual.substitute(var, &step)?;
            self.bind_unit_var(var, step);
        }
    }

    fn bind_unit_var(&mut self, var: UnitVarId, to: UnitExp) {
        trace!(var = %var, unit = %to, "bound unit variable");
        self.bind_unit(var, to);
    }
}

//! Unit expressions that may contain unit variables
//!
//! A [`UnitExp`] is the type-level counterpart of [`Unit`]: a product of
//! atoms raised to integer powers, where an atom is either a concrete
//! [`SingleUnit`] or a unit variable awaiting unification.

use super::{add_power, check_power, render_factors, scaled_power, SingleUnit, Unit};
use crate::error::UnitError;
use crate::typeexp::UnitVarId;
use num_rational::BigRational;
use num_traits::One;
use std::collections::BTreeMap;
use std::fmt;

/// A factor of a unit expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitAtom {
    Var(UnitVarId),
    Single(SingleUnit),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitExp {
    scale: BigRational,
    factors: BTreeMap<UnitAtom, i32>,
}

impl UnitExp {
    pub fn scalar() -> Self {
        Self {
            scale: BigRational::one(),
            factors: BTreeMap::new(),
        }
    }

    pub fn var(var: UnitVarId) -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(UnitAtom::Var(var), 1);
        Self {
            scale: BigRational::one(),
            factors,
        }
    }

    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            scale: unit.scale().clone(),
            factors: unit
                .units()
                .iter()
                .map(|(u, p)| (UnitAtom::Single(u.clone()), *p))
                .collect(),
        }
    }

    pub(crate) fn from_parts(scale: BigRational, factors: BTreeMap<UnitAtom, i32>) -> Self {
        Self { scale, factors }
    }

    pub fn scale(&self) -> &BigRational {
        &self.scale
    }

    pub fn factors(&self) -> &BTreeMap<UnitAtom, i32> {
        &self.factors
    }

    /// The unit variables appearing in this expression, with their powers.
    pub fn vars(&self) -> impl Iterator<Item = (UnitVarId, i32)> + '_ {
        self.factors.iter().filter_map(|(atom, p)| match atom {
            UnitAtom::Var(v) => Some((*v, *p)),
            UnitAtom::Single(_) => None,
        })
    }

    pub fn contains_var(&self, var: UnitVarId) -> bool {
        self.factors.contains_key(&UnitAtom::Var(var))
    }

    pub fn is_ground(&self) -> bool {
        self.vars().next().is_none()
    }

    /// True when every factor is a variable (there is no concrete unit to keep).
    pub fn is_only_vars(&self) -> bool {
        self.factors
            .keys()
            .all(|atom| matches!(atom, UnitAtom::Var(_)))
    }

    /// Identity element: scale one, no factors.
    pub fn is_one(&self) -> bool {
        self.factors.is_empty() && self.scale.is_one()
    }

    /// The concrete unit, when no variables remain.
    pub fn to_unit(&self) -> Option<Unit> {
        let mut singles = Vec::with_capacity(self.factors.len());
        for (atom, power) in &self.factors {
            match atom {
                UnitAtom::Single(u) => singles.push((u.clone(), *power)),
                UnitAtom::Var(_) => return None,
            }
        }
        Some(Unit::from_normal_parts(
            self.scale.clone(),
            singles.into_iter().collect(),
        ))
    }

    /// The concrete unit obtained by defaulting every variable to the scalar unit.
    pub fn without_vars(&self) -> Unit {
        Unit::from_normal_parts(
            self.scale.clone(),
            self.factors
                .iter()
                .filter_map(|(atom, p)| match atom {
                    UnitAtom::Single(u) => Some((u.clone(), *p)),
                    UnitAtom::Var(_) => None,
                })
                .collect(),
        )
    }

    pub fn times(&self, other: &UnitExp) -> Result<UnitExp, UnitError> {
        let mut factors = self.factors.clone();
        for (atom, power) in &other.factors {
            add_power(&mut factors, atom.clone(), *power)?;
        }
        Ok(UnitExp {
            scale: &self.scale * &other.scale,
            factors,
        })
    }

    pub fn divide(&self, other: &UnitExp) -> Result<UnitExp, UnitError> {
        let mut factors = self.factors.clone();
        for (atom, power) in &other.factors {
            add_power(&mut factors, atom.clone(), -*power)?;
        }
        Ok(UnitExp {
            scale: &self.scale / &other.scale,
            factors,
        })
    }

    pub fn raised_to(&self, power: i32) -> Result<UnitExp, UnitError> {
        if power == 0 {
            return Err(UnitError::RaisedToZero);
        }
        self.powered(power)
    }

    fn powered(&self, power: i32) -> Result<UnitExp, UnitError> {
        let factors = self
            .factors
            .iter()
            .map(|(atom, p)| Ok((atom.clone(), scaled_power(*p, power)?)))
            .collect::<Result<_, UnitError>>()?;
        check_power(i64::from(power))?;
        Ok(UnitExp {
            scale: self.scale.pow(power),
            factors,
        })
    }

    /// Replace `var` by `replacement` everywhere it occurs.
    pub fn substitute(&self, var: UnitVarId, replacement: &UnitExp) -> Result<UnitExp, UnitError> {
        let Some(power) = self.factors.get(&UnitAtom::Var(var)).copied() else {
            return Ok(self.clone());
        };
        let mut rest = self.clone();
        rest.factors.remove(&UnitAtom::Var(var));
        rest.times(&replacement.powered(power)?)
    }
}

impl From<&Unit> for UnitExp {
    fn from(unit: &Unit) -> Self {
        UnitExp::from_unit(unit)
    }
}

impl fmt::Display for UnitAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitAtom::Var(v) => write!(f, "{}", v),
            UnitAtom::Single(u) => write!(f, "{}", u),
        }
    }
}

impl fmt::Display for UnitExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_factors(
            f,
            &self.scale,
            self.factors.iter().map(|(atom, p)| (atom.to_string(), *p)),
        )
    }
}

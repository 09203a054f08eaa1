//! Unit registry
//!
//! Holds every declared [`SingleUnit`] together with its optional equivalence
//! to other units, resolves parsed unit expressions and canonicalises units
//! down to base units for conversion.

use super::{rational_to_decimal, SingleUnit, Unit};
use crate::error::UnitError;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Declaration of a single unit, optionally defined in terms of other units.
///
/// `equivalent = Some((r, u))` reads "1 of this unit = r × u".
#[derive(Debug, Clone, PartialEq)]
pub struct UnitDeclaration {
    unit: SingleUnit,
    equivalent: Option<(BigRational, Unit)>,
    category: String,
}

impl UnitDeclaration {
    pub fn base(unit: SingleUnit, category: impl Into<String>) -> Self {
        Self {
            unit,
            equivalent: None,
            category: category.into(),
        }
    }

    pub fn derived(
        unit: SingleUnit,
        factor: BigRational,
        equivalent: Unit,
        category: impl Into<String>,
    ) -> Self {
        Self {
            unit,
            equivalent: Some((factor, equivalent)),
            category: category.into(),
        }
    }

    pub fn unit(&self) -> &SingleUnit {
        &self.unit
    }

    pub fn equivalent(&self) -> Option<&(BigRational, Unit)> {
        self.equivalent.as_ref()
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// A parsed unit expression, as produced by an external unit parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitExpression {
    /// The literal `1`
    Scalar,
    Named(String),
    Times(Vec<UnitExpression>),
    Divide(Box<UnitExpression>, Box<UnitExpression>),
    /// Raise to a power written in the source, e.g. `m^2`; the text is validated on resolution.
    Raise(Box<UnitExpression>, String),
}

impl UnitExpression {
    pub fn named(name: impl Into<String>) -> Self {
        UnitExpression::Named(name.into())
    }

    pub fn times(parts: Vec<UnitExpression>) -> Self {
        UnitExpression::Times(parts)
    }

    pub fn divide(numerator: UnitExpression, denominator: UnitExpression) -> Self {
        UnitExpression::Divide(Box::new(numerator), Box::new(denominator))
    }

    pub fn raise(base: UnitExpression, power: impl Into<String>) -> Self {
        UnitExpression::Raise(Box::new(base), power.into())
    }
}

/// Registry of unit declarations for one document.
#[derive(Debug, Clone, Default)]
pub struct UnitManager {
    declarations: BTreeMap<String, UnitDeclaration>,
}

// name, description, prefix, suffix, category
const BASE_UNITS: &[(&str, &str, &str, &str, &str)] = &[
    ("m", "metre", "", "", "Length"),
    ("s", "second", "", "", "Time"),
    ("kg", "kilogram", "", "", "Mass"),
    ("A", "ampere", "", "", "Electric current"),
    ("K", "kelvin", "", "", "Temperature"),
    ("mol", "mole", "", "", "Amount of substance"),
    ("cd", "candela", "", "", "Luminous intensity"),
    ("USD", "US dollar", "$", "", "Currency"),
    ("EUR", "euro", "€", "", "Currency"),
    ("GBP", "pound sterling", "£", "", "Currency"),
];

// name, description, suffix, category, numerator, denominator, equivalent factors
type DerivedRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i64,
    i64,
    &'static [(&'static str, i32)],
);

const DERIVED_UNITS: &[DerivedRow] = &[
    ("km", "kilometre", "", "Length", 1000, 1, &[("m", 1)]),
    ("cm", "centimetre", "", "Length", 1, 100, &[("m", 1)]),
    ("mm", "millimetre", "", "Length", 1, 1000, &[("m", 1)]),
    ("inch", "inch", "", "Length", 254, 100, &[("cm", 1)]),
    ("foot", "foot", "", "Length", 12, 1, &[("inch", 1)]),
    ("yard", "yard", "", "Length", 3, 1, &[("foot", 1)]),
    ("mile", "mile", "", "Length", 1760, 1, &[("yard", 1)]),
    ("g", "gram", "", "Mass", 1, 1000, &[("kg", 1)]),
    ("tonne", "metric tonne", "", "Mass", 1000, 1, &[("kg", 1)]),
    ("min", "minute", "", "Time", 60, 1, &[("s", 1)]),
    ("hour", "hour", "", "Time", 60, 1, &[("min", 1)]),
    ("day", "day", "", "Time", 24, 1, &[("hour", 1)]),
    ("l", "litre", "", "Volume", 1, 1000, &[("m", 3)]),
    ("N", "newton", "", "Force", 1, 1, &[("kg", 1), ("m", 1), ("s", -2)]),
    ("J", "joule", "", "Energy", 1, 1, &[("N", 1), ("m", 1)]),
    ("W", "watt", "", "Power", 1, 1, &[("J", 1), ("s", -1)]),
    ("Pa", "pascal", "", "Pressure", 1, 1, &[("N", 1), ("m", -2)]),
    ("Hz", "hertz", "", "Frequency", 1, 1, &[("s", -1)]),
    ("percent", "percent", "%", "Ratio", 1, 100, &[]),
];

impl UnitManager {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with SI base units, common derived units and currencies.
    pub fn with_builtin_units() -> Self {
        let mut manager = Self::new();
        for (name, description, prefix, suffix, category) in BASE_UNITS {
            let unit = SingleUnit {
                name: name.to_string(),
                description: description.to_string(),
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            };
            manager
                .declarations
                .insert(name.to_string(), UnitDeclaration::base(unit, *category));
        }
        for (name, description, suffix, category, numer, denom, factors) in DERIVED_UNITS {
            let unit = SingleUnit {
                name: name.to_string(),
                description: description.to_string(),
                prefix: String::new(),
                suffix: suffix.to_string(),
            };
            let equivalent = Unit::from_normal_parts(
                BigRational::one(),
                factors
                    .iter()
                    .map(|(n, p)| (SingleUnit::named(n), *p))
                    .collect(),
            );
            let factor = BigRational::new(BigInt::from(*numer), BigInt::from(*denom));
            manager.declarations.insert(
                name.to_string(),
                UnitDeclaration::derived(unit, factor, equivalent, *category),
            );
        }
        manager
    }

    /// Register a declaration.
    ///
    /// Equivalences may only refer to units that are already declared, which
    /// rules out cyclic definitions.
    pub fn declare(&mut self, declaration: UnitDeclaration) -> Result<(), UnitError> {
        let name = declaration.unit.name().to_string();
        if self.declarations.contains_key(&name) {
            return Err(UnitError::DuplicateUnit(name));
        }
        if let Some((factor, equivalent)) = &declaration.equivalent {
            if factor.is_zero() || equivalent.scale().is_zero() {
                return Err(UnitError::ZeroScale(name));
            }
            if let Some(missing) = equivalent
                .units()
                .keys()
                .find(|u| !self.declarations.contains_key(u.name()))
            {
                return Err(UnitError::UndeclaredEquivalent {
                    unit: name,
                    missing: missing.name().to_string(),
                });
            }
        }
        debug!(unit = %name, category = %declaration.category, "declared unit");
        self.declarations.insert(name, declaration);
        Ok(())
    }

    pub fn get_declaration(&self, name: &str) -> Result<&UnitDeclaration, UnitError> {
        self.declarations
            .get(name)
            .ok_or_else(|| UnitError::UnknownUnit(name.to_string()))
    }

    /// The unit consisting of the single declared unit `name`.
    pub fn get_unit(&self, name: &str) -> Result<Unit, UnitError> {
        self.get_declaration(name)
            .map(|decl| Unit::single(decl.unit.clone()))
    }

    pub fn declarations(&self) -> impl Iterator<Item = &UnitDeclaration> {
        self.declarations.values()
    }

    /// Resolve a parsed unit expression by composing single-unit lookups.
    pub fn resolve(&self, expression: &UnitExpression) -> Result<Unit, UnitError> {
        match expression {
            UnitExpression::Scalar => Ok(Unit::scalar()),
            UnitExpression::Named(name) => self.get_unit(name),
            UnitExpression::Times(parts) => parts
                .iter()
                .try_fold(Unit::scalar(), |acc, part| acc.times(&self.resolve(part)?)),
            UnitExpression::Divide(numerator, denominator) => {
                self.resolve(numerator)?.divide(&self.resolve(denominator)?)
            }
            UnitExpression::Raise(base, power) => {
                let power: i32 = power
                    .trim()
                    .parse()
                    .map_err(|_| UnitError::InvalidPower(power.clone()))?;
                self.resolve(base)?.raised_to(power)
            }
        }
    }

    /// Expand every declared unit down to base units.
    ///
    /// Returns the accumulated scale and the base unit (with scale one). Two
    /// units are convertible exactly when their canonical units are equal.
    /// Units without a declaration in this registry are treated as base units.
    /// Fails when an expanded exponent leaves the supported range.
    pub fn canonicalise(&self, unit: &Unit) -> Result<(BigRational, Unit), UnitError> {
        let mut scale = unit.scale().clone();
        let mut base = Unit::scalar();
        for (single, power) in unit.units() {
            let expanded = match self.declarations.get(single.name()) {
                Some(UnitDeclaration {
                    equivalent: Some((factor, equivalent)),
                    ..
                }) => {
                    let (inner_scale, inner_base) = self.canonicalise(equivalent)?;
                    let once =
                        Unit::from_normal_parts(factor * inner_scale, inner_base.units().clone());
                    once.raised_to(*power)?
                }
                Some(_) => Unit::single(single.clone()).raised_to(*power)?,
                None => {
                    trace!(unit = %single, "no declaration; treating as base unit");
                    Unit::single(single.clone()).raised_to(*power)?
                }
            };
            scale *= expanded.scale();
            base = base.times(&Unit::from_normal_parts(
                BigRational::one(),
                expanded.units().clone(),
            ))?;
        }
        Ok((scale, base))
    }

    /// Multiplier taking a value in `from` to a value in `to`.
    pub fn convert_factor(&self, from: &Unit, to: &Unit) -> Result<BigRational, UnitError> {
        let (from_scale, from_base) = self.canonicalise(from)?;
        let (to_scale, to_base) = self.canonicalise(to)?;
        if from_base != to_base {
            return Err(UnitError::Incompatible {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(from_scale / to_scale)
    }

    /// Same as [`UnitManager::convert_factor`], as a decimal multiplier.
    pub fn convert_factor_decimal(&self, from: &Unit, to: &Unit) -> Result<Decimal, UnitError> {
        rational_to_decimal(&self.convert_factor(from, to)?)
    }

    /// Render a value with the display prefix/suffix of a single-unit unit, e.g. `$12.50`.
    pub fn display_value(&self, value: &Decimal, unit: &Unit) -> String {
        let mut singles = unit.units().iter();
        if let (Some((single, &1)), None) = (singles.next(), singles.next()) {
            if let Ok(decl) = self.get_declaration(single.name()) {
                let affixed = !decl.unit.prefix().is_empty() || !decl.unit.suffix().is_empty();
                if affixed && unit.scale().is_one() {
                    return format!("{}{}{}", decl.unit.prefix(), value, decl.unit.suffix());
                }
            }
        }
        if unit.is_scalar() {
            value.to_string()
        } else {
            format!("{} {}", value, unit)
        }
    }
}

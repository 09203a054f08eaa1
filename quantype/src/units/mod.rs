//! Unit-of-measure algebra
//!
//! A [`Unit`] is an exact rational scale together with a product of named
//! [`SingleUnit`]s raised to non-zero integer powers. Units form a group under
//! multiplication: [`Unit::times`], [`Unit::divide`] and [`Unit::raised_to`]
//! always return values in normal form (no zero exponents are stored). Every
//! exponent stays within [`MAX_UNIT_EXPONENT`]; results outside it are
//! reported as [`UnitError::PowerOutOfRange`] instead of being computed.

pub mod manager;
pub mod unit_exp;

pub use manager::{UnitDeclaration, UnitExpression, UnitManager};
pub use unit_exp::{UnitAtom, UnitExp};

use crate::error::UnitError;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

static UNIT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").expect("unit name pattern is valid"));

/// An atomic, named unit such as `m`, `s` or `USD`.
///
/// Identity, hashing and ordering only consider the name; description and
/// display affixes are presentation data.
#[derive(Debug, Clone)]
pub struct SingleUnit {
    name: String,
    description: String,
    prefix: String,
    suffix: String,
}

impl SingleUnit {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Result<Self, UnitError> {
        let name = name.into();
        if !UNIT_NAME.is_match(&name) {
            return Err(UnitError::InvalidName(name));
        }
        Ok(Self {
            name,
            description: description.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
        })
    }

    /// A unit known only by name; used for built-in tables whose names are valid by construction.
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Text shown before a value in this unit, e.g. `$`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Text shown after a value in this unit, e.g. `%`.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl PartialEq for SingleUnit {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SingleUnit {}

impl Hash for SingleUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for SingleUnit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SingleUnit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for SingleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A unit: rational scale times a product of single units to integer powers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    scale: BigRational,
    units: BTreeMap<SingleUnit, i32>,
}

impl Unit {
    /// The dimensionless unit with scale one.
    pub fn scalar() -> Self {
        Self {
            scale: BigRational::one(),
            units: BTreeMap::new(),
        }
    }

    pub fn single(unit: SingleUnit) -> Self {
        let mut units = BTreeMap::new();
        units.insert(unit, 1);
        Self {
            scale: BigRational::one(),
            units,
        }
    }

    /// Build a unit from factors; repeated factors are combined and zero powers dropped.
    pub fn from_parts(
        scale: BigRational,
        factors: impl IntoIterator<Item = (SingleUnit, i32)>,
    ) -> Result<Self, UnitError> {
        if scale.is_zero() {
            return Err(UnitError::ZeroUnitScale);
        }
        let mut units = BTreeMap::new();
        for (unit, power) in factors {
            add_power(&mut units, unit, power)?;
        }
        Ok(Self { scale, units })
    }

    /// Factors already in normal form and within [`MAX_UNIT_EXPONENT`].
    pub(crate) fn from_normal_parts(scale: BigRational, units: BTreeMap<SingleUnit, i32>) -> Self {
        Self { scale, units }
    }

    /// A dimensionless unit with the given scale, e.g. `percent = 1/100`.
    pub fn scaled(scale: BigRational) -> Result<Self, UnitError> {
        if scale.is_zero() {
            return Err(UnitError::ZeroUnitScale);
        }
        Ok(Self {
            scale,
            units: BTreeMap::new(),
        })
    }

    pub fn scale(&self) -> &BigRational {
        &self.scale
    }

    pub fn units(&self) -> &BTreeMap<SingleUnit, i32> {
        &self.units
    }

    pub fn is_scalar(&self) -> bool {
        self.units.is_empty() && self.scale.is_one()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.units.is_empty()
    }

    pub fn times(&self, other: &Unit) -> Result<Unit, UnitError> {
        let mut units = self.units.clone();
        for (unit, power) in &other.units {
            add_power(&mut units, unit.clone(), *power)?;
        }
        Ok(Unit {
            scale: &self.scale * &other.scale,
            units,
        })
    }

    pub fn divide(&self, other: &Unit) -> Result<Unit, UnitError> {
        let mut units = self.units.clone();
        for (unit, power) in &other.units {
            add_power(&mut units, unit.clone(), -*power)?;
        }
        Ok(Unit {
            scale: &self.scale / &other.scale,
            units,
        })
    }

    pub fn raised_to(&self, power: i32) -> Result<Unit, UnitError> {
        if power == 0 {
            return Err(UnitError::RaisedToZero);
        }
        let units = self
            .units
            .iter()
            .map(|(unit, p)| Ok((unit.clone(), scaled_power(*p, power)?)))
            .collect::<Result<_, UnitError>>()?;
        // bounds the scale's power when there are no factors
        check_power(i64::from(power))?;
        Ok(Unit {
            scale: self.scale.pow(power),
            units,
        })
    }

    pub fn reciprocal(&self) -> Result<Unit, UnitError> {
        Unit::scalar().divide(self)
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::scalar()
    }
}

/// Largest exponent magnitude a unit factor may carry.
///
/// Keeps the exact scales of raised units small enough to compute.
pub const MAX_UNIT_EXPONENT: i32 = 1000;

pub(crate) fn check_power(power: i64) -> Result<i32, UnitError> {
    match i32::try_from(power) {
        Ok(p) if p.abs() <= MAX_UNIT_EXPONENT => Ok(p),
        _ => Err(UnitError::PowerOutOfRange {
            power,
            limit: MAX_UNIT_EXPONENT,
        }),
    }
}

/// `power * by`, rejected when outside [`MAX_UNIT_EXPONENT`].
pub(crate) fn scaled_power(power: i32, by: i32) -> Result<i32, UnitError> {
    check_power(i64::from(power) * i64::from(by))
}

/// Adds `power` to the exponent of `unit`, removing the entry when it cancels out.
pub(crate) fn add_power<K: Ord>(
    units: &mut BTreeMap<K, i32>,
    unit: K,
    power: i32,
) -> Result<(), UnitError> {
    let current = units.get(&unit).copied().unwrap_or(0);
    let total = check_power(i64::from(current) + i64::from(power))?;
    if total == 0 {
        units.remove(&unit);
    } else {
        units.insert(unit, total);
    }
    Ok(())
}

/// Render `numerator / denominator` factor lists the way units are written by users:
/// `m s^2`, `m/s`, `kg/(m s^2)`, `1/s`.
pub(crate) fn render_factors(
    f: &mut fmt::Formatter<'_>,
    scale: &BigRational,
    factors: impl Iterator<Item = (String, i32)>,
) -> fmt::Result {
    let mut top = Vec::new();
    let mut bottom = Vec::new();
    for (name, power) in factors {
        let rendered = |p: i32| {
            if p > 1 {
                format!("{}^{}", name, p)
            } else {
                name.clone()
            }
        };
        match power.cmp(&0) {
            Ordering::Greater => top.push(rendered(power)),
            Ordering::Less => bottom.push(rendered(-power)),
            Ordering::Equal => {}
        }
    }

    let mut numerator = top.join(" ");
    if !scale.is_one() {
        numerator = if numerator.is_empty() {
            scale.to_string()
        } else {
            format!("{} {}", scale, numerator)
        };
    }
    if numerator.is_empty() {
        numerator.push('1');
    }

    match bottom.len() {
        0 => write!(f, "{}", numerator),
        1 => write!(f, "{}/{}", numerator, bottom[0]),
        _ => write!(f, "{}/({})", numerator, bottom.join(" ")),
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render_factors(
            f,
            &self.scale,
            self.units.iter().map(|(u, p)| (u.name().to_string(), *p)),
        )
    }
}

impl Serialize for Unit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Exact `n`-th root of a rational, if one exists.
pub(crate) fn rational_root(value: &BigRational, n: u32) -> Option<BigRational> {
    if n == 1 {
        return Some(value.clone());
    }
    if value.is_zero() {
        return Some(BigRational::zero());
    }
    if value.is_negative() && n % 2 == 0 {
        return None;
    }
    let root_of = |x: &BigInt| -> Option<BigInt> {
        let magnitude = x.abs();
        let root = magnitude.nth_root(n);
        if root.pow(n) == magnitude {
            Some(if x.is_negative() { -root } else { root })
        } else {
            None
        }
    };
    let numer = root_of(value.numer())?;
    let denom = root_of(value.denom())?;
    Some(BigRational::new(numer, denom))
}

/// Numerator and denominator of an exact conversion factor, as decimals.
pub(crate) fn rational_parts(value: &BigRational) -> Result<(Decimal, Decimal), UnitError> {
    let unrepresentable = || UnitError::UnrepresentableFactor(value.to_string());
    let to_decimal = |n: &BigInt| {
        n.to_i128()
            .and_then(|n| Decimal::try_from_i128_with_scale(n, 0).ok())
            .ok_or_else(unrepresentable)
    };
    Ok((to_decimal(value.numer())?, to_decimal(value.denom())?))
}

/// Convert an exact conversion factor to a decimal multiplier, rounding
/// factors such as `1/60` that have no finite decimal expansion.
pub(crate) fn rational_to_decimal(value: &BigRational) -> Result<Decimal, UnitError> {
    let (numer, denom) = rational_parts(value)?;
    numer
        .checked_div(denom)
        .ok_or_else(|| UnitError::UnrepresentableFactor(value.to_string()))
}

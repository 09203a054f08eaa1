//! Concrete data types
//!
//! A [`DataType`] is what a [`TypeExp`] becomes once every variable has been
//! resolved: the shape of a column or value as the rest of a system sees it.

pub mod manager;
pub mod tagged;

pub use manager::TypeManager;
pub use tagged::{TagType, TaggedTypeDefinition, TypeTemplate};

use crate::typeexp::{cons, TypeExp};
use crate::units::{Unit, UnitExp};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Precision of a date or time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeGranularity {
    /// Calendar date, e.g. `2024-03-01`
    YearMonthDay,
    YearMonth,
    /// Time of day without a date
    TimeOfDay,
    /// Local date and time
    DateTime,
    /// Date and time with a UTC offset
    DateTimeZoned,
}

impl DateTimeGranularity {
    pub const ALL: [DateTimeGranularity; 5] = [
        DateTimeGranularity::YearMonthDay,
        DateTimeGranularity::YearMonth,
        DateTimeGranularity::TimeOfDay,
        DateTimeGranularity::DateTime,
        DateTimeGranularity::DateTimeZoned,
    ];

    /// Name of the type constructor representing this granularity.
    pub fn cons_name(self) -> &'static str {
        match self {
            DateTimeGranularity::YearMonthDay => cons::DATE,
            DateTimeGranularity::YearMonth => cons::YEAR_MONTH,
            DateTimeGranularity::TimeOfDay => cons::TIME,
            DateTimeGranularity::DateTime => cons::DATE_TIME,
            DateTimeGranularity::DateTimeZoned => cons::DATE_TIME_ZONED,
        }
    }

    pub fn from_cons_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.cons_name() == name)
    }
}

/// An instance of a tagged (sum) type, e.g. `Optional(Number{m})`.
#[derive(Debug, Clone)]
pub struct TaggedType {
    pub definition: Arc<TaggedTypeDefinition>,
    pub type_args: Vec<DataType>,
}

impl TaggedType {
    pub fn name(&self) -> &str {
        self.definition.name()
    }
}

impl PartialEq for TaggedType {
    fn eq(&self, other: &Self) -> bool {
        self.definition.name() == other.definition.name() && self.type_args == other.type_args
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Number(Unit),
    Text,
    Boolean,
    DateTime(DateTimeGranularity),
    Tagged(TaggedType),
    Record(BTreeMap<String, DataType>),
    Tuple(Vec<DataType>),
    List(Box<DataType>),
    Function(Vec<DataType>, Box<DataType>),
}

impl DataType {
    pub fn scalar() -> Self {
        DataType::Number(Unit::scalar())
    }

    pub fn list(inner: DataType) -> Self {
        DataType::List(Box::new(inner))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, DataType::Number(_))
    }

    /// The type expression denoting exactly this type; it contains no variables.
    pub fn to_type_exp(&self) -> TypeExp {
        match self {
            DataType::Number(unit) => TypeExp::Number(UnitExp::from_unit(unit)),
            DataType::Text => TypeExp::text(),
            DataType::Boolean => TypeExp::boolean(),
            DataType::DateTime(granularity) => TypeExp::cons(granularity.cons_name(), Vec::new()),
            DataType::Tagged(tagged) => TypeExp::cons(
                tagged.name(),
                tagged.type_args.iter().map(DataType::to_type_exp).collect(),
            ),
            DataType::Record(fields) => TypeExp::record(
                fields
                    .iter()
                    .map(|(name, t)| (name.clone(), t.to_type_exp()))
                    .collect(),
            ),
            DataType::Tuple(members) => {
                TypeExp::tuple(members.iter().map(DataType::to_type_exp).collect())
            }
            DataType::List(inner) => TypeExp::list(inner.to_type_exp()),
            DataType::Function(params, result) => TypeExp::function(
                params.iter().map(DataType::to_type_exp).collect(),
                result.to_type_exp(),
            ),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_type_exp())
    }
}

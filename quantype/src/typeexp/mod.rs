//! Type expressions
//!
//! The type checker builds one [`TypeExp`] per sub-expression and unifies
//! them. Unification variables live in a per-pass [`TypeState`] arena and are
//! referred to by index, so a `TypeExp` is a plain value that can be cloned
//! freely; only the arena cells are ever mutated.

mod state;
mod unify;

pub use state::TypeState;

use crate::units::UnitExp;
use std::fmt;

/// Names of the built-in type constructors.
pub mod cons {
    pub const NUMBER: &str = "Number";
    pub const TEXT: &str = "Text";
    pub const BOOLEAN: &str = "Boolean";
    pub const LIST: &str = "List";
    pub const TUPLE: &str = "Tuple";
    pub const RECORD: &str = "Record";
    pub const FUNCTION: &str = "Function";
    pub const DATE: &str = "Date";
    pub const YEAR_MONTH: &str = "YearMonth";
    pub const TIME: &str = "Time";
    pub const DATE_TIME: &str = "DateTime";
    pub const DATE_TIME_ZONED: &str = "DateTimeZoned";

    /// Constructor names that user-declared types may not reuse.
    pub const RESERVED: &[&str] = &[
        NUMBER,
        TEXT,
        BOOLEAN,
        LIST,
        TUPLE,
        RECORD,
        FUNCTION,
        DATE,
        YEAR_MONTH,
        TIME,
        DATE_TIME,
        DATE_TIME_ZONED,
    ];
}

/// Index of a type variable cell in a [`TypeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub(crate) u32);

/// Index of a unit variable cell in a [`TypeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitVarId(pub(crate) u32);

impl TypeVarId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl UnitVarId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_t{}", self.0)
    }
}

impl fmt::Display for UnitVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_u{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExp {
    /// Unification variable
    Var(TypeVarId),
    /// A number carrying a (possibly unresolved) unit
    Number(UnitExp),
    /// A named type constructor applied to operands
    Cons(TypeCons),
    /// One of several alternatives; at least two after normalisation
    Or(Vec<TypeExp>),
}

/// A type constructor application such as `List(Number{m})`.
///
/// `labels` names the operands of record types and is empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCons {
    pub name: String,
    pub labels: Vec<String>,
    pub operands: Vec<TypeExp>,
}

impl TypeCons {
    pub fn new(name: impl Into<String>, operands: Vec<TypeExp>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            operands,
        }
    }

    /// Two constructors can only unify when these agree.
    pub(crate) fn same_shape(&self, other: &TypeCons) -> bool {
        self.name == other.name
            && self.labels == other.labels
            && self.operands.len() == other.operands.len()
    }
}

impl TypeExp {
    pub fn number(unit: UnitExp) -> Self {
        TypeExp::Number(unit)
    }

    pub fn scalar_number() -> Self {
        TypeExp::Number(UnitExp::scalar())
    }

    pub fn cons(name: impl Into<String>, operands: Vec<TypeExp>) -> Self {
        TypeExp::Cons(TypeCons::new(name, operands))
    }

    pub fn text() -> Self {
        TypeExp::cons(cons::TEXT, Vec::new())
    }

    pub fn boolean() -> Self {
        TypeExp::cons(cons::BOOLEAN, Vec::new())
    }

    pub fn list(inner: TypeExp) -> Self {
        TypeExp::cons(cons::LIST, vec![inner])
    }

    pub fn tuple(members: Vec<TypeExp>) -> Self {
        TypeExp::cons(cons::TUPLE, members)
    }

    /// Record type; fields are kept sorted by label so field order never matters.
    pub fn record(fields: Vec<(String, TypeExp)>) -> Self {
        let mut fields = fields;
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        let (labels, operands) = fields.into_iter().unzip();
        TypeExp::Cons(TypeCons {
            name: cons::RECORD.to_string(),
            labels,
            operands,
        })
    }

    /// Function type: parameters followed by the result as the last operand.
    pub fn function(params: Vec<TypeExp>, result: TypeExp) -> Self {
        let mut operands = params;
        operands.push(result);
        TypeExp::cons(cons::FUNCTION, operands)
    }

    /// Normalise a list of alternatives: nested `Or`s are flattened, duplicates
    /// removed and a single alternative is returned as itself. `None` when empty.
    pub fn or(options: Vec<TypeExp>) -> Option<TypeExp> {
        let mut flat: Vec<TypeExp> = Vec::with_capacity(options.len());
        for option in options {
            match option {
                TypeExp::Or(inner) => {
                    for o in inner {
                        if !flat.contains(&o) {
                            flat.push(o);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(TypeExp::Or(flat)),
        }
    }

    /// Alternatives of this type; a non-`Or` type is its own single alternative.
    pub fn options(&self) -> Vec<TypeExp> {
        match self {
            TypeExp::Or(options) => options.clone(),
            other => vec![other.clone()],
        }
    }

    pub fn as_cons(&self) -> Option<&TypeCons> {
        match self {
            TypeExp::Cons(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Display for TypeExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExp::Var(v) => write!(f, "{}", v),
            TypeExp::Number(unit) => {
                if unit.is_one() {
                    write!(f, "{}", cons::NUMBER)
                } else {
                    write!(f, "{}{{{}}}", cons::NUMBER, unit)
                }
            }
            TypeExp::Cons(c) => write!(f, "{}", c),
            TypeExp::Or(options) => {
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", option)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TypeCons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.operands.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match self.labels.get(i) {
                Some(label) => write!(f, "{}: {}", label, operand)?,
                None => write!(f, "{}", operand)?,
            }
        }
        write!(f, ")")
    }
}

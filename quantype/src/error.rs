use crate::types::DataType;
use thiserror::Error;

/// Errors raised by the unit algebra and the unit registry.
///
/// All of these originate from user-written unit expressions or unit
/// declarations, so they are reported to the user rather than treated as bugs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    #[error("invalid unit power '{0}': expected a whole number")]
    InvalidPower(String),

    #[error("invalid raise to power zero")]
    RaisedToZero,

    #[error("invalid unit name '{0}'")]
    InvalidName(String),

    #[error("unit '{0}' is already declared")]
    DuplicateUnit(String),

    #[error("unit '{unit}' is declared in terms of undeclared unit '{missing}'")]
    UndeclaredEquivalent { unit: String, missing: String },

    #[error("unit '{0}' cannot be declared with a zero scale")]
    ZeroScale(String),

    #[error("cannot convert {from} to {to}: the units measure different things")]
    Incompatible { from: String, to: String },

    #[error("conversion factor {0} cannot be represented as a decimal")]
    UnrepresentableFactor(String),

    #[error("unit power {power} is outside the supported range of -{limit}..={limit}")]
    PowerOutOfRange { power: i64, limit: i32 },

    #[error("a unit cannot have a zero scale")]
    ZeroUnitScale,
}

/// A failure to unify two type expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("type mismatch: {left} vs {right}")]
    Mismatch { left: String, right: String },

    #[error("unit mismatch: {left} vs {right}")]
    UnitMismatch { left: String, right: String },

    #[error("cyclic type: {var} would have to contain itself ({ty})")]
    Cyclic { var: String, ty: String },

    #[error("too many type possibilities: {count} combinations exceed the limit of {limit}")]
    TooManyOptions { count: usize, limit: usize },

    #[error("no possible type options when combining {left} and {right}")]
    NoOptions { left: String, right: String },

    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// A type expression that could not be turned into a concrete [`DataType`].
///
/// When a sensible fix exists, `suggested` carries the type the user could
/// specify to resolve the ambiguity.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}{}", .suggested.as_ref().map(|t| format!(" (suggestion: specify type {})", t)).unwrap_or_default())]
pub struct ConcretisationError {
    pub message: String,
    pub suggested: Option<DataType>,
}

impl ConcretisationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggested: None,
        }
    }

    pub fn with_suggestion(message: impl Into<String>, suggested: DataType) -> Self {
        Self {
            message: message.into(),
            suggested: Some(suggested),
        }
    }
}

/// Errors the user can fix by editing their expression or declarations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UserError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Concretisation(#[from] ConcretisationError),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("unknown tag '{0}'")]
    UnknownTag(String),

    #[error("tag '{tag}' {}", if *.takes_value { "needs a value" } else { "takes no value" })]
    TagPayload { tag: String, takes_value: bool },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{function}' expects {expected} argument(s) but was given {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),

    #[error("{limit_name} of {limit} exceeded")]
    LimitExceeded { limit_name: String, limit: usize },

    #[error("{0}")]
    Evaluation(String),

    #[error("{}", render_multiple(.0))]
    Multiple(Vec<UserError>),
}

fn render_multiple(errors: &[UserError]) -> String {
    let mut out = String::from("multiple errors:");
    for (i, error) in errors.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, error));
    }
    out
}

impl UserError {
    /// Collapse a list of errors: a single error stays as-is, several become `Multiple`.
    pub fn from_list(mut errors: Vec<UserError>) -> Option<UserError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(UserError::Multiple(errors)),
        }
    }

    /// The individual errors, flattening `Multiple`.
    pub fn errors(&self) -> Vec<&UserError> {
        match self {
            UserError::Multiple(errors) => errors.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }
}

/// A programming-contract violation: a bug in the checker, an AST producer or
/// a value function, never something a user can fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Top-level error: recoverable user errors are kept apart from fatal internal ones.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{0}")]
    User(#[from] UserError),

    #[error("{0}")]
    Internal(#[from] InternalError),
}

impl EngineError {
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::Internal(InternalError::new(message))
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        EngineError::User(UserError::Evaluation(message.into()))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, EngineError::Internal(_))
    }

    pub fn user_error(&self) -> Option<&UserError> {
        match self {
            EngineError::User(e) => Some(e),
            EngineError::Internal(_) => None,
        }
    }
}

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        EngineError::User(err.into())
    }
}

impl From<UnitError> for EngineError {
    fn from(err: UnitError) -> Self {
        EngineError::User(err.into())
    }
}

impl From<ConcretisationError> for EngineError {
    fn from(err: ConcretisationError) -> Self {
        EngineError::User(err.into())
    }
}

/// Result type used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

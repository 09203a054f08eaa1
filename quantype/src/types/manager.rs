//! Tagged-type registry and concretisation of type expressions

use super::tagged::{TagType, TaggedTypeDefinition, TypeTemplate};
use super::{DataType, DateTimeGranularity, TaggedType};
use crate::error::{ConcretisationError, EngineError, EngineResult, UserError};
use crate::typeexp::{cons, TypeCons, TypeExp, TypeState};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

static TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Lu}][\p{L}\p{N}_]*$").expect("type name pattern is valid"));

static VARIABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Ll}_][\p{L}\p{N}_]*$").expect("variable pattern is valid"));

pub const OPTIONAL: &str = "Optional";
pub const COMPARISON: &str = "Comparison";

/// Registry of tagged types for one document.
///
/// Definitions are shared as `Arc`s so that checked [`DataType`]s can refer
/// to them after the registry has moved on.
#[derive(Debug, Clone, Default)]
pub struct TypeManager {
    tagged: BTreeMap<String, Arc<TaggedTypeDefinition>>,
}

impl TypeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `Optional(t) = None | Is(t)` and
    /// `Comparison = LessThan | EqualTo | GreaterThan`.
    pub fn with_builtin_types() -> Self {
        let mut manager = Self::new();
        let builtins = [
            TaggedTypeDefinition::new(
                OPTIONAL.to_string(),
                vec!["t".to_string()],
                vec![
                    TagType::unit("None"),
                    TagType::with_inner("Is", TypeTemplate::variable("t")),
                ],
            ),
            TaggedTypeDefinition::new(
                COMPARISON.to_string(),
                Vec::new(),
                vec![
                    TagType::unit("LessThan"),
                    TagType::unit("EqualTo"),
                    TagType::unit("GreaterThan"),
                ],
            ),
        ];
        for definition in builtins {
            manager
                .tagged
                .insert(definition.name().to_string(), Arc::new(definition));
        }
        manager
    }

    /// Declare a new sum type.
    ///
    /// Tags may carry payloads mentioning the declared type variables, other
    /// registered tagged types, or the type being declared.
    pub fn register_tagged_type(
        &mut self,
        name: &str,
        type_vars: Vec<String>,
        tags: Vec<TagType>,
    ) -> EngineResult<Arc<TaggedTypeDefinition>> {
        let invalid = |message: String| EngineError::User(UserError::InvalidDeclaration(message));

        if !TYPE_NAME.is_match(name) {
            return Err(invalid(format!(
                "type name '{}' must start with an upper-case letter",
                name
            )));
        }
        if cons::RESERVED.contains(&name) {
            return Err(invalid(format!("'{}' is a built-in type", name)));
        }
        if self.tagged.contains_key(name) {
            return Err(invalid(format!("type '{}' is already declared", name)));
        }
        if tags.is_empty() {
            return Err(invalid(format!("type '{}' needs at least one tag", name)));
        }

        let mut seen_vars = BTreeSet::new();
        for var in &type_vars {
            if !VARIABLE_NAME.is_match(var) {
                return Err(invalid(format!("invalid type variable '{}'", var)));
            }
            if !seen_vars.insert(var.as_str()) {
                return Err(invalid(format!("duplicate type variable '{}'", var)));
            }
        }

        let mut seen_tags = BTreeSet::new();
        for tag in &tags {
            if !TYPE_NAME.is_match(&tag.name) {
                return Err(invalid(format!(
                    "tag name '{}' must start with an upper-case letter",
                    tag.name
                )));
            }
            if !seen_tags.insert(tag.name.as_str()) {
                return Err(invalid(format!("duplicate tag '{}'", tag.name)));
            }
            let Some(template) = &tag.inner else {
                continue;
            };
            if let Some(unknown) = template
                .variables()
                .into_iter()
                .find(|v| !seen_vars.contains(v))
            {
                return Err(invalid(format!(
                    "tag '{}' uses undeclared type variable '{}'",
                    tag.name, unknown
                )));
            }
            for (referenced, arity) in template.tagged_references() {
                let expected = if referenced == name {
                    type_vars.len()
                } else {
                    self.tagged
                        .get(referenced)
                        .map(|d| d.type_vars().len())
                        .ok_or_else(|| EngineError::User(UserError::UnknownType(referenced.to_string())))?
                };
                if arity != expected {
                    return Err(invalid(format!(
                        "type '{}' takes {} argument(s) but is given {}",
                        referenced, expected, arity
                    )));
                }
            }
        }

        let definition = Arc::new(TaggedTypeDefinition::new(name.to_string(), type_vars, tags));
        debug!(name, tags = definition.tags().len(), "registered tagged type");
        self.tagged.insert(name.to_string(), Arc::clone(&definition));
        Ok(definition)
    }

    pub fn lookup_tagged(&self, name: &str) -> Option<&Arc<TaggedTypeDefinition>> {
        self.tagged.get(name)
    }

    /// Every registered type with a tag called `tag`, in name order.
    pub fn types_with_tag(&self, tag: &str) -> Vec<&Arc<TaggedTypeDefinition>> {
        self.tagged
            .values()
            .filter(|d| d.tag(tag).is_some())
            .collect()
    }

    pub fn tagged_types(&self) -> impl Iterator<Item = &Arc<TaggedTypeDefinition>> {
        self.tagged.values()
    }

    /// Turn a type expression into a concrete [`DataType`].
    ///
    /// Reads `state` without modifying it. Units made only of unresolved unit
    /// variables default to the scalar unit. Units mixing variables with
    /// concrete units are ambiguous and only default when `allow_default` is
    /// set; the error otherwise suggests the defaulted type.
    pub fn concretise(
        &self,
        state: &TypeState,
        exp: &TypeExp,
        allow_default: bool,
    ) -> EngineResult<DataType> {
        self.concretise_resolved(&state.resolved(exp)?, allow_default)
    }

    fn concretise_resolved(&self, exp: &TypeExp, allow_default: bool) -> EngineResult<DataType> {
        match exp {
            TypeExp::Var(_) => Err(ConcretisationError::new("type could not be determined").into()),
            TypeExp::Number(unit) => {
                if let Some(concrete) = unit.to_unit() {
                    return Ok(DataType::Number(concrete));
                }
                let defaulted = DataType::Number(unit.without_vars());
                if unit.is_only_vars() {
                    return Ok(defaulted);
                }
                if allow_default {
                    debug!(unit = %unit, default = %defaulted, "defaulted ambiguous unit");
                    return Ok(defaulted);
                }
                Err(ConcretisationError::with_suggestion(
                    format!("ambiguous unit {}", unit),
                    defaulted,
                )
                .into())
            }
            TypeExp::Or(options) => {
                let suggestion = options
                    .iter()
                    .find_map(|o| self.concretise_resolved(o, true).ok());
                let message = format!("ambiguous type {}", exp);
                Err(match suggestion {
                    Some(suggested) => ConcretisationError::with_suggestion(message, suggested),
                    None => ConcretisationError::new(message),
                }
                .into())
            }
            TypeExp::Cons(type_cons) => self.concretise_cons(type_cons, allow_default),
        }
    }

    fn concretise_cons(&self, type_cons: &TypeCons, allow_default: bool) -> EngineResult<DataType> {
        let operands = type_cons
            .operands
            .iter()
            .map(|o| self.concretise_resolved(o, allow_default))
            .collect::<EngineResult<Vec<_>>>()?;
        let arity = |expected: usize| -> EngineResult<()> {
            if operands.len() == expected {
                Ok(())
            } else {
                Err(EngineError::internal(format!(
                    "type constructor {} expects {} operand(s), found {}",
                    type_cons.name,
                    expected,
                    operands.len()
                )))
            }
        };

        if let Some(granularity) = DateTimeGranularity::from_cons_name(&type_cons.name) {
            arity(0)?;
            return Ok(DataType::DateTime(granularity));
        }
        match type_cons.name.as_str() {
            cons::TEXT => arity(0).map(|_| DataType::Text),
            cons::BOOLEAN => arity(0).map(|_| DataType::Boolean),
            cons::LIST => {
                arity(1)?;
                let mut operands = operands;
                let inner = operands
                    .pop()
                    .ok_or_else(|| EngineError::internal("list type without an element type"))?;
                Ok(DataType::list(inner))
            }
            cons::TUPLE => Ok(DataType::Tuple(operands)),
            cons::RECORD => {
                arity(type_cons.labels.len())?;
                Ok(DataType::Record(
                    type_cons.labels.iter().cloned().zip(operands).collect(),
                ))
            }
            cons::FUNCTION => {
                let mut params = operands;
                let result = params.pop().ok_or_else(|| {
                    EngineError::internal("function type without a result type")
                })?;
                Ok(DataType::Function(params, Box::new(result)))
            }
            name => {
                let definition = self.tagged.get(name).ok_or_else(|| {
                    EngineError::internal(format!("reference to undeclared type '{}'", name))
                })?;
                arity(definition.type_vars().len())?;
                Ok(DataType::Tagged(TaggedType {
                    definition: Arc::clone(definition),
                    type_args: operands,
                }))
            }
        }
    }
}

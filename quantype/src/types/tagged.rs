use super::DataType;
use crate::error::{EngineError, EngineResult};
use crate::typeexp::{TypeExp, TypeState};
use std::collections::BTreeMap;
use std::fmt;

/// The type written for a tag's payload, possibly mentioning the
/// definition's type variables.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeTemplate {
    Variable(String),
    Concrete(DataType),
    List(Box<TypeTemplate>),
    Tuple(Vec<TypeTemplate>),
    /// Another tagged type (or the one being defined) applied to arguments
    Tagged {
        name: String,
        args: Vec<TypeTemplate>,
    },
}

impl TypeTemplate {
    pub fn variable(name: impl Into<String>) -> Self {
        TypeTemplate::Variable(name.into())
    }

    pub fn list(inner: TypeTemplate) -> Self {
        TypeTemplate::List(Box::new(inner))
    }

    pub fn tagged(name: impl Into<String>, args: Vec<TypeTemplate>) -> Self {
        TypeTemplate::Tagged {
            name: name.into(),
            args,
        }
    }

    /// Substitute type variables by the given type expressions.
    pub fn instantiate(&self, args: &BTreeMap<String, TypeExp>) -> EngineResult<TypeExp> {
        match self {
            TypeTemplate::Variable(name) => args.get(name).cloned().ok_or_else(|| {
                EngineError::internal(format!("type variable '{}' is not bound", name))
            }),
            TypeTemplate::Concrete(data_type) => Ok(data_type.to_type_exp()),
            TypeTemplate::List(inner) => Ok(TypeExp::list(inner.instantiate(args)?)),
            TypeTemplate::Tuple(members) => Ok(TypeExp::tuple(
                members
                    .iter()
                    .map(|m| m.instantiate(args))
                    .collect::<EngineResult<_>>()?,
            )),
            TypeTemplate::Tagged { name, args: inner } => Ok(TypeExp::cons(
                name.clone(),
                inner
                    .iter()
                    .map(|a| a.instantiate(args))
                    .collect::<EngineResult<_>>()?,
            )),
        }
    }

    pub(crate) fn variables(&self) -> Vec<&str> {
        match self {
            TypeTemplate::Variable(name) => vec![name.as_str()],
            TypeTemplate::Concrete(_) => Vec::new(),
            TypeTemplate::List(inner) => inner.variables(),
            TypeTemplate::Tuple(members) => members.iter().flat_map(|m| m.variables()).collect(),
            TypeTemplate::Tagged { args, .. } => args.iter().flat_map(|a| a.variables()).collect(),
        }
    }

    /// Every tagged type referenced, with the number of arguments it is given.
    pub(crate) fn tagged_references(&self) -> Vec<(&str, usize)> {
        match self {
            TypeTemplate::Variable(_) | TypeTemplate::Concrete(_) => Vec::new(),
            TypeTemplate::List(inner) => inner.tagged_references(),
            TypeTemplate::Tuple(members) => members
                .iter()
                .flat_map(|m| m.tagged_references())
                .collect(),
            TypeTemplate::Tagged { name, args } => {
                let mut refs = vec![(name.as_str(), args.len())];
                refs.extend(args.iter().flat_map(|a| a.tagged_references()));
                refs
            }
        }
    }
}

impl fmt::Display for TypeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTemplate::Variable(name) => write!(f, "{}", name),
            TypeTemplate::Concrete(data_type) => write!(f, "{}", data_type),
            TypeTemplate::List(inner) => write!(f, "List({})", inner),
            TypeTemplate::Tuple(members) => {
                write!(f, "Tuple(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, ")")
            }
            TypeTemplate::Tagged { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}

/// One variant of a tagged type.
#[derive(Debug, Clone, PartialEq)]
pub struct TagType {
    pub name: String,
    pub inner: Option<TypeTemplate>,
}

impl TagType {
    /// A tag without payload, e.g. `None`.
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: None,
        }
    }

    /// A tag carrying one value, e.g. `Is(t)`.
    pub fn with_inner(name: impl Into<String>, inner: TypeTemplate) -> Self {
        Self {
            name: name.into(),
            inner: Some(inner),
        }
    }
}

/// A declared sum type: a name, type parameters and an ordered list of tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedTypeDefinition {
    name: String,
    type_vars: Vec<String>,
    tags: Vec<TagType>,
}

impl TaggedTypeDefinition {
    pub(crate) fn new(name: String, type_vars: Vec<String>, tags: Vec<TagType>) -> Self {
        Self {
            name,
            type_vars,
            tags,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_vars(&self) -> &[String] {
        &self.type_vars
    }

    pub fn tags(&self) -> &[TagType] {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&TagType> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Fresh type expression for this type, with one new variable per type parameter.
    pub fn instantiate(&self, state: &mut TypeState) -> (TypeExp, BTreeMap<String, TypeExp>) {
        let args: BTreeMap<String, TypeExp> = self
            .type_vars
            .iter()
            .map(|v| (v.clone(), state.fresh_var()))
            .collect();
        let operands = self
            .type_vars
            .iter()
            .filter_map(|v| args.get(v).cloned())
            .collect();
        (TypeExp::cons(self.name.clone(), operands), args)
    }

    /// Payload type of `tag` under the given type arguments; `None` for tags without payload.
    pub fn inner_type(
        &self,
        tag: &str,
        args: &BTreeMap<String, TypeExp>,
    ) -> EngineResult<Option<TypeExp>> {
        let tag_type = self.tag(tag).ok_or_else(|| {
            EngineError::internal(format!("type '{}' has no tag '{}'", self.name, tag))
        })?;
        tag_type
            .inner
            .as_ref()
            .map(|template| template.instantiate(args))
            .transpose()
    }
}

use super::{TypeCons, TypeExp, TypeVarId, UnitVarId};
use crate::error::{TypeError, UnitError};
use crate::resource_limits::ResourceLimits;
use crate::units::UnitExp;

/// Arena of unification cells for one type-check pass.
///
/// Every [`TypeVarId`] and [`UnitVarId`] handed out by this state indexes a
/// cell that is either unbound (`None`) or bound to a type or unit
/// expression. Cells are only ever appended, so an id stays valid for the
/// whole pass even across [`TypeState::restore`].
#[derive(Debug, Clone, Default)]
pub struct TypeState {
    type_cells: Vec<Option<TypeExp>>,
    unit_cells: Vec<Option<UnitExp>>,
    pub(super) limits: ResourceLimits,
    pub(super) unify_calls: usize,
}

/// Contents of every cell at some point in time.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    type_cells: Vec<Option<TypeExp>>,
    unit_cells: Vec<Option<UnitExp>>,
}

impl TypeState {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Number of calls to [`TypeState::unify`] made so far, nested calls included.
    pub fn unify_calls(&self) -> usize {
        self.unify_calls
    }

    pub fn fresh_type_var(&mut self) -> TypeVarId {
        self.type_cells.push(None);
        TypeVarId((self.type_cells.len() - 1) as u32)
    }

    pub fn fresh_unit_var(&mut self) -> UnitVarId {
        self.unit_cells.push(None);
        UnitVarId((self.unit_cells.len() - 1) as u32)
    }

    /// A fresh type variable wrapped as a type expression.
    pub fn fresh_var(&mut self) -> TypeExp {
        TypeExp::Var(self.fresh_type_var())
    }

    /// A number whose unit is a fresh unit variable.
    pub fn fresh_number(&mut self) -> TypeExp {
        TypeExp::Number(UnitExp::var(self.fresh_unit_var()))
    }

    pub fn type_binding(&self, var: TypeVarId) -> Option<&TypeExp> {
        self.type_cells.get(var.index()).and_then(Option::as_ref)
    }

    pub fn unit_binding(&self, var: UnitVarId) -> Option<&UnitExp> {
        self.unit_cells.get(var.index()).and_then(Option::as_ref)
    }

    /// The variable at the end of the chain starting at `exp`, when `exp` is a variable.
    pub(super) fn chain_end(&self, exp: &TypeExp) -> Option<TypeVarId> {
        let TypeExp::Var(mut var) = exp else {
            return None;
        };
        while let Some(TypeExp::Var(next)) = self.type_binding(var) {
            var = *next;
        }
        Some(var)
    }

    pub(super) fn bind_type(&mut self, var: TypeVarId, to: TypeExp) {
        if let Some(cell) = self.type_cells.get_mut(var.index()) {
            *cell = Some(to);
        }
    }

    pub(super) fn bind_unit(&mut self, var: UnitVarId, to: UnitExp) {
        if let Some(cell) = self.unit_cells.get_mut(var.index()) {
            *cell = Some(to);
        }
    }

    /// Shallow normal form of a type expression.
    ///
    /// A variable is followed to the end of its chain and every cell along the
    /// way is rewritten to point straight at the last variable. Bound unit
    /// variables are substituted and `Or` options are pruned and flattened.
    /// Constructor operands are left untouched. Fails only when substituting
    /// a unit variable pushes an exponent out of range.
    pub fn prune(&mut self, exp: &TypeExp) -> Result<TypeExp, TypeError> {
        match exp {
            TypeExp::Var(var) => {
                let mut path = Vec::new();
                let mut last = *var;
                while let Some(TypeExp::Var(next)) = self.type_binding(last) {
                    path.push(last);
                    last = *next;
                }
                // the final link already points at `last`
                path.pop();
                for step in path {
                    self.bind_type(step, TypeExp::Var(last));
                }
                match self.type_binding(last).cloned() {
                    Some(bound) => self.prune(&bound),
                    None => Ok(TypeExp::Var(last)),
                }
            }
            TypeExp::Number(unit) => Ok(TypeExp::Number(self.resolve_unit(unit)?)),
            TypeExp::Or(options) => {
                let pruned = options
                    .iter()
                    .map(|o| self.prune(o))
                    .collect::<Result<_, _>>()?;
                Ok(TypeExp::or(pruned).unwrap_or_else(|| exp.clone()))
            }
            TypeExp::Cons(_) => Ok(exp.clone()),
        }
    }

    /// Substitute every bound unit variable, transitively.
    pub fn resolve_unit(&self, unit: &UnitExp) -> Result<UnitExp, UnitError> {
        let mut current = unit.clone();
        loop {
            let bound = current
                .vars()
                .find_map(|(var, _)| self.unit_binding(var).map(|b| (var, b.clone())));
            match bound {
                Some((var, binding)) => current = current.substitute(var, &binding)?,
                None => return Ok(current),
            }
        }
    }

    /// Deep resolution without touching any cell: every bound variable,
    /// however deeply nested, is replaced by what it is bound to.
    pub fn resolved(&self, exp: &TypeExp) -> Result<TypeExp, TypeError> {
        match exp {
            TypeExp::Var(var) => match self.type_binding(*var) {
                Some(bound) => self.resolved(bound),
                None => Ok(exp.clone()),
            },
            TypeExp::Number(unit) => Ok(TypeExp::Number(self.resolve_unit(unit)?)),
            TypeExp::Cons(cons) => Ok(TypeExp::Cons(TypeCons {
                name: cons.name.clone(),
                labels: cons.labels.clone(),
                operands: cons
                    .operands
                    .iter()
                    .map(|o| self.resolved(o))
                    .collect::<Result<_, _>>()?,
            })),
            TypeExp::Or(options) => {
                let resolved = options
                    .iter()
                    .map(|o| self.resolved(o))
                    .collect::<Result<_, _>>()?;
                Ok(TypeExp::or(resolved).unwrap_or_else(|| exp.clone()))
            }
        }
    }

    /// [`TypeState::resolved`] for error messages, falling back to `exp` as written.
    pub(crate) fn describe(&self, exp: &TypeExp) -> String {
        self.resolved(exp)
            .map(|t| t.to_string())
            .unwrap_or_else(|_| exp.to_string())
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            type_cells: self.type_cells.clone(),
            unit_cells: self.unit_cells.clone(),
        }
    }

    /// Roll every cell back to `snapshot`. Cells allocated since then stay
    /// allocated but become unbound.
    pub(crate) fn restore(&mut self, snapshot: &Snapshot) {
        restore_cells(&mut self.type_cells, &snapshot.type_cells);
        restore_cells(&mut self.unit_cells, &snapshot.unit_cells);
    }
}

fn restore_cells<T: Clone>(cells: &mut Vec<Option<T>>, saved: &[Option<T>]) {
    let allocated = cells.len().max(saved.len());
    cells.clear();
    cells.extend_from_slice(saved);
    cells.resize(allocated, None);
}

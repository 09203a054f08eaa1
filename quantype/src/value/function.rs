//! The value-function calling protocol
//!
//! A [`ValueFunction`] receives already type-checked arguments through a
//! [`CallState`]. Arguments are read by position; reading past the end, or
//! before any call has begun, is a bug in the function and reported as an
//! internal error. Through the same state a function may declare that its
//! result *is* one of its inputs' locations, which `call_record` turns into
//! the `result_is` of the explanation.

use super::explanation::{Explanation, ExplanationLocation, Recorded};
use super::Value;
use crate::error::{EngineError, EngineResult};
use std::fmt;
use tracing::trace;

/// Per-call state handed to [`ValueFunction::evaluate`].
#[derive(Debug, Default)]
pub struct CallState<'a> {
    args: Option<&'a [Value]>,
    locations: &'a [Option<ExplanationLocation>],
    result_is: Option<ExplanationLocation>,
    used_locations: Vec<ExplanationLocation>,
    description: Option<String>,
}

impl<'a> CallState<'a> {
    /// A state with no call in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a call. Any provenance from an earlier call is discarded.
    pub fn begin(&mut self, args: &'a [Value], locations: &'a [Option<ExplanationLocation>]) {
        self.args = Some(args);
        self.locations = locations;
        self.result_is = None;
        self.used_locations.clear();
        self.description = None;
    }

    fn args(&self) -> EngineResult<&'a [Value]> {
        self.args
            .ok_or_else(|| EngineError::internal("arguments accessed before any call"))
    }

    pub fn arg_count(&self) -> EngineResult<usize> {
        Ok(self.args()?.len())
    }

    /// The argument at `index` of the current call.
    pub fn arg(&self, index: usize) -> EngineResult<&'a Value> {
        let args = self.args()?;
        args.get(index).ok_or_else(|| {
            EngineError::internal(format!(
                "argument {} requested but only {} were passed",
                index,
                args.len()
            ))
        })
    }

    /// Where the argument at `index` came from, if known.
    pub fn arg_location(&self, index: usize) -> EngineResult<Option<&'a ExplanationLocation>> {
        self.arg(index)?;
        Ok(self.locations.get(index).and_then(Option::as_ref))
    }

    /// Declare that the result is exactly the argument at `index`.
    pub fn result_is_argument(&mut self, index: usize) -> EngineResult<()> {
        self.result_is = self.arg_location(index)?.cloned();
        Ok(())
    }

    /// Declare that the result is exactly the value stored at `location`.
    pub fn result_is_location(&mut self, location: ExplanationLocation) {
        self.result_is = Some(location);
    }

    /// Record that the computation read `location`.
    pub fn uses_location(&mut self, location: ExplanationLocation) {
        if !self.used_locations.contains(&location) {
            self.used_locations.push(location);
        }
    }

    /// Override the default description of the call in its explanation.
    pub fn describe(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    fn into_explanation(self, name: &str, result: Value) -> Explanation {
        let description = self.description.unwrap_or_else(|| {
            let args = self
                .args
                .unwrap_or_default()
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", name, args)
        });
        let mut explanation = Explanation::new(description, result);
        explanation.used_locations = self.used_locations;
        explanation.result_is = self.result_is;
        explanation
    }
}

/// A function over runtime values with a fixed number of arguments.
pub trait ValueFunction: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    /// Compute the result from the arguments held by `state`.
    fn evaluate(&self, state: &mut CallState<'_>) -> EngineResult<Value>;

    /// Call without recording provenance.
    fn call(&self, args: &[Value]) -> EngineResult<Value> {
        check_arity(self.name(), self.arity(), args.len())?;
        trace!(function = self.name(), "call");
        let mut state = CallState::new();
        state.begin(args, &[]);
        self.evaluate(&mut state)
    }

    /// Call and record an explanation.
    ///
    /// `locations[i]` is where argument `i` was read from, if anywhere.
    fn call_record(
        &self,
        args: &[Value],
        locations: &[Option<ExplanationLocation>],
    ) -> EngineResult<Recorded<Value>> {
        check_arity(self.name(), self.arity(), args.len())?;
        if locations.len() != args.len() {
            return Err(EngineError::internal(format!(
                "{} argument(s) passed to '{}' with {} location(s)",
                args.len(),
                self.name(),
                locations.len()
            )));
        }
        trace!(function = self.name(), "recorded call");
        let mut state = CallState::new();
        state.begin(args, locations);
        let value = self.evaluate(&mut state)?;
        let explanation = state.into_explanation(self.name(), value.clone());
        Ok(Recorded::new(value, explanation))
    }
}

fn check_arity(name: &str, expected: usize, actual: usize) -> EngineResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(EngineError::internal(format!(
            "function '{}' called with {} argument(s), expects {}",
            name, actual, expected
        )))
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use quantype::{TypeExp, TypeState};

/// Builds a type from the front of `data`, reusing a small pool of variables.
fn build(data: &mut &[u8], vars: &[TypeExp], depth: u8) -> TypeExp {
    let Some((&first, rest)) = data.split_first() else {
        return TypeExp::text();
    };
    *data = rest;
    if depth == 0 {
        return vars[first as usize % vars.len()].clone();
    }
    match first % 7 {
        0 => TypeExp::text(),
        1 => TypeExp::scalar_number(),
        2 => vars[first as usize % vars.len()].clone(),
        3 => TypeExp::list(build(data, vars, depth - 1)),
        4 => TypeExp::tuple(vec![build(data, vars, depth - 1), build(data, vars, depth - 1)]),
        5 => TypeExp::or(vec![build(data, vars, depth - 1), build(data, vars, depth - 1)])
            .unwrap_or_else(TypeExp::boolean),
        _ => TypeExp::boolean(),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut state = TypeState::default();
    let vars: Vec<TypeExp> = (0..4).map(|_| state.fresh_var()).collect();
    let mut input = data;
    let left = build(&mut input, &vars, 6);
    let right = build(&mut input, &vars, 6);
    if state.unify(&left, &right).is_ok() {
        let _ = state.unify(&left, &right);
        let _ = state.resolved(&left);
    }
});

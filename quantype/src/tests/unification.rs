use crate::error::{TypeError, UnitError};
use crate::resource_limits::ResourceLimits;
use crate::typeexp::{TypeExp, TypeState};
use crate::types::{DataType, TypeManager};
use crate::units::{SingleUnit, Unit, UnitExp, MAX_UNIT_EXPONENT};
use num_bigint::BigInt;
use num_rational::BigRational;

fn unit(name: &str) -> Unit {
    Unit::single(SingleUnit::named(name))
}

fn number(name: &str) -> TypeExp {
    TypeExp::Number(UnitExp::from_unit(&unit(name)))
}

fn named(index: usize) -> TypeExp {
    TypeExp::cons(format!("T{}", index), Vec::new())
}

fn options(count: usize) -> TypeExp {
    TypeExp::or((0..count).map(named).collect()).unwrap()
}

#[test]
fn test_unit_variable_takes_concrete_unit() {
    let mut state = TypeState::default();
    let u = state.fresh_unit_var();
    let a = TypeExp::Number(UnitExp::var(u));
    state.unify(&a, &number("m")).unwrap();

    let types = TypeManager::with_builtin_types();
    assert_eq!(
        types.concretise(&state, &a, false).unwrap(),
        DataType::Number(unit("m"))
    );
}

#[test]
fn test_list_element_variable_is_solved() {
    let mut state = TypeState::default();
    let a = state.fresh_var();
    state
        .unify(&TypeExp::list(a.clone()), &TypeExp::list(TypeExp::scalar_number()))
        .unwrap();

    let types = TypeManager::with_builtin_types();
    assert_eq!(types.concretise(&state, &a, false).unwrap(), DataType::scalar());
}

#[test]
fn test_list_does_not_unify_with_tuple() {
    let mut state = TypeState::default();
    let x = state.fresh_var();
    let y = state.fresh_var();
    let result = state.unify(&TypeExp::list(x.clone()), &TypeExp::tuple(vec![x, y]));
    assert_eq!(
        result,
        Err(TypeError::Mismatch {
            left: "List(_t0)".to_string(),
            right: "Tuple(_t0, _t1)".to_string()
        })
    );
}

#[test]
fn test_mismatch_message() {
    let mut state = TypeState::default();
    let err = state.unify(&number("m"), &TypeExp::text()).unwrap_err();
    assert_eq!(err.to_string(), "type mismatch: Number{m} vs Text");
}

#[test]
fn test_record_labels_must_agree() {
    let mut state = TypeState::default();
    let a = TypeExp::record(vec![("a".to_string(), TypeExp::text())]);
    let b = TypeExp::record(vec![("b".to_string(), TypeExp::text())]);
    assert!(matches!(state.unify(&a, &b), Err(TypeError::Mismatch { .. })));

    let ab = TypeExp::record(vec![
        ("b".to_string(), TypeExp::boolean()),
        ("a".to_string(), TypeExp::text()),
    ]);
    let ba = TypeExp::record(vec![
        ("a".to_string(), TypeExp::text()),
        ("b".to_string(), TypeExp::boolean()),
    ]);
    assert_eq!(state.unify(&ab, &ba), Ok(ba));
}

#[test]
fn test_occurs_check() {
    let mut state = TypeState::default();
    let v = state.fresh_var();
    let nested = TypeExp::tuple(vec![TypeExp::text(), TypeExp::list(v.clone())]);
    assert!(matches!(
        state.unify(&v, &nested),
        Err(TypeError::Cyclic { .. })
    ));
    assert!(matches!(
        state.unify(&TypeExp::list(v.clone()), &v),
        Err(TypeError::Cyclic { .. })
    ));
}

#[test]
fn test_occurs_check_follows_links() {
    let mut state = TypeState::default();
    let v = state.fresh_var();
    let w = state.fresh_var();
    state.unify(&v, &w).unwrap();
    assert!(matches!(
        state.unify(&w, &TypeExp::list(v)),
        Err(TypeError::Cyclic { .. })
    ));
}

#[test]
fn test_occurs_check_keeps_options_without_the_variable() {
    let mut state = TypeState::default();
    let id = state.fresh_type_var();
    let v = TypeExp::Var(id);
    let either = TypeExp::or(vec![TypeExp::list(v.clone()), TypeExp::text()]).unwrap();
    assert_eq!(state.without_var(id, &either), Ok(Some(TypeExp::text())));

    state.unify(&v, &either).unwrap();
    assert_eq!(state.prune(&v), Ok(TypeExp::text()));

    let w = state.fresh_var();
    let all_cyclic =
        TypeExp::or(vec![TypeExp::list(w.clone()), TypeExp::tuple(vec![w.clone()])]).unwrap();
    assert!(matches!(
        state.unify(&w, &all_cyclic),
        Err(TypeError::Cyclic { .. })
    ));
}

#[test]
fn test_variables_link_first_to_second() {
    let mut state = TypeState::default();
    let v = state.fresh_type_var();
    let w = state.fresh_type_var();
    state.unify(&TypeExp::Var(v), &TypeExp::Var(w)).unwrap();
    assert_eq!(state.type_binding(v), Some(&TypeExp::Var(w)));
    assert_eq!(state.type_binding(w), None);
}

#[test]
fn test_prune_compresses_paths() {
    let mut state = TypeState::default();
    let vars: Vec<_> = (0..4).map(|_| state.fresh_type_var()).collect();
    for pair in vars.windows(2) {
        state
            .unify(&TypeExp::Var(pair[0]), &TypeExp::Var(pair[1]))
            .unwrap();
    }
    assert_eq!(state.type_binding(vars[0]), Some(&TypeExp::Var(vars[1])));

    assert_eq!(state.prune(&TypeExp::Var(vars[0])), Ok(TypeExp::Var(vars[3])));
    assert_eq!(state.type_binding(vars[0]), Some(&TypeExp::Var(vars[3])));
    assert_eq!(state.type_binding(vars[1]), Some(&TypeExp::Var(vars[3])));
}

#[test]
fn test_unify_is_idempotent() {
    let mut state = TypeState::default();
    let v = state.fresh_var();
    let cases = vec![
        TypeExp::text(),
        number("m"),
        TypeExp::list(v.clone()),
        TypeExp::tuple(vec![TypeExp::boolean(), v.clone()]),
        TypeExp::function(vec![number("s")], TypeExp::list(number("m"))),
    ];
    for exp in cases {
        let pruned = state.prune(&exp).unwrap();
        assert_eq!(state.unify(&exp, &exp), Ok(pruned));
    }
    assert_eq!(state.prune(&v), Ok(v));
}

#[test]
fn test_unit_power_is_solved() {
    let mut state = TypeState::default();
    let u = state.fresh_unit_var();
    let squared = UnitExp::var(u).raised_to(2).unwrap();
    let area = UnitExp::from_unit(&unit("m").raised_to(2).unwrap());
    state.unify_units(&squared, &area).unwrap();
    assert_eq!(state.resolve_unit(&UnitExp::var(u)), Ok(UnitExp::from_unit(&unit("m"))));
}

#[test]
fn test_unit_without_integer_root_is_a_mismatch() {
    let mut state = TypeState::default();
    let u = state.fresh_unit_var();
    let squared = UnitExp::var(u).raised_to(2).unwrap();
    assert!(matches!(
        state.unify_units(&squared, &UnitExp::from_unit(&unit("m"))),
        Err(TypeError::UnitMismatch { .. })
    ));

    let v = state.fresh_unit_var();
    let two = Unit::scaled(BigRational::from_integer(BigInt::from(2))).unwrap();
    assert!(matches!(
        state.unify_units(
            &UnitExp::var(v).raised_to(2).unwrap(),
            &UnitExp::from_unit(&two)
        ),
        Err(TypeError::UnitMismatch { .. })
    ));
}

#[test]
fn test_concrete_units_must_match() {
    let mut state = TypeState::default();
    assert_eq!(
        state.unify(&number("m"), &number("s")),
        Err(TypeError::UnitMismatch {
            left: "m".to_string(),
            right: "s".to_string()
        })
    );
}

#[test]
fn test_product_of_variables() {
    let mut state = TypeState::default();
    let u = UnitExp::var(state.fresh_unit_var());
    let v = UnitExp::var(state.fresh_unit_var());
    let m = UnitExp::from_unit(&unit("m"));
    let product = u.times(&v).unwrap();
    state.unify_units(&product, &m).unwrap();
    assert_eq!(state.resolve_unit(&product), Ok(m));
}

#[test]
fn test_non_dividing_exponents_introduce_fresh_variables() {
    let mut state = TypeState::default();
    let u = UnitExp::var(state.fresh_unit_var());
    let v = UnitExp::var(state.fresh_unit_var());
    let left = u
        .raised_to(2)
        .unwrap()
        .times(&v.raised_to(3).unwrap())
        .unwrap();
    let m = UnitExp::from_unit(&unit("m"));
    state.unify_units(&left, &m).unwrap();
    assert_eq!(state.resolve_unit(&left), Ok(m));
}

#[test]
fn test_scaled_unit_is_solved() {
    let mut state = TypeState::default();
    let u = state.fresh_unit_var();
    let kilo = Unit::from_parts(
        BigRational::from_integer(BigInt::from(1000)),
        vec![(SingleUnit::named("m"), 1)],
    )
    .unwrap();
    state
        .unify(&TypeExp::Number(UnitExp::var(u)), &TypeExp::Number(UnitExp::from_unit(&kilo)))
        .unwrap();
    assert_eq!(state.resolve_unit(&UnitExp::var(u)).unwrap().to_unit(), Some(kilo));
}

#[test]
fn test_single_surviving_option_keeps_its_bindings() {
    let mut state = TypeState::default();
    let u = state.fresh_unit_var();
    let either = TypeExp::or(vec![TypeExp::Number(UnitExp::var(u)), TypeExp::text()]).unwrap();
    assert_eq!(state.unify(&either, &number("m")), Ok(number("m")));
    assert_eq!(state.resolve_unit(&UnitExp::var(u)), Ok(UnitExp::from_unit(&unit("m"))));

    let choice = TypeExp::or(vec![TypeExp::text(), TypeExp::boolean()]).unwrap();
    assert_eq!(state.unify(&choice, &TypeExp::text()), Ok(TypeExp::text()));
}

#[test]
fn test_several_surviving_options_bind_nothing() {
    let mut state = TypeState::default();
    let v = state.fresh_type_var();
    let either = TypeExp::or(vec![
        TypeExp::list(TypeExp::text()),
        TypeExp::list(TypeExp::boolean()),
    ])
    .unwrap();
    let unified = state.unify(&either, &TypeExp::list(TypeExp::Var(v))).unwrap();
    assert_eq!(unified, either);
    assert_eq!(state.type_binding(v), None);
}

#[test]
fn test_variable_bound_to_options_is_narrowed() {
    let mut state = TypeState::default();
    let v = state.fresh_var();
    let either = TypeExp::or(vec![TypeExp::text(), TypeExp::boolean()]).unwrap();
    state.unify(&v, &either).unwrap();
    state.unify(&v, &TypeExp::boolean()).unwrap();
    assert_eq!(state.prune(&v), Ok(TypeExp::boolean()));
}

#[test]
fn test_no_surviving_option() {
    let mut state = TypeState::default();
    let choice = TypeExp::or(vec![TypeExp::text(), TypeExp::boolean()]).unwrap();
    assert_eq!(
        state.unify(&choice, &number("m")),
        Err(TypeError::NoOptions {
            left: "Text | Boolean".to_string(),
            right: "Number{m}".to_string()
        })
    );
}

#[test]
fn test_option_product_limit() {
    let mut state = TypeState::default();
    let result = state.unify(&options(11), &options(10));
    assert_eq!(
        result,
        Err(TypeError::TooManyOptions {
            count: 110,
            limit: 100
        })
    );
    // refused before any pair was tried
    assert_eq!(state.unify_calls(), 1);
}

#[test]
fn test_option_product_at_limit_is_attempted() {
    let mut state = TypeState::default();
    let unified = state.unify(&options(10), &options(10)).unwrap();
    assert_eq!(unified, options(10));
    assert_eq!(state.unify_calls(), 101);
}

#[test]
fn test_custom_option_limit() {
    let mut state = TypeState::new(ResourceLimits::default().with_max_type_option_product(4));
    assert_eq!(
        state.unify(&options(3), &options(2)),
        Err(TypeError::TooManyOptions { count: 6, limit: 4 })
    );
}

#[test]
fn test_prune_flattens_nested_options() {
    let mut state = TypeState::default();
    let a = state.fresh_var();
    let inner = TypeExp::or(vec![TypeExp::text(), TypeExp::scalar_number()]).unwrap();
    state.unify(&a, &inner).unwrap();
    let outer = TypeExp::Or(vec![a, TypeExp::boolean()]);
    assert_eq!(
        state.prune(&outer),
        Ok(TypeExp::Or(vec![
            TypeExp::text(),
            TypeExp::scalar_number(),
            TypeExp::boolean()
        ]))
    );
}

#[test]
fn test_restore_unbinds_later_cells() {
    let mut state = TypeState::default();
    let v = state.fresh_type_var();
    let snapshot = state.snapshot();
    let w = state.fresh_type_var();
    state.unify(&TypeExp::Var(v), &TypeExp::text()).unwrap();
    state.unify(&TypeExp::Var(w), &TypeExp::boolean()).unwrap();

    state.restore(&snapshot);
    assert_eq!(state.type_binding(v), None);
    assert_eq!(state.type_binding(w), None);
    let next = state.fresh_type_var();
    assert!(next > w);
}

#[test]
fn test_chained_unit_powers_past_the_limit_are_errors() {
    let mut state = TypeState::default();
    let u = state.fresh_unit_var();
    let v = state.fresh_unit_var();
    let widest = UnitExp::var(v).raised_to(MAX_UNIT_EXPONENT).unwrap();
    state.unify_units(&UnitExp::var(u), &widest).unwrap();
    let area = UnitExp::from_unit(&unit("m").raised_to(2).unwrap());
    state.unify_units(&UnitExp::var(v), &area).unwrap();

    assert_eq!(
        state.resolve_unit(&UnitExp::var(u)),
        Err(UnitError::PowerOutOfRange {
            power: 2000,
            limit: MAX_UNIT_EXPONENT,
        })
    );
    assert!(matches!(
        state.unify(&TypeExp::Number(UnitExp::var(u)), &number("m")),
        Err(TypeError::Unit(UnitError::PowerOutOfRange { .. }))
    ));
    assert!(state.resolved(&TypeExp::Number(UnitExp::var(u))).is_err());
}
